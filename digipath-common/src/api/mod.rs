//! Shared HTTP API helpers
//!
//! Framework-independent pieces used by the service crate: credential
//! hashing, bearer token issue/verification, and request/response types.
//! The axum middleware wrapping these lives in `digipath-api`.

pub mod auth;
pub mod types;

pub use auth::{
    hash_password, verify_password, verify_unknown_account, TokenClaims, TokenKeys, TokenKind,
};
pub use types::{ErrorBody, ErrorResponse, LoginRequest, MessageResponse, TokenResponse};
