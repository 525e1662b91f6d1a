//! # DigiPath Common Library
//!
//! Shared code for the DigiPath teaching-session service including:
//! - Domain models (tags, speakers, sessions, recordings, admin users)
//! - Session lifecycle rules
//! - Database schema and initialization
//! - Content events (EventBus) and SSE helpers
//! - Credential and bearer token helpers
//! - Configuration loading
//! - Calendar export

pub mod api;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod sse;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{SessionStatus, TagCategory};
