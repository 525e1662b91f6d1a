//! Admin credentials and bearer tokens
//!
//! Passwords are stored as Argon2id PHC strings. Tokens are HS256 JWTs:
//! subject = admin id, custom claim `kind` = access | refresh. A refresh
//! token is never accepted where an access token is required, and vice
//! versa.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jwt_simple::prelude::{Claims, HS256Key, MACLike};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{Error, Result};

// ========================================
// Passwords
// ========================================

/// Hash a password into an Argon2id PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored PHC string
///
/// A malformed stored hash verifies as `false` rather than erroring, so
/// callers report the same credential failure either way.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is not a valid PHC string: {}", e);
            false
        }
    }
}

/// Hash checked when no account matches the login email
static UNKNOWN_ACCOUNT_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("digipath-unknown-account").ok());

/// Run a full verification for a login with no matching account
///
/// Unknown and known emails then cost the same Argon2 work. Always `false`.
pub fn verify_unknown_account(password: &str) -> bool {
    if let Some(hash) = UNKNOWN_ACCOUNT_HASH.as_deref() {
        verify_password(password, hash);
    }
    false
}

// ========================================
// Tokens
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Custom JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub kind: TokenKind,
}

/// Signing key plus token lifetimes
#[derive(Clone)]
pub struct TokenKeys {
    key: HS256Key,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            key: HS256Key::from_bytes(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issue a signed token of `kind` for `admin_id`
    pub fn issue(&self, admin_id: Uuid, kind: TokenKind) -> Result<String> {
        let valid_for = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims::with_custom_claims(TokenClaims { kind }, valid_for.into())
            .with_subject(admin_id);
        self.key
            .authenticate(claims)
            .map_err(|e| Error::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify a token and return the admin id it was issued for
    ///
    /// Fails with `Unauthorized` on a bad signature, expiry, a missing or
    /// malformed subject, or a token of the wrong kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Uuid> {
        let claims = self
            .key
            .verify_token::<TokenClaims>(token, None)
            .map_err(|e| Error::Unauthorized(format!("Invalid token: {}", e)))?;

        if claims.custom.kind != expected {
            return Err(Error::Unauthorized(match expected {
                TokenKind::Access => "Access token required".to_string(),
                TokenKind::Refresh => "Refresh token required".to_string(),
            }));
        }

        claims
            .subject
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| Error::Unauthorized("Token subject is missing".to_string()))
    }
}
