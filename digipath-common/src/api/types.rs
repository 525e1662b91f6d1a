//! Shared API request/response types

use serde::{Deserialize, Serialize};

// ========================================
// Error Response Types
// ========================================

/// Error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code (VALIDATION_ERROR, CONFLICT, NOT_FOUND, ...)
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

impl From<&crate::Error> for ErrorResponse {
    fn from(err: &crate::Error) -> Self {
        ErrorResponse::new(err.code(), err.to_string())
    }
}

// ========================================
// Authentication Types
// ========================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Present on login only; refresh returns a new access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: Option<String>, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let err = crate::Error::Conflict("Tag is used by 1 session".into());
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert_eq!(json["error"]["message"], "Conflict: Tag is used by 1 session");
    }

    #[test]
    fn test_refresh_response_omits_refresh_token() {
        let json = serde_json::to_value(TokenResponse::bearer("a".into(), None, 900)).unwrap();
        assert!(json.get("refresh_token").is_none());
        assert_eq!(json["token_type"], "bearer");
    }
}
