//! Error responses
//!
//! Domain errors map to 400/401/404/409 with their message. Infrastructure
//! failures are logged and returned as a generic 500.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use digipath_common::api::ErrorResponse;
use digipath_common::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if !self.0.is_client_error() {
            error!("Request failed: {}", self.0);
            let body = ErrorResponse::new(self.0.code(), "Internal server error");
            return (status, Json(body)).into_response();
        }

        let body = Json(ErrorResponse::from(&self.0));
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}
