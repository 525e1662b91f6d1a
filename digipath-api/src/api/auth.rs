//! Admin authentication: login, token refresh and the bearer-token middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use digipath_common::api::{LoginRequest, MessageResponse, TokenKind, TokenResponse};
use digipath_common::models::AdminUser;
use digipath_common::Error;
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::extract::ApiJson;
use crate::AppState;

/// Admin resolved from the access token, inserted by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub AdminUser);

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| Error::Unauthorized("Malformed Authorization header".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(Error::Unauthorized(
            "Authorization header must be 'Bearer <token>'".to_string(),
        )),
    }
}

/// Resolve the admin behind a token of `kind`
async fn authorize(state: &AppState, headers: &HeaderMap, kind: TokenKind) -> Result<AdminUser, Error> {
    let token = bearer_token(headers)?;
    let admin_id = state.tokens.verify(token, kind).map_err(|e| {
        warn!("Rejected {:?} token: {}", kind, e);
        e
    })?;

    state
        .store
        .find_admin(admin_id)
        .await?
        .ok_or_else(|| Error::Unauthorized("Account no longer exists".to_string()))
}

/// Authentication middleware
///
/// Requires a valid access token for an existing admin account and makes
/// the account available to handlers as `Extension<CurrentAdmin>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let admin = authorize(&state, request.headers(), TokenKind::Access).await?;
    request.extensions_mut().insert(CurrentAdmin(admin));
    Ok(next.run(request).await)
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(Error::Validation("email and password are required".to_string()).into());
    }

    let admin = state.store.authenticate(&request.email, &request.password).await?;
    let access = state.tokens.issue(admin.id, TokenKind::Access)?;
    let refresh = state.tokens.issue(admin.id, TokenKind::Refresh)?;

    info!("Admin {} logged in", admin.email);
    Ok(Json(TokenResponse::bearer(
        access,
        Some(refresh),
        state.tokens.access_ttl().as_secs(),
    )))
}

/// POST /api/v1/auth/refresh
///
/// Takes the refresh token as the bearer credential and returns a new
/// access token.
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<TokenResponse>> {
    let admin = authorize(&state, &headers, TokenKind::Refresh).await?;
    let access = state.tokens.issue(admin.id, TokenKind::Access)?;
    Ok(Json(TokenResponse::bearer(
        access,
        None,
        state.tokens.access_ttl().as_secs(),
    )))
}

/// POST /api/v1/auth/logout
///
/// Tokens are stateless; the client discards them.
pub async fn logout(Extension(CurrentAdmin(admin)): Extension<CurrentAdmin>) -> Json<MessageResponse> {
    info!("Admin {} logged out", admin.email);
    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}

/// GET /api/v1/auth/me
pub async fn me(Extension(CurrentAdmin(admin)): Extension<CurrentAdmin>) -> Json<AdminUser> {
    Json(admin)
}
