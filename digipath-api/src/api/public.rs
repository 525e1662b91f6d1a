//! Public catalogue: home page, taxonomy, sessions, calendar export and the
//! recording library
//!
//! Home, taxonomy and upcoming-session responses go through the response
//! cache. Keys are built from the parsed query, so parameters a handler
//! ignores never create entries of their own.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use digipath_common::calendar::generate_ics;
use digipath_common::events::CacheScope;
use digipath_common::models::{RecordingDetail, RecordingFilter, RecordingSort, SessionDetail, SessionStatus};
use digipath_common::{time, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::extract::{ApiPath, ApiQuery};
use super::sessions::{listing, SessionListQuery};
use crate::db::SessionListing;
use crate::pagination::{Page, PageLimits, PageRequest};
use crate::AppState;

/// Serve `key` from the cache, or run `load` and cache its JSON
async fn cached<T, F>(
    state: &AppState,
    key: String,
    scopes: &'static [CacheScope],
    load: F,
) -> ApiResult<Json<Value>>
where
    T: Serialize,
    F: Future<Output = ApiResult<T>>,
{
    if let Some(value) = state.cache.get(&key).await {
        return Ok(Json(value));
    }

    let loaded_at = state.cache.epoch();
    let value = serde_json::to_value(load.await?)
        .map_err(|e| Error::Internal(format!("Failed to encode response: {}", e)))?;
    state.cache.put(key, scopes, value.clone(), loaded_at).await;
    Ok(Json(value))
}

/// Key for an upcoming-sessions page: resolved paging plus the filters the
/// upcoming listing applies
fn upcoming_key(query: &SessionListQuery, limits: &PageLimits) -> String {
    let page = PageRequest {
        page: query.page,
        per_page: query.per_page,
    };
    let mut key = format!(
        "upcoming?page={}&per_page={}",
        query.page.unwrap_or(1).max(1),
        limits.per_page(&page)
    );
    for (name, id) in [
        ("speaker_id", query.speaker_id),
        ("organ_tag_id", query.organ_tag_id),
        ("type_tag_id", query.type_tag_id),
        ("level_tag_id", query.level_tag_id),
    ] {
        if let Some(id) = id {
            key.push_str(&format!("&{}={}", name, id));
        }
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        key.push_str(&format!("&search={}", search));
    }
    key
}

/// GET /api/v1/public/home
pub async fn home(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    cached(
        &state,
        "home".to_string(),
        &[CacheScope::Sessions, CacheScope::Recordings, CacheScope::Speakers],
        async { state.store.home().await.map_err(ApiError::from) },
    )
    .await
}

/// GET /api/v1/public/tags - active tags grouped by category
pub async fn public_tags(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    cached(&state, "tags".to_string(), &[CacheScope::Tags], async {
        state.store.active_tags_grouped().await.map_err(ApiError::from)
    })
    .await
}

/// GET /api/v1/public/sessions/upcoming
pub async fn public_upcoming_sessions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SessionListQuery>,
) -> ApiResult<Json<Value>> {
    cached(
        &state,
        upcoming_key(&query, &state.limits),
        &[CacheScope::Sessions, CacheScope::Tags, CacheScope::Speakers],
        listing(&state, SessionListing::Upcoming, query),
    )
    .await
}

/// GET /api/v1/public/sessions/:id - published or completed sessions only
pub async fn public_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    Ok(Json(state.store.public_session(id).await?))
}

/// GET /api/v1/public/sessions/:id/calendar
///
/// iCalendar download for a published session.
pub async fn session_calendar(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Response> {
    let detail = state.store.public_session(id).await?;
    if detail.session.status != SessionStatus::Published {
        return Err(Error::NotFound(format!("No calendar entry for session {}", id)).into());
    }

    let ics = generate_ics(&detail.session, detail.speaker.as_ref(), time::now());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=session-{}.ics", id),
            ),
        ],
        ics,
    )
        .into_response())
}

/// Recording library query
#[derive(Debug, Default, Deserialize)]
pub struct RecordingListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub organ_tag_id: Option<Uuid>,
    pub type_tag_id: Option<Uuid>,
    pub level_tag_id: Option<Uuid>,
    #[serde(default)]
    pub sort: RecordingSort,
}

/// GET /api/v1/public/recordings
pub async fn public_recordings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecordingListQuery>,
) -> ApiResult<Json<Page<RecordingDetail>>> {
    let page = PageRequest {
        page: query.page,
        per_page: query.per_page,
    };
    let filter = RecordingFilter {
        organ_tag_id: query.organ_tag_id,
        type_tag_id: query.type_tag_id,
        level_tag_id: query.level_tag_id,
        sort: query.sort,
    };
    let recordings = state
        .store
        .list_recordings(&filter, page.page.unwrap_or(1), state.limits.per_page(&page))
        .await?;
    Ok(Json(recordings))
}

/// GET /api/v1/public/recordings/:id - counts a view
pub async fn public_recording(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<RecordingDetail>> {
    Ok(Json(state.store.view_recording(id).await?))
}
