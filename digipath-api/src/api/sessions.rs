//! Admin session endpoints and lifecycle transitions

use axum::{extract::State, http::StatusCode, Extension, Json};
use digipath_common::events::ContentEvent;
use digipath_common::models::{
    CompleteSession, NewSession, SessionDetail, SessionFilter, SessionStatus, SessionUpdate,
};
use digipath_common::time;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::CurrentAdmin;
use super::error::ApiResult;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::db::{SessionListing, StatusChange};
use crate::pagination::{Page, PageRequest};
use crate::AppState;

/// Listing query: pagination plus filters
#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<SessionStatus>,
    pub speaker_id: Option<Uuid>,
    pub organ_tag_id: Option<Uuid>,
    pub type_tag_id: Option<Uuid>,
    pub level_tag_id: Option<Uuid>,
    pub search: Option<String>,
}

impl SessionListQuery {
    pub fn split(self) -> (PageRequest, SessionFilter) {
        (
            PageRequest {
                page: self.page,
                per_page: self.per_page,
            },
            SessionFilter {
                status: self.status,
                speaker_id: self.speaker_id,
                organ_tag_id: self.organ_tag_id,
                type_tag_id: self.type_tag_id,
                level_tag_id: self.level_tag_id,
                search: self.search,
            },
        )
    }
}

pub(crate) async fn listing(
    state: &AppState,
    listing: SessionListing,
    query: SessionListQuery,
) -> ApiResult<Page<SessionDetail>> {
    let (page, filter) = query.split();
    let per_page = state.limits.per_page(&page);
    let sessions = state
        .store
        .list_sessions(listing, &filter, page.page.unwrap_or(1), per_page)
        .await?;
    Ok(sessions)
}

/// GET /api/v1/admin/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SessionListQuery>,
) -> ApiResult<Json<Page<SessionDetail>>> {
    Ok(Json(listing(&state, SessionListing::All, query).await?))
}

/// GET /api/v1/admin/sessions/upcoming
pub async fn list_upcoming_sessions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SessionListQuery>,
) -> ApiResult<Json<Page<SessionDetail>>> {
    Ok(Json(listing(&state, SessionListing::Upcoming, query).await?))
}

/// GET /api/v1/admin/sessions/past
pub async fn list_past_sessions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SessionListQuery>,
) -> ApiResult<Json<Page<SessionDetail>>> {
    Ok(Json(listing(&state, SessionListing::Past, query).await?))
}

/// POST /api/v1/admin/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Extension(CurrentAdmin(admin)): Extension<CurrentAdmin>,
    ApiJson(new): ApiJson<NewSession>,
) -> ApiResult<(StatusCode, Json<SessionDetail>)> {
    let detail = state.store.create_session(new, admin.id).await?;
    state
        .publish(ContentEvent::SessionCreated {
            session_id: detail.session.id,
            status: detail.session.status,
            timestamp: time::now(),
        })
        .await;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/v1/admin/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    Ok(Json(state.store.get_session(id).await?))
}

/// PUT /api/v1/admin/sessions/:id
pub async fn update_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<SessionUpdate>,
) -> ApiResult<Json<SessionDetail>> {
    let detail = state.store.update_session(id, update).await?;
    state
        .publish(ContentEvent::SessionUpdated {
            session_id: id,
            timestamp: time::now(),
        })
        .await;
    Ok(Json(detail))
}

/// DELETE /api/v1/admin/sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_session(id).await?;
    state
        .publish(ContentEvent::SessionDeleted {
            session_id: id,
            timestamp: time::now(),
        })
        .await;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn publish_status_change(state: &AppState, change: &StatusChange) {
    state
        .publish(ContentEvent::SessionStatusChanged {
            session_id: change.detail.session.id,
            old_status: change.from,
            new_status: change.to(),
            timestamp: time::now(),
        })
        .await;
}

/// POST /api/v1/admin/sessions/:id/publish
pub async fn publish_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    let change = state.store.publish_session(id).await?;
    publish_status_change(&state, &change).await;
    Ok(Json(change.detail))
}

/// POST /api/v1/admin/sessions/:id/unpublish
pub async fn unpublish_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    let change = state.store.unpublish_session(id).await?;
    publish_status_change(&state, &change).await;
    Ok(Json(change.detail))
}

/// POST /api/v1/admin/sessions/:id/complete
///
/// Attaches the recording and marks the session completed.
pub async fn complete_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CompleteSession>,
) -> ApiResult<Json<SessionDetail>> {
    let change = state.store.complete_session(id, request).await?;
    if let Some(recording) = &change.detail.recording {
        state
            .publish(ContentEvent::RecordingCreated {
                recording_id: recording.id,
                session_id: id,
                timestamp: time::now(),
            })
            .await;
    }
    publish_status_change(&state, &change).await;
    Ok(Json(change.detail))
}
