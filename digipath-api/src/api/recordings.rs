//! Admin recording endpoints

use axum::{extract::State, http::StatusCode, Json};
use digipath_common::events::ContentEvent;
use digipath_common::models::{NewRecording, Recording, RecordingUpdate};
use digipath_common::time;
use uuid::Uuid;

use super::error::ApiResult;
use super::extract::{ApiJson, ApiPath};
use super::sessions::publish_status_change;
use crate::AppState;

/// POST /api/v1/admin/recordings
///
/// The target session becomes completed.
pub async fn add_recording(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewRecording>,
) -> ApiResult<(StatusCode, Json<Recording>)> {
    let (recording, change) = state.store.add_recording(new).await?;
    state
        .publish(ContentEvent::RecordingCreated {
            recording_id: recording.id,
            session_id: recording.session_id,
            timestamp: time::now(),
        })
        .await;
    publish_status_change(&state, &change).await;
    Ok((StatusCode::CREATED, Json(recording)))
}

/// PUT /api/v1/admin/recordings/:id
pub async fn update_recording(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<RecordingUpdate>,
) -> ApiResult<Json<Recording>> {
    let recording = state.store.update_recording(id, update).await?;
    state
        .publish(ContentEvent::RecordingUpdated {
            recording_id: id,
            timestamp: time::now(),
        })
        .await;
    Ok(Json(recording))
}

/// DELETE /api/v1/admin/recordings/:id
///
/// The session falls back to published (meeting link set) or draft.
pub async fn delete_recording(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let (recording, change) = state.store.delete_recording(id).await?;
    state
        .publish(ContentEvent::RecordingDeleted {
            recording_id: id,
            session_id: recording.session_id,
            timestamp: time::now(),
        })
        .await;
    publish_status_change(&state, &change).await;
    Ok(StatusCode::NO_CONTENT)
}
