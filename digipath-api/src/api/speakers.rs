//! Admin speaker endpoints

use axum::{extract::State, http::StatusCode, Json};
use digipath_common::events::ContentEvent;
use digipath_common::models::{NewSpeaker, Speaker, SpeakerUpdate};
use digipath_common::time;
use uuid::Uuid;

use super::error::ApiResult;
use super::extract::{ApiJson, ApiPath};
use crate::AppState;

pub async fn list_speakers(State(state): State<AppState>) -> ApiResult<Json<Vec<Speaker>>> {
    Ok(Json(state.store.list_speakers().await?))
}

pub async fn create_speaker(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewSpeaker>,
) -> ApiResult<(StatusCode, Json<Speaker>)> {
    let speaker = state.store.create_speaker(new).await?;
    state
        .publish(ContentEvent::SpeakerCreated {
            speaker_id: speaker.id,
            timestamp: time::now(),
        })
        .await;
    Ok((StatusCode::CREATED, Json(speaker)))
}

pub async fn get_speaker(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Speaker>> {
    Ok(Json(state.store.get_speaker(id).await?))
}

pub async fn update_speaker(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<SpeakerUpdate>,
) -> ApiResult<Json<Speaker>> {
    let speaker = state.store.update_speaker(id, update).await?;
    state
        .publish(ContentEvent::SpeakerUpdated {
            speaker_id: id,
            timestamp: time::now(),
        })
        .await;
    Ok(Json(speaker))
}

pub async fn delete_speaker(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_speaker(id).await?;
    state
        .publish(ContentEvent::SpeakerDeleted {
            speaker_id: id,
            timestamp: time::now(),
        })
        .await;
    Ok(StatusCode::NO_CONTENT)
}
