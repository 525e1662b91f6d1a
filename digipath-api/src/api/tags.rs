//! Admin tag endpoints

use axum::{extract::State, http::StatusCode, Json};
use digipath_common::events::ContentEvent;
use digipath_common::models::{NewTag, Tag, TagCategory, TagDeletion, TagUpdate, TagUsage};
use digipath_common::time;
use serde::Deserialize;
use uuid::Uuid;

use super::error::ApiResult;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TagListQuery {
    pub category: Option<TagCategory>,
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTagQuery {
    pub replace_with: Option<Uuid>,
}

/// GET /api/v1/admin/tags
pub async fn list_tags(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TagListQuery>,
) -> ApiResult<Json<Vec<Tag>>> {
    let tags = state.store.list_tags(query.category, query.active_only).await?;
    Ok(Json(tags))
}

/// POST /api/v1/admin/tags
pub async fn create_tag(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewTag>,
) -> ApiResult<(StatusCode, Json<Tag>)> {
    let tag = state.store.create_tag(new).await?;
    state
        .publish(ContentEvent::TagCreated {
            tag_id: tag.id,
            category: tag.category,
            timestamp: time::now(),
        })
        .await;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PUT /api/v1/admin/tags/:id
pub async fn update_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<TagUpdate>,
) -> ApiResult<Json<Tag>> {
    let tag = state.store.update_tag(id, update).await?;
    publish_updated(&state, &tag).await;
    Ok(Json(tag))
}

/// POST /api/v1/admin/tags/:id/deactivate
pub async fn deactivate_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Tag>> {
    let tag = state.store.deactivate_tag(id).await?;
    publish_updated(&state, &tag).await;
    Ok(Json(tag))
}

async fn publish_updated(state: &AppState, tag: &Tag) {
    state
        .publish(ContentEvent::TagUpdated {
            tag_id: tag.id,
            is_active: tag.is_active,
            timestamp: time::now(),
        })
        .await;
}

/// GET /api/v1/admin/tags/:id/usage
pub async fn tag_usage(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TagUsage>> {
    Ok(Json(state.store.tag_usage(id).await?))
}

/// DELETE /api/v1/admin/tags/:id?replace_with=<tag id>
pub async fn delete_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DeleteTagQuery>,
) -> ApiResult<Json<TagDeletion>> {
    let deletion = state.store.delete_tag(id, query.replace_with).await?;
    state
        .publish(ContentEvent::TagDeleted {
            tag_id: deletion.tag_id,
            replaced_with: deletion.replaced_with,
            reassigned_sessions: deletion.reassigned_sessions,
            timestamp: time::now(),
        })
        .await;
    Ok(Json(deletion))
}
