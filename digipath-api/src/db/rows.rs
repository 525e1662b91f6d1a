//! Row decoding
//!
//! Ids live in TEXT columns and are parsed back with
//! [`uuid_utils::from_column`]; a bad value surfaces as an internal error.

use digipath_common::models::{AdminUser, Recording, Session, Speaker, Tag};
use digipath_common::{uuid_utils, Error};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::Result;

fn id(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    uuid_utils::from_column(&raw)
}

pub fn tag(row: &SqliteRow) -> Result<Tag> {
    let category: String = row.try_get("category")?;
    Ok(Tag {
        id: id(row, "id")?,
        label: row.try_get("label")?,
        category: category.parse()?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn speaker(row: &SqliteRow) -> Result<Speaker> {
    Ok(Speaker {
        id: id(row, "id")?,
        name: row.try_get("name")?,
        title: row.try_get("title")?,
        affiliation: row.try_get("affiliation")?,
        bio: row.try_get("bio")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn session(row: &SqliteRow) -> Result<Session> {
    let status: String = row.try_get("status")?;
    let objectives: String = row.try_get("objectives")?;
    let objectives = serde_json::from_str(&objectives)
        .map_err(|e| Error::Internal(format!("Stored objectives are not a JSON list: {}", e)))?;

    Ok(Session {
        id: id(row, "id")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        abstract_text: row.try_get("abstract")?,
        objectives,
        date: row.try_get("date")?,
        time: row.try_get("time")?,
        duration_minutes: row.try_get("duration_minutes")?,
        status: status.parse()?,
        platform: row.try_get("platform")?,
        meeting_link: row.try_get("meeting_link")?,
        meeting_id: row.try_get("meeting_id")?,
        meeting_password: row.try_get("meeting_password")?,
        speaker_id: id(row, "speaker_id")?,
        organ_tag_id: id(row, "organ_tag_id")?,
        type_tag_id: id(row, "type_tag_id")?,
        level_tag_id: id(row, "level_tag_id")?,
        created_by: id(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn recording(row: &SqliteRow) -> Result<Recording> {
    Ok(Recording {
        id: id(row, "id")?,
        session_id: id(row, "session_id")?,
        youtube_url: row.try_get("youtube_url")?,
        pdf_url: row.try_get("pdf_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        recorded_date: row.try_get("recorded_date")?,
        views_count: row.try_get("views_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub fn admin(row: &SqliteRow) -> Result<AdminUser> {
    let role: String = row.try_get("role")?;
    Ok(AdminUser {
        id: id(row, "id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: role.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Serialize objectives for the TEXT column
pub fn objectives_json(objectives: &[String]) -> Result<String> {
    serde_json::to_string(objectives)
        .map_err(|e| Error::Internal(format!("Failed to encode objectives: {}", e)))
}
