//! Session recordings (video + optional slides)

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deserialize_some, SessionSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: Uuid,
    pub session_id: Uuid,
    pub youtube_url: String,
    pub pdf_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub recorded_date: NaiveDate,
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecording {
    pub session_id: Uuid,
    pub youtube_url: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
    /// Defaults to the session date
    #[serde(default)]
    pub recorded_date: Option<NaiveDate>,
}

/// Partial recording update; `views_count` is never client-writable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingUpdate {
    pub youtube_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub pdf_url: Option<Option<String>>,
    pub recorded_date: Option<NaiveDate>,
}

/// Recording with the summary of the session it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDetail {
    #[serde(flatten)]
    pub recording: Recording,
    pub session: Option<SessionSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingSort {
    /// Newest recorded_date first
    #[default]
    Recent,
    /// Most viewed first
    Views,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingFilter {
    pub organ_tag_id: Option<Uuid>,
    pub type_tag_id: Option<Uuid>,
    pub level_tag_id: Option<Uuid>,
    #[serde(default)]
    pub sort: RecordingSort,
}

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("valid youtube id pattern")
});

/// Extract the 11-character video id from a YouTube URL
pub fn youtube_video_id(url: &str) -> Option<&str> {
    YOUTUBE_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Thumbnail URL for a YouTube video, when the id is recognisable
pub fn youtube_thumbnail_url(url: &str) -> Option<String> {
    youtube_video_id(url).map(|id| format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", id))
}
