//! Domain models
//!
//! Canonical field names only: `youtube_url` (never `video_url`),
//! `views_count` (never `views`), `label` (never `name`) for tags.

mod recording;
mod session;
mod speaker;
mod tag;
mod user;

pub use recording::{
    youtube_thumbnail_url, youtube_video_id, NewRecording, Recording, RecordingDetail,
    RecordingFilter, RecordingSort, RecordingUpdate,
};
pub use session::{
    CompleteSession, NewSession, Session, SessionDetail, SessionFilter, SessionStatus,
    SessionSummary, SessionUpdate,
};
pub use speaker::{NewSpeaker, Speaker, SpeakerUpdate};
pub use tag::{GroupedTags, NewTag, Tag, TagCategory, TagDeletion, TagUpdate, TagUsage};
pub use user::{AdminRole, AdminUser};

use serde::{Deserialize, Deserializer};

/// Deserialize a present field into `Some`, so `Option<Option<T>>` can tell
/// "absent" (outer `None`) from "explicit null" (`Some(None)`).
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
