//! Session speakers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::deserialize_some;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub affiliation: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSpeaker {
    pub name: String,
    pub title: String,
    pub affiliation: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial speaker update; `bio`/`image_url` accept explicit null to clear
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeakerUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub affiliation: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
}
