//! Teaching sessions

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{deserialize_some, Recording, Speaker, Tag, TagCategory};
use crate::Error;

/// Session lifecycle state
///
/// `Draft` → `Published` → `Completed`, with `Published` → `Draft` on
/// unpublish. Transition rules live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Draft,
    Published,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Published => "published",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SessionStatus::Draft),
            "published" => Ok(SessionStatus::Published),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(Error::Validation(format!("Unknown session status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub objectives: Vec<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub platform: String,
    pub meeting_link: Option<String>,
    pub meeting_id: Option<String>,
    pub meeting_password: Option<String>,
    pub speaker_id: Uuid,
    pub organ_tag_id: Uuid,
    pub type_tag_id: Uuid,
    pub level_tag_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Tag id held in the slot of `category`
    pub fn tag_id(&self, category: TagCategory) -> Uuid {
        match category {
            TagCategory::Organ => self.organ_tag_id,
            TagCategory::Type => self.type_tag_id,
            TagCategory::Level => self.level_tag_id,
        }
    }

    pub fn has_meeting_link(&self) -> bool {
        self.meeting_link.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// Session creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub title: String,
    pub summary: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub objectives: Vec<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    /// Requested initial status (draft when absent)
    #[serde(default)]
    pub status: Option<SessionStatus>,
    pub platform: String,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub meeting_password: Option<String>,
    pub speaker_id: Uuid,
    pub organ_tag_id: Uuid,
    pub type_tag_id: Uuid,
    pub level_tag_id: Uuid,
}

impl NewSession {
    /// Requested tag id per category, in slot order
    pub fn tag_slots(&self) -> [(TagCategory, Uuid); 3] {
        [
            (TagCategory::Organ, self.organ_tag_id),
            (TagCategory::Type, self.type_tag_id),
            (TagCategory::Level, self.level_tag_id),
        ]
    }
}

/// Partial session update
///
/// Meeting fields accept explicit null to clear them. Status is changed
/// only through publish/unpublish/complete.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub objectives: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub platform: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub meeting_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub meeting_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub meeting_password: Option<Option<String>>,
    pub speaker_id: Option<Uuid>,
    pub organ_tag_id: Option<Uuid>,
    pub type_tag_id: Option<Uuid>,
    pub level_tag_id: Option<Uuid>,
}

impl SessionUpdate {
    /// Tag slots present in the update
    pub fn tag_slots(&self) -> Vec<(TagCategory, Uuid)> {
        [
            (TagCategory::Organ, self.organ_tag_id),
            (TagCategory::Type, self.type_tag_id),
            (TagCategory::Level, self.level_tag_id),
        ]
        .into_iter()
        .filter_map(|(category, id)| id.map(|id| (category, id)))
        .collect()
    }
}

/// Completion request: the recording that closes the session
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteSession {
    pub youtube_url: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub recorded_date: Option<NaiveDate>,
}

/// Session with its related entities resolved
///
/// `has_recording` is computed from the recording lookup, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub speaker: Option<Speaker>,
    pub organ_tag: Option<Tag>,
    pub type_tag: Option<Tag>,
    pub level_tag: Option<Tag>,
    pub recording: Option<Recording>,
    pub has_recording: bool,
}

/// Compact session view embedded in recording responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub speaker: Option<Speaker>,
}

impl From<&SessionDetail> for SessionSummary {
    fn from(detail: &SessionDetail) -> Self {
        let s = &detail.session;
        SessionSummary {
            id: s.id,
            title: s.title.clone(),
            summary: s.summary.clone(),
            date: s.date,
            time: s.time,
            duration_minutes: s.duration_minutes,
            status: s.status,
            speaker: detail.speaker.clone(),
        }
    }
}

/// Listing filters shared by admin and public session listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub speaker_id: Option<Uuid>,
    pub organ_tag_id: Option<Uuid>,
    pub type_tag_id: Option<Uuid>,
    pub level_tag_id: Option<Uuid>,
    /// Free text over title, summary, abstract, speaker name and tag labels
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_default_is_draft() {
        assert_eq!(SessionStatus::default(), SessionStatus::Draft);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("published".parse::<SessionStatus>().unwrap(), SessionStatus::Published);
        assert!("archived".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_new_session_reads_abstract_key() {
        let json = serde_json::json!({
            "title": "Liver biopsy interpretation",
            "summary": "Approach to medical liver biopsies",
            "abstract": "Patterns of injury",
            "objectives": ["Recognise patterns"],
            "date": "2030-03-14",
            "time": "15:00:00",
            "duration_minutes": 60,
            "platform": "Zoom",
            "speaker_id": Uuid::nil(),
            "organ_tag_id": Uuid::nil(),
            "type_tag_id": Uuid::nil(),
            "level_tag_id": Uuid::nil(),
        });
        let new: NewSession = serde_json::from_value(json).unwrap();
        assert_eq!(new.abstract_text, "Patterns of injury");
        assert!(new.status.is_none());
        assert!(new.meeting_link.is_none());
    }

    #[test]
    fn test_update_meeting_link_null_clears() {
        let update: SessionUpdate = serde_json::from_str(r#"{"meeting_link": null}"#).unwrap();
        assert_eq!(update.meeting_link, Some(None));
        let update: SessionUpdate = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(update.meeting_link, None);
    }

    #[test]
    fn test_update_tag_slots_only_present() {
        let update = SessionUpdate {
            type_tag_id: Some(Uuid::nil()),
            ..Default::default()
        };
        assert_eq!(update.tag_slots(), vec![(TagCategory::Type, Uuid::nil())]);
    }
}
