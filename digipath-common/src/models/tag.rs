//! Classification tags

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Fixed tag categories. A session carries exactly one tag of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    /// Organ system (Liver, Lung, ...)
    Organ,
    /// Session type (Lecture, Journal Club, ...)
    Type,
    /// Difficulty level (Beginner, Advanced, ...)
    Level,
}

impl TagCategory {
    pub const ALL: [TagCategory; 3] = [TagCategory::Organ, TagCategory::Type, TagCategory::Level];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagCategory::Organ => "organ",
            TagCategory::Type => "type",
            TagCategory::Level => "level",
        }
    }

    /// Session column holding the tag of this category
    pub fn session_column(&self) -> &'static str {
        match self {
            TagCategory::Organ => "organ_tag_id",
            TagCategory::Type => "type_tag_id",
            TagCategory::Level => "level_tag_id",
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organ" => Ok(TagCategory::Organ),
            "type" => Ok(TagCategory::Type),
            "level" => Ok(TagCategory::Level),
            other => Err(Error::Validation(format!(
                "Unknown tag category '{}' (expected organ, type or level)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub label: String,
    pub category: TagCategory,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tag creation request
#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub label: String,
    pub category: TagCategory,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial tag update; the category is fixed at creation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagUpdate {
    pub label: Option<String>,
    pub is_active: Option<bool>,
}

/// Usage of a tag across the three session tag slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagUsage {
    pub tag_id: Uuid,
    pub category: TagCategory,
    pub label: String,
    pub usage_count: i64,
    pub can_delete: bool,
}

/// Outcome of a tag deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDeletion {
    pub tag_id: Uuid,
    pub replaced_with: Option<Uuid>,
    pub reassigned_sessions: u64,
}

/// Active tags grouped by category (public taxonomy)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedTags {
    pub organ: Vec<Tag>,
    #[serde(rename = "type")]
    pub kind: Vec<Tag>,
    pub level: Vec<Tag>,
}

impl GroupedTags {
    pub fn push(&mut self, tag: Tag) {
        match tag.category {
            TagCategory::Organ => self.organ.push(tag),
            TagCategory::Type => self.kind.push(tag),
            TagCategory::Level => self.level.push(tag),
        }
    }
}
