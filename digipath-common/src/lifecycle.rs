//! Session lifecycle and field rules
//!
//! Pure checks shared by every store operation. Nothing here touches the
//! database: callers load the current row, run the check, and only then
//! write. A failed check therefore never leaves a partial change behind.
//!
//! State machine: `draft → published → completed`, `published → draft`
//! (unpublish), and `draft → completed` (direct completion).

use crate::models::{NewSession, Session, SessionStatus, SessionUpdate, Tag, TagCategory};
use crate::{Error, Result};

pub const MAX_TITLE_CHARS: usize = 300;
pub const MAX_LABEL_CHARS: usize = 100;

// ========================================
// Field normalization
// ========================================

/// Trim an optional string; blank becomes `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Trim a required string, rejecting blank values
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn require_text_max(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = require_text(field, value)?;
    if trimmed.chars().count() > max_chars {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(trimmed)
}

/// Normalize a tag label (trimmed, non-blank, bounded)
pub fn normalize_label(label: &str) -> Result<String> {
    require_text_max("label", label, MAX_LABEL_CHARS)
}

/// Trim objectives; the list must be non-empty with no blank entry
pub fn validate_objectives(objectives: Vec<String>) -> Result<Vec<String>> {
    if objectives.is_empty() {
        return Err(Error::Validation("at least one objective is required".to_string()));
    }
    objectives
        .iter()
        .enumerate()
        .map(|(i, o)| require_text(&format!("objectives[{}]", i), o))
        .collect()
}

pub fn validate_duration(minutes: i32) -> Result<i32> {
    if minutes <= 0 {
        return Err(Error::Validation("duration_minutes must be greater than 0".to_string()));
    }
    Ok(minutes)
}

/// A recording needs a video link
pub fn validate_youtube_url(url: &str) -> Result<String> {
    require_text("youtube_url", url)
}

// ========================================
// Session creation / update
// ========================================

/// Status a new session starts in
///
/// Defaults to draft. Publishing on create follows the same gate as
/// [`check_publish`]; a session cannot be created completed.
pub fn initial_status(
    requested: Option<SessionStatus>,
    meeting_link: Option<&str>,
) -> Result<SessionStatus> {
    match requested.unwrap_or_default() {
        SessionStatus::Draft => Ok(SessionStatus::Draft),
        SessionStatus::Published => {
            if meeting_link.is_none() {
                return Err(Error::Validation(
                    "meeting_link is required to publish a session".to_string(),
                ));
            }
            Ok(SessionStatus::Published)
        }
        SessionStatus::Completed => Err(Error::Validation(
            "a session is completed by attaching a recording, not on create".to_string(),
        )),
    }
}

/// Normalize and validate a creation request
///
/// Tag and speaker existence are checked by the store; this covers every
/// rule that needs no lookup.
pub fn validate_new_session(new: NewSession) -> Result<NewSession> {
    let meeting_link = normalize_optional(new.meeting_link);
    initial_status(new.status, meeting_link.as_deref())?;

    Ok(NewSession {
        title: require_text_max("title", &new.title, MAX_TITLE_CHARS)?,
        summary: require_text("summary", &new.summary)?,
        abstract_text: require_text("abstract", &new.abstract_text)?,
        objectives: validate_objectives(new.objectives)?,
        duration_minutes: validate_duration(new.duration_minutes)?,
        platform: require_text("platform", &new.platform)?,
        meeting_link,
        meeting_id: normalize_optional(new.meeting_id),
        meeting_password: normalize_optional(new.meeting_password),
        ..new
    })
}

/// Merge a partial update into `current`, validating every provided field
///
/// Completed sessions are frozen. Clearing the meeting link of a published
/// session would break the publish invariant and is rejected.
pub fn apply_update(current: &Session, update: SessionUpdate) -> Result<Session> {
    check_editable(current.status)?;

    let mut next = current.clone();
    if let Some(title) = update.title {
        next.title = require_text_max("title", &title, MAX_TITLE_CHARS)?;
    }
    if let Some(summary) = update.summary {
        next.summary = require_text("summary", &summary)?;
    }
    if let Some(abstract_text) = update.abstract_text {
        next.abstract_text = require_text("abstract", &abstract_text)?;
    }
    if let Some(objectives) = update.objectives {
        next.objectives = validate_objectives(objectives)?;
    }
    if let Some(date) = update.date {
        next.date = date;
    }
    if let Some(time) = update.time {
        next.time = time;
    }
    if let Some(minutes) = update.duration_minutes {
        next.duration_minutes = validate_duration(minutes)?;
    }
    if let Some(platform) = update.platform {
        next.platform = require_text("platform", &platform)?;
    }
    if let Some(link) = update.meeting_link {
        next.meeting_link = normalize_optional(link);
    }
    if let Some(id) = update.meeting_id {
        next.meeting_id = normalize_optional(id);
    }
    if let Some(password) = update.meeting_password {
        next.meeting_password = normalize_optional(password);
    }
    if let Some(speaker_id) = update.speaker_id {
        next.speaker_id = speaker_id;
    }
    if let Some(id) = update.organ_tag_id {
        next.organ_tag_id = id;
    }
    if let Some(id) = update.type_tag_id {
        next.type_tag_id = id;
    }
    if let Some(id) = update.level_tag_id {
        next.level_tag_id = id;
    }

    if next.status == SessionStatus::Published && !next.has_meeting_link() {
        return Err(Error::Validation(
            "a published session must keep its meeting_link".to_string(),
        ));
    }

    Ok(next)
}

/// A tag may fill `slot` only if its category matches and it is active
pub fn check_tag_for_slot(tag: &Tag, slot: TagCategory) -> Result<()> {
    if tag.category != slot {
        return Err(Error::Validation(format!(
            "{}_tag_id must reference a {} tag, '{}' is {}",
            slot, slot, tag.label, tag.category
        )));
    }
    if !tag.is_active {
        return Err(Error::Validation(format!(
            "Tag '{}' is inactive and cannot be assigned",
            tag.label
        )));
    }
    Ok(())
}

// ========================================
// Transitions
// ========================================

pub fn check_editable(status: SessionStatus) -> Result<()> {
    if status == SessionStatus::Completed {
        return Err(Error::Conflict("a completed session cannot be edited".to_string()));
    }
    Ok(())
}

/// draft → published
pub fn check_publish(session: &Session) -> Result<()> {
    if session.status != SessionStatus::Draft {
        return Err(Error::Conflict(format!(
            "only draft sessions can be published (status is {})",
            session.status
        )));
    }
    if !session.has_meeting_link() {
        return Err(Error::Validation(
            "meeting_link is required to publish a session".to_string(),
        ));
    }
    Ok(())
}

/// published → draft
pub fn check_unpublish(session: &Session) -> Result<()> {
    if session.status != SessionStatus::Published {
        return Err(Error::Conflict(format!(
            "only published sessions can be unpublished (status is {})",
            session.status
        )));
    }
    Ok(())
}

/// draft | published → completed, when no recording is attached yet
pub fn check_complete(session: &Session, has_recording: bool) -> Result<()> {
    if session.status == SessionStatus::Completed {
        return Err(Error::Conflict("session is already completed".to_string()));
    }
    if has_recording {
        return Err(Error::Conflict(
            "session already has a recording; update the recording instead".to_string(),
        ));
    }
    Ok(())
}

/// Status a session falls back to when its recording is removed
pub fn status_without_recording(session: &Session) -> SessionStatus {
    if session.has_meeting_link() {
        SessionStatus::Published
    } else {
        SessionStatus::Draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    fn session(status: SessionStatus, meeting_link: Option<&str>) -> Session {
        Session {
            id: Uuid::new_v4(),
            title: "Breast core biopsies".into(),
            summary: "B-categories".into(),
            abstract_text: "Reporting core biopsies".into(),
            objectives: vec!["Use B1-B5".into()],
            date: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            duration_minutes: 60,
            status,
            platform: "Zoom".into(),
            meeting_link: meeting_link.map(str::to_string),
            meeting_id: None,
            meeting_password: None,
            speaker_id: Uuid::new_v4(),
            organ_tag_id: Uuid::new_v4(),
            type_tag_id: Uuid::new_v4(),
            level_tag_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn new_session() -> NewSession {
        NewSession {
            title: "  Lung adenocarcinoma patterns ".into(),
            summary: "Patterns".into(),
            abstract_text: "IASLC grading".into(),
            objectives: vec![" Grade tumours ".into()],
            date: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            duration_minutes: 45,
            status: None,
            platform: "Teams".into(),
            meeting_link: Some("   ".into()),
            meeting_id: None,
            meeting_password: None,
            speaker_id: Uuid::new_v4(),
            organ_tag_id: Uuid::new_v4(),
            type_tag_id: Uuid::new_v4(),
            level_tag_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_normalize_optional_blank_is_none() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" x ".into())).as_deref(), Some("x"));
        assert_eq!(normalize_optional(None), None);
    }

    #[test]
    fn test_new_session_normalized() {
        let new = validate_new_session(new_session()).unwrap();
        assert_eq!(new.title, "Lung adenocarcinoma patterns");
        assert_eq!(new.objectives, vec!["Grade tumours".to_string()]);
        assert!(new.meeting_link.is_none());
    }

    #[test]
    fn test_new_session_rejects_bad_fields() {
        let mut new = new_session();
        new.objectives = vec![];
        assert!(matches!(validate_new_session(new), Err(Error::Validation(_))));

        let mut new = new_session();
        new.objectives = vec!["ok".into(), " ".into()];
        assert!(matches!(validate_new_session(new), Err(Error::Validation(_))));

        let mut new = new_session();
        new.duration_minutes = 0;
        assert!(matches!(validate_new_session(new), Err(Error::Validation(_))));

        let mut new = new_session();
        new.title = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(matches!(validate_new_session(new), Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_published_requires_link() {
        let mut new = new_session();
        new.status = Some(SessionStatus::Published);
        assert!(matches!(validate_new_session(new), Err(Error::Validation(_))));

        assert_eq!(
            initial_status(Some(SessionStatus::Published), Some("https://zoom.us/j/1")).unwrap(),
            SessionStatus::Published
        );
        assert!(initial_status(Some(SessionStatus::Completed), Some("x")).is_err());
        assert_eq!(initial_status(None, None).unwrap(), SessionStatus::Draft);
    }

    #[test]
    fn test_publish_blank_link_is_validation_error() {
        let s = session(SessionStatus::Draft, Some(""));
        assert!(matches!(check_publish(&s), Err(Error::Validation(_))));
        let s = session(SessionStatus::Draft, Some("https://meet.example/abc"));
        assert!(check_publish(&s).is_ok());
    }

    #[test]
    fn test_publish_from_non_draft_is_conflict() {
        let s = session(SessionStatus::Published, Some("https://meet.example/abc"));
        assert!(matches!(check_publish(&s), Err(Error::Conflict(_))));
        let s = session(SessionStatus::Completed, Some("https://meet.example/abc"));
        assert!(matches!(check_publish(&s), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_unpublish_only_from_published() {
        assert!(check_unpublish(&session(SessionStatus::Published, Some("l"))).is_ok());
        assert!(matches!(
            check_unpublish(&session(SessionStatus::Draft, None)),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_complete_rules() {
        assert!(check_complete(&session(SessionStatus::Draft, None), false).is_ok());
        assert!(check_complete(&session(SessionStatus::Published, Some("l")), false).is_ok());
        assert!(matches!(
            check_complete(&session(SessionStatus::Published, Some("l")), true),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            check_complete(&session(SessionStatus::Completed, Some("l")), false),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_update_cannot_clear_published_link() {
        let s = session(SessionStatus::Published, Some("https://meet.example/abc"));
        let update = SessionUpdate {
            meeting_link: Some(None),
            ..Default::default()
        };
        assert!(matches!(apply_update(&s, update), Err(Error::Validation(_))));

        let draft = session(SessionStatus::Draft, Some("https://meet.example/abc"));
        let update = SessionUpdate {
            meeting_link: Some(None),
            ..Default::default()
        };
        assert!(apply_update(&draft, update).unwrap().meeting_link.is_none());
    }

    #[test]
    fn test_update_completed_is_conflict() {
        let s = session(SessionStatus::Completed, Some("l"));
        let update = SessionUpdate {
            title: Some("New".into()),
            ..Default::default()
        };
        assert!(matches!(apply_update(&s, update), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let s = session(SessionStatus::Draft, Some("l"));
        let update = SessionUpdate {
            duration_minutes: Some(90),
            ..Default::default()
        };
        let next = apply_update(&s, update).unwrap();
        assert_eq!(next.duration_minutes, 90);
        assert_eq!(next.title, s.title);
        assert_eq!(next.meeting_link, s.meeting_link);
    }

    #[test]
    fn test_tag_slot_checks() {
        let now = Utc::now();
        let mut tag = Tag {
            id: Uuid::new_v4(),
            label: "Liver".into(),
            category: TagCategory::Organ,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(check_tag_for_slot(&tag, TagCategory::Organ).is_ok());
        assert!(matches!(
            check_tag_for_slot(&tag, TagCategory::Level),
            Err(Error::Validation(_))
        ));
        tag.is_active = false;
        assert!(matches!(
            check_tag_for_slot(&tag, TagCategory::Organ),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_status_without_recording() {
        assert_eq!(
            status_without_recording(&session(SessionStatus::Completed, Some("l"))),
            SessionStatus::Published
        );
        assert_eq!(
            status_without_recording(&session(SessionStatus::Completed, None)),
            SessionStatus::Draft
        );
    }
}
