//! Content events
//!
//! Every successful admin mutation emits one [`ContentEvent`] on the
//! [`EventBus`]. Subscribers are the public response cache (which drops the
//! scopes named by [`ContentEvent::scopes`]) and the admin SSE stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{SessionStatus, TagCategory};

/// Cached projection families affected by a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    Tags,
    Sessions,
    Recordings,
    Speakers,
}

impl CacheScope {
    pub const ALL: [CacheScope; 4] = [
        CacheScope::Tags,
        CacheScope::Sessions,
        CacheScope::Recordings,
        CacheScope::Speakers,
    ];
}

/// Content mutation events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentEvent {
    TagCreated {
        tag_id: Uuid,
        category: TagCategory,
        timestamp: DateTime<Utc>,
    },

    /// Label or active flag changed (includes deactivation)
    TagUpdated {
        tag_id: Uuid,
        is_active: bool,
        timestamp: DateTime<Utc>,
    },

    TagDeleted {
        tag_id: Uuid,
        replaced_with: Option<Uuid>,
        reassigned_sessions: u64,
        timestamp: DateTime<Utc>,
    },

    SessionCreated {
        session_id: Uuid,
        status: SessionStatus,
        timestamp: DateTime<Utc>,
    },

    SessionUpdated {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Publish, unpublish, complete, or a recording add/delete moved the status
    SessionStatusChanged {
        session_id: Uuid,
        old_status: SessionStatus,
        new_status: SessionStatus,
        timestamp: DateTime<Utc>,
    },

    SessionDeleted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    RecordingCreated {
        recording_id: Uuid,
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    RecordingUpdated {
        recording_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    RecordingDeleted {
        recording_id: Uuid,
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    SpeakerCreated {
        speaker_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    SpeakerUpdated {
        speaker_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    SpeakerDeleted {
        speaker_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl ContentEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ContentEvent::TagCreated { .. } => "TagCreated",
            ContentEvent::TagUpdated { .. } => "TagUpdated",
            ContentEvent::TagDeleted { .. } => "TagDeleted",
            ContentEvent::SessionCreated { .. } => "SessionCreated",
            ContentEvent::SessionUpdated { .. } => "SessionUpdated",
            ContentEvent::SessionStatusChanged { .. } => "SessionStatusChanged",
            ContentEvent::SessionDeleted { .. } => "SessionDeleted",
            ContentEvent::RecordingCreated { .. } => "RecordingCreated",
            ContentEvent::RecordingUpdated { .. } => "RecordingUpdated",
            ContentEvent::RecordingDeleted { .. } => "RecordingDeleted",
            ContentEvent::SpeakerCreated { .. } => "SpeakerCreated",
            ContentEvent::SpeakerUpdated { .. } => "SpeakerUpdated",
            ContentEvent::SpeakerDeleted { .. } => "SpeakerDeleted",
        }
    }

    /// Cache scopes this event invalidates
    ///
    /// Session projections embed tags, speakers and recordings, and
    /// recording projections embed a session summary, so most events reach
    /// more than their own scope.
    pub fn scopes(&self) -> &'static [CacheScope] {
        use CacheScope::*;
        match self {
            ContentEvent::TagCreated { .. } => &[Tags],
            ContentEvent::TagUpdated { .. } | ContentEvent::TagDeleted { .. } => {
                &[Tags, Sessions, Recordings]
            }
            ContentEvent::SessionCreated { .. }
            | ContentEvent::SessionUpdated { .. }
            | ContentEvent::SessionStatusChanged { .. }
            | ContentEvent::SessionDeleted { .. } => &[Sessions, Recordings],
            ContentEvent::RecordingCreated { .. }
            | ContentEvent::RecordingUpdated { .. }
            | ContentEvent::RecordingDeleted { .. } => &[Recordings, Sessions],
            ContentEvent::SpeakerCreated { .. } => &[Speakers],
            ContentEvent::SpeakerUpdated { .. } | ContentEvent::SpeakerDeleted { .. } => {
                &[Speakers, Sessions, Recordings]
            }
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Broadcast bus for content events
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks on slow
/// subscribers, and a lagging subscriber observes `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ContentEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ContentEvent,
    ) -> Result<usize, broadcast::error::SendError<ContentEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ContentEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
