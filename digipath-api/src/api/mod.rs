//! HTTP API handlers for digipath-api

pub mod auth;
pub mod buildinfo;
pub mod error;
pub mod extract;
pub mod health;
pub mod public;
pub mod recordings;
pub mod sessions;
pub mod speakers;
pub mod sse;
pub mod tags;

pub use auth::{auth_middleware, login, logout, me, refresh, CurrentAdmin};
pub use buildinfo::get_build_info;
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use public::{
    home, public_recording, public_recordings, public_session, public_tags,
    public_upcoming_sessions, session_calendar,
};
pub use recordings::{add_recording, delete_recording, update_recording};
pub use sessions::{
    complete_session, create_session, delete_session, get_session, list_past_sessions,
    list_sessions, list_upcoming_sessions, publish_session, unpublish_session, update_session,
};
pub use speakers::{create_speaker, delete_speaker, get_speaker, list_speakers, update_speaker};
pub use sse::event_stream;
pub use tags::{create_tag, deactivate_tag, delete_tag, list_tags, tag_usage, update_tag};
