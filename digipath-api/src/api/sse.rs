//! Server-Sent Events for content changes

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/v1/admin/events - SSE stream of content events with heartbeat
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    digipath_common::sse::content_event_stream(&state.events, "digipath-api")
}
