//! Server-Sent Events (SSE) utilities

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::events::EventBus;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Stream content events from `bus` as SSE, with a periodic heartbeat
///
/// Each event is sent with its [`event_type`](crate::events::ContentEvent::event_type)
/// as the SSE event name and its JSON form as data. A subscriber that falls
/// behind the bus capacity is told how many events it missed and keeps
/// streaming.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     digipath_common::sse::content_event_stream(&state.events, "digipath-api")
/// }
/// ```
pub fn content_event_stream(
    bus: &EventBus,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} content events", service_name);
    let mut rx = bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!("SSE: forwarding {}", event.event_type());
                    match serde_json::to_string(&event) {
                        Ok(data) => yield Ok(Event::default().event(event.event_type()).data(data)),
                        Err(e) => warn!("SSE: failed to serialize {}: {}", event.event_type(), e),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("SSE: {} client lagged, {} events dropped", service_name, missed);
                    yield Ok(Event::default().event("Lagged").data(missed.to_string()));
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
