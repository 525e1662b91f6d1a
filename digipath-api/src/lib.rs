//! digipath-api library - teaching session catalogue service
//!
//! Admin endpoints manage the tag taxonomy, speakers, sessions and their
//! recordings; public endpoints serve the catalogue, calendar exports and
//! the recording library.

use axum::Router;
use digipath_common::api::TokenKeys;
use digipath_common::config::Settings;
use digipath_common::events::{ContentEvent, EventBus};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub mod api;
pub mod cache;
pub mod db;
pub mod pagination;

use cache::ResponseCache;
use db::Store;
use pagination::PageLimits;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: Arc<TokenKeys>,
    pub cache: Arc<ResponseCache>,
    pub events: EventBus,
    pub limits: PageLimits,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        tokens: TokenKeys,
        cache_ttl: Duration,
        limits: PageLimits,
        event_capacity: usize,
    ) -> Self {
        Self {
            store: Store::new(pool),
            tokens: Arc::new(tokens),
            cache: Arc::new(ResponseCache::new(cache_ttl)),
            events: EventBus::new(event_capacity),
            limits,
        }
    }

    pub fn from_settings(pool: SqlitePool, settings: &Settings) -> Self {
        Self::new(
            pool,
            TokenKeys::new(
                settings.jwt_secret.as_bytes(),
                settings.access_token_ttl,
                settings.refresh_token_ttl,
            ),
            settings.cache_ttl,
            PageLimits {
                default_per_page: i64::from(settings.default_page_size),
                max_per_page: i64::from(settings.max_page_size),
            },
            settings.event_capacity,
        )
    }

    /// Invalidate the cache scopes `event` touches, then broadcast it
    pub async fn publish(&self, event: ContentEvent) {
        let dropped = self.cache.invalidate(event.scopes()).await;
        debug!(
            "{} ({} cached responses dropped, {} subscribers)",
            event.event_type(),
            dropped,
            self.events.subscriber_count()
        );
        self.events.emit_lossy(event);
    }
}

/// Build application router
///
/// `/health` and `/build_info` sit outside `/api/v1`. Admin routes plus
/// `/auth/me` and `/auth/logout` require an access token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    let protected = Router::new()
        .route("/auth/me", get(api::me))
        .route("/auth/logout", post(api::logout))
        // Tags
        .route("/admin/tags", get(api::list_tags).post(api::create_tag))
        .route("/admin/tags/:id", put(api::update_tag).delete(api::delete_tag))
        .route("/admin/tags/:id/usage", get(api::tag_usage))
        .route("/admin/tags/:id/deactivate", post(api::deactivate_tag))
        // Sessions
        .route("/admin/sessions", get(api::list_sessions).post(api::create_session))
        .route("/admin/sessions/upcoming", get(api::list_upcoming_sessions))
        .route("/admin/sessions/past", get(api::list_past_sessions))
        .route(
            "/admin/sessions/:id",
            get(api::get_session)
                .put(api::update_session)
                .delete(api::delete_session),
        )
        .route("/admin/sessions/:id/publish", post(api::publish_session))
        .route("/admin/sessions/:id/unpublish", post(api::unpublish_session))
        .route("/admin/sessions/:id/complete", post(api::complete_session))
        // Recordings
        .route("/admin/recordings", post(api::add_recording))
        .route(
            "/admin/recordings/:id",
            put(api::update_recording).delete(api::delete_recording),
        )
        // Speakers
        .route("/admin/speakers", get(api::list_speakers).post(api::create_speaker))
        .route(
            "/admin/speakers/:id",
            get(api::get_speaker)
                .put(api::update_speaker)
                .delete(api::delete_speaker),
        )
        .route("/admin/events", get(api::event_stream))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .route("/auth/login", post(api::login))
        .route("/auth/refresh", post(api::refresh))
        .route("/public/home", get(api::home))
        .route("/public/tags", get(api::public_tags))
        .route("/public/sessions/upcoming", get(api::public_upcoming_sessions))
        .route("/public/sessions/:id", get(api::public_session))
        .route("/public/sessions/:id/calendar", get(api::session_calendar))
        .route("/public/recordings", get(api::public_recordings))
        .route("/public/recordings/:id", get(api::public_recording));

    Router::new()
        .nest("/api/v1", protected.merge(public))
        .merge(api::health_routes())
        .with_state(state)
}
