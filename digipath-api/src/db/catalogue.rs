//! Public home page aggregate

use digipath_common::models::{RecordingDetail, SessionDetail, SessionFilter};
use serde::Serialize;

use super::{Result, SessionListing, Store};

/// Items shown per home page section
pub const HOME_SECTION_SIZE: i64 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct HomeStats {
    /// Published plus completed sessions
    pub total_sessions: i64,
    pub total_recordings: i64,
    pub total_speakers: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub upcoming_sessions: Vec<SessionDetail>,
    pub recent_recordings: Vec<RecordingDetail>,
    pub stats: HomeStats,
}

impl Store {
    pub async fn home_stats(&self) -> Result<HomeStats> {
        let (total_sessions, total_recordings, total_speakers): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM sessions WHERE status IN ('published', 'completed')),
                (SELECT COUNT(*) FROM recordings),
                (SELECT COUNT(*) FROM speakers)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(HomeStats {
            total_sessions,
            total_recordings,
            total_speakers,
        })
    }

    pub async fn home(&self) -> Result<HomePage> {
        let upcoming = self
            .list_sessions(
                SessionListing::Upcoming,
                &SessionFilter::default(),
                1,
                HOME_SECTION_SIZE,
            )
            .await?;

        Ok(HomePage {
            upcoming_sessions: upcoming.items,
            recent_recordings: self.recent_recordings(HOME_SECTION_SIZE).await?,
            stats: self.home_stats().await?,
        })
    }
}
