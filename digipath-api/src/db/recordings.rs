//! Recordings and the session completion they drive

use chrono::NaiveDate;
use digipath_common::lifecycle::{
    check_complete, normalize_optional, status_without_recording, validate_youtube_url,
};
use digipath_common::models::{
    youtube_thumbnail_url, NewRecording, Recording, RecordingDetail, RecordingFilter,
    RecordingSort, RecordingUpdate, Session, SessionStatus, SessionSummary, TagCategory,
};
use digipath_common::{time, uuid_utils, Error};
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::sessions::{fetch_session, has_recording, set_status};
use super::{rows, Result, StatusChange, Store};
use crate::pagination::{calculate_pagination, Page};

async fn fetch_recording<'e, E>(ex: E, id: Uuid) -> Result<Option<Recording>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM recordings WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(ex)
        .await?
        .map(|row| rows::recording(&row))
        .transpose()
}

/// Insert the recording row for `session`
///
/// The caller has already checked the session may take a recording and
/// sets the completed status in the same transaction.
pub(crate) async fn attach_recording(
    conn: &mut SqliteConnection,
    session: &Session,
    youtube_url: String,
    pdf_url: Option<String>,
    recorded_date: Option<NaiveDate>,
) -> Result<Recording> {
    let now = time::now();
    let recording = Recording {
        id: uuid_utils::generate(),
        session_id: session.id,
        thumbnail_url: youtube_thumbnail_url(&youtube_url),
        youtube_url,
        pdf_url: normalize_optional(pdf_url),
        recorded_date: recorded_date.unwrap_or(session.date),
        views_count: 0,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO recordings (id, session_id, youtube_url, pdf_url, thumbnail_url,
            recorded_date, views_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recording.id.to_string())
    .bind(recording.session_id.to_string())
    .bind(&recording.youtube_url)
    .bind(&recording.pdf_url)
    .bind(&recording.thumbnail_url)
    .bind(recording.recorded_date)
    .bind(recording.views_count)
    .bind(recording.created_at)
    .bind(recording.updated_at)
    .execute(conn)
    .await?;

    Ok(recording)
}

impl Store {
    /// Attach a recording to a session, completing it
    pub async fn add_recording(&self, new: NewRecording) -> Result<(Recording, StatusChange)> {
        let youtube_url = validate_youtube_url(&new.youtube_url)?;

        let mut w = self.begin_write().await?;
        let session = fetch_session(&mut *w.tx, new.session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session {}", new.session_id)))?;
        let recorded = has_recording(&mut *w.tx, session.id).await?;
        check_complete(&session, recorded)?;

        let recording =
            attach_recording(&mut w.tx, &session, youtube_url, new.pdf_url, new.recorded_date).await?;
        set_status(&mut w.tx, session.id, SessionStatus::Completed).await?;
        w.commit().await?;

        info!(
            "Recording {} attached to session {} (was {})",
            recording.id, session.id, session.status
        );
        let change = StatusChange {
            detail: self.get_session(session.id).await?,
            from: session.status,
        };
        Ok((recording, change))
    }

    pub async fn get_recording(&self, id: Uuid) -> Result<RecordingDetail> {
        let recording = fetch_recording(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recording {}", id)))?;
        let mut details = self.recording_details(vec![recording]).await?;
        details
            .pop()
            .ok_or_else(|| Error::Internal(format!("Recording {} vanished while loading", id)))
    }

    /// Count a view and return the recording
    pub async fn view_recording(&self, id: Uuid) -> Result<RecordingDetail> {
        let mut w = self.begin_write().await?;
        let updated = sqlx::query("UPDATE recordings SET views_count = views_count + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *w.tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(Error::NotFound(format!("Recording {}", id)));
        }
        w.commit().await?;

        self.get_recording(id).await
    }

    /// Edit links or date; the view counter is kept
    pub async fn update_recording(&self, id: Uuid, update: RecordingUpdate) -> Result<Recording> {
        let youtube_url = update
            .youtube_url
            .as_deref()
            .map(validate_youtube_url)
            .transpose()?;

        let mut w = self.begin_write().await?;
        let mut recording = fetch_recording(&mut *w.tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recording {}", id)))?;

        if let Some(url) = youtube_url {
            recording.thumbnail_url = youtube_thumbnail_url(&url);
            recording.youtube_url = url;
        }
        if let Some(pdf_url) = update.pdf_url {
            recording.pdf_url = normalize_optional(pdf_url);
        }
        if let Some(date) = update.recorded_date {
            recording.recorded_date = date;
        }
        recording.updated_at = time::now();

        sqlx::query(
            r#"
            UPDATE recordings
            SET youtube_url = ?, pdf_url = ?, thumbnail_url = ?, recorded_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&recording.youtube_url)
        .bind(&recording.pdf_url)
        .bind(&recording.thumbnail_url)
        .bind(recording.recorded_date)
        .bind(recording.updated_at)
        .bind(id.to_string())
        .execute(&mut *w.tx)
        .await?;
        w.commit().await?;

        Ok(recording)
    }

    /// Remove a recording; its session leaves the completed state
    pub async fn delete_recording(&self, id: Uuid) -> Result<(Recording, StatusChange)> {
        let mut w = self.begin_write().await?;
        let recording = fetch_recording(&mut *w.tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recording {}", id)))?;
        let session = fetch_session(&mut *w.tx, recording.session_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Recording {} has no session", id)))?;

        sqlx::query("DELETE FROM recordings WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *w.tx)
            .await?;
        let reverted = status_without_recording(&session);
        set_status(&mut w.tx, session.id, reverted).await?;
        w.commit().await?;

        info!(
            "Deleted recording {}; session {} reverted to {}",
            id, session.id, reverted
        );
        let change = StatusChange {
            detail: self.get_session(session.id).await?,
            from: session.status,
        };
        Ok((recording, change))
    }

    /// Recording library, filtered by the session's tags
    pub async fn list_recordings(
        &self,
        filter: &RecordingFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Page<RecordingDetail>> {
        fn push_conditions(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RecordingFilter) {
            for (category, id) in [
                (TagCategory::Organ, filter.organ_tag_id),
                (TagCategory::Type, filter.type_tag_id),
                (TagCategory::Level, filter.level_tag_id),
            ] {
                if let Some(id) = id {
                    qb.push(format!(" AND s.{} = ", category.session_column()))
                        .push_bind(id.to_string());
                }
            }
        }

        const FROM: &str = " FROM recordings r JOIN sessions s ON s.id = r.session_id WHERE 1 = 1";

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
        count.push(FROM);
        push_conditions(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let pagination = calculate_pagination(total, page, per_page);

        let mut select = QueryBuilder::<Sqlite>::new("SELECT r.*");
        select.push(FROM);
        push_conditions(&mut select, filter);
        select.push(match filter.sort {
            RecordingSort::Recent => " ORDER BY r.recorded_date DESC, r.created_at DESC",
            RecordingSort::Views => " ORDER BY r.views_count DESC, r.recorded_date DESC",
        });
        select
            .push(" LIMIT ")
            .push_bind(pagination.per_page)
            .push(" OFFSET ")
            .push_bind(pagination.offset);

        let recordings = select
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(rows::recording)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(
            self.recording_details(recordings).await?,
            total,
            pagination,
        ))
    }

    /// Newest recordings first
    pub async fn recent_recordings(&self, limit: i64) -> Result<Vec<RecordingDetail>> {
        let recordings = sqlx::query(
            "SELECT * FROM recordings ORDER BY recorded_date DESC, created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(rows::recording)
        .collect::<Result<Vec<_>>>()?;

        self.recording_details(recordings).await
    }

    async fn recording_details(&self, recordings: Vec<Recording>) -> Result<Vec<RecordingDetail>> {
        let session_ids: Vec<Uuid> = recordings.iter().map(|r| r.session_id).collect();
        let sessions = self
            .fetch_in("SELECT * FROM sessions WHERE id IN (", &session_ids, rows::session)
            .await?;
        let summaries: HashMap<Uuid, SessionSummary> = self
            .hydrate(sessions)
            .await?
            .iter()
            .map(|detail| (detail.session.id, SessionSummary::from(detail)))
            .collect();

        Ok(recordings
            .into_iter()
            .map(|recording| RecordingDetail {
                session: summaries.get(&recording.session_id).cloned(),
                recording,
            })
            .collect())
    }
}
