//! Session entity, lifecycle transitions and listings

use chrono::NaiveDate;
use digipath_common::lifecycle::{
    apply_update, check_complete, check_publish, check_tag_for_slot, check_unpublish,
    initial_status, validate_new_session, validate_youtube_url,
};
use digipath_common::models::{
    CompleteSession, NewSession, Recording, Session, SessionDetail, SessionFilter, SessionStatus,
    SessionUpdate, Speaker, Tag, TagCategory,
};
use digipath_common::{time, uuid_utils, Error};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::recordings::attach_recording;
use super::speakers::fetch_speaker;
use super::tags::fetch_tag;
use super::{like_pattern, rows, Result, StatusChange, Store};
use crate::pagination::{calculate_pagination, Page};

/// Slice of sessions a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionListing {
    /// Every session, newest first
    All,
    /// Published sessions dated today or later, soonest first
    Upcoming,
    /// Sessions dated before today, newest first
    Past,
}

pub(crate) async fn fetch_session<'e, E>(ex: E, id: Uuid) -> Result<Option<Session>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM sessions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(ex)
        .await?
        .map(|row| rows::session(&row))
        .transpose()
}

pub(crate) async fn has_recording<'e, E>(ex: E, session_id: Uuid) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recordings WHERE session_id = ?)")
        .bind(session_id.to_string())
        .fetch_one(ex)
        .await?;
    Ok(exists)
}

pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: SessionStatus,
) -> Result<()> {
    sqlx::query("UPDATE sessions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(time::now())
        .bind(id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

async fn require_session(conn: &mut SqliteConnection, id: Uuid) -> Result<Session> {
    fetch_session(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Session {}", id)))
}

async fn require_speaker(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    fetch_speaker(conn, id)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("Speaker {}", id)))
}

async fn require_tag_for_slot(conn: &mut SqliteConnection, slot: TagCategory, id: Uuid) -> Result<()> {
    let tag = fetch_tag(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))?;
    check_tag_for_slot(&tag, slot)
}

fn push_conditions(
    qb: &mut QueryBuilder<'_, Sqlite>,
    listing: SessionListing,
    filter: &SessionFilter,
    today: NaiveDate,
) {
    match listing {
        SessionListing::All => {}
        SessionListing::Upcoming => {
            qb.push(" AND s.status = ").push_bind(SessionStatus::Published.as_str());
            qb.push(" AND s.date >= ").push_bind(today);
        }
        SessionListing::Past => {
            qb.push(" AND s.date < ").push_bind(today);
        }
    }

    if listing != SessionListing::Upcoming {
        if let Some(status) = filter.status {
            qb.push(" AND s.status = ").push_bind(status.as_str());
        }
    }
    if let Some(id) = filter.speaker_id {
        qb.push(" AND s.speaker_id = ").push_bind(id.to_string());
    }
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

    if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (s.title LIKE ").push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR s.summary LIKE ").push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR s.abstract LIKE ").push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR sp.name LIKE ").push_bind(pattern.clone());
        qb.push(
            " ESCAPE '\\' OR EXISTS (SELECT 1 FROM tags t WHERE t.id IN (s.organ_tag_id, s.type_tag_id, s.level_tag_id) AND t.label LIKE ",
        )
        .push_bind(pattern);
        qb.push(" ESCAPE '\\'))");
    }
}

const LISTING_FROM: &str = " FROM sessions s JOIN speakers sp ON sp.id = s.speaker_id WHERE 1 = 1";

impl Store {
    /// Create a session after every field, reference and status gate passes
    pub async fn create_session(&self, new: NewSession, created_by: Uuid) -> Result<SessionDetail> {
        let new = validate_new_session(new)?;
        let status = initial_status(new.status, new.meeting_link.as_deref())?;

        let mut w = self.begin_write().await?;
        require_speaker(&mut w.tx, new.speaker_id).await?;
        for (slot, tag_id) in new.tag_slots() {
            require_tag_for_slot(&mut w.tx, slot, tag_id).await?;
        }

        let id = uuid_utils::generate();
        let now = time::now();
        sqlx::query(
            r#"
            INSERT INTO sessions (id, title, summary, abstract, objectives, date, time,
                duration_minutes, status, platform, meeting_link, meeting_id, meeting_password,
                speaker_id, organ_tag_id, type_tag_id, level_tag_id, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&new.title)
        .bind(&new.summary)
        .bind(&new.abstract_text)
        .bind(rows::objectives_json(&new.objectives)?)
        .bind(new.date)
        .bind(new.time)
        .bind(new.duration_minutes)
        .bind(status.as_str())
        .bind(&new.platform)
        .bind(&new.meeting_link)
        .bind(&new.meeting_id)
        .bind(&new.meeting_password)
        .bind(new.speaker_id.to_string())
        .bind(new.organ_tag_id.to_string())
        .bind(new.type_tag_id.to_string())
        .bind(new.level_tag_id.to_string())
        .bind(created_by.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *w.tx)
        .await?;
        w.commit().await?;

        info!("Created {} session '{}' ({})", status, new.title, id);
        self.get_session(id).await
    }

    /// Session with speaker, tags and recording resolved
    pub async fn get_session(&self, id: Uuid) -> Result<SessionDetail> {
        let session = fetch_session(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session {}", id)))?;
        let mut details = self.hydrate(vec![session]).await?;
        details
            .pop()
            .ok_or_else(|| Error::Internal(format!("Session {} vanished while loading", id)))
    }

    /// Session visible on the public site (published or completed)
    pub async fn public_session(&self, id: Uuid) -> Result<SessionDetail> {
        let detail = self.get_session(id).await?;
        if detail.session.status == SessionStatus::Draft {
            return Err(Error::NotFound(format!("Session {}", id)));
        }
        Ok(detail)
    }

    pub async fn update_session(&self, id: Uuid, update: SessionUpdate) -> Result<SessionDetail> {
        let mut w = self.begin_write().await?;
        let current = require_session(&mut w.tx, id).await?;

        let changed_slots: Vec<(TagCategory, Uuid)> = update
            .tag_slots()
            .into_iter()
            .filter(|(slot, tag_id)| current.tag_id(*slot) != *tag_id)
            .collect();
        let speaker_changed = update.speaker_id.filter(|s| *s != current.speaker_id);

        let next = apply_update(&current, update)?;
        if let Some(speaker_id) = speaker_changed {
            require_speaker(&mut w.tx, speaker_id).await?;
        }
        for (slot, tag_id) in changed_slots {
            require_tag_for_slot(&mut w.tx, slot, tag_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE sessions
            SET title = ?, summary = ?, abstract = ?, objectives = ?, date = ?, time = ?,
                duration_minutes = ?, platform = ?, meeting_link = ?, meeting_id = ?,
                meeting_password = ?, speaker_id = ?, organ_tag_id = ?, type_tag_id = ?,
                level_tag_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&next.title)
        .bind(&next.summary)
        .bind(&next.abstract_text)
        .bind(rows::objectives_json(&next.objectives)?)
        .bind(next.date)
        .bind(next.time)
        .bind(next.duration_minutes)
        .bind(&next.platform)
        .bind(&next.meeting_link)
        .bind(&next.meeting_id)
        .bind(&next.meeting_password)
        .bind(next.speaker_id.to_string())
        .bind(next.organ_tag_id.to_string())
        .bind(next.type_tag_id.to_string())
        .bind(next.level_tag_id.to_string())
        .bind(time::now())
        .bind(id.to_string())
        .execute(&mut *w.tx)
        .await?;
        w.commit().await?;

        self.get_session(id).await
    }

    /// draft → published
    pub async fn publish_session(&self, id: Uuid) -> Result<StatusChange> {
        let mut w = self.begin_write().await?;
        let session = require_session(&mut w.tx, id).await?;
        check_publish(&session)?;
        set_status(&mut w.tx, id, SessionStatus::Published).await?;
        w.commit().await?;

        info!("Published session {}", id);
        Ok(StatusChange {
            detail: self.get_session(id).await?,
            from: session.status,
        })
    }

    /// published → draft
    pub async fn unpublish_session(&self, id: Uuid) -> Result<StatusChange> {
        let mut w = self.begin_write().await?;
        let session = require_session(&mut w.tx, id).await?;
        check_unpublish(&session)?;
        set_status(&mut w.tx, id, SessionStatus::Draft).await?;
        w.commit().await?;

        info!("Unpublished session {}", id);
        Ok(StatusChange {
            detail: self.get_session(id).await?,
            from: session.status,
        })
    }

    /// Attach the recording and mark the session completed, atomically
    pub async fn complete_session(&self, id: Uuid, request: CompleteSession) -> Result<StatusChange> {
        let youtube_url = validate_youtube_url(&request.youtube_url)?;

        let mut w = self.begin_write().await?;
        let session = require_session(&mut w.tx, id).await?;
        let recorded = has_recording(&mut *w.tx, id).await?;
        check_complete(&session, recorded)?;

        attach_recording(&mut w.tx, &session, youtube_url, request.pdf_url, request.recorded_date).await?;
        set_status(&mut w.tx, id, SessionStatus::Completed).await?;
        w.commit().await?;

        info!("Completed session {} (was {})", id, session.status);
        Ok(StatusChange {
            detail: self.get_session(id).await?,
            from: session.status,
        })
    }

    /// Delete a session in any status; its recording goes with it
    pub async fn delete_session(&self, id: Uuid) -> Result<()> {
        let mut w = self.begin_write().await?;
        let deleted = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *w.tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::NotFound(format!("Session {}", id)));
        }
        w.commit().await?;

        info!("Deleted session {}", id);
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        listing: SessionListing,
        filter: &SessionFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Page<SessionDetail>> {
        let today = time::today();

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
        count.push(LISTING_FROM);
        push_conditions(&mut count, listing, filter, today);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let pagination = calculate_pagination(total, page, per_page);

        let mut select = QueryBuilder::<Sqlite>::new("SELECT s.*");
        select.push(LISTING_FROM);
        push_conditions(&mut select, listing, filter, today);
        select.push(match listing {
            SessionListing::Upcoming => " ORDER BY s.date ASC, s.time ASC",
            SessionListing::All | SessionListing::Past => " ORDER BY s.date DESC, s.time DESC",
        });
        select
            .push(" LIMIT ")
            .push_bind(pagination.per_page)
            .push(" OFFSET ")
            .push_bind(pagination.offset);

        let sessions = select
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(rows::session)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(self.hydrate(sessions).await?, total, pagination))
    }

    /// Resolve speakers, tags and recordings for a batch of sessions
    ///
    /// `has_recording` is derived from the recordings lookup.
    pub(crate) async fn hydrate(&self, sessions: Vec<Session>) -> Result<Vec<SessionDetail>> {
        let speaker_ids: Vec<Uuid> = sessions.iter().map(|s| s.speaker_id).collect();
        let tag_ids: Vec<Uuid> = sessions
            .iter()
            .flat_map(|s| [s.organ_tag_id, s.type_tag_id, s.level_tag_id])
            .collect();
        let session_ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();

        let speakers: HashMap<Uuid, Speaker> = self
            .fetch_in("SELECT * FROM speakers WHERE id IN (", &speaker_ids, rows::speaker)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let tags: HashMap<Uuid, Tag> = self
            .fetch_in("SELECT * FROM tags WHERE id IN (", &tag_ids, rows::tag)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let recordings: HashMap<Uuid, Recording> = self
            .fetch_in("SELECT * FROM recordings WHERE session_id IN (", &session_ids, rows::recording)
            .await?
            .into_iter()
            .map(|r| (r.session_id, r))
            .collect();

        Ok(sessions
            .into_iter()
            .map(|session| {
                let recording = recordings.get(&session.id).cloned();
                SessionDetail {
                    speaker: speakers.get(&session.speaker_id).cloned(),
                    organ_tag: tags.get(&session.organ_tag_id).cloned(),
                    type_tag: tags.get(&session.type_tag_id).cloned(),
                    level_tag: tags.get(&session.level_tag_id).cloned(),
                    has_recording: recording.is_some(),
                    recording,
                    session,
                }
            })
            .collect())
    }

    /// Rows whose key is in `ids`; `prefix` ends with `IN (`
    pub(crate) async fn fetch_in<T>(
        &self,
        prefix: &str,
        ids: &[Uuid],
        decode: fn(&SqliteRow) -> Result<T>,
    ) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut unique: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        unique.sort();
        unique.dedup();

        let mut qb = QueryBuilder::<Sqlite>::new(prefix);
        let mut separated = qb.separated(", ");
        for id in unique {
            separated.push_bind(id);
        }
        qb.push(")");

        qb.build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(decode)
            .collect()
    }
}
