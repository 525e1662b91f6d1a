//! Speaker registry

use digipath_common::lifecycle::{normalize_optional, require_text};
use digipath_common::models::{NewSpeaker, Speaker, SpeakerUpdate};
use digipath_common::{time, uuid_utils, Error};
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

use super::{rows, Result, Store};

pub(crate) async fn fetch_speaker<'e, E>(ex: E, id: Uuid) -> Result<Option<Speaker>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM speakers WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(ex)
        .await?
        .map(|row| rows::speaker(&row))
        .transpose()
}

impl Store {
    pub async fn create_speaker(&self, new: NewSpeaker) -> Result<Speaker> {
        let now = time::now();
        let speaker = Speaker {
            id: uuid_utils::generate(),
            name: require_text("name", &new.name)?,
            title: require_text("title", &new.title)?,
            affiliation: require_text("affiliation", &new.affiliation)?,
            bio: normalize_optional(new.bio),
            image_url: normalize_optional(new.image_url),
            created_at: now,
            updated_at: now,
        };

        let mut w = self.begin_write().await?;
        sqlx::query(
            r#"
            INSERT INTO speakers (id, name, title, affiliation, bio, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(speaker.id.to_string())
        .bind(&speaker.name)
        .bind(&speaker.title)
        .bind(&speaker.affiliation)
        .bind(&speaker.bio)
        .bind(&speaker.image_url)
        .bind(speaker.created_at)
        .bind(speaker.updated_at)
        .execute(&mut *w.tx)
        .await?;
        w.commit().await?;

        Ok(speaker)
    }

    pub async fn get_speaker(&self, id: Uuid) -> Result<Speaker> {
        fetch_speaker(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Speaker {}", id)))
    }

    pub async fn list_speakers(&self) -> Result<Vec<Speaker>> {
        sqlx::query("SELECT * FROM speakers ORDER BY name COLLATE NOCASE")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(rows::speaker)
            .collect()
    }

    pub async fn update_speaker(&self, id: Uuid, update: SpeakerUpdate) -> Result<Speaker> {
        let mut w = self.begin_write().await?;
        let mut speaker = fetch_speaker(&mut *w.tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Speaker {}", id)))?;

        if let Some(name) = update.name {
            speaker.name = require_text("name", &name)?;
        }
        if let Some(title) = update.title {
            speaker.title = require_text("title", &title)?;
        }
        if let Some(affiliation) = update.affiliation {
            speaker.affiliation = require_text("affiliation", &affiliation)?;
        }
        if let Some(bio) = update.bio {
            speaker.bio = normalize_optional(bio);
        }
        if let Some(image_url) = update.image_url {
            speaker.image_url = normalize_optional(image_url);
        }
        speaker.updated_at = time::now();

        sqlx::query(
            r#"
            UPDATE speakers
            SET name = ?, title = ?, affiliation = ?, bio = ?, image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&speaker.name)
        .bind(&speaker.title)
        .bind(&speaker.affiliation)
        .bind(&speaker.bio)
        .bind(&speaker.image_url)
        .bind(speaker.updated_at)
        .bind(id.to_string())
        .execute(&mut *w.tx)
        .await?;
        w.commit().await?;

        Ok(speaker)
    }

    /// Delete an unreferenced speaker
    pub async fn delete_speaker(&self, id: Uuid) -> Result<()> {
        let mut w = self.begin_write().await?;
        let speaker = fetch_speaker(&mut *w.tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Speaker {}", id)))?;

        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE speaker_id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *w.tx)
            .await?;
        if sessions > 0 {
            return Err(Error::Conflict(format!(
                "Speaker '{}' is assigned to {} session(s)",
                speaker.name, sessions
            )));
        }

        sqlx::query("DELETE FROM speakers WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *w.tx)
            .await?;
        w.commit().await
    }
}
