//! Tag registry and usage index

use digipath_common::lifecycle::normalize_label;
use digipath_common::models::{GroupedTags, NewTag, Tag, TagCategory, TagDeletion, TagUpdate, TagUsage};
use digipath_common::{time, uuid_utils, Error};
use sqlx::{Executor, Sqlite};
use tracing::info;
use uuid::Uuid;

use super::{conflict_on_unique, rows, Result, Store};

pub(crate) async fn fetch_tag<'e, E>(ex: E, id: Uuid) -> Result<Option<Tag>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("SELECT * FROM tags WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(ex)
        .await?
        .map(|row| rows::tag(&row))
        .transpose()
}

/// Sessions referencing `id` in any of the three tag slots
pub(crate) async fn usage_count<'e, E>(ex: E, id: Uuid) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = id.to_string();
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sessions WHERE organ_tag_id = ? OR type_tag_id = ? OR level_tag_id = ?",
    )
    .bind(&id)
    .bind(&id)
    .bind(&id)
    .fetch_one(ex)
    .await?;
    Ok(count)
}

async fn label_taken<'e, E>(ex: E, category: TagCategory, label: &str, except: Option<Uuid>) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let taken = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE category = ? AND label = ? COLLATE NOCASE AND id != ?)",
    )
    .bind(category.as_str())
    .bind(label)
    .bind(except.map(|id| id.to_string()).unwrap_or_default())
    .fetch_one(ex)
    .await?;
    Ok(taken)
}

fn duplicate_label(category: TagCategory, label: &str) -> String {
    format!("A {} tag labelled '{}' already exists", category, label)
}

impl Store {
    pub async fn create_tag(&self, new: NewTag) -> Result<Tag> {
        let label = normalize_label(&new.label)?;

        let mut w = self.begin_write().await?;
        if label_taken(&mut *w.tx, new.category, &label, None).await? {
            return Err(Error::Conflict(duplicate_label(new.category, &label)));
        }

        let now = time::now();
        let tag = Tag {
            id: uuid_utils::generate(),
            label,
            category: new.category,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tags (id, label, category, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tag.id.to_string())
        .bind(&tag.label)
        .bind(tag.category.as_str())
        .bind(tag.is_active)
        .bind(tag.created_at)
        .bind(tag.updated_at)
        .execute(&mut *w.tx)
        .await
        .map_err(|e| conflict_on_unique(e, duplicate_label(tag.category, &tag.label)))?;

        w.commit().await?;
        info!("Created {} tag '{}' ({})", tag.category, tag.label, tag.id);
        Ok(tag)
    }

    pub async fn get_tag(&self, id: Uuid) -> Result<Tag> {
        fetch_tag(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))
    }

    /// Tags ordered by category then label
    pub async fn list_tags(&self, category: Option<TagCategory>, active_only: bool) -> Result<Vec<Tag>> {
        let mut qb = sqlx::QueryBuilder::<Sqlite>::new("SELECT * FROM tags WHERE 1 = 1");
        if let Some(category) = category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        if active_only {
            qb.push(" AND is_active = 1");
        }
        qb.push(
            " ORDER BY CASE category WHEN 'organ' THEN 0 WHEN 'type' THEN 1 ELSE 2 END, label COLLATE NOCASE",
        );

        qb.build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(rows::tag)
            .collect()
    }

    /// Active tags grouped by category (public taxonomy)
    pub async fn active_tags_grouped(&self) -> Result<GroupedTags> {
        let mut grouped = GroupedTags::default();
        for tag in self.list_tags(None, true).await? {
            grouped.push(tag);
        }
        Ok(grouped)
    }

    /// Rename and/or (de)activate a tag; the category never changes
    pub async fn update_tag(&self, id: Uuid, update: TagUpdate) -> Result<Tag> {
        let label = update.label.as_deref().map(normalize_label).transpose()?;

        let mut w = self.begin_write().await?;
        let mut tag = fetch_tag(&mut *w.tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))?;

        if let Some(label) = label {
            if label_taken(&mut *w.tx, tag.category, &label, Some(id)).await? {
                return Err(Error::Conflict(duplicate_label(tag.category, &label)));
            }
            tag.label = label;
        }
        if let Some(is_active) = update.is_active {
            tag.is_active = is_active;
        }
        tag.updated_at = time::now();

        sqlx::query("UPDATE tags SET label = ?, is_active = ?, updated_at = ? WHERE id = ?")
            .bind(&tag.label)
            .bind(tag.is_active)
            .bind(tag.updated_at)
            .bind(id.to_string())
            .execute(&mut *w.tx)
            .await
            .map_err(|e| conflict_on_unique(e, duplicate_label(tag.category, &tag.label)))?;

        w.commit().await?;
        Ok(tag)
    }

    /// Hide a tag from new selections; existing references stay as they are
    pub async fn deactivate_tag(&self, id: Uuid) -> Result<Tag> {
        self.update_tag(
            id,
            TagUpdate {
                label: None,
                is_active: Some(false),
            },
        )
        .await
    }

    pub async fn tag_usage(&self, id: Uuid) -> Result<TagUsage> {
        let tag = self.get_tag(id).await?;
        let usage_count = usage_count(&self.pool, id).await?;
        Ok(TagUsage {
            tag_id: tag.id,
            category: tag.category,
            label: tag.label,
            usage_count,
            can_delete: usage_count == 0,
        })
    }

    /// Delete a tag, repointing its sessions to `replace_with` when in use
    ///
    /// The replacement is validated whenever it is supplied, before any
    /// usage logic. Reassignment and delete commit together or not at all.
    pub async fn delete_tag(&self, id: Uuid, replace_with: Option<Uuid>) -> Result<TagDeletion> {
        let mut w = self.begin_write().await?;

        let tag = fetch_tag(&mut *w.tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))?;

        if let Some(replacement_id) = replace_with {
            if replacement_id == id {
                return Err(Error::Validation(
                    "A tag cannot be replaced with itself".to_string(),
                ));
            }
            let replacement = fetch_tag(&mut *w.tx, replacement_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Replacement tag {}", replacement_id)))?;
            if replacement.category != tag.category {
                return Err(Error::Validation(format!(
                    "Replacement tag '{}' is a {} tag, expected {}",
                    replacement.label, replacement.category, tag.category
                )));
            }
        }

        let usage = usage_count(&mut *w.tx, id).await?;
        let mut reassigned_sessions = 0;

        if usage > 0 {
            let Some(replacement_id) = replace_with else {
                return Err(Error::Conflict(format!(
                    "Tag '{}' is used by {} session(s); supply a replacement tag",
                    tag.label, usage
                )));
            };

            let now = time::now();
            for category in TagCategory::ALL {
                let column = category.session_column();
                sqlx::query(&format!(
                    "UPDATE sessions SET {column} = ?, updated_at = ? WHERE {column} = ?"
                ))
                .bind(replacement_id.to_string())
                .bind(now)
                .bind(id.to_string())
                .execute(&mut *w.tx)
                .await?;
            }
            reassigned_sessions = usage as u64;

            let remaining = usage_count(&mut *w.tx, id).await?;
            if remaining != 0 {
                return Err(Error::Internal(format!(
                    "Tag {} still referenced by {} session(s) after reassignment",
                    id, remaining
                )));
            }
        }

        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *w.tx)
            .await?;

        w.commit().await?;
        info!(
            "Deleted tag '{}' ({}), {} session(s) reassigned",
            tag.label, id, reassigned_sessions
        );

        Ok(TagDeletion {
            tag_id: id,
            replaced_with: replace_with,
            reassigned_sessions,
        })
    }
}
