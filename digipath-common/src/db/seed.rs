//! Startup seeding: bootstrap admin account and default taxonomy

use sqlx::SqlitePool;
use tracing::info;

use crate::api::auth::hash_password;
use crate::config::BootstrapAdmin;
use crate::models::{AdminRole, TagCategory};
use crate::{time, uuid_utils, Result};

pub const DEFAULT_ORGAN_TAGS: &[&str] = &[
    "Breast",
    "Lung",
    "Gastrointestinal",
    "Gynecology",
    "Hematopathology",
    "Neuropathology",
    "Head & Neck",
    "Soft Tissue",
    "Bone",
    "Kidney",
    "Urinary Bladder",
    "Liver",
    "Skin",
    "Endocrine",
    "General",
];

pub const DEFAULT_TYPE_TAGS: &[&str] = &[
    "Live Case Discussion",
    "Journal Club",
    "Lecture",
    "Quiz",
    "Tutorial",
    "Workshop",
    "Grand Round",
    "Case Series",
];

pub const DEFAULT_LEVEL_TAGS: &[&str] = &["Beginner", "Intermediate", "Advanced", "Expert", "All Levels"];

/// Create the bootstrap admin unless an account with that email exists
///
/// Returns `true` when a new account was inserted. An existing account's
/// password is left untouched.
pub async fn ensure_admin_user(pool: &SqlitePool, admin: &BootstrapAdmin) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM admin_users WHERE email = ?)")
        .bind(&admin.email)
        .fetch_one(pool)
        .await?;
    if exists {
        return Ok(false);
    }

    let password_hash = hash_password(&admin.password)?;
    let now = time::now();
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO admin_users (id, name, email, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate().to_string())
    .bind(&admin.name)
    .bind(&admin.email)
    .bind(password_hash)
    .bind(AdminRole::SuperAdmin.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        info!("Created bootstrap admin account {}", admin.email);
    }
    Ok(inserted > 0)
}

/// Insert the default organ/type/level tags when the tag table is empty
///
/// Returns the number of tags inserted (0 when tags already exist).
pub async fn seed_default_tags(pool: &SqlitePool) -> Result<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let now = time::now();
    let mut inserted = 0;

    for (category, labels) in [
        (TagCategory::Organ, DEFAULT_ORGAN_TAGS),
        (TagCategory::Type, DEFAULT_TYPE_TAGS),
        (TagCategory::Level, DEFAULT_LEVEL_TAGS),
    ] {
        for label in labels {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO tags (id, label, category, is_active, created_at, updated_at)
                VALUES (?, ?, ?, 1, ?, ?)
                "#,
            )
            .bind(uuid_utils::generate().to_string())
            .bind(*label)
            .bind(category.as_str())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
        }
    }

    tx.commit().await?;
    info!("Seeded {} default tags", inserted);
    Ok(inserted)
}
