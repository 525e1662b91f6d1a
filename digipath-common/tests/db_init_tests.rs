//! Database initialization, seeding and schema constraints

use chrono::Utc;
use digipath_common::config::BootstrapAdmin;
use digipath_common::db::{
    ensure_admin_user, init_database, init_memory_database, seed_default_tags, DEFAULT_LEVEL_TAGS,
    DEFAULT_ORGAN_TAGS, DEFAULT_TYPE_TAGS,
};
use uuid::Uuid;

fn admin() -> BootstrapAdmin {
    BootstrapAdmin {
        email: "admin@digipath.example".into(),
        name: "Administrator".into(),
        password: "change-me".into(),
    }
}

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("digipath.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "database file was not created");

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_existing_database_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("digipath.db");

    let pool = init_database(&db_path).await.unwrap();
    seed_default_tags(&pool).await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(count > 0, "seeded tags lost on reopen");
}

#[tokio::test]
async fn test_seed_default_tags_once() {
    let pool = init_memory_database().await.unwrap();

    let inserted = seed_default_tags(&pool).await.unwrap();
    assert_eq!(
        inserted,
        DEFAULT_ORGAN_TAGS.len() + DEFAULT_TYPE_TAGS.len() + DEFAULT_LEVEL_TAGS.len()
    );
    assert_eq!(seed_default_tags(&pool).await.unwrap(), 0);

    let organs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE category = 'organ'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(organs as usize, DEFAULT_ORGAN_TAGS.len());
}

#[tokio::test]
async fn test_ensure_admin_user_idempotent() {
    let pool = init_memory_database().await.unwrap();

    assert!(ensure_admin_user(&pool, &admin()).await.unwrap());
    assert!(!ensure_admin_user(&pool, &admin()).await.unwrap());

    let (count, hash): (i64, String) =
        sqlx::query_as("SELECT COUNT(*), MAX(password_hash) FROM admin_users")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
    assert!(hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_tag_label_unique_per_category_case_insensitive() {
    let pool = init_memory_database().await.unwrap();
    let now = Utc::now();

    let insert = |label: &'static str, category: &'static str| {
        sqlx::query(
            "INSERT INTO tags (id, label, category, is_active, created_at, updated_at) VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(label)
        .bind(category)
        .bind(now)
        .bind(now)
    };

    insert("Liver", "organ").execute(&pool).await.unwrap();
    assert!(insert("LIVER", "organ").execute(&pool).await.is_err());
    insert("Liver", "type").execute(&pool).await.unwrap();
}

#[tokio::test]
async fn test_session_tag_reference_enforced() {
    let pool = init_memory_database().await.unwrap();
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO sessions (id, title, summary, abstract, objectives, date, time, duration_minutes,
            status, platform, speaker_id, organ_tag_id, type_tag_id, level_tag_id, created_by,
            created_at, updated_at)
        VALUES (?, 't', 's', 'a', '["o"]', '2030-01-01', '10:00:00', 60, 'draft', 'Zoom',
            ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await;

    assert!(result.is_err(), "dangling speaker/tag references must be rejected");
}
