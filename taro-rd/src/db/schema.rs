//! Table creation for taro-rd

use sqlx::SqlitePool;
use taro_common::Result;

/// Create taro-rd tables if they don't exist
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            nickname TEXT,
            status TEXT NOT NULL,
            stage TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL UNIQUE REFERENCES sessions(session_id),
            category_code TEXT,
            topic_code TEXT,
            question_text TEXT,
            reader_type TEXT,
            past_interpretation TEXT,
            present_interpretation TEXT,
            future_interpretation TEXT,
            summary TEXT,
            fortune_score INTEGER,
            result_image_url TEXT,
            result_image_text TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            meaning_upright TEXT NOT NULL,
            meaning_reversed TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drawn_cards (
            reading_id INTEGER NOT NULL REFERENCES readings(id),
            position INTEGER NOT NULL,
            card_id INTEGER NOT NULL REFERENCES cards(id),
            orientation TEXT NOT NULL,
            PRIMARY KEY (reading_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
