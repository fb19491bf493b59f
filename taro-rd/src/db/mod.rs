//! Database access for taro-rd
//!
//! sqlite via sqlx; tables are created at startup and the card deck is
//! seeded if empty.

pub mod cards;
pub mod readings;
pub mod sessions;

mod schema;

use sqlx::SqlitePool;
use std::path::Path;
use taro_common::Result;

/// Initialize database connection pool and bootstrap the schema
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    schema::ensure_schema(&pool).await?;
    cards::seed_deck(&pool).await?;

    Ok(pool)
}
