//! Session persistence

use sqlx::{Row, SqlitePool};
use taro_common::{Error, Result};

use crate::models::{ProcessingStage, ReadingSession, SessionStatus};

/// Insert or update a session
pub async fn save_session(pool: &SqlitePool, session: &ReadingSession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (session_id, nickname, status, stage, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            nickname = excluded.nickname,
            status = excluded.status,
            stage = excluded.stage,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&session.session_id)
    .bind(&session.nickname)
    .bind(session.status.as_str())
    .bind(session.stage.as_str())
    .bind(session.created_at.to_rfc3339())
    .bind(session.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a session by id
pub async fn load_session(pool: &SqlitePool, session_id: &str) -> Result<Option<ReadingSession>> {
    let row = sqlx::query(
        "SELECT session_id, nickname, status, stage, created_at, updated_at
         FROM sessions WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let status: String = row.get("status");
    let status = SessionStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown session status: {}", status)))?;

    let stage: String = row.get("stage");
    let stage = ProcessingStage::parse(&stage)
        .ok_or_else(|| Error::Internal(format!("Unknown processing stage: {}", stage)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let updated_at: String = row.get("updated_at");
    let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(Some(ReadingSession {
        session_id: row.get("session_id"),
        nickname: row.get("nickname"),
        status,
        stage,
        created_at,
        updated_at,
    }))
}

/// Whether a session id is already taken
pub async fn session_exists(pool: &SqlitePool, session_id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE session_id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Advance the persisted processing stage
///
/// The transition is checked against the stage order: a regression or an
/// exit from a terminal stage writes nothing and returns Ok(false). The
/// UPDATE is conditioned on the stage that was read, so a write that lost
/// a race also returns Ok(false) instead of clobbering the newer stage.
pub async fn advance_stage(
    pool: &SqlitePool,
    session_id: &str,
    next: ProcessingStage,
) -> Result<bool> {
    let mut session = load_session(pool, session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))?;
    let previous = session.stage;
    if !session.advance_stage(next) {
        return Ok(false);
    }

    let result =
        sqlx::query("UPDATE sessions SET stage = ?, updated_at = ? WHERE session_id = ? AND stage = ?")
            .bind(next.as_str())
            .bind(session.updated_at.to_rfc3339())
            .bind(session_id)
            .bind(previous.as_str())
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Update the session lifecycle status
pub async fn update_status(
    pool: &SqlitePool,
    session_id: &str,
    status: SessionStatus,
) -> Result<()> {
    sqlx::query("UPDATE sessions SET status = ?, updated_at = ? WHERE session_id = ?")
        .bind(status.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}
