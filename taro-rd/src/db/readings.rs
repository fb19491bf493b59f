//! Reading persistence
//!
//! Each pipeline stage writes only its own fields: one UPDATE per field
//! group, so partial results are never clobbered and a concurrent status
//! poll sees complete stages.

use sqlx::{Row, SqlitePool};
use taro_common::Result;

use crate::models::{Reading, SubmitRequest, Timeframe};

/// Create the empty reading row for a session, returning its id
pub async fn create_reading(pool: &SqlitePool, session_id: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO readings (session_id) VALUES (?)")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Load the reading owned by a session
pub async fn get_by_session(pool: &SqlitePool, session_id: &str) -> Result<Option<Reading>> {
    let row = sqlx::query(
        r#"
        SELECT id, session_id, category_code, topic_code, question_text, reader_type,
               past_interpretation, present_interpretation, future_interpretation,
               summary, fortune_score, result_image_url, result_image_text
        FROM readings WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Reading {
        id: row.get("id"),
        session_id: row.get("session_id"),
        category_code: row.get("category_code"),
        topic_code: row.get("topic_code"),
        question_text: row.get("question_text"),
        reader_type: row.get("reader_type"),
        past_interpretation: row.get("past_interpretation"),
        present_interpretation: row.get("present_interpretation"),
        future_interpretation: row.get("future_interpretation"),
        summary: row.get("summary"),
        fortune_score: row.get("fortune_score"),
        result_image_url: row.get("result_image_url"),
        result_image_text: row.get("result_image_text"),
    }))
}

/// Persist the finalized submit request fields
pub async fn update_request_fields(
    pool: &SqlitePool,
    reading_id: i64,
    request: &SubmitRequest,
) -> Result<()> {
    sqlx::query(
        "UPDATE readings
         SET category_code = ?, topic_code = ?, question_text = ?, reader_type = ?
         WHERE id = ?",
    )
    .bind(&request.category_code)
    .bind(&request.topic_code)
    .bind(&request.question_text)
    .bind(&request.reader_type)
    .bind(reading_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist one timeframe's interpretation
pub async fn update_interpretation(
    pool: &SqlitePool,
    reading_id: i64,
    timeframe: Timeframe,
    text: &str,
) -> Result<()> {
    let sql = match timeframe {
        Timeframe::Past => "UPDATE readings SET past_interpretation = ? WHERE id = ?",
        Timeframe::Present => "UPDATE readings SET present_interpretation = ? WHERE id = ?",
        Timeframe::Future => "UPDATE readings SET future_interpretation = ? WHERE id = ?",
    };
    sqlx::query(sql).bind(text).bind(reading_id).execute(pool).await?;
    Ok(())
}

/// Persist the summary text
pub async fn update_summary(pool: &SqlitePool, reading_id: i64, summary: &str) -> Result<()> {
    sqlx::query("UPDATE readings SET summary = ? WHERE id = ?")
        .bind(summary)
        .bind(reading_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist the fortune score
pub async fn update_fortune_score(pool: &SqlitePool, reading_id: i64, score: i64) -> Result<()> {
    sqlx::query("UPDATE readings SET fortune_score = ? WHERE id = ?")
        .bind(score)
        .bind(reading_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist the result image reference
pub async fn update_result_image(
    pool: &SqlitePool,
    reading_id: i64,
    url: &str,
    description: &str,
) -> Result<()> {
    sqlx::query("UPDATE readings SET result_image_url = ?, result_image_text = ? WHERE id = ?")
        .bind(url)
        .bind(description)
        .bind(reading_id)
        .execute(pool)
        .await?;
    Ok(())
}
