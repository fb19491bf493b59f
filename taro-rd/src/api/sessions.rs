//! Session lifecycle handlers: create, reading, submit, result

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::db;
use crate::error::ApiError;
use crate::models::{
    DrawnCardDetail, ProcessingStage, Reading, ReadingSession, SubmitRequest,
};
use crate::providers::{ImageGenerator, TextInterpreter};

const SESSION_ID_LEN: usize = 8;
const SESSION_ID_ATTEMPTS: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub position: u8,
    pub name: String,
    pub orientation: String,
}

impl From<&DrawnCardDetail> for CardView {
    fn from(detail: &DrawnCardDetail) -> Self {
        Self {
            position: detail.position,
            name: detail.card.name.clone(),
            orientation: detail.orientation.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub stage: ProcessingStage,
    pub cards: Vec<CardView>,
}

fn generate_session_id() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// POST /sessions — new session with three cards already drawn
pub async fn create_session<T, I>(
    State(state): State<AppState<T, I>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError>
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    let mut session_id = generate_session_id();
    let mut attempts = 1;
    while db::sessions::session_exists(&state.db, &session_id).await? {
        if attempts >= SESSION_ID_ATTEMPTS {
            return Err(ApiError::Internal(
                "Could not allocate a session id".to_string(),
            ));
        }
        session_id = generate_session_id();
        attempts += 1;
    }

    let session = ReadingSession::new(session_id.clone(), request.nickname);
    db::sessions::save_session(&state.db, &session).await?;

    let reading_id = db::readings::create_reading(&state.db, &session_id).await?;
    db::cards::draw_cards(&state.db, reading_id).await?;
    let cards = db::cards::list_by_reading(&state.db, reading_id).await?;

    if !db::sessions::advance_stage(&state.db, &session_id, ProcessingStage::CardsGenerated).await?
    {
        return Err(ApiError::Internal(
            "Freshly created session refused its first stage".to_string(),
        ));
    }

    info!(session_id, "Session created");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            stage: ProcessingStage::CardsGenerated,
            cards: cards.iter().map(CardView::from).collect(),
        }),
    ))
}

/// GET /sessions/:id/reading — the drawn spread
pub async fn get_reading<T, I>(
    State(state): State<AppState<T, I>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError>
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    let session = db::sessions::load_session(&state.db, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;
    let reading = require_reading(&state.db, &session_id).await?;
    let cards = db::cards::list_by_reading(&state.db, reading.id).await?;

    Ok(Json(SessionResponse {
        session_id,
        stage: session.stage,
        cards: cards.iter().map(CardView::from).collect(),
    }))
}

/// POST /sessions/:id/submit — finalize the request and start the pipeline
pub async fn submit<T, I>(
    State(state): State<AppState<T, I>>,
    Path(session_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError>
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    if request.question_text.trim().is_empty() {
        return Err(ApiError::BadRequest("question_text is required".to_string()));
    }

    let session = db::sessions::load_session(&state.db, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;
    if session.stage.is_terminal() {
        return Err(ApiError::Conflict("Session already finished".to_string()));
    }
    let reading = require_reading(&state.db, &session_id).await?;

    // The run slot is reserved before any write: a duplicate submit is
    // rejected with the stored session exactly as the first run left it.
    let run = state.pipeline.reserve(session_id.clone())?;

    db::readings::update_request_fields(&state.db, reading.id, &request).await?;
    if !db::sessions::advance_stage(&state.db, &session_id, ProcessingStage::Submitted).await? {
        return Err(ApiError::Conflict(
            "Session is past the point of submission".to_string(),
        ));
    }

    let admission = run.start().await;
    info!(session_id, ?admission, "Reading submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "sessionId": session_id,
            "status": "PROCESSING",
        })),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    pub session_id: String,
    pub status: String,
    pub stage: ProcessingStage,
    pub question_text: Option<String>,
    pub past_interpretation: Option<String>,
    pub present_interpretation: Option<String>,
    pub future_interpretation: Option<String>,
    pub summary: Option<String>,
    pub fortune_score: Option<i64>,
    pub result_image_url: Option<String>,
    pub result_image_text: Option<String>,
}

/// GET /sessions/:id/result — whatever the pipeline has persisted so far
pub async fn get_result<T, I>(
    State(state): State<AppState<T, I>>,
    Path(session_id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError>
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    let session = db::sessions::load_session(&state.db, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))?;
    let reading = require_reading(&state.db, &session_id).await?;

    Ok(Json(ResultResponse {
        session_id,
        status: session.status.as_str().to_string(),
        stage: session.stage,
        question_text: reading.question_text,
        past_interpretation: reading.past_interpretation,
        present_interpretation: reading.present_interpretation,
        future_interpretation: reading.future_interpretation,
        summary: reading.summary,
        fortune_score: reading.fortune_score,
        result_image_url: reading.result_image_url,
        result_image_text: reading.result_image_text,
    }))
}

async fn require_reading(pool: &sqlx::SqlitePool, session_id: &str) -> Result<Reading, ApiError> {
    db::readings::get_by_session(pool, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No reading for session {}", session_id)))
}
