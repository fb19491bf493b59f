//! HTTP surface
//!
//! Thin delivery layer over the stores and the pipeline. Handlers map
//! one-to-one onto store/pipeline calls; no business logic lives here.

pub mod events;
pub mod sessions;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::SqlitePool;

use taro_common::config::EventsConfig;
use taro_common::events::EventHub;

use crate::pipeline::PipelineService;
use crate::providers::{ImageGenerator, TextInterpreter};

pub struct AppState<T, I> {
    pub db: SqlitePool,
    pub hub: EventHub,
    pub pipeline: PipelineService<T, I>,
    pub events: EventsConfig,
}

impl<T, I> Clone for AppState<T, I> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            hub: self.hub.clone(),
            pipeline: self.pipeline.clone(),
            events: self.events.clone(),
        }
    }
}

pub fn build_router<T, I>(state: AppState<T, I>) -> Router
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:session_id/reading", get(sessions::get_reading))
        .route("/sessions/:session_id/submit", post(sessions::submit))
        .route("/sessions/:session_id/result", get(sessions::get_result))
        .route("/sessions/:session_id/events", get(events::subscribe))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "taro-rd" }))
}
