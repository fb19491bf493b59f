//! HTTP surface tests against a server bound on an ephemeral port
//!
//! Providers are the deterministic mocks, so submitted readings complete
//! quickly without any network access.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::watch;

use taro_common::config::{EventsConfig, PipelineConfig};
use taro_common::events::EventHub;
use taro_rd::api::{build_router, AppState};
use taro_rd::pipeline::{PipelineService, WorkerPool};
use taro_rd::providers::{
    ChatMessage, MockImages, MockInterpreter, ProviderError, TextInterpreter,
};

/// Text provider that holds every call until the gate opens
struct GatedText {
    gate: watch::Receiver<bool>,
}

#[async_trait]
impl TextInterpreter for GatedText {
    async fn complete(&self, _conversation: &[ChatMessage]) -> Result<String, ProviderError> {
        let mut gate = self.gate.clone();
        while !*gate.borrow() {
            if gate.changed().await.is_err() {
                break;
            }
        }
        Ok("A steady, patient reading.".to_string())
    }
}

async fn spawn_app_with<T: TextInterpreter + 'static>(text: T) -> (String, TempDir) {
    let dir = TempDir::new().unwrap();
    let pool = taro_rd::db::init_database_pool(&dir.path().join("test.db"))
        .await
        .unwrap();

    let hub = EventHub::new(64);
    let pipeline = PipelineService::new(
        pool.clone(),
        hub.clone(),
        text,
        MockImages::new(),
        WorkerPool::new(&PipelineConfig::default()),
        Duration::from_secs(5),
    );
    let state = AppState {
        db: pool,
        hub,
        pipeline,
        events: EventsConfig::default(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    (format!("http://{}", addr), dir)
}

async fn spawn_app() -> (String, TempDir) {
    spawn_app_with(MockInterpreter::new()).await
}

async fn create_session(client: &reqwest::Client, base: &str) -> Value {
    let response = client
        .post(format!("{base}/sessions"))
        .json(&json!({ "nickname": "tester" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn create_session_draws_three_distinct_cards() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let body = create_session(&client, &base).await;
    assert_eq!(body["sessionId"].as_str().unwrap().len(), 8);
    assert_eq!(body["stage"], "CARDS_GENERATED");

    let cards = body["cards"].as_array().unwrap();
    assert_eq!(cards.len(), 3);
    let positions: Vec<u64> = cards.iter().map(|c| c["position"].as_u64().unwrap()).collect();
    assert_eq!(positions, vec![1, 2, 3]);

    let mut names: Vec<&str> = cards.iter().map(|c| c["name"].as_str().unwrap()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3, "drawn cards must be distinct");
}

#[tokio::test]
async fn unknown_session_is_404_everywhere() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["reading", "result", "events"] {
        let response = client
            .get(format!("{base}/sessions/nope0000/{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404, "GET {path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();
    let session_id = create_session(&client, &base).await["sessionId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = client
        .post(format!("{base}/sessions/{session_id}/submit"))
        .json(&json!({
            "category_code": "LOVE",
            "topic_code": "REUNION",
            "question_text": "   ",
            "reader_type": "F",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn submitted_reading_runs_to_completion() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();
    let session_id = create_session(&client, &base).await["sessionId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = client
        .post(format!("{base}/sessions/{session_id}/submit"))
        .json(&json!({
            "category_code": "LOVE",
            "topic_code": "REUNION",
            "question_text": "Will we meet again?",
            "reader_type": "F",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    let mut result = Value::Null;
    for _ in 0..100 {
        let response = client
            .get(format!("{base}/sessions/{session_id}/result"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        result = response.json().await.unwrap();
        if result["stage"] == "COMPLETED" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(result["stage"], "COMPLETED");
    assert_eq!(result["status"], "COMPLETED");
    assert!(result["pastInterpretation"].is_string());
    assert!(result["presentInterpretation"].is_string());
    assert!(result["futureInterpretation"].is_string());
    assert!(result["summary"].is_string());
    let score = result["fortuneScore"].as_i64().unwrap();
    assert!((60..=99).contains(&score), "score out of range: {score}");
    assert!(result["resultImageUrl"]
        .as_str()
        .unwrap()
        .contains(&session_id));
}

#[tokio::test]
async fn rejected_duplicate_submit_leaves_the_running_reading_untouched() {
    let (open, gate) = watch::channel(false);
    let (base, _dir) = spawn_app_with(GatedText { gate }).await;
    let client = reqwest::Client::new();
    let session_id = create_session(&client, &base).await["sessionId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = client
        .post(format!("{base}/sessions/{session_id}/submit"))
        .json(&json!({
            "category_code": "LOVE",
            "topic_code": "REUNION",
            "question_text": "Will we meet again?",
            "reader_type": "F",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    // The gated provider parks the run on its first card.
    let mut result = Value::Null;
    for _ in 0..100 {
        result = client
            .get(format!("{base}/sessions/{session_id}/result"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if result["stage"] == "PAST_PROCESSING" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(result["stage"], "PAST_PROCESSING");

    // A second submit is turned away without regressing the stage or
    // overwriting the question the first run is answering.
    let response = client
        .post(format!("{base}/sessions/{session_id}/submit"))
        .json(&json!({
            "category_code": "MONEY",
            "topic_code": "WINDFALL",
            "question_text": "Am I about to be rich?",
            "reader_type": "T",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");

    let result: Value = client
        .get(format!("{base}/sessions/{session_id}/result"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["stage"], "PAST_PROCESSING");
    assert_eq!(result["questionText"], "Will we meet again?");

    open.send(true).unwrap();
    let mut result = Value::Null;
    for _ in 0..100 {
        result = client
            .get(format!("{base}/sessions/{session_id}/result"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if result["stage"] == "COMPLETED" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(result["stage"], "COMPLETED");
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let (base, _dir) = spawn_app().await;
    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}
