//! taro-rd: tarot reading pipeline service
//!
//! Sessions draw a three-card spread, a submitted question drives a
//! sequential interpretation pipeline (past, present, future, summary,
//! fortune score, result image), and subscribers follow progress over
//! per-session SSE streams.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod providers;

pub use api::{build_router, AppState};
pub use error::ApiError;
