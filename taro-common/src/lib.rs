//! Shared types for the taro services
//!
//! Provides the error currency, the reading event vocabulary with its
//! per-session subscription registry, and TOML/ENV configuration loading.

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
