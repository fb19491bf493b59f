//! Error type shared by the taro crates
//!
//! Everything below the HTTP surface (stores, config, event plumbing)
//! returns this one type; the service maps it to a response at the edge.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A row the caller insisted on was not there
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored data that should be well-formed was not
    #[error("Internal error: {0}")]
    Internal(String),
}
