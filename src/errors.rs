// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitewatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("could not compile pattern {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid jq query {query:?}: {message}")]
    InvalidQuery { query: String, message: String },

    #[error("invalid css selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("supplied a json query but the body is no valid json: {message}. Body: {excerpt}")]
    InvalidJson { message: String, excerpt: String },

    #[error("error while running json query: {message}. Body: {excerpt}")]
    QueryFailed { message: String, excerpt: String },

    #[error("could not parse feed: {0}")]
    Feed(String),

    /// Structural extraction found nothing. The cycle turns this into a
    /// `ClassifiedFailure` so it reaches the notification path.
    #[error("{0}")]
    NoMatch(String),

    #[error("could not execute git diff: {0}")]
    DiffTool(String),

    #[error("cancelled by shutdown")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitewatchError {
    /// Build an `InvalidRegex` error for `pattern`.
    pub fn invalid_regex(pattern: &str, source: regex::Error) -> Self {
        SitewatchError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitewatchError>;
