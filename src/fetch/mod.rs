// src/fetch/mod.rs

//! HTTP fetching and the retry controller.
//!
//! - [`Fetcher`] is the seam the cycle talks to. Production code uses
//!   [`HttpFetcher`]; tests swap in a scripted fake.
//! - [`retry`] runs attempts until the soft-error classifier accepts a
//!   response or the retry budget is spent.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::types::HeaderValues;

pub mod http;
pub mod retry;

pub use http::HttpFetcher;
pub use retry::{fetch_with_retries, RetryOutcome, RetryPolicy};

/// Everything needed to issue one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
    /// Extra headers; never contains `User-Agent`.
    pub headers: BTreeMap<String, String>,
    pub user_agent: String,
}

/// Result of one attempt. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    pub status: u16,
    pub headers: HeaderValues,
    pub duration: Duration,
    pub body: Vec<u8>,
}

/// Transport-level failure: no usable HTTP response was obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out: {message}")]
    Timeout { url: String, message: String },

    #[error("could not get {url}: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Why a target could not be resolved this cycle.
///
/// Carries the last response seen (zero-valued when every attempt failed at
/// the transport layer) so notifications can show it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedFailure {
    pub message: String,
    pub status: u16,
    pub headers: HeaderValues,
    pub body: Vec<u8>,
    pub duration: Duration,
}

impl ClassifiedFailure {
    /// Failure that only carries a message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Failure carrying the given response.
    pub fn from_result(message: impl Into<String>, result: &FetchResult) -> Self {
        Self {
            message: message.into(),
            status: result.status,
            headers: result.headers.clone(),
            body: result.body.clone(),
            duration: result.duration,
        }
    }

    /// Whether `status` is listed in either ignore list.
    pub fn is_ignorable(&self, target_codes: &[u16], global_codes: &[u16]) -> bool {
        self.status != 0
            && (target_codes.contains(&self.status) || global_codes.contains(&self.status))
    }
}

impl fmt::Display for ClassifiedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "got invalid response on http request: message: {}, status: {}, bodylen: {}",
            self.message,
            self.status,
            self.body.len()
        )
    }
}

impl std::error::Error for ClassifiedFailure {}

/// Trait abstracting how one HTTP attempt is performed.
///
/// Implementations must be shareable across concurrently running cycles.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FetchResult, FetchError>> + Send + 'a>>;
}
