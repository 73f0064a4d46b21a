// src/fetch/retry.rs

//! Retry controller.
//!
//! `Idle -> Attempting -> {Accepted | Retrying -> Attempting | Exhausted}`.
//! Transport errors and classifier rejections both spend one attempt; they
//! only differ in how the exhaustion message is worded.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::classify::{should_retry, SoftErrorRules};
use crate::errors::Result;
use crate::shutdown::Shutdown;

use super::{ClassifiedFailure, FetchError, FetchRequest, FetchResult, Fetcher};

/// Retry budget: `attempts >= 1` total attempts, `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

/// Terminal state of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Accepted(FetchResult),
    Exhausted {
        failure: ClassifiedFailure,
        /// The last attempt failed with a transport timeout and no response
        /// was ever obtained.
        transport_timeout: bool,
    },
    Cancelled,
}

enum LastFailure {
    Transport(FetchError),
    Rejected { cause: String, result: FetchResult },
}

/// Run attempts until the classifier accepts a response or the budget is
/// spent. Only a broken retry pattern produces `Err`.
pub async fn fetch_with_retries(
    fetcher: &dyn Fetcher,
    request: &FetchRequest,
    policy: RetryPolicy,
    rules: &SoftErrorRules<'_>,
    shutdown: &Shutdown,
) -> Result<RetryOutcome> {
    let attempts = policy.attempts.max(1);
    let mut last: Option<LastFailure> = None;
    let mut last_result: Option<FetchResult> = None;

    for attempt in 1..=attempts {
        if shutdown.is_triggered() {
            return Ok(RetryOutcome::Cancelled);
        }

        if attempt > 1 && !policy.delay.is_zero() {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(url = %request.url, attempt, "cancelled during retry delay");
                    return Ok(RetryOutcome::Cancelled);
                }
                _ = tokio::time::sleep(policy.delay) => {}
            }
        }

        debug!(url = %request.url, attempt, of = attempts, "attempting");

        let fetched = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(url = %request.url, attempt, "cancelled during fetch");
                return Ok(RetryOutcome::Cancelled);
            }
            res = fetcher.fetch(request) => res,
        };

        match fetched {
            Ok(result) => {
                let decision = should_retry(&result, rules)?;
                if !decision.retry {
                    if !decision.cause.is_empty() {
                        debug!(url = %request.url, cause = %decision.cause, "accepted");
                    }
                    return Ok(RetryOutcome::Accepted(result));
                }
                warn!(
                    url = %request.url,
                    attempt,
                    status = result.status,
                    cause = %decision.cause,
                    "response rejected, retrying"
                );
                last_result = Some(result.clone());
                last = Some(LastFailure::Rejected {
                    cause: decision.cause,
                    result,
                });
            }
            Err(err) => {
                warn!(url = %request.url, attempt, error = %err, "fetch failed, retrying");
                last = Some(LastFailure::Transport(err));
            }
        }
    }

    let outcome = match last {
        Some(LastFailure::Rejected { cause, result }) => RetryOutcome::Exhausted {
            failure: ClassifiedFailure::from_result(
                format!("still a response error after {attempts} retries: {cause}"),
                &result,
            ),
            transport_timeout: false,
        },
        Some(LastFailure::Transport(err)) => {
            let message = format!("still an error after {attempts} retries: {err}");
            let failure = match &last_result {
                Some(result) => ClassifiedFailure::from_result(message, result),
                None => ClassifiedFailure::message_only(message),
            };
            RetryOutcome::Exhausted {
                transport_timeout: err.is_timeout() && last_result.is_none(),
                failure,
            }
        }
        None => RetryOutcome::Exhausted {
            failure: ClassifiedFailure::message_only(format!(
                "no attempt made after {attempts} retries"
            )),
            transport_timeout: false,
        },
    };

    Ok(outcome)
}
