// src/engine/cycle.rs

//! One target cycle: fetch/retry → transform → compare → diff → persist.
//!
//! Stages run strictly in that order. The store is written only after every
//! earlier stage succeeded, so a failed or cancelled cycle leaves the stored
//! artifact as it was.

use std::ffi::OsString;
use std::sync::Arc;

use tracing::{debug, info};

use crate::classify::SoftErrorRules;
use crate::config::ConfigSection;
use crate::diff::{generate_diff_with, git, Metadata};
use crate::errors::{Result, SitewatchError};
use crate::fetch::{fetch_with_retries, ClassifiedFailure, Fetcher, RetryOutcome, RetryPolicy};
use crate::shutdown::Shutdown;
use crate::store::{fingerprint, ArtifactStore};
use crate::target::Target;
use crate::transform::transform;

use super::CycleOutcome;

/// Global knobs every cycle needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    pub useragent: String,
    pub retry: RetryPolicy,
    pub retry_on_match: Vec<String>,
    /// Program invoked with `git diff --no-index` arguments.
    pub diff_tool: OsString,
}

impl CycleSettings {
    pub fn from_config(cfg: &ConfigSection) -> Self {
        Self {
            useragent: cfg.useragent.clone(),
            retry: RetryPolicy {
                attempts: cfg.retry.count,
                delay: cfg.retry.delay,
            },
            retry_on_match: cfg.retry_on_match.clone(),
            diff_tool: OsString::from(git::GIT),
        }
    }
}

/// Runs cycles. Cheap to share; holds no per-target state.
pub struct Watcher {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArtifactStore>,
    settings: CycleSettings,
    shutdown: Shutdown,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ArtifactStore>,
        settings: CycleSettings,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            fetcher,
            store,
            settings,
            shutdown,
        }
    }

    /// Run one cycle for `target`.
    ///
    /// `Err` means a non-retryable error (bad pattern, diff tool failure,
    /// store error); everything recoverable comes back as an outcome.
    pub async fn run_cycle(&self, target: &Target) -> Result<CycleOutcome> {
        let request = target.request(&self.settings.useragent);
        let rules = SoftErrorRules {
            global_patterns: &self.settings.retry_on_match,
            target_patterns: &target.retry_on_match,
            skip_soft_error_markers: target.skip_soft_error_patterns,
        };

        let retried = fetch_with_retries(
            self.fetcher.as_ref(),
            &request,
            self.settings.retry,
            &rules,
            &self.shutdown,
        )
        .await?;

        let result = match retried {
            RetryOutcome::Accepted(result) => result,
            RetryOutcome::Exhausted {
                transport_timeout: true,
                failure,
            } => {
                debug!(target_name = %target.name, message = %failure.message, "timed out, ignoring");
                return Ok(CycleOutcome::TransportTimeout);
            }
            RetryOutcome::Exhausted { failure, .. } => {
                return Ok(CycleOutcome::RecoverableFailure(failure));
            }
            RetryOutcome::Cancelled => return Ok(CycleOutcome::Cancelled),
        };

        let body = match transform(&result.body, &target.transform) {
            Ok(body) => body,
            Err(SitewatchError::NoMatch(message)) => {
                return Ok(CycleOutcome::RecoverableFailure(
                    ClassifiedFailure::from_result(message, &result),
                ));
            }
            Err(err) => return Err(err),
        };

        let Some(stored) = self.store.get_artifact(&target.name, &target.url).await? else {
            let id = self
                .store
                .insert_artifact(&target.name, &target.url, &body)
                .await?;
            info!(
                target_name = %target.name,
                id,
                fingerprint = %fingerprint(&body),
                "new target stored"
            );
            return Ok(CycleOutcome::NewTarget { artifact: body });
        };

        if stored.content == body {
            self.store.update_artifact(stored.id, &body).await?;
            debug!(target_name = %target.name, "no change");
            return Ok(CycleOutcome::NoChange);
        }

        let diff = match generate_diff_with(
            &self.settings.diff_tool,
            &String::from_utf8_lossy(&stored.content),
            &String::from_utf8_lossy(&body),
            &self.shutdown,
        )
        .await
        {
            Ok(diff) => diff,
            Err(SitewatchError::Cancelled) => return Ok(CycleOutcome::Cancelled),
            Err(err) => return Err(err),
        };

        self.store.update_artifact(stored.id, &body).await?;
        info!(
            target_name = %target.name,
            previous = %fingerprint(&stored.content),
            current = %fingerprint(&body),
            lines = diff.lines.len(),
            "content changed"
        );

        // Whitespace-only changes produce no diff lines.
        if diff.is_empty() {
            return Ok(CycleOutcome::NoChange);
        }

        let metadata = Metadata {
            name: target.name.clone(),
            url: target.url.clone(),
            description: target.description.clone(),
            request_duration: result.duration,
            status: result.status,
            body_len: body.len(),
            last_fetch: stored.last_fetch,
        };
        Ok(CycleOutcome::Changed { diff, metadata })
    }
}
