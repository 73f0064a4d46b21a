// src/engine/mod.rs

//! Orchestration engine for sitewatch.
//!
//! - [`cycle`] runs one target through fetch/retry, transform, compare, diff
//!   and persist, returning a [`CycleOutcome`].
//! - [`runtime`] schedules cycles (cron or `--once`), enforces single-flight
//!   per target plus the global admission limit, and hands outcomes to the
//!   notifiers.
//!
//! The mapping from outcome to notification lives here as a pure function so
//! it can be tested without any IO.

use crate::diff::{Diff, Metadata};
use crate::fetch::ClassifiedFailure;
use crate::notify::Notification;
use crate::target::Target;

pub mod cycle;
pub mod runtime;

pub use cycle::{CycleSettings, Watcher};
pub use runtime::{RunSummary, Runtime, TickOutcome};

/// Result of one target cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Normalized body equals the stored artifact.
    NoChange,
    /// Body differs from the stored artifact; the new one was persisted.
    Changed { diff: Diff, metadata: Metadata },
    /// First successful cycle; the artifact was inserted.
    NewTarget { artifact: Vec<u8> },
    /// Retries exhausted or extraction found nothing. Store untouched.
    RecoverableFailure(ClassifiedFailure),
    /// Every attempt timed out at the transport layer. Store untouched.
    TransportTimeout,
    /// Shutdown interrupted the cycle. Store untouched.
    Cancelled,
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::NoChange => "no_change",
            CycleOutcome::Changed { .. } => "changed",
            CycleOutcome::NewTarget { .. } => "new_target",
            CycleOutcome::RecoverableFailure(_) => "failure",
            CycleOutcome::TransportTimeout => "timeout",
            CycleOutcome::Cancelled => "cancelled",
        }
    }
}

/// Which notification, if any, an outcome produces.
///
/// Failures whose status is listed in the target's or the global
/// `no_error_notify_on_statuscode` are dropped.
pub fn notification_for(
    outcome: &CycleOutcome,
    target: &Target,
    global_ignored: &[u16],
) -> Option<Notification> {
    match outcome {
        CycleOutcome::Changed { diff, metadata } => Some(Notification::Changed {
            diff: diff.clone(),
            metadata: metadata.clone(),
        }),
        CycleOutcome::RecoverableFailure(failure) => {
            if failure.is_ignorable(&target.ignored_status_codes, global_ignored) {
                None
            } else {
                Some(Notification::Failure(failure.clone()))
            }
        }
        CycleOutcome::NoChange
        | CycleOutcome::NewTarget { .. }
        | CycleOutcome::TransportTimeout
        | CycleOutcome::Cancelled => None,
    }
}
