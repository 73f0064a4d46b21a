// src/notify/mod.rs

//! Outbound notifications for cycle results.

use async_trait::async_trait;

use crate::diff::{Diff, Metadata};
use crate::errors::Result;
use crate::fetch::ClassifiedFailure;
use crate::target::Target;

pub mod log;
pub mod webhook;

pub use log::LogNotifier;
pub use webhook::WebhookNotifier;

/// What happened to a target that someone should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Changed { diff: Diff, metadata: Metadata },
    Failure(ClassifiedFailure),
    /// Non-retryable cycle error (bad pattern, diff tool failure, store...).
    Error(String),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Changed { .. } => "changed",
            Notification::Failure(_) => "failure",
            Notification::Error(_) => "error",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &Target, notification: &Notification) -> Result<()>;
}
