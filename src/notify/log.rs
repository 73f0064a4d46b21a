// src/notify/log.rs

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::target::Target;

use super::{Notification, Notifier};

/// Writes every notification to the log. Always installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, target: &Target, notification: &Notification) -> Result<()> {
        match notification {
            Notification::Changed { diff, metadata } => {
                info!(
                    target_name = %target.name,
                    url = %target.url,
                    recipients = ?target.additional_to,
                    lines = diff.lines.len(),
                    "website changed"
                );
                debug!(target_name = %target.name, "diff:\n{}", diff.text(metadata));
            }
            Notification::Failure(failure) => {
                warn!(
                    target_name = %target.name,
                    url = %target.url,
                    status = failure.status,
                    "{failure}"
                );
            }
            Notification::Error(message) => {
                error!(target_name = %target.name, url = %target.url, "{message}");
            }
        }
        Ok(())
    }
}
