// src/notify/webhook.rs

//! JSON webhooks fired when a target changed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::WebhookConfig;
use crate::diff::{Diff, Metadata};
use crate::errors::{Result, SitewatchError};
use crate::target::Target;

use super::{Notification, Notifier};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookPayload<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub description: &'a str,
    pub diff: Vec<WebhookDiffLine<'a>>,
    /// Nanoseconds.
    pub request_duration: u64,
    pub status_code: u16,
    pub body_length: usize,
    pub last_fetch: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookDiffLine<'a> {
    pub content: &'a str,
    pub mode: &'static str,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(diff: &'a Diff, meta: &'a Metadata) -> Self {
        Self {
            name: &meta.name,
            url: &meta.url,
            description: &meta.description,
            diff: diff
                .lines
                .iter()
                .map(|l| WebhookDiffLine {
                    content: &l.content,
                    mode: l.mode.as_str(),
                })
                .collect(),
            request_duration: u64::try_from(meta.request_duration.as_nanos()).unwrap_or(u64::MAX),
            status_code: meta.status,
            body_length: meta.body_len,
            last_fetch: meta.last_fetch,
        }
    }
}

/// Delivers `Changed` notifications to every webhook of the target.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    default_useragent: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, default_useragent: impl Into<String>) -> Self {
        Self {
            client,
            default_useragent: default_useragent.into(),
        }
    }

    async fn send(&self, hook: &WebhookConfig, diff: &Diff, meta: &Metadata) -> Result<()> {
        let method = Method::from_bytes(hook.method.to_uppercase().as_bytes()).map_err(|e| {
            SitewatchError::ConfigError(format!("invalid webhook method '{}': {e}", hook.method))
        })?;

        let useragent = hook.useragent.as_deref().unwrap_or(&self.default_useragent);
        let mut request = self
            .client
            .request(method.clone(), &hook.url)
            .header(USER_AGENT, useragent);

        // Only methods with a body get the payload.
        if method == Method::POST || method == Method::PUT || method == Method::PATCH {
            let payload = serde_json::to_vec(&WebhookPayload::new(diff, meta))
                .map_err(|e| anyhow::anyhow!("could not marshal webhook payload: {e}"))?;
            request = request.header(CONTENT_TYPE, "application/json").body(payload);
        }

        for (name, value) in hook.header.iter() {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(anyhow::anyhow!("webhook returned status code {}", status.as_u16()).into());
        }
        debug!(url = %hook.url, "webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, target: &Target, notification: &Notification) -> Result<()> {
        let Notification::Changed { diff, metadata } = notification else {
            return Ok(());
        };

        let mut first_err = None;
        for hook in target.webhooks.iter() {
            if let Err(err) = self.send(hook, diff, metadata).await {
                warn!(target_name = %target.name, webhook = %hook.url, error = %err, "webhook failed");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffLine, LineMode};
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn payload_shape() {
        let diff = Diff {
            lines: vec![DiffLine {
                content: "-gone".into(),
                mode: LineMode::Removed,
            }],
        };
        let meta = Metadata {
            name: "n".into(),
            url: "https://example.com".into(),
            description: String::new(),
            request_duration: Duration::from_millis(2),
            status: 200,
            body_len: 7,
            last_fetch: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        };
        let value = serde_json::to_value(WebhookPayload::new(&diff, &meta)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "n",
                "url": "https://example.com",
                "description": "",
                "diff": [{"content": "-gone", "mode": "deleted"}],
                "request_duration": 2_000_000,
                "status_code": 200,
                "body_length": 7,
                "last_fetch": "2024-05-01T00:00:00Z"
            })
        );
    }
}
