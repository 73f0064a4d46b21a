// src/target.rs

//! Resolved watch targets.
//!
//! A [`Target`] is a validated `[[target]]` entry with its transform
//! directives folded into tagged enums once, so the cycle never re-checks
//! boolean flags.

use std::collections::BTreeMap;

use crate::config::{TargetConfig, WebhookConfig};
use crate::fetch::FetchRequest;
use crate::transform::{Extraction, Replacement, Reshape, TransformPlan};

#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub description: String,
    pub cron: String,
    pub method: String,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub useragent: Option<String>,
    pub additional_to: Vec<String>,
    pub ignored_status_codes: Vec<u16>,
    pub retry_on_match: Vec<String>,
    pub skip_soft_error_patterns: bool,
    pub transform: TransformPlan,
    pub webhooks: Vec<WebhookConfig>,
}

impl Target {
    pub fn from_config(cfg: &TargetConfig) -> Self {
        let extraction = if let Some(pattern) = &cfg.pattern {
            Extraction::Pattern(pattern.clone())
        } else if let Some(selector) = &cfg.extract_element {
            Extraction::Element(selector.clone())
        } else if cfg.extract_body {
            Extraction::Element("body".to_string())
        } else {
            Extraction::PassThrough
        };

        let reshape = if let Some(query) = &cfg.json_query {
            Reshape::JsonQuery(query.clone())
        } else if cfg.parse_feed {
            Reshape::Feed
        } else if cfg.html2text {
            Reshape::HtmlToText
        } else {
            Reshape::None
        };

        let replacements = cfg
            .replace
            .iter()
            .map(|r| Replacement {
                pattern: r.pattern.clone(),
                replace_with: r.replace_with.clone(),
            })
            .collect();

        Self {
            name: cfg.name.clone(),
            url: cfg.url.clone(),
            description: cfg.description.clone(),
            cron: cfg.cron.clone(),
            method: cfg.method.to_uppercase(),
            body: cfg.body.clone(),
            headers: cfg.header.clone(),
            useragent: cfg.useragent.clone(),
            additional_to: cfg.additional_to.clone(),
            ignored_status_codes: cfg.no_error_notify_on_statuscode.clone(),
            retry_on_match: cfg.retry_on_match.clone(),
            skip_soft_error_patterns: cfg.skip_soft_error_patterns,
            transform: TransformPlan {
                extraction,
                reshape,
                replacements,
                remove_empty_lines: cfg.remove_empty_lines,
                trim_whitespace: cfg.trim_whitespace,
            },
            webhooks: cfg.webhook.clone(),
        }
    }

    /// Build the HTTP request for one attempt.
    ///
    /// User agent precedence: a `User-Agent` header on the target, then the
    /// target's `useragent`, then `default_useragent`.
    pub fn request(&self, default_useragent: &str) -> FetchRequest {
        let mut headers = BTreeMap::new();
        let mut header_agent = None;
        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("user-agent") {
                header_agent = Some(value.clone());
            } else {
                headers.insert(name.clone(), value.clone());
            }
        }

        let user_agent = header_agent
            .or_else(|| self.useragent.clone())
            .unwrap_or_else(|| default_useragent.to_string());

        FetchRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            body: self.body.clone(),
            headers,
            user_agent,
        }
    }
}
