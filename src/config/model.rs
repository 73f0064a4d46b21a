// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::StoreMode;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// useragent = "sitewatch"
/// timeout = "30s"
/// parallel_checks = 4
/// database = "sitewatch.db"
///
/// [config.retry]
/// count = 3
/// delay = "3s"
///
/// [[target]]
/// name = "Changelog"
/// url = "https://example.com/changelog"
/// cron = "0 */15 * * * *"
/// extract_body = true
/// html2text = true
/// remove_empty_lines = true
/// ```
///
/// Only `[[target]]` entries are mandatory; everything else has defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
}

/// Validated configuration. Built from [`RawConfigFile`] via `TryFrom`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub targets: Vec<TargetConfig>,
}

impl ConfigFile {
    /// Wrap already-validated sections. Only `validate.rs` should call this.
    pub(crate) fn new_unchecked(config: ConfigSection, targets: Vec<TargetConfig>) -> Self {
        Self { config, targets }
    }

    /// Targets that are not `disabled`.
    pub fn enabled_targets(&self) -> impl Iterator<Item = &TargetConfig> {
        self.targets.iter().filter(|t| !t.disabled)
    }
}

/// `[config]` section: settings shared by all targets.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Default `User-Agent` for every request.
    #[serde(default = "default_useragent")]
    pub useragent: String,

    /// Per-request timeout of the HTTP client.
    #[serde(default = "default_timeout", with = "crate::config::duration")]
    pub timeout: Duration,

    /// How many cycles may be in flight at the same time.
    #[serde(default = "default_parallel_checks")]
    pub parallel_checks: usize,

    /// SQLite database path (used with `store = "sqlite"`).
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub store: StoreMode,

    #[serde(default)]
    pub retry: RetrySection,

    /// Regexes applied to every response body; a match means "retry".
    #[serde(default)]
    pub retry_on_match: Vec<String>,

    /// Failures with one of these status codes are not notified.
    #[serde(default)]
    pub no_error_notify_on_statuscode: Vec<u16>,

    /// Route every request (fetches and webhooks) through this proxy.
    #[serde(default)]
    pub proxy: Option<ProxySection>,
}

fn default_useragent() -> String {
    format!("sitewatch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_parallel_checks() -> usize {
    1
}

fn default_database() -> String {
    "sitewatch.db".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            useragent: default_useragent(),
            timeout: default_timeout(),
            parallel_checks: default_parallel_checks(),
            database: default_database(),
            store: StoreMode::default(),
            retry: RetrySection::default(),
            retry_on_match: Vec::new(),
            no_error_notify_on_statuscode: Vec::new(),
            proxy: None,
        }
    }
}

/// `[config.proxy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxySection {
    /// e.g. `http://proxy.local:3128`.
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Comma-separated hosts, domains or CIDRs that bypass the proxy.
    #[serde(default)]
    pub no_proxy: String,
}

/// `[config.retry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// Total attempts per cycle (not "extra" attempts).
    #[serde(default = "default_retry_count")]
    pub count: u32,

    /// Pause between two attempts.
    #[serde(default = "default_retry_delay", with = "crate::config::duration")]
    pub delay: Duration,
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(3)
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            count: default_retry_count(),
            delay: default_retry_delay(),
        }
    }
}

/// `[[target]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub url: String,

    /// Cron expression (seconds field first), e.g. `"0 */10 * * * *"`.
    #[serde(default = "default_cron")]
    pub cron: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub header: BTreeMap<String, String>,

    /// Overrides `[config].useragent` for this target.
    #[serde(default)]
    pub useragent: Option<String>,

    /// Extra recipients handed to notifiers.
    #[serde(default)]
    pub additional_to: Vec<String>,

    #[serde(default)]
    pub no_error_notify_on_statuscode: Vec<u16>,

    #[serde(default)]
    pub disabled: bool,

    /// Regex whose first capture group becomes the artifact.
    #[serde(default)]
    pub pattern: Option<String>,

    /// CSS selector; the first matching element's HTML becomes the artifact.
    #[serde(default)]
    pub extract_element: Option<String>,

    /// Shorthand for `extract_element = "body"`.
    #[serde(default)]
    pub extract_body: bool,

    /// jq filter; every output is collected into a pretty JSON array.
    #[serde(default, alias = "jq")]
    pub json_query: Option<String>,

    #[serde(default)]
    pub parse_feed: bool,

    #[serde(default)]
    pub html2text: bool,

    #[serde(default)]
    pub replace: Vec<ReplaceConfig>,

    #[serde(default)]
    pub retry_on_match: Vec<String>,

    #[serde(default)]
    pub skip_soft_error_patterns: bool,

    #[serde(default)]
    pub remove_empty_lines: bool,

    #[serde(default)]
    pub trim_whitespace: bool,

    #[serde(default)]
    pub webhook: Vec<WebhookConfig>,
}

fn default_cron() -> String {
    "0 0 * * * *".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

/// `[[target.replace]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceConfig {
    pub pattern: String,
    #[serde(default)]
    pub replace_with: String,
}

/// `[[target.webhook]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_webhook_method")]
    pub method: String,
    #[serde(default)]
    pub header: BTreeMap<String, String>,
    #[serde(default)]
    pub useragent: Option<String>,
}

fn default_webhook_method() -> String {
    "POST".to_string()
}
