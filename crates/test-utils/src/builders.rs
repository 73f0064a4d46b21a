#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use sitewatch::config::{
    ConfigFile, ConfigSection, ProxySection, RawConfigFile, ReplaceConfig, TargetConfig,
    WebhookConfig,
};
use sitewatch::target::Target;
use sitewatch::types::StoreMode;

/// Builder for `ConfigFile` to simplify test setup. Uses the memory store.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection {
                    store: StoreMode::Memory,
                    ..ConfigSection::default()
                },
                targets: Vec::new(),
            },
        }
    }

    pub fn with_target(mut self, target: TargetConfig) -> Self {
        self.config.targets.push(target);
        self
    }

    pub fn with_retry(mut self, count: u32, delay: Duration) -> Self {
        self.config.config.retry.count = count;
        self.config.config.retry.delay = delay;
        self
    }

    pub fn with_global_retry_pattern(mut self, pattern: &str) -> Self {
        self.config.config.retry_on_match.push(pattern.to_string());
        self
    }

    pub fn with_ignored_status(mut self, status: u16) -> Self {
        self.config
            .config
            .no_error_notify_on_statuscode
            .push(status);
        self
    }

    pub fn with_parallel_checks(mut self, n: usize) -> Self {
        self.config.config.parallel_checks = n;
        self
    }

    pub fn with_proxy(mut self, url: &str) -> Self {
        self.config.config.proxy = Some(ProxySection {
            url: url.to_string(),
            username: None,
            password: None,
            no_proxy: String::new(),
        });
        self
    }

    /// The unvalidated form, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TargetConfig`.
pub struct TargetConfigBuilder {
    target: TargetConfig,
}

impl TargetConfigBuilder {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            target: TargetConfig {
                name: name.to_string(),
                url: url.to_string(),
                cron: "0 0 * * * *".to_string(),
                description: String::new(),
                method: "GET".to_string(),
                body: None,
                header: BTreeMap::new(),
                useragent: None,
                additional_to: vec![],
                no_error_notify_on_statuscode: vec![],
                disabled: false,
                pattern: None,
                extract_element: None,
                extract_body: false,
                json_query: None,
                parse_feed: false,
                html2text: false,
                replace: vec![],
                retry_on_match: vec![],
                skip_soft_error_patterns: false,
                remove_empty_lines: false,
                trim_whitespace: false,
                webhook: vec![],
            },
        }
    }

    pub fn cron(mut self, expr: &str) -> Self {
        self.target.cron = expr.to_string();
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.target.description = text.to_string();
        self
    }

    pub fn method(mut self, method: &str) -> Self {
        self.target.method = method.to_string();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.target
            .header
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.target.pattern = Some(pattern.to_string());
        self
    }

    pub fn extract_element(mut self, selector: &str) -> Self {
        self.target.extract_element = Some(selector.to_string());
        self
    }

    pub fn json_query(mut self, query: &str) -> Self {
        self.target.json_query = Some(query.to_string());
        self
    }

    pub fn html2text(mut self, val: bool) -> Self {
        self.target.html2text = val;
        self
    }

    pub fn parse_feed(mut self, val: bool) -> Self {
        self.target.parse_feed = val;
        self
    }

    pub fn replace(mut self, pattern: &str, replace_with: &str) -> Self {
        self.target.replace.push(ReplaceConfig {
            pattern: pattern.to_string(),
            replace_with: replace_with.to_string(),
        });
        self
    }

    pub fn retry_on_match(mut self, pattern: &str) -> Self {
        self.target.retry_on_match.push(pattern.to_string());
        self
    }

    pub fn ignore_status(mut self, status: u16) -> Self {
        self.target.no_error_notify_on_statuscode.push(status);
        self
    }

    pub fn remove_empty_lines(mut self, val: bool) -> Self {
        self.target.remove_empty_lines = val;
        self
    }

    pub fn trim_whitespace(mut self, val: bool) -> Self {
        self.target.trim_whitespace = val;
        self
    }

    pub fn disabled(mut self, val: bool) -> Self {
        self.target.disabled = val;
        self
    }

    pub fn webhook(mut self, url: &str, method: &str) -> Self {
        self.target.webhook.push(WebhookConfig {
            url: url.to_string(),
            method: method.to_string(),
            header: BTreeMap::new(),
            useragent: None,
        });
        self
    }

    pub fn build(self) -> TargetConfig {
        self.target
    }

    /// Resolve straight into a runtime `Target` (no config-level validation).
    pub fn resolve(self) -> Target {
        Target::from_config(&self.target)
    }
}
