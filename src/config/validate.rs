// src/config/validate.rs

use std::collections::HashSet;

use regex::bytes::Regex;
use tokio_cron_scheduler::Job;

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, TargetConfig};
use crate::errors::{Result, SitewatchError};
use crate::transform::{extract, json};
use crate::types::StoreMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SitewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.targets))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_targets(cfg)?;
    validate_global_config(&cfg.config)?;
    validate_unique_targets(cfg)?;
    for target in cfg.targets.iter() {
        validate_target(target)?;
    }
    Ok(())
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.targets.is_empty() {
        return Err(SitewatchError::ConfigError(
            "config must contain at least one [[target]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &ConfigSection) -> Result<()> {
    if cfg.retry.count == 0 {
        return Err(SitewatchError::ConfigError(
            "[config.retry].count must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.parallel_checks == 0 {
        return Err(SitewatchError::ConfigError(
            "[config].parallel_checks must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.timeout.is_zero() {
        return Err(SitewatchError::ConfigError(
            "[config].timeout must be greater than zero".to_string(),
        ));
    }

    // Two pooled connections to ":memory:" would be two separate databases.
    if cfg.store == StoreMode::Sqlite && cfg.database.trim().eq_ignore_ascii_case(":memory:") {
        return Err(SitewatchError::ConfigError(
            "in memory sqlite databases are not supported; use store = \"memory\"".to_string(),
        ));
    }

    if let Some(proxy) = &cfg.proxy {
        if let Err(e) = reqwest::Url::parse(&proxy.url) {
            return Err(SitewatchError::ConfigError(format!(
                "[config.proxy] has an invalid url '{}': {}",
                proxy.url, e
            )));
        }
    }

    compile_all(&cfg.retry_on_match)
}

fn validate_unique_targets(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for target in cfg.targets.iter() {
        if !seen.insert((target.name.as_str(), target.url.as_str())) {
            return Err(SitewatchError::ConfigError(format!(
                "duplicate target name '{}' with url '{}'",
                target.name, target.url
            )));
        }
    }
    Ok(())
}

fn validate_target(target: &TargetConfig) -> Result<()> {
    if target.name.trim().is_empty() {
        return Err(SitewatchError::ConfigError(format!(
            "target with url '{}' has an empty name",
            target.url
        )));
    }

    if let Err(e) = reqwest::Url::parse(&target.url) {
        return Err(SitewatchError::ConfigError(format!(
            "target '{}' has an invalid url '{}': {}",
            target.name, target.url, e
        )));
    }

    if reqwest::Method::from_bytes(target.method.to_uppercase().as_bytes()).is_err() {
        return Err(SitewatchError::ConfigError(format!(
            "target '{}' has an invalid method '{}'",
            target.name, target.method
        )));
    }

    // Parsed by the scheduler the runtime registers jobs with.
    if let Err(e) = Job::new(target.cron.as_str(), |_, _| {}) {
        return Err(SitewatchError::ConfigError(format!(
            "target '{}' has an invalid cron expression '{}': {}",
            target.name, target.cron, e
        )));
    }

    let extractions = [
        target.pattern.is_some(),
        target.extract_element.is_some(),
        target.extract_body,
    ];
    if extractions.iter().filter(|set| **set).count() > 1 {
        return Err(SitewatchError::ConfigError(format!(
            "target '{}' may only use one of `pattern`, `extract_element` and `extract_body`",
            target.name
        )));
    }

    let reshapes = [target.json_query.is_some(), target.parse_feed, target.html2text];
    if reshapes.iter().filter(|set| **set).count() > 1 {
        return Err(SitewatchError::ConfigError(format!(
            "target '{}' may only use one of `json_query`, `parse_feed` and `html2text`",
            target.name
        )));
    }

    if let Some(pattern) = &target.pattern {
        Regex::new(pattern).map_err(|e| SitewatchError::invalid_regex(pattern, e))?;
    }
    if let Some(selector) = &target.extract_element {
        extract::compile_selector(selector)?;
    }
    if let Some(query) = &target.json_query {
        json::compile_query(query)?;
    }

    for replace in target.replace.iter() {
        Regex::new(&replace.pattern)
            .map_err(|e| SitewatchError::invalid_regex(&replace.pattern, e))?;
    }
    compile_all(&target.retry_on_match)?;

    for webhook in target.webhook.iter() {
        if let Err(e) = reqwest::Url::parse(&webhook.url) {
            return Err(SitewatchError::ConfigError(format!(
                "target '{}' has an invalid webhook url '{}': {}",
                target.name, webhook.url, e
            )));
        }
        if reqwest::Method::from_bytes(webhook.method.to_uppercase().as_bytes()).is_err() {
            return Err(SitewatchError::ConfigError(format!(
                "target '{}' has an invalid webhook method '{}'",
                target.name, webhook.method
            )));
        }
    }

    Ok(())
}

fn compile_all(patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|e| SitewatchError::invalid_regex(pattern, e))?;
    }
    Ok(())
}
