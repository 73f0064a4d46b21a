// src/config/mod.rs

//! Configuration loading and validation for sitewatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants like unique targets and compilable patterns
//!   (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_and_validate};
pub use model::{
    ConfigFile, ConfigSection, ProxySection, RawConfigFile, ReplaceConfig, RetrySection,
    TargetConfig, WebhookConfig,
};
