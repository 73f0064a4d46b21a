// src/lib.rs

pub mod classify;
pub mod cli;
pub mod config;
pub mod diff;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod logging;
pub mod notify;
pub mod shutdown;
pub mod store;
pub mod target;
pub mod transform;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::engine::{CycleSettings, Runtime, Watcher};
use crate::fetch::HttpFetcher;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::store::{open_store, WatchKey};
use crate::target::Target;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - HTTP client, artifact store and notifiers
/// - the cycle runtime (cron or `--once`)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let targets = selected_targets(&cfg, args.target.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &targets);
        return Ok(());
    }

    if !diff::git_available().await {
        bail!("git is required for diffing but was not found in PATH");
    }

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received");
        trigger.trigger();
    });

    let fetcher = HttpFetcher::new(cfg.config.timeout, cfg.config.proxy.as_ref())?;
    let store = open_store(&cfg.config).await?;

    let keep: Vec<WatchKey> = cfg
        .targets
        .iter()
        .map(|t| WatchKey::new(&t.name, &t.url))
        .collect();
    let pruned = store.prune(&keep).await?;
    if pruned > 0 {
        info!(pruned, "removed stored watches that are no longer configured");
    }

    let notifiers: Vec<Arc<dyn Notifier>> = vec![
        Arc::new(LogNotifier),
        Arc::new(WebhookNotifier::new(
            fetcher.client().clone(),
            cfg.config.useragent.clone(),
        )),
    ];

    let watcher = Watcher::new(
        Arc::new(fetcher),
        store,
        CycleSettings::from_config(&cfg.config),
        shutdown.clone(),
    );

    let runtime = Runtime::new(
        watcher,
        targets,
        notifiers,
        cfg.config.no_error_notify_on_statuscode.clone(),
        cfg.config.parallel_checks,
        shutdown,
    );

    if args.once {
        let summary = runtime.run_once().await?;
        debug!(?summary, "once run complete");
        return Ok(());
    }

    runtime.run_scheduled().await?;
    Ok(())
}

/// Enabled targets, optionally narrowed to the one called `only`.
fn selected_targets(cfg: &ConfigFile, only: Option<&str>) -> Result<Vec<Target>> {
    let targets: Vec<Target> = cfg
        .enabled_targets()
        .filter(|t| only.is_none_or(|name| t.name == name))
        .map(Target::from_config)
        .collect();

    if let Some(name) = only {
        if targets.is_empty() {
            bail!("no enabled target named '{name}'");
        }
    }
    if targets.is_empty() {
        bail!("every configured target is disabled");
    }
    Ok(targets)
}

/// Simple dry-run output: print the resolved targets.
fn print_dry_run(cfg: &ConfigFile, targets: &[Target]) {
    println!("sitewatch dry-run");
    println!("  config.store = {:?}", cfg.config.store);
    println!("  config.parallel_checks = {}", cfg.config.parallel_checks);
    println!(
        "  config.retry = {} attempts, {:?} delay",
        cfg.config.retry.count, cfg.config.retry.delay
    );
    println!();

    println!("targets ({}):", targets.len());
    for target in targets {
        println!("  - {}", target.name);
        println!("      url: {} {}", target.method, target.url);
        println!("      cron: {}", target.cron);
        if !target.description.is_empty() {
            println!("      description: {}", target.description);
        }
        if !target.transform.is_identity() {
            println!("      extraction: {:?}", target.transform.extraction);
            println!("      reshape: {:?}", target.transform.reshape);
            if !target.transform.replacements.is_empty() {
                println!("      replacements: {}", target.transform.replacements.len());
            }
        }
        if !target.retry_on_match.is_empty() {
            println!("      retry_on_match: {:?}", target.retry_on_match);
        }
        if !target.webhooks.is_empty() {
            println!("      webhooks: {}", target.webhooks.len());
        }
    }

    debug!("dry-run complete (no fetching)");
}
