#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

pub use sitewatch_test_utils::init_tracing;

use sitewatch::engine::{CycleSettings, Watcher};
use sitewatch::fetch::{Fetcher, RetryPolicy};
use sitewatch::shutdown::Shutdown;
use sitewatch::store::ArtifactStore;

/// Settings with no retry delay so tests run fast.
pub fn fast_settings(attempts: u32) -> CycleSettings {
    CycleSettings {
        useragent: "sitewatch-tests".to_string(),
        retry: RetryPolicy {
            attempts,
            delay: Duration::ZERO,
        },
        retry_on_match: Vec::new(),
        diff_tool: "git".into(),
    }
}

pub fn watcher(
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArtifactStore>,
    attempts: u32,
) -> Watcher {
    Watcher::new(fetcher, store, fast_settings(attempts), Shutdown::never())
}

/// Write an executable script into `dir` that prints `fatal: boom` to
/// stderr and exits 2, standing in for a broken diff tool.
#[cfg(unix)]
pub fn failing_diff_tool(dir: &std::path::Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("broken-diff");
    std::fs::write(&path, "#!/bin/sh\necho 'fatal: boom' >&2\nexit 2\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// `false` (and a note on stderr) when `git` is missing, so diff tests can
/// bail out early.
pub async fn git_or_skip() -> bool {
    if sitewatch::diff::git_available().await {
        true
    } else {
        eprintln!("git not found in PATH; skipping");
        false
    }
}
