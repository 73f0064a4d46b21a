// src/diff/git.rs

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{Result, SitewatchError};
use crate::shutdown::Shutdown;

use super::{parse_unified_diff, Diff};

/// Upper bound for one `git diff` run.
pub const DIFF_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether a usable `git` binary is on `PATH`.
pub async fn git_available() -> bool {
    Command::new(GIT)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Program used by [`generate_diff`].
pub const GIT: &str = "git";

/// Diff `old` against `new` with the `git` on `PATH`.
pub async fn generate_diff(old: &str, new: &str, shutdown: &Shutdown) -> Result<Diff> {
    generate_diff_with(OsStr::new(GIT), old, new, shutdown).await
}

/// Diff `old` against `new` with `program`, ignoring whitespace changes.
///
/// `program` is called with git's `diff --no-index` arguments. Both
/// snapshots are written to a private temp dir (with a trailing newline so
/// git does not flag a missing one). Exit codes 0 and 1 are success; any
/// other exit becomes [`SitewatchError::DiffTool`] carrying stderr.
pub async fn generate_diff_with(
    program: &OsStr,
    old: &str,
    new: &str,
    shutdown: &Shutdown,
) -> Result<Diff> {
    let dir = tempfile::Builder::new()
        .prefix("sitewatch_")
        .tempdir()
        .context("creating diff temp dir")?;

    let previous = dir.path().join("previous");
    let current = dir.path().join("current");
    let output = dir.path().join("diff.txt");

    tokio::fs::write(&previous, format!("{old}\n"))
        .await
        .with_context(|| format!("writing {}", previous.display()))?;
    tokio::fs::write(&current, format!("{new}\n"))
        .await
        .with_context(|| format!("writing {}", current.display()))?;

    let mut cmd = Command::new(program);
    cmd.arg("diff")
        .arg("--no-color")
        .arg("--no-index")
        .arg("--text")
        .arg("-w")
        .arg("-b")
        .arg(format!("--output={}", output.display()))
        .arg(&previous)
        .arg(&current)
        .current_dir(dir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let run = tokio::time::timeout(DIFF_TIMEOUT, cmd.output());
    let result = tokio::select! {
        _ = shutdown.cancelled() => {
            debug!("diff cancelled by shutdown");
            return Err(SitewatchError::Cancelled);
        }
        res = run => res,
    };

    let out = match result {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => return Err(SitewatchError::DiffTool(e.to_string())),
        Err(_) => {
            warn!(timeout_secs = DIFF_TIMEOUT.as_secs(), program = ?program, "diff timed out");
            return Err(SitewatchError::DiffTool(format!(
                "timed out after {}s",
                DIFF_TIMEOUT.as_secs()
            )));
        }
    };

    match out.status.code() {
        Some(0) | Some(1) => {}
        code => {
            return Err(SitewatchError::DiffTool(format!(
                "exit code {} - Stderr: {}",
                code.map_or_else(|| "none".to_string(), |c| c.to_string()),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
    }

    let raw = tokio::fs::read(&output)
        .await
        .with_context(|| format!("reading {}", output.display()))?;
    let diff = parse_unified_diff(&String::from_utf8_lossy(&raw));
    debug!(lines = diff.lines.len(), "diff generated");
    Ok(diff)
}
