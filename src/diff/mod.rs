// src/diff/mod.rs

//! Line diffs between two stored snapshots.
//!
//! [`generate_diff`] shells out to `git diff --no-index` and turns the
//! unified output into classified [`DiffLine`]s; [`render`] produces the text
//! and HTML forms used by notifications.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub mod git;
pub mod render;

pub use git::{generate_diff, generate_diff_with, git_available};
pub use render::Metadata;

static INDEX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^index [A-Fa-f0-9]+\.\.[A-Fa-f0-9]+ [0-9]+$").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineMode {
    Unchanged,
    Added,
    #[serde(rename = "deleted")]
    Removed,
    Metadata,
}

impl LineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineMode::Unchanged => "unchanged",
            LineMode::Added => "added",
            LineMode::Removed => "deleted",
            LineMode::Metadata => "metadata",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub content: String,
    pub mode: LineMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub lines: Vec<DiffLine>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn count(&self, mode: LineMode) -> usize {
        self.lines.iter().filter(|l| l.mode == mode).count()
    }
}

/// Classify unified diff output. File headers (`diff --git`, `index`,
/// `---`, `+++`) are dropped.
pub fn parse_unified_diff(raw: &str) -> Diff {
    let lines = raw
        .lines()
        .filter_map(|line| {
            let mode = if line.starts_with("diff --git")
                || INDEX_LINE.is_match(line)
                || line.starts_with("---")
                || line.starts_with("+++")
            {
                return None;
            } else if line.starts_with("@@") {
                LineMode::Metadata
            } else if line.starts_with('-') {
                LineMode::Removed
            } else if line.starts_with('+') {
                LineMode::Added
            } else {
                LineMode::Unchanged
            };
            Some(DiffLine {
                content: line.to_string(),
                mode,
            })
        })
        .collect();
    Diff { lines }
}
