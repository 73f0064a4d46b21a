// src/diff/render.rs

//! Text and HTML renderings of a [`Diff`].

use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Diff;

/// Context shown above every rendered diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub url: String,
    pub description: String,
    pub request_duration: Duration,
    pub status: u16,
    pub body_len: usize,
    pub last_fetch: DateTime<Utc>,
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name: {}\nURL: {}", self.name, self.url)?;
        if !self.description.is_empty() {
            write!(f, "\nDescription: {}", self.description)?;
        }
        write!(
            f,
            "\nRequest Duration: {:?}\nStatus: {}\nBodylen: {}\nLast Fetch: {}",
            self.request_duration,
            self.status,
            self.body_len,
            self.last_fetch.to_rfc2822()
        )
    }
}

const STYLE: &str = "\
body { font-family: monospace; }
.diff-line { white-space: pre-wrap; }
.diff-added { background-color: #e6ffed; }
.diff-deleted { background-color: #ffeef0; }
.diff-metadata { color: #6a737d; }
";

impl Diff {
    /// Metadata block followed by one line per diff line.
    pub fn text(&self, meta: &Metadata) -> String {
        let mut out = format!("{meta}\n");
        for line in self.lines.iter() {
            out.push_str(&line.content);
            out.push('\n');
        }
        out
    }

    /// Standalone HTML document; every line is a `div` classed by its mode.
    pub fn html(&self, meta: &Metadata) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
        out.push_str(STYLE);
        out.push_str("</style>\n</head>\n<body>\n<pre class=\"diff-metadata\">");
        out.push_str(&escape_html(&meta.to_string()));
        out.push_str("</pre>\n");
        for line in self.lines.iter() {
            let _ = writeln!(
                out,
                "<div class=\"diff-line diff-{}\">{}</div>",
                line.mode.as_str(),
                escape_html(&line.content)
            );
        }
        out.push_str("</body>\n</html>\n");
        out
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffLine, LineMode};
    use chrono::TimeZone;

    fn meta(description: &str) -> Metadata {
        Metadata {
            name: "docs".into(),
            url: "https://example.com".into(),
            description: description.into(),
            request_duration: Duration::from_millis(250),
            status: 200,
            body_len: 42,
            last_fetch: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    fn diff() -> Diff {
        Diff {
            lines: vec![
                DiffLine {
                    content: "@@ -1 +1 @@".into(),
                    mode: LineMode::Metadata,
                },
                DiffLine {
                    content: "-<b>old</b>".into(),
                    mode: LineMode::Removed,
                },
                DiffLine {
                    content: "+new & shiny".into(),
                    mode: LineMode::Added,
                },
            ],
        }
    }

    #[test]
    fn metadata_skips_empty_description() {
        let text = meta("").to_string();
        assert!(text.starts_with("Name: docs\nURL: https://example.com\nRequest Duration: 250ms"));
        assert!(text.contains("\nStatus: 200\nBodylen: 42\nLast Fetch: Tue, 2 Jan 2024 03:04:05 +0000"));

        let text = meta("watch the docs").to_string();
        assert!(text.contains("\nDescription: watch the docs\n"));
    }

    #[test]
    fn text_is_metadata_then_lines() {
        let text = diff().text(&meta(""));
        assert!(text.ends_with("\n@@ -1 +1 @@\n-<b>old</b>\n+new & shiny\n"));
    }

    #[test]
    fn html_escapes_and_classes_lines() {
        let html = diff().html(&meta(""));
        assert!(html.contains(r#"<div class="diff-line diff-deleted">-&lt;b&gt;old&lt;/b&gt;</div>"#));
        assert!(html.contains(r#"<div class="diff-line diff-added">+new &amp; shiny</div>"#));
        assert!(html.contains(r#"<div class="diff-line diff-metadata">@@ -1 +1 @@</div>"#));
        assert!(!html.contains("<b>old"));
    }
}
