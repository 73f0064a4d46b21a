// src/transform/text.rs

//! Plain-text helpers: HTML to text, blank line collapsing and trimming.

use std::sync::LazyLock;

use regex::bytes::Regex;
use scraper::{Html, Node};

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\n\s*\n").expect("static regex"));

// Horizontal whitespace only: newlines stay, so line structure survives.
static EDGE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\s&&[^\n]]+|[\s&&[^\n]]+$").expect("static regex"));

/// Concatenated text of the document, without `script` and `style`
/// contents.
pub fn html_to_text(body: &[u8]) -> String {
    let document = Html::parse_document(&String::from_utf8_lossy(body));
    let mut out = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style"))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Replace every run of blank or whitespace-only lines with one newline.
pub fn collapse_blank_lines(body: &[u8]) -> Vec<u8> {
    BLANK_LINES.replace_all(body, &b"\n"[..]).into_owned()
}

/// Strip leading and trailing whitespace from every line.
pub fn trim_lines(body: &[u8]) -> Vec<u8> {
    EDGE_WHITESPACE.replace_all(body, &b""[..]).into_owned()
}
