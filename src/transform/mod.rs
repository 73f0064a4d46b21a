// src/transform/mod.rs

//! Content normalization.
//!
//! Stages always run in this order, each one optional:
//! 1. extraction ([`Extraction`])
//! 2. reshaping ([`Reshape`])
//! 3. regex replacements, in configured order
//! 4. blank line collapsing
//! 5. per-line whitespace trimming
//!
//! Everything here is a pure function of the body and the plan.

use regex::bytes::Regex;
use tracing::trace;

use crate::errors::{Result, SitewatchError};

pub mod extract;
pub mod feed;
pub mod json;
pub mod text;

/// Stage 1: what part of the document is kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Extraction {
    /// Regex whose first capture group becomes the body.
    Pattern(String),
    /// CSS selector; the first match's outer HTML becomes the body.
    Element(String),
    #[default]
    PassThrough,
}

/// Stage 2: mutually exclusive structured reshaping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Reshape {
    /// jq filter; every output is collected into a pretty JSON array.
    JsonQuery(String),
    /// RSS / RDF / Atom flattened into labeled text.
    Feed,
    /// Visible text with `script` and `style` removed.
    HtmlToText,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub pattern: String,
    pub replace_with: String,
}

/// Per-target transform directives, resolved once from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformPlan {
    pub extraction: Extraction,
    pub reshape: Reshape,
    pub replacements: Vec<Replacement>,
    pub remove_empty_lines: bool,
    pub trim_whitespace: bool,
}

impl TransformPlan {
    /// True when no stage would touch the body.
    pub fn is_identity(&self) -> bool {
        self.extraction == Extraction::PassThrough
            && self.reshape == Reshape::None
            && self.replacements.is_empty()
            && !self.remove_empty_lines
            && !self.trim_whitespace
    }
}

/// Run every enabled stage over `body`.
///
/// A pattern or selector that matches nothing yields
/// [`SitewatchError::NoMatch`]; the caller reports it as a classified failure.
pub fn transform(body: &[u8], plan: &TransformPlan) -> Result<Vec<u8>> {
    let mut out = match &plan.extraction {
        Extraction::Pattern(pattern) => extract::extract_pattern(body, pattern)?,
        Extraction::Element(selector) => extract::extract_element(body, selector)?,
        Extraction::PassThrough => body.to_vec(),
    };

    out = match &plan.reshape {
        Reshape::JsonQuery(query) => json::apply_query(&out, query)?,
        Reshape::Feed => feed::flatten_feed(&out)?.into_bytes(),
        Reshape::HtmlToText => text::html_to_text(&out).into_bytes(),
        Reshape::None => out,
    };

    for replacement in plan.replacements.iter() {
        out = apply_replacement(&out, replacement)?;
    }

    if plan.remove_empty_lines {
        out = text::collapse_blank_lines(&out);
    }

    if plan.trim_whitespace {
        out = text::trim_lines(&out);
    }

    Ok(out)
}

fn apply_replacement(body: &[u8], replacement: &Replacement) -> Result<Vec<u8>> {
    let re = Regex::new(&replacement.pattern)
        .map_err(|e| SitewatchError::invalid_regex(&replacement.pattern, e))?;
    let replaced = re
        .replace_all(body, replacement.replace_with.as_bytes())
        .into_owned();
    trace!(
        pattern = %replacement.pattern,
        before = body.len(),
        after = replaced.len(),
        "applied replacement"
    );
    Ok(replaced)
}
