// src/transform/extract.rs

//! Structural extraction: keep only the part of the document that matters.

use regex::bytes::Regex;
use scraper::{Html, Selector};

use crate::errors::{Result, SitewatchError};

/// Parse a CSS selector, mapping parse failures to `InvalidSelector`.
pub fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| SitewatchError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Keep the first capture group of the first match.
pub fn extract_pattern(body: &[u8], pattern: &str) -> Result<Vec<u8>> {
    let re = Regex::new(pattern).map_err(|e| SitewatchError::invalid_regex(pattern, e))?;
    match re.captures(body).and_then(|caps| caps.get(1)) {
        Some(m) => Ok(m.as_bytes().to_vec()),
        None => Err(SitewatchError::NoMatch(format!(
            "pattern {:?} did not match {}",
            pattern,
            String::from_utf8_lossy(body)
        ))),
    }
}

/// Outer HTML of the first element matching `selector`, trimmed.
pub fn extract_element(body: &[u8], selector: &str) -> Result<Vec<u8>> {
    let compiled = compile_selector(selector)?;
    let document = Html::parse_document(&String::from_utf8_lossy(body));
    match document.select(&compiled).next() {
        Some(element) => Ok(element.html().trim().as_bytes().to_vec()),
        None => Err(SitewatchError::NoMatch(format!(
            "selector {selector:?} did not match any element"
        ))),
    }
}
