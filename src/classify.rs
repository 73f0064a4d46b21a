// src/classify.rs

//! Soft-error classifier: decides whether a response is usable or should be
//! retried.
//!
//! Decision order (first match wins):
//! 1. status outside 2xx: retry
//! 2. empty body: accept (deliberately terminal, not a soft error)
//! 3. built-in reverse proxy / error page markers, unless the target opts out
//! 4. global `retry_on_match` regexes, then the target's own
//! 5. otherwise accept

use regex::bytes::Regex;
use reqwest::StatusCode;

use crate::errors::{Result, SitewatchError};
use crate::fetch::FetchResult;

/// Markers of error pages served with a 200 by common proxies (nginx'
/// special responses in particular).
pub const SOFT_ERROR_MARKERS: &[&str] = &[
    "504 - Gateway Time-out",
    "404 - Not Found",
    "503 - Service Unavailable",
    "<h1>503 Service Unavailable</h1>",
    "<h1>403 Forbidden</h1>",
    "<h1>404 Not Found</h1>",
    "<h1>405 Not Allowed</h1>",
    "<h1>429 Too Many Requests</h1>",
    "<h1>500 Internal Server Error</h1>",
    "<h1>502 Bad Gateway</h1>",
    "<h1>503 Service Temporarily Unavailable</h1>",
    "Faithfully yours, nginx.",
    "<!-- a padding to disable MSIE and Chrome friendly error page -->",
];

/// Classifier inputs that come from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SoftErrorRules<'a> {
    pub global_patterns: &'a [String],
    pub target_patterns: &'a [String],
    pub skip_soft_error_markers: bool,
}

/// Verdict for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    /// Why; informational when `retry` is false.
    pub cause: String,
}

impl RetryDecision {
    fn retry(cause: String) -> Self {
        Self { retry: true, cause }
    }

    fn accept(cause: impl Into<String>) -> Self {
        Self {
            retry: false,
            cause: cause.into(),
        }
    }
}

/// Classify `result`. Fails only when a configured pattern does not compile.
pub fn should_retry(result: &FetchResult, rules: &SoftErrorRules<'_>) -> Result<RetryDecision> {
    if !(200..300).contains(&result.status) {
        let reason = StatusCode::from_u16(result.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        return Ok(RetryDecision::retry(format!(
            "statuscode is {} - {}",
            result.status, reason
        )));
    }

    if result.body.is_empty() {
        return Ok(RetryDecision::accept("zero length body"));
    }

    if !rules.skip_soft_error_markers {
        if let Some(marker) = SOFT_ERROR_MARKERS
            .iter()
            .find(|m| contains(&result.body, m.as_bytes()))
        {
            return Ok(RetryDecision::retry(format!(
                "matches the hardcoded pattern {marker:?}"
            )));
        }
    }

    if let Some(p) = first_match(rules.global_patterns, &result.body)? {
        return Ok(RetryDecision::retry(format!("matches the global pattern {p:?}")));
    }

    if let Some(p) = first_match(rules.target_patterns, &result.body)? {
        return Ok(RetryDecision::retry(format!("matches the pattern {p:?}")));
    }

    Ok(RetryDecision::accept(""))
}

fn first_match<'p>(patterns: &'p [String], body: &[u8]) -> Result<Option<&'p str>> {
    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| SitewatchError::invalid_regex(pattern, e))?;
        if re.is_match(body) {
            return Ok(Some(pattern));
        }
    }
    Ok(None)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: u16, body: &str) -> FetchResult {
        FetchResult {
            status,
            body: body.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    fn rules<'a>(global: &'a [String], target: &'a [String]) -> SoftErrorRules<'a> {
        SoftErrorRules {
            global_patterns: global,
            target_patterns: target,
            skip_soft_error_markers: false,
        }
    }

    #[test]
    fn non_success_status_retries() {
        let d = should_retry(&result(503, "fine"), &rules(&[], &[])).unwrap();
        assert!(d.retry);
        assert!(d.cause.starts_with("statuscode is 503"));
    }

    #[test]
    fn status_dominates_patterns_and_empty_body() {
        let global = vec!["[".to_string()];
        // The broken pattern is never reached because the status wins.
        let d = should_retry(&result(500, ""), &rules(&global, &[])).unwrap();
        assert!(d.retry);
        assert!(d.cause.contains("500"));
    }

    #[test]
    fn empty_body_is_terminal() {
        let target = vec![".*".to_string()];
        let d = should_retry(&result(200, ""), &rules(&[], &target)).unwrap();
        assert!(!d.retry);
        assert_eq!(d.cause, "zero length body");
    }

    #[test]
    fn soft_error_markers_retry_unless_skipped() {
        let body = "<html><center><h1>502 Bad Gateway</h1></center></html>";
        let d = should_retry(&result(200, body), &rules(&[], &[])).unwrap();
        assert!(d.retry);
        assert!(d.cause.contains("502 Bad Gateway"));

        let skipping = SoftErrorRules {
            skip_soft_error_markers: true,
            ..rules(&[], &[])
        };
        assert!(!should_retry(&result(200, body), &skipping).unwrap().retry);
    }

    #[test]
    fn global_patterns_are_checked_before_target_patterns() {
        let global = vec!["maintenance".to_string()];
        let target = vec!["maint.*".to_string()];
        let d = should_retry(&result(200, "down for maintenance"), &rules(&global, &target)).unwrap();
        assert!(d.retry);
        assert_eq!(d.cause, "matches the global pattern \"maintenance\"");

        let d = should_retry(&result(200, "maint window"), &rules(&global, &target)).unwrap();
        assert_eq!(d.cause, "matches the pattern \"maint.*\"");
    }

    #[test]
    fn bad_pattern_is_a_hard_error() {
        let target = vec!["(unclosed".to_string()];
        let err = should_retry(&result(200, "body"), &rules(&[], &target)).unwrap_err();
        assert!(matches!(err, SitewatchError::InvalidRegex { .. }));
    }

    #[test]
    fn clean_response_is_accepted() {
        let d = should_retry(&result(204, "ok"), &rules(&[], &[])).unwrap();
        assert!(!d.retry);
    }

    #[test]
    fn classification_is_deterministic() {
        let global = vec!["x+".to_string()];
        let r = result(200, "xxx");
        let first = should_retry(&r, &rules(&global, &[])).unwrap();
        for _ in 0..5 {
            assert_eq!(should_retry(&r, &rules(&global, &[])).unwrap(), first);
        }
    }
}
