// src/transform/json.rs

//! jq reshaping, backed by `jaq`.

use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;

use crate::errors::{Result, SitewatchError};

/// How much of a non-JSON body ends up in the error message.
const EXCERPT_LEN: usize = 500;

type Filter = jaq_core::Filter<Native<Val>>;

/// Parse and compile `query` with the jq standard library loaded, then hand
/// the compiled filter to `f`.
fn with_filter<T>(query: &str, f: impl FnOnce(&Filter) -> Result<T>) -> Result<T> {
    let invalid = |message: String| SitewatchError::InvalidQuery {
        query: query.to_string(),
        message,
    };

    let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = Arena::default();
    let modules = loader
        .load(&arena, File { code: query, path: () })
        .map_err(|errs| {
            invalid(
                errs.iter()
                    .map(|(_, e)| format!("{e:?}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            invalid(
                errs.iter()
                    .map(|(_, e)| format!("{e:?}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

    f(&filter)
}

/// Check that `query` is a valid jq program.
pub fn compile_query(query: &str) -> Result<()> {
    with_filter(query, |_| Ok(()))
}

/// Run `query` over `body` and pretty-print every output value as one JSON
/// array.
pub fn apply_query(body: &[u8], query: &str) -> Result<Vec<u8>> {
    with_filter(query, |filter| {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| SitewatchError::InvalidJson {
                message: e.to_string(),
                excerpt: excerpt(body),
            })?;

        let inputs = RcIter::new(core::iter::empty());
        let mut outputs = Vec::new();
        for out in filter.run((Ctx::new([], &inputs), Val::from(value))) {
            match out {
                Ok(v) => outputs.push(Value::from(v)),
                Err(e) => {
                    return Err(SitewatchError::QueryFailed {
                        message: e.to_string(),
                        excerpt: excerpt(body),
                    });
                }
            }
        }

        serde_json::to_vec_pretty(&outputs).map_err(|e| {
            SitewatchError::Other(anyhow::anyhow!("could not re-serialize json: {e}"))
        })
    })
}

fn excerpt(body: &[u8]) -> String {
    let end = body.len().min(EXCERPT_LEN);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_become_pretty_array() {
        let body = br#"{"items":[{"id":1,"ts":99},{"id":2,"ts":100}]}"#;
        let out = apply_query(body, ".items[].id").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[\n  1,\n  2\n]");
    }

    #[test]
    fn volatile_fields_can_be_dropped() {
        let out = apply_query(br#"{"id":1,"ts":99}"#, "del(.ts)").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[\n  {\n    \"id\": 1\n  }\n]");
    }

    #[test]
    fn std_filters_are_available() {
        let out = apply_query(br#"{"items":[{"id":3},{"id":4}]}"#, ".items | map(.id)").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[\n  [\n    3,\n    4\n  ]\n]");
    }

    #[test]
    fn no_outputs_is_empty_array() {
        let out = apply_query(br#"[]"#, ".[]").unwrap();
        assert_eq!(out, b"[]");
    }

    #[test]
    fn invalid_json_carries_truncated_excerpt() {
        let body = "<html>".repeat(200);
        let err = apply_query(body.as_bytes(), ".a").unwrap_err();
        let SitewatchError::InvalidJson { excerpt, .. } = err else {
            panic!("expected InvalidJson");
        };
        assert_eq!(excerpt.len(), EXCERPT_LEN);
        assert!(excerpt.starts_with("<html>"));
    }

    #[test]
    fn runtime_error_carries_excerpt() {
        let err = apply_query(br#"{"a":"text"}"#, ".a + 1").unwrap_err();
        let SitewatchError::QueryFailed { excerpt, .. } = err else {
            panic!("expected QueryFailed");
        };
        assert_eq!(excerpt, r#"{"a":"text"}"#);
    }

    #[test]
    fn invalid_query_is_rejected() {
        assert!(matches!(
            compile_query(".items["),
            Err(SitewatchError::InvalidQuery { .. })
        ));
        assert!(matches!(
            compile_query("no_such_function(1)"),
            Err(SitewatchError::InvalidQuery { .. })
        ));
        assert!(compile_query(".items[] | select(.id > 1)").is_ok());
    }
}
