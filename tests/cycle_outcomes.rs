// tests/cycle_outcomes.rs

mod common;
use crate::common::{fast_settings, git_or_skip, init_tracing, watcher};

use std::sync::Arc;

use sitewatch::diff::LineMode;
use sitewatch::engine::{CycleOutcome, CycleSettings, Watcher};
use sitewatch::errors::SitewatchError;
use sitewatch::shutdown::Shutdown;
use sitewatch::store::ArtifactStore;
use sitewatch_test_utils::fake_fetcher::{ok, status, timed_out};
use sitewatch_test_utils::{RecordingStore, ScriptedFetcher, StoreCall, TargetConfigBuilder};

const URL: &str = "https://example.com/page";

#[tokio::test]
async fn first_successful_cycle_inserts_exactly_once() {
    init_tracing();

    let fetcher = Arc::new(ScriptedFetcher::always("  hello  \n\n\n world "));
    let store = Arc::new(RecordingStore::new());
    let target = TargetConfigBuilder::new("page", URL)
        .remove_empty_lines(true)
        .trim_whitespace(true)
        .resolve();

    let outcome = watcher(fetcher.clone(), store.clone(), 3)
        .run_cycle(&target)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::NewTarget {
            artifact: b"hello\nworld".to_vec()
        }
    );
    assert_eq!(
        store.calls(),
        vec![StoreCall::Insert {
            name: "page".into(),
            url: URL.into(),
            content: b"hello\nworld".to_vec(),
        }]
    );
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn unchanged_content_is_no_change_and_refreshes() {
    init_tracing();

    let fetcher = Arc::new(ScriptedFetcher::always("same"));
    let store = Arc::new(RecordingStore::new());
    let id = store.seed("page", URL, b"same").await;
    let target = TargetConfigBuilder::new("page", URL).resolve();

    let outcome = watcher(fetcher, store.clone(), 1)
        .run_cycle(&target)
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::NoChange);
    assert_eq!(
        store.calls(),
        vec![StoreCall::Update {
            id,
            content: b"same".to_vec()
        }]
    );
}

#[tokio::test]
async fn pattern_without_match_is_recoverable_failure() {
    init_tracing();

    let fetcher = Arc::new(ScriptedFetcher::always("<html>no prices today</html>"));
    let store = Arc::new(RecordingStore::new());
    store.seed("page", URL, b"42").await;
    let target = TargetConfigBuilder::new("page", URL)
        .pattern(r"price: (\d+)")
        .resolve();

    let outcome = watcher(fetcher, store.clone(), 1)
        .run_cycle(&target)
        .await
        .unwrap();

    let CycleOutcome::RecoverableFailure(failure) = outcome else {
        panic!("expected RecoverableFailure, got {outcome:?}");
    };
    assert!(failure.message.contains(r"price: (\\d+)"), "{}", failure.message);
    assert_eq!(failure.status, 200);
    assert!(store.calls().is_empty(), "store must stay untouched");
    let stored = store.get_artifact("page", URL).await.unwrap().unwrap();
    assert_eq!(stored.content, b"42");
}

#[tokio::test]
async fn exhausted_retries_leave_store_untouched() {
    init_tracing();

    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(status(503, "down"))]));
    let store = Arc::new(RecordingStore::new());
    store.seed("page", URL, b"old").await;
    let target = TargetConfigBuilder::new("page", URL).resolve();

    let outcome = watcher(fetcher.clone(), store.clone(), 2)
        .run_cycle(&target)
        .await
        .unwrap();

    let CycleOutcome::RecoverableFailure(failure) = outcome else {
        panic!("expected RecoverableFailure, got {outcome:?}");
    };
    assert_eq!(failure.status, 503);
    assert_eq!(fetcher.calls(), 2);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn transport_timeouts_are_silent() {
    init_tracing();

    let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(timed_out(URL))]));
    let store = Arc::new(RecordingStore::new());
    let target = TargetConfigBuilder::new("page", URL).resolve();

    let outcome = watcher(fetcher, store.clone(), 2)
        .run_cycle(&target)
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::TransportTimeout);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn bad_json_is_a_hard_error_without_writes() {
    init_tracing();

    let fetcher = Arc::new(ScriptedFetcher::always("<html>not json</html>"));
    let store = Arc::new(RecordingStore::new());
    let target = TargetConfigBuilder::new("api", URL)
        .json_query(".items[]")
        .resolve();

    let err = watcher(fetcher, store.clone(), 1)
        .run_cycle(&target)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("<html>not json</html>"));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn changed_content_yields_diff_and_persists() {
    init_tracing();
    if !git_or_skip().await {
        return;
    }

    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(ok("line1\nline2   "))]));
    let store = Arc::new(RecordingStore::new());
    let id = store.seed("page", URL, b"line1").await;
    let target = TargetConfigBuilder::new("page", URL)
        .description("watch it")
        .trim_whitespace(true)
        .resolve();

    let outcome = watcher(fetcher, store.clone(), 1)
        .run_cycle(&target)
        .await
        .unwrap();

    let CycleOutcome::Changed { diff, metadata } = outcome else {
        panic!("expected Changed, got {outcome:?}");
    };
    assert_eq!(diff.count(LineMode::Added), 1);
    assert_eq!(metadata.name, "page");
    assert_eq!(metadata.description, "watch it");
    assert_eq!(metadata.status, 200);
    // Length of the normalized artifact, not of the raw response.
    assert_eq!(metadata.body_len, "line1\nline2".len());
    assert_eq!(
        store.calls(),
        vec![StoreCall::Update {
            id,
            content: b"line1\nline2".to_vec()
        }]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn diff_tool_failure_is_an_error_without_writes() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let settings = CycleSettings {
        diff_tool: crate::common::failing_diff_tool(dir.path()).into_os_string(),
        ..fast_settings(1)
    };
    let fetcher = Arc::new(ScriptedFetcher::always("new"));
    let store = Arc::new(RecordingStore::new());
    store.seed("page", URL, b"old").await;
    let target = TargetConfigBuilder::new("page", URL).resolve();

    let err = Watcher::new(fetcher, store.clone(), settings, Shutdown::never())
        .run_cycle(&target)
        .await
        .unwrap_err();

    let SitewatchError::DiffTool(msg) = err else {
        panic!("expected DiffTool");
    };
    assert!(msg.contains("fatal: boom"), "{msg}");
    assert!(store.calls().is_empty(), "store must stay untouched");
    let stored = store.get_artifact("page", URL).await.unwrap().unwrap();
    assert_eq!(stored.content, b"old");
}

#[tokio::test]
async fn artifact_tracks_latest_successful_cycle() {
    init_tracing();
    if !git_or_skip().await {
        return;
    }

    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Ok(ok("v1")),
        Ok(ok("v2")),
        Ok(status(500, "broken")),
        Ok(ok("v3")),
    ]));
    let store = Arc::new(RecordingStore::new());
    let target = TargetConfigBuilder::new("page", URL).resolve();
    let w = watcher(fetcher, store.clone(), 1);

    let mut expected = Vec::new();
    for want in ["v1", "v2", "v2", "v3"] {
        w.run_cycle(&target).await.unwrap();
        let stored = store.get_artifact("page", URL).await.unwrap().unwrap();
        expected.push(String::from_utf8(stored.content).unwrap());
        assert_eq!(expected.last().map(String::as_str), Some(want));
    }
}
