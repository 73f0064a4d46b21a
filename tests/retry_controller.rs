// tests/retry_controller.rs

mod common;
use crate::common::init_tracing;

use std::time::Duration;

use sitewatch::classify::SoftErrorRules;
use sitewatch::fetch::{fetch_with_retries, FetchRequest, RetryOutcome, RetryPolicy};
use sitewatch::shutdown::{self, Shutdown};
use sitewatch_test_utils::fake_fetcher::{ok, refused, status, timed_out};
use sitewatch_test_utils::ScriptedFetcher;

const URL: &str = "http://watched.test/";

fn request() -> FetchRequest {
    FetchRequest {
        method: "GET".to_string(),
        url: URL.to_string(),
        body: None,
        headers: Default::default(),
        user_agent: "tests".to_string(),
    }
}

fn rules() -> SoftErrorRules<'static> {
    SoftErrorRules {
        global_patterns: &[],
        target_patterns: &[],
        skip_soft_error_markers: false,
    }
}

fn policy(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        delay: Duration::ZERO,
    }
}

/// K failures (mixing transport errors and rejected responses) then one
/// success.
fn script(k: usize) -> ScriptedFetcher {
    let mut replies = Vec::new();
    for i in 0..k {
        if i % 2 == 0 {
            replies.push(Err(refused(URL)));
        } else {
            replies.push(Ok(status(503, "busy")));
        }
    }
    replies.push(Ok(ok("finally")));
    ScriptedFetcher::new(replies)
}

#[tokio::test]
async fn success_after_k_failures_takes_k_plus_one_attempts() {
    init_tracing();

    for k in 0..4 {
        for n in (k as u32 + 1)..=(k as u32 + 2) {
            let fetcher = script(k);
            let out = fetch_with_retries(&fetcher, &request(), policy(n), &rules(), &Shutdown::never())
                .await
                .unwrap();
            assert_eq!(out, RetryOutcome::Accepted(ok("finally")), "k={k} n={n}");
            assert_eq!(fetcher.calls(), k + 1, "k={k} n={n}");
        }
    }
}

#[tokio::test]
async fn budget_below_failures_exhausts_after_n_attempts() {
    init_tracing();

    for k in 1..5usize {
        for n in 1..=k as u32 {
            let fetcher = script(k);
            let out = fetch_with_retries(&fetcher, &request(), policy(n), &rules(), &Shutdown::never())
                .await
                .unwrap();
            assert!(
                matches!(out, RetryOutcome::Exhausted { .. }),
                "k={k} n={n}: {out:?}"
            );
            assert_eq!(fetcher.calls(), n as usize, "k={k} n={n}");
        }
    }
}

#[tokio::test]
async fn exhaustion_message_depends_on_last_failure_kind() {
    init_tracing();

    // Last attempt rejected by the classifier: cause is carried verbatim.
    let fetcher = ScriptedFetcher::new(vec![Err(refused(URL)), Ok(status(500, "oops"))]);
    let out = fetch_with_retries(&fetcher, &request(), policy(2), &rules(), &Shutdown::never())
        .await
        .unwrap();
    let RetryOutcome::Exhausted { failure, transport_timeout } = out else {
        panic!("expected exhaustion");
    };
    assert!(!transport_timeout);
    assert_eq!(failure.status, 500);
    assert_eq!(
        failure.message,
        "still a response error after 2 retries: statuscode is 500 - Internal Server Error"
    );

    // Last attempt failed at the transport layer after an earlier response:
    // generic message, but the last response is still attached.
    let fetcher = ScriptedFetcher::new(vec![Ok(status(502, "bad")), Err(refused(URL))]);
    let out = fetch_with_retries(&fetcher, &request(), policy(2), &rules(), &Shutdown::never())
        .await
        .unwrap();
    let RetryOutcome::Exhausted { failure, transport_timeout } = out else {
        panic!("expected exhaustion");
    };
    assert!(!transport_timeout);
    assert!(failure.message.starts_with("still an error after 2 retries: "));
    assert_eq!(failure.status, 502);
}

#[tokio::test]
async fn only_timeouts_are_flagged_as_transport_timeout() {
    init_tracing();

    let fetcher = ScriptedFetcher::new(vec![Err(timed_out(URL))]);
    let out = fetch_with_retries(&fetcher, &request(), policy(3), &rules(), &Shutdown::never())
        .await
        .unwrap();
    assert!(matches!(
        out,
        RetryOutcome::Exhausted {
            transport_timeout: true,
            ..
        }
    ));
    assert_eq!(fetcher.calls(), 3);

    let fetcher = ScriptedFetcher::new(vec![Err(refused(URL))]);
    let out = fetch_with_retries(&fetcher, &request(), policy(2), &rules(), &Shutdown::never())
        .await
        .unwrap();
    assert!(matches!(
        out,
        RetryOutcome::Exhausted {
            transport_timeout: false,
            ..
        }
    ));
}

#[tokio::test]
async fn empty_body_is_accepted_without_retry() {
    init_tracing();

    let fetcher = ScriptedFetcher::new(vec![Ok(ok(""))]);
    let out = fetch_with_retries(&fetcher, &request(), policy(3), &rules(), &Shutdown::never())
        .await
        .unwrap();
    assert_eq!(out, RetryOutcome::Accepted(ok("")));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn already_triggered_shutdown_makes_no_attempt() {
    init_tracing();

    let (trigger, shutdown) = shutdown::channel();
    trigger.trigger();

    let fetcher = ScriptedFetcher::always("never seen");
    let out = fetch_with_retries(&fetcher, &request(), policy(3), &rules(), &shutdown)
        .await
        .unwrap();
    assert_eq!(out, RetryOutcome::Cancelled);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn shutdown_during_slow_fetch_cancels() {
    init_tracing();

    let (trigger, shutdown) = shutdown::channel();
    let fetcher = ScriptedFetcher::always("slow").with_delay(Duration::from_secs(30));

    let req = request();
    let rules = rules();
    let run = fetch_with_retries(&fetcher, &req, policy(3), &rules, &shutdown);
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.trigger();
    };

    let (out, ()) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(run, cancel) })
        .await
        .expect("cancellation was not observed");
    assert_eq!(out.unwrap(), RetryOutcome::Cancelled);
}
