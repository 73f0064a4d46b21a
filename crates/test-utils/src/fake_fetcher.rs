use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sitewatch::fetch::{FetchError, FetchRequest, FetchResult, Fetcher};

type Reply = Result<FetchResult, FetchError>;

/// A fake fetcher that:
/// - replays scripted replies in order
/// - keeps answering with the last reply once the script runs out
/// - records every request it saw
pub struct ScriptedFetcher {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    requests: Mutex<Vec<FetchRequest>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedFetcher {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Always answer 200 with `body`.
    pub fn always(body: &str) -> Self {
        Self::new(vec![Ok(ok(body))])
    }

    /// Sleep this long before answering each attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Append replies to the script.
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        let scripted = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match scripted {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .expect("ScriptedFetcher called with an empty script"),
        }
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Reply> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.next_reply();
        let delay = self.delay;

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            reply
        })
    }
}

/// 200 response with `body`.
pub fn ok(body: &str) -> FetchResult {
    status(200, body)
}

/// Response with an arbitrary status.
pub fn status(code: u16, body: &str) -> FetchResult {
    FetchResult {
        status: code,
        body: body.as_bytes().to_vec(),
        duration: Duration::from_millis(5),
        ..Default::default()
    }
}

/// Transport error that is not a timeout.
pub fn refused(url: &str) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        message: "connection refused".to_string(),
    }
}

/// Transport timeout.
pub fn timed_out(url: &str) -> FetchError {
    FetchError::Timeout {
        url: url.to_string(),
        message: "operation timed out".to_string(),
    }
}
