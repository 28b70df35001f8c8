//! Shared test utilities for EasyDeploy integration tests.
//!
//! Provides a scripted transport, SSE frame builders and client constructors
//! so subscription tests can run against paused tokio time.

#![allow(dead_code)]

use async_trait::async_trait;
use easydeploy::api::ApiBase;
use easydeploy::auth::{AuthContext, CookieJar, MemoryStore, TOKEN_STORAGE_KEY};
use easydeploy::config::StreamConfig;
use easydeploy::stream::{ByteStream, StreamClient, Transport, TransportError};
use futures::StreamExt;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

// =============================================================================
// Well-Known Test Constants
// =============================================================================

pub const TEST_BASE_URL: &str = "http://deploy.test";

pub const TEST_TOKEN: &str = "test-token";

/// Generous bound for waits under paused time; auto-advance makes it cheap.
pub const WAIT: Duration = Duration::from_secs(600);

// =============================================================================
// SSE Frame Builders
// =============================================================================

/// One SSE frame with an event name.
pub fn frame(event: &str, data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

/// A `logs` frame carrying `(timestamp, message)` pairs.
pub fn logs_frame(entries: &[(&str, &str)]) -> String {
    let batch: Vec<_> = entries
        .iter()
        .map(|(ts, msg)| serde_json::json!({"timestamp": ts, "message": msg}))
        .collect();
    frame("logs", &serde_json::Value::Array(batch).to_string())
}

/// A `metrics` frame at `timestamp` epoch milliseconds.
pub fn metrics_frame(timestamp: i64) -> String {
    frame(
        "metrics",
        &serde_json::json!({
            "timestamp": timestamp,
            "dashboard": {"totalContainers": 1, "runningContainers": 1},
            "containers": [{"id": "c1", "name": "web", "status": "running"}]
        })
        .to_string(),
    )
}

// =============================================================================
// Scripted Transport
// =============================================================================

/// What one connect attempt does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Connect fails with this error
    Refuse(TransportError),
    /// Connect succeeds, delivers these chunks, then stays open
    Stream(Vec<String>),
    /// Connect succeeds, delivers these chunks, then the server ends the stream
    StreamThenClose(Vec<String>),
}

/// Transport that plays back a script, one [`Step`] per connect attempt.
/// Once the script runs out every further attempt uses `fallback`.
pub struct MockTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    connects: AtomicUsize,
    urls: Mutex<Vec<Url>>,
}

impl MockTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::with_fallback(steps, Step::Stream(vec![]))
    }

    /// Every attempt is refused.
    pub fn refusing() -> Arc<Self> {
        Self::with_fallback(
            vec![],
            Step::Refuse(TransportError::Connect("connection refused".to_string())),
        )
    }

    pub fn with_fallback(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fallback,
            connects: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    /// Number of transports constructed so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// URLs of every connect attempt, in order.
    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &Url) -> Result<ByteStream, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Refuse(error) => Err(error),
            Step::Stream(chunks) => {
                let chunks = chunks.into_iter().map(|c| Ok(c.into_bytes()));
                Ok(futures::stream::iter(chunks)
                    .chain(futures::stream::pending())
                    .boxed())
            }
            Step::StreamThenClose(chunks) => {
                let chunks = chunks.into_iter().map(|c| Ok(c.into_bytes()));
                Ok(futures::stream::iter(chunks).boxed())
            }
        }
    }
}

// =============================================================================
// Client Builders
// =============================================================================

/// Auth context whose flat `auth_token` entry holds `token`.
pub fn auth_with_token(token: &str) -> (Arc<MemoryStore>, AuthContext) {
    let store = Arc::new(MemoryStore::with_entries([(TOKEN_STORAGE_KEY, token)]));
    let auth = AuthContext::new(store.clone(), CookieJar::new());
    (store, auth)
}

pub fn client(transport: Arc<MockTransport>, auth: AuthContext, config: StreamConfig) -> StreamClient {
    StreamClient::new(
        ApiBase::parse(TEST_BASE_URL).unwrap(),
        auth,
        transport,
        config,
    )
}

/// Wait until `predicate` holds for the watched value, bounded by [`WAIT`].
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("sender dropped")
        .clone()
}
