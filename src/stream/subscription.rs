//! Connection manager.
//!
//! A [`Subscription`] owns at most one live transport. Enabling it resolves
//! the token up front (failing fast without touching the network), then spawns
//! a task that connects, decodes events into the handler, and follows the
//! [`ReconnectPolicy`] on failure. Disabling or dropping it cancels the task.
//!
//! Every state publication happens under the handler lock after checking the
//! cancellation token, and `disable` cancels under the same lock. Once
//! `disable` returns, no late message or timer can change observable state.

use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::{ApiBase, ApiError, StreamEndpoint};
use crate::auth::{AuthContext, AuthError, ResolvedToken};
use crate::config::{EasyDeployConfig, StreamConfig};

use super::decoder::{self, StreamEvent};
use super::handler::{Applied, AppLogsHandler, LogsHandler, MetricsHandler, StreamHandler};
use super::policy::{LinkState, ReconnectPolicy, RetryDecision};
use super::sse::sse_events;
use super::transport::{HttpTransport, Transport, TransportError};
use super::types::StreamSnapshot;

/// Errors surfaced synchronously when enabling a subscription.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to build transport: {0}")]
    Transport(#[from] TransportError),
}

struct ClientInner {
    api: ApiBase,
    auth: AuthContext,
    transport: Arc<dyn Transport>,
    config: StreamConfig,
}

/// Factory for subscriptions sharing one API base, auth context and transport.
#[derive(Clone)]
pub struct StreamClient {
    inner: Arc<ClientInner>,
}

impl StreamClient {
    pub fn new(
        api: ApiBase,
        auth: AuthContext,
        transport: Arc<dyn Transport>,
        config: StreamConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                api,
                auth,
                transport,
                config,
            }),
        }
    }

    /// Build a client with the HTTP transport from full configuration.
    pub fn from_config(config: &EasyDeployConfig, auth: AuthContext) -> Result<Self, StreamError> {
        let api = ApiBase::parse(&config.api.base_url)?;
        let transport = HttpTransport::new(Duration::from_secs(config.api.connect_timeout_seconds))?;
        Ok(Self::new(api, auth, Arc::new(transport), config.stream.clone()))
    }

    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }

    pub fn auth(&self) -> &AuthContext {
        &self.inner.auth
    }

    /// Container log subscription backed by a bounded dedup buffer.
    pub fn container_logs(&self, container_id: impl Into<String>) -> Subscription<LogsHandler> {
        self.subscribe(
            StreamEndpoint::container_logs(container_id),
            LogsHandler::new(self.inner.config.log_buffer_capacity),
        )
    }

    /// Single-application cumulative log subscription.
    pub fn app_logs(&self, app_id: impl Into<String>) -> Subscription<AppLogsHandler> {
        self.subscribe(StreamEndpoint::app_logs(app_id), AppLogsHandler::new())
    }

    /// Dashboard metrics subscription.
    pub fn dashboard_metrics(&self) -> Subscription<MetricsHandler> {
        self.subscribe(StreamEndpoint::DashboardMetrics, MetricsHandler::new())
    }

    /// Create a disabled subscription for any endpoint/handler pair.
    pub fn subscribe<H: StreamHandler>(&self, endpoint: StreamEndpoint, handler: H) -> Subscription<H> {
        let (state, _) = watch::channel(StreamSnapshot::default());
        let (link, _) = watch::channel(LinkState::Idle);
        Subscription {
            id: Uuid::new_v4(),
            endpoint,
            client: self.clone(),
            core: Arc::new(Core {
                handler: Mutex::new(handler),
                state,
                link,
            }),
            running: None,
        }
    }
}

/// State shared between a subscription handle and its task.
struct Core<H: StreamHandler> {
    /// Also the publication gate; see module docs.
    handler: Mutex<H>,
    state: watch::Sender<StreamSnapshot<H::View>>,
    link: watch::Sender<LinkState>,
}

impl<H: StreamHandler> Core<H> {
    fn gate(&self) -> MutexGuard<'_, H> {
        match self.handler.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `f` against the handler and snapshot unless cancelled. Returns
    /// false when the subscription has been torn down.
    fn update<F>(&self, cancel: &CancellationToken, f: F) -> bool
    where
        F: FnOnce(&mut H, &mut StreamSnapshot<H::View>) -> bool,
    {
        let mut handler = self.gate();
        if cancel.is_cancelled() {
            return false;
        }
        self.state.send_if_modified(|snapshot| f(&mut *handler, snapshot));
        true
    }

    fn set_link(&self, cancel: &CancellationToken, link: LinkState) -> bool {
        let _handler = self.gate();
        if cancel.is_cancelled() {
            return false;
        }
        self.link.send_replace(link);
        true
    }
}

struct Running {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// One telemetry subscription. Dropping it tears the connection down.
pub struct Subscription<H: StreamHandler> {
    id: Uuid,
    endpoint: StreamEndpoint,
    client: StreamClient,
    core: Arc<Core<H>>,
    running: Option<Running>,
}

impl<H: StreamHandler> Subscription<H> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// True while a connection task is alive.
    pub fn is_enabled(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| !r.cancel.is_cancelled() && !r.join.is_finished())
            .unwrap_or(false)
    }

    /// Observe data and connection state.
    pub fn watch(&self) -> watch::Receiver<StreamSnapshot<H::View>> {
        self.core.state.subscribe()
    }

    /// Observe the reconnection state machine.
    pub fn link(&self) -> watch::Receiver<LinkState> {
        self.core.link.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> StreamSnapshot<H::View> {
        self.core.state.borrow().clone()
    }

    pub fn link_state(&self) -> LinkState {
        *self.core.link.borrow()
    }

    /// Start streaming. A no-op while already enabled.
    ///
    /// The token is resolved before anything else; if none is found the
    /// error is recorded in the connection state and returned, and no
    /// transport is constructed. Must be called within a Tokio runtime.
    pub fn enable(&mut self) -> Result<(), StreamError> {
        if self.is_enabled() {
            tracing::debug!(subscription_id = %self.id, "Subscription already enabled");
            return Ok(());
        }
        self.disable();

        let token = match self.client.inner.auth.resolve_token() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(
                    subscription_id = %self.id,
                    endpoint = %self.endpoint,
                    error = %e,
                    "Cannot open stream without a token"
                );
                let message = e.to_string();
                self.core.state.send_modify(|snapshot| {
                    snapshot.connection.is_connected = false;
                    snapshot.connection.last_error = Some(message);
                });
                return Err(e.into());
            }
        };
        // Fail on a bad endpoint before spawning
        self.client
            .inner
            .api
            .stream_url(&self.endpoint, &token.token)?;

        let cancel = CancellationToken::new();
        self.core.link.send_replace(LinkState::Idle);

        let span = tracing::info_span!(
            "subscription",
            subscription_id = %self.id,
            endpoint = %self.endpoint
        );
        let task = SubscriptionTask {
            client: self.client.clone(),
            core: Arc::clone(&self.core),
            endpoint: self.endpoint.clone(),
            cancel: cancel.clone(),
        };
        let join = tokio::spawn(task.run(token).instrument(span));

        self.running = Some(Running { cancel, join });
        Ok(())
    }

    /// Stop streaming: closes the transport and cancels any pending
    /// reconnect. Idempotent.
    pub fn disable(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        {
            let _gate = self.core.gate();
            running.cancel.cancel();
            if !self.core.link.borrow().is_terminal() {
                self.core.link.send_replace(LinkState::Closed);
            }
        }
        self.core.state.send_if_modified(|snapshot| {
            let was = snapshot.connection.is_connected;
            snapshot.connection.is_connected = false;
            was
        });
        tracing::debug!(subscription_id = %self.id, "Subscription disabled");
    }

    /// Enable or disable to match `enabled`.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), StreamError> {
        if enabled {
            self.enable()
        } else {
            self.disable();
            Ok(())
        }
    }
}

impl<H: StreamHandler> Drop for Subscription<H> {
    fn drop(&mut self) {
        self.disable();
    }
}

struct SubscriptionTask<H: StreamHandler> {
    client: StreamClient,
    core: Arc<Core<H>>,
    endpoint: StreamEndpoint,
    cancel: CancellationToken,
}

impl<H: StreamHandler> SubscriptionTask<H> {
    async fn run(self, initial: ResolvedToken) {
        let inner = &self.client.inner;
        let mut policy = ReconnectPolicy::new(inner.config.reconnect.clone());
        let mut token = Some(initial);

        loop {
            let resolved = match token.take() {
                Some(t) => t,
                None => match inner.auth.resolve_token() {
                    Ok(t) => t,
                    Err(e) => {
                        self.fail_closed(&mut policy, e.to_string());
                        return;
                    }
                },
            };

            if policy.begin_connect().is_err() || !self.publish_link(&policy) {
                return;
            }
            if !self.core.update(&self.cancel, |_, snapshot| {
                let modified =
                    snapshot.connection.is_connected || snapshot.connection.last_error.is_some();
                snapshot.connection.is_connected = false;
                snapshot.connection.last_error = None;
                modified
            }) {
                return;
            }

            let url = match inner.api.stream_url(&self.endpoint, &resolved.token) {
                Ok(url) => url,
                Err(e) => {
                    self.fail_closed(&mut policy, e.to_string());
                    return;
                }
            };
            tracing::debug!(
                attempt = policy.total_attempts(),
                token_source = %resolved.source,
                "Connecting stream"
            );

            let error = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = inner.transport.connect(&url) => match result {
                    Ok(stream) => match self.consume(stream, &mut policy).await {
                        Some(error) => error,
                        None => return,
                    },
                    Err(error) => error,
                },
            };

            // Failed transport is already dropped here
            let decision = match policy.failed() {
                Ok(decision) => decision,
                Err(_) => return,
            };

            let message = error.to_string();
            if !self.core.update(&self.cancel, |_, snapshot| {
                snapshot.connection.is_connected = false;
                snapshot.connection.last_error = Some(message);
                true
            }) {
                return;
            }

            match decision {
                RetryDecision::RetryAfter(delay) => {
                    metrics::counter!("easydeploy_stream_reconnects_total").increment(1);
                    tracing::warn!(
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        failures = policy.consecutive_failures(),
                        "Stream error; reconnecting after delay"
                    );
                    if !self.publish_link(&policy) {
                        return;
                    }
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::GiveUp => {
                    tracing::error!(
                        error = %error,
                        failures = policy.consecutive_failures(),
                        "Stream retry budget exhausted"
                    );
                    self.publish_link(&policy);
                    return;
                }
            }

            if !inner.config.reresolve_token_on_reconnect {
                token = Some(resolved);
            }
        }
    }

    /// Read an open stream until it fails. Returns `None` when cancelled.
    async fn consume(
        &self,
        stream: super::transport::ByteStream,
        policy: &mut ReconnectPolicy,
    ) -> Option<TransportError> {
        if policy.opened().is_err() || !self.publish_link(policy) {
            return None;
        }
        if !self.core.update(&self.cancel, |_, snapshot| {
            snapshot.connection.is_connected = true;
            snapshot.connection.last_error = None;
            true
        }) {
            return None;
        }
        tracing::info!("Stream connected");

        let events = sse_events(stream);
        futures::pin_mut!(events);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                next = events.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => {
                    policy.received();
                    event
                }
                Some(Err(e)) => return Some(e),
                None => return Some(TransportError::Closed),
            };

            match decoder::decode(&event) {
                Ok(Some(StreamEvent::Heartbeat(payload))) => {
                    metrics::counter!("easydeploy_stream_events_total", "event" => "heartbeat")
                        .increment(1);
                    tracing::trace!(payload = %payload, "Heartbeat");
                }
                Ok(Some(decoded)) => {
                    metrics::counter!("easydeploy_stream_events_total", "event" => decoded.name())
                        .increment(1);
                    let applied = self.core.update(&self.cancel, |handler, snapshot| {
                        match handler.apply(decoded) {
                            Applied::Changed(at) => {
                                snapshot.data = handler.view();
                                snapshot.connection.last_update = Some(at);
                                true
                            }
                            Applied::Unchanged => false,
                        }
                    });
                    if !applied {
                        return None;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    metrics::counter!("easydeploy_stream_decode_errors_total", "event" => e.event.clone())
                        .increment(1);
                    tracing::warn!(error = %e, "Dropping malformed stream payload");
                }
            }
        }
    }

    fn publish_link(&self, policy: &ReconnectPolicy) -> bool {
        self.core.set_link(&self.cancel, policy.state())
    }

    /// Record a non-retryable failure and stop.
    fn fail_closed(&self, policy: &mut ReconnectPolicy, message: String) {
        tracing::error!(error = %message, "Stream stopped");
        policy.close();
        self.core.update(&self.cancel, |_, snapshot| {
            snapshot.connection.is_connected = false;
            snapshot.connection.last_error = Some(message);
            true
        });
        self.publish_link(policy);
    }
}
