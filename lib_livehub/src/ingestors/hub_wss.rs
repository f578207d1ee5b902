//! # Live Hub WSS Ingestor
//!
//! Owns the websocket connection to the hub for one live target.
//!
//! Lifecycle: `Unconfigured -> Configured -> Connecting -> Joined -> Closed`.
//! There is no separate error state: a transport failure publishes
//! `disconnected` and lands in `Closed`. The client never reconnects on its
//! own; construct a new client (see [`LiveHubClient::supersede`]) to try again.
//!
//! Each connection is driven by one spawned task that reads frames strictly in
//! arrival order and runs the whole decode-and-publish pipeline for a frame
//! before reading the next one. Subscriber callbacks execute on that task, so
//! long-running work inside a callback stalls the stream and should be handed
//! off instead.
//!
//! There is no timeout on the handshake or join: if the hub never answers, the
//! client simply stays `Joined`. A hub that sends its close frame but keeps
//! the socket open is given [`CLOSE_DRAIN_TIMEOUT`] before the connection is
//! treated as closed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::configs::hub_options::{derive_endpoint, resolve_credential, HubOptions};
use crate::core::dispatcher::Dispatcher;
use crate::core::events::{EventName, LiveEvent};
use crate::core::registry::{Registry, SubscriptionId};
use crate::errors::LiveHubError;
use crate::protocol::envelope::{handshake_frame, join_frame};

/// Close code reported when the client closes normally.
pub const NORMAL_CLOSE: u16 = 1000;
/// Close code reported when the hub sent a close frame without a status.
pub const NO_STATUS_CLOSE: u16 = 1005;
/// Close code reported when the transport dropped without a close handshake.
pub const ABNORMAL_CLOSE: u16 = 1006;

/// How long the socket is drained after the hub's close frame before the
/// connection is considered closed anyway.
pub const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of a [`LiveHubClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No credential yet.
    Unconfigured,
    /// Credential resolved and endpoint derived.
    Configured,
    /// Transport is being opened.
    Connecting,
    /// Handshake and join sent; events are flowing.
    Joined,
    /// Terminal. `disconnected` has been published.
    Closed,
}

/// Client for one live target on the hub.
pub struct LiveHubClient {
    target_id: String,
    options: HubOptions,
    endpoint: Option<Url>,
    registry: Arc<Registry>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LiveHubClient {
    /// Creates a client for `target_id`. Nothing touches the network until
    /// [`configure`](Self::configure) and [`connect`](Self::connect) are called.
    pub fn new(target_id: impl Into<String>, options: HubOptions) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Unconfigured);
        Self {
            target_id: target_id.into(),
            options,
            endpoint: None,
            registry: Arc::new(Registry::new()),
            state_tx: Arc::new(state_tx),
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    /// The live target this client subscribes to.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// The derived transport endpoint, once configured.
    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// A receiver that observes every state change.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// This client's subscriber registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Registers `callback` for `event`. See [`Registry::on`].
    pub fn on<F>(&self, event: EventName, callback: F) -> SubscriptionId
    where
        F: Fn(&LiveEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.on(event, callback)
    }

    /// Resolves the credential and derives the endpoint.
    ///
    /// `credential` wins when non-blank; otherwise the `token` query parameter
    /// of the configured page location is used. Only valid once, before
    /// connecting.
    pub fn configure(&mut self, credential: Option<&str>) -> Result<(), LiveHubError> {
        if self.state() != ConnectionState::Unconfigured {
            return Err(LiveHubError::Configuration(
                "Access token has already been set for this client".to_string(),
            ));
        }

        let token = resolve_credential(credential, self.options.page_location.as_deref())?;
        let endpoint = derive_endpoint(&self.options.hub_url, &token)?;
        log::info!(
            "Access token set for live target '{}'. Hub: {}",
            self.target_id,
            self.options.hub_url
        );

        self.endpoint = Some(endpoint);
        self.state_tx.send_replace(ConnectionState::Configured);
        Ok(())
    }

    /// Opens the transport on a spawned task and returns immediately.
    ///
    /// Fails only with a configuration error: not configured yet, already
    /// connected, or no tokio runtime to run on. Transport failures are
    /// reported through the `disconnected` event.
    pub fn connect(&mut self) -> Result<(), LiveHubError> {
        match self.state() {
            ConnectionState::Configured => {}
            ConnectionState::Unconfigured => {
                return Err(LiveHubError::Configuration(
                    "Access token has not been set. Call configure() before connect().".to_string(),
                ))
            }
            _ => {
                return Err(LiveHubError::Configuration(
                    "connect() may only be called once per client".to_string(),
                ))
            }
        }

        let endpoint = self.endpoint.clone().ok_or_else(|| {
            LiveHubError::Configuration("Endpoint missing for configured client".to_string())
        })?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LiveHubError::Configuration(format!("No tokio runtime available: {}", e)))?;

        self.state_tx.send_replace(ConnectionState::Connecting);
        let connection = Connection {
            endpoint,
            target_id: self.target_id.clone(),
            dispatcher: Dispatcher::new(Arc::clone(&self.registry)),
            state_tx: Arc::clone(&self.state_tx),
            shutdown: self.shutdown.clone(),
        };
        self.task = Some(runtime.spawn(connection.run()));
        Ok(())
    }

    /// Closes the transport and waits for the connection task to finish.
    ///
    /// Callbacks already running are not interrupted; no frame is dispatched
    /// after the close is observed.
    pub async fn close(&mut self) {
        self.shutdown.cancel();
        match self.task.take() {
            Some(task) => {
                if let Err(e) = task.await {
                    log::error!("Connection task for '{}' ended abnormally: {}", self.target_id, e);
                }
            }
            None => {
                self.state_tx.send_replace(ConnectionState::Closed);
            }
        }
    }

    /// Waits until the client reaches `Closed`.
    ///
    /// A client that was never connected only gets there through
    /// [`close`](Self::close).
    pub async fn wait_closed(&self) {
        let mut rx = self.state_tx.subscribe();
        let _ = rx.wait_for(|state| *state == ConnectionState::Closed).await;
    }

    /// Takes over `slot` and connects: the client currently held there is
    /// closed first, so only one client owns a transport at any moment.
    ///
    /// `self` must be `Configured`. Otherwise a configuration error is
    /// returned and `slot` is left untouched.
    pub async fn supersede(self, slot: &mut Option<LiveHubClient>) -> Result<(), LiveHubError> {
        if self.state() != ConnectionState::Configured {
            return Err(LiveHubError::Configuration(format!(
                "supersede() needs a configured, unconnected client; '{}' is {:?}",
                self.target_id,
                self.state()
            )));
        }

        if let Some(mut prior) = slot.take() {
            log::info!(
                "Closing client for '{}' before handing over to '{}'",
                prior.target_id,
                self.target_id
            );
            prior.close().await;
        }
        slot.insert(self).connect()
    }
}

impl Drop for LiveHubClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Everything the connection task needs; moved into the task.
struct Connection {
    endpoint: Url,
    target_id: String,
    dispatcher: Dispatcher,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    shutdown: CancellationToken,
}

impl Connection {
    async fn run(self) {
        let reason = self.drive().await;
        log::info!("Live hub connection for '{}' ended: {}", self.target_id, reason);
        self.dispatcher.registry().publish(&LiveEvent::Disconnected { reason });
        self.state_tx.send_replace(ConnectionState::Closed);
    }

    /// Runs the connection to completion and returns the disconnect reason.
    async fn drive(&self) -> String {
        log::info!("Connecting to live hub for target '{}'", self.target_id);

        let opened = tokio::select! {
            _ = self.shutdown.cancelled() => {
                return close_reason(NORMAL_CLOSE, "client closed before open");
            }
            result = connect_async(self.endpoint.as_str()) => result,
        };
        let ws_stream = match opened {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                log::error!("{}", LiveHubError::Transport(e.to_string()));
                return format!("connection error: {}", e);
            }
        };

        let (mut write, mut read) = ws_stream.split();
        if let Err(e) = open_session(&mut write, &self.target_id, &self.state_tx, self.dispatcher.registry()).await {
            log::error!("{}", e);
            return close_reason(ABNORMAL_CLOSE, &e.to_string());
        }

        // Set once the hub's close frame arrives; reading continues so the
        // close reply gets flushed, for at most CLOSE_DRAIN_TIMEOUT.
        let mut closing: Option<String> = None;
        let drain = tokio::time::sleep(CLOSE_DRAIN_TIMEOUT);
        tokio::pin!(drain);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    if let Some(reason) = closing.take() {
                        return reason;
                    }
                    let frame = CloseFrame { code: CloseCode::Normal, reason: "client closed".into() };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        log::debug!("Close frame not delivered: {}", e);
                    }
                    return close_reason(NORMAL_CLOSE, "client closed");
                }
                _ = &mut drain, if closing.is_some() => {
                    log::debug!("Hub kept the socket open after its close frame; giving up on the drain");
                    if let Some(reason) = closing.take() {
                        return reason;
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if closing.is_none() {
                                self.dispatcher.handle_frame(text.as_str());
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, text) = frame
                                .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                                .unwrap_or((NO_STATUS_CLOSE, String::new()));
                            log::info!("Hub closed the connection (code: {}, reason: {})", code, text);
                            if closing.is_none() {
                                closing = Some(close_reason(code, &text));
                                drain.as_mut().reset(Instant::now() + CLOSE_DRAIN_TIMEOUT);
                                if let Err(e) = write.flush().await {
                                    log::debug!("Close reply not flushed: {}", e);
                                }
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            log::trace!("Ignoring binary frame of {} bytes", data.len());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            if let Some(reason) = closing.take() {
                                return reason;
                            }
                            log::error!("{}", LiveHubError::Transport(e.to_string()));
                            return close_reason(ABNORMAL_CLOSE, &e.to_string());
                        }
                        None => {
                            return closing.take().unwrap_or_else(|| {
                                close_reason(ABNORMAL_CLOSE, "stream ended without a close frame")
                            });
                        }
                    }
                }
            }
        }
    }
}

/// Sends the handshake then the join invocation, then marks the connection
/// joined and publishes `connected`. Nothing inbound is read in between.
async fn open_session<S>(
    sink: &mut S,
    target_id: &str,
    state_tx: &watch::Sender<ConnectionState>,
    registry: &Registry,
) -> Result<(), LiveHubError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    for frame in [handshake_frame()?, join_frame(target_id)?] {
        sink.send(Message::Text(frame.into()))
            .await
            .map_err(|e| LiveHubError::Transport(e.to_string()))?;
    }
    log::info!("Handshake and join sent for live target '{}'", target_id);

    state_tx.send_replace(ConnectionState::Joined);
    registry.publish(&LiveEvent::Connected);
    Ok(())
}

fn close_reason(code: u16, reason: &str) -> String {
    format!("connection closed (code: {}, reason: {})", code, reason)
}
