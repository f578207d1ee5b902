//! In-process hub used by the integration tests: a single-connection websocket
//! server that records what the client sends and replays scripted traffic.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use futures_util::{SinkExt, StreamExt};
use lib_livehub::protocol::RECORD_SEPARATOR;
use lib_livehub::{EventName, LiveEvent, LiveHubClient};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Upper bound for any single wait in the tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Something the client sent to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// A close frame and its status code, if any.
    Close(Option<u16>),
    /// The transport ended.
    Ended,
}

/// Scripted hub behaviour.
#[derive(Debug)]
pub enum HubAction {
    Send(String),
    Close(Option<(u16, String)>),
    /// Send a close frame, read the client's reply, then keep the socket open
    /// without reading until dropped.
    CloseAndHold(u16, String),
    /// Drop the TCP connection without a close handshake.
    Drop,
}

pub struct MockHub {
    url: String,
    request_uri: Option<oneshot::Receiver<String>>,
    inbound: mpsc::UnboundedReceiver<(Inbound, Instant)>,
    actions: mpsc::UnboundedSender<HubAction>,
    _task: JoinHandle<()>,
}

impl MockHub {
    /// Binds an ephemeral local port and serves exactly one connection.
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (uri_tx, uri_rx) = oneshot::channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            match listener.accept().await {
                Ok((stream, _)) => serve(stream, uri_tx, inbound_tx, action_rx).await,
                Err(e) => log::warn!("Mock hub accept failed: {}", e),
            }
        });

        Ok(Self {
            url: format!("ws://{}/tiktokHub", addr),
            request_uri: Some(uri_rx),
            inbound: inbound_rx,
            actions: action_tx,
            _task: task,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path and query of the upgrade request.
    pub async fn request_uri(&mut self) -> Result<String> {
        let rx = self.request_uri.take().context("request uri already taken")?;
        Ok(tokio::time::timeout(WAIT, rx).await??)
    }

    pub async fn next_inbound(&mut self) -> Result<Inbound> {
        Ok(self.next_inbound_timed().await?.0)
    }

    /// Like [`MockHub::next_inbound`], with the instant the hub read it.
    pub async fn next_inbound_timed(&mut self) -> Result<(Inbound, Instant)> {
        tokio::time::timeout(WAIT, self.inbound.recv())
            .await?
            .ok_or_else(|| anyhow!("mock hub stopped"))
    }

    pub async fn next_text(&mut self) -> Result<String> {
        match self.next_inbound().await? {
            Inbound::Text(text) => Ok(text),
            other => Err(anyhow!("expected a text frame, got {:?}", other)),
        }
    }

    /// Skips frames until the client's close frame (or transport end) shows up.
    pub async fn wait_for_close(&mut self) -> Result<Option<u16>> {
        loop {
            match self.next_inbound().await? {
                Inbound::Text(_) => continue,
                Inbound::Close(code) => return Ok(code),
                Inbound::Ended => return Err(anyhow!("transport ended without a close frame")),
            }
        }
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.act(HubAction::Send(text.into()))
    }

    pub fn close(&self, code: u16, reason: &str) -> Result<()> {
        self.act(HubAction::Close(Some((code, reason.to_string()))))
    }

    pub fn close_and_hold(&self, code: u16, reason: &str) -> Result<()> {
        self.act(HubAction::CloseAndHold(code, reason.to_string()))
    }

    pub fn close_without_status(&self) -> Result<()> {
        self.act(HubAction::Close(None))
    }

    pub fn drop_connection(&self) -> Result<()> {
        self.act(HubAction::Drop)
    }

    fn act(&self, action: HubAction) -> Result<()> {
        self.actions.send(action).map_err(|_| anyhow!("mock hub stopped"))
    }
}

async fn serve(
    stream: TcpStream,
    uri_tx: oneshot::Sender<String>,
    inbound: mpsc::UnboundedSender<(Inbound, Instant)>,
    mut actions: mpsc::UnboundedReceiver<HubAction>,
) {
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let _ = uri_tx.send(req.uri().to_string());
        Ok(resp)
    };
    let ws = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            log::warn!("Mock hub handshake failed: {}", e);
            return;
        }
    };
    let (mut write, mut read) = ws.split();
    let record = |item: Inbound| {
        let _ = inbound.send((item, Instant::now()));
    };
    let mut hold_after_close = false;

    loop {
        tokio::select! {
            action = actions.recv() => match action {
                Some(HubAction::Send(text)) => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                Some(HubAction::Close(frame)) => {
                    let frame = frame.map(|(code, reason)| CloseFrame { code: CloseCode::from(code), reason: reason.into() });
                    let _ = write.send(Message::Close(frame)).await;
                }
                Some(HubAction::CloseAndHold(code, reason)) => {
                    hold_after_close = true;
                    let frame = CloseFrame { code: CloseCode::from(code), reason: reason.into() };
                    let _ = write.send(Message::Close(Some(frame))).await;
                }
                Some(HubAction::Drop) | None => return,
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => record(Inbound::Text(text.as_str().to_string())),
                Some(Ok(Message::Close(frame))) => {
                    record(Inbound::Close(frame.map(|f| u16::from(f.code))));
                    if hold_after_close {
                        // Keep both halves alive; only an explicit drop ends it.
                        while let Some(action) = actions.recv().await {
                            if matches!(action, HubAction::Drop) {
                                return;
                            }
                        }
                        return;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => {
                    record(Inbound::Ended);
                    return;
                }
            },
        }
    }
}

/// A relay invocation envelope carrying `message` under `method`.
pub fn relay_envelope<M: prost::Message>(method: &str, message: &M) -> String {
    let payload = general_purpose::STANDARD.encode(message.encode_to_vec());
    relay_envelope_raw(method, &payload)
}

/// A relay invocation envelope with a caller-supplied payload string.
pub fn relay_envelope_raw(method: &str, payload: &str) -> String {
    json!({
        "type": 1,
        "target": "rawTikTokMessage",
        "arguments": [{ "method": method, "payload": payload }]
    })
    .to_string()
}

pub fn ping_envelope() -> String {
    json!({ "type": 6 }).to_string()
}

/// Joins envelopes into one transport frame, each terminated by the separator.
pub fn frame(envelopes: &[String]) -> String {
    envelopes
        .iter()
        .map(|envelope| format!("{}{}", envelope, RECORD_SEPARATOR))
        .collect()
}

/// Forwards every event published under `events` into a channel.
pub fn collect(client: &LiveHubClient, events: &[EventName]) -> mpsc::UnboundedReceiver<LiveEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    for &event in events {
        let tx = tx.clone();
        client.on(event, move |payload| {
            tx.send(payload.clone()).map_err(|_| anyhow!("collector closed"))
        });
    }
    rx
}

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<LiveEvent>) -> Result<LiveEvent> {
    tokio::time::timeout(WAIT, rx.recv())
        .await?
        .ok_or_else(|| anyhow!("event channel closed"))
}
