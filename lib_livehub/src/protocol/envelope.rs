//! # Envelope Codec
//!
//! The hub speaks the SignalR JSON hub protocol: every transport frame carries
//! zero or more JSON envelopes, each terminated by the ASCII record separator
//! (`U+001E`). This module splits frames, parses envelopes, recognizes the few
//! shapes the client cares about, and builds the two frames the client sends
//! when the connection opens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::LiveHubError;

/// Delimiter between consecutive envelopes inside one transport frame.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Envelope type discriminator for an invocation.
pub const INVOCATION_TYPE: i64 = 1;

/// Envelope type discriminator reserved for keepalive pings.
pub const PING_TYPE: i64 = 6;

/// Hub method that relays live events to the client.
pub const RELAY_TARGET: &str = "rawTikTokMessage";

/// Hub method the client invokes to join a live session.
pub const JOIN_TARGET: &str = "JoinLiveStream";

/// One decoded JSON envelope from the wire.
///
/// Only the fields used for recognition are kept; everything else the hub
/// sends is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    /// The numeric type discriminator, when present.
    #[serde(rename = "type", default)]
    pub kind: Option<Value>,
    /// The remote procedure name of an invocation.
    #[serde(default)]
    pub target: Option<String>,
    /// The invocation arguments.
    #[serde(default)]
    pub arguments: Option<Vec<Value>>,
}

/// The `{ method, payload }` record carried by a relay invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventMessage {
    /// Transport-level message kind, optionally prefixed with `Webcast`.
    pub method: String,
    /// Base64 encoded protobuf payload.
    pub payload: String,
}

/// What a parsed envelope turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognized {
    /// A hub ping; dropped without further action.
    Keepalive,
    /// A relayed live event, ready for the dispatch table.
    RawEvent(RawEventMessage),
    /// Any other invocation or control envelope.
    Ignored,
}

/// Splits a raw transport frame into envelope strings.
///
/// Empty fragments, including the one produced by a trailing separator, are
/// never yielded.
pub fn split_frame(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(RECORD_SEPARATOR).filter(|fragment| !fragment.is_empty())
}

/// Parses one envelope fragment as JSON.
pub fn parse_envelope(text: &str) -> Result<Envelope, LiveHubError> {
    Ok(serde_json::from_str(text)?)
}

impl Envelope {
    /// Applies the recognition rules in order: keepalive, relay invocation,
    /// everything else.
    pub fn recognize(self) -> Result<Recognized, LiveHubError> {
        if self.kind.as_ref().and_then(Value::as_i64) == Some(PING_TYPE) {
            return Ok(Recognized::Keepalive);
        }

        if self.target.as_deref() != Some(RELAY_TARGET) {
            return Ok(Recognized::Ignored);
        }

        match self.arguments.and_then(|args| args.into_iter().next()) {
            Some(first) if is_present(&first) => {
                Ok(Recognized::RawEvent(serde_json::from_value(first)?))
            }
            _ => Ok(Recognized::Ignored),
        }
    }
}

/// An argument counts as present unless it is null, false, zero or empty text.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Serialize)]
struct HandshakeRequest<'a> {
    protocol: &'a str,
    version: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvocationRequest<'a> {
    #[serde(rename = "type")]
    kind: i64,
    invocation_id: &'a str,
    target: &'a str,
    /// Serializes compactly as `["<target>",{}]`. Hubs compare the parsed JSON,
    /// so the missing space after the comma is not a difference.
    arguments: (&'a str, Map<String, Value>),
}

fn terminated<T: Serialize>(envelope: &T) -> Result<String, LiveHubError> {
    let mut frame = serde_json::to_string(envelope)?;
    frame.push(RECORD_SEPARATOR);
    Ok(frame)
}

/// The protocol handshake: `{"protocol":"json","version":1}` plus separator.
pub fn handshake_frame() -> Result<String, LiveHubError> {
    terminated(&HandshakeRequest {
        protocol: "json",
        version: 1,
    })
}

/// The invocation that subscribes the connection to `target_id`.
pub fn join_frame(target_id: &str) -> Result<String, LiveHubError> {
    terminated(&InvocationRequest {
        kind: INVOCATION_TYPE,
        invocation_id: "1",
        target: JOIN_TARGET,
        arguments: (target_id, Map::new()),
    })
}
