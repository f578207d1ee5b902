//! # Published Events
//!
//! The closed set of event names subscribers can register for, and the typed
//! values delivered with them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::LiveHubError;
use crate::protocol::proto_handler::{
    ChatMessage, ControlMessage, GiftMessage, LikeMessage, MemberMessage, RoomMessage,
    RoomUserSeqMessage, ShareMessage, SocialMessage,
};

/// Name under which an event is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// The transport opened and the join invocation was sent.
    Connected,
    /// The transport failed or closed.
    Disconnected,
    /// A chat comment.
    Chat,
    /// A burst of likes.
    Like,
    /// A social interaction, published ahead of `follow`.
    Social,
    /// A gift.
    Gift,
    /// A viewer joined.
    Join,
    /// A follow.
    Follow,
    /// A share.
    Share,
    /// A room control signal.
    Control,
    /// A room system message.
    Room,
    /// A viewer-count and ranking update.
    RoomUserSeq,
}

impl EventName {
    /// Every publishable event name.
    pub const ALL: [EventName; 12] = [
        EventName::Connected,
        EventName::Disconnected,
        EventName::Chat,
        EventName::Like,
        EventName::Social,
        EventName::Gift,
        EventName::Join,
        EventName::Follow,
        EventName::Share,
        EventName::Control,
        EventName::Room,
        EventName::RoomUserSeq,
    ];

    /// The wire-facing name, e.g. `"roomUserSeq"`.
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::Connected => "connected",
            EventName::Disconnected => "disconnected",
            EventName::Chat => "chat",
            EventName::Like => "like",
            EventName::Social => "social",
            EventName::Gift => "gift",
            EventName::Join => "join",
            EventName::Follow => "follow",
            EventName::Share => "share",
            EventName::Control => "control",
            EventName::Room => "room",
            EventName::RoomUserSeq => "roomUserSeq",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = LiveHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| LiveHubError::Configuration(format!("Unknown event name '{}'", s)))
    }
}

/// A published event together with its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum LiveEvent {
    /// Lifecycle: the client joined the live session.
    Connected,
    /// Lifecycle: the connection ended, with a human readable reason.
    Disconnected {
        /// Derived from the close code and reason, or the transport error.
        reason: String,
    },
    /// Decoded chat record.
    Chat(ChatMessage),
    /// Decoded like record.
    Like(LikeMessage),
    /// Decoded social record.
    Social(SocialMessage),
    /// Decoded gift record.
    Gift(GiftMessage),
    /// Decoded member record.
    Join(MemberMessage),
    /// Social record that decoded against the follow schema.
    Follow(SocialMessage),
    /// Social-kind record that only decoded against the share schema.
    Share(ShareMessage),
    /// Decoded control record.
    Control(ControlMessage),
    /// Decoded room record.
    Room(RoomMessage),
    /// Decoded room-user-sequence record.
    RoomUserSeq(RoomUserSeqMessage),
}

impl LiveEvent {
    /// The name this event is published under.
    pub fn name(&self) -> EventName {
        match self {
            LiveEvent::Connected => EventName::Connected,
            LiveEvent::Disconnected { .. } => EventName::Disconnected,
            LiveEvent::Chat(_) => EventName::Chat,
            LiveEvent::Like(_) => EventName::Like,
            LiveEvent::Social(_) => EventName::Social,
            LiveEvent::Gift(_) => EventName::Gift,
            LiveEvent::Join(_) => EventName::Join,
            LiveEvent::Follow(_) => EventName::Follow,
            LiveEvent::Share(_) => EventName::Share,
            LiveEvent::Control(_) => EventName::Control,
            LiveEvent::Room(_) => EventName::Room,
            LiveEvent::RoomUserSeq(_) => EventName::RoomUserSeq,
        }
    }
}
