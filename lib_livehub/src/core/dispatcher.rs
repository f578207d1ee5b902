//! # Dispatch Table and Payload Decoder
//!
//! The `Dispatcher` is the single path every inbound frame takes once the
//! transport hands it over:
//!
//! 1.  **Framing**: the frame is split on the record separator; empty fragments
//!     are dropped.
//! 2.  **Envelope recognition**: each fragment is parsed as JSON. Malformed
//!     fragments, keepalives and unrelated hub envelopes are dropped without
//!     affecting their siblings.
//! 3.  **Kind resolution**: the relay message's `method` loses its `Webcast`
//!     prefix and is looked up in the fixed table of [`MessageKind`]s.
//! 4.  **Payload decoding**: the base64 payload becomes bytes, and the bytes
//!     are decoded against the kind's protobuf schema.
//! 5.  **Publication**: the decoded records are published to the registry.
//!
//! All of this happens synchronously for one frame before the next frame is
//! looked at, which is what keeps events in hub order.
//!
//! ## The social kind
//!
//! The hub uses one method name for two logically different events. The
//! decoder tries [`SOCIAL_ATTEMPTS`] in order and the first schema that
//! decodes wins: the follow schema publishes `social` then `follow`, the share
//! fallback publishes `share` alone. Nothing on the wire guarantees this is
//! right: a share payload that happens to satisfy the follow schema will be
//! reported as a follow.

use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use prost::Message;

use crate::core::events::LiveEvent;
use crate::core::registry::Registry;
use crate::errors::LiveHubError;
use crate::protocol::envelope::{parse_envelope, split_frame, Envelope, RawEventMessage, Recognized};
use crate::protocol::proto_handler::{
    ChatMessage, ControlMessage, GiftMessage, LikeMessage, MemberMessage, RoomMessage,
    RoomUserSeqMessage, ShareMessage, SocialMessage,
};

/// Namespace prefix the hub may put in front of a method name.
pub const KIND_PREFIX: &str = "Webcast";

/// The closed set of message kinds the client knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `ChatMessage` -> `chat`
    Chat,
    /// `LikeMessage` -> `like`
    Like,
    /// `SocialMessage` -> `social` + `follow`, or `share`
    Social,
    /// `GiftMessage` -> `gift`
    Gift,
    /// `MemberMessage` -> `join`
    Member,
    /// `ControlMessage` -> `control`
    Control,
    /// `RoomMessage` -> `room`
    Room,
    /// `RoomUserSeqMessage` -> `roomUserSeq`
    RoomUserSeq,
}

impl MessageKind {
    /// Looks up a prefix-stripped kind. Unknown kinds return `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ChatMessage" => Some(MessageKind::Chat),
            "LikeMessage" => Some(MessageKind::Like),
            "SocialMessage" => Some(MessageKind::Social),
            "GiftMessage" => Some(MessageKind::Gift),
            "MemberMessage" => Some(MessageKind::Member),
            "ControlMessage" => Some(MessageKind::Control),
            "RoomMessage" => Some(MessageKind::Room),
            "RoomUserSeqMessage" => Some(MessageKind::RoomUserSeq),
            _ => None,
        }
    }

    /// Decodes `bytes` against this kind's schema.
    fn decode(self, key: &str, bytes: &[u8]) -> Result<Vec<LiveEvent>, LiveHubError> {
        let event = match self {
            MessageKind::Chat => LiveEvent::Chat(decode_as(key, bytes)?),
            MessageKind::Like => LiveEvent::Like(decode_as(key, bytes)?),
            MessageKind::Social => return decode_social(key, bytes),
            MessageKind::Gift => LiveEvent::Gift(decode_as::<GiftMessage>(key, bytes)?),
            MessageKind::Member => LiveEvent::Join(decode_as::<MemberMessage>(key, bytes)?),
            MessageKind::Control => LiveEvent::Control(decode_as::<ControlMessage>(key, bytes)?),
            MessageKind::Room => LiveEvent::Room(decode_as::<RoomMessage>(key, bytes)?),
            MessageKind::RoomUserSeq => {
                LiveEvent::RoomUserSeq(decode_as::<RoomUserSeqMessage>(key, bytes)?)
            }
        };
        Ok(vec![event])
    }
}

/// One candidate schema for the ambiguous social kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialSchema {
    /// Decode as [`SocialMessage`]; publishes `social` and `follow`.
    Follow,
    /// Decode as [`ShareMessage`]; publishes `share`.
    Share,
}

/// Social-kind schemas in the order they are tried. First success wins.
pub const SOCIAL_ATTEMPTS: [SocialSchema; 2] = [SocialSchema::Follow, SocialSchema::Share];

impl SocialSchema {
    fn decode(self, key: &str, bytes: &[u8]) -> Result<Vec<LiveEvent>, LiveHubError> {
        match self {
            SocialSchema::Follow => {
                let social: SocialMessage = decode_as(key, bytes)?;
                Ok(vec![LiveEvent::Social(social.clone()), LiveEvent::Follow(social)])
            }
            SocialSchema::Share => Ok(vec![LiveEvent::Share(decode_as::<ShareMessage>(key, bytes)?)]),
        }
    }
}

fn decode_social(key: &str, bytes: &[u8]) -> Result<Vec<LiveEvent>, LiveHubError> {
    let mut failures = Vec::with_capacity(SOCIAL_ATTEMPTS.len());
    for schema in SOCIAL_ATTEMPTS {
        match schema.decode(key, bytes) {
            Ok(events) => return Ok(events),
            Err(e) => {
                log::debug!("{:?} schema rejected '{}' payload: {}", schema, key, e);
                failures.push(format!("{:?}: {}", schema, e));
            }
        }
    }
    Err(LiveHubError::payload(key, failures.join("; ")))
}

fn decode_as<M: Message + Default>(key: &str, bytes: &[u8]) -> Result<M, LiveHubError> {
    M::decode(bytes).map_err(|e| LiveHubError::payload(key, e))
}

/// Strips the namespace prefix from a method name, yielding the lookup key.
pub fn resolve_kind(method: &str) -> &str {
    method.strip_prefix(KIND_PREFIX).unwrap_or(method)
}

/// Turns one raw event message into the events to publish.
///
/// Unknown kinds decode to an empty list; base64 and schema failures are
/// `Payload` errors.
pub fn decode_payload(key: &str, payload_base64: &str) -> Result<Vec<LiveEvent>, LiveHubError> {
    let bytes = general_purpose::STANDARD
        .decode(payload_base64)
        .map_err(|e| LiveHubError::payload(key, format!("invalid base64: {}", e)))?;

    match MessageKind::from_key(key) {
        Some(kind) => {
            log::debug!("Decoding message of kind {}", key);
            kind.decode(key, &bytes)
        }
        None => {
            log::debug!("No schema for kind '{}'; dropping", key);
            Ok(Vec::new())
        }
    }
}

/// Feeds inbound frames through the codec and decoder into a registry.
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    /// Creates a dispatcher publishing into `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher publishes into.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Processes every envelope in one transport frame, in order.
    ///
    /// Returns the number of events published.
    pub fn handle_frame(&self, raw: &str) -> usize {
        split_frame(raw).map(|fragment| self.handle_envelope(fragment)).sum()
    }

    fn handle_envelope(&self, text: &str) -> usize {
        match parse_envelope(text).and_then(Envelope::recognize) {
            Ok(Recognized::RawEvent(raw)) => self.dispatch(&raw),
            Ok(Recognized::Keepalive) => {
                log::trace!("Keepalive received");
                0
            }
            Ok(Recognized::Ignored) => 0,
            Err(e) => {
                log::warn!("Dropping envelope: {}", e);
                0
            }
        }
    }

    /// Decodes one relay message and publishes the result.
    pub fn dispatch(&self, raw: &RawEventMessage) -> usize {
        let key = resolve_kind(&raw.method);
        match decode_payload(key, &raw.payload) {
            Ok(events) => {
                for event in &events {
                    self.registry.publish(event);
                }
                events.len()
            }
            Err(e) => {
                log::warn!("{}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventName;
    use crate::protocol::envelope::{RECORD_SEPARATOR, RELAY_TARGET};
    use crate::protocol::proto_handler::User;
    use serde_json::json;
    use std::sync::Mutex;

    fn relay(method: &str, payload: &str) -> String {
        let mut text = json!({
            "type": 1,
            "target": RELAY_TARGET,
            "arguments": [{ "method": method, "payload": payload }]
        })
        .to_string();
        text.push(RECORD_SEPARATOR);
        text
    }

    fn encoded<M: Message>(message: &M) -> String {
        general_purpose::STANDARD.encode(message.encode_to_vec())
    }

    fn collecting_dispatcher() -> (Dispatcher, Arc<Mutex<Vec<LiveEvent>>>) {
        let registry = Arc::new(Registry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        for name in EventName::ALL {
            let seen = Arc::clone(&seen);
            registry.on(name, move |event| {
                seen.lock().unwrap().push(event.clone());
                Ok(())
            });
        }
        (Dispatcher::new(registry), seen)
    }

    fn sample_chat() -> ChatMessage {
        ChatMessage {
            user: Some(User {
                user_id: 42,
                nickname: "Ana".to_string(),
                unique_id: "ana_live".to_string(),
                ..Default::default()
            }),
            comment: "hola!".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_kind_strips_prefix_once() {
        assert_eq!(resolve_kind("WebcastChatMessage"), "ChatMessage");
        assert_eq!(resolve_kind("ChatMessage"), "ChatMessage");
        assert_eq!(resolve_kind("WebcastWebcastX"), "WebcastX");
    }

    #[test]
    fn test_chat_message_is_published_once() {
        let (dispatcher, seen) = collecting_dispatcher();
        let chat = sample_chat();

        let published = dispatcher.handle_frame(&relay("WebcastChatMessage", &encoded(&chat)));

        assert_eq!(published, 1);
        assert_eq!(*seen.lock().unwrap(), vec![LiveEvent::Chat(chat)]);
    }

    #[test]
    fn test_unprefixed_method_is_accepted() {
        let (dispatcher, seen) = collecting_dispatcher();
        let like = LikeMessage { like_count: 15, total_like_count: 900, ..Default::default() };
        dispatcher.handle_frame(&relay("LikeMessage", &encoded(&like)));
        assert_eq!(*seen.lock().unwrap(), vec![LiveEvent::Like(like)]);
    }

    #[test]
    fn test_every_kind_maps_to_its_event_name() {
        let cases: Vec<(&str, String, EventName)> = vec![
            ("WebcastGiftMessage", encoded(&GiftMessage { gift_id: 5655, repeat_count: 3, ..Default::default() }), EventName::Gift),
            ("WebcastMemberMessage", encoded(&MemberMessage { member_count: 10, ..Default::default() }), EventName::Join),
            ("WebcastControlMessage", encoded(&ControlMessage { action: 3, ..Default::default() }), EventName::Control),
            ("WebcastRoomMessage", encoded(&RoomMessage { content: "welcome".to_string(), ..Default::default() }), EventName::Room),
            ("WebcastRoomUserSeqMessage", encoded(&RoomUserSeqMessage { viewer_count: 77, ..Default::default() }), EventName::RoomUserSeq),
        ];

        for (method, payload, expected) in cases {
            let (dispatcher, seen) = collecting_dispatcher();
            assert_eq!(dispatcher.handle_frame(&relay(method, &payload)), 1, "{}", method);
            let names: Vec<EventName> = seen.lock().unwrap().iter().map(LiveEvent::name).collect();
            assert_eq!(names, vec![expected], "{}", method);
        }
    }

    #[test]
    fn test_unknown_kind_publishes_nothing() {
        let (dispatcher, seen) = collecting_dispatcher();
        assert_eq!(dispatcher.handle_frame(&relay("WebcastLinkMicBattle", "AAAA")), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bad_base64_is_dropped_and_later_messages_still_flow() {
        let (dispatcher, seen) = collecting_dispatcher();
        assert_eq!(dispatcher.handle_frame(&relay("WebcastChatMessage", "***not base64***")), 0);

        let chat = sample_chat();
        assert_eq!(dispatcher.handle_frame(&relay("WebcastChatMessage", &encoded(&chat))), 1);
        assert_eq!(*seen.lock().unwrap(), vec![LiveEvent::Chat(chat)]);
    }

    #[test]
    fn test_bad_schema_is_a_payload_error() {
        // Field 3 (comment) sent as a varint instead of a string.
        let bytes = general_purpose::STANDARD.encode([0x18, 0x01]);
        let err = decode_payload("ChatMessage", &bytes).unwrap_err();
        assert!(matches!(err, LiveHubError::Payload { ref kind, .. } if kind == "ChatMessage"));
    }

    #[test]
    fn test_social_follow_schema_publishes_social_then_follow() {
        let (dispatcher, seen) = collecting_dispatcher();
        let social = SocialMessage { action: 1, follow_count: 1200, ..Default::default() };

        assert_eq!(dispatcher.handle_frame(&relay("WebcastSocialMessage", &encoded(&social))), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![LiveEvent::Social(social.clone()), LiveEvent::Follow(social)]
        );
    }

    #[test]
    fn test_social_falls_back_to_share_schema() {
        let (dispatcher, seen) = collecting_dispatcher();
        let share = ShareMessage {
            share_target: "whatsapp".to_string(),
            share_count: 3,
            ..Default::default()
        };
        assert!(SocialMessage::decode(share.encode_to_vec().as_slice()).is_err());

        assert_eq!(dispatcher.handle_frame(&relay("WebcastSocialMessage", &encoded(&share))), 1);
        assert_eq!(*seen.lock().unwrap(), vec![LiveEvent::Share(share)]);
    }

    #[test]
    fn test_social_failing_both_schemas_is_dropped() {
        // Truncated length-delimited field: neither schema can decode it.
        let payload = general_purpose::STANDARD.encode([0x0a, 0x05, 0x01]);
        let err = decode_payload("SocialMessage", &payload).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Follow") && text.contains("Share"), "{}", text);
    }

    #[test]
    fn test_frame_with_mixed_envelopes_keeps_order_and_skips_noise() {
        let (dispatcher, seen) = collecting_dispatcher();
        let first = sample_chat();
        let second = ChatMessage { comment: "second".to_string(), ..Default::default() };

        let mut frame = String::new();
        frame.push_str("{\"type\":6}\u{1e}");
        frame.push_str(&relay("WebcastChatMessage", &encoded(&first)));
        frame.push_str("{not json\u{1e}");
        frame.push_str("{}\u{1e}\u{1e}");
        frame.push_str(&relay("WebcastChatMessage", &encoded(&second)));

        assert_eq!(dispatcher.handle_frame(&frame), 2);
        assert_eq!(*seen.lock().unwrap(), vec![LiveEvent::Chat(first), LiveEvent::Chat(second)]);
    }

    #[test]
    fn test_keepalive_only_frame_publishes_nothing() {
        let (dispatcher, seen) = collecting_dispatcher();
        assert_eq!(dispatcher.handle_frame("{\"type\":6}\u{1e}{\"type\":6}\u{1e}"), 0);
        assert!(seen.lock().unwrap().is_empty());
    }
}
