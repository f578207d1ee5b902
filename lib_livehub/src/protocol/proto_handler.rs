//! # Live Event Protobuf Handler
//!
//! Rust representations of the binary event records relayed by the hub. Each
//! record is a `prost` message so it can be deserialized straight from the
//! base64-decoded payload, and carries `serde` derives so subscribers receive a
//! plain structured value they can log or forward as JSON.
//!
//! Unknown tags are skipped by `prost`, so the hub may grow these schemas
//! without breaking older clients. A known tag arriving with the wrong wire type
//! is a decode error; the social/share fallback relies on that.

use prost::Message;
use serde::{Deserialize, Serialize};

/// Metadata block shared by every live event record.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct Common {
    /// Transport-level method name (e.g. "WebcastChatMessage").
    #[prost(string, tag = "1")]
    pub method: String,

    /// Hub-assigned message id.
    #[prost(uint64, tag = "2")]
    pub msg_id: u64,

    /// The live room this event belongs to.
    #[prost(uint64, tag = "3")]
    pub room_id: u64,

    /// Creation time in milliseconds since Unix Epoch.
    #[prost(uint64, tag = "4")]
    pub create_time: u64,

    /// Human readable description supplied by the platform, if any.
    #[prost(string, tag = "7")]
    pub describe: String,
}

/// A viewer or host taking part in the live session.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct User {
    /// Numeric platform user id.
    #[prost(uint64, tag = "1")]
    pub user_id: u64,

    /// Display name.
    #[prost(string, tag = "3")]
    pub nickname: String,

    /// Avatar image URL.
    #[prost(string, tag = "9")]
    pub profile_picture_url: String,

    /// Follower count at the time of the event.
    #[prost(uint64, tag = "22")]
    pub follower_count: u64,

    /// The unique handle (the `@name`).
    #[prost(string, tag = "38")]
    pub unique_id: String,
}

/// A chat comment posted in the live room.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// The author of the comment.
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,

    /// The comment text.
    #[prost(string, tag = "3")]
    pub comment: String,

    /// Detected language of the comment.
    #[prost(string, tag = "14")]
    pub content_language: String,
}

/// A burst of likes sent by one viewer.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct LikeMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// Likes contained in this burst.
    #[prost(uint64, tag = "2")]
    pub like_count: u64,

    /// Running total of likes for the room.
    #[prost(uint64, tag = "3")]
    pub total_like_count: u64,

    /// The viewer who liked.
    #[prost(message, optional, tag = "5")]
    pub user: Option<User>,
}

/// A social interaction (follow) in the live room.
///
/// This is also the schema tried first for the ambiguous social kind; see
/// [`ShareMessage`] for the fallback.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct SocialMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// The viewer who acted.
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,

    /// Platform share type code.
    #[prost(uint64, tag = "3")]
    pub share_type: u64,

    /// Action code (1 = follow).
    #[prost(uint64, tag = "4")]
    pub action: u64,

    /// Free-form label attached to the action.
    #[prost(string, tag = "5")]
    pub label: String,

    /// Host follower count after the action.
    #[prost(uint64, tag = "6")]
    pub follow_count: u64,
}

/// A share of the live room to another platform.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct ShareMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// The viewer who shared.
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,

    /// Platform share type code.
    #[prost(uint64, tag = "3")]
    pub share_type: u64,

    /// Where the room was shared to (e.g. "whatsapp").
    #[prost(string, tag = "4")]
    pub share_target: String,

    /// Total shares of the room so far.
    #[prost(uint64, tag = "5")]
    pub share_count: u64,
}

/// Static description of a gift.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct GiftDetails {
    /// Gift catalogue id.
    #[prost(uint64, tag = "1")]
    pub id: u64,

    /// Display name of the gift.
    #[prost(string, tag = "2")]
    pub name: String,

    /// Value of one gift in diamonds.
    #[prost(uint32, tag = "3")]
    pub diamond_count: u32,

    /// Gift type code (1 = streakable).
    #[prost(uint32, tag = "4")]
    pub gift_type: u32,

    /// Gift image URL.
    #[prost(string, tag = "5")]
    pub image_url: String,
}

/// A gift sent by a viewer.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct GiftMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// Gift catalogue id.
    #[prost(uint64, tag = "2")]
    pub gift_id: u64,

    /// Fan tickets earned by the host.
    #[prost(uint64, tag = "3")]
    pub fan_ticket_count: u64,

    /// Number of gifts in the group.
    #[prost(uint64, tag = "4")]
    pub group_count: u64,

    /// Repeat counter inside a streak.
    #[prost(uint64, tag = "5")]
    pub repeat_count: u64,

    /// Combo counter.
    #[prost(uint64, tag = "6")]
    pub combo_count: u64,

    /// The sender.
    #[prost(message, optional, tag = "7")]
    pub user: Option<User>,

    /// The receiver, when the gift targets a guest rather than the host.
    #[prost(message, optional, tag = "8")]
    pub to_user: Option<User>,

    /// Set on the final message of a streak.
    #[prost(uint32, tag = "9")]
    pub repeat_end: u32,

    /// Catalogue details of the gift.
    #[prost(message, optional, tag = "15")]
    pub gift: Option<GiftDetails>,
}

/// A viewer joining the live room.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct MemberMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// The viewer who joined.
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,

    /// Viewers in the room after the join.
    #[prost(uint64, tag = "3")]
    pub member_count: u64,

    /// Join action code.
    #[prost(uint64, tag = "10")]
    pub action: u64,
}

/// A room control signal (e.g. stream paused or ended).
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// Control action code (3 = stream ended).
    #[prost(int64, tag = "2")]
    pub action: i64,

    /// Optional text shown to viewers.
    #[prost(string, tag = "3")]
    pub tips: String,
}

/// A system message displayed in the room.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct RoomMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// The message text.
    #[prost(string, tag = "2")]
    pub content: String,
}

/// One entry of the room's top-viewer ranking.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct TopViewer {
    /// The ranked viewer.
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,

    /// Contribution score.
    #[prost(uint64, tag = "2")]
    pub score: u64,

    /// Position in the ranking, starting at 1.
    #[prost(uint64, tag = "3")]
    pub rank: u64,
}

/// Periodic viewer-count and ranking update.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct RoomUserSeqMessage {
    /// Shared event metadata.
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,

    /// Current top viewers.
    #[prost(message, repeated, tag = "2")]
    pub ranks: Vec<TopViewer>,

    /// Viewers currently watching.
    #[prost(uint64, tag = "3")]
    pub viewer_count: u64,

    /// Formatted popularity string.
    #[prost(string, tag = "4")]
    pub pop_str: String,

    /// Total viewers since the stream started.
    #[prost(uint64, tag = "7")]
    pub total_user: u64,
}
