//! # Hub Wire Protocol Module
//!
//! Everything that touches bytes on the wire lives here:
//!
//! - **`envelope`**: record-separator framing, JSON envelope parsing and
//!   recognition, and the outbound handshake/join frames.
//! - **`proto_handler`**: the `prost` schemas of the binary event records that
//!   arrive base64-encoded inside relay envelopes.

/// Record-separator framing and JSON envelope handling.
pub mod envelope;
/// Protobuf schemas for the relayed live events.
pub mod proto_handler;

pub use envelope::{split_frame, parse_envelope, Envelope, RawEventMessage, Recognized, RECORD_SEPARATOR};
