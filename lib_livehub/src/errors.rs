//! # Live Hub Error Taxonomy
//!
//! Every failure the client can encounter maps onto one variant of
//! [`LiveHubError`]. Only [`LiveHubError::Configuration`] is ever returned to a
//! caller; the remaining variants are raised inside the frame pipeline, logged,
//! and absorbed so that one bad envelope, payload or subscriber never stops the
//! connection's event loop.

use thiserror::Error;

/// Errors raised by the live hub client.
#[derive(Debug, Error)]
pub enum LiveHubError {
    /// Credential missing, or an operation attempted in the wrong lifecycle state.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Underlying connection failure or abnormal close.
    #[error("Transport error: {0}")]
    Transport(String),

    /// One envelope fragment was not valid JSON, or did not have the expected shape.
    #[error("Envelope codec error: {0}")]
    EnvelopeParse(#[from] serde_json::Error),

    /// Base64 or binary-schema decode failure for one raw event message.
    #[error("Failed to decode '{kind}' payload: {reason}")]
    Payload {
        /// The prefix-stripped kind being decoded.
        kind: String,
        /// Why the payload could not be decoded.
        reason: String,
    },

    /// A subscriber callback returned an error or panicked.
    #[error("Subscriber #{subscriber} for '{event}' failed: {reason}")]
    Subscriber {
        /// The event being published.
        event: String,
        /// The registration id of the failing callback.
        subscriber: u64,
        /// The failure reported by the callback.
        reason: String,
    },
}

impl LiveHubError {
    pub(crate) fn payload(kind: &str, reason: impl ToString) -> Self {
        Self::Payload {
            kind: kind.to_string(),
            reason: reason.to_string(),
        }
    }
}
