//! # Core Engine Module
//!
//! The transport-independent heart of the client.
//!
//! ## Core Components:
//!
//! - **`events`**: the closed set of published [`EventName`]s and the typed
//!   [`LiveEvent`] values delivered with them.
//!
//! - **`registry`**: the per-client subscriber registry. Callbacks run in
//!   registration order and each invocation is isolated, so one failing
//!   subscriber never affects the others.
//!
//! - **`dispatcher`**: the dispatch table and payload decoder. It turns a raw
//!   transport frame into published events.

/// Published event names and payloads.
pub mod events;
/// Per-client subscriber registry with per-callback error boundaries.
pub mod registry;
/// Frame pipeline: envelopes, kind lookup, protobuf decoding, publication.
pub mod dispatcher;

// --- Public API Re-exports ---
pub use events::{EventName, LiveEvent};
pub use registry::{Callback, Registry, SubscriptionId};
pub use dispatcher::{decode_payload, resolve_kind, Dispatcher, MessageKind, SocialSchema, SOCIAL_ATTEMPTS};
