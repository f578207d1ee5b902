//! # Hub Ingestors Module
//!
//! The transport front door of the client.
//!
//! ## Contained Modules:
//! - **`hub_wss`**: the websocket connection state machine for one live
//!   target. It performs the handshake/join sequence and feeds every inbound
//!   frame to the [`Dispatcher`](crate::core::Dispatcher).

/// Websocket connection state machine for the live hub.
pub mod hub_wss;

// --- Public API Re-exports ---
pub use hub_wss::{ConnectionState, LiveHubClient, ABNORMAL_CLOSE, CLOSE_DRAIN_TIMEOUT, NORMAL_CLOSE, NO_STATUS_CLOSE};
