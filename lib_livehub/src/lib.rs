//! # lib_livehub
//!
//! Real-time live-stream event ingestion client.
//!
//! One [`LiveHubClient`](ingestors::LiveHubClient) holds one websocket to the
//! hub. Inbound frames are split on the record separator, relay envelopes are
//! unwrapped, their base64 protobuf payloads are decoded by kind, and the
//! resulting [`LiveEvent`]s are published to subscriber callbacks registered on
//! the client's own [`Registry`].
//!
//! ```no_run
//! use lib_livehub::{EventName, HubOptions, LiveEvent, LiveHubClient};
//!
//! # async fn demo() -> Result<(), lib_livehub::LiveHubError> {
//! let mut client = LiveHubClient::new("some_live_id", HubOptions::default());
//! client.on(EventName::Chat, |event| {
//!     if let LiveEvent::Chat(chat) = event {
//!         println!("{}", chat.comment);
//!     }
//!     Ok(())
//! });
//! client.configure(Some("access-token"))?;
//! client.connect()?;
//! client.wait_closed().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod configs;
pub mod core;
pub mod errors;
#[cfg(feature = "client")]
pub mod ingestors;
pub mod protocol;

// Re-export the everyday API
pub use crate::configs::{HubOptions, DEFAULT_HUB_URL};
pub use crate::core::{Dispatcher, EventName, LiveEvent, Registry, SubscriptionId};
pub use crate::errors::LiveHubError;
#[cfg(feature = "client")]
pub use crate::ingestors::{ConnectionState, LiveHubClient};
pub use crate::protocol::proto_handler;
