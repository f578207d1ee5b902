//! # Configuration Modules
//!
//! Hub location, credential resolution and endpoint derivation.

/// Hub options, credential resolution and endpoint derivation.
pub mod hub_options;

pub use hub_options::{derive_endpoint, resolve_credential, HubOptions, DEFAULT_HUB_URL};
