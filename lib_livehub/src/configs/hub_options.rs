//! # Hub Options and Credential Resolution
//!
//! The hub URL is fixed per client instance. The access credential is resolved
//! once, either from an explicit value or from the `token` query parameter of
//! the page location the client was launched from, and the transport endpoint
//! is derived from both exactly once.

use url::Url;

use crate::errors::LiveHubError;

/// The hub every client connects to unless constructed with another URL.
pub const DEFAULT_HUB_URL: &str = "wss://chattokgames-001-site1.ntempurl.com/tiktokHub";

/// Query parameter of the page location that may carry the credential.
pub const PAGE_TOKEN_PARAM: &str = "token";

/// Query parameter the hub expects the credential in.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Construction-time options for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubOptions {
    /// Base URL of the hub, without the credential.
    pub hub_url: String,
    /// The page location used as fallback credential source.
    pub page_location: Option<String>,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            page_location: None,
        }
    }
}

impl HubOptions {
    /// Options pointing at a different hub (a staging hub, or a local mock).
    pub fn with_hub_url(hub_url: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            ..Self::default()
        }
    }

    /// Sets the page location consulted when no explicit credential is given.
    pub fn page_location(mut self, location: impl Into<String>) -> Self {
        self.page_location = Some(location.into());
        self
    }
}

/// Resolves the access credential.
///
/// A non-blank explicit value wins; otherwise the `token` query parameter of
/// `page_location` is used. No credential at all is a configuration error.
pub fn resolve_credential(
    explicit: Option<&str>,
    page_location: Option<&str>,
) -> Result<String, LiveHubError> {
    if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
        return Ok(token.to_string());
    }

    page_location
        .and_then(token_from_location)
        .ok_or_else(|| {
            LiveHubError::Configuration(format!(
                "Access token is required. Provide it explicitly or as the '{}' query parameter of the page location.",
                PAGE_TOKEN_PARAM
            ))
        })
}

fn token_from_location(location: &str) -> Option<String> {
    // Locations may be absolute URLs or bare query strings such as "?token=abc".
    let parsed = Url::parse(location)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(location)));

    match parsed {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == PAGE_TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty()),
        Err(e) => {
            log::warn!("Ignoring unparsable page location '{}': {}", location, e);
            None
        }
    }
}

/// Builds the transport endpoint: the hub URL plus `access_token=<credential>`.
pub fn derive_endpoint(hub_url: &str, credential: &str) -> Result<Url, LiveHubError> {
    let mut endpoint = Url::parse(hub_url)
        .map_err(|e| LiveHubError::Configuration(format!("Invalid hub URL '{}': {}", hub_url, e)))?;
    endpoint.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, credential);
    Ok(endpoint)
}
