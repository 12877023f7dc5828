//! Channel configuration types.

use std::time::Duration;

use tokio::sync::watch;
use url::Url;

use crate::channel::Visibility;
use crate::{Error, Result};

/// Default delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Path of the push endpoint on the server origin.
pub const ENDPOINT_PATH: &str = "/ws";

/// Notification channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Explicit endpoint URL. Takes precedence over `origin`.
    pub url: Option<Url>,
    /// Server origin (`http://host:port`) the endpoint is derived from.
    pub origin: Option<Url>,
    /// Delay before reconnecting after a close. Zero disables reconnects.
    pub reconnect_interval: Duration,
    /// Whether to connect as soon as the channel is opened.
    pub auto_connect: bool,
    /// Visibility observer; becoming visible re-checks the connection.
    pub visibility: Option<watch::Receiver<Visibility>>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: None,
            origin: None,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            auto_connect: true,
            visibility: None,
        }
    }
}

impl ChannelConfig {
    /// Creates a configuration deriving the endpoint from a server origin.
    #[must_use]
    pub fn new(origin: Url) -> Self {
        Self {
            origin: Some(origin),
            ..Self::default()
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::default()
    }

    /// Resolves the endpoint URL.
    ///
    /// An explicit `url` is used as is. Otherwise the origin's scheme is
    /// translated (`http` to `ws`, `https` to `wss`), its host and port are
    /// kept, and the path becomes [`ENDPOINT_PATH`].
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is configured, or the origin has an
    /// unsupported scheme or no host.
    pub fn endpoint(&self) -> Result<Url> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let origin = self.origin.as_ref().ok_or(Error::MissingEndpoint)?;
        let scheme = match origin.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };
        let host = origin
            .host_str()
            .ok_or_else(|| Error::MissingHost(origin.to_string()))?;
        let authority = origin
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));

        Ok(Url::parse(&format!("{scheme}://{authority}{ENDPOINT_PATH}"))?)
    }
}

/// Builder for channel configuration.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfigBuilder {
    config: ChannelConfig,
}

impl ChannelConfigBuilder {
    /// Sets an explicit endpoint URL.
    #[must_use]
    pub fn url(mut self, url: Url) -> Self {
        self.config.url = Some(url);
        self
    }

    /// Sets the server origin the endpoint is derived from.
    #[must_use]
    pub fn origin(mut self, origin: Url) -> Self {
        self.config.origin = Some(origin);
        self
    }

    /// Sets the reconnect interval.
    #[must_use]
    pub const fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.config.reconnect_interval = interval;
        self
    }

    /// Sets whether to connect immediately.
    #[must_use]
    pub const fn auto_connect(mut self, enabled: bool) -> Self {
        self.config.auto_connect = enabled;
        self
    }

    /// Registers a visibility observer.
    #[must_use]
    pub fn visibility(mut self, visibility: watch::Receiver<Visibility>) -> Self {
        self.config.visibility = Some(visibility);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ChannelConfig {
        self.config
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.reconnect_interval, Duration::from_millis(3000));
        assert!(config.auto_connect);
        assert!(config.url.is_none());
        assert!(matches!(config.endpoint(), Err(Error::MissingEndpoint)));
    }

    #[test]
    fn test_endpoint_from_http_origin() {
        let config = ChannelConfig::new(url("http://localhost:3000/emails/inbox"));
        assert_eq!(config.endpoint().unwrap().as_str(), "ws://localhost:3000/ws");
    }

    #[test]
    fn test_endpoint_from_https_origin() {
        let config = ChannelConfig::new(url("https://mail.example.com"));
        assert_eq!(config.endpoint().unwrap().as_str(), "wss://mail.example.com/ws");
    }

    #[test]
    fn test_endpoint_ipv6_origin() {
        let config = ChannelConfig::new(url("http://[::1]:8080"));
        assert_eq!(config.endpoint().unwrap().as_str(), "ws://[::1]:8080/ws");
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = ChannelConfig::builder()
            .origin(url("http://localhost:3000"))
            .url(url("ws://other:9000/push"))
            .build();
        assert_eq!(config.endpoint().unwrap().as_str(), "ws://other:9000/push");
    }

    #[test]
    fn test_unsupported_scheme() {
        let config = ChannelConfig::new(url("ftp://example.com"));
        assert!(matches!(
            config.endpoint(),
            Err(Error::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_builder() {
        let config = ChannelConfig::builder()
            .origin(url("http://localhost:3000"))
            .reconnect_interval(Duration::ZERO)
            .auto_connect(false)
            .build();
        assert_eq!(config.reconnect_interval, Duration::ZERO);
        assert!(!config.auto_connect);
    }
}
