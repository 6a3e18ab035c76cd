//! Public, channel-agnostic client configuration.
//!
//! Channel implementations read the fields that concern them (name, inbox
//! capacity); the client reads the rest.

use std::time::Duration;

/// Channel name the device service listens on.
pub const DEFAULT_CHANNEL_NAME: &str = "fingerprints";

/// Default capacity of the channel event inbox.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // ---
    /// Service-side channel name.
    pub channel_name: String,

    /// Optional bound on how long a request waits for its response.
    ///
    /// `None` (the default) waits until a matching response arrives or the
    /// channel fails. When set, an expired request is removed from the
    /// pending queue and fails with [`Error::Timeout`](crate::Error::Timeout).
    pub request_timeout: Option<Duration>,

    /// Capacity of the inbox carrying channel events to the client.
    pub event_capacity: usize,
}

impl ClientConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            request_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Use a different service-side channel name.
    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    /// Bound every request by `timeout`.
    ///
    /// # Example
    ///
    /// ```
    /// use fingerprint_rpc::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::new().with_request_timeout(Duration::from_secs(10));
    /// assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));
    /// ```
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the channel event inbox capacity (minimum 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
