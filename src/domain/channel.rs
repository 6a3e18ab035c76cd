// src/domain/channel.rs

//! Channel domain abstractions.
//!
//! A channel is the named, bidirectional text pipe between this client and
//! the local device service. The client only ever sees base64url frames and
//! three lifecycle signals; everything else (sockets, handshakes, the
//! service process) lives behind this trait.
//!
//! Concrete implementations of this interface live under `src/channel/`.
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Result;

/// Shared base state for all channel implementations.
///
/// Each concrete channel embeds this as a field named `base`:
///
/// ```ignore
/// struct SocketChannel {
///     base: ChannelBase,
///     // ... socket specific fields
/// }
///
/// impl Channel for SocketChannel {
///     fn base(&self) -> &ChannelBase { &self.base }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelBase {
    /// Service-side channel name (e.g. `"fingerprints"`).
    pub name: String,
}

impl ChannelBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&crate::ClientConfig> for ChannelBase {
    fn from(config: &crate::ClientConfig) -> Self {
        Self::new(config.channel_name.clone())
    }
}

/// Something the channel reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A connection attempt succeeded.
    Connected,

    /// A connection attempt failed, or an open connection dropped.
    ConnectionFailed,

    /// A text frame arrived (base64url).
    DataReceived(String),
}

/// Handle returned from a successful subscription.
///
/// The subscription remains active until the handle is dropped or the
/// channel is closed.
pub struct ChannelHandle {
    // ---
    /// Receiver for lifecycle signals and inbound frames, in arrival order.
    pub inbox: mpsc::Receiver<ChannelEvent>,
}

/// Channel abstraction.
///
/// Implementations must ensure that:
/// - `connect()` and `send_text()` never block; completion of a connection
///   attempt is reported through the inbox.
/// - Frames handed to `send_text()` reach the service in call order.
/// - Inbox events are delivered in the order they occurred.
///
/// The in-memory channel serves as the reference implementation of these
/// semantics.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    // ---
    /// Returns a reference to the shared base state.
    fn base(&self) -> &ChannelBase;

    /// Returns the service-side channel name.
    fn name(&self) -> &str {
        &self.base().name
    }

    /// Whether frames can be sent right now.
    fn is_connected(&self) -> bool;

    /// Begin a connection attempt.
    ///
    /// An `Err` means the attempt could not even be started; otherwise the
    /// outcome arrives later as [`ChannelEvent::Connected`] or
    /// [`ChannelEvent::ConnectionFailed`].
    fn connect(&self) -> Result<()>;

    /// Hand one base64url frame to the channel.
    fn send_text(&self, frame: String) -> Result<()>;

    /// Register the single consumer of channel events.
    async fn subscribe(&self) -> Result<ChannelHandle>;

    /// Close the channel and release any associated resources.
    async fn close(&self) -> Result<()>;
}

/// Shared channel pointer.
///
/// This is an `Arc<dyn Channel>`, so clones share the same connection.
pub type ChannelPtr = Arc<dyn Channel>;
