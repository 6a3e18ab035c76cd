//! In-memory channel implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! `Channel` trait together with a scriptable stand-in for the device
//! service ([`MemoryService`]). It is intended for tests, demos, and as the
//! reference for channel semantics.
//!
//! ## Reference Semantics
//!
//! - `connect()` only records the attempt. The service end decides the
//!   outcome with [`MemoryService::accept`] or [`MemoryService::fail`], or
//!   accepts immediately when auto-accept is on.
//! - Frames passed to `send_text()` are queued for the service in call order
//!   and never dropped while the service end is alive.
//! - Events pushed by the service reach the subscribed client in push order.
//!
//! ## Non-Goals
//!
//! This channel does not emulate sockets, handshakes, or the timing of a real
//! device service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

#[allow(unused_imports)]
use crate::{
    // ---
    lock_ignore_poison,
    log_debug,
    log_info,
    log_warn,
    Channel,
    ChannelBase,
    ChannelEvent,
    ChannelHandle,
    ChannelPtr,
    ClientConfig,
    Error,
    Result,
};
use crate::protocol::{Command, Envelope, Method, Notification, NotificationKind, Response};

/// State shared by the client-facing channel and the service end.
struct Shared {
    // ---
    base: ChannelBase,
    capacity: usize,
    connected: AtomicBool,
    auto_accept: AtomicBool,
    connect_attempts: AtomicUsize,
    events: Mutex<Option<mpsc::Sender<ChannelEvent>>>,
}

impl Shared {
    // ---
    fn subscriber(&self) -> Result<mpsc::Sender<ChannelEvent>> {
        lock_ignore_poison(&self.events)
            .clone()
            .ok_or_else(|| Error::Channel(format!("{}: no subscriber", self.base.name)))
    }

    async fn deliver(&self, event: ChannelEvent) -> Result<()> {
        // ---
        self.subscriber()?
            .send(event)
            .await
            .map_err(|_| Error::Channel(format!("{}: subscriber gone", self.base.name)))
    }

    fn try_deliver(&self, event: ChannelEvent) -> Result<()> {
        // ---
        self.subscriber()?
            .try_send(event)
            .map_err(|err| Error::Channel(format!("{}: {err}", self.base.name)))
    }
}

/// Client end of the in-memory channel.
struct MemoryChannel {
    // ---
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl Channel for MemoryChannel {
    // ---
    fn base(&self) -> &ChannelBase {
        &self.shared.base
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Record the attempt; accept it on the spot when auto-accept is on.
    fn connect(&self) -> Result<()> {
        // ---
        let _attempt = self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        log_debug!("{}: connect attempt #{_attempt}", self.name());

        if self.shared.auto_accept.load(Ordering::SeqCst) {
            self.shared.connected.store(true, Ordering::SeqCst);
            self.shared.try_deliver(ChannelEvent::Connected)?;
        }

        Ok(())
    }

    fn send_text(&self, frame: String) -> Result<()> {
        // ---
        if !self.is_connected() {
            return Err(Error::Channel(format!("{}: not connected", self.name())));
        }

        self.outbound
            .send(frame)
            .map_err(|_| Error::Channel(format!("{}: service end closed", self.name())))
    }

    /// Register the client inbox, replacing any previous subscriber.
    async fn subscribe(&self) -> Result<ChannelHandle> {
        // ---
        log_debug!("{}: subscribe", self.name());

        let (tx, rx) = mpsc::channel(self.shared.capacity);
        *lock_ignore_poison(&self.shared.events) = Some(tx);

        Ok(ChannelHandle { inbox: rx })
    }

    /// Disconnect and drop the subscriber, which ends the client's inbox.
    async fn close(&self) -> Result<()> {
        // ---
        log_debug!("{}: closing channel...", self.name());

        self.shared.connected.store(false, Ordering::SeqCst);
        lock_ignore_poison(&self.shared.events).take();
        Ok(())
    }
}

/// Scriptable device-service end of an in-memory channel.
///
/// Reads the frames the client sends and pushes lifecycle signals,
/// responses, and notifications back.
pub struct MemoryService {
    // ---
    shared: Arc<Shared>,
    inbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryService {
    // ---
    /// Accept every future connection attempt immediately.
    pub fn set_auto_accept(&self, enabled: bool) {
        self.shared.auto_accept.store(enabled, Ordering::SeqCst);
    }

    /// Number of times the client called `connect()`.
    pub fn connect_attempts(&self) -> usize {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Complete a connection attempt successfully.
    pub async fn accept(&self) -> Result<()> {
        // ---
        self.shared.connected.store(true, Ordering::SeqCst);
        self.shared.deliver(ChannelEvent::Connected).await
    }

    /// Fail a pending attempt, or drop the open connection.
    pub async fn fail(&self) -> Result<()> {
        // ---
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.deliver(ChannelEvent::ConnectionFailed).await
    }

    /// Push a raw frame to the client.
    pub async fn push_frame(&self, frame: impl Into<String>) -> Result<()> {
        self.shared
            .deliver(ChannelEvent::DataReceived(frame.into()))
            .await
    }

    /// Push an encoded response. `data` is the plain inner JSON, if any.
    pub async fn respond(&self, method: Method, result: i64, data: Option<&str>) -> Result<()> {
        // ---
        let frame = Envelope::response(&Response::new(method, result, data))?.encode()?;
        self.push_frame(frame).await
    }

    /// Push an encoded notification. `data` is the plain inner JSON, if any.
    pub async fn notify(
        &self,
        kind: NotificationKind,
        device: &str,
        data: Option<&str>,
    ) -> Result<()> {
        // ---
        let frame = Envelope::notification(&Notification::new(kind, device, data))?.encode()?;
        self.push_frame(frame).await
    }

    /// Wait for the next frame sent by the client.
    ///
    /// Returns `None` once the client end has been dropped.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Take the next frame sent by the client without waiting.
    pub fn try_next_frame(&mut self) -> Option<String> {
        self.inbound.try_recv().ok()
    }

    /// Wait for the next frame and decode it as a command.
    pub async fn next_command(&mut self) -> Option<Result<Command>> {
        self.next_frame()
            .await
            .map(|frame| Command::decode(&frame))
    }
}

/// Create a linked pair: the client-facing channel and its service end.
///
/// The channel starts disconnected with auto-accept off.
///
/// # Example
///
/// ```
/// # use fingerprint_rpc::{create_memory_channel, ClientConfig};
/// let (channel, service) = create_memory_channel(&ClientConfig::default());
/// assert_eq!(channel.name(), "fingerprints");
/// assert!(!service.is_connected());
/// ```
pub fn create_memory_channel(config: &ClientConfig) -> (ChannelPtr, MemoryService) {
    // ---
    log_info!("{}: create memory channel", config.channel_name);

    let (outbound, inbound) = mpsc::unbounded_channel();

    let shared = Arc::new(Shared {
        base: ChannelBase::from(config),
        capacity: config.event_capacity.max(1),
        connected: AtomicBool::new(false),
        auto_accept: AtomicBool::new(false),
        connect_attempts: AtomicUsize::new(0),
        events: Mutex::new(None),
    });

    let channel = MemoryChannel {
        shared: shared.clone(),
        outbound,
    };

    (Arc::new(channel), MemoryService { shared, inbound })
}
