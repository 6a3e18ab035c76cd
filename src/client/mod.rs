// src/client/mod.rs
//! Fingerprint service client.
//!
//! This module contains [`FingerprintClient`], which turns method calls into
//! commands on a [`Channel`](crate::Channel) and turns what comes back into
//! settled calls and emitted [`Event`]s.
//!
//! # Architecture
//!
//! Every operation appends a command to the request ledger. If the channel is
//! connected the ledger is flushed on the spot; otherwise a connection attempt
//! is started and the ledger flushes once the channel reports `Connected`.
//!
//! A background receive loop drains the channel inbox. Responses settle the
//! oldest sent request of the same method (the wire has no correlation id).
//! Notifications become events and are fanned out through the emitter.
//!
//! # Concurrency
//!
//! The ledger, emitter and connection state each sit behind a short-lived
//! `std::sync::Mutex`. No lock is held across an `.await` or while an event
//! handler runs, so handlers may call back into the client.

mod emitter;
mod ledger;

pub use emitter::EventEmitter;

use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time;

use crate::{
    // ---
    lock_ignore_poison,
    log_debug,
    log_info,
    log_warn,
    ChannelEvent,
    ChannelPtr,
    ClientConfig,
    DeviceInfo,
    Error,
    Event,
    EventHandler,
    EventKind,
    Result,
    SampleFormat,
};

use crate::codec::decode;
use crate::device::default_device_uid;
use crate::protocol::{
    // ---
    AcquisitionParams,
    Command,
    DeviceParams,
    EnumerateDevicesPayload,
    Envelope,
    Method,
    Notification,
    Payload,
    Response,
};

use emitter::dispatch;
use ledger::{Reply, RequestLedger};

/// Where the client is in establishing its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No attempt in progress. The next operation starts one.
    #[default]
    Disconnected,

    /// An attempt is in progress; further operations just queue.
    Connecting,

    /// Commands are sent as soon as they are queued.
    Connected,
}

/// Running client instance.
///
/// Cheap to clone (internally `Arc`-backed). Dropping the last clone stops
/// the receive loop.
#[derive(Clone)]
pub struct FingerprintClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    channel: ChannelPtr,
    config: ClientConfig,
    state: Mutex<ConnectionState>,
    ledger: Mutex<RequestLedger>,
    emitter: Mutex<EventEmitter>,
    rx_task: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.rx_task.abort();
    }
}

impl FingerprintClient {
    // ---
    /// Create a client on top of `channel`.
    ///
    /// Subscribes to the channel inbox and spawns the receive loop. No
    /// connection is attempted until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel refuses the subscription.
    pub async fn with_channel(channel: ChannelPtr, config: ClientConfig) -> Result<Self> {
        // ---
        let mut handle = channel.subscribe().await?;

        log_info!("{}: client ready", channel.name());

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            // ---
            let weak = weak.clone();

            let rx_task = tokio::spawn(async move {
                // ---
                while let Some(event) = handle.inbox.recv().await {
                    match weak.upgrade() {
                        Some(inner) => FingerprintClient { inner }.handle_channel_event(event),
                        None => break,
                    }
                }
                log_debug!("channel inbox closed; receive loop exiting");
            });

            Inner {
                // ---
                channel,
                config,
                state: Mutex::new(ConnectionState::Disconnected),
                ledger: Mutex::new(RequestLedger::new()),
                emitter: Mutex::new(EventEmitter::new()),
                rx_task,
            }
        });

        Ok(Self { inner })
    }

    /// List the identifiers of the attached readers.
    ///
    /// The command is queued when this is called, not when the future is
    /// first polled.
    ///
    /// # Errors
    ///
    /// - `Error::MethodFailed` if the service reports a failure code
    /// - `Error::CommunicationFailure` if the channel fails first
    /// - `Error::Timeout` if a request timeout is configured and expires
    pub fn enumerate_devices(&self) -> impl Future<Output = Result<Vec<String>>> + Send + 'static {
        // ---
        let reply = self.request(Ok(Command::new(Method::EnumerateDevices)));

        async move {
            let payload: EnumerateDevicesPayload =
                payload_of(Method::EnumerateDevices, reply.await?)?;
            payload.device_ids()
        }
    }

    /// Describe one reader.
    pub fn get_device_info(
        &self,
        device_uid: &str,
    ) -> impl Future<Output = Result<DeviceInfo>> + Send + 'static {
        // ---
        let params = DeviceParams {
            device_id: device_uid.to_string(),
        };
        let reply = self.request(Command::with_parameters(Method::GetDeviceInfo, &params));

        async move { payload_of(Method::GetDeviceInfo, reply.await?) }
    }

    /// Start capturing samples in `sample_format`.
    ///
    /// Without a device id (or with an empty one) the service picks the
    /// reader.
    pub fn start_acquisition(
        &self,
        sample_format: SampleFormat,
        device_uid: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        // ---
        let params = AcquisitionParams {
            device_id: device_or_default(device_uid),
            sample_type: sample_format,
        };
        let reply = self.request(Command::with_parameters(Method::StartAcquisition, &params));

        async move { reply.await.map(|_| ()) }
    }

    /// Stop capturing on a reader (or whichever one the service chose).
    pub fn stop_acquisition(
        &self,
        device_uid: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        // ---
        let params = DeviceParams {
            device_id: device_or_default(device_uid),
        };
        let reply = self.request(Command::with_parameters(Method::StopAcquisition, &params));

        async move { reply.await.map(|_| ()) }
    }

    /// Subscribe `handler` to events of `kind`.
    pub fn on(&self, kind: EventKind, handler: EventHandler) -> &Self {
        // ---
        lock_ignore_poison(&self.inner.emitter).on(kind, handler);
        self
    }

    /// Unsubscribe; see [`EventEmitter::off`] for how the arguments combine.
    ///
    /// A handler without a kind is removed from every kind; it does not clear
    /// the other subscribers. Pass `(None, None)` to clear everything.
    pub fn off(&self, kind: Option<EventKind>, handler: Option<&EventHandler>) -> &Self {
        // ---
        lock_ignore_poison(&self.inner.emitter).off(kind, handler);
        self
    }

    /// Set (or with `None`, clear) the primary handler of `kind`.
    ///
    /// The primary handler runs before any subscriber. Returns the handler it
    /// replaced.
    pub fn set_handler(&self, kind: EventKind, handler: Option<EventHandler>) -> Option<EventHandler> {
        lock_ignore_poison(&self.inner.emitter).set_handler(kind, handler)
    }

    /// Current stage of the channel connection.
    pub fn connection_state(&self) -> ConnectionState {
        *lock_ignore_poison(&self.inner.state)
    }

    /// Number of calls still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        lock_ignore_poison(&self.inner.ledger).len()
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Close the underlying channel.
    ///
    /// Pending calls fail with `Error::CommunicationFailure`; no event is
    /// emitted. The client cannot be reused afterwards.
    pub async fn close(&self) -> Result<()> {
        // ---
        log_debug!("{}: closing client", self.inner.channel.name());

        *lock_ignore_poison(&self.inner.state) = ConnectionState::Disconnected;
        lock_ignore_poison(&self.inner.ledger).reject_all(|| Error::CommunicationFailure);

        self.inner.channel.close().await
    }

    /// React to one channel signal. Runs on the receive loop.
    pub(crate) fn handle_channel_event(&self, event: ChannelEvent) {
        // ---
        match event {
            ChannelEvent::Connected => self.on_connected(),
            ChannelEvent::ConnectionFailed => self.on_connection_failed(),
            ChannelEvent::DataReceived(frame) => {
                if let Err(_err) = self.on_data_received(&frame) {
                    log_warn!("dropping undecodable frame: {_err}");
                }
            }
        }
    }

    fn on_connected(&self) {
        // ---
        log_debug!("{}: connected", self.inner.channel.name());
        *lock_ignore_poison(&self.inner.state) = ConnectionState::Connected;
        self.flush();
    }

    /// Fail everything in flight and tell subscribers.
    fn on_connection_failed(&self) {
        // ---
        *lock_ignore_poison(&self.inner.state) = ConnectionState::Disconnected;

        let _rejected =
            lock_ignore_poison(&self.inner.ledger).reject_all(|| Error::CommunicationFailure);
        log_warn!(
            "{}: communication failure, rejected {_rejected} pending request(s)",
            self.inner.channel.name()
        );

        self.emit(&Event::CommunicationFailed);
    }

    fn on_data_received(&self, frame: &str) -> Result<()> {
        // ---
        match Envelope::decode(frame)?.payload()? {
            Payload::Response(response) => {
                self.process_response(response);
                Ok(())
            }
            Payload::Notification(notification) => self.process_notification(&notification),
        }
    }

    fn process_response(&self, response: Response) {
        // ---
        let method = match Method::try_from(response.method) {
            Ok(method) => method,
            Err(_) => {
                log_warn!("response for unknown method {} dropped", response.method);
                return;
            }
        };

        let outcome = response.outcome(method);
        if !lock_ignore_poison(&self.inner.ledger).resolve(method, outcome) {
            log_debug!("no caller waiting for {method}; response dropped");
        }
    }

    fn process_notification(&self, notification: &Notification) -> Result<()> {
        // ---
        match Event::from_notification(notification)? {
            Some(event) => self.emit(&event),
            None => {
                log_debug!("ignoring notification with event code {}", notification.event);
            }
        }
        Ok(())
    }

    /// Dispatch outside the registry lock so handlers can re-enter.
    fn emit(&self, event: &Event) {
        // ---
        let handlers = lock_ignore_poison(&self.inner.emitter).handlers_for(event.kind());
        dispatch(&handlers, event);
    }

    /// Queue `command` and arrange for it to be sent.
    ///
    /// Everything up to the returned future happens synchronously, so calls
    /// reach the wire in the order they were made.
    fn request(&self, command: Result<Command>) -> impl Future<Output = Reply> + Send + 'static {
        // ---
        let queued = command.and_then(|command| lock_ignore_poison(&self.inner.ledger).enqueue(command));

        if queued.is_ok() {
            self.pump();
        }

        let limit = self.inner.config.request_timeout;
        let inner = Arc::downgrade(&self.inner);

        async move {
            let (ticket, rx) = queued?;

            let reply = match limit {
                Some(limit) => match time::timeout(limit, rx).await {
                    Ok(reply) => reply,
                    Err(_) => {
                        if let Some(inner) = inner.upgrade() {
                            lock_ignore_poison(&inner.ledger).expire(ticket);
                        }
                        return Err(Error::Timeout);
                    }
                },
                None => rx.await,
            };

            reply.map_err(|_| Error::RequestDropped)?
        }
    }

    /// Flush if the channel is up, otherwise make sure an attempt is running.
    fn pump(&self) {
        // ---
        if self.inner.channel.is_connected() {
            self.flush();
        } else {
            self.begin_connect();
        }
    }

    fn begin_connect(&self) {
        // ---
        {
            let mut state = lock_ignore_poison(&self.inner.state);
            if *state == ConnectionState::Connecting {
                return;
            }
            *state = ConnectionState::Connecting;
        }

        log_debug!("{}: connecting", self.inner.channel.name());

        if let Err(_err) = self.inner.channel.connect() {
            log_warn!("{}: connect failed: {_err}", self.inner.channel.name());
            self.on_connection_failed();
        }
    }

    fn flush(&self) {
        // ---
        let channel = &self.inner.channel;
        let flushed = lock_ignore_poison(&self.inner.ledger).flush_unsent(|frame| channel.send_text(frame));

        match flushed {
            Ok(0) => {}
            Ok(_count) => {
                log_debug!("{}: sent {_count} command(s)", channel.name());
            }
            Err(_err) => {
                log_warn!("{}: send failed: {_err}", channel.name());
                self.on_connection_failed();
            }
        }
    }
}

fn device_or_default(device_uid: Option<&str>) -> String {
    // ---
    match device_uid {
        Some(uid) if !uid.is_empty() => uid.to_string(),
        _ => default_device_uid(),
    }
}

/// Decode the base64url JSON payload of a successful response.
fn payload_of<T: DeserializeOwned>(method: Method, data: Option<String>) -> Result<T> {
    // ---
    let encoded = data.ok_or_else(|| Error::MissingPayload(format!("{method} response")))?;
    Ok(serde_json::from_str(&decode(&encoded)?)?)
}
