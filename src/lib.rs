//! Client for the local fingerprint reader service
//!
//! This library talks to a fingerprint service over a named text channel.
//! It queues method calls until the channel is up, matches responses back to
//! the calls that caused them, and turns device notifications into typed
//! events.
//!
//! ```no_run
//! use fingerprint_rpc::{
//!     create_memory_channel, ClientConfig, EventHandler, EventKind, FingerprintClient,
//!     SampleFormat,
//! };
//!
//! # async fn example() -> fingerprint_rpc::Result<()> {
//! let config = ClientConfig::default();
//! let (channel, _service) = create_memory_channel(&config);
//! let client = FingerprintClient::with_channel(channel, config).await?;
//!
//! client.on(
//!     EventKind::SamplesAcquired,
//!     EventHandler::new(|event| println!("{event:?}")),
//! );
//!
//! let readers = client.enumerate_devices().await?;
//! client
//!     .start_acquisition(SampleFormat::PngImage, readers.first().map(String::as_str))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Mutex, MutexGuard};

// Import all sub modules once...
mod macros;

mod channel;
mod client;
mod client_config;
mod domain;
mod error;

pub mod codec;
pub mod device;
pub mod event;
pub mod protocol;

#[allow(unused_imports)]
pub(crate) use macros::{log_debug, log_error, log_info, log_warn};

// Re-export main types
pub use client::{ConnectionState, EventEmitter, FingerprintClient};

pub use client_config::{ClientConfig, DEFAULT_CHANNEL_NAME, DEFAULT_EVENT_CAPACITY};

pub use error::{Error, Result};

pub use channel::{create_memory_channel, MemoryService};

pub use device::{
    //
    default_device_uid,
    DeviceInfo,
    DeviceModality,
    DeviceTechnology,
    DeviceUidType,
    QualityCode,
    SampleFormat,
};

pub use event::{Event, EventHandler, EventKind};

// --- public re-exports
pub use domain::{
    //
    Channel,
    ChannelBase,
    ChannelEvent,
    ChannelHandle,
    ChannelPtr,
};

/// Acquire a mutex guard, intentionally ignoring poisoning.
///
/// Mutex poisoning indicates that another thread panicked while holding the
/// lock. The guarded state here (request ledger, handler registry,
/// connection state) has no invariants spanning a panic point, and event
/// handlers never run under these locks.
///
/// This avoids propagating non-`Send` poison errors across async boundaries.
pub(crate) fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // ---
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
