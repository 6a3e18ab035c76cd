//! Domain layer public interface.
//!
//! This module defines domain-level abstractions that are independent of
//! concrete channel implementations or the device service behind them.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod channel;

// --- Channel domain re-exports ---

pub use channel::{
    //
    Channel,
    ChannelBase,
    ChannelEvent,
    ChannelHandle,
    ChannelPtr,
};
