//! Channel implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Channel` trait, exposed only through constructor functions.
//!
//! Domain code must not depend on channel-specific types.

mod memory;

pub use memory::{create_memory_channel, MemoryService};
