//! Event bus for kernel notifications.
//!
//! Provides an `EventBus` that distributes `KernelEvent` messages to all
//! subscribers via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
