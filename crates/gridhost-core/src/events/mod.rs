//! Event bus and well-known event names.

pub mod bus;
pub mod names;

pub use bus::{EventBus, EventPayload, ListenerFn};
