//! Configuration models for the pin manager and its backlog.

pub mod manager;

pub use manager::{PinManagerConfig, QueueBackendConfig};
