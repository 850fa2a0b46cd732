//! In-memory device connection registry and command dispatch.

pub mod connection;
pub mod dispatch;

pub use connection::{DeviceConnection, DeviceRegistry, Outbound};
pub use dispatch::{CommandDispatcher, DispatchOutcome};
