//! Device-facing WebSocket gateway.
//!
//! Runs the presence→identify handshake that binds a hardware id to a
//! live channel, forwards frames pushed by dispatch, and records
//! status/error reports from identified devices in the access log.

pub mod socket;


pub use socket::device_socket;
