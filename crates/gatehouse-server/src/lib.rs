//! Gatehouse Access Server Library
//!
//! Core functionality for the gatehouse server:
//! - SQLite storage for zones, users, badges, devices, permissions,
//!   and the append-only access log
//! - Badge + PIN access decision engine with a closed result taxonomy
//! - WebSocket gateway running the presence→identify device handshake
//! - Connection registry and command dispatch with a bounded
//!   identification grace period

pub mod auth;
pub mod engine;
pub mod gateway;
pub mod http;
pub mod registry;
pub mod seed;
pub mod storage;
pub mod wire;
