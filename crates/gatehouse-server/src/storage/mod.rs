//! SQLite-backed persistence for the gatehouse server.
//!
//! The decision engine consumes this layer only through the narrow
//! query surface on [`AccessDatabase`]: entity lookups, the lockout
//! counters, fresh configuration reads, and the append-only access
//! log.

pub mod db;
pub mod models;
pub mod queries;
pub mod queries_logs;

#[cfg(test)]
mod tests;

pub use db::{AccessDatabase, DatabaseError};
pub use models::{
    AccessLog, Badge, Configuration, Device, NewAccessLog, NewUser, Permission, Role, User, Zone,
};
