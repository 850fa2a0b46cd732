//! HTTP surface: the access attempt endpoint, health, and the device
//! socket upgrade.

pub mod routes;

#[cfg(test)]
mod routes_tests;

pub use routes::router;

use std::sync::Arc;

use crate::engine::AccessEngine;
use crate::registry::DeviceRegistry;
use crate::storage::AccessDatabase;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: AccessDatabase,
    pub registry: Arc<DeviceRegistry>,
    pub engine: Arc<AccessEngine>,
}
