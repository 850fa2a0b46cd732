//! In-memory connection registry for device channel management.
//!
//! A device connection lives in exactly one of two pools keyed by
//! hardware id: `pending` (presence announced, identification
//! incomplete) or `identified` (handshake complete). Both pools sit
//! behind one lock so a connect or identify racing a dispatch can
//! never observe a half-moved entry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::wire::FrameOut;

/// Message pushed to a device socket task.
#[derive(Debug)]
pub enum Outbound {
    /// Serialize and send a JSON frame.
    Frame(FrameOut),
    /// Close the socket (eviction).
    Close,
}

/// Holds an active channel to a connected device.
pub struct DeviceConnection {
    /// Hardware id announced in the presence frame.
    pub hardware_id: String,
    /// Unique per-connection id; guards eviction and teardown so a
    /// stale connection cannot remove or promote its replacement.
    pub connection_id: Uuid,
    frame_tx: mpsc::Sender<Outbound>,
}

impl DeviceConnection {
    pub fn new(hardware_id: String, frame_tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            hardware_id,
            connection_id: Uuid::new_v4(),
            frame_tx,
        }
    }

    /// Push a frame to the device through its socket task.
    pub async fn send_frame(&self, frame: FrameOut) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.frame_tx.send(Outbound::Frame(frame)).await
    }

    /// Ask the socket task to close the connection (best effort).
    async fn close(&self) {
        let _ = self.frame_tx.send(Outbound::Close).await;
    }
}

#[derive(Default)]
struct RegistryInner {
    pending: HashMap<String, Arc<DeviceConnection>>,
    identified: HashMap<String, Arc<DeviceConnection>>,
    identify_waiters: HashMap<String, Vec<oneshot::Sender<Arc<DeviceConnection>>>>,
}

/// Thread-safe registry of live device connections.
#[derive(Default)]
pub struct DeviceRegistry {
    inner: RwLock<RegistryInner>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new pending connection for a hardware id.
    ///
    /// Last writer wins: any older pending or identified connection
    /// with the same id receives an error frame and is closed.
    pub async fn register_presence(
        &self,
        hardware_id: &str,
        frame_tx: mpsc::Sender<Outbound>,
    ) -> Arc<DeviceConnection> {
        let conn = Arc::new(DeviceConnection::new(hardware_id.to_string(), frame_tx));

        let evicted = {
            let mut inner = self.inner.write().await;
            let evicted = inner
                .pending
                .remove(hardware_id)
                .or_else(|| inner.identified.remove(hardware_id));
            inner
                .pending
                .insert(hardware_id.to_string(), Arc::clone(&conn));
            evicted
        };

        if let Some(old) = evicted {
            warn!(hardware_id = %hardware_id, "Evicting older connection for re-announced device");
            let _ = old
                .send_frame(FrameOut::error("superseded by a newer connection"))
                .await;
            old.close().await;
        }

        info!(hardware_id = %hardware_id, "Device presence registered");
        conn
    }

    /// Move a connection from `pending` to `identified`.
    ///
    /// Succeeds only when the pending entry for `hardware_id` is the
    /// given connection; wakes every dispatch waiter registered for
    /// that id. Returns `false` when the connection was evicted or
    /// never announced presence.
    pub async fn complete_identification(&self, hardware_id: &str, connection_id: Uuid) -> bool {
        let (conn, waiters) = {
            let mut inner = self.inner.write().await;
            let matches = inner
                .pending
                .get(hardware_id)
                .is_some_and(|c| c.connection_id == connection_id);
            if !matches {
                return false;
            }
            let Some(conn) = inner.pending.remove(hardware_id) else {
                return false;
            };
            let displaced = inner
                .identified
                .insert(hardware_id.to_string(), Arc::clone(&conn));
            let waiters = inner.identify_waiters.remove(hardware_id).unwrap_or_default();
            drop(inner);

            if let Some(old) = displaced {
                let _ = old
                    .send_frame(FrameOut::error("superseded by a newer connection"))
                    .await;
                old.close().await;
            }
            (conn, waiters)
        };

        for waiter in waiters {
            let _ = waiter.send(Arc::clone(&conn));
        }

        info!(hardware_id = %hardware_id, "Device identified");
        true
    }

    /// Register a waiter that resolves once the hardware id becomes
    /// identified. Resolves immediately if it already is.
    pub async fn wait_identified(
        &self,
        hardware_id: &str,
    ) -> oneshot::Receiver<Arc<DeviceConnection>> {
        let (tx, rx) = oneshot::channel();

        let mut inner = self.inner.write().await;
        if let Some(conn) = inner.identified.get(hardware_id) {
            let _ = tx.send(Arc::clone(conn));
        } else {
            let waiters = inner.identify_waiters.entry(hardware_id.to_string()).or_default();
            waiters.retain(|w| !w.is_closed());
            waiters.push(tx);
        }

        rx
    }

    /// Delete a connection from whichever pool holds it, guarded by
    /// connection id. Close and error teardown paths.
    pub async fn remove(&self, hardware_id: &str, connection_id: Uuid) -> bool {
        let mut inner = self.inner.write().await;

        let in_pending = inner
            .pending
            .get(hardware_id)
            .is_some_and(|c| c.connection_id == connection_id);
        if in_pending {
            inner.pending.remove(hardware_id);
            info!(hardware_id = %hardware_id, "Pending device connection removed");
            return true;
        }

        let in_identified = inner
            .identified
            .get(hardware_id)
            .is_some_and(|c| c.connection_id == connection_id);
        if in_identified {
            inner.identified.remove(hardware_id);
            info!(hardware_id = %hardware_id, "Identified device connection removed");
            return true;
        }

        false
    }

    /// Get the identified connection for a hardware id.
    pub async fn get_identified(&self, hardware_id: &str) -> Option<Arc<DeviceConnection>> {
        self.inner.read().await.identified.get(hardware_id).cloned()
    }

    /// Get the pending connection for a hardware id.
    pub async fn get_pending(&self, hardware_id: &str) -> Option<Arc<DeviceConnection>> {
        self.inner.read().await.pending.get(hardware_id).cloned()
    }

    /// Whether a hardware id has a fully identified connection.
    pub async fn is_identified(&self, hardware_id: &str) -> bool {
        self.inner.read().await.identified.contains_key(hardware_id)
    }

    /// Count of identified connections.
    pub async fn identified_count(&self) -> usize {
        self.inner.read().await.identified.len()
    }

    /// Count of pending connections.
    pub async fn pending_count(&self) -> usize {
        self.inner.read().await.pending.len()
    }
}
