//! WebSocket handler and per-connection session state machine.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use gatehouse_core::{AccessResult, AttemptType, DeviceStatus};

use crate::http::AppState;
use crate::registry::{DeviceConnection, DeviceRegistry, Outbound};
use crate::storage::{AccessDatabase, NewAccessLog};
use crate::wire::{FrameIn, FrameOut};

/// `GET /devices/ws` — upgrade a device connection.
pub async fn device_socket(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    let peer = Some(addr.ip().to_string());
    ws.on_upgrade(move |socket| handle_device_socket(socket, state, peer))
}

async fn handle_device_socket(mut socket: WebSocket, state: AppState, peer: Option<String>) {
    info!(peer = peer.as_deref().unwrap_or("unknown"), "Device socket connected");

    // All outbound traffic (handshake replies, dispatch pushes) funnels
    // through one channel owned by this task.
    let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(64);
    let mut session = DeviceSession::new(
        Arc::clone(&state.registry),
        state.db.clone(),
        out_tx,
        peer,
    );

    loop {
        tokio::select! {
            outbound = out_rx.recv() => {
                match outbound {
                    Some(Outbound::Frame(frame)) => {
                        let text = match serde_json::to_string(&frame) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(error = %e, "Failed to serialize outbound frame");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Eviction or all senders gone.
                    Some(Outbound::Close) | None => break,
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()).await,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Ping/pong are answered by the protocol layer;
                    // binary frames are not part of the device protocol.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let hardware_id = session.hardware_id().map(ToString::to_string);
    session.finish().await;
    let _ = socket.send(Message::Close(None)).await;
    info!(
        hardware_id = hardware_id.as_deref().unwrap_or("unidentified"),
        "Device socket disconnected"
    );
}

/// Handshake state for one device connection.
pub struct DeviceSession {
    registry: Arc<DeviceRegistry>,
    db: AccessDatabase,
    out_tx: mpsc::Sender<Outbound>,
    conn: Option<Arc<DeviceConnection>>,
    identified: bool,
    peer: Option<String>,
}

impl DeviceSession {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        db: AccessDatabase,
        out_tx: mpsc::Sender<Outbound>,
        peer: Option<String>,
    ) -> Self {
        Self {
            registry,
            db,
            out_tx,
            conn: None,
            identified: false,
            peer,
        }
    }

    /// Hardware id announced by this connection, if any.
    pub fn hardware_id(&self) -> Option<&str> {
        self.conn.as_deref().map(|c| c.hardware_id.as_str())
    }

    /// Process one inbound text frame. Malformed or out-of-sequence
    /// messages get an error reply and leave the registry untouched.
    pub async fn handle_text(&mut self, text: &str) {
        let frame = match serde_json::from_str::<FrameIn>(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "Malformed device frame");
                self.reply(FrameOut::error("invalid message format")).await;
                return;
            }
        };

        match frame {
            FrameIn::Presence { mac } => self.on_presence(mac).await,
            FrameIn::Identify { device_id } => self.on_identify(&device_id).await,
            FrameIn::Status { body } => self.on_report("status", AccessResult::Success, body).await,
            FrameIn::Error { body } => {
                self.on_report("error", AccessResult::UnknownResult, body).await;
            }
        }
    }

    async fn on_presence(&mut self, mac: String) {
        if mac.is_empty() {
            self.reply(FrameOut::error("presence requires a hardware id")).await;
            return;
        }

        // A re-announce from the same connection releases its previous
        // slot first so the eviction path only ever hits other
        // connections.
        self.release_slot().await;

        let conn = self.registry.register_presence(&mac, self.out_tx.clone()).await;
        self.conn = Some(conn);
        self.reply(FrameOut::pending(mac)).await;
    }

    async fn on_identify(&mut self, device_id: &str) {
        let Some(conn) = self.conn.as_ref() else {
            self.reply(FrameOut::error("identify requires a prior presence announcement"))
                .await;
            return;
        };

        if conn.hardware_id != device_id {
            warn!(
                announced = %conn.hardware_id,
                identified = %device_id,
                "Identify does not match announced hardware id"
            );
            self.reply(FrameOut::error("identify does not match announced hardware id"))
                .await;
            return;
        }

        if !self
            .registry
            .complete_identification(&conn.hardware_id, conn.connection_id)
            .await
        {
            self.reply(FrameOut::error("connection is no longer pending")).await;
            return;
        }

        self.identified = true;
        self.reply(FrameOut::identified(device_id)).await;

        // Provisioned devices are flipped online once identified.
        if let Err(e) = self.db.set_device_status(device_id, DeviceStatus::Online).await {
            warn!(hardware_id = %device_id, error = %e, "Failed to update device status");
        }
    }

    /// Record a status/error report from an identified device as a
    /// synthetic access log row with attempt type `action`.
    async fn on_report(
        &mut self,
        kind: &str,
        result: AccessResult,
        body: serde_json::Map<String, serde_json::Value>,
    ) {
        if !self.identified {
            self.reply(FrameOut::error("reports require an identified connection")).await;
            return;
        }
        let Some(conn) = self.conn.as_ref() else {
            return;
        };

        let device_id = match self.db.get_device_by_hardware_id(&conn.hardware_id).await {
            Ok(Some(device)) => device.id,
            Ok(None) => conn.hardware_id.clone(),
            Err(e) => {
                warn!(hardware_id = %conn.hardware_id, error = %e, "Device lookup failed for report");
                conn.hardware_id.clone()
            }
        };

        let entry = NewAccessLog {
            device_id,
            user_id: None,
            badge_id: None,
            attempt_type: AttemptType::Action,
            result,
            uid_rfid: None,
            source_ip: self.peer.clone(),
            detail: serde_json::json!({ "type": kind, "report": body }),
        };

        if let Err(e) = self.db.append_access_log(&entry).await {
            warn!(hardware_id = %conn.hardware_id, error = %e, "Failed to log device report");
        }
    }

    /// Teardown: release the registry slot promptly and flip an
    /// identified device back offline.
    pub async fn finish(&mut self) {
        self.release_slot().await;
    }

    async fn release_slot(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        // An evicted session's slot now belongs to its replacement;
        // only the connection that still owns the slot may flip the
        // device offline.
        let owned_slot = self.registry.remove(&conn.hardware_id, conn.connection_id).await;

        if owned_slot && self.identified {
            if let Err(e) = self
                .db
                .set_device_status(&conn.hardware_id, DeviceStatus::Offline)
                .await
            {
                warn!(hardware_id = %conn.hardware_id, error = %e, "Failed to update device status");
            }
        }
        self.identified = false;
    }

    async fn reply(&self, frame: FrameOut) {
        let _ = self.out_tx.send(Outbound::Frame(frame)).await;
    }
}
