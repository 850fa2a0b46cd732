//! Device socket wire protocol.
//!
//! Devices speak JSON text frames over a duplex WebSocket. Inbound
//! frames are tagged by `type`; outbound frames are either handshake
//! acks (tagged by `status`), an identification trigger, or actuator
//! commands.

use serde::{Deserialize, Serialize};

/// Frames sent by devices to the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FrameIn {
    /// Physical presence announcement carrying the hardware id.
    Presence { mac: String },
    /// Identification completing the handshake. `deviceId` must match
    /// the mac announced by the same connection's presence frame.
    Identify {
        #[serde(rename = "deviceId")]
        device_id: String,
    },
    /// Status report from an identified device.
    Status {
        #[serde(flatten)]
        body: serde_json::Map<String, serde_json::Value>,
    },
    /// Error report from an identified device.
    Error {
        #[serde(flatten)]
        body: serde_json::Map<String, serde_json::Value>,
    },
}

/// Frames pushed from the gateway to devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FrameOut {
    Ack(AckFrame),
    Trigger(TriggerFrame),
    Command(DeviceCommand),
}

impl FrameOut {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Ack(AckFrame {
            status: "error".into(),
            device_id: None,
            mac: None,
            message: Some(message.into()),
        })
    }

    pub fn pending(mac: impl Into<String>) -> Self {
        Self::Ack(AckFrame {
            status: "pending".into(),
            device_id: None,
            mac: Some(mac.into()),
            message: None,
        })
    }

    pub fn identified(device_id: impl Into<String>) -> Self {
        Self::Ack(AckFrame {
            status: "identified".into(),
            device_id: Some(device_id.into()),
            mac: None,
            message: None,
        })
    }

    pub const fn trigger_identification() -> Self {
        Self::Trigger(TriggerFrame {
            kind: "triggerIdentification",
        })
    }
}

/// Handshake acknowledgement or error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckFrame {
    pub status: String,
    #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `{"type":"triggerIdentification"}` — asks a present-but-unidentified
/// device to complete its handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Command addressed to an actuator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCommand {
    pub command: String,
    #[serde(rename = "logId", skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
}

impl DeviceCommand {
    /// The unlock command dispatched on a granted attempt.
    pub fn open() -> Self {
        Self {
            command: "open".into(),
            log_id: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_presence_and_identify() {
        let frame: FrameIn = serde_json::from_str(r#"{"type":"presence","mac":"M1"}"#).unwrap();
        assert!(matches!(frame, FrameIn::Presence { mac } if mac == "M1"));

        let frame: FrameIn =
            serde_json::from_str(r#"{"type":"identify","deviceId":"M1"}"#).unwrap();
        assert!(matches!(frame, FrameIn::Identify { device_id } if device_id == "M1"));
    }

    #[test]
    fn status_frame_keeps_extra_fields() {
        let frame: FrameIn =
            serde_json::from_str(r#"{"type":"status","battery":87,"door":"closed"}"#).unwrap();
        match frame {
            FrameIn::Status { body } => {
                assert_eq!(body.get("battery"), Some(&serde_json::json!(87)));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<FrameIn>(r#"{"type":"hello"}"#).is_err());
    }

    #[test]
    fn outbound_wire_forms() {
        let json = serde_json::to_value(FrameOut::identified("M1")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "identified", "deviceId": "M1"}));

        let json = serde_json::to_value(FrameOut::trigger_identification()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "triggerIdentification"}));

        let json = serde_json::to_value(FrameOut::Command(DeviceCommand::open())).unwrap();
        assert_eq!(json, serde_json::json!({"command": "open"}));
    }
}
