//! Command dispatch through live device connections.
//!
//! Devices announce physical presence before completing the heavier
//! identification exchange, so dispatch must be able to command a
//! present-but-unidentified device without dropping a legitimate
//! grant: it nudges the device with a `triggerIdentification` frame
//! and waits one bounded grace period instead of failing hard.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use gatehouse_core::AccessResult;

use crate::registry::connection::DeviceRegistry;
use crate::wire::{DeviceCommand, FrameOut};

/// Terminal outcome of a dispatch, mapping 1:1 onto the actuator slice
/// of the access result taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Unreachable,
    IdentificationTimeout,
    Offline,
}

impl DispatchOutcome {
    pub const fn to_access_result(self) -> AccessResult {
        match self {
            Self::Delivered => AccessResult::Success,
            Self::Unreachable => AccessResult::ActuatorUnreachable,
            Self::IdentificationTimeout => AccessResult::ActuatorIdentificationTimeout,
            Self::Offline => AccessResult::ActuatorOffline,
        }
    }
}

/// Sends commands to actuators through the registry.
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<DeviceRegistry>,
    grace: Duration,
}

impl CommandDispatcher {
    pub const fn new(registry: Arc<DeviceRegistry>, grace: Duration) -> Self {
        Self { registry, grace }
    }

    /// Deliver a command to the device with the given hardware id.
    ///
    /// An identified device gets the command directly. A pending
    /// device is asked to identify and given one grace period; the
    /// wait is a single bounded timer and never blocks other
    /// connections. A device in neither pool is offline.
    pub async fn dispatch(&self, hardware_id: &str, command: DeviceCommand) -> DispatchOutcome {
        if let Some(conn) = self.registry.get_identified(hardware_id).await {
            return Self::deliver(&conn, command).await;
        }

        let Some(pending) = self.registry.get_pending(hardware_id).await else {
            // The device may have finished identifying between the two
            // pool lookups.
            if let Some(conn) = self.registry.get_identified(hardware_id).await {
                return Self::deliver(&conn, command).await;
            }
            return DispatchOutcome::Offline;
        };

        // Register the waiter before the trigger so a fast identify
        // cannot slip between send and wait.
        let waiter = self.registry.wait_identified(hardware_id).await;

        if pending
            .send_frame(FrameOut::trigger_identification())
            .await
            .is_err()
        {
            warn!(hardware_id = %hardware_id, "Failed to send identification trigger");
            return DispatchOutcome::Unreachable;
        }

        debug!(
            hardware_id = %hardware_id,
            grace_ms = self.grace.as_millis(),
            "Waiting for pending device to identify"
        );

        match timeout(self.grace, waiter).await {
            Ok(Ok(conn)) => Self::deliver(&conn, command).await,
            Ok(Err(_)) | Err(_) => {
                warn!(hardware_id = %hardware_id, "Device did not identify within the grace period");
                DispatchOutcome::IdentificationTimeout
            }
        }
    }

    async fn deliver(
        conn: &Arc<crate::registry::connection::DeviceConnection>,
        command: DeviceCommand,
    ) -> DispatchOutcome {
        if conn.send_frame(FrameOut::Command(command)).await.is_err() {
            warn!(hardware_id = %conn.hardware_id, "Failed to push command to device channel");
            return DispatchOutcome::Unreachable;
        }
        DispatchOutcome::Delivered
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::registry::connection::Outbound;
    use tokio::sync::mpsc;

    fn dispatcher(registry: &Arc<DeviceRegistry>, grace_ms: u64) -> CommandDispatcher {
        CommandDispatcher::new(Arc::clone(registry), Duration::from_millis(grace_ms))
    }

    #[tokio::test]
    async fn dispatch_to_identified_device_delivers_command() {
        let registry = Arc::new(DeviceRegistry::new());
        let (tx, mut rx) = mpsc::channel(16);

        let conn = registry.register_presence("A1", tx).await;
        registry.complete_identification("A1", conn.connection_id).await;

        let outcome = dispatcher(&registry, 1000)
            .dispatch("A1", DeviceCommand::open())
            .await;

        assert_eq!(outcome, DispatchOutcome::Delivered);
        match rx.recv().await {
            Some(Outbound::Frame(FrameOut::Command(cmd))) => assert_eq!(cmd.command, "open"),
            other => panic!("unexpected outbound: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_to_unknown_device_is_offline() {
        let registry = Arc::new(DeviceRegistry::new());

        let outcome = dispatcher(&registry, 50)
            .dispatch("A1", DeviceCommand::open())
            .await;

        assert_eq!(outcome, DispatchOutcome::Offline);
    }

    #[tokio::test]
    async fn pending_device_identifying_within_grace_gets_command() {
        let registry = Arc::new(DeviceRegistry::new());
        let (tx, mut rx) = mpsc::channel(16);

        let conn = registry.register_presence("A1", tx).await;

        // Device completes identification shortly after the trigger.
        let reg = Arc::clone(&registry);
        let connection_id = conn.connection_id;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            reg.complete_identification("A1", connection_id).await;
        });

        let outcome = dispatcher(&registry, 500)
            .dispatch("A1", DeviceCommand::open())
            .await;

        assert_eq!(outcome, DispatchOutcome::Delivered);

        // Trigger frame first, then the command.
        assert!(matches!(
            rx.recv().await,
            Some(Outbound::Frame(FrameOut::Trigger(_)))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(Outbound::Frame(FrameOut::Command(_)))
        ));
    }

    #[tokio::test]
    async fn pending_device_that_never_identifies_times_out() {
        let registry = Arc::new(DeviceRegistry::new());
        let (tx, mut rx) = mpsc::channel(16);

        registry.register_presence("A1", tx).await;

        let outcome = dispatcher(&registry, 50)
            .dispatch("A1", DeviceCommand::open())
            .await;

        assert_eq!(outcome, DispatchOutcome::IdentificationTimeout);

        // Only the trigger was sent.
        assert!(matches!(
            rx.recv().await,
            Some(Outbound::Frame(FrameOut::Trigger(_)))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_channel_is_unreachable() {
        let registry = Arc::new(DeviceRegistry::new());
        let (tx, rx) = mpsc::channel(16);

        let conn = registry.register_presence("A1", tx).await;
        registry.complete_identification("A1", conn.connection_id).await;
        drop(rx);

        let outcome = dispatcher(&registry, 50)
            .dispatch("A1", DeviceCommand::open())
            .await;

        assert_eq!(outcome, DispatchOutcome::Unreachable);
    }
}
