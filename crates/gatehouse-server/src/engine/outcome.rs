//! Attempt input, verdicts, and the internal gate outcome types.

use serde::{Deserialize, Serialize};

use gatehouse_core::{AccessResult, AttemptType};

use crate::storage::DatabaseError;

/// One inbound access attempt. Not persisted as-is; the terminal
/// access log row is the durable record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAttempt {
    pub device_id: String,
    pub uid_rfid: Option<String>,
    pub pin: Option<String>,
    pub attempt_type: AttemptType,
}

/// Terminal verdict of an evaluation. `result` and the logged row
/// always carry the same code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessVerdict {
    pub granted: bool,
    pub result: AccessResult,
    pub reason: String,
    pub log_id: String,
}

/// A failed gate: the denial code, the human-readable reason, and
/// whatever identities were resolved before the gate fired.
#[derive(Debug)]
pub(crate) struct Denial {
    pub result: AccessResult,
    pub reason: String,
    pub user_id: Option<String>,
    pub badge_id: Option<String>,
    pub detail: Option<serde_json::Value>,
}

impl Denial {
    pub fn new(result: AccessResult, reason: impl Into<String>) -> Self {
        Self {
            result,
            reason: reason.into(),
            user_id: None,
            badge_id: None,
            detail: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_badge(mut self, badge_id: impl Into<String>) -> Self {
        self.badge_id = Some(badge_id.into());
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Why a gate sequence stopped early.
#[derive(Debug)]
pub(crate) enum GateFailure {
    /// A gate denied the attempt: a normal, fully logged outcome.
    Denied(Denial),
    /// Something broke inside the pipeline; surfaced as a generic
    /// `internal-error` denial, never propagated to the caller.
    Internal(EngineError),
}

impl From<Denial> for GateFailure {
    fn from(denial: Denial) -> Self {
        Self::Denied(denial)
    }
}

impl From<EngineError> for GateFailure {
    fn from(error: EngineError) -> Self {
        Self::Internal(error)
    }
}

impl From<DatabaseError> for GateFailure {
    fn from(error: DatabaseError) -> Self {
        Self::Internal(EngineError::Database(error))
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum EngineError {
    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Credential hash error: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Successfully passed all gates; what the grant path needs for the
/// log row.
#[derive(Debug)]
pub(crate) struct Grant {
    pub user_id: String,
    pub badge_id: String,
    pub actuator_hardware_id: String,
}
