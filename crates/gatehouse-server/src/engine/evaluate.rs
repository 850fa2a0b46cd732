//! The gate sequence for one access attempt.

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use gatehouse_core::{
    format_timestamp, unix_timestamp, AccessResult, AttemptType, BadgeStatus, DeviceStatus,
    UserStatus,
};

use crate::auth::password;
use crate::registry::{CommandDispatcher, DispatchOutcome};
use crate::storage::{AccessDatabase, NewAccessLog};
use crate::wire::DeviceCommand;

use super::outcome::{AccessAttempt, AccessVerdict, Denial, EngineError, GateFailure, Grant};
use super::{CONFIG_LOCK_DURATION_MINUTES, CONFIG_MAX_ATTEMPTS};

/// Evaluates access attempts against stored credentials, lockout
/// state, and the zone permission schedule, then commands the zone's
/// actuator through the dispatcher.
pub struct AccessEngine {
    db: AccessDatabase,
    dispatcher: CommandDispatcher,
}

impl AccessEngine {
    pub const fn new(db: AccessDatabase, dispatcher: CommandDispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Evaluate one attempt to a terminal, logged outcome.
    ///
    /// Never returns an error: pipeline failures become a logged
    /// `internal-error` denial. Exactly one access log row is written
    /// per call (log-write failure itself is the one exception, and
    /// degrades to an unlogged internal error verdict).
    #[instrument(skip(self, attempt, source_ip), fields(device_id = %attempt.device_id))]
    pub async fn evaluate(
        &self,
        attempt: &AccessAttempt,
        source_ip: Option<String>,
    ) -> AccessVerdict {
        let outcome = self.run_gates(attempt).await;

        let (result, reason, user_id, badge_id, detail) = match outcome {
            Ok(grant) => (
                AccessResult::Success,
                "access granted".to_string(),
                Some(grant.user_id),
                Some(grant.badge_id),
                serde_json::json!({
                    "message": "access granted",
                    "actuator": grant.actuator_hardware_id,
                }),
            ),
            Err(GateFailure::Denied(denial)) => {
                info!(result = %denial.result, reason = %denial.reason, "Access denied");
                let detail = denial
                    .detail
                    .unwrap_or_else(|| serde_json::json!({ "reason": denial.reason }));
                (denial.result, denial.reason, denial.user_id, denial.badge_id, detail)
            }
            Err(GateFailure::Internal(e)) => {
                error!(error = %e, "Access evaluation failed");
                (
                    AccessResult::InternalError,
                    "internal server error".to_string(),
                    None,
                    None,
                    serde_json::json!({ "error": e.to_string() }),
                )
            }
        };

        let entry = NewAccessLog {
            device_id: attempt.device_id.clone(),
            user_id,
            badge_id,
            attempt_type: attempt.attempt_type,
            result,
            uid_rfid: attempt.uid_rfid.clone(),
            source_ip,
            detail,
        };

        match self.db.append_access_log(&entry).await {
            Ok(log) => AccessVerdict {
                granted: result.is_granted(),
                result,
                reason,
                log_id: log.id,
            },
            Err(e) => {
                error!(error = %e, "Failed to write access log");
                AccessVerdict {
                    granted: false,
                    result: AccessResult::InternalError,
                    reason: "internal server error".to_string(),
                    log_id: String::new(),
                }
            }
        }
    }

    async fn run_gates(&self, attempt: &AccessAttempt) -> Result<Grant, GateFailure> {
        let now = unix_timestamp();

        // Gate 1: the reader must exist and be online.
        let Some(device) = self.db.get_device(&attempt.device_id).await? else {
            return Err(Denial::new(AccessResult::UnknownDevice, "unknown device").into());
        };
        if device.status() != DeviceStatus::Online {
            return Err(Denial::new(
                AccessResult::DeviceOffline,
                format!("device is {}", device.status()),
            )
            .into());
        }

        // Only combined badge+PIN attempts identify a user.
        if attempt.attempt_type != AttemptType::BadgePin {
            return Err(Denial::new(
                AccessResult::UnknownResult,
                format!(
                    "unable to identify a user for attempt type {}",
                    attempt.attempt_type
                ),
            )
            .into());
        }

        // Gate 2: both credentials must be present.
        let Some(pin) = attempt.pin.as_deref().filter(|p| !p.is_empty()) else {
            return Err(Denial::new(AccessResult::MissingPin, "PIN is required").into());
        };
        let Some(uid_rfid) = attempt.uid_rfid.as_deref().filter(|u| !u.is_empty()) else {
            return Err(Denial::new(AccessResult::MissingBadgeUid, "badge UID is required").into());
        };

        // Gate 3: the badge must exist, be active, and have an owner.
        let Some(badge) = self.db.get_badge_by_uid(uid_rfid).await? else {
            return Err(Denial::new(AccessResult::UnknownBadge, "unknown badge").into());
        };
        if badge.status() != BadgeStatus::Active {
            return Err(Denial::new(
                AccessResult::BadgeInactive,
                format!("badge is not active ({})", badge.status()),
            )
            .with_badge(&badge.id)
            .into());
        }
        let Some(owner_id) = badge.user_id.clone() else {
            return Err(Denial::new(AccessResult::BadgeUnassigned, "badge is not assigned")
                .with_badge(&badge.id)
                .into());
        };

        // Gate 4: the owner must exist, be active, and not locked out.
        let Some(user) = self.db.get_user(&owner_id).await? else {
            return Err(Denial::new(
                AccessResult::UnknownUserForBadge,
                "no user found for this badge",
            )
            .with_badge(&badge.id)
            .with_detail(serde_json::json!({
                "reason": "no user found for this badge",
                "userIdAttempted": owner_id,
            }))
            .into());
        };
        if user.status() != UserStatus::Active {
            return Err(Denial::new(AccessResult::UserInactive, "user is not active")
                .with_user(&user.id)
                .with_badge(&badge.id)
                .into());
        }
        if let Some(until) = user.locked_until {
            if now < until {
                return Err(Denial::new(
                    AccessResult::UserLocked,
                    format!("user is locked until {}", format_timestamp(until)),
                )
                .with_user(&user.id)
                .with_badge(&badge.id)
                .into());
            }
        }

        // Gate 5: PIN verification with the lockout counter.
        let pin_ok = match user.pin_hash.as_deref() {
            Some(hash) => password::verify_password(pin, hash).map_err(EngineError::Hash)?,
            None => false,
        };
        if !pin_ok {
            return Err(self.on_wrong_pin(&user.id, &badge.id, now).await?);
        }
        if user.failed_attempts > 0 || user.locked_until.is_some() {
            self.db.reset_failed_attempts(&user.id).await?;
        }

        // Gate 6: role permission for the reader's zone at this instant.
        let at = Utc::now();
        let permitted = self
            .db
            .permissions_for(&user.role_id, &device.zone_id)
            .await?
            .iter()
            .any(|p| p.schedule().is_some_and(|s| s.contains_instant(at)));
        if !permitted {
            return Err(Denial::new(
                AccessResult::PermissionDenied,
                "access to this zone is not permitted at the current day and time",
            )
            .with_user(&user.id)
            .with_badge(&badge.id)
            .into());
        }

        // Gate 7: the zone must have an actuator configured.
        let Some(actuator) = self.db.get_actuator_for_zone(&device.zone_id).await? else {
            return Err(Denial::new(
                AccessResult::ActuatorNotFound,
                "no actuator configured for this zone",
            )
            .with_user(&user.id)
            .with_badge(&badge.id)
            .into());
        };

        // Gate 8: command the actuator.
        let outcome = self
            .dispatcher
            .dispatch(&actuator.hardware_id, DeviceCommand::open())
            .await;
        if outcome != DispatchOutcome::Delivered {
            return Err(Denial::new(
                outcome.to_access_result(),
                dispatch_denial_reason(outcome),
            )
            .with_user(&user.id)
            .with_badge(&badge.id)
            .with_detail(serde_json::json!({
                "reason": dispatch_denial_reason(outcome),
                "actuator": actuator.hardware_id,
            }))
            .into());
        }

        Ok(Grant {
            user_id: user.id,
            badge_id: badge.id,
            actuator_hardware_id: actuator.hardware_id,
        })
    }

    /// Wrong PIN: bump the counter and apply the lockout policy read
    /// fresh from configuration.
    async fn on_wrong_pin(
        &self,
        user_id: &str,
        badge_id: &str,
        now: i64,
    ) -> Result<GateFailure, GateFailure> {
        let attempts = self.db.increment_failed_attempts(user_id).await?;

        if let Some((max_attempts, lock_minutes)) = self.lockout_policy().await? {
            if attempts >= max_attempts {
                let until = now + lock_minutes * 60;
                self.db.lock_user(user_id, until).await?;
                return Ok(Denial::new(
                    AccessResult::UserLocked,
                    format!(
                        "too many failed attempts; locked until {}",
                        format_timestamp(until)
                    ),
                )
                .with_user(user_id)
                .with_badge(badge_id)
                .with_detail(serde_json::json!({
                    "reason": "too many failed attempts",
                    "attempts": attempts,
                }))
                .into());
            }
        }

        Ok(Denial::new(AccessResult::WrongPin, "incorrect PIN")
            .with_user(user_id)
            .with_badge(badge_id)
            .into())
    }

    /// Lockout thresholds, read fresh on every wrong PIN so operators
    /// can retune without a redeploy. `None` disables the lockout step.
    async fn lockout_policy(&self) -> Result<Option<(i64, i64)>, GateFailure> {
        let max_attempts = self.db.get_config(CONFIG_MAX_ATTEMPTS).await?;
        let lock_minutes = self.db.get_config(CONFIG_LOCK_DURATION_MINUTES).await?;

        match (
            max_attempts.as_deref().and_then(|v| v.parse::<i64>().ok()),
            lock_minutes.as_deref().and_then(|v| v.parse::<i64>().ok()),
        ) {
            (Some(max), Some(minutes)) if max > 0 && minutes > 0 => Ok(Some((max, minutes))),
            _ => {
                warn!("Lockout policy not configured; skipping lockout check");
                Ok(None)
            }
        }
    }
}

const fn dispatch_denial_reason(outcome: DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::Delivered => "command delivered",
        DispatchOutcome::Unreachable => "actuator is unreachable",
        DispatchOutcome::IdentificationTimeout => "actuator did not identify in time",
        DispatchOutcome::Offline => "actuator is not connected",
    }
}
