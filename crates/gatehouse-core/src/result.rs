//! Closed access result taxonomy and attempt types.
//!
//! Every evaluated attempt terminates with exactly one [`AccessResult`],
//! shared verbatim between the HTTP response and the access log row so
//! the two can never diverge.

use serde::{Deserialize, Serialize};

/// Terminal outcome of an access evaluation.
///
/// The set is closed: storage rows written with codes from a newer
/// version decode to [`AccessResult::UnknownResult`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessResult {
    Success,
    MissingPin,
    MissingBadgeUid,
    UnknownBadge,
    BadgeInactive,
    BadgeUnassigned,
    UnknownUserForBadge,
    UserInactive,
    UserLocked,
    WrongPin,
    UnknownDevice,
    DeviceOffline,
    ActuatorNotFound,
    ActuatorUnreachable,
    ActuatorIdentificationTimeout,
    ActuatorOffline,
    PermissionDenied,
    UnknownResult,
    InternalError,
}

impl AccessResult {
    /// Storage/wire form of the result code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::MissingPin => "missing-pin",
            Self::MissingBadgeUid => "missing-badge-uid",
            Self::UnknownBadge => "unknown-badge",
            Self::BadgeInactive => "badge-inactive",
            Self::BadgeUnassigned => "badge-unassigned",
            Self::UnknownUserForBadge => "unknown-user-for-badge",
            Self::UserInactive => "user-inactive",
            Self::UserLocked => "user-locked",
            Self::WrongPin => "wrong-pin",
            Self::UnknownDevice => "unknown-device",
            Self::DeviceOffline => "device-offline",
            Self::ActuatorNotFound => "actuator-not-found",
            Self::ActuatorUnreachable => "actuator-unreachable",
            Self::ActuatorIdentificationTimeout => "actuator-identification-timeout",
            Self::ActuatorOffline => "actuator-offline",
            Self::PermissionDenied => "permission-denied",
            Self::UnknownResult => "unknown-result",
            Self::InternalError => "internal-error",
        }
    }

    /// Decode a stored result code, mapping unrecognized values to
    /// [`AccessResult::UnknownResult`].
    pub fn from_stored(value: &str) -> Self {
        match value {
            "success" => Self::Success,
            "missing-pin" => Self::MissingPin,
            "missing-badge-uid" => Self::MissingBadgeUid,
            "unknown-badge" => Self::UnknownBadge,
            "badge-inactive" => Self::BadgeInactive,
            "badge-unassigned" => Self::BadgeUnassigned,
            "unknown-user-for-badge" => Self::UnknownUserForBadge,
            "user-inactive" => Self::UserInactive,
            "user-locked" => Self::UserLocked,
            "wrong-pin" => Self::WrongPin,
            "unknown-device" => Self::UnknownDevice,
            "device-offline" => Self::DeviceOffline,
            "actuator-not-found" => Self::ActuatorNotFound,
            "actuator-unreachable" => Self::ActuatorUnreachable,
            "actuator-identification-timeout" => Self::ActuatorIdentificationTimeout,
            "actuator-offline" => Self::ActuatorOffline,
            "permission-denied" => Self::PermissionDenied,
            "internal-error" => Self::InternalError,
            _ => Self::UnknownResult,
        }
    }

    /// Whether this result grants access.
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for AccessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the credentials were presented at the reader.
///
/// `Action` marks synthetic log rows produced by status/error frames
/// from identified devices rather than by a badge scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptType {
    BadgeOnly,
    PinOnly,
    BadgePin,
    Unknown,
    Action,
}

impl AttemptType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadgeOnly => "badge_only",
            Self::PinOnly => "pin_only",
            Self::BadgePin => "badge_pin",
            Self::Unknown => "unknown",
            Self::Action => "action",
        }
    }

    /// Decode a stored attempt type, mapping unrecognized values to
    /// [`AttemptType::Unknown`].
    pub fn from_stored(value: &str) -> Self {
        match value {
            "badge_only" => Self::BadgeOnly,
            "pin_only" => Self::PinOnly,
            "badge_pin" => Self::BadgePin,
            "action" => Self::Action,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for AttemptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serde_form_matches_as_str() {
        for result in [
            AccessResult::Success,
            AccessResult::ActuatorIdentificationTimeout,
            AccessResult::UnknownUserForBadge,
            AccessResult::PermissionDenied,
        ] {
            let json = serde_json::to_string(&result).unwrap();
            assert_eq!(json, format!("\"{}\"", result.as_str()));
            assert_eq!(AccessResult::from_stored(result.as_str()), result);
        }
    }

    #[test]
    fn unrecognized_stored_code_decodes_to_unknown_result() {
        assert_eq!(
            AccessResult::from_stored("echec_badge"),
            AccessResult::UnknownResult
        );
    }

    #[test]
    fn attempt_type_round_trip() {
        assert_eq!(AttemptType::from_stored("badge_pin"), AttemptType::BadgePin);
        assert_eq!(AttemptType::from_stored("bogus"), AttemptType::Unknown);
        let json = serde_json::to_string(&AttemptType::BadgePin).unwrap();
        assert_eq!(json, "\"badge_pin\"");
    }
}
