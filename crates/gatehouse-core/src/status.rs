//! Status enums for devices, badges, and users.

use serde::{Deserialize, Serialize};

/// Physical role of a provisioned device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Scans badge/PIN and submits access attempts.
    Reader,
    /// Executes unlock commands (door lock, turnstile).
    Actuator,
}

impl DeviceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Actuator => "actuator",
        }
    }
}

/// Persisted availability of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Offline,
    Maintenance,
}

impl DeviceStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Maintenance => "maintenance",
        }
    }

    /// Decode a stored status; unrecognized values read as offline so a
    /// bad row can never pass the online gate.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "online" => Self::Online,
            "maintenance" => Self::Maintenance,
            _ => Self::Offline,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeStatus {
    Active,
    Inactive,
    Lost,
    Stolen,
}

impl BadgeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Lost => "lost",
            Self::Stolen => "stolen",
        }
    }

    /// Decode a stored status; unrecognized values read as inactive.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "lost" => Self::Lost,
            "stolen" => Self::Stolen,
            _ => Self::Inactive,
        }
    }
}

impl std::fmt::Display for BadgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    /// Decode a stored status; unrecognized values read as inactive.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            _ => Self::Inactive,
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
