//! Data models for gatehouse storage.
//!
//! Status columns are stored as plain TEXT and decoded through the
//! fail-closed helpers in `gatehouse-core` at the point of use, so a
//! row written with an unknown status can never pass a gate.

use serde::{Deserialize, Serialize};

use gatehouse_core::{BadgeStatus, DeviceKind, DeviceStatus, Schedule, UserStatus};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub level: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role_id: String,
    pub status: String,
    pub pin_hash: Option<String>,
    pub password_hash: String,
    pub failed_attempts: i64,
    pub last_attempt_at: Option<i64>,
    pub locked_until: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn status(&self) -> UserStatus {
        UserStatus::from_stored(&self.status)
    }

    /// Whether a lockout is in force at `now`.
    pub fn is_locked_at(&self, now: i64) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Insert payload for a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role_id: String,
    pub status: UserStatus,
    pub pin_hash: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Badge {
    pub id: String,
    pub uid_rfid: String,
    pub user_id: Option<String>,
    pub status: String,
    pub assigned_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

impl Badge {
    pub fn status(&self) -> BadgeStatus {
        BadgeStatus::from_stored(&self.status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub hardware_id: String,
    pub zone_id: String,
    pub kind: String,
    pub status: String,
    pub last_seen: Option<i64>,
    pub created_at: i64,
}

impl Device {
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus::from_stored(&self.status)
    }

    pub fn is_actuator(&self) -> bool {
        self.kind == DeviceKind::Actuator.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: String,
    pub role_id: String,
    pub zone_id: String,
    pub days: String,
    pub start_time: String,
    pub end_time: String,
    pub active: i64,
    pub created_at: i64,
}

impl Permission {
    /// Parse the stored schedule. A malformed row yields `None` and is
    /// treated as not matching (fail closed).
    pub fn schedule(&self) -> Option<Schedule> {
        Schedule::parse(&self.days, &self.start_time, &self.end_time).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Configuration {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessLog {
    pub id: String,
    pub device_id: String,
    pub user_id: Option<String>,
    pub badge_id: Option<String>,
    pub attempt_type: String,
    pub result: String,
    pub uid_rfid: Option<String>,
    pub source_ip: Option<String>,
    pub detail: String,
    pub created_at: i64,
}

/// Insert payload for an access log row; id and created_at are
/// generated by the append operation.
#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub device_id: String,
    pub user_id: Option<String>,
    pub badge_id: Option<String>,
    pub attempt_type: gatehouse_core::AttemptType,
    pub result: gatehouse_core::AccessResult,
    pub uid_rfid: Option<String>,
    pub source_ip: Option<String>,
    pub detail: serde_json::Value,
}
