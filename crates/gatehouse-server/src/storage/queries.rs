//! Entity and configuration queries for the gatehouse server.

use uuid::Uuid;

use gatehouse_core::{unix_timestamp, BadgeStatus, DeviceKind, DeviceStatus};

use super::db::{AccessDatabase, DatabaseError};
use super::models::{Badge, Configuration, Device, NewUser, Permission, Role, User, Zone};

impl AccessDatabase {
    // =========================================================================
    // Zone / role queries
    // =========================================================================

    /// Create a zone.
    pub async fn create_zone(&self, name: &str, description: &str) -> Result<Zone, DatabaseError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO zones (id, name, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(description)
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        self.get_zone(&id).await
    }

    pub async fn get_zone(&self, id: &str) -> Result<Zone, DatabaseError> {
        sqlx::query_as::<_, Zone>("SELECT * FROM zones WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Zone {id}")))
    }

    /// Create a role with an ordinal access level (1-5).
    pub async fn create_role(&self, name: &str, level: i64) -> Result<Role, DatabaseError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO roles (id, name, level, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(level)
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
            .bind(&id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Role {id}")))
    }

    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a user.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, name, email, role_id, status, pin_hash, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role_id)
        .bind(user.status.as_str())
        .bind(&user.pin_hash)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(&id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by ID. Absence is a domain outcome for the decision
    /// pipeline, not an error.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(user)
    }

    /// Increment a user's failed-attempt counter and return the updated
    /// count. Single statement so concurrent attempts cannot lose an
    /// increment.
    pub async fn increment_failed_attempts(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "UPDATE users SET failed_attempts = failed_attempts + 1, last_attempt_at = ?, updated_at = ? \
             WHERE id = ? RETURNING failed_attempts",
        )
        .bind(unix_timestamp())
        .bind(unix_timestamp())
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {user_id}")))?;

        Ok(count)
    }

    /// Zero the failed-attempt counter and clear any lockout.
    pub async fn reset_failed_attempts(&self, user_id: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE users SET failed_attempts = 0, locked_until = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(unix_timestamp())
        .bind(user_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Lock a user out of PIN authentication until the given timestamp.
    pub async fn lock_user(&self, user_id: &str, until: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET locked_until = ?, updated_at = ? WHERE id = ?")
            .bind(until)
            .bind(unix_timestamp())
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    // =========================================================================
    // Badge queries
    // =========================================================================

    /// Create a badge, optionally assigned to a user.
    pub async fn create_badge(
        &self,
        uid_rfid: &str,
        user_id: Option<&str>,
        status: BadgeStatus,
    ) -> Result<Badge, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = unix_timestamp();
        let assigned_at = user_id.map(|_| now);

        sqlx::query(
            "INSERT INTO badges (id, uid_rfid, user_id, status, assigned_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(uid_rfid)
        .bind(user_id)
        .bind(status.as_str())
        .bind(assigned_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, Badge>("SELECT * FROM badges WHERE id = ?")
            .bind(&id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Badge {id}")))
    }

    /// Get a badge by its RFID UID.
    pub async fn get_badge_by_uid(&self, uid_rfid: &str) -> Result<Option<Badge>, DatabaseError> {
        let badge = sqlx::query_as::<_, Badge>("SELECT * FROM badges WHERE uid_rfid = ?")
            .bind(uid_rfid)
            .fetch_optional(self.pool())
            .await?;

        Ok(badge)
    }

    // =========================================================================
    // Device queries
    // =========================================================================

    /// Create a device bound to a zone.
    pub async fn create_device(
        &self,
        name: &str,
        hardware_id: &str,
        zone_id: &str,
        kind: DeviceKind,
        status: DeviceStatus,
    ) -> Result<Device, DatabaseError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO devices (id, name, hardware_id, zone_id, kind, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(hardware_id)
        .bind(zone_id)
        .bind(kind.as_str())
        .bind(status.as_str())
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(&id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {id}")))
    }

    /// Get a device by ID.
    pub async fn get_device(&self, id: &str) -> Result<Option<Device>, DatabaseError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(device)
    }

    /// Get a device by its hardware identifier (MAC/chip id).
    pub async fn get_device_by_hardware_id(
        &self,
        hardware_id: &str,
    ) -> Result<Option<Device>, DatabaseError> {
        let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE hardware_id = ?")
            .bind(hardware_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(device)
    }

    /// First actuator device configured for a zone, if any.
    pub async fn get_actuator_for_zone(
        &self,
        zone_id: &str,
    ) -> Result<Option<Device>, DatabaseError> {
        let device = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices WHERE zone_id = ? AND kind = ? ORDER BY created_at LIMIT 1",
        )
        .bind(zone_id)
        .bind(DeviceKind::Actuator.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(device)
    }

    /// Update a device's persisted status by hardware id and bump
    /// last_seen. Used by the gateway on identify/teardown.
    pub async fn set_device_status(
        &self,
        hardware_id: &str,
        status: DeviceStatus,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE devices SET status = ?, last_seen = ? WHERE hardware_id = ?")
            .bind(status.as_str())
            .bind(unix_timestamp())
            .bind(hardware_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Permission queries
    // =========================================================================

    /// Create a permission binding a role to a zone within a schedule.
    pub async fn create_permission(
        &self,
        role_id: &str,
        zone_id: &str,
        days: &[u8],
        start_time: &str,
        end_time: &str,
        active: bool,
    ) -> Result<Permission, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let days_json = serde_json::to_string(days)
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO permissions (id, role_id, zone_id, days, start_time, end_time, active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(role_id)
        .bind(zone_id)
        .bind(days_json)
        .bind(start_time)
        .bind(end_time)
        .bind(i64::from(active))
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ?")
            .bind(&id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Permission {id}")))
    }

    /// Active permission rows for a role in a zone. Schedule matching
    /// happens in the engine, not in SQL.
    pub async fn permissions_for(
        &self,
        role_id: &str,
        zone_id: &str,
    ) -> Result<Vec<Permission>, DatabaseError> {
        let rows = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE role_id = ? AND zone_id = ? AND active = 1",
        )
        .bind(role_id)
        .bind(zone_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Configuration queries
    // =========================================================================

    /// Read a configuration value. Callers must not cache the result:
    /// operators retune lockout policy without redeploying.
    pub async fn get_config(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let row = sqlx::query_as::<_, Configuration>("SELECT * FROM configurations WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|c| c.value))
    }

    /// Upsert a configuration value.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO configurations (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(())
    }
}
