//! Access log queries.
//!
//! The access log is append-only: `append_access_log` is the only
//! write path, and nothing updates or deletes rows.

use uuid::Uuid;

use gatehouse_core::unix_timestamp;

use super::db::{AccessDatabase, DatabaseError};
use super::models::{AccessLog, NewAccessLog};

impl AccessDatabase {
    /// Append one access log row and return it with its generated id.
    pub async fn append_access_log(
        &self,
        entry: &NewAccessLog,
    ) -> Result<AccessLog, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let detail = entry.detail.to_string();

        sqlx::query(
            "INSERT INTO access_logs \
             (id, device_id, user_id, badge_id, attempt_type, result, uid_rfid, source_ip, detail, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&entry.device_id)
        .bind(&entry.user_id)
        .bind(&entry.badge_id)
        .bind(entry.attempt_type.as_str())
        .bind(entry.result.as_str())
        .bind(&entry.uid_rfid)
        .bind(&entry.source_ip)
        .bind(detail)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_access_log(&id).await
    }

    /// Get an access log row by ID.
    pub async fn get_access_log(&self, id: &str) -> Result<AccessLog, DatabaseError> {
        sqlx::query_as::<_, AccessLog>("SELECT * FROM access_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("AccessLog {id}")))
    }

    /// Most recent access log rows, newest first.
    pub async fn recent_access_logs(&self, limit: i64) -> Result<Vec<AccessLog>, DatabaseError> {
        let rows = sqlx::query_as::<_, AccessLog>(
            "SELECT * FROM access_logs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Number of access log rows (test/ops helper).
    pub async fn access_log_count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM access_logs")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }
}
