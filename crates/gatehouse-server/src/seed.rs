//! Demo data for local development.

use anyhow::Context;
use tracing::info;

use gatehouse_core::{BadgeStatus, DeviceKind, DeviceStatus, UserStatus};

use crate::auth::password;
use crate::engine::{CONFIG_LOCK_DURATION_MINUTES, CONFIG_MAX_ATTEMPTS};
use crate::storage::{AccessDatabase, NewUser};

/// Insert one zone with a reader and an actuator, a staff role with an
/// office-hours permission, a user holding a badge, and the lockout
/// policy. Skipped when any zone already exists so reruns stay
/// idempotent.
pub async fn seed_demo(db: &AccessDatabase) -> anyhow::Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zones")
        .fetch_one(db.pool())
        .await
        .context("counting zones")?;
    if existing > 0 {
        info!("Database already has data; skipping demo seed");
        return Ok(());
    }

    let zone = db.create_zone("Main Office", "ground floor office").await?;
    let role = db.create_role("employee", 2).await?;

    // Monday through Friday, 07:00-19:00.
    db.create_permission(&role.id, &zone.id, &[1, 2, 3, 4, 5], "07:00", "19:00", true)
        .await?;

    let user = db
        .create_user(&NewUser {
            name: "Demo User".to_string(),
            email: "demo@gatehouse.local".to_string(),
            role_id: role.id.clone(),
            status: UserStatus::Active,
            pin_hash: Some(password::hash_password("1234").context("hashing demo PIN")?),
            password_hash: password::hash_password("demo-password")
                .context("hashing demo password")?,
        })
        .await?;

    db.create_badge("04:D3:M0:BA:DG:E1", Some(&user.id), BadgeStatus::Active)
        .await?;

    let reader = db
        .create_device(
            "office reader",
            "DE:MO:RE:AD:ER:01",
            &zone.id,
            DeviceKind::Reader,
            DeviceStatus::Online,
        )
        .await?;
    let actuator = db
        .create_device(
            "office door",
            "DE:MO:DO:OR:01:AA",
            &zone.id,
            DeviceKind::Actuator,
            DeviceStatus::Offline,
        )
        .await?;

    db.set_config(CONFIG_MAX_ATTEMPTS, "3").await?;
    db.set_config(CONFIG_LOCK_DURATION_MINUTES, "15").await?;

    info!(
        zone = %zone.name,
        reader_id = %reader.id,
        actuator_hw = %actuator.hardware_id,
        "Demo data seeded (badge 04:D3:M0:BA:DG:E1, PIN 1234)"
    );

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_is_idempotent() {
        let db = AccessDatabase::open_in_memory().await.unwrap();

        seed_demo(&db).await.unwrap();
        seed_demo(&db).await.unwrap();

        let zones: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zones")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(zones, 1);

        let devices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM devices")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(devices, 2);
    }
}
