//! Tests for gatehouse storage queries.

#![allow(clippy::unwrap_used)]

use gatehouse_core::{
    unix_timestamp, AccessResult, AttemptType, BadgeStatus, DeviceKind, DeviceStatus, UserStatus,
};

use super::models::{NewAccessLog, NewUser};
use super::AccessDatabase;

async fn db_with_role() -> (AccessDatabase, String, String) {
    let db = AccessDatabase::open_in_memory().await.unwrap();
    let zone = db.create_zone("Lab", "ground floor lab").await.unwrap();
    let role = db.create_role("staff", 2).await.unwrap();
    (db, zone.id, role.id)
}

fn new_user(role_id: &str) -> NewUser {
    NewUser {
        name: "Alice".into(),
        email: "alice@example.com".into(),
        role_id: role_id.into(),
        status: UserStatus::Active,
        pin_hash: Some("$argon2id$fake".into()),
        password_hash: "$argon2id$fake".into(),
    }
}

#[tokio::test]
async fn create_and_lookup_entities() {
    let (db, zone_id, role_id) = db_with_role().await;

    let user = db.create_user(&new_user(&role_id)).await.unwrap();
    assert_eq!(user.status(), UserStatus::Active);
    assert_eq!(user.failed_attempts, 0);

    let badge = db
        .create_badge("U-100", Some(&user.id), BadgeStatus::Active)
        .await
        .unwrap();
    assert_eq!(badge.user_id.as_deref(), Some(user.id.as_str()));
    assert!(badge.assigned_at.is_some());

    let found = db.get_badge_by_uid("U-100").await.unwrap().unwrap();
    assert_eq!(found.id, badge.id);
    assert!(db.get_badge_by_uid("U-404").await.unwrap().is_none());

    let reader = db
        .create_device("door reader", "AA:BB:01", &zone_id, DeviceKind::Reader, DeviceStatus::Online)
        .await
        .unwrap();
    assert_eq!(reader.status(), DeviceStatus::Online);
    assert!(!reader.is_actuator());

    let by_hw = db
        .get_device_by_hardware_id("AA:BB:01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_hw.id, reader.id);
}

#[tokio::test]
async fn actuator_for_zone_picks_actuators_only() {
    let (db, zone_id, _role_id) = db_with_role().await;

    db.create_device("reader", "R1", &zone_id, DeviceKind::Reader, DeviceStatus::Online)
        .await
        .unwrap();
    assert!(db.get_actuator_for_zone(&zone_id).await.unwrap().is_none());

    let lock = db
        .create_device("door lock", "A1", &zone_id, DeviceKind::Actuator, DeviceStatus::Online)
        .await
        .unwrap();
    let found = db.get_actuator_for_zone(&zone_id).await.unwrap().unwrap();
    assert_eq!(found.id, lock.id);
}

#[tokio::test]
async fn failed_attempt_counter_lifecycle() {
    let (db, _zone_id, role_id) = db_with_role().await;
    let user = db.create_user(&new_user(&role_id)).await.unwrap();

    assert_eq!(db.increment_failed_attempts(&user.id).await.unwrap(), 1);
    assert_eq!(db.increment_failed_attempts(&user.id).await.unwrap(), 2);

    let until = unix_timestamp() + 900;
    db.lock_user(&user.id, until).await.unwrap();

    let locked = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(locked.locked_until, Some(until));
    assert!(locked.is_locked_at(unix_timestamp()));

    db.reset_failed_attempts(&user.id).await.unwrap();
    let reset = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(reset.failed_attempts, 0);
    assert_eq!(reset.locked_until, None);
}

#[tokio::test]
async fn increment_unknown_user_is_not_found() {
    let (db, _zone_id, _role_id) = db_with_role().await;
    assert!(db.increment_failed_attempts("nope").await.is_err());
}

#[tokio::test]
async fn device_status_update_by_hardware_id() {
    let (db, zone_id, _role_id) = db_with_role().await;
    db.create_device("lock", "A1", &zone_id, DeviceKind::Actuator, DeviceStatus::Offline)
        .await
        .unwrap();

    assert!(db.set_device_status("A1", DeviceStatus::Online).await.unwrap());
    let device = db.get_device_by_hardware_id("A1").await.unwrap().unwrap();
    assert_eq!(device.status(), DeviceStatus::Online);
    assert!(device.last_seen.is_some());

    assert!(!db.set_device_status("missing", DeviceStatus::Online).await.unwrap());
}

#[tokio::test]
async fn permissions_for_filters_inactive_rows() {
    let (db, zone_id, role_id) = db_with_role().await;

    db.create_permission(&role_id, &zone_id, &[1, 2, 3], "08:00", "18:00", true)
        .await
        .unwrap();
    db.create_permission(&role_id, &zone_id, &[0, 6], "00:00", "23:59", false)
        .await
        .unwrap();

    let rows = db.permissions_for(&role_id, &zone_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].schedule().is_some());
}

#[tokio::test]
async fn config_roundtrip_and_overwrite() {
    let (db, _zone_id, _role_id) = db_with_role().await;

    assert!(db.get_config("max_attempts").await.unwrap().is_none());

    db.set_config("max_attempts", "3").await.unwrap();
    assert_eq!(db.get_config("max_attempts").await.unwrap().as_deref(), Some("3"));

    db.set_config("max_attempts", "5").await.unwrap();
    assert_eq!(db.get_config("max_attempts").await.unwrap().as_deref(), Some("5"));
}

#[tokio::test]
async fn access_log_append_and_read_back() {
    let (db, _zone_id, _role_id) = db_with_role().await;

    let entry = NewAccessLog {
        device_id: "device-1".into(),
        user_id: None,
        badge_id: None,
        attempt_type: AttemptType::BadgePin,
        result: AccessResult::UnknownBadge,
        uid_rfid: Some("U-404".into()),
        source_ip: Some("10.0.0.9".into()),
        detail: serde_json::json!({"reason": "unknown badge"}),
    };

    let log = db.append_access_log(&entry).await.unwrap();
    assert_eq!(log.result, "unknown-badge");
    assert_eq!(AccessResult::from_stored(&log.result), AccessResult::UnknownBadge);
    assert_eq!(log.attempt_type, "badge_pin");

    let recent = db.recent_access_logs(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, log.id);
    assert_eq!(db.access_log_count().await.unwrap(), 1);
}
