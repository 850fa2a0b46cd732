#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::util::ServiceExt;

use gatehouse_core::{BadgeStatus, DeviceKind, DeviceStatus, UserStatus};

use crate::auth::password;
use crate::engine::AccessEngine;
use crate::registry::{CommandDispatcher, DeviceRegistry};
use crate::storage::{AccessDatabase, NewUser};

use super::{router, AppState};

const PIN: &str = "2468";
const UID: &str = "04:11:22:33";

async fn app() -> (Router, AppState) {
    let db = AccessDatabase::open_in_memory().await.unwrap();
    let registry = Arc::new(DeviceRegistry::new());
    let dispatcher = CommandDispatcher::new(Arc::clone(&registry), Duration::from_millis(100));
    let engine = Arc::new(AccessEngine::new(db.clone(), dispatcher));
    let state = AppState {
        db,
        registry,
        engine,
    };
    (router(state.clone()), state)
}

/// Reader, actuator, user, badge, and an always-on permission; returns
/// the reader's device id.
async fn seed_world(state: &AppState) -> String {
    let zone = state.db.create_zone("Lobby", "front lobby").await.unwrap();
    let role = state.db.create_role("staff", 2).await.unwrap();
    state
        .db
        .create_permission(&role.id, &zone.id, &[0, 1, 2, 3, 4, 5, 6], "00:00", "23:59", true)
        .await
        .unwrap();

    let user = state
        .db
        .create_user(&NewUser {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            role_id: role.id.clone(),
            status: UserStatus::Active,
            pin_hash: Some(password::hash_password(PIN).unwrap()),
            password_hash: password::hash_password("hunter2").unwrap(),
        })
        .await
        .unwrap();
    state
        .db
        .create_badge(UID, Some(&user.id), BadgeStatus::Active)
        .await
        .unwrap();

    let reader = state
        .db
        .create_device("lobby reader", "R-01", &zone.id, DeviceKind::Reader, DeviceStatus::Online)
        .await
        .unwrap();
    state
        .db
        .create_device("lobby door", "A-01", &zone.id, DeviceKind::Actuator, DeviceStatus::Online)
        .await
        .unwrap();

    reader.id
}

async fn connect_actuator(state: &AppState) -> tokio::sync::mpsc::Receiver<crate::registry::Outbound> {
    let (tx, rx) = tokio::sync::mpsc::channel(16);
    let conn = state.registry.register_presence("A-01", tx).await;
    state
        .registry
        .complete_identification("A-01", conn.connection_id)
        .await;
    rx
}

/// Stand-in for what `into_make_service_with_connect_info` provides in
/// production.
fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([10, 0, 0, 9], 40000)))
}

fn post_attempt(body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/access-attempts")
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer())
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (app, _state) = app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn granted_attempt_returns_200_with_verdict() {
    let (app, state) = app().await;
    let reader_id = seed_world(&state).await;
    let _actuator = connect_actuator(&state).await;

    let response = app
        .oneshot(post_attempt(&serde_json::json!({
            "deviceId": reader_id,
            "uidRfid": UID,
            "pin": PIN,
            "attemptType": "badge_pin",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["granted"], serde_json::json!(true));
    assert_eq!(body["result"], serde_json::json!("success"));
    assert!(!body["logId"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn denied_attempt_returns_401_mirroring_the_log_row() {
    let (app, state) = app().await;
    let reader_id = seed_world(&state).await;

    let response = app
        .oneshot(post_attempt(&serde_json::json!({
            "deviceId": reader_id,
            "uidRfid": UID,
            "pin": "0000",
            "attemptType": "badge_pin",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["granted"], serde_json::json!(false));
    assert_eq!(body["result"], serde_json::json!("wrong-pin"));

    let log_id = body["logId"].as_str().unwrap();
    let log = state.db.get_access_log(log_id).await.unwrap();
    assert_eq!(log.result, "wrong-pin");
    assert_eq!(log.source_ip.as_deref(), Some("10.0.0.9"));
}

#[tokio::test]
async fn unknown_device_returns_401() {
    let (app, state) = app().await;
    seed_world(&state).await;

    let response = app
        .oneshot(post_attempt(&serde_json::json!({
            "deviceId": "no-such-device",
            "uidRfid": UID,
            "pin": PIN,
            "attemptType": "badge_pin",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["result"], serde_json::json!("unknown-device"));
}

#[tokio::test]
async fn malformed_body_returns_400_and_logs_nothing() {
    let (app, state) = app().await;
    seed_world(&state).await;

    // Missing the required deviceId field.
    let response = app
        .oneshot(post_attempt(&serde_json::json!({
            "uidRfid": UID,
            "attemptType": "badge_pin",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.db.access_log_count().await.unwrap(), 0);
}

#[tokio::test]
async fn non_json_body_returns_400() {
    let (app, state) = app().await;
    seed_world(&state).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/access-attempts")
                .header(header::CONTENT_TYPE, "application/json")
                .extension(peer())
                .body(Body::from("not json at all"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.db.access_log_count().await.unwrap(), 0);
}
