//! Route table and request handlers.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use gatehouse_core::AccessResult;

use crate::engine::AccessAttempt;
use crate::gateway::device_socket;

use super::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/access-attempts", post(access_attempt))
        .route("/health", get(health))
        .route("/devices/ws", get(device_socket))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `POST /access-attempts` — evaluate one attempt.
///
/// A body that does not deserialize is rejected with 400 before the
/// pipeline runs and is never logged. Everything past deserialization
/// goes through the engine and gets exactly one log row.
async fn access_attempt(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<AccessAttempt>, JsonRejection>,
) -> Response {
    let attempt = match payload {
        Ok(Json(attempt)) => attempt,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected malformed access attempt body");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let verdict = state
        .engine
        .evaluate(&attempt, Some(addr.ip().to_string()))
        .await;

    let status = match verdict.result {
        AccessResult::Success => StatusCode::OK,
        AccessResult::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNAUTHORIZED,
    };

    (status, Json(verdict)).into_response()
}

async fn health() -> &'static str {
    "ok"
}
