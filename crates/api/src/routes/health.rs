//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Absent when the app runs without PostgreSQL (tests, in-memory mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DependencyHealth>,
    pub store: DependencyHealth,
}

/// Connectivity of one backing service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DependencyHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

impl DependencyHealth {
    fn from_check(connected: bool, started: Instant) -> Self {
        Self {
            connected,
            latency_ms: connected.then(|| started.elapsed().as_millis() as u64),
        }
    }
}

/// Simple status response for liveness and readiness checks.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

async fn check_database(state: &AppState) -> Option<DependencyHealth> {
    let pool = state.pool.as_ref()?;
    let started = Instant::now();
    let connected = persistence::db::ping(pool).await.is_ok();
    Some(DependencyHealth::from_check(connected, started))
}

async fn check_store(state: &AppState) -> DependencyHealth {
    let started = Instant::now();
    let connected = state.store.ping().await.is_ok();
    DependencyHealth::from_check(connected, started)
}

/// Full health check endpoint: database and atomic store connectivity.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = check_database(&state).await;
    let store = check_store(&state).await;
    let healthy = store.connected && database.as_ref().map_or(true, |db| db.connected);

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        store,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness endpoint.
///
/// Ready means the invitation/idempotency store answers, and the database
/// too when one is configured.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let store_ok = check_store(&state).await.connected;
    let db_ok = check_database(&state).await.map_or(true, |db| db.connected);

    if store_ok && db_ok {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
