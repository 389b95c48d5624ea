//! Health and readiness probes

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub database: bool,
}

/// Overall health: 200 with a status body when Postgres answers, 503
/// otherwise. Google and Stripe are not probed; their outages degrade
/// individual requests, not the service.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let database = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthStatus {
            service: "sitepulse-api",
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

/// Liveness: the process is up
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness: every route reads the subscriptions or connections tables, so
/// ready means the pool reaches Postgres
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
