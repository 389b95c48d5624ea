//! API routes

pub mod billing;
pub mod connections;
pub mod health;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{auth::require_auth, state::AppState};

/// Build the application router
pub fn router(state: AppState) -> Router {
    let authed = Router::new()
        .route("/api/v1/connect/url", get(connections::authorization_url))
        .route("/api/v1/connect/callback", post(connections::oauth_callback))
        .route("/api/v1/connections", get(connections::list_connections))
        .route(
            "/api/v1/connections/:id",
            delete(connections::disconnect),
        )
        .route("/api/v1/billing/checkout", post(billing::create_checkout))
        .route("/api/v1/billing/success", get(billing::checkout_success))
        .route("/api/v1/billing/subscription", get(billing::subscription))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(authed)
        .with_state(state)
}
