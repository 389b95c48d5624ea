//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use sitepulse_billing::BillingError;
use sitepulse_connect::ConnectError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Resource not found")]
    NotFound,

    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                self.to_string(),
                None,
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string(), None),

            ApiError::Connect(err) => match err {
                ConnectError::AuthorizationFailed(_) | ConnectError::ExchangeFailed(_) => (
                    StatusCode::BAD_REQUEST,
                    "AUTHORIZATION_FAILED",
                    err.to_string(),
                    None,
                ),
                ConnectError::RefreshFailed(_) => (
                    StatusCode::BAD_REQUEST,
                    "REAUTHORIZATION_REQUIRED",
                    "Google access expired, please reconnect the property".to_string(),
                    None,
                ),
                ConnectError::NoResourcesFound => (
                    StatusCode::BAD_REQUEST,
                    "NO_ANALYTICS_ACCOUNTS",
                    err.to_string(),
                    None,
                ),
                ConnectError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Connection not found".to_string(),
                    None,
                ),
                ConnectError::Http(msg) => {
                    tracing::error!(error = %msg, "Google API failure");
                    (
                        StatusCode::BAD_GATEWAY,
                        "UPSTREAM_ERROR",
                        "Google API unavailable".to_string(),
                        None,
                    )
                }
                ConnectError::Database(msg) => {
                    tracing::error!(error = %msg, "Database failure in connect flow");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        "Database error".to_string(),
                        None,
                    )
                }
            },

            ApiError::Billing(err) => match err {
                BillingError::TrialExpired { trial_ended_at } => (
                    StatusCode::PAYMENT_REQUIRED,
                    "TRIAL_EXPIRED",
                    "Your free trial has ended".to_string(),
                    Some(json!({ "trial_ended_at": trial_ended_at.to_string() })),
                ),
                BillingError::PropertyLimitReached {
                    current,
                    limit,
                    upgrade_required,
                } => (
                    StatusCode::PAYMENT_REQUIRED,
                    "PROPERTY_LIMIT_REACHED",
                    err.to_string(),
                    Some(json!({
                        "current": current,
                        "limit": limit,
                        "upgrade_required": upgrade_required,
                    })),
                ),
                // Configuration fault: page operators, tell the user nothing useful
                BillingError::InvalidPlan(plan) => {
                    tracing::error!(plan = %plan, "Unmapped plan type reached a request path");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Internal server error".to_string(),
                        None,
                    )
                }
                // Generic 403: do not confirm the session exists or name its owner
                BillingError::SessionOwnershipMismatch => (
                    StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Insufficient permissions".to_string(),
                    None,
                ),
                BillingError::NoSubscriptionAttached(_) => (
                    StatusCode::BAD_REQUEST,
                    "NO_SUBSCRIPTION",
                    "Checkout session has no subscription attached".to_string(),
                    None,
                ),
                BillingError::NotFound(msg) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None)
                }
                BillingError::StripeApi(msg) => {
                    tracing::error!(error = %msg, "Stripe API failure");
                    (
                        StatusCode::BAD_GATEWAY,
                        "UPSTREAM_ERROR",
                        "Billing provider unavailable".to_string(),
                        None,
                    )
                }
                BillingError::Database(msg) | BillingError::Config(msg) => {
                    tracing::error!(error = %msg, "Billing internal failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Internal server error".to_string(),
                        None,
                    )
                }
            },

            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error".to_string(),
                None,
            ),
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let (Some(details), Some(obj)) = (details, error.as_object_mut()) {
            obj.insert("details".to_string(), details);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            _ => ApiError::Database(err.to_string()),
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
