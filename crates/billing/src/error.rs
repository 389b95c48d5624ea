//! Billing error types

use thiserror::Error;
use time::OffsetDateTime;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Stripe API error: {0}")]
    StripeApi(String),

    /// Free trial has ended. Carries the exact end timestamp for the
    /// user-facing message.
    #[error("Free trial ended at {trial_ended_at}")]
    TrialExpired { trial_ended_at: OffsetDateTime },

    /// Active property count has reached the plan's quota
    #[error("Property limit reached: {current} of {limit} for this plan")]
    PropertyLimitReached {
        current: u32,
        limit: u32,
        upgrade_required: bool,
    },

    /// A persisted plan string has no PlanType mapping. Configuration fault
    /// for operators, not a per-request user failure.
    #[error("Unknown plan type in subscription record: {0}")]
    InvalidPlan(String),

    /// Checkout session belongs to a different user. Deliberately detail-free:
    /// surfaces as a generic forbidden response.
    #[error("Checkout session does not belong to this user")]
    SessionOwnershipMismatch,

    #[error("Checkout session has no subscription attached: {0}")]
    NoSubscriptionAttached(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        BillingError::StripeApi(err.to_string())
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Database(err.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
