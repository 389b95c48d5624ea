//! Billing routes

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use sitepulse_billing::{BillingSummary, CheckoutResponse, PropertyUsage};
use sitepulse_shared::{PlanType, SubscriptionRecord};

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub plan: PlanType,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSuccessQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: SubscriptionRecord,
    pub usage: Option<PropertyUsage>,
}

/// Start a checkout for a paid plan.
/// POST /api/v1/billing/checkout
///
/// Deliberately not trial-gated: a user whose trial has expired must still
/// be able to upgrade.
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<CreateCheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let customer_id = state
        .customers
        .get_or_create_customer(auth_user.user_id, &auth_user.email)
        .await?;

    let session = state
        .checkout
        .create_subscription_checkout(auth_user.user_id, &customer_id, request.plan)
        .await?;

    Ok(Json(session.into()))
}

/// Confirm a completed checkout and mirror the subscription locally.
/// GET /api/v1/billing/success?session_id=...
pub async fn checkout_success(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<CheckoutSuccessQuery>,
) -> ApiResult<Json<BillingSummary>> {
    let summary = state
        .checkout
        .sync_from_checkout_session(&query.session_id, auth_user.user_id)
        .await?;

    Ok(Json(summary))
}

/// Current subscription and property usage.
/// GET /api/v1/billing/subscription
pub async fn subscription(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = state.entitlements.check_trial(auth_user.user_id).await?;

    // At-limit is not an error for a status read; surface it as usage: null
    let usage = state
        .entitlements
        .check_property_limit(auth_user.user_id, &subscription)
        .await
        .ok();

    Ok(Json(SubscriptionResponse {
        subscription,
        usage,
    }))
}
