//! Stripe Checkout sessions and the subscription mirror

use serde::Serialize;
use sqlx::PgPool;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CustomerId, Expandable, Subscription,
};
use time::OffsetDateTime;
use uuid::Uuid;

use sitepulse_shared::PlanType;

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Checkout service: creates Stripe checkout sessions and reconciles the
/// local subscription mirror from completed sessions.
///
/// The status field is owned entirely by Stripe. This service only copies
/// the remote value; it never transitions status locally.
pub struct CheckoutService {
    stripe: StripeClient,
    pool: PgPool,
}

/// Billing details shown to the user after a completed checkout
#[derive(Debug, Clone, Serialize)]
pub struct BillingSummary {
    pub plan_name: String,
    /// Total charged, in the currency's minor unit (cents)
    pub amount_total: Option<i64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_end: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_billing_date: Option<OffsetDateTime>,
}

impl CheckoutService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    /// Create a subscription-mode checkout session for a paid plan.
    ///
    /// The user id rides in session metadata; `sync_from_checkout_session`
    /// checks it on the way back so one user cannot redeem another's session.
    pub async fn create_subscription_checkout(
        &self,
        user_id: Uuid,
        customer_id: &str,
        plan: PlanType,
    ) -> BillingResult<CheckoutSession> {
        let price_id = self
            .stripe
            .config()
            .price_id_for_plan(plan)
            .ok_or_else(|| BillingError::InvalidPlan(format!("{} has no Stripe price", plan)))?
            .to_string();

        let customer_id = customer_id
            .parse::<CustomerId>()
            .map_err(|e| BillingError::StripeApi(format!("Invalid customer ID: {}", e)))?;

        let base_url = &self.stripe.config().app_base_url;
        let success_url = format!(
            "{}/billing/success?session_id={{CHECKOUT_SESSION_ID}}",
            base_url
        );
        let cancel_url = format!("{}/billing/cancel", base_url);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());
        metadata.insert("plan".to_string(), plan.to_string());

        let params = CreateCheckoutSession {
            customer: Some(customer_id),
            mode: Some(CheckoutSessionMode::Subscription),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(price_id),
                quantity: Some(1),
                ..Default::default()
            }]),
            success_url: Some(&success_url),
            cancel_url: Some(&cancel_url),
            metadata: Some(metadata),
            allow_promotion_codes: Some(true),
            ..Default::default()
        };

        let session = CheckoutSession::create(self.stripe.inner(), params).await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %session.id,
            plan = %plan,
            "Created checkout session"
        );

        Ok(session)
    }

    /// Reconcile the local subscription mirror from a completed checkout
    /// session and return the billing summary for the confirmation page.
    ///
    /// The mirror write is deliberately non-fatal: payment confirmation must
    /// not depend on the local write succeeding. A failed write is logged and
    /// the state self-heals on the next sync.
    pub async fn sync_from_checkout_session(
        &self,
        session_id: &str,
        expected_user_id: Uuid,
    ) -> BillingResult<BillingSummary> {
        let parsed_id = session_id
            .parse::<stripe::CheckoutSessionId>()
            .map_err(|e| BillingError::StripeApi(format!("Invalid session ID: {}", e)))?;

        let session =
            CheckoutSession::retrieve(self.stripe.inner(), &parsed_id, &["subscription"]).await?;

        // Ownership check before anything is read or written locally.
        // Detail-free failure so a harvested session id leaks nothing.
        if let Err(e) = verify_session_owner(session.metadata.as_ref(), expected_user_id) {
            tracing::warn!(
                session_id = %session.id,
                expected_user_id = %expected_user_id,
                "Checkout session ownership mismatch"
            );
            return Err(e);
        }

        let subscription = match &session.subscription {
            Some(Expandable::Object(subscription)) => subscription.as_ref(),
            Some(Expandable::Id(_)) => {
                return Err(BillingError::StripeApi(
                    "Checkout session subscription was not expanded".to_string(),
                ))
            }
            None => {
                return Err(BillingError::NoSubscriptionAttached(
                    session.id.to_string(),
                ))
            }
        };

        let price_id = subscription
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.to_string());

        // Allow-listed price → plan mapping. Unknown prices complete the
        // sync with a degraded display name rather than failing the user.
        let plan = price_id
            .as_deref()
            .and_then(|id| self.stripe.config().plan_for_price_id(id));
        let plan_name = match plan {
            Some(plan) => plan.display_name().to_string(),
            None => {
                tracing::warn!(
                    session_id = %session.id,
                    price_id = ?price_id,
                    "Checkout price ID not in plan allow-list"
                );
                "Unknown Plan".to_string()
            }
        };

        let trial_end = subscription
            .trial_end
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok());
        let next_billing_date =
            OffsetDateTime::from_unix_timestamp(subscription.current_period_end).ok();

        if let Err(e) = self
            .write_mirror(expected_user_id, &session, subscription, plan, trial_end)
            .await
        {
            tracing::error!(
                user_id = %expected_user_id,
                session_id = %session.id,
                error = %e,
                "Failed to mirror subscription state locally, will self-heal on next sync"
            );
        }

        Ok(BillingSummary {
            plan_name,
            amount_total: session.amount_total,
            trial_end,
            next_billing_date,
        })
    }

    /// Upsert the local mirror with Stripe's authoritative values.
    /// An unrecognized plan leaves plan_type unchanged.
    async fn write_mirror(
        &self,
        user_id: Uuid,
        session: &CheckoutSession,
        subscription: &Subscription,
        plan: Option<PlanType>,
        trial_end: Option<OffsetDateTime>,
    ) -> BillingResult<()> {
        let customer_id = session.customer.as_ref().map(|customer| match customer {
            Expandable::Id(id) => id.to_string(),
            Expandable::Object(obj) => obj.id.to_string(),
        });

        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (user_id, plan_type, status, stripe_customer_id, stripe_subscription_id,
                 trial_end_date)
            VALUES ($1, COALESCE($2, 'free'), $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                plan_type = COALESCE($2, subscriptions.plan_type),
                status = EXCLUDED.status,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                trial_end_date = EXCLUDED.trial_end_date,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(plan)
        .bind(subscription.status.to_string())
        .bind(customer_id)
        .bind(subscription.id.as_str())
        .bind(trial_end)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %subscription.id,
            status = %subscription.status,
            plan = ?plan,
            "Mirrored subscription state from checkout session"
        );

        Ok(())
    }
}

/// The session's metadata must carry the expected user id; a missing or
/// unparsable value fails the same way as a mismatch.
fn verify_session_owner(
    metadata: Option<&std::collections::HashMap<String, String>>,
    expected_user_id: Uuid,
) -> BillingResult<()> {
    let owner = metadata
        .and_then(|m| m.get("user_id"))
        .and_then(|v| v.parse::<Uuid>().ok());
    if owner != Some(expected_user_id) {
        return Err(BillingError::SessionOwnershipMismatch);
    }
    Ok(())
}

/// Response for creating a checkout session
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            session_id: session.id.to_string(),
            url: session.url,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::collections::HashMap;

    fn metadata_with_user(user_id: Uuid) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());
        metadata.insert("plan".to_string(), "growth".to_string());
        metadata
    }

    #[test]
    fn matching_session_owner_passes() {
        let user_id = Uuid::new_v4();
        let metadata = metadata_with_user(user_id);
        assert!(verify_session_owner(Some(&metadata), user_id).is_ok());
    }

    #[test]
    fn foreign_session_owner_is_rejected() {
        let metadata = metadata_with_user(Uuid::new_v4());
        let err = verify_session_owner(Some(&metadata), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BillingError::SessionOwnershipMismatch));
    }

    #[test]
    fn session_without_metadata_is_rejected() {
        let err = verify_session_owner(None, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BillingError::SessionOwnershipMismatch));
    }

    #[test]
    fn unparsable_owner_is_rejected() {
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), "not-a-uuid".to_string());
        let err = verify_session_owner(Some(&metadata), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BillingError::SessionOwnershipMismatch));
    }
}
