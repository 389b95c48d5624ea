//! Stripe customer management

use sqlx::PgPool;
use stripe::{CreateCustomer, Customer, CustomerId};
use uuid::Uuid;

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Customer service for managing Stripe customers.
///
/// The Stripe customer ID cached on the users row must resolve to a live
/// remote customer; staleness (deleted in the Stripe dashboard, swapped test
/// keys) is detected lazily here and self-heals by clearing the cached ID and
/// creating a fresh customer.
pub struct CustomerService {
    stripe: StripeClient,
    pool: PgPool,
}

impl CustomerService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    /// Get the user's Stripe customer ID, creating the customer if needed.
    ///
    /// Always yields a valid, non-deleted customer. Not idempotent in call
    /// count: a stale cached ID costs one extra remote round trip, which is
    /// acceptable at checkout-initiation frequency.
    pub async fn get_or_create_customer(&self, user_id: Uuid, email: &str) -> BillingResult<String> {
        let cached: Option<(Option<String>,)> =
            sqlx::query_as("SELECT stripe_customer_id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let cached_id = match cached {
            Some((id,)) => id,
            None => return Err(BillingError::NotFound(format!("User {} not found", user_id))),
        };

        if let Some(customer_id) = cached_id {
            match self.retrieve_live_customer(&customer_id).await {
                Ok(true) => return Ok(customer_id),
                Ok(false) => {
                    tracing::warn!(
                        user_id = %user_id,
                        customer_id = %customer_id,
                        "Cached Stripe customer was deleted remotely, recreating"
                    );
                    self.clear_cached_customer(user_id).await?;
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        customer_id = %customer_id,
                        error = %e,
                        "Cached Stripe customer could not be retrieved, recreating"
                    );
                    self.clear_cached_customer(user_id).await?;
                }
            }
        }

        let customer = self.create_customer(user_id, email).await?;
        Ok(customer.id.to_string())
    }

    /// Retrieve the remote customer; Ok(false) when Stripe reports it deleted
    async fn retrieve_live_customer(&self, customer_id: &str) -> BillingResult<bool> {
        let customer_id = customer_id
            .parse::<CustomerId>()
            .map_err(|e| BillingError::StripeApi(format!("Invalid customer ID: {}", e)))?;

        let customer = Customer::retrieve(self.stripe.inner(), &customer_id, &[]).await?;
        Ok(!customer.deleted)
    }

    async fn clear_cached_customer(&self, user_id: Uuid) -> BillingResult<()> {
        sqlx::query("UPDATE users SET stripe_customer_id = NULL WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Create a new Stripe customer and persist its ID on the user
    async fn create_customer(&self, user_id: Uuid, email: &str) -> BillingResult<Customer> {
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());
        metadata.insert("platform".to_string(), "sitepulse".to_string());

        let params = CreateCustomer {
            email: Some(email),
            metadata: Some(metadata),
            ..Default::default()
        };

        let customer = Customer::create(self.stripe.inner(), params).await?;

        sqlx::query("UPDATE users SET stripe_customer_id = $1 WHERE id = $2")
            .bind(customer.id.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            user_id = %user_id,
            customer_id = %customer.id,
            "Created Stripe customer"
        );

        Ok(customer)
    }
}
