//! Stripe client configuration

use stripe::Client;

use sitepulse_shared::PlanType;

use crate::error::{BillingError, BillingResult};

/// Configuration for Stripe billing
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Stripe secret API key
    pub secret_key: String,
    /// Price IDs for each paid plan
    pub price_ids: PriceIds,
    /// Base URL for success/cancel redirects
    pub app_base_url: String,
}

/// Stripe price IDs for the paid plans.
/// Plan hierarchy: Free (no price) → Starter → Growth → Pro → Business
#[derive(Debug, Clone)]
pub struct PriceIds {
    pub starter: String,
    pub growth: String,
    pub pro: String,
    pub business: String,
}

impl StripeConfig {
    /// Create config from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Ok(Self {
            secret_key: std::env::var("STRIPE_SECRET_KEY")
                .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY not set".to_string()))?,
            price_ids: PriceIds {
                starter: std::env::var("STRIPE_PRICE_STARTER")
                    .map_err(|_| BillingError::Config("STRIPE_PRICE_STARTER not set".to_string()))?,
                growth: std::env::var("STRIPE_PRICE_GROWTH")
                    .map_err(|_| BillingError::Config("STRIPE_PRICE_GROWTH not set".to_string()))?,
                pro: std::env::var("STRIPE_PRICE_PRO")
                    .map_err(|_| BillingError::Config("STRIPE_PRICE_PRO not set".to_string()))?,
                business: std::env::var("STRIPE_PRICE_BUSINESS").map_err(|_| {
                    BillingError::Config("STRIPE_PRICE_BUSINESS not set".to_string())
                })?,
            },
            app_base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    /// Get the price ID for a plan. Free has no price.
    pub fn price_id_for_plan(&self, plan: PlanType) -> Option<&str> {
        match plan {
            PlanType::Free => None,
            PlanType::Starter => Some(&self.price_ids.starter),
            PlanType::Growth => Some(&self.price_ids.growth),
            PlanType::Pro => Some(&self.price_ids.pro),
            PlanType::Business => Some(&self.price_ids.business),
        }
    }

    /// Map a Stripe price ID back to a plan via the fixed allow-list.
    /// An unrecognized price ID is degraded ("Unknown Plan"), not fatal.
    pub fn plan_for_price_id(&self, price_id: &str) -> Option<PlanType> {
        if price_id == self.price_ids.starter {
            Some(PlanType::Starter)
        } else if price_id == self.price_ids.growth {
            Some(PlanType::Growth)
        } else if price_id == self.price_ids.pro {
            Some(PlanType::Pro)
        } else if price_id == self.price_ids.business {
            Some(PlanType::Business)
        } else {
            None
        }
    }
}

/// Stripe billing client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    /// Create a new Stripe client from config
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::new(&config.secret_key);
        Self { client, config }
    }

    /// Create a new Stripe client from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Create a client against an alternate API base (stripe-mock, tests)
    pub fn from_url(url: &str, config: StripeConfig) -> Self {
        let client = Client::from_url(url, &config.secret_key);
        Self { client, config }
    }

    /// Get the inner Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the config
    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}
