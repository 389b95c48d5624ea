//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use sitepulse_billing::{CheckoutService, CustomerService, EntitlementService, StripeClient};
use sitepulse_connect::{ConnectionService, GoogleOauthClient};

use crate::config::Config;

/// Application state threaded through every handler.
///
/// Clients are constructed once at startup and handed to the services here;
/// nothing resolves collaborators at call time.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub oauth: GoogleOauthClient,
    pub connections: Arc<ConnectionService>,
    pub entitlements: Arc<EntitlementService>,
    pub customers: Arc<CustomerService>,
    pub checkout: Arc<CheckoutService>,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(
        config: &Config,
        pool: PgPool,
        oauth: GoogleOauthClient,
        stripe: StripeClient,
    ) -> Self {
        Self {
            pool: pool.clone(),
            oauth: oauth.clone(),
            connections: Arc::new(ConnectionService::new(oauth, pool.clone())),
            entitlements: Arc::new(EntitlementService::new(pool.clone())),
            customers: Arc::new(CustomerService::new(stripe.clone(), pool.clone())),
            checkout: Arc::new(CheckoutService::new(stripe, pool)),
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}
