//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Database
    pub database_url: String,

    // Authentication
    pub jwt_secret: String,

    // Google OAuth
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,

    // Stripe
    pub stripe_secret_key: String,
    pub stripe_price_starter: String,
    pub stripe_price_growth: String,
    pub stripe_price_pro: String,
    pub stripe_price_business: String,
    pub app_base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),

            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,

            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .map_err(|_| ConfigError::Missing("GOOGLE_REDIRECT_URI"))?,

            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .map_err(|_| ConfigError::Missing("STRIPE_SECRET_KEY"))?,
            stripe_price_starter: env::var("STRIPE_PRICE_STARTER")
                .map_err(|_| ConfigError::Missing("STRIPE_PRICE_STARTER"))?,
            stripe_price_growth: env::var("STRIPE_PRICE_GROWTH")
                .map_err(|_| ConfigError::Missing("STRIPE_PRICE_GROWTH"))?,
            stripe_price_pro: env::var("STRIPE_PRICE_PRO")
                .map_err(|_| ConfigError::Missing("STRIPE_PRICE_PRO"))?,
            stripe_price_business: env::var("STRIPE_PRICE_BUSINESS")
                .map_err(|_| ConfigError::Missing("STRIPE_PRICE_BUSINESS"))?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}
