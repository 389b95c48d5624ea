//! Sitepulse API server

use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use sitepulse_api::{routes, AppState, Config};
use sitepulse_billing::{PriceIds, StripeClient, StripeConfig};
use sitepulse_connect::{GoogleOauthClient, GoogleOauthConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = Config::from_env()?;

    let pool = sitepulse_shared::create_pool(&config.database_url).await?;
    sitepulse_shared::run_migrations(&pool).await?;

    // Process-lifetime clients, built once and threaded through constructors
    let oauth = GoogleOauthClient::new(
        reqwest::Client::new(),
        GoogleOauthConfig::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            config.google_redirect_uri.clone(),
        ),
    );
    let stripe = StripeClient::new(StripeConfig {
        secret_key: config.stripe_secret_key.clone(),
        price_ids: PriceIds {
            starter: config.stripe_price_starter.clone(),
            growth: config.stripe_price_growth.clone(),
            pro: config.stripe_price_pro.clone(),
            business: config.stripe_price_business.clone(),
        },
        app_base_url: config.app_base_url.clone(),
    });

    let state = AppState::new(&config, pool, oauth, stripe);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "Sitepulse API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
