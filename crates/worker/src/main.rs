//! Sitepulse background worker
//!
//! Runs the periodic jobs the request path must not block on. Currently a
//! single job: pre-emptive refresh of Google access tokens nearing expiry,
//! so dashboard reads never hit Google with a dead token.

mod token_refresh;

use tracing_subscriber::EnvFilter;

use sitepulse_connect::{ConnectionService, GoogleOauthClient, GoogleOauthConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = sitepulse_shared::create_pool(&database_url).await?;

    let oauth = GoogleOauthClient::new(reqwest::Client::new(), GoogleOauthConfig::from_env()?);
    let connections = ConnectionService::new(oauth, pool);

    tracing::info!("Sitepulse worker started");
    token_refresh::run(&connections).await;

    Ok(())
}
