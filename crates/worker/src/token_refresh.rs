//! Pre-emptive token refresh job
//!
//! Every cycle, refreshes active connections whose access tokens expire
//! within the lookahead window. Connections whose refresh tokens have been
//! revoked are deactivated by the connection service and need the user to
//! re-authorize; this job never retries them.

use std::time::Duration;

use sitepulse_connect::ConnectionService;

/// How often the refresh cycle runs
const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Refresh tokens expiring within this window
const EXPIRY_LOOKAHEAD_MINUTES: i64 = 30;

pub async fn run(connections: &ConnectionService) {
    let mut ticker = tokio::time::interval(REFRESH_INTERVAL);

    loop {
        ticker.tick().await;

        match connections
            .refresh_expiring(time::Duration::minutes(EXPIRY_LOOKAHEAD_MINUTES))
            .await
        {
            Ok(0) => {}
            Ok(refreshed) => {
                tracing::info!(refreshed, "Refreshed expiring Google tokens");
            }
            Err(e) => {
                // Next cycle retries; a flapping database shouldn't kill the worker
                tracing::error!(error = %e, "Token refresh cycle failed");
            }
        }
    }
}
