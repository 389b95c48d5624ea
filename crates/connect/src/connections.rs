//! GA4 connection lifecycle

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use sitepulse_shared::ExternalConnection;

use crate::client::{GaAccount, GoogleOauthClient, TokenResponse};
use crate::error::{ConnectError, ConnectResult};

/// Connection service owning the external_connections table.
///
/// Orchestrates the OAuth flow end to end (exchange → discovery → persist)
/// and the refresh lifecycle. All writes go through the
/// (user_id, ga_account_id) upsert key, so retries never duplicate rows.
pub struct ConnectionService {
    oauth: GoogleOauthClient,
    pool: PgPool,
}

impl ConnectionService {
    pub fn new(oauth: GoogleOauthClient, pool: PgPool) -> Self {
        Self { oauth, pool }
    }

    /// Complete the OAuth callback: exchange the code, discover properties,
    /// and persist a connection to the first discovered property.
    ///
    /// Nothing is persisted until the upsert at the end — a failed exchange
    /// or empty discovery leaves no partial state behind.
    pub async fn complete_authorization(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> ConnectResult<ExternalConnection> {
        // Any exchange failure reads as a failed authorization, transport
        // faults included; the user restarts the flow either way.
        let tokens = self.oauth.exchange_code(code).await.map_err(|e| match e {
            ConnectError::ExchangeFailed(msg) | ConnectError::Http(msg) => {
                ConnectError::AuthorizationFailed(msg)
            }
            other => other,
        })?;

        // A transient discovery failure degrades to "zero accounts" rather
        // than stranding the user mid-flow. Logged loudly: this can mask a
        // genuine Google outage.
        let accounts = match self
            .oauth
            .list_accessible_accounts(&tokens.access_token)
            .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "GA account discovery failed during authorization, treating as zero accounts"
                );
                Vec::new()
            }
        };

        // No disambiguation UI: the first property in Google's ordering wins.
        let account = accounts
            .into_iter()
            .next()
            .ok_or(ConnectError::NoResourcesFound)?;

        let connection = self.upsert_connection(user_id, &account, &tokens).await?;

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection.id,
            ga_account_id = %connection.ga_account_id,
            "Connected GA4 property"
        );

        Ok(connection)
    }

    /// Insert or update the connection row for (user_id, ga_account_id).
    ///
    /// Re-authorizing the same property overwrites tokens and reactivates the
    /// row; the uniqueness constraint guarantees no duplicates under retries.
    pub async fn upsert_connection(
        &self,
        user_id: Uuid,
        account: &GaAccount,
        tokens: &TokenResponse,
    ) -> ConnectResult<ExternalConnection> {
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(tokens.expires_in);

        let connection: ExternalConnection = sqlx::query_as(
            r#"
            INSERT INTO external_connections
                (user_id, ga_account_id, ga_account_name, access_token, refresh_token,
                 token_expires_at, is_active, last_synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW())
            ON CONFLICT (user_id, ga_account_id) DO UPDATE SET
                ga_account_name = EXCLUDED.ga_account_name,
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                token_expires_at = EXCLUDED.token_expires_at,
                is_active = TRUE,
                last_synced_at = NOW(),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&account.account_id)
        .bind(&account.account_name)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(connection)
    }

    /// List a user's active connections, oldest first for stable display
    pub async fn list_connections(&self, user_id: Uuid) -> ConnectResult<Vec<ExternalConnection>> {
        let connections: Vec<ExternalConnection> = sqlx::query_as(
            r#"
            SELECT * FROM external_connections
            WHERE user_id = $1 AND is_active
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(connections)
    }

    /// Soft-delete a connection owned by the user.
    ///
    /// Scoped by user_id in the same statement: a cross-user attempt matches
    /// zero rows and reads as NotFound, never revealing that the id exists.
    pub async fn disconnect(&self, user_id: Uuid, connection_id: Uuid) -> ConnectResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE external_connections
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_active
            "#,
        )
        .bind(connection_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ConnectError::NotFound(connection_id.to_string()));
        }

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            "Disconnected GA4 property"
        );

        Ok(())
    }

    /// Refresh a connection's access token.
    ///
    /// A RefreshFailed from Google is terminal: the row is marked inactive
    /// and the error surfaces so the user is sent back through full
    /// authorization.
    pub async fn refresh_connection(
        &self,
        connection: &ExternalConnection,
    ) -> ConnectResult<ExternalConnection> {
        let refreshed = match self
            .oauth
            .refresh_access_token(&connection.refresh_token)
            .await
        {
            Ok(refreshed) => refreshed,
            Err(e @ ConnectError::RefreshFailed(_)) => {
                tracing::warn!(
                    connection_id = %connection.id,
                    user_id = %connection.user_id,
                    "Refresh token revoked or expired, deactivating connection"
                );
                self.deactivate(connection.id).await?;
                return Err(e);
            }
            Err(other) => return Err(other),
        };

        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(refreshed.expires_in);

        let updated: ExternalConnection = sqlx::query_as(
            r#"
            UPDATE external_connections
            SET access_token = $1, token_expires_at = $2, last_synced_at = NOW(),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&refreshed.access_token)
        .bind(expires_at)
        .bind(connection.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Refresh every active connection whose token expires within the window.
    /// Returns how many were refreshed. Terminal failures deactivate the row
    /// and are counted separately by the caller's logs, not retried here.
    pub async fn refresh_expiring(&self, window: Duration) -> ConnectResult<u32> {
        let cutoff = OffsetDateTime::now_utc() + window;

        let expiring: Vec<ExternalConnection> = sqlx::query_as(
            r#"
            SELECT * FROM external_connections
            WHERE is_active AND (token_expires_at IS NULL OR token_expires_at <= $1)
            ORDER BY token_expires_at ASC NULLS FIRST
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut refreshed = 0u32;
        for connection in &expiring {
            match self.refresh_connection(connection).await {
                Ok(_) => refreshed += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection.id,
                        user_id = %connection.user_id,
                        error = %e,
                        "Failed to refresh expiring connection"
                    );
                }
            }
        }

        Ok(refreshed)
    }

    async fn deactivate(&self, connection_id: Uuid) -> ConnectResult<()> {
        sqlx::query(
            "UPDATE external_connections SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(connection_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
