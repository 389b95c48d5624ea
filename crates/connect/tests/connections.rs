//! Integration tests for connection persistence semantics
//!
//! These exercise the upsert key, soft-delete scoping, and list ordering
//! against a real Postgres database. Token exchange and discovery are not
//! hit; tests drive the persistence layer directly.
//!
//! ## Running Tests
//! ```bash
//! export DATABASE_URL="postgres://localhost/sitepulse_test"
//! cargo test -p sitepulse-connect -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sitepulse_connect::{
    ConnectError, ConnectionService, GaAccount, GoogleOauthClient, GoogleOauthConfig,
    TokenResponse,
};
use sqlx::PgPool;
use uuid::Uuid;

async fn setup() -> (ConnectionService, PgPool) {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    (ConnectionService::new(test_oauth(None), pool.clone()), pool)
}

/// OAuth client with test credentials, optionally pointed at a mock server
fn test_oauth(server_url: Option<&str>) -> GoogleOauthClient {
    let mut config = GoogleOauthConfig::new(
        "test-client".to_string(),
        "test-secret".to_string(),
        "http://localhost:3000/connect/callback".to_string(),
    );
    if let Some(url) = server_url {
        config.token_endpoint = format!("{}/token", url);
        config.admin_api_base = url.to_string();
    }
    GoogleOauthClient::new(reqwest::Client::new(), config)
}

async fn create_test_user(pool: &PgPool) -> Uuid {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(user_id)
        .bind(format!("test-{}@example.com", user_id))
        .execute(pool)
        .await
        .expect("Failed to create test user");
    user_id
}

fn test_account(id: &str) -> GaAccount {
    GaAccount {
        account_id: id.to_string(),
        account_name: "Test Property".to_string(),
        parent_name: "Test Account".to_string(),
    }
}

fn test_tokens(access: &str) -> TokenResponse {
    TokenResponse {
        access_token: access.to_string(),
        refresh_token: "rt-1".to_string(),
        expires_in: 3600,
    }
}

#[tokio::test]
#[ignore] // Requires database
async fn upsert_is_idempotent_by_key() {
    let (service, pool) = setup().await;
    let user_id = create_test_user(&pool).await;

    let first = service
        .upsert_connection(user_id, &test_account("properties/1"), &test_tokens("at-1"))
        .await
        .unwrap();
    let second = service
        .upsert_connection(user_id, &test_account("properties/1"), &test_tokens("at-2"))
        .await
        .unwrap();

    // Same row, fresh tokens
    assert_eq!(first.id, second.id);
    assert_eq!(second.access_token, "at-2");

    let connections = service.list_connections(user_id).await.unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].ga_account_id, "properties/1");
}

#[tokio::test]
#[ignore] // Requires database
async fn list_returns_active_oldest_first() {
    let (service, pool) = setup().await;
    let user_id = create_test_user(&pool).await;

    service
        .upsert_connection(user_id, &test_account("properties/1"), &test_tokens("at"))
        .await
        .unwrap();
    service
        .upsert_connection(user_id, &test_account("properties/2"), &test_tokens("at"))
        .await
        .unwrap();

    let connections = service.list_connections(user_id).await.unwrap();
    assert_eq!(connections.len(), 2);
    assert_eq!(connections[0].ga_account_id, "properties/1");
    assert_eq!(connections[1].ga_account_id, "properties/2");
    assert!(connections.iter().all(|c| c.active()));
}

#[tokio::test]
#[ignore] // Requires database
async fn disconnect_soft_deletes_and_scopes_by_owner() {
    let (service, pool) = setup().await;
    let owner = create_test_user(&pool).await;
    let other = create_test_user(&pool).await;

    let connection = service
        .upsert_connection(owner, &test_account("properties/1"), &test_tokens("at"))
        .await
        .unwrap();

    // Another user disconnecting reads as NotFound, not Forbidden
    let err = service.disconnect(other, connection.id).await.unwrap_err();
    assert!(matches!(err, ConnectError::NotFound(_)));

    service.disconnect(owner, connection.id).await.unwrap();
    assert!(service.list_connections(owner).await.unwrap().is_empty());

    // Row survives the disconnect (soft delete)
    let (is_active,): (bool,) =
        sqlx::query_as("SELECT is_active FROM external_connections WHERE id = $1")
            .bind(connection.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!is_active);

    // Disconnecting an already-inactive connection is NotFound too
    let err = service.disconnect(owner, connection.id).await.unwrap_err();
    assert!(matches!(err, ConnectError::NotFound(_)));
}

#[tokio::test]
#[ignore] // Requires database
async fn reauthorize_after_disconnect_reactivates_same_row() {
    let (service, pool) = setup().await;
    let user_id = create_test_user(&pool).await;

    let original = service
        .upsert_connection(user_id, &test_account("properties/9"), &test_tokens("at-1"))
        .await
        .unwrap();
    service.disconnect(user_id, original.id).await.unwrap();

    let reconnected = service
        .upsert_connection(user_id, &test_account("properties/9"), &test_tokens("at-3"))
        .await
        .unwrap();

    assert_eq!(reconnected.id, original.id);
    assert!(reconnected.active());
    assert_eq!(service.list_connections(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // Requires database
async fn authorization_flow_persists_first_discovered_property() {
    let (_, pool) = setup().await;
    let user_id = create_test_user(&pool).await;

    let mut server = mockito::Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token":"at-live","refresh_token":"rt-live","expires_in":3600,"token_type":"Bearer"}"#,
        )
        .create_async()
        .await;
    let _summaries = server
        .mock("GET", "/accountSummaries")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "accountSummaries": [
                    {
                        "account": "accounts/100",
                        "displayName": "Acme Inc",
                        "propertySummaries": [
                            {"property": "properties/1", "displayName": "acme.com"},
                            {"property": "properties/2", "displayName": "blog.acme.com"}
                        ]
                    }
                ]
            }"#,
        )
        .create_async()
        .await;

    let service = ConnectionService::new(test_oauth(Some(&server.url())), pool.clone());

    let connection = service
        .complete_authorization(user_id, "code-1")
        .await
        .unwrap();

    // First property in Google's ordering wins, with fresh tokens attached
    assert_eq!(connection.ga_account_id, "properties/1");
    assert_eq!(connection.ga_account_name, "acme.com");
    assert_eq!(connection.access_token, "at-live");
    assert_eq!(connection.refresh_token, "rt-live");
    assert!(connection.active());

    let connections = service.list_connections(user_id).await.unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].id, connection.id);
}

#[tokio::test]
#[ignore] // Requires database
async fn authorization_with_zero_accounts_persists_nothing() {
    let (_, pool) = setup().await;
    let user_id = create_test_user(&pool).await;

    let mut server = mockito::Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token":"at-live","refresh_token":"rt-live","expires_in":3600,"token_type":"Bearer"}"#,
        )
        .create_async()
        .await;
    let _summaries = server
        .mock("GET", "/accountSummaries")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let service = ConnectionService::new(test_oauth(Some(&server.url())), pool.clone());

    let err = service
        .complete_authorization(user_id, "code-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::NoResourcesFound));

    // Not even an inactive row may be left behind
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM external_connections WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn transport_fault_during_exchange_reads_as_authorization_failure() {
    let mut server = mockito::Server::new_async().await;
    // Success status with an unparsable body, as a proxy for a broken wire
    let _token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_body("upstream proxy error")
        .create_async()
        .await;

    // The exchange fails before any query runs, so a lazy pool never connects
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/sitepulse_unused")
        .unwrap();
    let service = ConnectionService::new(test_oauth(Some(&server.url())), pool);

    let err = service
        .complete_authorization(Uuid::new_v4(), "code-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectError::AuthorizationFailed(_)));
}
