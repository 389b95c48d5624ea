//! GA4 connection routes

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use sitepulse_shared::ExternalConnection;

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

/// Response for a single connected GA4 property (tokens never leave the core)
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub ga_account_id: String,
    pub ga_account_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub connected_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_synced_at: Option<OffsetDateTime>,
}

impl From<ExternalConnection> for ConnectionResponse {
    fn from(connection: ExternalConnection) -> Self {
        Self {
            id: connection.id,
            ga_account_id: connection.ga_account_id,
            ga_account_name: connection.ga_account_name,
            connected_at: connection.created_at,
            last_synced_at: connection.last_synced_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorizationUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct OauthCallbackRequest {
    pub code: String,
}

/// Issue the Google consent URL for the current user.
/// GET /api/v1/connect/url
///
/// Gated on trial and property quota so users learn about the limit before
/// bouncing through Google, not after.
pub async fn authorization_url(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<AuthorizationUrlResponse>> {
    let subscription = state.entitlements.check_trial(auth_user.user_id).await?;
    state
        .entitlements
        .check_property_limit(auth_user.user_id, &subscription)
        .await?;

    Ok(Json(AuthorizationUrlResponse {
        url: state.oauth.authorization_url(auth_user.user_id),
    }))
}

/// Complete the OAuth flow with the code from Google's redirect.
/// POST /api/v1/connect/callback
pub async fn oauth_callback(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<OauthCallbackRequest>,
) -> ApiResult<Json<ConnectionResponse>> {
    let subscription = state.entitlements.check_trial(auth_user.user_id).await?;
    state
        .entitlements
        .check_property_limit(auth_user.user_id, &subscription)
        .await?;

    let connection = state
        .connections
        .complete_authorization(auth_user.user_id, &request.code)
        .await?;

    Ok(Json(connection.into()))
}

/// List the user's active connections.
/// GET /api/v1/connections
pub async fn list_connections(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ConnectionResponse>>> {
    let connections = state.connections.list_connections(auth_user.user_id).await?;
    Ok(Json(connections.into_iter().map(Into::into).collect()))
}

/// Disconnect a GA4 property.
/// DELETE /api/v1/connections/:id
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(connection_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .connections
        .disconnect(auth_user.user_id, connection_id)
        .await?;

    Ok(Json(serde_json::json!({ "disconnected": connection_id })))
}
