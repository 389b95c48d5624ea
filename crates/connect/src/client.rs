//! Google OAuth and GA4 Admin API client

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ConnectError, ConnectResult};

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_ADMIN_API_BASE: &str = "https://analyticsadmin.googleapis.com/v1beta";
const ANALYTICS_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";

/// Configuration for the Google OAuth client
#[derive(Debug, Clone)]
pub struct GoogleOauthConfig {
    /// OAuth client ID issued by Google Cloud Console
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI registered for the OAuth client
    pub redirect_uri: String,
    /// Token endpoint; overridable so tests can point at a local server
    pub token_endpoint: String,
    /// GA4 Admin API base; overridable so tests can point at a local server
    pub admin_api_base: String,
}

impl GoogleOauthConfig {
    /// Config with the production Google endpoints
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            admin_api_base: DEFAULT_ADMIN_API_BASE.to_string(),
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> ConnectResult<Self> {
        Ok(Self::new(
            std::env::var("GOOGLE_CLIENT_ID").map_err(|_| {
                ConnectError::AuthorizationFailed("GOOGLE_CLIENT_ID not set".to_string())
            })?,
            std::env::var("GOOGLE_CLIENT_SECRET").map_err(|_| {
                ConnectError::AuthorizationFailed("GOOGLE_CLIENT_SECRET not set".to_string())
            })?,
            std::env::var("GOOGLE_REDIRECT_URI").map_err(|_| {
                ConnectError::AuthorizationFailed("GOOGLE_REDIRECT_URI not set".to_string())
            })?,
        ))
    }
}

/// Tokens returned from an authorization-code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Tokens returned from a refresh (no new refresh token is issued)
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// A GA4 property the authenticated Google identity can read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaAccount {
    /// GA4 property resource name, e.g. "properties/123456"
    pub account_id: String,
    /// Property display name
    pub account_name: String,
    /// Display name of the parent Analytics account
    pub parent_name: String,
}

/// Error body from Google's token endpoint
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenErrorBody {
    fn message(&self) -> String {
        match &self.error_description {
            Some(desc) => format!("{}: {}", self.error, desc),
            None => self.error.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSummariesResponse {
    #[serde(default)]
    account_summaries: Vec<AccountSummary>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSummary {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    property_summaries: Vec<PropertySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertySummary {
    property: String,
    #[serde(default)]
    display_name: String,
}

/// Client for Google OAuth and the GA4 Admin API.
///
/// Stateless: owns no tokens, only provider credentials. Constructed once at
/// startup and threaded through service constructors.
#[derive(Clone)]
pub struct GoogleOauthClient {
    http: reqwest::Client,
    config: GoogleOauthConfig,
}

impl GoogleOauthClient {
    pub fn new(http: reqwest::Client, config: GoogleOauthConfig) -> Self {
        Self { http, config }
    }

    /// Build the consent URL for a user.
    ///
    /// `access_type=offline` plus `prompt=consent` guarantees Google issues a
    /// refresh token even when the user has authorized us before. The user id
    /// rides along as opaque `state` and comes back on the callback.
    pub fn authorization_url(&self, user_id: Uuid) -> String {
        // Static endpoint plus known-valid params; parsing cannot fail
        let mut url = reqwest::Url::parse(AUTH_ENDPOINT)
            .unwrap_or_else(|_| unreachable!("static auth endpoint is a valid URL"));
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", ANALYTICS_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", &user_id.to_string());
        url.to_string()
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Codes are single-use; a rejection here must never be retried with the
    /// same code.
    pub async fn exchange_code(&self, code: &str) -> ConnectResult<TokenResponse> {
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<TokenErrorBody>().await {
                Ok(body) => body.message(),
                Err(_) => format!("token endpoint returned {}", status),
            };
            return Err(ConnectError::ExchangeFailed(message));
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    /// Refresh an access token.
    ///
    /// A rejection means the refresh token is revoked or expired — terminal
    /// for the connection. The caller marks it inactive and requires a full
    /// re-authorization.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ConnectResult<RefreshResponse> {
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<TokenErrorBody>().await {
                Ok(body) => body.message(),
                Err(_) => format!("token endpoint returned {}", status),
            };
            return Err(ConnectError::RefreshFailed(message));
        }

        Ok(response.json::<RefreshResponse>().await?)
    }

    /// List GA4 properties the token can read, flattened from account
    /// summaries with the parent account's display name attached.
    ///
    /// An identity with zero properties is a valid state (nothing provisioned
    /// yet) and returns an empty Vec, not an error.
    pub async fn list_accessible_accounts(
        &self,
        access_token: &str,
    ) -> ConnectResult<Vec<GaAccount>> {
        let mut accounts = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/accountSummaries", self.config.admin_api_base))
                .bearer_auth(access_token)
                .query(&[("pageSize", "200")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(ConnectError::Http(format!(
                    "accountSummaries returned {}",
                    response.status()
                )));
            }

            let page = response.json::<AccountSummariesResponse>().await?;
            accounts.extend(flatten_summaries(page.account_summaries));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(accounts)
    }
}

/// Flatten account summaries into one entry per property, preserving the
/// order Google returns (callers select the first deterministically).
fn flatten_summaries(summaries: Vec<AccountSummary>) -> Vec<GaAccount> {
    summaries
        .into_iter()
        .flat_map(|account| {
            let parent_name = account.display_name;
            account
                .property_summaries
                .into_iter()
                .map(move |property| GaAccount {
                    account_id: property.property,
                    account_name: property.display_name,
                    parent_name: parent_name.clone(),
                })
        })
        .collect()
}
