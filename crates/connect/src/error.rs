//! Connection error types

use thiserror::Error;

/// Errors from the Google OAuth flow and connection management
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The provider rejected an authorization code (expired, reused, or
    /// malformed). Codes are single-use; callers must restart the flow,
    /// never retry the same code.
    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    /// The refresh token is revoked or expired. Terminal for the
    /// connection: it must be marked inactive and fully re-authorized.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// The authorized Google account has no GA4 properties to connect.
    /// Nothing is persisted; the user must create a property upstream first.
    #[error("No Google Analytics accounts found for this Google account")]
    NoResourcesFound,

    #[error("Connection not found: {0}")]
    NotFound(String),

    #[error("Google API error: {0}")]
    Http(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<reqwest::Error> for ConnectError {
    fn from(err: reqwest::Error) -> Self {
        ConnectError::Http(err.to_string())
    }
}

impl From<sqlx::Error> for ConnectError {
    fn from(err: sqlx::Error) -> Self {
        ConnectError::Database(err.to_string())
    }
}

pub type ConnectResult<T> = Result<T, ConnectError>;
