//! Sitepulse GA4 Connection Library
//!
//! Google OAuth credential lifecycle and GA4 property connections:
//! authorization flow, token refresh, property discovery, and the
//! soft-deleted connection records other crates meter against.

pub mod client;
pub mod connections;
pub mod error;

pub use client::{GaAccount, GoogleOauthClient, GoogleOauthConfig, RefreshResponse, TokenResponse};
pub use connections::ConnectionService;
pub use error::{ConnectError, ConnectResult};
