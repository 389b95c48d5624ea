//! Sitepulse API Library
//!
//! Thin HTTP wiring over the connection and billing services. Handlers
//! receive an already-authenticated user from the auth middleware and call
//! straight into the core; no business logic lives here.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
