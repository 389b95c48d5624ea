//! Sitepulse Billing Library
//!
//! Stripe integration and entitlements: customer lifecycle, checkout
//! sessions, the local subscription mirror, and the plan/trial/quota
//! decisions request handlers gate on.

pub mod checkout;
pub mod client;
pub mod customer;
pub mod entitlement;
pub mod error;

pub use checkout::{BillingSummary, CheckoutResponse, CheckoutService};
pub use client::{PriceIds, StripeClient, StripeConfig};
pub use customer::CustomerService;
pub use entitlement::{EntitlementService, PropertyUsage, TRIAL_PERIOD_DAYS};
pub use error::{BillingError, BillingResult};
