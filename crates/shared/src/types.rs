//! Common types used across Sitepulse

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Subscription plan for billing
/// Plan hierarchy: Free (trial) → Starter → Growth → Pro → Business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Free,
    Starter,
    Growth,
    Pro,
    Business,
}

impl Default for PlanType {
    fn default() -> Self {
        Self::Free
    }
}

impl PlanType {
    /// Maximum connected GA4 properties for this plan
    /// Business is unbounded (u32::MAX sentinel, never hits the limit check)
    pub fn max_properties(&self) -> u32 {
        match self {
            Self::Free => 1,
            Self::Starter => 3,
            Self::Growth => 10,
            Self::Pro => 25,
            Self::Business => u32::MAX,
        }
    }

    /// Human-readable plan name for billing summaries and UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Starter => "Starter",
            Self::Growth => "Growth",
            Self::Pro => "Pro",
            Self::Business => "Business",
        }
    }

    /// Whether there is a higher plan to upgrade to
    pub fn upgrade_available(&self) -> bool {
        !matches!(self, Self::Business)
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Starter => write!(f, "starter"),
            Self::Growth => write!(f, "growth"),
            Self::Pro => write!(f, "pro"),
            Self::Business => write!(f, "business"),
        }
    }
}

impl std::str::FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "starter" => Ok(Self::Starter),
            "growth" => Ok(Self::Growth),
            "pro" => Ok(Self::Pro),
            "business" => Ok(Self::Business),
            _ => Err(format!("Invalid plan type: {}", s)),
        }
    }
}

// =============================================================================
// Rows
// =============================================================================

/// A user's link to a GA4 account/property.
///
/// One active connection per (user_id, ga_account_id); the UNIQUE constraint
/// on that pair is the upsert key. Disconnect is a soft delete (is_active =
/// false) so the audit history survives.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExternalConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ga_account_id: String,
    pub ga_account_name: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub token_expires_at: Option<OffsetDateTime>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_synced_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ExternalConnection {
    /// Single named predicate for the soft-delete lifecycle state
    pub fn active(&self) -> bool {
        self.is_active
    }
}

/// Local mirror of a user's subscription.
///
/// Exactly one row per user (UNIQUE on user_id). `status` is owned by Stripe
/// and copied verbatim; it is never transitioned locally. `trial_ends_at` is
/// the local 30-day free-trial clock; `trial_end_date` mirrors Stripe's
/// trial_end when a paid subscription carries one.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_type: String,
    pub status: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_end_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SubscriptionRecord {
    /// Parse the stored plan string. An unknown value is a configuration
    /// fault (every persisted plan must exist in the PlanType mapping).
    pub fn plan(&self) -> Result<PlanType, String> {
        self.plan_type.parse()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use time::Duration;

    #[test]
    fn plan_type_parse_round_trip() {
        for plan in [
            PlanType::Free,
            PlanType::Starter,
            PlanType::Growth,
            PlanType::Pro,
            PlanType::Business,
        ] {
            let parsed: PlanType = plan.to_string().parse().unwrap();
            assert_eq!(parsed, plan);
        }
    }

    #[test]
    fn plan_type_rejects_unknown() {
        assert!("platinum".parse::<PlanType>().is_err());
        assert!("".parse::<PlanType>().is_err());
    }

    #[test]
    fn property_limits_increase_by_plan() {
        assert_eq!(PlanType::Free.max_properties(), 1);
        assert_eq!(PlanType::Starter.max_properties(), 3);
        assert_eq!(PlanType::Growth.max_properties(), 10);
        assert_eq!(PlanType::Pro.max_properties(), 25);
        assert_eq!(PlanType::Business.max_properties(), u32::MAX);
    }

    #[test]
    fn business_has_no_upgrade() {
        assert!(PlanType::Pro.upgrade_available());
        assert!(!PlanType::Business.upgrade_available());
    }

    #[test]
    fn active_reflects_soft_delete_flag() {
        let now = OffsetDateTime::now_utc();
        let mut conn = ExternalConnection {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ga_account_id: "properties/123".to_string(),
            ga_account_name: "Example Site".to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            token_expires_at: Some(now + Duration::minutes(5)),
            is_active: true,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(conn.active());
        conn.is_active = false;
        assert!(!conn.active());
    }
}
