//! Entitlement checks
//!
//! Answers "what plan is this user on, and what are they allowed to do right
//! now?" from the local subscription mirror. Two gates feed request handlers:
//! the free-trial gate and the per-plan property quota.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use sitepulse_shared::{PlanType, SubscriptionRecord};

use crate::error::{BillingError, BillingResult};

/// Length of the free trial started at a user's first entitlement check
pub const TRIAL_PERIOD_DAYS: i64 = 30;

/// Property quota snapshot attached to the request context (never persisted)
#[derive(Debug, Clone, Serialize)]
pub struct PropertyUsage {
    pub plan: PlanType,
    pub limit: u32,
    pub current: u32,
    pub remaining: u32,
}

/// Entitlement service over the subscriptions and external_connections tables
pub struct EntitlementService {
    pool: PgPool,
}

impl EntitlementService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Trial gate. Creates the free/trialing record on a user's first check;
    /// afterwards it is a read that fails once a free user's trial has ended.
    ///
    /// This is the only write path that originates a SubscriptionRecord.
    /// Creation is insert-or-skip on the user_id uniqueness constraint, so
    /// concurrent first checks race safely: one insert wins and the others
    /// observe the created row.
    pub async fn check_trial(&self, user_id: Uuid) -> BillingResult<SubscriptionRecord> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO subscriptions (user_id, plan_type, status, trial_ends_at)
            VALUES ($1, 'free', 'trialing', NOW() + make_interval(days => $2))
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(TRIAL_PERIOD_DAYS as i32)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!(
                user_id = %user_id,
                trial_days = TRIAL_PERIOD_DAYS,
                "Started free trial"
            );
        }

        let record: SubscriptionRecord =
            sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let plan = parse_plan(&record)?;
        evaluate_trial(plan, record.trial_ends_at, OffsetDateTime::now_utc())?;

        Ok(record)
    }

    /// Property quota gate for the user's current plan.
    ///
    /// Counts active connections and compares against the plan limit. The
    /// result rides on the request context for downstream handlers; nothing
    /// is persisted.
    pub async fn check_property_limit(
        &self,
        user_id: Uuid,
        record: &SubscriptionRecord,
    ) -> BillingResult<PropertyUsage> {
        let plan = parse_plan(record)?;

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM external_connections WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        compute_usage(plan, count.max(0) as u32)
    }
}

/// Parse the persisted plan string. Failure is a configuration fault: every
/// plan a subscription row can carry must exist in the PlanType mapping.
fn parse_plan(record: &SubscriptionRecord) -> BillingResult<PlanType> {
    record.plan().map_err(|_| {
        tracing::error!(
            user_id = %record.user_id,
            plan_type = %record.plan_type,
            "Subscription row carries a plan with no PlanType mapping"
        );
        BillingError::InvalidPlan(record.plan_type.clone())
    })
}

/// Pure trial gate: only free-plan users are subject to the trial clock
fn evaluate_trial(
    plan: PlanType,
    trial_ends_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> BillingResult<()> {
    if plan != PlanType::Free {
        return Ok(());
    }
    match trial_ends_at {
        Some(trial_ends_at) if now > trial_ends_at => Err(BillingError::TrialExpired {
            trial_ended_at: trial_ends_at,
        }),
        _ => Ok(()),
    }
}

/// Pure quota computation for a plan and active-connection count
fn compute_usage(plan: PlanType, current: u32) -> BillingResult<PropertyUsage> {
    let limit = plan.max_properties();
    if current >= limit {
        return Err(BillingError::PropertyLimitReached {
            current,
            limit,
            upgrade_required: plan.upgrade_available(),
        });
    }

    Ok(PropertyUsage {
        plan,
        limit,
        current,
        remaining: limit - current,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use time::Duration;

    #[test]
    fn trial_active_passes() {
        let now = OffsetDateTime::now_utc();
        assert!(evaluate_trial(PlanType::Free, Some(now + Duration::days(3)), now).is_ok());
    }

    #[test]
    fn trial_expired_carries_exact_timestamp() {
        let now = OffsetDateTime::now_utc();
        let ended = now - Duration::days(1);
        let err = evaluate_trial(PlanType::Free, Some(ended), now).unwrap_err();
        match err {
            BillingError::TrialExpired { trial_ended_at } => assert_eq!(trial_ended_at, ended),
            other => panic!("expected TrialExpired, got {:?}", other),
        }
    }

    #[test]
    fn paid_plans_ignore_trial_clock() {
        let now = OffsetDateTime::now_utc();
        let long_expired = Some(now - Duration::days(400));
        for plan in [
            PlanType::Starter,
            PlanType::Growth,
            PlanType::Pro,
            PlanType::Business,
        ] {
            assert!(evaluate_trial(plan, long_expired, now).is_ok());
        }
    }

    #[test]
    fn free_plan_without_trial_date_passes() {
        // Legacy rows without a trial clock are not locked out
        let now = OffsetDateTime::now_utc();
        assert!(evaluate_trial(PlanType::Free, None, now).is_ok());
    }

    #[test]
    fn usage_under_limit_reports_remaining() {
        let usage = compute_usage(PlanType::Growth, 4).unwrap();
        assert_eq!(usage.limit, 10);
        assert_eq!(usage.current, 4);
        assert_eq!(usage.remaining, 6);
    }

    #[test]
    fn usage_at_limit_fails_with_upgrade_flag() {
        let err = compute_usage(PlanType::Free, 1).unwrap_err();
        match err {
            BillingError::PropertyLimitReached {
                current,
                limit,
                upgrade_required,
            } => {
                assert_eq!(current, 1);
                assert_eq!(limit, 1);
                assert!(upgrade_required);
            }
            other => panic!("expected PropertyLimitReached, got {:?}", other),
        }
    }

    #[test]
    fn usage_over_limit_fails() {
        assert!(compute_usage(PlanType::Starter, 9).is_err());
    }

    #[test]
    fn business_never_hits_the_limit() {
        let usage = compute_usage(PlanType::Business, 1_000_000).unwrap();
        assert_eq!(usage.limit, u32::MAX);
        // No upgrade above business
        assert!(!usage.plan.upgrade_available());
    }
}
