//! Subscription record entity.
//!
//! One record per (tenant, user). It is the single source of truth for access
//! decisions and is only mutated through the transitions below.
//!
//! # Invariants
//!
//! - `trial_used` is monotonic: once true it is never reset
//! - `start_date <= end_date`
//! - `version` increases by one on every committed update

use serde::{Deserialize, Serialize};

use super::{ChargeKind, SubscriptionStatus};
use crate::domain::foundation::{InvalidTransition, StateMachine, Timestamp, UserId};
use crate::domain::tenant::{PlanDefinition, PlanType, TenantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// Gateway subscription id. `None` for one-time purchases.
    pub external_subscription_id: Option<String>,
    /// Last gateway payment applied to this record.
    pub last_payment_external_id: Option<String>,
    pub trial_used: bool,
    /// Optimistic-concurrency token, checked by conditional updates.
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Outcome of applying a renewal charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    Extended,
    /// The payment id was already applied; nothing changed.
    AlreadyApplied,
}

impl SubscriptionRecord {
    /// First record for a user, created by a verified payment.
    pub fn activated(
        tenant_id: TenantId,
        user_id: UserId,
        plan: &PlanDefinition,
        kind: ChargeKind,
        charge_external_id: &str,
        payment_id: &str,
        now: Timestamp,
    ) -> Self {
        let mut record = Self {
            tenant_id,
            user_id,
            plan_type: plan.plan_type,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: now,
            external_subscription_id: None,
            last_payment_external_id: None,
            trial_used: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        record.apply_verified_payment(plan, kind, charge_external_id, payment_id, now);
        record
    }

    /// Applies a client-verified payment for a new purchase.
    ///
    /// A purchase starts a fresh period from `now`; it never stacks on top of
    /// the previous end date, so replays cannot double-extend.
    pub fn apply_verified_payment(
        &mut self,
        plan: &PlanDefinition,
        kind: ChargeKind,
        charge_external_id: &str,
        payment_id: &str,
        now: Timestamp,
    ) {
        self.plan_type = plan.plan_type;
        self.status = if plan.plan_type.is_trial() {
            SubscriptionStatus::Trialing
        } else {
            SubscriptionStatus::Active
        };
        self.start_date = now;
        self.end_date = now.add_days(i64::from(plan.duration_days));
        self.external_subscription_id = match kind {
            ChargeKind::Recurring => Some(charge_external_id.to_string()),
            ChargeKind::OneTime => None,
        };
        self.last_payment_external_id = Some(payment_id.to_string());
        if plan.plan_type.is_trial() {
            self.trial_used = true;
        }
        self.updated_at = now;
    }

    /// Applies a renewal charge reported by the gateway.
    ///
    /// Extends from the later of the current end date and `now`, so a charge
    /// arriving after a lapse does not hand out a partial period.
    pub fn apply_charge(
        &mut self,
        duration_days: u32,
        payment_id: Option<&str>,
        now: Timestamp,
    ) -> Result<ChargeOutcome, InvalidTransition> {
        if let (Some(paid), Some(last)) = (payment_id, self.last_payment_external_id.as_deref()) {
            if paid == last {
                return Ok(ChargeOutcome::AlreadyApplied);
            }
        }
        self.status = self.status.transition_to(SubscriptionStatus::Active)?;
        self.end_date = self.end_date.max(now).add_days(i64::from(duration_days));
        if let Some(paid) = payment_id {
            self.last_payment_external_id = Some(paid.to_string());
        }
        self.updated_at = now;
        Ok(ChargeOutcome::Extended)
    }

    /// Marks the subscription cancelled. The end date is kept.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), InvalidTransition> {
        self.status = self.status.transition_to(SubscriptionStatus::Canceled)?;
        self.updated_at = now;
        Ok(())
    }

    /// Marks a failed renewal. Access is not revoked.
    pub fn mark_past_due(&mut self, now: Timestamp) -> Result<(), InvalidTransition> {
        self.status = self.status.transition_to(SubscriptionStatus::PastDue)?;
        self.updated_at = now;
        Ok(())
    }

    /// Moves a lapsed record to `Expired`. Returns true if anything changed.
    pub fn expire_if_lapsed(&mut self, now: Timestamp) -> bool {
        if self.status == SubscriptionStatus::Expired || !self.end_date.is_before(&now) {
            return false;
        }
        self.status = SubscriptionStatus::Expired;
        self.updated_at = now;
        true
    }

    /// True while the status permits access and the period has not ended.
    pub fn has_access(&self, now: Timestamp) -> bool {
        self.status.grants_access() && !self.end_date.is_before(&now)
    }

    /// Whole days left in the current period, never negative.
    pub fn days_remaining(&self, now: Timestamp) -> i64 {
        self.end_date.duration_since(&now).num_days().max(0)
    }
}
