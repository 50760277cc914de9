//! CheckTrialEligibilityHandler - Query handler for trial eligibility.
//!
//! Eligibility is scoped to one tenant: a trial used under another package
//! does not count.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::domain::tenant::{PlanDefinition, PlanType, TenantDirectory};
use crate::ports::SubscriptionLedger;

#[derive(Debug, Clone)]
pub struct CheckTrialEligibilityQuery {
    pub tenant_id: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialEligibility {
    pub eligible: bool,
    /// The tenant's trial plan, if it offers one.
    pub trial_plan: Option<PlanDefinition>,
}

pub struct CheckTrialEligibilityHandler {
    directory: TenantDirectory,
    ledger: Arc<dyn SubscriptionLedger>,
}

impl CheckTrialEligibilityHandler {
    pub fn new(directory: TenantDirectory, ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { directory, ledger }
    }

    pub async fn handle(
        &self,
        query: CheckTrialEligibilityQuery,
    ) -> Result<TrialEligibility, BillingError> {
        let tenant = self.directory.resolve(&query.tenant_id)?;
        let trial_plan = tenant.catalog.get(PlanType::Trial).cloned();
        if trial_plan.is_none() {
            return Ok(TrialEligibility {
                eligible: false,
                trial_plan,
            });
        }

        let trial_used = self
            .ledger
            .find(&tenant.tenant_id, &query.user_id)
            .await?
            .map(|r| r.trial_used)
            .unwrap_or(false);

        Ok(TrialEligibility {
            eligible: !trial_used,
            trial_plan,
        })
    }
}
