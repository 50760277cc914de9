//! Plan types, plan definitions, and the per-tenant plan catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::TenantId;
use crate::domain::foundation::ValidationError;

/// Default number of billing cycles requested for recurring subscriptions.
pub const DEFAULT_TOTAL_COUNT: u32 = 12;

/// Subscription plan offered by a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Reduced-price, single-use offer.
    Trial,
    Monthly,
    Yearly,
}

impl PlanType {
    pub const ALL: [PlanType; 3] = [PlanType::Trial, PlanType::Monthly, PlanType::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Trial => "trial",
            PlanType::Monthly => "monthly",
            PlanType::Yearly => "yearly",
        }
    }

    pub fn is_trial(&self) -> bool {
        matches!(self, PlanType::Trial)
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(PlanType::Trial),
            "monthly" => Ok(PlanType::Monthly),
            "yearly" => Ok(PlanType::Yearly),
            other => Err(ValidationError::invalid_format(
                "plan",
                format!("unknown plan type '{}'", other),
            )),
        }
    }
}

/// Price and duration of one plan for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDefinition {
    pub tenant_id: TenantId,
    pub plan_type: PlanType,
    /// Plan id at the gateway, used when creating recurring subscriptions.
    pub external_plan_id: String,
    pub duration_days: u32,
    pub amount_minor_units: u64,
    /// ISO 4217 code, e.g. `INR`.
    pub currency: String,
    /// Billing cycles requested when the plan is sold as a subscription.
    pub total_count: u32,
}

impl PlanDefinition {
    /// Builds a plan definition, rejecting values the gateway would refuse.
    pub fn new(
        tenant_id: TenantId,
        plan_type: PlanType,
        external_plan_id: impl Into<String>,
        duration_days: u32,
        amount_minor_units: u64,
        currency: impl Into<String>,
        total_count: u32,
    ) -> Result<Self, ValidationError> {
        let external_plan_id = external_plan_id.into();
        let currency = currency.into();

        if external_plan_id.trim().is_empty() {
            return Err(ValidationError::empty_field("external_plan_id"));
        }
        if duration_days == 0 {
            return Err(ValidationError::invalid_format(
                "duration_days",
                "must be greater than zero",
            ));
        }
        if amount_minor_units == 0 {
            return Err(ValidationError::invalid_format(
                "amount_minor_units",
                "must be greater than zero",
            ));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "must be a 3-letter uppercase ISO code",
            ));
        }
        if total_count == 0 {
            return Err(ValidationError::invalid_format(
                "total_count",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            tenant_id,
            plan_type,
            external_plan_id,
            duration_days,
            amount_minor_units,
            currency,
            total_count,
        })
    }
}

/// Immutable plan table for a single tenant.
///
/// Monthly and yearly plans always exist; trial exists only when the tenant
/// enables it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    monthly: PlanDefinition,
    yearly: PlanDefinition,
    trial: Option<PlanDefinition>,
}

impl PlanCatalog {
    /// Assembles a catalog from plan definitions.
    ///
    /// A trial definition is dropped unless `trial_enabled`. Duplicate plan
    /// types, missing monthly/yearly plans, and plans belonging to another
    /// tenant are rejected.
    pub fn new(
        tenant_id: &TenantId,
        plans: Vec<PlanDefinition>,
        trial_enabled: bool,
    ) -> Result<Self, ValidationError> {
        let mut monthly = None;
        let mut yearly = None;
        let mut trial = None;

        for plan in plans {
            if &plan.tenant_id != tenant_id {
                return Err(ValidationError::invalid_format(
                    "plans",
                    format!("plan {} belongs to tenant {}", plan.plan_type, plan.tenant_id),
                ));
            }
            let slot = match plan.plan_type {
                PlanType::Monthly => &mut monthly,
                PlanType::Yearly => &mut yearly,
                PlanType::Trial => &mut trial,
            };
            if slot.is_some() {
                return Err(ValidationError::invalid_format(
                    "plans",
                    format!("duplicate {} plan", plan.plan_type),
                ));
            }
            *slot = Some(plan);
        }

        let monthly = monthly.ok_or_else(|| ValidationError::empty_field("plans.monthly"))?;
        let yearly = yearly.ok_or_else(|| ValidationError::empty_field("plans.yearly"))?;

        Ok(Self {
            monthly,
            yearly,
            trial: if trial_enabled { trial } else { None },
        })
    }

    /// Looks up a plan by type.
    pub fn get(&self, plan_type: PlanType) -> Option<&PlanDefinition> {
        match plan_type {
            PlanType::Monthly => Some(&self.monthly),
            PlanType::Yearly => Some(&self.yearly),
            PlanType::Trial => self.trial.as_ref(),
        }
    }

    /// All offered plans, trial first when present.
    pub fn plans(&self) -> Vec<&PlanDefinition> {
        PlanType::ALL.iter().filter_map(|t| self.get(*t)).collect()
    }

    pub fn has_trial(&self) -> bool {
        self.trial.is_some()
    }
}
