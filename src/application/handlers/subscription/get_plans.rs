//! GetPlansHandler - Query handler for a tenant's plan catalog.

use crate::domain::billing::BillingError;
use crate::domain::tenant::{PlanDefinition, TenantDirectory};

#[derive(Debug, Clone)]
pub struct GetPlansQuery {
    pub tenant_id: String,
}

#[derive(Debug, Clone)]
pub struct PlansView {
    /// Offered plans, trial first when enabled.
    pub plans: Vec<PlanDefinition>,
    pub trial_enabled: bool,
}

pub struct GetPlansHandler {
    directory: TenantDirectory,
}

impl GetPlansHandler {
    pub fn new(directory: TenantDirectory) -> Self {
        Self { directory }
    }

    pub fn handle(&self, query: GetPlansQuery) -> Result<PlansView, BillingError> {
        let tenant = self.directory.resolve(&query.tenant_id)?;
        Ok(PlansView {
            plans: tenant.catalog.plans().into_iter().cloned().collect(),
            trial_enabled: tenant.catalog.has_trial(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tenant::test_support::sample_tenant;
    use crate::domain::tenant::{PlanCatalog, PlanType};

    #[test]
    fn lists_trial_first() {
        let directory = TenantDirectory::new(vec![sample_tenant("com.example.app")]).unwrap();
        let view = GetPlansHandler::new(directory)
            .handle(GetPlansQuery {
                tenant_id: "com.example.app".to_string(),
            })
            .unwrap();

        let types: Vec<_> = view.plans.iter().map(|p| p.plan_type).collect();
        assert_eq!(types, vec![PlanType::Trial, PlanType::Monthly, PlanType::Yearly]);
        assert!(view.trial_enabled);
    }

    #[test]
    fn tenants_are_priced_independently() {
        let mut other = sample_tenant("com.other.app");
        let plans = other
            .catalog
            .plans()
            .into_iter()
            .cloned()
            .map(|mut p| {
                p.amount_minor_units *= 2;
                p
            })
            .collect();
        other.catalog = PlanCatalog::new(&other.tenant_id, plans, false).unwrap();
        other.trial_enabled = false;
        let directory =
            TenantDirectory::new(vec![sample_tenant("com.example.app"), other]).unwrap();
        let handler = GetPlansHandler::new(directory);

        let view = handler
            .handle(GetPlansQuery {
                tenant_id: "com.other.app".to_string(),
            })
            .unwrap();
        assert!(!view.trial_enabled);
        assert_eq!(view.plans.len(), 2);
        assert_eq!(view.plans[0].amount_minor_units, 23400);
    }

    #[test]
    fn unknown_tenant_fails_closed() {
        let handler = GetPlansHandler::new(TenantDirectory::default());
        let err = handler
            .handle(GetPlansQuery {
                tenant_id: "com.example.app".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, BillingError::UnsupportedTenant(_)));
    }
}
