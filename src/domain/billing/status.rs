//! Subscription status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid trial in progress.
    Trialing,

    /// Fully paid subscription.
    Active,

    /// A renewal charge failed. Access continues until the period ends.
    PastDue,

    /// Cancelled at the gateway. Access continues until the period ends.
    Canceled,

    /// Period ended. No access.
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if the status itself permits access.
    ///
    /// Callers must also check the period end; see
    /// `SubscriptionRecord::has_access`.
    pub fn grants_access(&self) -> bool {
        !matches!(self, SubscriptionStatus::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        use SubscriptionStatus::*;
        match self {
            Trialing => &[Active, PastDue, Canceled, Expired],
            // Active -> Active is a renewal.
            Active => &[Active, PastDue, Canceled, Expired],
            PastDue => &[Active, PastDue, Canceled, Expired],
            // A charge after cancellation means the gateway resumed billing.
            Canceled => &[Active, Expired],
            Expired => &[Active],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    #[test]
    fn renewal_and_failure_edges_exist() {
        assert_eq!(Active.transition_to(Active), Ok(Active));
        assert_eq!(Active.transition_to(PastDue), Ok(PastDue));
        assert_eq!(PastDue.transition_to(Active), Ok(Active));
        assert_eq!(Trialing.transition_to(Active), Ok(Active));
    }

    #[test]
    fn canceled_cannot_fall_back_to_past_due() {
        assert!(Canceled.transition_to(PastDue).is_err());
        assert!(Canceled.transition_to(Canceled).is_err());
    }

    #[test]
    fn expired_only_reactivates() {
        assert!(Expired.transition_to(Canceled).is_err());
        assert!(Expired.transition_to(PastDue).is_err());
        assert_eq!(Expired.transition_to(Active), Ok(Active));
    }

    #[test]
    fn no_status_is_terminal() {
        for status in [Trialing, Active, PastDue, Canceled, Expired] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn only_expired_denies_access() {
        assert!(Trialing.grants_access());
        assert!(PastDue.grants_access());
        assert!(Canceled.grants_access());
        assert!(!Expired.grants_access());
    }

    #[test]
    fn string_forms_round_trip_through_from_str() {
        for status in [Trialing, Active, PastDue, Canceled, Expired] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
        assert_eq!(serde_json::to_string(&PastDue).unwrap(), "\"past_due\"");
    }
}
