use std::fmt::Display;

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cycle = match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::Annually => "annually",
        };
        write!(f, "{}", cycle)
    }
}

impl BillingCycle {
    // "yearly" is accepted as a legacy alias for "annually".
    pub fn from_str(value: &str) -> Self {
        match value {
            "quarterly" => BillingCycle::Quarterly,
            "annually" | "yearly" => BillingCycle::Annually,
            _ => BillingCycle::Monthly,
        }
    }

    /// Length of one billing period, used to advance `next_due_at`.
    pub fn period(&self) -> Duration {
        match self {
            BillingCycle::Monthly => Duration::days(30),
            BillingCycle::Quarterly => Duration::days(90),
            BillingCycle::Annually => Duration::days(365),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_cycle_name() {
        assert_eq!(BillingCycle::from_str("monthly"), BillingCycle::Monthly);
        assert_eq!(BillingCycle::from_str("quarterly"), BillingCycle::Quarterly);
        assert_eq!(BillingCycle::from_str("annually"), BillingCycle::Annually);
    }

    #[test]
    fn yearly_is_an_alias_for_annually() {
        assert_eq!(BillingCycle::from_str("yearly"), BillingCycle::Annually);
    }

    #[test]
    fn unknown_value_defaults_to_monthly() {
        assert_eq!(BillingCycle::from_str("weekly"), BillingCycle::Monthly);
    }

    #[test]
    fn period_matches_cycle() {
        assert_eq!(BillingCycle::Monthly.period(), Duration::days(30));
        assert_eq!(BillingCycle::Quarterly.period(), Duration::days(90));
        assert_eq!(BillingCycle::Annually.period(), Duration::days(365));
    }
}
