use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// A cleaner's subscription level. Gates how many distinct new clients
/// they may accept bookings from per usage period.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum SubscriptionTier {
    Free,
    Standard,
    Pro,
    Premium,
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        SubscriptionTier::Free
    }
}

/// Commercial terms of a plan tier.
pub struct PlanTerms {
    pub price_monthly: f64,
    /// `None` means unlimited.
    pub monthly_new_client_limit: Option<usize>,
    pub period_days: i64,
}

impl SubscriptionTier {
    pub fn terms(&self) -> PlanTerms {
        match self {
            SubscriptionTier::Free => PlanTerms {
                price_monthly: 0.0,
                monthly_new_client_limit: Some(1),
                period_days: 30,
            },
            SubscriptionTier::Standard => PlanTerms {
                price_monthly: 5000.0,
                monthly_new_client_limit: Some(5),
                period_days: 30,
            },
            SubscriptionTier::Pro => PlanTerms {
                price_monthly: 10000.0,
                monthly_new_client_limit: Some(12),
                period_days: 30,
            },
            SubscriptionTier::Premium => PlanTerms {
                price_monthly: 20000.0,
                monthly_new_client_limit: None,
                period_days: 30,
            },
        }
    }

    pub fn monthly_new_client_limit(&self) -> Option<usize> {
        self.terms().monthly_new_client_limit
    }

    pub fn period_days(&self) -> i64 {
        self.terms().period_days
    }
}
