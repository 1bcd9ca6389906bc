//! Monthly new-client gate: each plan tier caps how many distinct new clients
//! a cleaner may take bookings from per usage period.

use mongodb::bson::{oid::ObjectId, DateTime};

use crate::engine::EngineError;
use crate::models::{SubscriptionTier, User};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A cleaner's usage window: the distinct client ids counted this period and
/// when the period rolls over.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageWindow {
    pub client_ids: Vec<ObjectId>,
    pub reset_date: Option<DateTime>,
}

impl UsageWindow {
    pub fn from_user(user: &User) -> Self {
        UsageWindow {
            client_ids: user.monthly_new_client_ids.clone(),
            reset_date: user.monthly_usage_reset_date,
        }
    }
}

/// Advance the window past any elapsed periods: the set empties and the reset
/// date moves forward one period at a time until it is in the future.
pub fn rollover(mut window: UsageWindow, tier: SubscriptionTier, now: DateTime) -> UsageWindow {
    let period_ms = tier.period_days() * MILLIS_PER_DAY;
    match window.reset_date {
        None => {
            window.reset_date = Some(DateTime::from_millis(now.timestamp_millis() + period_ms));
        }
        Some(reset) if reset <= now => {
            window.client_ids.clear();
            let mut next = reset.timestamp_millis();
            while next <= now.timestamp_millis() {
                next += period_ms;
            }
            window.reset_date = Some(DateTime::from_millis(next));
        }
        Some(_) => {}
    }
    window
}

/// Admit a booking from `client_id` into the window, or reject it when the
/// tier's quota of distinct new clients is used up. Repeat clients are free.
pub fn admit(
    window: UsageWindow,
    tier: SubscriptionTier,
    client_id: ObjectId,
    now: DateTime,
) -> Result<UsageWindow, EngineError> {
    let mut window = rollover(window, tier, now);
    if window.client_ids.contains(&client_id) {
        return Ok(window);
    }
    if let Some(limit) = tier.monthly_new_client_limit() {
        if window.client_ids.len() >= limit {
            return Err(EngineError::PlanLimitExceeded(format!(
                "This cleaner has reached the monthly limit of {} new client{} on the {:?} plan",
                limit,
                if limit == 1 { "" } else { "s" },
                tier
            )));
        }
    }
    window.client_ids.push(client_id);
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime {
        DateTime::from_millis(1_750_000_000_000)
    }

    fn window(ids: usize) -> UsageWindow {
        UsageWindow {
            client_ids: (0..ids).map(|_| ObjectId::new()).collect(),
            reset_date: Some(DateTime::from_millis(now().timestamp_millis() + MILLIS_PER_DAY)),
        }
    }

    #[test]
    fn new_client_rejected_at_limit() {
        let full = window(1);
        let err = admit(full, SubscriptionTier::Free, ObjectId::new(), now()).unwrap_err();
        assert!(matches!(err, EngineError::PlanLimitExceeded(_)));
    }

    #[test]
    fn repeat_client_admitted_at_limit() {
        let full = window(1);
        let known = full.client_ids[0];
        let after = admit(full, SubscriptionTier::Free, known, now()).unwrap();
        assert_eq!(after.client_ids.len(), 1);
    }

    #[test]
    fn new_client_admitted_below_limit() {
        let partial = window(3);
        let after = admit(partial, SubscriptionTier::Standard, ObjectId::new(), now()).unwrap();
        assert_eq!(after.client_ids.len(), 4);
    }

    #[test]
    fn premium_is_unlimited() {
        let big = window(500);
        let after = admit(big, SubscriptionTier::Premium, ObjectId::new(), now()).unwrap();
        assert_eq!(after.client_ids.len(), 501);
    }

    #[test]
    fn elapsed_period_empties_the_window() {
        let stale = UsageWindow {
            client_ids: vec![ObjectId::new()],
            reset_date: Some(DateTime::from_millis(now().timestamp_millis() - 1)),
        };
        let fresh = rollover(stale, SubscriptionTier::Free, now());
        assert!(fresh.client_ids.is_empty());
        assert!(fresh.reset_date.unwrap() > now());
    }

    #[test]
    fn rollover_skips_multiple_elapsed_periods() {
        let long_ago =
            DateTime::from_millis(now().timestamp_millis() - 100 * MILLIS_PER_DAY);
        let stale = UsageWindow {
            client_ids: vec![ObjectId::new()],
            reset_date: Some(long_ago),
        };
        let fresh = rollover(stale, SubscriptionTier::Free, now());
        let reset = fresh.reset_date.unwrap();
        assert!(reset > now());
        assert!(
            reset.timestamp_millis() - now().timestamp_millis()
                <= SubscriptionTier::Free.period_days() * MILLIS_PER_DAY
        );
    }

    #[test]
    fn missing_reset_date_is_initialised() {
        let unset = UsageWindow {
            client_ids: Vec::new(),
            reset_date: None,
        };
        let fresh = rollover(unset, SubscriptionTier::Free, now());
        assert!(fresh.reset_date.unwrap() > now());
    }
}
