//! Subscription upgrade lifecycle: a cleaner requests a plan, uploads a
//! payment receipt, and an admin approves. Expiry is a derived read model,
//! never a stored mutation.

use mongodb::bson::DateTime;

use crate::engine::{Actor, EngineError};
use crate::models::{Receipt, Role, SubscriptionTier, User};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Expiry-aware tier: past the end date the plan reverts to Free for display
/// and gating, without touching the stored tier.
pub fn effective_tier(
    tier: SubscriptionTier,
    end_date: Option<DateTime>,
    now: DateTime,
) -> SubscriptionTier {
    if tier == SubscriptionTier::Free {
        return SubscriptionTier::Free;
    }
    match end_date {
        Some(end) if end < now => SubscriptionTier::Free,
        _ => tier,
    }
}

/// A cleaner asks to move to a paid plan. At most one request may be pending.
pub fn request_upgrade(mut user: User, target: SubscriptionTier) -> Result<User, EngineError> {
    if user.role != Role::Cleaner {
        return Err(EngineError::Auth(
            "Only cleaners can request a subscription upgrade".to_string(),
        ));
    }
    if user.pending_subscription.is_some() {
        return Err(EngineError::InvalidState(
            "An upgrade request is already pending".to_string(),
        ));
    }
    if target == SubscriptionTier::Free {
        return Err(EngineError::Validation(
            "The Free plan cannot be requested as an upgrade".to_string(),
        ));
    }
    if user.subscription_tier == Some(target) {
        return Err(EngineError::Validation(
            "You are already on this plan".to_string(),
        ));
    }
    user.pending_subscription = Some(target);
    Ok(user)
}

/// Attach the payment proof to the pending request.
pub fn attach_receipt(mut user: User, receipt: Receipt) -> Result<User, EngineError> {
    if user.pending_subscription.is_none() {
        return Err(EngineError::InvalidState(
            "No upgrade request is pending".to_string(),
        ));
    }
    if user.subscription_receipt.is_some() {
        return Err(EngineError::InvalidState(
            "A receipt has already been uploaded for this request".to_string(),
        ));
    }
    user.subscription_receipt = Some(receipt);
    Ok(user)
}

/// Admin approval: the pending plan becomes the stored tier, the end date is
/// set one plan period out, and the request is cleared.
pub fn approve(mut user: User, actor: &Actor, now: DateTime) -> Result<User, EngineError> {
    if !actor.is_admin {
        return Err(EngineError::Auth("Admin access required".to_string()));
    }
    let target = user.pending_subscription.ok_or_else(|| {
        EngineError::InvalidState("No upgrade request is pending".to_string())
    })?;
    if user.subscription_receipt.is_none() {
        return Err(EngineError::InvalidState(
            "The request has no payment receipt yet".to_string(),
        ));
    }
    user.subscription_tier = Some(target);
    user.subscription_end_date = Some(DateTime::from_millis(
        now.timestamp_millis() + target.period_days() * MILLIS_PER_DAY,
    ));
    user.pending_subscription = None;
    user.subscription_receipt = None;
    user.updated_at = now;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, Gender};
    use mongodb::bson::oid::ObjectId;

    fn now() -> DateTime {
        DateTime::from_millis(1_750_000_000_000)
    }

    fn admin() -> Actor {
        Actor {
            id: ObjectId::new(),
            full_name: "Admin".to_string(),
            role: Role::Client,
            is_admin: true,
            is_suspended: false,
        }
    }

    fn cleaner() -> User {
        User {
            id: Some(ObjectId::new()),
            email: "ngozi@example.com".to_string(),
            password_hash: None,
            full_name: "Ngozi Ade".to_string(),
            phone_number: "08098765432".to_string(),
            role: Role::Cleaner,
            gender: Gender::Female,
            state: "Lagos".to_string(),
            city: "Lekki".to_string(),
            other_city: None,
            address: "4 Admiralty Way".to_string(),
            account_type: AccountType::Individual,
            company_name: None,
            company_address: None,
            is_admin: false,
            is_suspended: false,
            experience_years: Some(2),
            services: None,
            bio: None,
            nin: None,
            charge_hourly: Some(2500.0),
            charge_daily: None,
            charge_per_contract: None,
            charge_per_contract_negotiable: None,
            account_number: None,
            bank_name: None,
            subscription_tier: Some(SubscriptionTier::Free),
            pending_subscription: None,
            subscription_receipt: None,
            subscription_end_date: None,
            monthly_new_client_ids: Vec::new(),
            monthly_usage_reset_date: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn receipt() -> Receipt {
        Receipt {
            name: "sub.png".to_string(),
            data_url: "data:image/png;base64,BBBB".to_string(),
        }
    }

    #[test]
    fn full_upgrade_flow_sets_tier_and_clears_request() {
        let user = request_upgrade(cleaner(), SubscriptionTier::Standard).unwrap();
        assert_eq!(user.pending_subscription, Some(SubscriptionTier::Standard));

        let user = attach_receipt(user, receipt()).unwrap();
        let user = approve(user, &admin(), now()).unwrap();

        assert_eq!(user.subscription_tier, Some(SubscriptionTier::Standard));
        assert!(user.pending_subscription.is_none());
        assert!(user.subscription_receipt.is_none());
        let end = user.subscription_end_date.unwrap();
        assert!(end > now());
    }

    #[test]
    fn at_most_one_pending_request() {
        let user = request_upgrade(cleaner(), SubscriptionTier::Standard).unwrap();
        let err = request_upgrade(user, SubscriptionTier::Pro).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn approval_requires_a_receipt() {
        let user = request_upgrade(cleaner(), SubscriptionTier::Pro).unwrap();
        let err = approve(user, &admin(), now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn receipt_cannot_be_attached_twice() {
        let user = request_upgrade(cleaner(), SubscriptionTier::Pro).unwrap();
        let user = attach_receipt(user, receipt()).unwrap();
        let err = attach_receipt(user, receipt()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn clients_cannot_request_upgrades() {
        let mut user = cleaner();
        user.role = Role::Client;
        let err = request_upgrade(user, SubscriptionTier::Standard).unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
    }

    #[test]
    fn effective_tier_reverts_to_free_after_expiry() {
        let end = DateTime::from_millis(now().timestamp_millis() - 1);
        assert_eq!(
            effective_tier(SubscriptionTier::Pro, Some(end), now()),
            SubscriptionTier::Free
        );
        let end = DateTime::from_millis(now().timestamp_millis() + MILLIS_PER_DAY);
        assert_eq!(
            effective_tier(SubscriptionTier::Pro, Some(end), now()),
            SubscriptionTier::Pro
        );
        // Paid tier without an end date stays active.
        assert_eq!(
            effective_tier(SubscriptionTier::Pro, None, now()),
            SubscriptionTier::Pro
        );
    }
}
