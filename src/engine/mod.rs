//! The booking & payment lifecycle engine.
//!
//! Pure transition functions: given (entity, action, actor) they return either
//! the entity's new state or a rejection. No I/O happens here; the routes load
//! entities, run a transition, and persist the result.

pub mod booking;
pub mod error;
pub mod flight;
pub mod limits;
pub mod pending;
pub mod subscription;

pub use error::EngineError;

use mongodb::bson::oid::ObjectId;

use crate::models::{Role, User};

/// The party attempting a transition.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ObjectId,
    pub full_name: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_suspended: bool,
}

impl Actor {
    pub fn from_user(user: &User) -> Result<Self, EngineError> {
        let id = user
            .id
            .ok_or_else(|| EngineError::Validation("User has no id".to_string()))?;
        Ok(Actor {
            id,
            full_name: user.full_name.clone(),
            role: user.role,
            is_admin: user.is_admin,
            is_suspended: user.is_suspended,
        })
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use crate::models::{
        AccountType, BookingStatus, CreateReviewDto, Gender, PaymentMethod, PaymentStatus,
        Receipt, SubscriptionTier,
    };
    use mongodb::bson::DateTime;

    fn now() -> DateTime {
        DateTime::from_millis(1_750_000_000_000)
    }

    fn client() -> Actor {
        Actor {
            id: mongodb::bson::oid::ObjectId::new(),
            full_name: "Ada Obi".to_string(),
            role: Role::Client,
            is_admin: false,
            is_suspended: false,
        }
    }

    fn admin() -> Actor {
        Actor {
            id: mongodb::bson::oid::ObjectId::new(),
            full_name: "Admin".to_string(),
            role: Role::Client,
            is_admin: true,
            is_suspended: false,
        }
    }

    fn cleaner() -> User {
        User {
            id: Some(mongodb::bson::oid::ObjectId::new()),
            email: "chidi@example.com".to_string(),
            password_hash: None,
            full_name: "Chidi Okeke".to_string(),
            phone_number: "08012345678".to_string(),
            role: Role::Cleaner,
            gender: Gender::Male,
            state: "Lagos".to_string(),
            city: "Yaba".to_string(),
            other_city: None,
            address: "12 Herbert Macaulay Way".to_string(),
            account_type: AccountType::Individual,
            company_name: None,
            company_address: None,
            is_admin: false,
            is_suspended: false,
            experience_years: Some(4),
            services: Some(vec!["Deep Cleaning".to_string()]),
            bio: Some("Thorough and punctual".to_string()),
            nin: None,
            charge_hourly: Some(3000.0),
            charge_daily: None,
            charge_per_contract: None,
            charge_per_contract_negotiable: None,
            account_number: Some("0123456789".to_string()),
            bank_name: Some("GTBank".to_string()),
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
            name: "transfer.png".to_string(),
            data_url: "data:image/png;base64,AAAA".to_string(),
        }
    }

    /// The full escrow path, creation through payout and review, each stage
    /// feeding the next.
    #[test]
    fn escrow_booking_runs_creation_to_payout() {
        let client = client();
        let admin = admin();
        let cleaner = cleaner();
        let now = now();

        let booking =
            booking::create(&client, &cleaner, None, None, PaymentMethod::Escrow, now).unwrap();
        assert_eq!(booking.amount, 3000.0);
        assert_eq!(booking.total_amount, 3300.0);
        assert_eq!(booking.payment_status, PaymentStatus::PendingPayment);

        let booking = booking::attach_receipt(booking, receipt(), &client, now).unwrap();
        assert_eq!(
            booking.payment_status,
            PaymentStatus::PendingAdminConfirmation
        );

        let booking = booking::confirm_payment(booking, &admin, now).unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Confirmed);

        let booking = booking::approve_completion(booking, &client, now).unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        assert_eq!(booking.payment_status, PaymentStatus::PendingPayout);
        assert!(booking.job_approved_by_client);

        let booking = booking::mark_paid(booking, &admin, now).unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Paid);

        let dto = CreateReviewDto {
            cleaner_id: booking.cleaner_id.to_hex(),
            rating: 5,
            timeliness: 4,
            thoroughness: 5,
            conduct: 4,
            comment: "Spotless".to_string(),
        };
        let rating = booking::validate_review(&dto).unwrap();
        assert_eq!(rating, 4.5);
        let booking = booking::record_review(booking, &client, now).unwrap();
        assert!(booking.review_submitted);
    }

    /// A Free cleaner is full after one distinct client; upgrading through
    /// the approval flow reopens the gate.
    #[test]
    fn upgrade_approval_reopens_the_client_gate() {
        let admin = admin();
        let cleaner = cleaner();
        let now = now();

        let first = client();
        let second = client();

        let window = limits::UsageWindow::from_user(&cleaner);
        let window = limits::admit(window, SubscriptionTier::Free, first.id, now).unwrap();
        let err = limits::admit(window.clone(), SubscriptionTier::Free, second.id, now)
            .unwrap_err();
        assert!(matches!(err, EngineError::PlanLimitExceeded(_)));

        let user = subscription::request_upgrade(cleaner, SubscriptionTier::Standard).unwrap();
        let user = subscription::attach_receipt(user, receipt()).unwrap();
        let user = subscription::approve(user, &admin, now).unwrap();
        assert_eq!(user.subscription_tier, Some(SubscriptionTier::Standard));
        assert!(user.pending_subscription.is_none());
        assert!(user.subscription_receipt.is_none());

        let tier = subscription::effective_tier(
            user.subscription_tier.unwrap_or_default(),
            user.subscription_end_date,
            now,
        );
        assert_eq!(tier, SubscriptionTier::Standard);

        let window = limits::admit(window, tier, second.id, now).unwrap();
        assert_eq!(window.client_ids.len(), 2);
    }
}
