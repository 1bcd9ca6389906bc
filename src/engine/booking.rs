//! Booking transitions: creation, cancellation, the escrow payment path and
//! review bookkeeping. Each function validates its preconditions and returns
//! the booking's next state without touching storage.

use mongodb::bson::DateTime;

use crate::engine::{Actor, EngineError};
use crate::models::{
    Booking, BookingStatus, CreateReviewDto, PaymentMethod, PaymentStatus, Receipt, Role, User,
};

/// Fallback base charge when a cleaner has no configured rate.
pub const DEFAULT_BASE_AMOUNT: f64 = 5000.0;
/// The escrow service fee on top of the cleaner's charge.
pub const ESCROW_FEE_RATE: f64 = 0.10;
pub const DEFAULT_SERVICE: &str = "General Cleaning";

/// The cleaner's first configured rate among hourly, daily and per-contract.
pub fn base_rate(cleaner: &User) -> f64 {
    cleaner
        .charge_hourly
        .or(cleaner.charge_daily)
        .or(cleaner.charge_per_contract)
        .unwrap_or(DEFAULT_BASE_AMOUNT)
}

/// Escrow total: base amount plus the 10% fee, rounded half-up to the kobo.
pub fn escrow_total(amount: f64) -> f64 {
    (amount * (1.0 + ESCROW_FEE_RATE) * 100.0).round() / 100.0
}

/// Derived once at creation and never recomputed afterwards.
pub fn quote_total(amount: f64, method: PaymentMethod) -> f64 {
    match method {
        PaymentMethod::Direct => amount,
        PaymentMethod::Escrow => escrow_total(amount),
    }
}

pub fn create(
    client: &Actor,
    cleaner: &User,
    service: Option<String>,
    date: Option<String>,
    method: PaymentMethod,
    now: DateTime,
) -> Result<Booking, EngineError> {
    if client.is_suspended {
        return Err(EngineError::Auth("Your account is suspended".to_string()));
    }
    if client.role != Role::Client {
        return Err(EngineError::Auth(
            "Only clients can create bookings".to_string(),
        ));
    }
    if cleaner.role != Role::Cleaner {
        return Err(EngineError::Validation("Cleaner not found".to_string()));
    }
    if cleaner.is_suspended {
        return Err(EngineError::Validation(
            "This cleaner is not currently accepting bookings".to_string(),
        ));
    }
    let cleaner_id = cleaner
        .id
        .ok_or_else(|| EngineError::Validation("Cleaner not found".to_string()))?;

    let amount = base_rate(cleaner);
    let total_amount = quote_total(amount, method);
    let service = service
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            cleaner
                .services
                .as_ref()
                .and_then(|types| types.first().cloned())
        })
        .unwrap_or_else(|| DEFAULT_SERVICE.to_string());
    let date = date.unwrap_or_else(|| {
        now.try_to_rfc3339_string()
            .map(|s| s.chars().take(10).collect())
            .unwrap_or_default()
    });

    Ok(Booking {
        id: None,
        client_id: client.id,
        cleaner_id,
        client_name: client.full_name.clone(),
        cleaner_name: cleaner.full_name.clone(),
        service,
        date,
        amount,
        total_amount,
        payment_method: method,
        status: BookingStatus::Upcoming,
        payment_status: match method {
            PaymentMethod::Direct => PaymentStatus::NotApplicable,
            PaymentMethod::Escrow => PaymentStatus::PendingPayment,
        },
        payment_receipt: None,
        job_approved_by_client: false,
        review_submitted: false,
        created_at: now,
        updated_at: now,
    })
}

fn require_booking_client(booking: &Booking, actor: &Actor) -> Result<(), EngineError> {
    if booking.client_id != actor.id {
        return Err(EngineError::Auth(
            "Only the booking's client can perform this action".to_string(),
        ));
    }
    Ok(())
}

fn require_admin(actor: &Actor) -> Result<(), EngineError> {
    if !actor.is_admin {
        return Err(EngineError::Auth("Admin access required".to_string()));
    }
    Ok(())
}

/// Cancel an upcoming booking. The payment status is left untouched: no
/// refund workflow exists, and a second cancel is an invalid-state rejection
/// rather than a silent success.
pub fn cancel(mut booking: Booking, actor: &Actor, now: DateTime) -> Result<Booking, EngineError> {
    require_booking_client(&booking, actor)?;
    match booking.status {
        BookingStatus::Upcoming => {}
        BookingStatus::Cancelled => {
            return Err(EngineError::InvalidState(
                "Booking is already cancelled".to_string(),
            ));
        }
        BookingStatus::Completed => {
            return Err(EngineError::InvalidState(
                "Completed bookings cannot be cancelled".to_string(),
            ));
        }
    }
    booking.status = BookingStatus::Cancelled;
    booking.updated_at = now;
    Ok(booking)
}

/// Attach the client's payment proof to an escrow booking awaiting payment.
pub fn attach_receipt(
    mut booking: Booking,
    receipt: Receipt,
    actor: &Actor,
    now: DateTime,
) -> Result<Booking, EngineError> {
    require_booking_client(&booking, actor)?;
    if booking.payment_method != PaymentMethod::Escrow {
        return Err(EngineError::Validation(
            "Direct bookings have no receipt upload path".to_string(),
        ));
    }
    if booking.payment_status != PaymentStatus::PendingPayment {
        return Err(EngineError::InvalidState(
            "A receipt can only be uploaded while payment is pending".to_string(),
        ));
    }
    booking.payment_receipt = Some(receipt);
    booking.payment_status = PaymentStatus::PendingAdminConfirmation;
    booking.updated_at = now;
    Ok(booking)
}

/// Admin acknowledges the client's escrow payment. Confirmed is a gate, not a
/// terminal payment state: it unlocks job-completion approval.
pub fn confirm_payment(
    mut booking: Booking,
    actor: &Actor,
    now: DateTime,
) -> Result<Booking, EngineError> {
    require_admin(actor)?;
    if booking.payment_status != PaymentStatus::PendingAdminConfirmation {
        return Err(EngineError::InvalidState(
            "Booking is not awaiting payment confirmation".to_string(),
        ));
    }
    booking.payment_status = PaymentStatus::Confirmed;
    booking.updated_at = now;
    Ok(booking)
}

/// Admin records the payout to the cleaner. Terminal payment state.
pub fn mark_paid(
    mut booking: Booking,
    actor: &Actor,
    now: DateTime,
) -> Result<Booking, EngineError> {
    require_admin(actor)?;
    if booking.payment_status != PaymentStatus::PendingPayout {
        return Err(EngineError::InvalidState(
            "Booking is not awaiting payout".to_string(),
        ));
    }
    booking.payment_status = PaymentStatus::Paid;
    booking.updated_at = now;
    Ok(booking)
}

/// Client acknowledges the work is done. Completing the job also moves the
/// held funds into the payout queue.
pub fn approve_completion(
    mut booking: Booking,
    actor: &Actor,
    now: DateTime,
) -> Result<Booking, EngineError> {
    require_booking_client(&booking, actor)?;
    if booking.status != BookingStatus::Upcoming {
        return Err(EngineError::InvalidState(
            "Only upcoming bookings can be completed".to_string(),
        ));
    }
    if booking.payment_method != PaymentMethod::Escrow {
        return Err(EngineError::Validation(
            "Completion approval applies to escrow bookings only".to_string(),
        ));
    }
    if booking.payment_status != PaymentStatus::Confirmed {
        return Err(EngineError::InvalidState(
            "Payment must be confirmed before the job can be completed".to_string(),
        ));
    }
    if booking.job_approved_by_client {
        return Err(EngineError::InvalidState(
            "Job completion has already been approved".to_string(),
        ));
    }
    booking.job_approved_by_client = true;
    booking.status = BookingStatus::Completed;
    booking.payment_status = PaymentStatus::PendingPayout;
    booking.updated_at = now;
    Ok(booking)
}

/// Check the rating breakdown and return the average to store on the review.
pub fn validate_review(dto: &CreateReviewDto) -> Result<f64, EngineError> {
    let axes = [dto.rating, dto.timeliness, dto.thoroughness, dto.conduct];
    if axes.iter().any(|&r| !(1..=5).contains(&r)) {
        return Err(EngineError::Validation(
            "Each rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(axes.iter().sum::<i32>() as f64 / axes.len() as f64)
}

/// Mark the booking as reviewed. At most one review per booking.
pub fn record_review(
    mut booking: Booking,
    actor: &Actor,
    now: DateTime,
) -> Result<Booking, EngineError> {
    require_booking_client(&booking, actor)?;
    if booking.status != BookingStatus::Completed {
        return Err(EngineError::InvalidState(
            "Only completed bookings can be reviewed".to_string(),
        ));
    }
    if booking.review_submitted {
        return Err(EngineError::InvalidState(
            "A review has already been submitted for this booking".to_string(),
        ));
    }
    booking.review_submitted = true;
    booking.updated_at = now;
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, Gender, SubscriptionTier};
    use mongodb::bson::oid::ObjectId;

    fn now() -> DateTime {
        DateTime::from_millis(1_750_000_000_000)
    }

    fn client_actor() -> Actor {
        Actor {
            id: ObjectId::new(),
            full_name: "Ada Obi".to_string(),
            role: Role::Client,
            is_admin: false,
            is_suspended: false,
        }
    }

    fn admin_actor() -> Actor {
        Actor {
            id: ObjectId::new(),
            full_name: "Admin".to_string(),
            role: Role::Client,
            is_admin: true,
            is_suspended: false,
        }
    }

    fn cleaner(hourly: Option<f64>) -> User {
        User {
            id: Some(ObjectId::new()),
            email: "chidi@example.com".to_string(),
            password_hash: None,
            full_name: "Chidi Eze".to_string(),
            phone_number: "08012345678".to_string(),
            role: Role::Cleaner,
            gender: Gender::Male,
            state: "Lagos".to_string(),
            city: "Ikeja".to_string(),
            other_city: None,
            address: "12 Allen Avenue".to_string(),
            account_type: AccountType::Individual,
            company_name: None,
            company_address: None,
            is_admin: false,
            is_suspended: false,
            experience_years: Some(4),
            services: Some(vec!["Deep Cleaning".to_string()]),
            bio: Some("Thorough and punctual".to_string()),
            nin: None,
            charge_hourly: hourly,
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

    fn escrow_booking(client: &Actor) -> Booking {
        create(
            client,
            &cleaner(Some(3000.0)),
            None,
            None,
            PaymentMethod::Escrow,
            now(),
        )
        .unwrap()
    }

    fn receipt() -> Receipt {
        Receipt {
            name: "transfer.png".to_string(),
            data_url: "data:image/png;base64,AAAA".to_string(),
        }
    }

    #[test]
    fn escrow_total_applies_ten_percent_markup() {
        assert_eq!(escrow_total(3000.0), 3300.0);
        assert_eq!(escrow_total(1234.5), 1357.95);
    }

    #[test]
    fn escrow_total_rounds_half_up_to_the_kobo() {
        // 1234.55 * 1.1 = 1358.005 → 1358.01
        assert_eq!(escrow_total(1234.55), 1358.01);
    }

    #[test]
    fn direct_booking_total_equals_amount_and_payment_is_not_applicable() {
        let client = client_actor();
        let booking = create(
            &client,
            &cleaner(Some(3000.0)),
            None,
            None,
            PaymentMethod::Direct,
            now(),
        )
        .unwrap();
        assert_eq!(booking.total_amount, 3000.0);
        assert_eq!(booking.payment_status, PaymentStatus::NotApplicable);
        assert_eq!(booking.status, BookingStatus::Upcoming);
    }

    #[test]
    fn escrow_booking_starts_pending_payment_with_marked_up_total() {
        let client = client_actor();
        let booking = escrow_booking(&client);
        assert_eq!(booking.amount, 3000.0);
        assert_eq!(booking.total_amount, 3300.0);
        assert_eq!(booking.payment_status, PaymentStatus::PendingPayment);
    }

    #[test]
    fn create_uses_default_amount_when_cleaner_has_no_rates() {
        let client = client_actor();
        let booking = create(
            &client,
            &cleaner(None),
            None,
            None,
            PaymentMethod::Direct,
            now(),
        )
        .unwrap();
        assert_eq!(booking.amount, DEFAULT_BASE_AMOUNT);
    }

    #[test]
    fn create_rejects_suspended_client() {
        let mut client = client_actor();
        client.is_suspended = true;
        let err = create(
            &client,
            &cleaner(None),
            None,
            None,
            PaymentMethod::Direct,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
    }

    #[test]
    fn create_rejects_suspended_cleaner() {
        let client = client_actor();
        let mut target = cleaner(None);
        target.is_suspended = true;
        let err = create(&client, &target, None, None, PaymentMethod::Direct, now()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn cancel_is_idempotent_rejecting() {
        let client = client_actor();
        let booking = escrow_booking(&client);
        let cancelled = cancel(booking, &client, now()).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        // Payment status untouched, no automatic reversal.
        assert_eq!(cancelled.payment_status, PaymentStatus::PendingPayment);

        let err = cancel(cancelled, &client, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn cancel_rejects_other_actors() {
        let client = client_actor();
        let booking = escrow_booking(&client);
        let stranger = client_actor();
        let err = cancel(booking, &stranger, now()).unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
    }

    #[test]
    fn receipt_upload_moves_escrow_booking_to_admin_confirmation() {
        let client = client_actor();
        let booking = escrow_booking(&client);
        let updated = attach_receipt(booking, receipt(), &client, now()).unwrap();
        assert_eq!(
            updated.payment_status,
            PaymentStatus::PendingAdminConfirmation
        );
        assert!(updated.payment_receipt.is_some());
    }

    #[test]
    fn receipt_upload_rejected_for_direct_bookings() {
        let client = client_actor();
        let booking = create(
            &client,
            &cleaner(Some(3000.0)),
            None,
            None,
            PaymentMethod::Direct,
            now(),
        )
        .unwrap();
        let err = attach_receipt(booking, receipt(), &client, now()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn receipt_upload_rejected_past_pending_payment() {
        let client = client_actor();
        let booking = escrow_booking(&client);
        let booking = attach_receipt(booking, receipt(), &client, now()).unwrap();
        let err = attach_receipt(booking, receipt(), &client, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn payment_status_only_moves_forward_through_the_escrow_stages() {
        let client = client_actor();
        let admin = admin_actor();
        let booking = escrow_booking(&client);
        let mut stages = vec![booking.payment_status.stage().unwrap()];

        let booking = attach_receipt(booking, receipt(), &client, now()).unwrap();
        stages.push(booking.payment_status.stage().unwrap());
        let booking = confirm_payment(booking, &admin, now()).unwrap();
        stages.push(booking.payment_status.stage().unwrap());
        let booking = approve_completion(booking, &client, now()).unwrap();
        stages.push(booking.payment_status.stage().unwrap());
        let booking = mark_paid(booking, &admin, now()).unwrap();
        stages.push(booking.payment_status.stage().unwrap());

        assert_eq!(stages, vec![0, 1, 2, 3, 4]);
        assert_eq!(booking.status, BookingStatus::Completed);
    }

    #[test]
    fn confirm_payment_requires_admin() {
        let client = client_actor();
        let booking = escrow_booking(&client);
        let booking = attach_receipt(booking, receipt(), &client, now()).unwrap();
        let err = confirm_payment(booking, &client, now()).unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
    }

    #[test]
    fn completion_requires_confirmed_payment() {
        let client = client_actor();
        let booking = escrow_booking(&client);
        let err = approve_completion(booking, &client, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn mark_paid_requires_pending_payout() {
        let client = client_actor();
        let admin = admin_actor();
        let booking = escrow_booking(&client);
        let err = mark_paid(booking, &admin, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn review_is_at_most_once_and_only_after_completion() {
        let client = client_actor();
        let admin = admin_actor();
        let booking = escrow_booking(&client);

        let err = record_review(booking.clone(), &client, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        let booking = attach_receipt(booking, receipt(), &client, now()).unwrap();
        let booking = confirm_payment(booking, &admin, now()).unwrap();
        let booking = approve_completion(booking, &client, now()).unwrap();

        let booking = record_review(booking, &client, now()).unwrap();
        assert!(booking.review_submitted);
        let err = record_review(booking, &client, now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn review_ratings_must_be_in_range() {
        let dto = CreateReviewDto {
            cleaner_id: ObjectId::new().to_hex(),
            rating: 5,
            timeliness: 4,
            thoroughness: 6,
            conduct: 5,
            comment: "Great".to_string(),
        };
        assert!(validate_review(&dto).is_err());

        let dto = CreateReviewDto { thoroughness: 4, ..dto };
        assert_eq!(validate_review(&dto).unwrap(), 4.5);
    }
}
