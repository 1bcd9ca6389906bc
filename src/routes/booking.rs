use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime};

use crate::db::DbConn;
use crate::engine::flight::InFlight;
use crate::engine::limits::{self, UsageWindow};
use crate::engine::pending::PendingTransition;
use crate::engine::{booking as engine, subscription, Actor};
use crate::guards::ActiveUserGuard;
use crate::models::{
    Booking, BookingResponse, CreateBookingDto, CreateReviewDto, PaymentStatus, Review,
    UploadReceiptDto, User, UserResponse,
};
use crate::utils::{ApiError, ApiResponse};

/// Every booking the user is a party to, on either side.
pub(crate) async fn booking_history(
    db: &DbConn,
    user_id: ObjectId,
) -> Result<Vec<Booking>, ApiError> {
    let mut cursor = db
        .collection::<Booking>("bookings")
        .find(
            doc! { "$or": [ { "client_id": user_id }, { "cleaner_id": user_id } ] },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut bookings = Vec::new();
    while let Some(booking) = cursor
        .try_next()
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
    {
        bookings.push(booking);
    }
    Ok(bookings)
}

async fn load_booking(db: &DbConn, id: ObjectId) -> Result<Booking, ApiError> {
    db.collection::<Booking>("bookings")
        .find_one(doc! { "_id": id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Booking not found"))
}

fn parse_object_id(id: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::bad_request(format!("Invalid {} id", what)))
}

#[openapi(tag = "Bookings")]
#[post("/bookings", data = "<dto>")]
pub async fn create_booking(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    active: ActiveUserGuard,
    dto: Json<CreateBookingDto>,
) -> Result<Json<ApiResponse<BookingResponse>>, ApiError> {
    let actor = Actor::from_user(&active.user)?;
    let cleaner_id = parse_object_id(&dto.cleaner_id, "cleaner")?;

    // One booking per cleaner at a time, so the usage window cannot be
    // read twice before either write lands.
    let _permit = flights
        .acquire(format!("cleaner:{}", cleaner_id.to_hex()))
        .ok_or_else(|| {
            ApiError::conflict("Another booking with this cleaner is in progress, please retry")
        })?;

    let cleaner = db
        .collection::<User>("users")
        .find_one(doc! { "_id": cleaner_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Cleaner not found"))?;

    let now = DateTime::now();
    let tier = subscription::effective_tier(
        cleaner.subscription_tier.unwrap_or_default(),
        cleaner.subscription_end_date,
        now,
    );
    let window = limits::admit(UsageWindow::from_user(&cleaner), tier, actor.id, now)?;

    let dto = dto.into_inner();
    let booking = engine::create(&actor, &cleaner, dto.service, dto.date, dto.payment_method, now)?;

    let client_ids = to_bson(&window.client_ids)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    db.collection::<User>("users")
        .update_one(
            doc! { "_id": cleaner_id },
            doc! { "$set": {
                "monthly_new_client_ids": client_ids,
                "monthly_usage_reset_date": window.reset_date,
                "updated_at": now,
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update usage window: {}", e)))?;

    let result = db
        .collection::<Booking>("bookings")
        .insert_one(&booking, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create booking: {}", e)))?;

    let mut booking = booking;
    booking.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Booking created successfully".to_string(),
        BookingResponse::from(booking),
    )))
}

#[openapi(tag = "Bookings")]
#[put("/bookings/<booking_id>/cancel")]
pub async fn cancel_booking(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    active: ActiveUserGuard,
    booking_id: &str,
) -> Result<Json<ApiResponse<BookingResponse>>, ApiError> {
    let actor = Actor::from_user(&active.user)?;
    let id = parse_object_id(booking_id, "booking")?;

    let _permit = flights
        .acquire(format!("booking:{}", id.to_hex()))
        .ok_or_else(|| ApiError::conflict("This booking is being updated, please retry"))?;

    let booking = load_booking(db, id).await?;
    let now = DateTime::now();
    let pending = PendingTransition::new(booking.clone(), engine::cancel(booking, &actor, now)?);

    // Conditional write: a stale read cannot cancel a booking that has
    // moved on since it was loaded.
    let result = db
        .collection::<Booking>("bookings")
        .update_one(
            doc! { "_id": id, "status": "Upcoming" },
            doc! { "$set": { "status": "Cancelled", "updated_at": now } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to cancel booking: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict(
            "Booking changed while cancelling, please refresh",
        ));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Booking cancelled".to_string(),
        BookingResponse::from(pending.commit()),
    )))
}

#[openapi(tag = "Bookings")]
#[post("/bookings/<booking_id>/complete")]
pub async fn complete_booking(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    active: ActiveUserGuard,
    booking_id: &str,
) -> Result<Json<ApiResponse<BookingResponse>>, ApiError> {
    let actor = Actor::from_user(&active.user)?;
    let id = parse_object_id(booking_id, "booking")?;

    let _permit = flights
        .acquire(format!("booking:{}", id.to_hex()))
        .ok_or_else(|| ApiError::conflict("This booking is being updated, please retry"))?;

    let booking = load_booking(db, id).await?;
    let now = DateTime::now();
    let pending = PendingTransition::new(
        booking.clone(),
        engine::approve_completion(booking, &actor, now)?,
    );

    let result = db
        .collection::<Booking>("bookings")
        .update_one(
            doc! {
                "_id": id,
                "status": "Upcoming",
                "payment_status": PaymentStatus::Confirmed.as_str(),
                "job_approved_by_client": false,
            },
            doc! { "$set": {
                "status": "Completed",
                "payment_status": PaymentStatus::PendingPayout.as_str(),
                "job_approved_by_client": true,
                "updated_at": now,
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to complete booking: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict(
            "Booking changed while completing, please refresh",
        ));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Job completion approved".to_string(),
        BookingResponse::from(pending.commit()),
    )))
}

/// Attaching the proof of payment moves the booking to admin review and
/// hands the caller back their refreshed profile, bookings included.
#[openapi(tag = "Bookings")]
#[post("/bookings/<booking_id>/receipt", data = "<dto>")]
pub async fn upload_booking_receipt(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    active: ActiveUserGuard,
    booking_id: &str,
    dto: Json<UploadReceiptDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let actor = Actor::from_user(&active.user)?;
    let id = parse_object_id(booking_id, "booking")?;

    let _permit = flights
        .acquire(format!("booking:{}", id.to_hex()))
        .ok_or_else(|| ApiError::conflict("This booking is being updated, please retry"))?;

    let booking = load_booking(db, id).await?;
    let now = DateTime::now();
    let receipt = dto.into_inner().receipt;
    let pending = PendingTransition::new(
        booking.clone(),
        engine::attach_receipt(booking, receipt.clone(), &actor, now)?,
    );

    let receipt_bson = to_bson(&receipt)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    let result = db
        .collection::<Booking>("bookings")
        .update_one(
            doc! { "_id": id, "payment_status": PaymentStatus::PendingPayment.as_str() },
            doc! { "$set": {
                "payment_status": PaymentStatus::PendingAdminConfirmation.as_str(),
                "payment_receipt": receipt_bson,
                "updated_at": now,
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to upload receipt: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict(
            "A receipt has already been uploaded for this booking",
        ));
    }
    pending.commit();

    let user_id = active
        .user
        .id
        .ok_or_else(|| ApiError::internal_error("User record has no id"))?;
    let bookings = booking_history(db, user_id).await?;
    let mut user = active.user;
    user.password_hash = None;

    Ok(Json(ApiResponse::success_with_message(
        "Receipt uploaded, awaiting confirmation".to_string(),
        UserResponse::from_parts(user, bookings, now),
    )))
}

#[openapi(tag = "Bookings")]
#[post("/bookings/<booking_id>/review", data = "<dto>")]
pub async fn submit_review(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    active: ActiveUserGuard,
    booking_id: &str,
    dto: Json<CreateReviewDto>,
) -> Result<Json<ApiResponse<BookingResponse>>, ApiError> {
    let actor = Actor::from_user(&active.user)?;
    let id = parse_object_id(booking_id, "booking")?;

    let _permit = flights
        .acquire(format!("booking:{}", id.to_hex()))
        .ok_or_else(|| ApiError::conflict("This booking is being updated, please retry"))?;

    let booking = load_booking(db, id).await?;
    let dto = dto.into_inner();
    let cleaner_id = parse_object_id(&dto.cleaner_id, "cleaner")?;
    if cleaner_id != booking.cleaner_id {
        return Err(ApiError::bad_request("Review does not match this booking"));
    }

    let rating = engine::validate_review(&dto)?;
    let now = DateTime::now();
    let pending =
        PendingTransition::new(booking.clone(), engine::record_review(booking, &actor, now)?);

    let result = db
        .collection::<Booking>("bookings")
        .update_one(
            doc! { "_id": id, "status": "Completed", "review_submitted": false },
            doc! { "$set": { "review_submitted": true, "updated_at": now } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to submit review: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict(
            "A review has already been submitted for this booking",
        ));
    }

    let review = Review {
        id: None,
        booking_id: id,
        cleaner_id,
        client_id: actor.id,
        reviewer_name: actor.full_name.clone(),
        rating,
        timeliness: dto.timeliness,
        thoroughness: dto.thoroughness,
        conduct: dto.conduct,
        comment: dto.comment,
        created_at: now,
    };
    db.collection::<Review>("reviews")
        .insert_one(&review, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to store review: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "Review submitted".to_string(),
        BookingResponse::from(pending.commit()),
    )))
}
