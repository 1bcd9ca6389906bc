use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Deserialize;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Bson, DateTime};

use crate::db::DbConn;
use crate::engine::flight::InFlight;
use crate::engine::pending::PendingTransition;
use crate::engine::{booking as engine, subscription, Actor};
use crate::guards::AdminGuard;
use crate::models::{Booking, BookingResponse, PaymentStatus, Review, User, UserResponse};
use crate::utils::{ApiError, ApiResponse};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStatusDto {
    pub is_suspended: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentActionDto {
    pub booking_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveSubscriptionDto {
    pub user_id: String,
}

fn parse_object_id(id: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::bad_request(format!("Invalid {} id", what)))
}

async fn load_booking(db: &DbConn, id: ObjectId) -> Result<Booking, ApiError> {
    db.collection::<Booking>("bookings")
        .find_one(doc! { "_id": id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Booking not found"))
}

/// Every non-admin account with its bookings folded in, for the back-office
/// user table.
#[openapi(tag = "Admin")]
#[get("/admin/users")]
pub async fn get_all_users(
    db: &State<DbConn>,
    _admin: AdminGuard,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let mut cursor = db
        .collection::<User>("users")
        .find(doc! { "is_admin": false }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut users = Vec::new();
    while let Some(user) = cursor
        .try_next()
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
    {
        users.push(user);
    }

    let mut cursor = db
        .collection::<Booking>("bookings")
        .find(doc! {}, None)
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

    let now = DateTime::now();
    let responses = users
        .into_iter()
        .map(|user| {
            let history: Vec<Booking> = user
                .id
                .map(|id| {
                    bookings
                        .iter()
                        .filter(|b| b.client_id == id || b.cleaner_id == id)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            let mut user = user;
            user.password_hash = None;
            UserResponse::from_parts(user, history, now)
        })
        .collect();

    Ok(Json(ApiResponse::success(responses)))
}

#[openapi(tag = "Admin")]
#[put("/users/<user_id>/status", data = "<dto>")]
pub async fn update_user_status(
    db: &State<DbConn>,
    _admin: AdminGuard,
    user_id: &str,
    dto: Json<UpdateUserStatusDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let id = parse_object_id(user_id, "user")?;

    let result = db
        .collection::<User>("users")
        .update_one(
            doc! { "_id": id, "is_admin": false },
            doc! { "$set": {
                "is_suspended": dto.is_suspended,
                "updated_at": DateTime::now(),
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update status: {}", e)))?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    let message = if dto.is_suspended {
        "User suspended"
    } else {
        "User reinstated"
    };
    Ok(Json(ApiResponse::success_with_message(
        message.to_string(),
        serde_json::json!({ "id": id.to_hex(), "isSuspended": dto.is_suspended }),
    )))
}

/// Removes the account together with its bookings and reviews.
#[openapi(tag = "Admin")]
#[delete("/users/<user_id>")]
pub async fn delete_user(
    db: &State<DbConn>,
    _admin: AdminGuard,
    user_id: &str,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let id = parse_object_id(user_id, "user")?;

    let result = db
        .collection::<User>("users")
        .delete_one(doc! { "_id": id, "is_admin": false }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete user: {}", e)))?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    db.collection::<Booking>("bookings")
        .delete_many(
            doc! { "$or": [ { "client_id": id }, { "cleaner_id": id } ] },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete bookings: {}", e)))?;

    db.collection::<Review>("reviews")
        .delete_many(
            doc! { "$or": [ { "client_id": id }, { "cleaner_id": id } ] },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to delete reviews: {}", e)))?;

    Ok(Json(ApiResponse::success_with_message(
        "User deleted".to_string(),
        serde_json::json!({ "id": id.to_hex() }),
    )))
}

#[openapi(tag = "Admin")]
#[post("/admin/payments/confirm", data = "<dto>")]
pub async fn confirm_payment(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    admin: AdminGuard,
    dto: Json<PaymentActionDto>,
) -> Result<Json<ApiResponse<BookingResponse>>, ApiError> {
    let actor = Actor::from_user(&admin.user)?;
    let id = parse_object_id(&dto.booking_id, "booking")?;

    let _permit = flights
        .acquire(format!("booking:{}", id.to_hex()))
        .ok_or_else(|| ApiError::conflict("This booking is being updated, please retry"))?;

    let booking = load_booking(db, id).await?;
    let now = DateTime::now();
    let pending = PendingTransition::new(
        booking.clone(),
        engine::confirm_payment(booking, &actor, now)?,
    );

    let result = db
        .collection::<Booking>("bookings")
        .update_one(
            doc! {
                "_id": id,
                "payment_status": PaymentStatus::PendingAdminConfirmation.as_str(),
            },
            doc! { "$set": {
                "payment_status": PaymentStatus::Confirmed.as_str(),
                "updated_at": now,
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to confirm payment: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict(
            "Booking is not awaiting payment confirmation",
        ));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Payment confirmed".to_string(),
        BookingResponse::from(pending.commit()),
    )))
}

#[openapi(tag = "Admin")]
#[post("/admin/payments/mark-paid", data = "<dto>")]
pub async fn mark_paid(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    admin: AdminGuard,
    dto: Json<PaymentActionDto>,
) -> Result<Json<ApiResponse<BookingResponse>>, ApiError> {
    let actor = Actor::from_user(&admin.user)?;
    let id = parse_object_id(&dto.booking_id, "booking")?;

    let _permit = flights
        .acquire(format!("booking:{}", id.to_hex()))
        .ok_or_else(|| ApiError::conflict("This booking is being updated, please retry"))?;

    let booking = load_booking(db, id).await?;
    let now = DateTime::now();
    let pending =
        PendingTransition::new(booking.clone(), engine::mark_paid(booking, &actor, now)?);

    let result = db
        .collection::<Booking>("bookings")
        .update_one(
            doc! { "_id": id, "payment_status": PaymentStatus::PendingPayout.as_str() },
            doc! { "$set": {
                "payment_status": PaymentStatus::Paid.as_str(),
                "updated_at": now,
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to mark paid: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict("Booking is not awaiting payout"));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Cleaner payout recorded".to_string(),
        BookingResponse::from(pending.commit()),
    )))
}

#[openapi(tag = "Admin")]
#[post("/admin/subscriptions/approve", data = "<dto>")]
pub async fn approve_subscription(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    admin: AdminGuard,
    dto: Json<ApproveSubscriptionDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let actor = Actor::from_user(&admin.user)?;
    let id = parse_object_id(&dto.user_id, "user")?;

    let _permit = flights
        .acquire(format!("subscription:{}", id.to_hex()))
        .ok_or_else(|| {
            ApiError::conflict("This subscription is being updated, please retry")
        })?;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let now = DateTime::now();
    let pending =
        PendingTransition::new(user.clone(), subscription::approve(user, &actor, now)?);

    let tier = to_bson(&pending.proposed().subscription_tier)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    let result = db
        .collection::<User>("users")
        .update_one(
            doc! {
                "_id": id,
                "pending_subscription": { "$ne": Bson::Null },
                "subscription_receipt": { "$ne": Bson::Null },
            },
            doc! { "$set": {
                "subscription_tier": tier,
                "subscription_end_date": pending.proposed().subscription_end_date,
                "pending_subscription": Bson::Null,
                "subscription_receipt": Bson::Null,
                "updated_at": now,
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to approve subscription: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict(
            "No upgrade request with a receipt is pending for this user",
        ));
    }

    let mut user = pending.commit();
    user.password_hash = None;

    Ok(Json(ApiResponse::success_with_message(
        "Subscription approved".to_string(),
        UserResponse::from_parts(user, Vec::new(), now),
    )))
}
