use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, to_bson, Bson, DateTime, Document};

use crate::db::DbConn;
use crate::engine::flight::InFlight;
use crate::engine::pending::PendingTransition;
use crate::engine::subscription;
use crate::guards::ActiveUserGuard;
use crate::models::{
    Role, UpdateProfileDto, UpgradeRequestDto, UploadReceiptDto, User, UserResponse,
};
use crate::routes::booking::booking_history;
use crate::utils::{validate_phone, ApiError, ApiResponse};

async fn refreshed_response(db: &DbConn, user: User) -> Result<UserResponse, ApiError> {
    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User record has no id"))?;
    let bookings = booking_history(db, user_id).await?;
    let mut user = user;
    user.password_hash = None;
    Ok(UserResponse::from_parts(user, bookings, DateTime::now()))
}

#[openapi(tag = "Users")]
#[put("/users/profile", data = "<dto>")]
pub async fn update_profile(
    db: &State<DbConn>,
    active: ActiveUserGuard,
    dto: Json<UpdateProfileDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user_id = active
        .user
        .id
        .ok_or_else(|| ApiError::internal_error("User record has no id"))?;
    let dto = dto.into_inner();

    if let Some(phone) = &dto.phone_number {
        if !validate_phone(phone) {
            return Err(ApiError::bad_request("Invalid phone number"));
        }
    }

    let mut set = Document::new();
    if let Some(value) = dto.full_name {
        set.insert("full_name", value);
    }
    if let Some(value) = dto.phone_number {
        set.insert("phone_number", value);
    }
    if let Some(value) = dto.state {
        set.insert("state", value);
    }
    if let Some(value) = dto.city {
        set.insert("city", value);
    }
    if let Some(value) = dto.other_city {
        set.insert("other_city", value);
    }
    if let Some(value) = dto.address {
        set.insert("address", value);
    }

    // Cleaner-only fields are ignored for clients rather than rejected.
    if active.user.role == Role::Cleaner {
        if let Some(value) = dto.bio {
            set.insert("bio", value);
        }
        if let Some(value) = dto.services {
            set.insert("services", value);
        }
        if let Some(value) = dto.experience_years {
            set.insert("experience_years", value);
        }
        if let Some(value) = dto.charge_hourly {
            set.insert("charge_hourly", value);
        }
        if let Some(value) = dto.charge_daily {
            set.insert("charge_daily", value);
        }
        if let Some(value) = dto.charge_per_contract {
            set.insert("charge_per_contract", value);
        }
        if let Some(value) = dto.charge_per_contract_negotiable {
            set.insert("charge_per_contract_negotiable", value);
        }
        if let Some(value) = dto.account_number {
            set.insert("account_number", value);
        }
        if let Some(value) = dto.bank_name {
            set.insert("bank_name", value);
        }
    }

    if set.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    set.insert("updated_at", DateTime::now());

    db.collection::<User>("users")
        .update_one(doc! { "_id": user_id }, doc! { "$set": set }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to update profile: {}", e)))?;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Profile updated".to_string(),
        refreshed_response(db, user).await?,
    )))
}

#[openapi(tag = "Subscriptions")]
#[post("/users/subscription/request-upgrade", data = "<dto>")]
pub async fn request_subscription_upgrade(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    active: ActiveUserGuard,
    dto: Json<UpgradeRequestDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user_id = active
        .user
        .id
        .ok_or_else(|| ApiError::internal_error("User record has no id"))?;

    let _permit = flights
        .acquire(format!("subscription:{}", user_id.to_hex()))
        .ok_or_else(|| {
            ApiError::conflict("Your subscription is being updated, please retry")
        })?;

    let target = dto.into_inner().plan;
    let pending = PendingTransition::new(
        active.user.clone(),
        subscription::request_upgrade(active.user, target)?,
    );

    let plan = to_bson(&target)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    let result = db
        .collection::<User>("users")
        .update_one(
            doc! { "_id": user_id, "pending_subscription": Bson::Null },
            doc! { "$set": {
                "pending_subscription": plan,
                "updated_at": DateTime::now(),
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to request upgrade: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict("An upgrade request is already pending"));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Upgrade requested, please upload your payment receipt".to_string(),
        refreshed_response(db, pending.commit()).await?,
    )))
}

#[openapi(tag = "Subscriptions")]
#[post("/users/subscription/receipt", data = "<dto>")]
pub async fn upload_subscription_receipt(
    db: &State<DbConn>,
    flights: &State<InFlight>,
    active: ActiveUserGuard,
    dto: Json<UploadReceiptDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user_id = active
        .user
        .id
        .ok_or_else(|| ApiError::internal_error("User record has no id"))?;

    let _permit = flights
        .acquire(format!("subscription:{}", user_id.to_hex()))
        .ok_or_else(|| {
            ApiError::conflict("Your subscription is being updated, please retry")
        })?;

    let receipt = dto.into_inner().receipt;
    let pending = PendingTransition::new(
        active.user.clone(),
        subscription::attach_receipt(active.user, receipt.clone())?,
    );

    let receipt_bson = to_bson(&receipt)
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    let result = db
        .collection::<User>("users")
        .update_one(
            doc! {
                "_id": user_id,
                "pending_subscription": { "$ne": Bson::Null },
                "subscription_receipt": Bson::Null,
            },
            doc! { "$set": {
                "subscription_receipt": receipt_bson,
                "updated_at": DateTime::now(),
            } },
            None,
        )
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to upload receipt: {}", e)))?;

    if result.matched_count == 0 {
        pending.roll_back();
        return Err(ApiError::conflict(
            "No pending upgrade is awaiting a receipt",
        ));
    }

    Ok(Json(ApiResponse::success_with_message(
        "Receipt uploaded, awaiting approval".to_string(),
        refreshed_response(db, pending.commit()).await?,
    )))
}
