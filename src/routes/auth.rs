use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, DateTime};

use crate::db::DbConn;
use crate::guards::ActiveUserGuard;
use crate::models::{LoginDto, RegisterDto, Role, SubscriptionTier, User, UserResponse};
use crate::routes::booking::booking_history;
use crate::services::JwtService;
use crate::utils::{validate_email, validate_password, validate_phone, ApiError, ApiResponse};

const USAGE_PERIOD_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<dto>")]
pub async fn register(
    db: &State<DbConn>,
    dto: Json<RegisterDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    if !validate_email(&dto.email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if !validate_phone(&dto.phone_number) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }
    if !validate_password(&dto.password) {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let existing = db
        .collection::<User>("users")
        .find_one(doc! { "email": &dto.email }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    if existing.is_some() {
        return Err(ApiError::conflict("A user with this email already exists"));
    }

    let password_hash = bcrypt::hash(&dto.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_error(format!("Failed to hash password: {}", e)))?;

    let now = DateTime::now();
    let is_cleaner = dto.role == Role::Cleaner;
    let dto = dto.into_inner();

    let user = User {
        id: None,
        email: dto.email,
        password_hash: Some(password_hash),
        full_name: dto.full_name,
        phone_number: dto.phone_number,
        role: dto.role,
        gender: dto.gender,
        state: dto.state,
        city: dto.city,
        other_city: dto.other_city,
        address: dto.address,
        account_type: dto.account_type,
        company_name: dto.company_name,
        company_address: dto.company_address,
        is_admin: false,
        is_suspended: false,
        experience_years: dto.experience_years.filter(|_| is_cleaner),
        services: dto.services.filter(|_| is_cleaner),
        bio: dto.bio.filter(|_| is_cleaner),
        nin: dto.nin.filter(|_| is_cleaner),
        charge_hourly: dto.charge_hourly.filter(|_| is_cleaner),
        charge_daily: dto.charge_daily.filter(|_| is_cleaner),
        charge_per_contract: dto.charge_per_contract.filter(|_| is_cleaner),
        charge_per_contract_negotiable: dto.charge_per_contract_negotiable.filter(|_| is_cleaner),
        account_number: dto.account_number.filter(|_| is_cleaner),
        bank_name: dto.bank_name.filter(|_| is_cleaner),
        subscription_tier: is_cleaner.then(SubscriptionTier::default),
        pending_subscription: None,
        subscription_receipt: None,
        subscription_end_date: None,
        monthly_new_client_ids: Vec::new(),
        monthly_usage_reset_date: is_cleaner
            .then(|| DateTime::from_millis(now.timestamp_millis() + USAGE_PERIOD_MS)),
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<User>("users")
        .insert_one(&user, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create user: {}", e)))?;

    let mut user = user;
    user.id = result.inserted_id.as_object_id();
    user.password_hash = None;

    Ok(Json(ApiResponse::success_with_message(
        "Account created successfully".to_string(),
        UserResponse::from_parts(user, Vec::new(), now),
    )))
}

#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<dto>")]
pub async fn login(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "email": &dto.email }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let valid = bcrypt::verify(&dto.password, hash)
        .map_err(|e| ApiError::internal_error(format!("Password check failed: {}", e)))?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if user.is_suspended {
        return Err(ApiError::forbidden(
            "Your account has been suspended. Please contact support.",
        ));
    }

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User record has no id"))?;

    let token = JwtService::generate_token(&user_id, &user.email)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let bookings = booking_history(db, user_id).await?;
    let mut user = user;
    user.password_hash = None;
    let user_response = UserResponse::from_parts(user, bookings, DateTime::now());

    Ok(Json(ApiResponse::success(serde_json::json!({
        "token": token,
        "user": user_response,
    }))))
}

#[openapi(tag = "Auth")]
#[get("/auth/me")]
pub async fn me(
    db: &State<DbConn>,
    active: ActiveUserGuard,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user_id = active
        .user
        .id
        .ok_or_else(|| ApiError::internal_error("User record has no id"))?;

    let bookings = booking_history(db, user_id).await?;
    let mut user = active.user;
    user.password_hash = None;

    Ok(Json(ApiResponse::success(UserResponse::from_parts(
        user,
        bookings,
        DateTime::now(),
    ))))
}
