use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::models::{Booking, BookingResponse, Receipt, ReviewResponse, SubscriptionTier};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Cleaner,
}

/// Decided once at registration and carried as a typed field; never parsed
/// back out of display strings.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum AccountType {
    Individual,
    Company,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub phone_number: String,
    pub role: Role,
    pub gender: Gender,
    pub state: String,
    pub city: String,
    pub other_city: Option<String>,
    pub address: String,
    pub account_type: AccountType,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_suspended: bool,

    // Cleaner-only fields
    pub experience_years: Option<i32>,
    pub services: Option<Vec<String>>,
    pub bio: Option<String>,
    pub nin: Option<String>,
    pub charge_hourly: Option<f64>,
    pub charge_daily: Option<f64>,
    pub charge_per_contract: Option<f64>,
    pub charge_per_contract_negotiable: Option<bool>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub pending_subscription: Option<SubscriptionTier>,
    pub subscription_receipt: Option<Receipt>,
    pub subscription_end_date: Option<DateTime>,
    #[serde(default)]
    pub monthly_new_client_ids: Vec<ObjectId>,
    pub monthly_usage_reset_date: Option<DateTime>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDto {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: Role,
    pub gender: Gender,
    pub state: String,
    pub city: String,
    pub other_city: Option<String>,
    pub address: String,
    pub account_type: AccountType,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    // Cleaner-only
    pub experience_years: Option<i32>,
    pub services: Option<Vec<String>>,
    pub bio: Option<String>,
    pub nin: Option<String>,
    pub charge_hourly: Option<f64>,
    pub charge_daily: Option<f64>,
    pub charge_per_contract: Option<f64>,
    pub charge_per_contract_negotiable: Option<bool>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileDto {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub other_city: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub services: Option<Vec<String>>,
    pub experience_years: Option<i32>,
    pub charge_hourly: Option<f64>,
    pub charge_daily: Option<f64>,
    pub charge_per_contract: Option<f64>,
    pub charge_per_contract_negotiable: Option<bool>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpgradeRequestDto {
    pub plan: SubscriptionTier,
}

#[derive(Debug, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub role: Role,
    pub gender: Gender,
    pub state: String,
    pub city: String,
    pub other_city: Option<String>,
    pub address: String,
    pub account_type: AccountType,
    pub company_name: Option<String>,
    pub is_admin: bool,
    pub is_suspended: bool,
    pub experience_years: Option<i32>,
    pub services: Option<Vec<String>>,
    pub bio: Option<String>,
    pub charge_hourly: Option<f64>,
    pub charge_daily: Option<f64>,
    pub charge_per_contract: Option<f64>,
    pub charge_per_contract_negotiable: Option<bool>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
    /// Expiry-aware tier for display and gating; the stored tier is never
    /// auto-demoted.
    pub effective_tier: Option<SubscriptionTier>,
    pub pending_subscription: Option<SubscriptionTier>,
    pub subscription_receipt: Option<Receipt>,
    pub subscription_end_date: Option<String>,
    pub monthly_new_client_ids: Vec<String>,
    pub monthly_usage_reset_date: Option<String>,
    pub booking_history: Vec<BookingResponse>,
}

impl UserResponse {
    pub fn from_parts(user: User, bookings: Vec<Booking>, now: DateTime) -> Self {
        let effective_tier = user.subscription_tier.map(|tier| {
            crate::engine::subscription::effective_tier(tier, user.subscription_end_date, now)
        });
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email,
            full_name: user.full_name,
            phone_number: user.phone_number,
            role: user.role,
            gender: user.gender,
            state: user.state,
            city: user.city,
            other_city: user.other_city,
            address: user.address,
            account_type: user.account_type,
            company_name: user.company_name,
            is_admin: user.is_admin,
            is_suspended: user.is_suspended,
            experience_years: user.experience_years,
            services: user.services,
            bio: user.bio,
            charge_hourly: user.charge_hourly,
            charge_daily: user.charge_daily,
            charge_per_contract: user.charge_per_contract,
            charge_per_contract_negotiable: user.charge_per_contract_negotiable,
            account_number: user.account_number,
            bank_name: user.bank_name,
            subscription_tier: user.subscription_tier,
            effective_tier,
            pending_subscription: user.pending_subscription,
            subscription_receipt: user.subscription_receipt,
            subscription_end_date: user
                .subscription_end_date
                .and_then(|d| d.try_to_rfc3339_string().ok()),
            monthly_new_client_ids: user
                .monthly_new_client_ids
                .iter()
                .map(|id| id.to_hex())
                .collect(),
            monthly_usage_reset_date: user
                .monthly_usage_reset_date
                .and_then(|d| d.try_to_rfc3339_string().ok()),
            booking_history: bookings.into_iter().map(BookingResponse::from).collect(),
        }
    }
}

/// Public listing entry for a cleaner, with review aggregates folded in.
#[derive(Debug, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CleanerCardResponse {
    pub id: String,
    pub name: String,
    pub rating: f64,
    pub reviews: usize,
    pub service_types: Vec<String>,
    pub state: String,
    pub city: String,
    pub other_city: Option<String>,
    pub experience: i32,
    pub bio: String,
    pub cleaner_type: AccountType,
    pub phone_number: String,
    pub charge_hourly: Option<f64>,
    pub charge_daily: Option<f64>,
    pub charge_per_contract: Option<f64>,
    pub charge_per_contract_negotiable: Option<bool>,
    pub subscription_tier: SubscriptionTier,
    pub reviews_data: Vec<ReviewResponse>,
}

impl CleanerCardResponse {
    pub fn from_parts(user: User, reviews: Vec<ReviewResponse>, now: DateTime) -> Self {
        let tier = user.subscription_tier.unwrap_or_default();
        let effective = crate::engine::subscription::effective_tier(
            tier,
            user.subscription_end_date,
            now,
        );
        let count = reviews.len();
        let rating = if count > 0 {
            reviews.iter().map(|r| r.rating).sum::<f64>() / count as f64
        } else {
            0.0
        };
        CleanerCardResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.full_name,
            rating,
            reviews: count,
            service_types: user.services.unwrap_or_default(),
            state: user.state,
            city: user.city,
            other_city: user.other_city,
            experience: user.experience_years.unwrap_or(0),
            bio: user.bio.unwrap_or_default(),
            cleaner_type: user.account_type,
            phone_number: user.phone_number,
            charge_hourly: user.charge_hourly,
            charge_daily: user.charge_daily,
            charge_per_contract: user.charge_per_contract,
            charge_per_contract_negotiable: user.charge_per_contract_negotiable,
            subscription_tier: effective,
            reviews_data: reviews,
        }
    }
}
