use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::models::Receipt;

/// Fixed at creation, immutable afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum PaymentMethod {
    Direct,
    Escrow,
}

/// Job lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum BookingStatus {
    Upcoming,
    Completed,
    Cancelled,
}

/// Escrow payment lifecycle. Direct bookings stay `NotApplicable` for their
/// entire lifetime; escrow bookings only ever move forward through the
/// remaining stages.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum PaymentStatus {
    #[serde(rename = "Pending Payment")]
    PendingPayment,
    #[serde(rename = "Pending Admin Confirmation")]
    PendingAdminConfirmation,
    Confirmed,
    #[serde(rename = "Pending Payout")]
    PendingPayout,
    Paid,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl PaymentStatus {
    /// Position along the escrow progression, `None` for direct bookings.
    pub fn stage(&self) -> Option<u8> {
        match self {
            PaymentStatus::PendingPayment => Some(0),
            PaymentStatus::PendingAdminConfirmation => Some(1),
            PaymentStatus::Confirmed => Some(2),
            PaymentStatus::PendingPayout => Some(3),
            PaymentStatus::Paid => Some(4),
            PaymentStatus::NotApplicable => None,
        }
    }

    /// Wire/storage representation, useful for query filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::PendingPayment => "Pending Payment",
            PaymentStatus::PendingAdminConfirmation => "Pending Admin Confirmation",
            PaymentStatus::Confirmed => "Confirmed",
            PaymentStatus::PendingPayout => "Pending Payout",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::NotApplicable => "Not Applicable",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub client_id: ObjectId,
    pub cleaner_id: ObjectId,
    // Denormalised so admin tables render without joins.
    pub client_name: String,
    pub cleaner_name: String,
    pub service: String,
    pub date: String,
    /// The cleaner's base charge.
    pub amount: f64,
    /// Derived once at creation (amount, or amount + escrow fee). Never recomputed.
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_receipt: Option<Receipt>,
    pub job_approved_by_client: bool,
    pub review_submitted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingDto {
    pub cleaner_id: String,
    pub service: Option<String>,
    pub date: Option<String>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceiptDto {
    pub receipt: Receipt,
}

#[derive(Debug, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub client_id: String,
    pub cleaner_id: String,
    pub client_name: String,
    pub cleaner_name: String,
    pub service: String,
    pub date: String,
    pub amount: f64,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_receipt: Option<Receipt>,
    pub job_approved_by_client: bool,
    pub review_submitted: bool,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        BookingResponse {
            id: booking.id.map(|id| id.to_hex()).unwrap_or_default(),
            client_id: booking.client_id.to_hex(),
            cleaner_id: booking.cleaner_id.to_hex(),
            client_name: booking.client_name,
            cleaner_name: booking.cleaner_name,
            service: booking.service,
            date: booking.date,
            amount: booking.amount,
            total_amount: booking.total_amount,
            payment_method: booking.payment_method,
            status: booking.status,
            payment_status: booking.payment_status,
            payment_receipt: booking.payment_receipt,
            job_approved_by_client: booking.job_approved_by_client,
            review_submitted: booking.review_submitted,
        }
    }
}
