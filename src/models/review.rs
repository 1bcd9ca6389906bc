use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub booking_id: ObjectId,
    pub cleaner_id: ObjectId,
    pub client_id: ObjectId,
    pub reviewer_name: String,
    /// Average of the four rating axes.
    pub rating: f64,
    pub timeliness: i32,
    pub thoroughness: i32,
    pub conduct: i32,
    pub comment: String,
    pub created_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewDto {
    pub cleaner_id: String,
    pub rating: i32,
    pub timeliness: i32,
    pub thoroughness: i32,
    pub conduct: i32,
    pub comment: String,
}

#[derive(Debug, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub reviewer_name: String,
    pub rating: f64,
    pub timeliness: i32,
    pub thoroughness: i32,
    pub conduct: i32,
    pub comment: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        ReviewResponse {
            reviewer_name: review.reviewer_name,
            rating: review.rating,
            timeliness: review.timeliness,
            thoroughness: review.thoroughness,
            conduct: review.conduct,
            comment: review.comment,
        }
    }
}
