use std::collections::HashMap;

use rocket::futures::TryStreamExt;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use mongodb::bson::{doc, oid::ObjectId, DateTime};

use crate::db::DbConn;
use crate::models::{CleanerCardResponse, Review, ReviewResponse, User};
use crate::utils::{ApiError, ApiResponse};

async fn reviews_by_cleaner(
    db: &DbConn,
    filter: mongodb::bson::Document,
) -> Result<HashMap<ObjectId, Vec<ReviewResponse>>, ApiError> {
    let mut cursor = db
        .collection::<Review>("reviews")
        .find(filter, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut grouped: HashMap<ObjectId, Vec<ReviewResponse>> = HashMap::new();
    while let Some(review) = cursor
        .try_next()
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
    {
        grouped
            .entry(review.cleaner_id)
            .or_default()
            .push(ReviewResponse::from(review));
    }
    Ok(grouped)
}

/// Public marketplace listing. Suspended cleaners are hidden.
#[openapi(tag = "Cleaners")]
#[get("/cleaners")]
pub async fn get_all_cleaners(
    db: &State<DbConn>,
) -> Result<Json<ApiResponse<Vec<CleanerCardResponse>>>, ApiError> {
    let mut cursor = db
        .collection::<User>("users")
        .find(doc! { "role": "cleaner", "is_suspended": false }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut cleaners = Vec::new();
    while let Some(user) = cursor
        .try_next()
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
    {
        cleaners.push(user);
    }

    let mut reviews = reviews_by_cleaner(db, doc! {}).await?;
    let now = DateTime::now();

    let cards = cleaners
        .into_iter()
        .map(|user| {
            let user_reviews = user
                .id
                .and_then(|id| reviews.remove(&id))
                .unwrap_or_default();
            CleanerCardResponse::from_parts(user, user_reviews, now)
        })
        .collect();

    Ok(Json(ApiResponse::success(cards)))
}

#[openapi(tag = "Cleaners")]
#[get("/cleaners/<cleaner_id>")]
pub async fn get_cleaner_by_id(
    db: &State<DbConn>,
    cleaner_id: &str,
) -> Result<Json<ApiResponse<CleanerCardResponse>>, ApiError> {
    let id = ObjectId::parse_str(cleaner_id)
        .map_err(|_| ApiError::bad_request("Invalid cleaner id"))?;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": id, "role": "cleaner" }, None)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?
        .ok_or_else(|| ApiError::not_found("Cleaner not found"))?;

    if user.is_suspended {
        return Err(ApiError::not_found("Cleaner not found"));
    }

    let mut reviews = reviews_by_cleaner(db, doc! { "cleaner_id": id }).await?;
    let user_reviews = reviews.remove(&id).unwrap_or_default();

    Ok(Json(ApiResponse::success(CleanerCardResponse::from_parts(
        user,
        user_reviews,
        DateTime::now(),
    ))))
}
