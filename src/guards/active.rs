use rocket::request::{self, Request, FromRequest, Outcome};
use rocket::http::Status;
use rocket::State;
use mongodb::bson::doc;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::User;

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

/// Authenticated, non-suspended account. Suspension is checked on every
/// request so a freshly suspended user cannot keep acting on an old token.
pub struct ActiveUserGuard {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ActiveUserGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth_outcome = req.guard::<AuthGuard>().await;

        match auth_outcome {
            Outcome::Success(auth) => {
                let db = match req.guard::<&State<DbConn>>().await {
                    Outcome::Success(db) => db,
                    _ => return Outcome::Error((Status::InternalServerError, ())),
                };

                let user = db
                    .collection::<User>("users")
                    .find_one(doc! { "_id": &auth.user_id }, None)
                    .await;

                match user {
                    Ok(Some(user)) => {
                        if user.is_suspended {
                            Outcome::Error((Status::Forbidden, ()))
                        } else {
                            Outcome::Success(ActiveUserGuard { user })
                        }
                    }
                    Ok(None) => Outcome::Error((Status::Unauthorized, ())),
                    Err(_) => Outcome::Error((Status::InternalServerError, ())),
                }
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for ActiveUserGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
