use rocket::request::{self, Request, FromRequest, Outcome};
use rocket::http::Status;

use crate::guards::ActiveUserGuard;
use crate::models::User;

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

/// Back-office guard: an active account with the admin flag set.
pub struct AdminGuard {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.guard::<ActiveUserGuard>().await {
            Outcome::Success(active) => {
                if active.user.is_admin {
                    Outcome::Success(AdminGuard { user: active.user })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Forward(f) => Outcome::Forward(f),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for AdminGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
