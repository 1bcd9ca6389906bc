#[macro_use]
extern crate rocket;

mod config;
mod db;
mod engine;
mod guards;
mod models;
mod routes;
mod services;
mod utils;

use dotenvy::dotenv;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};

use engine::flight::InFlight;

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /api prefix)"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    println!("🧽 CleanConnect API running");
    if config::Config::is_development() {
        println!("📚 Swagger UI → http://localhost:8000/api/docs");
    }

    rocket::build()
        .attach(db::init())
        .attach(CORS)
        .manage(InFlight::new())
        .mount("/", routes![options_handler])
        .mount(
            "/api",
            routes![
                // Auth
                routes::auth::register,
                routes::auth::login,
                routes::auth::me,
                // Cleaners
                routes::cleaner::get_all_cleaners,
                routes::cleaner::get_cleaner_by_id,
                // Bookings
                routes::booking::create_booking,
                routes::booking::cancel_booking,
                routes::booking::complete_booking,
                routes::booking::upload_booking_receipt,
                routes::booking::submit_review,
                // Users & subscriptions
                routes::user::update_profile,
                routes::user::request_subscription_upgrade,
                routes::user::upload_subscription_receipt,
                // Admin
                routes::admin::get_all_users,
                routes::admin::update_user_status,
                routes::admin::delete_user,
                routes::admin::confirm_payment,
                routes::admin::mark_paid,
                routes::admin::approve_subscription,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register("/", catchers![not_found, internal_error])
}
