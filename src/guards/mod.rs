pub mod active;
pub mod admin;
pub mod auth;

pub use active::ActiveUserGuard;
pub use admin::AdminGuard;
pub use auth::AuthGuard;
