pub mod user;
pub mod booking;
pub mod plan;
pub mod receipt;
pub mod review;

pub use user::*;
pub use booking::*;
pub use plan::*;
pub use receipt::*;
pub use review::*;
