use std::fmt;

use crate::utils::ApiError;

/// Why a lifecycle transition was refused. Local rejections only; these never
/// involve I/O and map onto HTTP statuses at the route boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A precondition on the inputs was not met.
    Validation(String),
    /// The actor is not authorized for this transition.
    Auth(String),
    /// The entity is not in a state that admits the requested transition.
    InvalidState(String),
    /// The cleaner's plan has no room for another new client this period.
    PlanLimitExceeded(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(msg)
            | EngineError::Auth(msg)
            | EngineError::InvalidState(msg)
            | EngineError::PlanLimitExceeded(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ApiError::bad_request(msg),
            EngineError::Auth(msg) => ApiError::forbidden(msg),
            EngineError::InvalidState(msg) => ApiError::conflict(msg),
            EngineError::PlanLimitExceeded(msg) => ApiError::forbidden(msg),
        }
    }
}
