use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

use crate::common::response::ApiError;
use crate::modules::jobs::model::JobState;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("job not found: {0}")]
    NotFound(Uuid),

    /// A transition lost the race against a concurrent caller. Internal:
    /// the scheduler retries these, handlers never see them.
    #[error("job is {actual}, expected {expected}")]
    Conflict {
        expected: JobState,
        actual: JobState,
    },

    #[error("cannot transition a {from} job to {to}")]
    InvalidTransition { from: JobState, to: JobState },
}

impl ServerError {
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Validation(_) => "VALIDATION_ERROR",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Conflict { .. } => "CONFLICT",
            ServerError::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict { .. } => StatusCode::CONFLICT,
            ServerError::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        ApiError(self.status(), self.code(), self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
