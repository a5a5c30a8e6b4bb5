//! Domain error taxonomy for room operations.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors surfaced by room lookup, creation and membership operations.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(String),

    #[error("room {0} has expired")]
    Expired(String),

    #[error("room {0} is full")]
    RoomFull(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    InvalidInput(String),

    #[error("failed to generate a unique room code after {0} attempts")]
    CodeGeneration(u32),
}

impl RoomError {
    fn status(&self) -> StatusCode {
        match self {
            RoomError::NotFound(_) => StatusCode::NOT_FOUND,
            RoomError::Expired(_) => StatusCode::GONE,
            RoomError::RoomFull(_) => StatusCode::CONFLICT,
            RoomError::Unauthorized => StatusCode::UNAUTHORIZED,
            RoomError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RoomError::CodeGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
