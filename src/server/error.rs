use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use thiserror::Error;
use log::error;

use crate::llm::LlmError;
use crate::models::chat::ErrorBody;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed chat request: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("chat request has an empty message")]
    EmptyMessage,

    #[error("upstream model call failed: {0}")]
    Upstream(#[from] LlmError),
}

/// Clients only ever see an opaque 500; the detail goes to the log.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        error!("Error in /api/chat: {}", self);
        let body = ErrorBody {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
