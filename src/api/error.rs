use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::application::AppError;

/// Returned for internal failures; the detail only goes to the log.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        AppError::DuplicateAccountNumber(_)
        | AppError::InsufficientFunds { .. }
        | AppError::InvalidTransfer(_)
        | AppError::InvalidAmount(_)
        | AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if self.is_client_error() {
            warn!(status = status.as_u16(), "{self}");
            json_error(status, self.to_string())
        } else {
            error!("{self}");
            json_error(status, INTERNAL_ERROR_MESSAGE)
        }
    }
}
