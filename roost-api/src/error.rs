use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roost_booking::BookingError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    UpstreamPayment(String),
    Internal(anyhow::Error),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            e @ BookingError::InvalidRange => AppError::BadRequest(e.to_string()),
            e @ BookingError::NotFound(_) => AppError::NotFound(e.to_string()),
            e @ BookingError::Forbidden(_) => AppError::Forbidden(e.to_string()),
            // Guard failures and lost version races both read as "the booking
            // is no longer in a state where this applies": 409.
            e @ (BookingError::Unavailable
            | BookingError::AlreadyPaid
            | BookingError::IllegalTransition { .. }
            | BookingError::Conflict) => AppError::Conflict(e.to_string()),
            e @ BookingError::Provider(_) => AppError::UpstreamPayment(e.to_string()),
            e @ (BookingError::Store(_) | BookingError::Catalog(_)) => {
                AppError::Internal(anyhow::Error::new(e))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::UpstreamPayment(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(err) => {
                tracing::error!("internal server error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
