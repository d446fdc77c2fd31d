use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use roost_core::identity::Principal;
use roost_core::payment::{CheckoutSession, SessionStatus};
use serde::Serialize;
use uuid::Uuid;

use crate::bookings::BookingResponse;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_ref: String,
    pub redirect_url: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: SessionStatus,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(s: CheckoutSession) -> Self {
        Self {
            session_ref: s.reference,
            redirect_url: s.redirect_url,
            amount_minor: s.amount_minor,
            currency: s.currency,
            status: s.status,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/checkout", post(open_checkout))
        .route("/v1/bookings/{id}/retry-payment", post(retry_payment))
        .route("/v1/checkout/{reference}", get(checkout_status))
}

/// POST /v1/bookings/{id}/checkout
/// Open a hosted checkout session and hand the redirect URL to the guest.
async fn open_checkout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let session = state.checkout.open_session(&principal, booking_id).await?;
    Ok(Json(session.into()))
}

/// POST /v1/bookings/{id}/retry-payment
/// Replace a failed/abandoned session with a fresh one; 409 if already paid.
async fn retry_payment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let session = state.checkout.retry(&principal, booking_id).await?;
    Ok(Json(session.into()))
}

/// GET /v1/checkout/{reference}
/// Polling fallback: reconcile the provider's session state and return the
/// booking as it now stands. Idempotent under repeated calls.
async fn checkout_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.checkout.reconcile(&reference).await?;
    Ok(Json(booking.into()))
}
