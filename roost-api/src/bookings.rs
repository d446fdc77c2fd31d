use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use roost_booking::booking::{Booking, BookingStatus};
use roost_booking::store::BookingFilter;
use roost_core::identity::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub resource_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTarget {
    Confirmed,
    CheckedIn,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub target: StatusTarget,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub guest_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub total_minor: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub session_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            resource_id: b.resource_id,
            guest_id: b.guest_id,
            check_in: b.check_in,
            check_out: b.check_out,
            nights: b.nights,
            total_minor: b.total_minor,
            currency: b.currency,
            status: b.status,
            session_ref: b.session_ref,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl TryFrom<ListParams> for BookingFilter {
    type Error = AppError;

    fn try_from(params: ListParams) -> Result<Self, AppError> {
        let status = match params.status.as_deref() {
            Some(s) => Some(
                BookingStatus::parse(s)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown status filter: {s}")))?,
            ),
            None => None,
        };
        Ok(BookingFilter {
            status,
            from: params.from,
            until: params.until,
        })
    }
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_guest_bookings))
        .route("/v1/hosts/bookings", get(list_host_bookings))
        .route("/v1/bookings/{id}/status", patch(update_status))
        .route("/v1/bookings/{id}/cancel", patch(cancel_booking))
        .route("/v1/bookings/{id}", delete(delete_booking))
}

/// POST /v1/bookings
/// Reserve a resource for a date range; 409 when the dates are taken.
async fn create_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state
        .bookings
        .create_booking(&principal, req.resource_id, req.check_in, req.check_out)
        .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// GET /v1/bookings
/// The calling guest's bookings, optionally narrowed by status/date window.
async fn list_guest_bookings(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let filter = BookingFilter::try_from(params)?;
    let bookings = state.bookings.list_for_guest(&principal, &filter).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// GET /v1/hosts/bookings
/// Bookings across every resource the calling host owns.
async fn list_host_bookings(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let filter = BookingFilter::try_from(params)?;
    let bookings = state.bookings.list_for_host(&principal, &filter).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// PATCH /v1/bookings/{id}/status
/// Host-side transitions: confirm a paid booking, or mark the guest as
/// checked in on/after the arrival date.
async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = match req.target {
        StatusTarget::Confirmed => state.bookings.confirm(&principal, booking_id).await?,
        StatusTarget::CheckedIn => {
            let today = Utc::now().date_naive();
            state.bookings.check_in(&principal, booking_id, today).await?
        }
    };
    Ok(Json(booking.into()))
}

/// PATCH /v1/bookings/{id}/cancel
/// Guest or host cancels; 409 once the guest has checked in.
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.cancel(&principal, booking_id).await?;
    Ok(Json(booking.into()))
}

/// DELETE /v1/bookings/{id}
/// Hard-delete a never-paid pending booking; 409 once a payment succeeded.
async fn delete_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.bookings.delete(&principal, booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
