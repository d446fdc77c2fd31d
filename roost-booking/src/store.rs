use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};

/// Optional narrowing for booking listings.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    /// Keep bookings whose stay ends after this date.
    pub from: Option<NaiveDate>,
    /// Keep bookings whose stay starts before this date.
    pub until: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(status) = self.status {
            if booking.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if booking.check_out <= from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if booking.check_in >= until {
                return false;
            }
        }
        true
    }
}

/// Durable record of bookings; the single source of truth for conflict
/// detection.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a new pending booking, re-checking availability against
    /// `capacity` atomically with the insert. Concurrent creates for the same
    /// resource must serialize here.
    async fn create(&self, booking: Booking, capacity: i32) -> Result<Booking, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn find_by_session_ref(&self, reference: &str) -> Result<Option<Booking>, StoreError>;

    /// Compare-and-swap on `version`: fails with [`StoreError::VersionConflict`]
    /// when the stored record moved on since it was read.
    async fn update(&self, booking: &Booking) -> Result<Booking, StoreError>;

    /// Hard delete. Guards (never paid, owned by the caller) live in the
    /// domain layer.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_for_guest(
        &self,
        guest_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn list_for_resources(
        &self,
        resource_ids: &[Uuid],
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Unpaid pending holds created before `cutoff`, for the expiry sweep.
    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("booking not found")]
    NotFound,

    #[error("no unit free for the requested dates")]
    Unavailable,

    #[error("booking was modified concurrently")]
    VersionConflict,

    #[error("store backend failure: {0}")]
    Backend(String),
}
