use roost_core::catalog::CatalogError;
use roost_core::payment::ProviderError;

use crate::booking::BookingStatus;
use crate::store::StoreError;

/// Error taxonomy of the booking core.
///
/// `Provider` is transient and retryable by the caller; everything else is a
/// definitive answer for the request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid date range: check-out must fall after check-in")]
    InvalidRange,

    #[error("no unit is free for the requested dates")]
    Unavailable,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("actor may not {0}")]
    Forbidden(&'static str),

    #[error("cannot {event} a booking in status {from}")]
    IllegalTransition {
        from: BookingStatus,
        event: &'static str,
    },

    #[error("booking is already paid")]
    AlreadyPaid,

    #[error("payment provider failure: {0}")]
    Provider(#[from] ProviderError),

    #[error("booking was modified concurrently, please retry")]
    Conflict,

    #[error("store failure: {0}")]
    Store(StoreError),

    #[error("catalog failure: {0}")]
    Catalog(#[from] CatalogError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => BookingError::Unavailable,
            StoreError::NotFound => BookingError::NotFound("booking"),
            StoreError::VersionConflict => BookingError::Conflict,
            other => BookingError::Store(other),
        }
    }
}
