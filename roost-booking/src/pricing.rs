use chrono::NaiveDate;

use crate::error::BookingError;

/// Price quote for a stay, in minor currency units.
///
/// Money is integer cents throughout, so the two-decimal precision of the
/// displayed price is exact by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub nights: i64,
    pub total_minor: i64,
}

/// Derive nights and total price from a date range and a nightly rate.
///
/// Pure and deterministic; the caller captures the result on the booking
/// record so later rate changes never touch existing bookings.
pub fn quote(
    check_in: NaiveDate,
    check_out: NaiveDate,
    nightly_rate_minor: i64,
) -> Result<Quote, BookingError> {
    let nights = (check_out - check_in).num_days();
    if nights <= 0 {
        return Err(BookingError::InvalidRange);
    }
    Ok(Quote {
        nights,
        total_minor: nights * nightly_rate_minor,
    })
}
