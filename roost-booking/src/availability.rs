use chrono::NaiveDate;

use crate::booking::Booking;
use crate::error::BookingError;

/// Reject empty or reversed ranges before any write happens.
pub fn validate_range(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), BookingError> {
    if check_out <= check_in {
        return Err(BookingError::InvalidRange);
    }
    Ok(())
}

/// Half-open interval overlap: two stays collide iff they share at least one
/// night. Back-to-back stays (one checking out the day the other checks in)
/// do not overlap.
pub fn overlaps(
    a_check_in: NaiveDate,
    a_check_out: NaiveDate,
    b_check_in: NaiveDate,
    b_check_out: NaiveDate,
) -> bool {
    a_check_in < b_check_out && a_check_out > b_check_in
}

/// Count active bookings colliding with the requested range.
pub fn count_overlapping(
    existing: &[Booking],
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> usize {
    existing
        .iter()
        .filter(|b| b.status.is_active())
        .filter(|b| overlaps(b.check_in, b.check_out, check_in, check_out))
        .count()
}

/// Available iff at least one unit is free for every night of the range.
///
/// Must be evaluated inside the store's create transaction/lock scope; a
/// standalone read is only advisory.
pub fn is_available(
    existing: &[Booking],
    check_in: NaiveDate,
    check_out: NaiveDate,
    capacity: i32,
) -> bool {
    (count_overlapping(existing, check_in, check_out) as i32) < capacity
}
