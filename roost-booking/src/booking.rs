use chrono::{DateTime, NaiveDate, Utc};
use roost_core::catalog::Resource;
use roost_core::identity::Principal;
use roost_core::payment::SessionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::BookingError;
use crate::pricing::Quote;

/// Booking status in the lifecycle.
///
/// One tagged value instead of independent flags: a booking is in exactly one
/// of these states at any time, and every mutation goes through the
/// transition methods on [`Booking`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Created, no checkout session yet.
    Pending,
    /// Checkout session attached, payment not completed.
    AwaitingPayment,
    Paid,
    /// Host accepted the paid booking.
    Confirmed,
    /// Guest arrived; host marked the stay as started.
    CheckedIn,
    /// Terminal. Cancelled bookings release their dates and never move again.
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::AwaitingPayment => "AWAITING_PAYMENT",
            BookingStatus::Paid => "PAID",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "AWAITING_PAYMENT" => Some(BookingStatus::AwaitingPayment),
            "PAID" => Some(BookingStatus::Paid),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CHECKED_IN" => Some(BookingStatus::CheckedIn),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Active bookings hold their date range against the resource capacity.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    /// States from which a checkout session may still be opened or retried.
    pub fn is_awaiting_payment(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::AwaitingPayment)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single source of truth for a guest's reservation of a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub guest_id: Uuid,
    /// First night of the stay.
    pub check_in: NaiveDate,
    /// Day of departure; the range is half-open, this night is not booked.
    pub check_out: NaiveDate,
    pub nights: i64,
    /// Total price in minor currency units, captured at booking time.
    pub total_minor: i64,
    pub currency: String,
    pub status: BookingStatus,
    /// Provider checkout session reference, once checkout has started.
    pub session_ref: Option<String>,
    /// Provider session status as last reconciled.
    pub session_status: Option<SessionStatus>,
    /// Set once, when the provider first reports a successful payment.
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every update.
    pub version: i64,
}

impl Booking {
    pub fn new(
        resource: &Resource,
        guest_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        quote: &Quote,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            resource_id: resource.id,
            guest_id,
            check_in,
            check_out,
            nights: quote.nights,
            total_minor: quote.total_minor,
            currency: resource.currency.clone(),
            status: BookingStatus::Pending,
            session_ref: None,
            session_status: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// A checkout session may only be opened while the booking is unpaid.
    pub fn ensure_payable(&self) -> Result<(), BookingError> {
        if self.paid_at.is_some() {
            return Err(BookingError::AlreadyPaid);
        }
        if !self.status.is_awaiting_payment() {
            return Err(BookingError::IllegalTransition {
                from: self.status,
                event: "open checkout for",
            });
        }
        Ok(())
    }

    /// Attach a checkout session reference, replacing any previous
    /// non-succeeded session.
    pub fn attach_session(&mut self, reference: String) -> Result<(), BookingError> {
        self.ensure_payable()?;
        self.session_ref = Some(reference);
        self.session_status = Some(SessionStatus::Open);
        self.status = BookingStatus::AwaitingPayment;
        self.touch();
        Ok(())
    }

    /// Provider reported the session complete.
    ///
    /// Returns `Ok(false)` for a duplicate callback on an already-paid
    /// booking: replays are no-ops, not errors.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> Result<bool, BookingError> {
        if self.paid_at.is_some() {
            return Ok(false);
        }
        if !self.status.is_awaiting_payment() {
            return Err(BookingError::IllegalTransition {
                from: self.status,
                event: "record a payment for",
            });
        }
        self.paid_at = Some(at);
        self.session_status = Some(SessionStatus::Complete);
        self.status = BookingStatus::Paid;
        self.touch();
        Ok(true)
    }

    /// Mirror a non-final provider session status (open/expired). The booking
    /// keeps awaiting payment and the guest may retry.
    pub fn record_session_status(&mut self, status: SessionStatus) -> bool {
        if self.session_status == Some(status) {
            return false;
        }
        self.session_status = Some(status);
        self.touch();
        true
    }

    /// Host accepts a paid booking.
    pub fn confirm(&mut self, actor: &Principal, resource: &Resource) -> Result<bool, BookingError> {
        if !resource.is_owned_by(actor.profile_id) {
            return Err(BookingError::Forbidden(
                "confirm a booking on a resource they do not own",
            ));
        }
        match self.status {
            BookingStatus::Confirmed => Ok(false),
            BookingStatus::Paid => {
                self.status = BookingStatus::Confirmed;
                self.touch();
                Ok(true)
            }
            from => Err(BookingError::IllegalTransition {
                from,
                event: "confirm",
            }),
        }
    }

    /// Host marks the guest as arrived, on or after the check-in date.
    pub fn check_in_guest(
        &mut self,
        actor: &Principal,
        resource: &Resource,
        on: NaiveDate,
    ) -> Result<bool, BookingError> {
        if !resource.is_owned_by(actor.profile_id) {
            return Err(BookingError::Forbidden(
                "check in a guest on a resource they do not own",
            ));
        }
        match self.status {
            BookingStatus::CheckedIn => Ok(false),
            BookingStatus::Confirmed => {
                if on < self.check_in {
                    return Err(BookingError::IllegalTransition {
                        from: self.status,
                        event: "check in before the arrival date of",
                    });
                }
                self.status = BookingStatus::CheckedIn;
                self.touch();
                Ok(true)
            }
            from => Err(BookingError::IllegalTransition {
                from,
                event: "check in",
            }),
        }
    }

    /// Guest or host cancels. Idempotent when already cancelled; refused once
    /// the stay has started.
    pub fn cancel(&mut self, actor: &Principal, resource: &Resource) -> Result<bool, BookingError> {
        if actor.profile_id != self.guest_id && !resource.is_owned_by(actor.profile_id) {
            return Err(BookingError::Forbidden(
                "cancel a booking they are not a party to",
            ));
        }
        match self.status {
            BookingStatus::Cancelled => Ok(false),
            BookingStatus::CheckedIn => Err(BookingError::IllegalTransition {
                from: BookingStatus::CheckedIn,
                event: "cancel",
            }),
            _ => {
                self.status = BookingStatus::Cancelled;
                self.touch();
                Ok(true)
            }
        }
    }

    /// Reclaim a stale unpaid hold. System action, no actor involved.
    pub fn expire_hold(&mut self) -> bool {
        if self.paid_at.is_none() && self.status.is_awaiting_payment() {
            self.status = BookingStatus::Cancelled;
            self.touch();
            true
        } else {
            false
        }
    }

    /// Hard delete is reserved for the guest's own never-paid pending
    /// records; anything with a successful payment is kept for financial
    /// history.
    pub fn deletable_by(&self, actor: &Principal) -> Result<(), BookingError> {
        if actor.profile_id != self.guest_id {
            return Err(BookingError::Forbidden("delete someone else's booking"));
        }
        if self.paid_at.is_some() {
            return Err(BookingError::AlreadyPaid);
        }
        if !self.status.is_awaiting_payment() {
            return Err(BookingError::IllegalTransition {
                from: self.status,
                event: "delete",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(host_id: Uuid) -> Resource {
        Resource {
            id: Uuid::new_v4(),
            host_id,
            nightly_rate_minor: 1000,
            currency: "USD".to_string(),
            capacity: 1,
        }
    }

    fn booking(resource: &Resource, guest_id: Uuid) -> Booking {
        let check_in = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let check_out = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let quote = crate::pricing::quote(check_in, check_out, resource.nightly_rate_minor).unwrap();
        Booking::new(resource, guest_id, check_in, check_out, &quote)
    }

    fn paid_booking(resource: &Resource, guest_id: Uuid) -> Booking {
        let mut b = booking(resource, guest_id);
        b.attach_session("cs_1".to_string()).unwrap();
        assert!(b.mark_paid(Utc::now()).unwrap());
        b
    }

    #[test]
    fn open_checkout_attaches_session() {
        let host = Uuid::new_v4();
        let res = resource(host);
        let mut b = booking(&res, Uuid::new_v4());

        b.attach_session("cs_1".to_string()).unwrap();
        assert_eq!(b.status, BookingStatus::AwaitingPayment);
        assert_eq!(b.session_ref.as_deref(), Some("cs_1"));

        // Retry replaces the reference while still unpaid.
        b.attach_session("cs_2".to_string()).unwrap();
        assert_eq!(b.session_ref.as_deref(), Some("cs_2"));
    }

    #[test]
    fn duplicate_payment_callback_is_noop() {
        let host = Uuid::new_v4();
        let res = resource(host);
        let mut b = booking(&res, Uuid::new_v4());
        b.attach_session("cs_1".to_string()).unwrap();

        assert!(b.mark_paid(Utc::now()).unwrap());
        let first_paid_at = b.paid_at;
        assert_eq!(b.status, BookingStatus::Paid);

        // Replayed webhook: no change, no error.
        assert!(!b.mark_paid(Utc::now()).unwrap());
        assert_eq!(b.paid_at, first_paid_at);
        assert_eq!(b.status, BookingStatus::Paid);
    }

    #[test]
    fn paid_booking_cannot_reopen_checkout() {
        let host = Uuid::new_v4();
        let res = resource(host);
        let mut b = paid_booking(&res, Uuid::new_v4());

        assert!(matches!(
            b.attach_session("cs_2".to_string()),
            Err(BookingError::AlreadyPaid)
        ));
    }

    #[test]
    fn only_the_owner_confirms() {
        let host = Uuid::new_v4();
        let res = resource(host);
        let mut b = paid_booking(&res, Uuid::new_v4());

        let stranger = Principal::host(Uuid::new_v4());
        assert!(matches!(
            b.confirm(&stranger, &res),
            Err(BookingError::Forbidden(_))
        ));
        assert_eq!(b.status, BookingStatus::Paid);

        let owner = Principal::host(host);
        assert!(b.confirm(&owner, &res).unwrap());
        assert_eq!(b.status, BookingStatus::Confirmed);

        // Idempotent replay.
        assert!(!b.confirm(&owner, &res).unwrap());
    }

    #[test]
    fn check_in_requires_confirmed_and_arrival_date() {
        let host = Uuid::new_v4();
        let res = resource(host);
        let owner = Principal::host(host);
        let mut b = paid_booking(&res, Uuid::new_v4());

        // Not confirmed yet.
        let day = b.check_in;
        assert!(matches!(
            b.check_in_guest(&owner, &res, day),
            Err(BookingError::IllegalTransition { .. })
        ));

        b.confirm(&owner, &res).unwrap();

        // Too early.
        let eve = b.check_in.pred_opt().unwrap();
        assert!(matches!(
            b.check_in_guest(&owner, &res, eve),
            Err(BookingError::IllegalTransition { .. })
        ));
        assert_eq!(b.status, BookingStatus::Confirmed);

        assert!(b.check_in_guest(&owner, &res, day).unwrap());
        assert_eq!(b.status, BookingStatus::CheckedIn);
    }

    #[test]
    fn cancelled_is_terminal() {
        let host = Uuid::new_v4();
        let guest_id = Uuid::new_v4();
        let res = resource(host);
        let guest = Principal::guest(guest_id);
        let owner = Principal::host(host);
        let mut b = booking(&res, guest_id);

        assert!(b.cancel(&guest, &res).unwrap());
        assert_eq!(b.status, BookingStatus::Cancelled);
        assert!(!b.status.is_active());

        // Replayed cancel is a no-op; every other transition is refused.
        assert!(!b.cancel(&guest, &res).unwrap());
        assert!(matches!(
            b.confirm(&owner, &res),
            Err(BookingError::IllegalTransition { .. })
        ));
        assert!(matches!(
            b.mark_paid(Utc::now()),
            Err(BookingError::IllegalTransition { .. })
        ));
        assert!(matches!(
            b.attach_session("cs_9".to_string()),
            Err(BookingError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn checked_in_booking_cannot_be_cancelled() {
        let host = Uuid::new_v4();
        let guest_id = Uuid::new_v4();
        let res = resource(host);
        let owner = Principal::host(host);
        let mut b = paid_booking(&res, guest_id);
        b.confirm(&owner, &res).unwrap();
        b.check_in_guest(&owner, &res, b.check_in).unwrap();

        let guest = Principal::guest(guest_id);
        assert!(matches!(
            b.cancel(&guest, &res),
            Err(BookingError::IllegalTransition { .. })
        ));
        assert_eq!(b.status, BookingStatus::CheckedIn);
    }

    #[test]
    fn delete_only_while_never_paid() {
        let host = Uuid::new_v4();
        let guest_id = Uuid::new_v4();
        let res = resource(host);
        let guest = Principal::guest(guest_id);

        let b = booking(&res, guest_id);
        assert!(b.deletable_by(&guest).is_ok());

        let stranger = Principal::guest(Uuid::new_v4());
        assert!(matches!(
            b.deletable_by(&stranger),
            Err(BookingError::Forbidden(_))
        ));

        let paid = paid_booking(&res, guest_id);
        assert!(matches!(
            paid.deletable_by(&guest),
            Err(BookingError::AlreadyPaid)
        ));

        // Cancelled after payment: still kept for financial history.
        let mut cancelled = paid_booking(&res, guest_id);
        cancelled.cancel(&guest, &res).unwrap();
        assert!(matches!(
            cancelled.deletable_by(&guest),
            Err(BookingError::AlreadyPaid)
        ));
    }

    #[test]
    fn expiry_reclaims_only_unpaid_holds() {
        let host = Uuid::new_v4();
        let res = resource(host);

        let mut pending = booking(&res, Uuid::new_v4());
        assert!(pending.expire_hold());
        assert_eq!(pending.status, BookingStatus::Cancelled);

        let mut awaiting = booking(&res, Uuid::new_v4());
        awaiting.attach_session("cs_1".to_string()).unwrap();
        assert!(awaiting.expire_hold());

        let mut paid = paid_booking(&res, Uuid::new_v4());
        assert!(!paid.expire_hold());
        assert_eq!(paid.status, BookingStatus::Paid);
    }
}
