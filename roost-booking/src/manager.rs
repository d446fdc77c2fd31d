use chrono::NaiveDate;
use roost_core::catalog::{Resource, ResourceCatalog};
use roost_core::identity::Principal;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::availability;
use crate::booking::Booking;
use crate::error::BookingError;
use crate::pricing;
use crate::store::{BookingFilter, BookingStore, StoreError};

/// How often a status transition is replayed when it loses an optimistic
/// version race (e.g. a cancellation racing a provider callback).
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Drives the booking lifecycle against the store and the catalog.
///
/// Every status change is read-modify-write under the record's version
/// token, so two near-simultaneous transitions on one booking can never lose
/// an update: one commits, the other re-reads and re-applies its guards.
pub struct BookingManager {
    store: Arc<dyn BookingStore>,
    catalog: Arc<dyn ResourceCatalog>,
}

impl BookingManager {
    pub fn new(store: Arc<dyn BookingStore>, catalog: Arc<dyn ResourceCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Create a pending booking for the guest, capturing the price at
    /// booking time. Availability is re-checked atomically with the insert
    /// inside the store.
    pub async fn create_booking(
        &self,
        guest: &Principal,
        resource_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking, BookingError> {
        availability::validate_range(check_in, check_out)?;

        let resource = self
            .catalog
            .get_resource(resource_id)
            .await?
            .ok_or(BookingError::NotFound("resource"))?;

        let quote = pricing::quote(check_in, check_out, resource.nightly_rate_minor)?;
        let booking = Booking::new(&resource, guest.profile_id, check_in, check_out, &quote);

        let created = self.store.create(booking, resource.capacity).await?;
        info!(
            booking_id = %created.id,
            resource_id = %created.resource_id,
            nights = created.nights,
            total_minor = created.total_minor,
            "booking created"
        );
        Ok(created)
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.store
            .get(id)
            .await?
            .ok_or(BookingError::NotFound("booking"))
    }

    /// Host accepts a paid booking.
    pub async fn confirm(
        &self,
        actor: &Principal,
        booking_id: Uuid,
    ) -> Result<Booking, BookingError> {
        self.apply(booking_id, "confirm", |b, r| b.confirm(actor, r))
            .await
    }

    /// Host marks the guest as arrived.
    pub async fn check_in(
        &self,
        actor: &Principal,
        booking_id: Uuid,
        on: NaiveDate,
    ) -> Result<Booking, BookingError> {
        self.apply(booking_id, "check-in", |b, r| b.check_in_guest(actor, r, on))
            .await
    }

    /// Guest or host cancels; terminal and idempotent.
    pub async fn cancel(
        &self,
        actor: &Principal,
        booking_id: Uuid,
    ) -> Result<Booking, BookingError> {
        self.apply(booking_id, "cancel", |b, r| b.cancel(actor, r))
            .await
    }

    /// Hard-delete a never-paid pending booking of the calling guest.
    pub async fn delete(&self, actor: &Principal, booking_id: Uuid) -> Result<(), BookingError> {
        let booking = self.get_booking(booking_id).await?;
        booking.deletable_by(actor)?;
        self.store.delete(booking.id).await?;
        info!(booking_id = %booking.id, "unpaid pending booking deleted");
        Ok(())
    }

    pub async fn list_for_guest(
        &self,
        guest: &Principal,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_for_guest(guest.profile_id, filter).await?)
    }

    /// Bookings across every resource the host owns.
    pub async fn list_for_host(
        &self,
        host: &Principal,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, BookingError> {
        let resources = self.catalog.resources_for_host(host.profile_id).await?;
        let ids: Vec<Uuid> = resources.iter().map(|r| r.id).collect();
        Ok(self.store.list_for_resources(&ids, filter).await?)
    }

    /// Read-modify-write a single booking under its version token.
    ///
    /// `transition` returns whether the record changed; unchanged results
    /// (idempotent replays) skip the write entirely.
    async fn apply<F>(
        &self,
        booking_id: Uuid,
        event: &'static str,
        mut transition: F,
    ) -> Result<Booking, BookingError>
    where
        F: FnMut(&mut Booking, &Resource) -> Result<bool, BookingError>,
    {
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let mut booking = self.get_booking(booking_id).await?;
            let resource = self
                .catalog
                .get_resource(booking.resource_id)
                .await?
                .ok_or(BookingError::NotFound("resource"))?;

            if !transition(&mut booking, &resource)? {
                return Ok(booking);
            }

            match self.store.update(&booking).await {
                Ok(stored) => {
                    info!(booking_id = %stored.id, status = %stored.status, event, "booking transition applied");
                    return Ok(stored);
                }
                Err(StoreError::VersionConflict) => {
                    debug!(booking_id = %booking_id, attempt, event, "version race, retrying transition");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict)
    }
}
