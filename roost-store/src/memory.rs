use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use roost_booking::availability;
use roost_booking::booking::Booking;
use roost_booking::store::{BookingFilter, BookingStore, StoreError};
use roost_core::catalog::{CatalogError, Resource, ResourceCatalog};

/// In-memory [`BookingStore`] for tests and local development.
///
/// The single write lock serializes the check-then-insert critical section,
/// which is the in-process equivalent of the Postgres store's per-resource
/// row lock.
#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create(&self, booking: Booking, capacity: i32) -> Result<Booking, StoreError> {
        let mut bookings = self.bookings.write().await;

        let existing: Vec<Booking> = bookings
            .values()
            .filter(|b| b.resource_id == booking.resource_id)
            .cloned()
            .collect();
        if !availability::is_available(&existing, booking.check_in, booking.check_out, capacity) {
            return Err(StoreError::Unavailable);
        }

        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn find_by_session_ref(&self, reference: &str) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .find(|b| b.session_ref.as_deref() == Some(reference))
            .cloned())
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, StoreError> {
        let mut bookings = self.bookings.write().await;
        let stored = bookings.get_mut(&booking.id).ok_or(StoreError::NotFound)?;
        if stored.version != booking.version {
            return Err(StoreError::VersionConflict);
        }
        *stored = booking.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.bookings
            .write()
            .await
            .remove(&id)
            .map(drop)
            .ok_or(StoreError::NotFound)
    }

    async fn list_for_guest(
        &self,
        guest_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut result: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.guest_id == guest_id && filter.matches(b))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_for_resources(
        &self,
        resource_ids: &[Uuid],
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut result: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| resource_ids.contains(&b.resource_id) && filter.matches(b))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| {
                b.status.is_awaiting_payment() && b.paid_at.is_none() && b.created_at < cutoff
            })
            .cloned()
            .collect())
    }
}

/// In-memory [`ResourceCatalog`], seeded by tests.
#[derive(Default)]
pub struct MemoryResourceCatalog {
    resources: RwLock<HashMap<Uuid, Resource>>,
}

impl MemoryResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, resource: Resource) {
        self.resources.write().await.insert(resource.id, resource);
    }
}

#[async_trait]
impl ResourceCatalog for MemoryResourceCatalog {
    async fn get_resource(&self, id: Uuid) -> Result<Option<Resource>, CatalogError> {
        Ok(self.resources.read().await.get(&id).cloned())
    }

    async fn resources_for_host(&self, host_id: Uuid) -> Result<Vec<Resource>, CatalogError> {
        Ok(self
            .resources
            .read()
            .await
            .values()
            .filter(|r| r.host_id == host_id)
            .cloned()
            .collect())
    }
}
