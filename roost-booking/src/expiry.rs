use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::BookingError;
use crate::store::{BookingStore, StoreError};

/// Reclaims date ranges held by unpaid bookings that never completed
/// checkout, so abandoned holds cannot starve availability forever.
pub struct HoldSweeper {
    store: Arc<dyn BookingStore>,
    ttl: Duration,
}

impl HoldSweeper {
    pub fn new(store: Arc<dyn BookingStore>, ttl_seconds: u64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    /// Cancel every unpaid hold older than the TTL. Returns how many holds
    /// were released.
    pub async fn sweep(&self) -> Result<usize, BookingError> {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        let cutoff = now - self.ttl;
        let stale = self.store.stale_pending(cutoff).await?;

        let mut released = 0;
        for mut booking in stale {
            // The query is a snapshot; the guard re-checks under the version
            // token so a payment landing mid-sweep wins.
            if !booking.expire_hold() {
                continue;
            }
            match self.store.update(&booking).await {
                Ok(_) => {
                    released += 1;
                    info!(booking_id = %booking.id, "stale pending hold expired");
                }
                Err(StoreError::VersionConflict) => {
                    debug!(booking_id = %booking.id, "hold changed mid-sweep, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(released)
    }
}
