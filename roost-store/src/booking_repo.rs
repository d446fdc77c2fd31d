use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use roost_booking::booking::{Booking, BookingStatus};
use roost_booking::store::{BookingFilter, BookingStore, StoreError};
use roost_core::payment::SessionStatus;

/// PostgreSQL-backed [`BookingStore`].
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    resource_id: Uuid,
    guest_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    nights: i64,
    total_minor: i64,
    currency: String,
    status: String,
    session_ref: Option<String>,
    session_status: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, StoreError> {
        let status = BookingStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown booking status: {}", row.status)))?;
        let session_status = match row.session_status.as_deref() {
            Some(s) => Some(SessionStatus::parse(s).ok_or_else(|| {
                StoreError::Backend(format!("unknown session status: {s}"))
            })?),
            None => None,
        };
        Ok(Booking {
            id: row.id,
            resource_id: row.resource_id,
            guest_id: row.guest_id,
            check_in: row.check_in,
            check_out: row.check_out,
            nights: row.nights,
            total_minor: row.total_minor,
            currency: row.currency,
            status,
            session_ref: row.session_ref,
            session_status,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

const SELECT_BOOKING: &str = "SELECT id, resource_id, guest_id, check_in, check_out, nights, \
     total_minor, currency, status, session_ref, session_status, paid_at, created_at, \
     updated_at, version FROM bookings";

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create(&self, booking: Booking, capacity: i32) -> Result<Booking, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Row lock on the resource serializes concurrent creates for the same
        // resource, so the overlap count below cannot go stale before the
        // insert commits.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM resources WHERE id = $1 FOR UPDATE")
                .bind(booking.resource_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
        if locked.is_none() {
            return Err(StoreError::Backend(format!(
                "resource {} missing from store",
                booking.resource_id
            )));
        }

        let overlapping: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings \
             WHERE resource_id = $1 AND status <> 'CANCELLED' \
               AND check_in < $2 AND check_out > $3",
        )
        .bind(booking.resource_id)
        .bind(booking.check_out)
        .bind(booking.check_in)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        if overlapping >= capacity as i64 {
            return Err(StoreError::Unavailable);
        }

        sqlx::query(
            "INSERT INTO bookings (id, resource_id, guest_id, check_in, check_out, nights, \
             total_minor, currency, status, session_ref, session_status, paid_at, created_at, \
             updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(booking.id)
        .bind(booking.resource_id)
        .bind(booking.guest_id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.nights)
        .bind(booking.total_minor)
        .bind(&booking.currency)
        .bind(booking.status.as_str())
        .bind(&booking.session_ref)
        .bind(booking.session_status.map(|s| s.as_str()))
        .bind(booking.paid_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .bind(booking.version)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(booking)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("{SELECT_BOOKING} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_session_ref(&self, reference: &str) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("{SELECT_BOOKING} WHERE session_ref = $1"))
                .bind(reference)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        row.map(Booking::try_from).transpose()
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, StoreError> {
        // Dates and the captured price are immutable; only lifecycle fields
        // move. The version predicate is the optimistic concurrency check.
        let row: Option<BookingRow> = sqlx::query_as(
            "UPDATE bookings SET status = $2, session_ref = $3, session_status = $4, \
             paid_at = $5, updated_at = $6, version = version + 1 \
             WHERE id = $1 AND version = $7 \
             RETURNING id, resource_id, guest_id, check_in, check_out, nights, total_minor, \
             currency, status, session_ref, session_status, paid_at, created_at, updated_at, \
             version",
        )
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(&booking.session_ref)
        .bind(booking.session_status.map(|s| s.as_str()))
        .bind(booking.paid_at)
        .bind(booking.updated_at)
        .bind(booking.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Booking::try_from(row),
            None => {
                let exists: Option<Uuid> =
                    sqlx::query_scalar("SELECT id FROM bookings WHERE id = $1")
                        .bind(booking.id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(backend)?;
                if exists.is_some() {
                    Err(StoreError::VersionConflict)
                } else {
                    Err(StoreError::NotFound)
                }
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_for_guest(
        &self,
        guest_id: Uuid,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "{SELECT_BOOKING} WHERE guest_id = $1 ORDER BY created_at DESC"
        ))
        .bind(guest_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect_filtered(rows, filter)
    }

    async fn list_for_resources(
        &self,
        resource_ids: &[Uuid],
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "{SELECT_BOOKING} WHERE resource_id = ANY($1) ORDER BY created_at DESC"
        ))
        .bind(resource_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect_filtered(rows, filter)
    }

    async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "{SELECT_BOOKING} WHERE status IN ('PENDING', 'AWAITING_PAYMENT') \
             AND paid_at IS NULL AND created_at < $1"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(Booking::try_from).collect()
    }
}

fn collect_filtered(
    rows: Vec<BookingRow>,
    filter: &BookingFilter,
) -> Result<Vec<Booking>, StoreError> {
    let mut bookings = Vec::with_capacity(rows.len());
    for row in rows {
        let booking = Booking::try_from(row)?;
        if filter.matches(&booking) {
            bookings.push(booking);
        }
    }
    Ok(bookings)
}
