//! Persistent reservation store trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use divequota_core::result::AppResult;
use divequota_entity::reservation::{NewReservation, PermitNumber, Reservation};

/// Durable record of reservations and the source of truth for quota usage.
///
/// Implementations must make [`ReservationStore::reserve_pending`] atomic:
/// the used total for the site-date is recomputed and the new `pending`
/// row inserted as one serialized unit, so that concurrent reservers for
/// the same site-date can never jointly exceed the limit.
#[async_trait]
pub trait ReservationStore: Send + Sync + std::fmt::Debug {
    /// Sum of diver counts in `approved` reservations for a site-date.
    async fn approved_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32>;

    /// Sum of diver counts in reservations that hold capacity
    /// (`pending` and `approved`) for a site-date.
    async fn held_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32>;

    /// Atomically check `held + diver_count <= daily_limit` and insert a
    /// `pending` reservation. Fails with `QuotaExceeded` otherwise, leaving
    /// nothing behind.
    async fn reserve_pending(
        &self,
        request: &NewReservation,
        daily_limit: u32,
    ) -> AppResult<Reservation>;

    /// Move a `pending` reservation to `approved` with its permit number.
    ///
    /// Fails with `Conflict` if the row is no longer pending.
    async fn mark_approved(&self, id: Uuid, permit: &PermitNumber) -> AppResult<Reservation>;

    /// Move a reservation to `cancelled`, releasing its capacity.
    ///
    /// Cancelling an already cancelled reservation returns it unchanged.
    async fn mark_cancelled(&self, id: Uuid, reason: &str) -> AppResult<Reservation>;

    /// Find a reservation by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>>;

    /// Find a reservation by its authority permit number.
    async fn find_by_permit(&self, permit: &PermitNumber) -> AppResult<Option<Reservation>>;

    /// All reservations linked to a trip, newest first.
    async fn find_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Reservation>>;

    /// `pending` reservations created before `cutoff`, oldest first.
    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
}
