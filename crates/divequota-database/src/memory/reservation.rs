//! In-memory reservation store using a Tokio mutex for single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use divequota_core::error::AppError;
use divequota_core::result::AppResult;
use divequota_entity::reservation::{
    NewReservation, PermitNumber, Reservation, ReservationStatus,
};

use crate::store::ReservationStore;

/// In-memory reservation store.
///
/// The whole table sits behind one mutex, so the check-and-insert in
/// [`ReservationStore::reserve_pending`] is serialized across all
/// site-dates. Suitable for single-node deployments and tests only.
#[derive(Debug, Clone, Default)]
pub struct MemoryReservationStore {
    rows: Arc<Mutex<HashMap<Uuid, Reservation>>>,
}

impl MemoryReservationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, in any status.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    /// Whether the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    /// Shift a reservation's creation time into the past.
    ///
    /// Lets callers simulate a `pending` row orphaned by a crash.
    pub async fn backdate(&self, id: Uuid, by: chrono::Duration) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Reservation {id} not found")))?;
        row.created_at -= by;
        Ok(())
    }
}

fn sum_where(
    rows: &HashMap<Uuid, Reservation>,
    site_code: &str,
    date: NaiveDate,
    include: impl Fn(&ReservationStatus) -> bool,
) -> u32 {
    rows.values()
        .filter(|r| r.site_code == site_code && r.quota_date == date && include(&r.status))
        .map(Reservation::divers)
        .sum()
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn approved_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32> {
        let rows = self.rows.lock().await;
        Ok(sum_where(&rows, site_code, date, |s| {
            *s == ReservationStatus::Approved
        }))
    }

    async fn held_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32> {
        let rows = self.rows.lock().await;
        Ok(sum_where(&rows, site_code, date, ReservationStatus::holds_capacity))
    }

    async fn reserve_pending(
        &self,
        request: &NewReservation,
        daily_limit: u32,
    ) -> AppResult<Reservation> {
        let mut rows = self.rows.lock().await;

        let held = sum_where(
            &rows,
            &request.site_code,
            request.quota_date,
            ReservationStatus::holds_capacity,
        );
        let requested = request.diver_count.max(0) as u32;

        if held + requested > daily_limit {
            debug!(
                site_code = %request.site_code,
                date = %request.quota_date,
                held,
                requested,
                daily_limit,
                "Reservation rejected"
            );
            return Err(AppError::quota_exceeded(format!(
                "Site {} has {} of {} divers remaining on {}, {} requested",
                request.site_code,
                daily_limit.saturating_sub(held),
                daily_limit,
                request.quota_date,
                requested
            )));
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            site_code: request.site_code.clone(),
            quota_date: request.quota_date,
            diver_count: request.diver_count,
            center_id: request.center_id,
            trip_id: request.trip_id,
            status: ReservationStatus::Pending,
            permit_number: None,
            reason: None,
            created_at: now,
            updated_at: now,
        };
        rows.insert(reservation.id, reservation.clone());

        info!(
            reservation_id = %reservation.id,
            site_code = %reservation.site_code,
            date = %reservation.quota_date,
            diver_count = reservation.diver_count,
            held = held + requested,
            "Pending reservation stored"
        );
        Ok(reservation)
    }

    async fn mark_approved(&self, id: Uuid, permit: &PermitNumber) -> AppResult<Reservation> {
        let mut rows = self.rows.lock().await;

        if rows
            .values()
            .any(|r| r.id != id && r.permit_number.as_deref() == Some(permit.as_str()))
        {
            return Err(AppError::conflict(format!(
                "Permit {permit} is already assigned to another reservation"
            )));
        }

        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Reservation {id} not found")))?;
        if row.status != ReservationStatus::Pending {
            return Err(AppError::conflict(format!(
                "Reservation {id} is {} and cannot be approved",
                row.status
            )));
        }

        row.status = ReservationStatus::Approved;
        row.permit_number = Some(permit.as_str().to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn mark_cancelled(&self, id: Uuid, reason: &str) -> AppResult<Reservation> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Reservation {id} not found")))?;

        if row.status == ReservationStatus::Cancelled {
            return Ok(row.clone());
        }

        row.status = ReservationStatus::Cancelled;
        row.reason = Some(reason.to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn find_by_permit(&self, permit: &PermitNumber) -> AppResult<Option<Reservation>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .find(|r| r.permit_number.as_deref() == Some(permit.as_str()))
            .cloned())
    }

    async fn find_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Reservation>> {
        let rows = self.rows.lock().await;
        let mut found: Vec<Reservation> =
            rows.values().filter(|r| r.trip_id == trip_id).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let rows = self.rows.lock().await;
        let mut found: Vec<Reservation> = rows
            .values()
            .filter(|r| r.status == ReservationStatus::Pending && r.created_at < cutoff)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }
}
