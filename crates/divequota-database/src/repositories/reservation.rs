//! PostgreSQL reservation store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use divequota_core::error::{AppError, ErrorKind};
use divequota_core::result::AppResult;
use divequota_entity::reservation::{NewReservation, PermitNumber, Reservation};

use crate::store::ReservationStore;

/// Reservation store backed by the `quota_reservations` and
/// `site_quota_usage` tables.
///
/// Every capacity-changing operation locks the site-date row in
/// `site_quota_usage` first, so decisions for one site-date are
/// serialized while different site-dates proceed in parallel.
#[derive(Debug, Clone)]
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    /// Create a new reservation store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensure the usage row exists and lock it for the rest of the transaction.
    async fn lock_usage_row(
        conn: &mut PgConnection,
        site_code: &str,
        date: NaiveDate,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO site_quota_usage (site_code, quota_date, used) VALUES ($1, $2, 0) \
             ON CONFLICT (site_code, quota_date) DO NOTHING",
        )
        .bind(site_code)
        .bind(date)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create usage row", e))?;

        sqlx::query(
            "SELECT used FROM site_quota_usage WHERE site_code = $1 AND quota_date = $2 FOR UPDATE",
        )
        .bind(site_code)
        .bind(date)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock usage row", e))?;
        Ok(())
    }

    /// Recompute the held total from reservation rows.
    async fn sum_held(conn: &mut PgConnection, site_code: &str, date: NaiveDate) -> AppResult<u32> {
        let held: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(diver_count), 0)::BIGINT FROM quota_reservations \
             WHERE site_code = $1 AND quota_date = $2 AND status IN ('pending', 'approved')",
        )
        .bind(site_code)
        .bind(date)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to sum held divers", e))?;
        Ok(held.max(0) as u32)
    }

    /// Write the recomputed running total back to the usage row.
    async fn store_used(
        conn: &mut PgConnection,
        site_code: &str,
        date: NaiveDate,
        used: u32,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE site_quota_usage SET used = $3, updated_at = NOW() \
             WHERE site_code = $1 AND quota_date = $2",
        )
        .bind(site_code)
        .bind(date)
        .bind(used as i32)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update usage row", e))?;
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn approved_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(diver_count), 0)::BIGINT FROM quota_reservations \
             WHERE site_code = $1 AND quota_date = $2 AND status = 'approved'",
        )
        .bind(site_code)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to sum approved divers", e)
        })?;
        Ok(total.max(0) as u32)
    }

    async fn held_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e)
        })?;
        Self::sum_held(&mut conn, site_code, date).await
    }

    async fn reserve_pending(
        &self,
        request: &NewReservation,
        daily_limit: u32,
    ) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        Self::lock_usage_row(&mut tx, &request.site_code, request.quota_date).await?;
        let held = Self::sum_held(&mut tx, &request.site_code, request.quota_date).await?;
        let requested = request.diver_count.max(0) as u32;

        if held + requested > daily_limit {
            debug!(
                site_code = %request.site_code,
                date = %request.quota_date,
                held,
                requested,
                daily_limit,
                "Reservation rejected inside transaction"
            );
            // Dropping the transaction rolls it back.
            return Err(AppError::quota_exceeded(format!(
                "Site {} has {} of {} divers remaining on {}, {} requested",
                request.site_code,
                daily_limit.saturating_sub(held),
                daily_limit,
                request.quota_date,
                requested
            )));
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO quota_reservations (site_code, quota_date, diver_count, center_id, trip_id, status) \
             VALUES ($1, $2, $3, $4, $5, 'pending') RETURNING *",
        )
        .bind(&request.site_code)
        .bind(request.quota_date)
        .bind(request.diver_count)
        .bind(request.center_id)
        .bind(request.trip_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert reservation", e)
        })?;

        Self::store_used(&mut tx, &request.site_code, request.quota_date, held + requested).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit reservation", e)
        })?;

        info!(
            reservation_id = %reservation.id,
            site_code = %reservation.site_code,
            date = %reservation.quota_date,
            diver_count = reservation.diver_count,
            "Pending reservation committed"
        );
        Ok(reservation)
    }

    async fn mark_approved(&self, id: Uuid, permit: &PermitNumber) -> AppResult<Reservation> {
        let updated = sqlx::query_as::<_, Reservation>(
            "UPDATE quota_reservations SET status = 'approved', permit_number = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id)
        .bind(permit.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to approve reservation", e)
        })?;

        match updated {
            Some(reservation) => Ok(reservation),
            None => match self.find_by_id(id).await? {
                Some(current) => Err(AppError::conflict(format!(
                    "Reservation {id} is {} and cannot be approved",
                    current.status
                ))),
                None => Err(AppError::not_found(format!("Reservation {id} not found"))),
            },
        }
    }

    async fn mark_cancelled(&self, id: Uuid, reason: &str) -> AppResult<Reservation> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Reservation {id} not found")))?;
        if current.status.is_terminal() {
            return Ok(current);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        Self::lock_usage_row(&mut tx, &current.site_code, current.quota_date).await?;

        let cancelled = sqlx::query_as::<_, Reservation>(
            "UPDATE quota_reservations SET status = 'cancelled', reason = $2, updated_at = NOW() \
             WHERE id = $1 AND status <> 'cancelled' RETURNING *",
        )
        .bind(id)
        .bind(reason)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to cancel reservation", e)
        })?;

        let Some(cancelled) = cancelled else {
            // A concurrent cancel won; report the row as it stands.
            drop(tx);
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Reservation {id} not found")));
        };

        let held = Self::sum_held(&mut tx, &cancelled.site_code, cancelled.quota_date).await?;
        Self::store_used(&mut tx, &cancelled.site_code, cancelled.quota_date, held).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit cancellation", e)
        })?;

        Ok(cancelled)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM quota_reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find reservation", e)
            })
    }

    async fn find_by_permit(&self, permit: &PermitNumber) -> AppResult<Option<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM quota_reservations WHERE permit_number = $1",
        )
        .bind(permit.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find reservation by permit", e)
        })
    }

    async fn find_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM quota_reservations WHERE trip_id = $1 ORDER BY created_at DESC",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find trip reservations", e)
        })
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM quota_reservations WHERE status = 'pending' AND created_at < $1 \
             ORDER BY created_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find stale reservations", e)
        })
    }
}
