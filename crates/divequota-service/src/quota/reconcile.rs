//! Resolution of reservations left `pending`.

use chrono::Utc;
use tracing::{info, warn};

use divequota_core::error::{AppError, ErrorKind};
use divequota_core::result::AppResult;
use divequota_core::retry::retry_with_backoff;
use divequota_entity::reservation::{Reservation, ReservationStatus};

use super::engine::{QuotaEngine, with_timeout};

/// Reason recorded on a pending reservation the authority never approved.
pub const REASON_STALE_PENDING: &str = "stale pending";

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale pending reservations found.
    pub examined: usize,
    /// Approved because the authority had issued a permit.
    pub approved: usize,
    /// Cancelled because the authority knew nothing of them.
    pub cancelled: usize,
    /// Left pending because the authority could not be asked.
    pub deferred: usize,
}

impl QuotaEngine {
    /// Resolve `pending` reservations older than `pending_grace_seconds`.
    ///
    /// Such a row means the process stopped between the store commit and
    /// the authority reply. The authority is asked whether it issued a
    /// permit for the reservation; if so the row is approved, otherwise
    /// cancelled. Rows whose status cannot be confirmed stay pending for
    /// the next pass.
    pub async fn reconcile_pending(&self) -> AppResult<SweepReport> {
        let cutoff = Utc::now() - self.config.pending_grace();
        let stale = self.store.find_stale_pending(cutoff).await?;

        let mut report = SweepReport {
            examined: stale.len(),
            ..SweepReport::default()
        };

        for reservation in stale {
            match self.resolve_one(&reservation).await {
                Ok(Resolution::Approved) => report.approved += 1,
                Ok(Resolution::Cancelled) => report.cancelled += 1,
                Ok(Resolution::AlreadyResolved) => {}
                Err(e) => {
                    warn!(
                        reservation_id = %reservation.id,
                        site_code = %reservation.site_code,
                        date = %reservation.quota_date,
                        error = %e,
                        "Could not resolve stale pending reservation"
                    );
                    report.deferred += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                approved = report.approved,
                cancelled = report.cancelled,
                deferred = report.deferred,
                "Stale pending reservations reconciled"
            );
        }
        Ok(report)
    }

    async fn resolve_one(&self, reservation: &Reservation) -> AppResult<Resolution> {
        let permit = retry_with_backoff(
            &self.retry,
            || {
                with_timeout(
                    self.config.request_timeout(),
                    "Permit lookup",
                    self.authority.lookup_permit(reservation.id),
                )
            },
            AppError::is_retryable,
            "srsa.lookup_permit",
        )
        .await?;

        let outcome = match permit {
            Some(permit) => match self.store.mark_approved(reservation.id, &permit).await {
                Ok(_) => {
                    info!(
                        reservation_id = %reservation.id,
                        permit_number = %permit,
                        "Stale pending reservation approved from regulator record"
                    );
                    Resolution::Approved
                }
                Err(e) if e.kind == ErrorKind::Conflict => Resolution::AlreadyResolved,
                Err(e) => return Err(e),
            },
            None => {
                // Only reservations still pending are released; the grace
                // period outlasts every reserve call's own timeouts.
                let current = self.store.find_by_id(reservation.id).await?;
                if current.is_none_or(|r| r.status != ReservationStatus::Pending) {
                    Resolution::AlreadyResolved
                } else {
                    self.store
                        .mark_cancelled(reservation.id, REASON_STALE_PENDING)
                        .await?;
                    warn!(
                        reservation_id = %reservation.id,
                        site_code = %reservation.site_code,
                        date = %reservation.quota_date,
                        diver_count = reservation.diver_count,
                        "Stale pending reservation cancelled"
                    );
                    Resolution::Cancelled
                }
            }
        };

        self.cache
            .invalidate(&reservation.site_code, reservation.quota_date)
            .await;
        Ok(outcome)
    }
}

enum Resolution {
    Approved,
    Cancelled,
    AlreadyResolved,
}
