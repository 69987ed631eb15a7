//! Reserve and cancel.

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use divequota_authority::{PermitDecision, PermitRequest};
use divequota_core::error::{AppError, ErrorKind};
use divequota_core::result::AppResult;
use divequota_core::retry::retry_with_backoff;
use divequota_core::types::IntoQuotaDate;
use divequota_entity::reservation::{NewReservation, PermitNumber, Reservation, ReservationStatus};

use super::engine::{QuotaEngine, validate_diver_count, with_timeout};

/// Reason recorded when the authority refuses a permit.
pub const REASON_AUTHORITY_DENIED: &str = "authority denied";
/// Reason recorded when the authority could not be reached.
pub const REASON_AUTHORITY_UNAVAILABLE: &str = "authority unavailable";
/// Reason recorded when the approval could not be persisted locally.
pub const REASON_APPROVAL_NOT_PERSISTED: &str = "local approval failed";

impl QuotaEngine {
    /// Reserve capacity for `diver_count` divers and obtain a permit.
    ///
    /// The store re-checks capacity and inserts a `pending` row in one
    /// transaction; only then is the authority asked for a permit. Any
    /// authority failure cancels the row, so the call ends with either an
    /// `approved` reservation carrying a permit number or an error and no
    /// capacity held.
    pub async fn reserve_permit(
        &self,
        site_code: &str,
        date: impl IntoQuotaDate,
        diver_count: i32,
        center_id: Uuid,
        trip_id: Uuid,
    ) -> AppResult<Reservation> {
        validate_diver_count(diver_count)?;
        let date = date.into_quota_date()?;
        let today = Utc::now().date_naive();
        if date < today {
            return Err(AppError::validation(format!(
                "Cannot reserve quota for {date}, which is before {today}"
            )));
        }
        let site = self.require_site(site_code).await?;

        let request = NewReservation {
            site_code: site.site_code.clone(),
            quota_date: date,
            diver_count,
            center_id,
            trip_id,
        };

        let pending = match tokio::time::timeout(
            self.config.store_timeout(),
            self.store.reserve_pending(&request, site.limit()),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(site_code, %date, diver_count, "Reservation store timed out");
                return Err(AppError::authority_unavailable(format!(
                    "Reservation store did not answer within {}s; check the trip's reservations before retrying",
                    self.config.store_timeout_seconds
                )));
            }
        };

        let permit_request = PermitRequest {
            reference: pending.id,
            site_code: pending.site_code.clone(),
            date,
            diver_count: pending.divers(),
            center_id,
            trip_id,
        };

        let decision = with_timeout(
            self.config.request_timeout(),
            "Permit request",
            self.authority.request_permit(&permit_request),
        )
        .await;

        match decision {
            Ok(PermitDecision::Approved { permit_number }) => {
                self.finish_approval(pending, permit_number).await
            }
            Ok(PermitDecision::Denied { reason }) => {
                warn!(
                    reservation_id = %pending.id,
                    site_code,
                    %date,
                    diver_count,
                    reason = %reason,
                    "Regulator denied a request that passed the local check"
                );
                self.roll_back(&pending, REASON_AUTHORITY_DENIED).await;
                Err(AppError::authority_denied(format!(
                    "Regulator denied permit for {site_code} on {date}: {reason}"
                )))
            }
            Err(e) => {
                warn!(
                    reservation_id = %pending.id,
                    site_code,
                    %date,
                    error = %e,
                    "Permit request failed"
                );
                self.roll_back(&pending, REASON_AUTHORITY_UNAVAILABLE).await;
                // A timed-out request may still have been granted remotely.
                self.release_remote_permit(pending.id).await;
                if e.kind == ErrorKind::AuthorityUnavailable {
                    Err(e)
                } else {
                    Err(AppError::authority_unavailable(format!(
                        "Permit request failed: {}",
                        e.message
                    )))
                }
            }
        }
    }

    /// Cancel the reservation holding `permit_number`.
    ///
    /// Idempotent: cancelling a cancelled reservation succeeds without
    /// effect. The local cancellation is final; the authority is notified
    /// afterwards with retries, and a failed notification is only logged.
    pub async fn cancel_permit(&self, permit_number: &str, reason: &str) -> AppResult<()> {
        let permit = PermitNumber::new(permit_number.trim());
        let reservation = self
            .store
            .find_by_permit(&permit)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Permit '{permit}' not found")))?;

        if reservation.status == ReservationStatus::Cancelled {
            debug!(permit_number = %permit, "Permit already cancelled");
            return Ok(());
        }

        let cancelled = self.store.mark_cancelled(reservation.id, reason).await?;
        self.cache
            .invalidate(&cancelled.site_code, cancelled.quota_date)
            .await;

        info!(
            reservation_id = %cancelled.id,
            permit_number = %permit,
            site_code = %cancelled.site_code,
            date = %cancelled.quota_date,
            diver_count = cancelled.diver_count,
            reason,
            "Permit cancelled"
        );

        self.notify_cancellation(&permit, reason).await;
        Ok(())
    }

    async fn finish_approval(
        &self,
        pending: Reservation,
        permit: PermitNumber,
    ) -> AppResult<Reservation> {
        match self.store.mark_approved(pending.id, &permit).await {
            Ok(approved) => {
                self.cache
                    .invalidate(&approved.site_code, approved.quota_date)
                    .await;
                info!(
                    reservation_id = %approved.id,
                    permit_number = %permit,
                    site_code = %approved.site_code,
                    date = %approved.quota_date,
                    diver_count = approved.diver_count,
                    "Permit approved"
                );
                Ok(approved)
            }
            Err(e) => {
                error!(
                    reservation_id = %pending.id,
                    permit_number = %permit,
                    error = %e,
                    "Regulator issued a permit that could not be recorded"
                );
                self.notify_cancellation(&permit, REASON_APPROVAL_NOT_PERSISTED)
                    .await;
                self.roll_back(&pending, REASON_APPROVAL_NOT_PERSISTED).await;
                Err(e)
            }
        }
    }

    /// Cancel a `pending` row after the authority did not approve it.
    async fn roll_back(&self, pending: &Reservation, reason: &str) {
        if let Err(e) = self.store.mark_cancelled(pending.id, reason).await {
            // Left pending; the sweeper resolves it after the grace period.
            error!(
                reservation_id = %pending.id,
                error = %e,
                "Failed to roll back pending reservation"
            );
        }
        self.cache
            .invalidate(&pending.site_code, pending.quota_date)
            .await;
    }

    /// Cancel whatever permit the authority may have issued for `reference`.
    async fn release_remote_permit(&self, reference: Uuid) {
        let found = retry_with_backoff(
            &self.retry,
            || {
                with_timeout(
                    self.config.request_timeout(),
                    "Permit lookup",
                    self.authority.lookup_permit(reference),
                )
            },
            AppError::is_retryable,
            "srsa.lookup_permit",
        )
        .await;

        match found {
            Ok(Some(permit)) => {
                warn!(
                    reservation_id = %reference,
                    permit_number = %permit,
                    "Regulator issued a permit after the request failed, cancelling it"
                );
                self.notify_cancellation(&permit, REASON_AUTHORITY_UNAVAILABLE)
                    .await;
            }
            Ok(None) => {}
            Err(e) => {
                error!(
                    reservation_id = %reference,
                    error = %e,
                    "Could not confirm whether the regulator issued a permit"
                );
            }
        }
    }

    /// Best-effort cancellation at the authority.
    pub(super) async fn notify_cancellation(&self, permit: &PermitNumber, reason: &str) {
        let mode = self.authority.mode();
        if !mode.issued(permit) {
            warn!(
                permit_number = %permit,
                authority = ?mode,
                "Permit was issued by a different authority mode, not forwarding cancellation"
            );
            return;
        }

        let result = retry_with_backoff(
            &self.retry,
            || {
                with_timeout(
                    self.config.request_timeout(),
                    "Permit cancellation",
                    self.authority.cancel_permit(permit, reason),
                )
            },
            AppError::is_retryable,
            "srsa.cancel_permit",
        )
        .await;

        if let Err(e) = result {
            error!(
                permit_number = %permit,
                error = %e,
                "Regulator was not notified of cancellation; local cancellation stands"
            );
        }
    }
}
