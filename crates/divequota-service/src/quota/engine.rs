//! Quota engine construction, availability checks and read paths.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time;
use tracing::{debug, warn};
use uuid::Uuid;

use divequota_authority::{AuthorityClient, AuthorityMode};
use divequota_core::config::SrsaConfig;
use divequota_core::error::AppError;
use divequota_core::result::AppResult;
use divequota_core::retry::RetryPolicy;
use divequota_core::traits::CacheProvider;
use divequota_core::types::IntoQuotaDate;
use divequota_database::{ReservationStore, SiteDirectory};
use divequota_entity::quota::QuotaSnapshot;
use divequota_entity::reservation::{PermitNumber, Reservation};
use divequota_entity::site::SiteQuotaConfig;

use super::cache::QuotaCache;
use crate::fee::FeeTable;

/// Orchestrates quota checks, reservations, cancellations, forecasts,
/// alternatives and conservation fees.
///
/// The reservation store is the only arbiter of capacity. The snapshot
/// cache serves reads and is invalidated on every write; the authority
/// adapter is fixed at construction.
#[derive(Debug)]
pub struct QuotaEngine {
    pub(super) config: SrsaConfig,
    pub(super) sites: Arc<dyn SiteDirectory>,
    pub(super) store: Arc<dyn ReservationStore>,
    pub(super) authority: Arc<dyn AuthorityClient>,
    pub(super) cache: QuotaCache,
    pub(super) fees: FeeTable,
    pub(super) retry: RetryPolicy,
}

impl QuotaEngine {
    /// Creates a new quota engine.
    pub fn new(
        config: SrsaConfig,
        sites: Arc<dyn SiteDirectory>,
        store: Arc<dyn ReservationStore>,
        authority: Arc<dyn AuthorityClient>,
        cache: Arc<dyn CacheProvider>,
    ) -> Self {
        let cache = QuotaCache::new(cache, config.cache_ttl());
        let retry = RetryPolicy::from(&config.retry);
        Self {
            config,
            sites,
            store,
            authority,
            cache,
            fees: FeeTable::default(),
            retry,
        }
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &SrsaConfig {
        &self.config
    }

    /// Which authority adapter is in use.
    pub fn authority_mode(&self) -> AuthorityMode {
        self.authority.mode()
    }

    /// Availability of a site-date for `diver_count` divers.
    ///
    /// Served from the snapshot cache when fresh; otherwise recomputed
    /// from approved reservations and cached. Never writes the store.
    pub async fn check_quota(
        &self,
        site_code: &str,
        date: impl IntoQuotaDate,
        diver_count: i32,
    ) -> AppResult<QuotaSnapshot> {
        let divers = validate_diver_count(diver_count)?;
        let date = date.into_quota_date()?;
        let site = self.require_site(site_code).await?;

        let snapshot = self.snapshot(&site, date).await?;
        debug!(
            site_code,
            %date,
            diver_count,
            remaining = snapshot.remaining,
            "Quota checked"
        );
        Ok(snapshot.for_request(divers))
    }

    /// Quota configuration of a site, or `None` if it is not tracked.
    pub async fn get_site_info(&self, site_code: &str) -> AppResult<Option<SiteQuotaConfig>> {
        self.sites.get_site(site_code).await
    }

    /// Reservation holding a permit number, if any.
    ///
    /// Callers that timed out on a reservation use this (or
    /// [`QuotaEngine::find_reservations_by_trip`]) before retrying.
    pub async fn get_reservation(&self, permit_number: &str) -> AppResult<Option<Reservation>> {
        self.store
            .find_by_permit(&PermitNumber::new(permit_number.trim()))
            .await
    }

    /// All reservations of a trip, newest first.
    pub async fn find_reservations_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.store.find_by_trip(trip_id).await
    }

    /// Drop every cached snapshot of a site.
    pub async fn invalidate_site(&self, site_code: &str) {
        self.cache.invalidate_site(site_code).await;
    }

    pub(super) async fn require_site(&self, site_code: &str) -> AppResult<SiteQuotaConfig> {
        self.sites
            .get_site(site_code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Dive site '{site_code}' is not tracked")))
    }

    /// Cached or freshly computed snapshot of approved usage.
    pub(super) async fn snapshot(
        &self,
        site: &SiteQuotaConfig,
        date: NaiveDate,
    ) -> AppResult<QuotaSnapshot> {
        if let Some(cached) = self.cache.get(&site.site_code, date).await {
            return Ok(cached);
        }

        let local = self.store.approved_total(&site.site_code, date).await?;
        let used = match self.authority.mode() {
            AuthorityMode::Mock => local,
            AuthorityMode::Live => self.merge_reported_usage(&site.site_code, date, local).await,
        };

        let snapshot = QuotaSnapshot::compute(&site.site_code, date, site.limit(), used);
        self.cache.put(&snapshot).await;
        Ok(snapshot)
    }

    async fn merge_reported_usage(&self, site_code: &str, date: NaiveDate, local: u32) -> u32 {
        let reported = with_timeout(
            self.config.request_timeout(),
            "Regulator usage lookup",
            self.authority.reported_usage(site_code, date),
        )
        .await;

        match reported {
            Ok(Some(remote)) => {
                if remote != local {
                    warn!(
                        site_code,
                        %date,
                        local,
                        remote,
                        "Regulator usage differs from local store"
                    );
                }
                local.max(remote)
            }
            Ok(None) => local,
            Err(e) => {
                warn!(
                    site_code,
                    %date,
                    error = %e,
                    "Regulator usage unavailable, using local store"
                );
                local
            }
        }
    }
}

/// Reject non-positive diver counts.
pub(super) fn validate_diver_count(diver_count: i32) -> AppResult<u32> {
    if diver_count < 1 {
        return Err(AppError::validation(format!(
            "Diver count must be at least 1, got {diver_count}"
        )));
    }
    Ok(diver_count as u32)
}

/// Run an authority call under a deadline; expiry reads as unavailability.
pub(super) async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    call: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    match time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::authority_unavailable(format!(
            "{what} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
