//! Advisory snapshot cache in front of the reservation store.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use divequota_cache::keys;
use divequota_core::traits::CacheProvider;
use divequota_entity::quota::QuotaSnapshot;

/// Read-through cache of [`QuotaSnapshot`]s keyed by site-date.
///
/// Never authoritative: failures are logged and read as misses, and
/// nothing on the reservation path trusts a cached value.
#[derive(Debug, Clone)]
pub struct QuotaCache {
    provider: Arc<dyn CacheProvider>,
    ttl: Duration,
}

impl QuotaCache {
    /// Wrap a provider; entries live for `ttl`.
    pub fn new(provider: Arc<dyn CacheProvider>, ttl: Duration) -> Self {
        Self { provider, ttl }
    }

    /// Configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh snapshot for a site-date, if cached.
    pub async fn get(&self, site_code: &str, date: NaiveDate) -> Option<QuotaSnapshot> {
        let key = keys::quota_snapshot(site_code, date);
        let raw = match self.provider.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(site_code, %date, error = %e, "Quota cache read failed, treating as miss");
                return None;
            }
        };

        let snapshot: QuotaSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(site_code, %date, error = %e, "Discarding unreadable quota snapshot");
                self.invalidate(site_code, date).await;
                return None;
            }
        };

        // Backends round TTLs; the snapshot carries its own age.
        let max_age = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        if !snapshot.is_fresh(max_age) {
            debug!(site_code, %date, "Cached quota snapshot expired");
            return None;
        }
        Some(snapshot)
    }

    /// Store a snapshot.
    pub async fn put(&self, snapshot: &QuotaSnapshot) {
        let key = keys::quota_snapshot(&snapshot.site_code, snapshot.date);
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    site_code = %snapshot.site_code,
                    error = %e,
                    "Failed to encode quota snapshot"
                );
                return;
            }
        };
        if let Err(e) = self.provider.set(&key, &json, self.ttl).await {
            warn!(
                site_code = %snapshot.site_code,
                date = %snapshot.date,
                error = %e,
                "Quota cache write failed"
            );
        }
    }

    /// Drop the snapshot for a site-date.
    pub async fn invalidate(&self, site_code: &str, date: NaiveDate) {
        if let Err(e) = self.provider.delete(&keys::quota_snapshot(site_code, date)).await {
            warn!(site_code, %date, error = %e, "Quota cache invalidation failed");
        }
    }

    /// Drop every snapshot of a site, e.g. after its limit changed.
    pub async fn invalidate_site(&self, site_code: &str) {
        match self.provider.delete_pattern(&keys::site_snapshot_pattern(site_code)).await {
            Ok(count) => debug!(site_code, count, "Invalidated site quota snapshots"),
            Err(e) => warn!(site_code, error = %e, "Quota cache invalidation failed"),
        }
    }
}
