//! Read-only site directory trait.

use async_trait::async_trait;

use divequota_core::result::AppResult;
use divequota_entity::site::{NearbySite, SiteQuotaConfig};

/// Lookup of dive sites configured for quota tracking.
///
/// Owned by site administration; the quota engine only reads it.
#[async_trait]
pub trait SiteDirectory: Send + Sync + std::fmt::Debug {
    /// Quota configuration of a site, or `None` if it is not tracked.
    async fn get_site(&self, site_code: &str) -> AppResult<Option<SiteQuotaConfig>>;

    /// Other tracked sites within `radius_km` of `site_code`, nearest
    /// first, at most `limit` entries. Empty if the origin is unknown.
    async fn find_nearby(
        &self,
        site_code: &str,
        radius_km: f64,
        limit: usize,
    ) -> AppResult<Vec<NearbySite>>;
}
