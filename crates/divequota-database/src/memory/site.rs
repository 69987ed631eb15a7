//! In-memory site directory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use divequota_core::result::AppResult;
use divequota_entity::site::{NearbySite, SiteQuotaConfig};

use crate::directory::SiteDirectory;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Site directory held in memory, keyed by site code.
#[derive(Debug, Clone, Default)]
pub struct MemorySiteDirectory {
    sites: Arc<RwLock<HashMap<String, SiteQuotaConfig>>>,
}

impl MemorySiteDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with `sites`.
    pub fn with_sites(sites: impl IntoIterator<Item = SiteQuotaConfig>) -> Self {
        let map = sites
            .into_iter()
            .map(|s| (s.site_code.clone(), s))
            .collect();
        Self {
            sites: Arc::new(RwLock::new(map)),
        }
    }

    /// Add or replace a site.
    pub async fn insert(&self, site: SiteQuotaConfig) {
        self.sites.write().await.insert(site.site_code.clone(), site);
    }
}

/// Great-circle distance between two coordinates in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[async_trait]
impl SiteDirectory for MemorySiteDirectory {
    async fn get_site(&self, site_code: &str) -> AppResult<Option<SiteQuotaConfig>> {
        Ok(self.sites.read().await.get(site_code).cloned())
    }

    async fn find_nearby(
        &self,
        site_code: &str,
        radius_km: f64,
        limit: usize,
    ) -> AppResult<Vec<NearbySite>> {
        let sites = self.sites.read().await;
        let Some(origin) = sites.get(site_code) else {
            return Ok(Vec::new());
        };

        let mut nearby: Vec<NearbySite> = sites
            .values()
            .filter(|s| s.site_code != site_code)
            .map(|s| NearbySite {
                distance_km: haversine_km(
                    origin.latitude,
                    origin.longitude,
                    s.latitude,
                    s.longitude,
                ),
                site: s.clone(),
            })
            .filter(|n| n.distance_km <= radius_km)
            .collect();

        nearby.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.site.site_code.cmp(&b.site.site_code))
        });
        nearby.truncate(limit);
        Ok(nearby)
    }
}
