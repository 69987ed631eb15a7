//! Site quota configuration entity.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::zone::ConservationZone;

/// Per-site quota settings, owned by site administration.
///
/// Read-only from the quota engine's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SiteQuotaConfig {
    /// Unique site code.
    pub site_code: String,
    /// Display name.
    pub name: String,
    /// Maximum divers permitted per calendar day.
    pub daily_limit: i32,
    /// Conservation zone.
    pub zone: ConservationZone,
    /// Per-diver fee overriding the zone rate, in whole SAR.
    pub fee_override: Option<i64>,
    /// Site latitude in degrees.
    pub latitude: f64,
    /// Site longitude in degrees.
    pub longitude: f64,
}

impl SiteQuotaConfig {
    /// Daily limit as an unsigned count. Negative values read as zero.
    pub fn limit(&self) -> u32 {
        self.daily_limit.max(0) as u32
    }
}

/// A site returned by a proximity lookup, with its distance from the origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbySite {
    /// The candidate site.
    pub site: SiteQuotaConfig,
    /// Great-circle distance from the origin site in kilometres.
    pub distance_km: f64,
}
