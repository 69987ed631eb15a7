//! PostgreSQL site directory.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use divequota_core::error::{AppError, ErrorKind};
use divequota_core::result::AppResult;
use divequota_entity::site::{NearbySite, SiteQuotaConfig};

use crate::directory::SiteDirectory;

/// Site directory over the `dive_sites` table.
#[derive(Debug, Clone)]
pub struct PgSiteDirectory {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct NearbyRow {
    #[sqlx(flatten)]
    site: SiteQuotaConfig,
    distance_km: f64,
}

impl PgSiteDirectory {
    /// Create a new site directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteDirectory for PgSiteDirectory {
    async fn get_site(&self, site_code: &str) -> AppResult<Option<SiteQuotaConfig>> {
        sqlx::query_as::<_, SiteQuotaConfig>(
            "SELECT site_code, name, daily_limit, zone, fee_override, latitude, longitude \
             FROM dive_sites WHERE site_code = $1",
        )
        .bind(site_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load site", e))
    }

    async fn find_nearby(
        &self,
        site_code: &str,
        radius_km: f64,
        limit: usize,
    ) -> AppResult<Vec<NearbySite>> {
        // Haversine distance on a 6371 km sphere.
        let rows = sqlx::query_as::<_, NearbyRow>(
            "WITH origin AS ( \
                 SELECT latitude, longitude FROM dive_sites WHERE site_code = $1 \
             ), candidates AS ( \
                 SELECT s.site_code, s.name, s.daily_limit, s.zone, s.fee_override, \
                        s.latitude, s.longitude, \
                        2 * 6371.0 * asin(sqrt( \
                            power(sin(radians(s.latitude - o.latitude) / 2), 2) + \
                            cos(radians(o.latitude)) * cos(radians(s.latitude)) * \
                            power(sin(radians(s.longitude - o.longitude) / 2), 2) \
                        )) AS distance_km \
                 FROM dive_sites s, origin o \
                 WHERE s.site_code <> $1 \
             ) \
             SELECT * FROM candidates WHERE distance_km <= $2 \
             ORDER BY distance_km ASC, site_code ASC LIMIT $3",
        )
        .bind(site_code)
        .bind(radius_km)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find nearby sites", e))?;

        Ok(rows
            .into_iter()
            .map(|row| NearbySite {
                site: row.site,
                distance_km: row.distance_km,
            })
            .collect())
    }
}
