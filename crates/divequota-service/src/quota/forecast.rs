//! Forecasts, alternative sites and conservation fees.

use chrono::Utc;
use futures::{Stream, StreamExt, TryStreamExt, stream};
use tracing::{debug, warn};

use divequota_core::error::AppError;
use divequota_core::result::AppResult;
use divequota_core::types::IntoQuotaDate;
use divequota_entity::quota::{AlternativeSite, ConservationFeeResult, ForecastPoint};

use super::engine::{QuotaEngine, validate_diver_count};

/// How many directory candidates are examined per alternative returned.
const CANDIDATES_PER_ALTERNATIVE: usize = 4;

impl QuotaEngine {
    /// Lazily yield `days` forecast points starting today.
    ///
    /// `None` uses `forecast_default_days`. Each point is computed when
    /// polled from that day's snapshot, so days change independently as
    /// reservations land. Fails up front with `NotFound` for an unknown site
    /// and with `Validation` for a window of 0 or over `forecast_max_days`.
    pub async fn forecast_stream(
        &self,
        site_code: &str,
        days: Option<u32>,
    ) -> AppResult<impl Stream<Item = AppResult<ForecastPoint>> + '_> {
        let days = days.unwrap_or(self.config.forecast_default_days);
        let max_days = self.config.forecast_max_days;
        if days == 0 || days > max_days {
            return Err(AppError::validation(format!(
                "Forecast window must be between 1 and {max_days} days, got {days}"
            )));
        }
        let site = self.require_site(site_code).await?;
        let days = days as usize;
        let today = Utc::now().date_naive();

        Ok(stream::iter(today.iter_days().take(days)).then(move |date| {
            let site = site.clone();
            async move {
                let snapshot = self.snapshot(&site, date).await?;
                Ok(ForecastPoint::new(date, snapshot.daily_limit, snapshot.used))
            }
        }))
    }

    /// Forecast for `days` consecutive days starting today.
    pub async fn get_quota_forecast(
        &self,
        site_code: &str,
        days: Option<u32>,
    ) -> AppResult<Vec<ForecastPoint>> {
        self.forecast_stream(site_code, days)
            .await?
            .try_collect()
            .await
    }

    /// Nearby sites that can take `diver_count` divers on `date`, nearest
    /// first, each with its own conservation fee.
    pub async fn get_alternative_sites(
        &self,
        site_code: &str,
        date: impl IntoQuotaDate,
        diver_count: i32,
    ) -> AppResult<Vec<AlternativeSite>> {
        let divers = validate_diver_count(diver_count)?;
        let date = date.into_quota_date()?;
        self.require_site(site_code).await?;

        let wanted = self.config.alternative_limit;
        let candidates = self
            .sites
            .find_nearby(
                site_code,
                self.config.alternative_radius_km,
                wanted.saturating_mul(CANDIDATES_PER_ALTERNATIVE),
            )
            .await?;

        let mut alternatives = Vec::with_capacity(wanted);
        for candidate in candidates {
            if alternatives.len() == wanted {
                break;
            }
            let snapshot = self.snapshot(&candidate.site, date).await?;
            if snapshot.remaining < divers {
                continue;
            }
            let site = candidate.site;
            let fee = match self.fees.quote(
                Some(&site.site_code),
                site.zone,
                site.fee_override,
                divers,
            ) {
                Ok(fee) => fee,
                Err(e) => {
                    warn!(
                        site_code = %site.site_code,
                        error = %e,
                        "Skipping alternative site with unpriceable fee"
                    );
                    continue;
                }
            };
            alternatives.push(AlternativeSite {
                fee,
                site_code: site.site_code,
                name: site.name,
                distance_km: candidate.distance_km,
                remaining: snapshot.remaining,
                daily_limit: snapshot.daily_limit,
            });
        }

        debug!(
            site_code,
            %date,
            diver_count,
            found = alternatives.len(),
            "Alternative sites resolved"
        );
        Ok(alternatives)
    }

    /// Conservation fee for `diver_count` divers.
    ///
    /// A known site's fee override takes precedence; otherwise `zone` is
    /// looked up in the fee table, and an unrecognised zone is charged at
    /// the zone_2 rate.
    pub async fn calculate_conservation_fee(
        &self,
        site_code: Option<&str>,
        zone: &str,
        diver_count: i32,
    ) -> AppResult<ConservationFeeResult> {
        let divers = validate_diver_count(diver_count)?;
        let zone = self.fees.resolve_zone(zone);

        let fee_override = match site_code {
            Some(code) => self
                .sites
                .get_site(code)
                .await?
                .and_then(|site| site.fee_override),
            None => None,
        };

        self.fees.quote(site_code, zone, fee_override, divers)
    }
}
