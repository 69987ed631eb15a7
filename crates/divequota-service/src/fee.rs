//! Conservation fee table.

use tracing::warn;

use divequota_core::error::AppError;
use divequota_core::result::AppResult;
use divequota_entity::quota::ConservationFeeResult;
use divequota_entity::site::ConservationZone;

/// Currency every fee is quoted in.
pub const FEE_CURRENCY: &str = "SAR";

/// Zone whose rate applies when a zone code is not recognised.
pub const FALLBACK_ZONE: ConservationZone = ConservationZone::Zone2;

/// Static per-diver conservation fees by zone, in whole SAR.
#[derive(Debug, Clone)]
pub struct FeeTable {
    zone_1: i64,
    zone_2: i64,
    zone_3: i64,
}

impl Default for FeeTable {
    fn default() -> Self {
        Self {
            zone_1: 50,
            zone_2: 35,
            zone_3: 20,
        }
    }
}

impl FeeTable {
    /// Per-diver fee for a zone.
    pub fn rate(&self, zone: ConservationZone) -> i64 {
        match zone {
            ConservationZone::Zone1 => self.zone_1,
            ConservationZone::Zone2 => self.zone_2,
            ConservationZone::Zone3 => self.zone_3,
        }
    }

    /// Resolve a zone code, falling back to [`FALLBACK_ZONE`] when unknown.
    pub fn resolve_zone(&self, code: &str) -> ConservationZone {
        ConservationZone::from_code(code).unwrap_or_else(|| {
            warn!(
                zone = code,
                fallback = %FALLBACK_ZONE,
                "Unrecognised conservation zone, applying fallback rate"
            );
            FALLBACK_ZONE
        })
    }

    /// Fee for `diver_count` divers. A site override replaces the zone rate.
    ///
    /// Fails with `Validation` when the total does not fit in an `i64`.
    pub fn quote(
        &self,
        site_code: Option<&str>,
        zone: ConservationZone,
        fee_override: Option<i64>,
        diver_count: u32,
    ) -> AppResult<ConservationFeeResult> {
        let fee_per_diver = fee_override.unwrap_or_else(|| self.rate(zone));
        let total_fee = fee_per_diver
            .checked_mul(i64::from(diver_count))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Fee of {fee_per_diver} {FEE_CURRENCY} x {diver_count} divers is out of range"
                ))
            })?;

        Ok(ConservationFeeResult {
            site_code: site_code.map(str::to_string),
            zone,
            fee_per_diver,
            diver_count,
            total_fee,
            currency: FEE_CURRENCY.to_string(),
        })
    }
}
