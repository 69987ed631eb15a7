//! Alternative site suggestions.

use serde::{Deserialize, Serialize};

use super::fee::ConservationFeeResult;

/// A nearby site with enough remaining quota for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSite {
    /// Site code.
    pub site_code: String,
    /// Display name.
    pub name: String,
    /// Distance from the originally requested site in kilometres.
    pub distance_km: f64,
    /// Remaining quota on the requested date.
    pub remaining: u32,
    /// Daily limit of the alternative site.
    pub daily_limit: u32,
    /// Conservation fee for the requested diver count at this site.
    pub fee: ConservationFeeResult,
}
