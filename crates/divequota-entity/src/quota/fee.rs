//! Conservation fee calculation result.

use serde::{Deserialize, Serialize};

use crate::site::ConservationZone;

/// Fee line item for a group of divers. Persisted by the payment flow,
/// not by the quota engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConservationFeeResult {
    /// Site the fee was calculated for, when known.
    pub site_code: Option<String>,
    /// Zone whose rate applied (the fallback zone for unrecognized codes).
    pub zone: ConservationZone,
    /// Fee per diver in whole currency units.
    pub fee_per_diver: i64,
    /// Number of divers.
    pub diver_count: u32,
    /// `fee_per_diver * diver_count`.
    pub total_fee: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}
