//! Conservation zone classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Environmental classification of a dive site, used to pick its fee rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "conservation_zone")]
pub enum ConservationZone {
    /// Most protected reefs.
    #[serde(rename = "zone_1")]
    #[sqlx(rename = "zone_1")]
    Zone1,
    /// Standard protection.
    #[serde(rename = "zone_2")]
    #[sqlx(rename = "zone_2")]
    Zone2,
    /// Lowest protection tier.
    #[serde(rename = "zone_3")]
    #[sqlx(rename = "zone_3")]
    Zone3,
}

impl ConservationZone {
    /// Parse a zone code. Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "zone_1" => Some(Self::Zone1),
            "zone_2" => Some(Self::Zone2),
            "zone_3" => Some(Self::Zone3),
            _ => None,
        }
    }

    /// Return the zone code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zone1 => "zone_1",
            Self::Zone2 => "zone_2",
            Self::Zone3 => "zone_3",
        }
    }
}

impl fmt::Display for ConservationZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
