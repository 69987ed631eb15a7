//! Quota forecast points.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remaining ratio at or below which a day is reported as `limited`.
const LIMITED_RATIO: f64 = 0.2;

/// Availability label derived from the remaining/limit ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastStatus {
    /// More than 20% of the limit remains.
    Available,
    /// Some capacity remains, 20% of the limit or less.
    Limited,
    /// Nothing remains.
    Full,
}

impl ForecastStatus {
    /// Classify a day from its remaining capacity and limit.
    pub fn classify(remaining: u32, daily_limit: u32) -> Self {
        if remaining == 0 || daily_limit == 0 {
            return Self::Full;
        }
        if f64::from(remaining) / f64::from(daily_limit) <= LIMITED_RATIO {
            Self::Limited
        } else {
            Self::Available
        }
    }

    /// Return the label as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Limited => "limited",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ForecastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One day of a site's quota forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Calendar day.
    pub date: NaiveDate,
    /// Daily diver limit.
    pub daily_limit: u32,
    /// Divers in approved reservations.
    pub reserved: u32,
    /// `daily_limit - reserved`, floored at zero.
    pub remaining: u32,
    /// Availability label.
    pub status: ForecastStatus,
}

impl ForecastPoint {
    /// Build a point from a day's figures.
    pub fn new(date: NaiveDate, daily_limit: u32, reserved: u32) -> Self {
        let remaining = daily_limit.saturating_sub(reserved);
        Self {
            date,
            daily_limit,
            reserved,
            remaining,
            status: ForecastStatus::classify(remaining, daily_limit),
        }
    }
}
