//! Regulator (SRSA) integration and quota engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Immutable configuration handed to the quota engine at construction.
///
/// `use_mock` selects the authority adapter once; nothing inside the
/// engine re-reads it per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrsaConfig {
    /// Use the local mock authority instead of the regulator API.
    #[serde(default = "default_true")]
    pub use_mock: bool,
    /// Base URL of the regulator permit API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key sent with every regulator request.
    #[serde(default)]
    pub api_key: String,
    /// API secret sent with every regulator request.
    #[serde(default)]
    pub api_secret: String,
    /// How long a quota snapshot stays in the cache.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Forecast window used when the caller does not specify one.
    #[serde(default = "default_forecast_days")]
    pub forecast_default_days: u32,
    /// Longest forecast window a caller may request.
    #[serde(default = "default_forecast_max_days")]
    pub forecast_max_days: u32,
    /// Timeout for a single regulator request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Timeout for the transactional store step of a reservation.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_seconds: u64,
    /// Age after which a `pending` reservation is treated as orphaned.
    #[serde(default = "default_pending_grace")]
    pub pending_grace_seconds: u64,
    /// How often the pending-reservation sweeper runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Search radius for alternative sites.
    #[serde(default = "default_alternative_radius")]
    pub alternative_radius_km: f64,
    /// Maximum number of alternative sites returned.
    #[serde(default = "default_alternative_limit")]
    pub alternative_limit: usize,
    /// Retry policy for idempotent regulator calls (lookups, cancellations).
    #[serde(default)]
    pub retry: RetrySettings,
}

impl SrsaConfig {
    /// Cache TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Regulator request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Store step timeout as a [`Duration`].
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_seconds)
    }

    /// Pending grace period as a [`chrono::Duration`].
    pub fn pending_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.pending_grace_seconds as i64)
    }
}

impl Default for SrsaConfig {
    fn default() -> Self {
        Self {
            use_mock: true,
            api_url: default_api_url(),
            api_key: String::new(),
            api_secret: String::new(),
            cache_ttl_seconds: default_cache_ttl(),
            forecast_default_days: default_forecast_days(),
            forecast_max_days: default_forecast_max_days(),
            request_timeout_seconds: default_request_timeout(),
            store_timeout_seconds: default_store_timeout(),
            pending_grace_seconds: default_pending_grace(),
            sweep_interval_seconds: default_sweep_interval(),
            alternative_radius_km: default_alternative_radius(),
            alternative_limit: default_alternative_limit(),
            retry: RetrySettings::default(),
        }
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum number of attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Upper bound on the delay between retries in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_url() -> String {
    "https://api.srsa.gov.sa/v1".to_string()
}

fn default_cache_ttl() -> u64 {
    30
}

fn default_forecast_days() -> u32 {
    7
}

fn default_forecast_max_days() -> u32 {
    90
}

fn default_request_timeout() -> u64 {
    10
}

fn default_store_timeout() -> u64 {
    5
}

fn default_pending_grace() -> u64 {
    120
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_alternative_radius() -> f64 {
    50.0
}

fn default_alternative_limit() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    200
}

fn default_max_delay() -> u64 {
    5000
}
