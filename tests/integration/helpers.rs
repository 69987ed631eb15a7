//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};

use divequota_authority::{AuthorityClient, MockAuthorityClient};
use divequota_cache::memory::MemoryCacheProvider;
use divequota_core::config::cache::MemoryCacheConfig;
use divequota_core::config::{DatabaseConfig, RetrySettings, SrsaConfig};
use divequota_database::{
    DatabasePool, MemoryReservationStore, MemorySiteDirectory, ReservationStore,
};
use divequota_entity::site::{ConservationZone, SiteQuotaConfig};
use divequota_service::QuotaEngine;

/// Engine wired to in-memory collaborators, with handles to each.
pub struct TestEngine {
    /// The engine under test.
    pub engine: Arc<QuotaEngine>,
    /// Reservation store behind the engine.
    pub store: Arc<MemoryReservationStore>,
    /// Site directory behind the engine.
    pub sites: Arc<MemorySiteDirectory>,
    /// Mock authority, when the engine uses one.
    pub authority: Arc<MockAuthorityClient>,
}

impl TestEngine {
    /// Engine over the standard Red Sea fixture sites and an approving mock.
    pub fn new() -> Self {
        let authority = Arc::new(MockAuthorityClient::new());
        Self::build(red_sea_sites(), authority.clone(), authority)
    }

    /// Engine over the standard sites and a custom authority.
    pub fn with_authority(authority: Arc<dyn AuthorityClient>) -> Self {
        Self::build(red_sea_sites(), authority, Arc::new(MockAuthorityClient::new()))
    }

    /// Engine over the standard sites and a custom store.
    pub fn with_store(
        store: Arc<dyn ReservationStore>,
    ) -> (Arc<QuotaEngine>, Arc<MockAuthorityClient>) {
        let authority = Arc::new(MockAuthorityClient::new());
        let engine = QuotaEngine::new(
            test_config(),
            Arc::new(MemorySiteDirectory::with_sites(red_sea_sites())),
            store,
            authority.clone(),
            cache_provider(),
        );
        (Arc::new(engine), authority)
    }

    fn build(
        sites: Vec<SiteQuotaConfig>,
        authority: Arc<dyn AuthorityClient>,
        mock: Arc<MockAuthorityClient>,
    ) -> Self {
        let store = Arc::new(MemoryReservationStore::new());
        let sites = Arc::new(MemorySiteDirectory::with_sites(sites));
        let engine = QuotaEngine::new(
            test_config(),
            sites.clone(),
            store.clone(),
            authority,
            cache_provider(),
        );
        Self {
            engine: Arc::new(engine),
            store,
            sites,
            authority: mock,
        }
    }
}

/// Configuration with fast retries.
pub fn test_config() -> SrsaConfig {
    SrsaConfig {
        retry: RetrySettings {
            max_attempts: 2,
            initial_delay_ms: 1,
            max_delay_ms: 5,
        },
        ..SrsaConfig::default()
    }
}

fn cache_provider() -> Arc<MemoryCacheProvider> {
    Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()))
}

/// A tracked site.
pub fn site(
    code: &str,
    daily_limit: i32,
    zone: ConservationZone,
    latitude: f64,
    longitude: f64,
) -> SiteQuotaConfig {
    SiteQuotaConfig {
        site_code: code.to_string(),
        name: format!("{code} reef"),
        daily_limit,
        zone,
        fee_override: None,
        latitude,
        longitude,
    }
}

/// Fixture sites around Umluj, plus one far away in the south.
///
/// | code        | limit | zone   | distance from RS-UMLUJ |
/// |-------------|-------|--------|------------------------|
/// | RS-UMLUJ    | 10    | zone_1 | 0                      |
/// | RS-LIBERTY  | 20    | zone_2 | ~5.6 km                |
/// | RS-WRECK    | 4     | zone_2 | ~11 km                 |
/// | RS-GARDEN   | 30    | zone_3 | ~22 km (fee override)  |
/// | RS-FARASAN  | 50    | zone_1 | > 50 km                |
pub fn red_sea_sites() -> Vec<SiteQuotaConfig> {
    let mut garden = site("RS-GARDEN", 30, ConservationZone::Zone3, 25.20, 37.20);
    garden.fee_override = Some(15);
    vec![
        site("RS-UMLUJ", 10, ConservationZone::Zone1, 25.00, 37.20),
        site("RS-LIBERTY", 20, ConservationZone::Zone2, 25.05, 37.20),
        site("RS-WRECK", 4, ConservationZone::Zone2, 25.10, 37.20),
        garden,
        site("RS-FARASAN", 50, ConservationZone::Zone1, 16.70, 42.00),
    ]
}

/// Today in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `n` days from today.
pub fn days_ahead(n: u64) -> NaiveDate {
    today() + Days::new(n)
}

/// Environment variable naming the PostgreSQL database used by store tests.
pub const TEST_DATABASE_ENV: &str = "DIVEQUOTA_TEST_DATABASE_URL";

/// Pool on the test database with migrations applied, or `None` when
/// `DIVEQUOTA_TEST_DATABASE_URL` is unset.
pub async fn test_database() -> Option<DatabasePool> {
    let Ok(url) = std::env::var(TEST_DATABASE_ENV) else {
        eprintln!("{TEST_DATABASE_ENV} not set, skipping PostgreSQL test");
        return None;
    };

    let config = DatabaseConfig {
        url,
        max_connections: 16,
        min_connections: 1,
        connect_timeout_seconds: 5,
        idle_timeout_seconds: 60,
    };
    let db = DatabasePool::connect(&config)
        .await
        .expect("Failed to connect to test database");
    divequota_database::migration::run_migrations(db.pool())
        .await
        .expect("Failed to run migrations");
    Some(db)
}
