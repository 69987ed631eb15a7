//! Quota engine behaviour against in-memory collaborators.

mod helpers;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use futures::StreamExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use divequota_authority::{
    AuthorityClient, AuthorityMode, MockBehavior, PermitDecision, PermitRequest,
};
use divequota_core::error::{AppError, ErrorKind};
use divequota_core::result::AppResult;
use divequota_database::{MemoryReservationStore, ReservationStore};
use divequota_entity::{
    ConservationZone, ForecastStatus, NewReservation, PermitNumber, Reservation,
    ReservationStatus,
};

use helpers::{TestEngine, days_ahead, today};

/// Book `divers` approved divers directly in the store, bypassing the engine.
async fn book_directly(
    store: &MemoryReservationStore,
    site_code: &str,
    date: NaiveDate,
    divers: i32,
    limit: u32,
) -> Reservation {
    let pending = store
        .reserve_pending(
            &NewReservation {
                site_code: site_code.to_string(),
                quota_date: date,
                diver_count: divers,
                center_id: Uuid::new_v4(),
                trip_id: Uuid::new_v4(),
            },
            limit,
        )
        .await
        .unwrap();
    store
        .mark_approved(pending.id, &PermitNumber::generate_mock())
        .await
        .unwrap()
}

// ── check_quota ─────────────────────────────────────────────

#[tokio::test]
async fn test_check_quota_reports_remaining() {
    let t = TestEngine::new();
    let date = days_ahead(1);

    let snap = t.engine.check_quota("RS-UMLUJ", date, 4).await.unwrap();
    assert_eq!(snap.daily_limit, 10);
    assert_eq!(snap.used, 0);
    assert_eq!(snap.remaining, 10);
    assert!(snap.available);

    t.engine
        .reserve_permit("RS-UMLUJ", date, 7, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();

    let snap = t.engine.check_quota("RS-UMLUJ", date, 4).await.unwrap();
    assert_eq!(snap.used, 7);
    assert_eq!(snap.remaining, 3);
    assert!(!snap.available);
}

#[tokio::test]
async fn test_check_quota_accepts_date_strings() {
    let t = TestEngine::new();
    let date = days_ahead(3);

    let snap = t
        .engine
        .check_quota("RS-LIBERTY", date.to_string().as_str(), 1)
        .await
        .unwrap();
    assert_eq!(snap.date, date);

    let err = t
        .engine
        .check_quota("RS-LIBERTY", "31/12/2026", 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_check_quota_rejects_invalid_input() {
    let t = TestEngine::new();

    let err = t
        .engine
        .check_quota("RS-UMLUJ", days_ahead(1), 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = t
        .engine
        .check_quota("RS-NOWHERE", days_ahead(1), 2)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_check_quota_served_from_cache_until_invalidated() {
    let t = TestEngine::new();
    let date = days_ahead(2);

    let first = t.engine.check_quota("RS-UMLUJ", date, 1).await.unwrap();
    assert_eq!(first.remaining, 10);

    book_directly(&t.store, "RS-UMLUJ", date, 6, 10).await;

    let cached = t.engine.check_quota("RS-UMLUJ", date, 1).await.unwrap();
    assert_eq!(cached.remaining, 10);
    assert_eq!(cached.refreshed_at, first.refreshed_at);

    t.engine.invalidate_site("RS-UMLUJ").await;
    let fresh = t.engine.check_quota("RS-UMLUJ", date, 1).await.unwrap();
    assert_eq!(fresh.remaining, 4);
}

// ── reserve_permit ──────────────────────────────────────────

#[tokio::test]
async fn test_reserve_returns_approved_reservation_with_mock_permit() {
    let t = TestEngine::new();
    let trip = Uuid::new_v4();

    let reservation = t
        .engine
        .reserve_permit("RS-UMLUJ", days_ahead(1), 6, Uuid::new_v4(), trip)
        .await
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::Approved);
    let permit = reservation.permit().unwrap();
    assert!(permit.is_mock());
    assert!(permit.as_str().starts_with("SRSA-MOCK-"));

    let found = t
        .engine
        .get_reservation(permit.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, reservation.id);

    let by_trip = t.engine.find_reservations_by_trip(trip).await.unwrap();
    assert_eq!(by_trip.len(), 1);
    assert_eq!(t.authority.issued_count(), 1);
}

#[tokio::test]
async fn test_reserve_rejects_past_dates_without_side_effects() {
    let t = TestEngine::new();
    let yesterday = today() - Days::new(1);

    let err = t
        .engine
        .reserve_permit("RS-UMLUJ", yesterday, 2, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(t.store.is_empty().await);
}

#[tokio::test]
async fn test_reserve_rejects_non_positive_divers() {
    let t = TestEngine::new();
    let err = t
        .engine
        .reserve_permit("RS-UMLUJ", days_ahead(1), -1, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(t.store.is_empty().await);
}

#[tokio::test]
async fn test_cache_never_overrides_store_on_reserve() {
    let t = TestEngine::new();
    let date = days_ahead(1);

    let snap = t.engine.check_quota("RS-UMLUJ", date, 2).await.unwrap();
    assert!(snap.available);

    // Capacity disappears behind the cache's back.
    book_directly(&t.store, "RS-UMLUJ", date, 10, 10).await;
    let stale = t.engine.check_quota("RS-UMLUJ", date, 2).await.unwrap();
    assert!(stale.available);

    let err = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 2, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    assert!(err.is_capacity_denial());
    assert_eq!(t.store.held_total("RS-UMLUJ", date).await.unwrap(), 10);
}

#[tokio::test]
async fn test_authority_denial_rolls_back() {
    let t = TestEngine::new();
    t.authority
        .set_behavior(MockBehavior::Deny("site closed for survey".to_string()));
    let date = days_ahead(1);
    let trip = Uuid::new_v4();

    let err = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 4, Uuid::new_v4(), trip)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthorityDenied);
    assert!(err.is_capacity_denial());

    let rows = t.store.find_by_trip(trip).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, ReservationStatus::Cancelled);
    assert_eq!(rows[0].reason.as_deref(), Some("authority denied"));
    assert!(rows[0].permit_number.is_none());
    assert_eq!(t.store.held_total("RS-UMLUJ", date).await.unwrap(), 0);
    assert_eq!(t.store.approved_total("RS-UMLUJ", date).await.unwrap(), 0);
}

#[tokio::test]
async fn test_authority_outage_rolls_back_and_is_retryable() {
    let t = TestEngine::new();
    t.authority.set_behavior(MockBehavior::Unavailable);
    let date = days_ahead(1);
    let trip = Uuid::new_v4();

    let err = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 4, Uuid::new_v4(), trip)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthorityUnavailable);
    assert!(err.is_retryable());

    let rows = t.engine.find_reservations_by_trip(trip).await.unwrap();
    assert_eq!(rows[0].status, ReservationStatus::Cancelled);
    assert_eq!(rows[0].reason.as_deref(), Some("authority unavailable"));
    assert_eq!(t.store.held_total("RS-UMLUJ", date).await.unwrap(), 0);

    // Once the authority is back the same request goes through.
    t.authority.set_behavior(MockBehavior::Approve);
    t.engine
        .reserve_permit("RS-UMLUJ", date, 4, Uuid::new_v4(), trip)
        .await
        .unwrap();
}

// ── cancel_permit ───────────────────────────────────────────

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let t = TestEngine::new();
    let date = days_ahead(1);
    let reservation = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 5, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();
    let permit = reservation.permit().unwrap();

    t.engine
        .cancel_permit(permit.as_str(), "guest cancelled")
        .await
        .unwrap();
    t.engine
        .cancel_permit(permit.as_str(), "duplicate request")
        .await
        .unwrap();

    let row = t.store.find_by_id(reservation.id).await.unwrap().unwrap();
    assert_eq!(row.status, ReservationStatus::Cancelled);
    assert_eq!(row.reason.as_deref(), Some("guest cancelled"));
    assert_eq!(t.authority.cancelled_count(), 1);
    assert_eq!(
        t.authority.cancellation_reason(&permit).as_deref(),
        Some("guest cancelled")
    );

    let snap = t.engine.check_quota("RS-UMLUJ", date, 10).await.unwrap();
    assert!(snap.available);
}

#[tokio::test]
async fn test_cancel_unknown_permit_is_not_found() {
    let t = TestEngine::new();
    let err = t
        .engine
        .cancel_permit("SRSA-MOCK-0000000000", "typo")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_reserve_cancel_reserve_round_trip() {
    let t = TestEngine::new();
    let date = days_ahead(4);

    let full = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 10, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();

    let err = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 1, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);

    t.engine
        .cancel_permit(full.permit_number.as_deref().unwrap(), "trip moved")
        .await
        .unwrap();

    let again = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 10, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(again.status, ReservationStatus::Approved);
    assert_eq!(t.store.approved_total("RS-UMLUJ", date).await.unwrap(), 10);
}

// ── calculate_conservation_fee ───────────────────────────────

#[tokio::test]
async fn test_conservation_fee_table() {
    let t = TestEngine::new();
    let cases = [
        (Some("RS-UMLUJ"), "zone_1", 5, 50, 250),
        (Some("RS-LIBERTY"), "zone_2", 10, 35, 350),
        (None, "zone_3", 8, 20, 160),
        (None, "zone_unknown", 20, 35, 700),
    ];

    for (site, zone, divers, per_diver, total) in cases {
        let fee = t
            .engine
            .calculate_conservation_fee(site, zone, divers)
            .await
            .unwrap();
        assert_eq!(fee.fee_per_diver, per_diver, "{zone}");
        assert_eq!(fee.total_fee, total, "{zone}");
        assert_eq!(fee.currency, "SAR");
    }
}

#[tokio::test]
async fn test_conservation_fee_fallback_and_override() {
    let t = TestEngine::new();

    let fallback = t
        .engine
        .calculate_conservation_fee(None, "zone_9", 1)
        .await
        .unwrap();
    assert_eq!(fallback.zone, ConservationZone::Zone2);

    let overridden = t
        .engine
        .calculate_conservation_fee(Some("RS-GARDEN"), "zone_3", 4)
        .await
        .unwrap();
    assert_eq!(overridden.fee_per_diver, 15);
    assert_eq!(overridden.total_fee, 60);

    let err = t
        .engine
        .calculate_conservation_fee(None, "zone_1", 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_unrepresentable_fee_is_rejected_not_panicking() {
    let t = TestEngine::new();
    let mut pricy = helpers::site("RS-PRICY", 40, ConservationZone::Zone1, 25.02, 37.20);
    pricy.fee_override = Some(i64::MAX / 2);
    t.sites.insert(pricy).await;

    let err = t
        .engine
        .calculate_conservation_fee(Some("RS-PRICY"), "zone_1", 3)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    // The site cannot be priced, so it is left out of the alternatives.
    let alternatives = t
        .engine
        .get_alternative_sites("RS-UMLUJ", days_ahead(1), 3)
        .await
        .unwrap();
    assert!(alternatives.iter().all(|a| a.site_code != "RS-PRICY"));
    assert_eq!(alternatives[0].site_code, "RS-LIBERTY");
}

// ── get_quota_forecast ───────────────────────────────────────

#[tokio::test]
async fn test_forecast_covers_consecutive_days_from_today() {
    let t = TestEngine::new();
    book_directly(&t.store, "RS-UMLUJ", days_ahead(1), 9, 10).await;
    book_directly(&t.store, "RS-UMLUJ", days_ahead(2), 10, 10).await;

    let forecast = t
        .engine
        .get_quota_forecast("RS-UMLUJ", Some(7))
        .await
        .unwrap();

    assert_eq!(forecast.len(), 7);
    assert_eq!(forecast[0].date, today());
    for pair in forecast.windows(2) {
        assert_eq!(pair[1].date, pair[0].date + Days::new(1));
    }

    assert_eq!(forecast[0].status, ForecastStatus::Available);
    assert_eq!(forecast[1].reserved, 9);
    assert_eq!(forecast[1].remaining, 1);
    assert_eq!(forecast[1].status, ForecastStatus::Limited);
    assert_eq!(forecast[2].remaining, 0);
    assert_eq!(forecast[2].status, ForecastStatus::Full);
}

#[tokio::test]
async fn test_forecast_defaults_and_unknown_site() {
    let t = TestEngine::new();

    let default = t.engine.get_quota_forecast("RS-LIBERTY", None).await.unwrap();
    assert_eq!(default.len(), 7);

    let err = t
        .engine
        .get_quota_forecast("RS-NOWHERE", Some(3))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_forecast_window_is_bounded() {
    let t = TestEngine::new();

    for days in [0, 91, u32::MAX] {
        let err = t
            .engine
            .get_quota_forecast("RS-UMLUJ", Some(days))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{days} days");
    }

    let longest = t.engine.get_quota_forecast("RS-UMLUJ", Some(90)).await.unwrap();
    assert_eq!(longest.len(), 90);
}

#[tokio::test]
async fn test_forecast_stream_is_lazy() {
    let t = TestEngine::new();
    let stream = t
        .engine
        .forecast_stream("RS-UMLUJ", Some(90))
        .await
        .unwrap();

    let first: Vec<_> = stream.take(2).collect().await;
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].as_ref().unwrap().date, days_ahead(1));
}

#[tokio::test]
async fn test_forecast_sees_new_reservations() {
    let t = TestEngine::new();
    let before = t.engine.get_quota_forecast("RS-UMLUJ", Some(3)).await.unwrap();
    assert_eq!(before[1].remaining, 10);

    t.engine
        .reserve_permit("RS-UMLUJ", days_ahead(1), 3, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();

    let after = t.engine.get_quota_forecast("RS-UMLUJ", Some(3)).await.unwrap();
    assert_eq!(after[1].remaining, 7);
    assert_eq!(after[2].remaining, 10);
}

// ── get_alternative_sites / get_site_info ──────────────────────

#[tokio::test]
async fn test_alternatives_ranked_by_distance_with_fees() {
    let t = TestEngine::new();
    let date = days_ahead(1);
    book_directly(&t.store, "RS-WRECK", date, 4, 4).await;

    let alternatives = t
        .engine
        .get_alternative_sites("RS-UMLUJ", date, 6)
        .await
        .unwrap();

    let codes: Vec<&str> = alternatives.iter().map(|a| a.site_code.as_str()).collect();
    assert_eq!(codes, vec!["RS-LIBERTY", "RS-GARDEN"]);
    assert!(alternatives[0].distance_km < alternatives[1].distance_km);

    assert_eq!(alternatives[0].fee.fee_per_diver, 35);
    assert_eq!(alternatives[0].fee.total_fee, 210);
    assert_eq!(alternatives[1].fee.fee_per_diver, 15);
    assert_eq!(alternatives[1].remaining, 30);
}

#[tokio::test]
async fn test_alternatives_respect_requested_divers() {
    let t = TestEngine::new();
    let alternatives = t
        .engine
        .get_alternative_sites("RS-UMLUJ", days_ahead(1), 25)
        .await
        .unwrap();
    let codes: Vec<&str> = alternatives.iter().map(|a| a.site_code.as_str()).collect();
    assert_eq!(codes, vec!["RS-GARDEN"]);
    assert!(t.store.is_empty().await);
}

#[tokio::test]
async fn test_site_info_is_nullable() {
    let t = TestEngine::new();
    let site = t.engine.get_site_info("RS-UMLUJ").await.unwrap().unwrap();
    assert_eq!(site.daily_limit, 10);
    assert!(t.engine.get_site_info("RS-NOWHERE").await.unwrap().is_none());
}

// ── Live-mode behaviour ────────────────────────────────────

/// Live-mode authority with scripted answers.
#[derive(Debug, Default)]
struct ScriptedRegulator {
    reported_used: Option<u32>,
    usage_fails: bool,
    cancelled: Mutex<Vec<PermitNumber>>,
}

#[async_trait]
impl AuthorityClient for ScriptedRegulator {
    fn mode(&self) -> AuthorityMode {
        AuthorityMode::Live
    }

    async fn request_permit(&self, request: &PermitRequest) -> AppResult<PermitDecision> {
        let suffix = request.reference.simple().to_string();
        Ok(PermitDecision::Approved {
            permit_number: PermitNumber::new(format!("SRSA-{}", &suffix[..12])),
        })
    }

    async fn cancel_permit(&self, permit: &PermitNumber, _reason: &str) -> AppResult<()> {
        self.cancelled.lock().await.push(permit.clone());
        Ok(())
    }

    async fn lookup_permit(&self, _reference: Uuid) -> AppResult<Option<PermitNumber>> {
        Ok(None)
    }

    async fn reported_usage(&self, _site_code: &str, _date: NaiveDate) -> AppResult<Option<u32>> {
        if self.usage_fails {
            return Err(AppError::authority_unavailable("regulator down"));
        }
        Ok(self.reported_used)
    }
}

#[tokio::test]
async fn test_live_check_uses_larger_of_local_and_reported_usage() {
    let regulator = Arc::new(ScriptedRegulator {
        reported_used: Some(7),
        ..ScriptedRegulator::default()
    });
    let t = TestEngine::with_authority(regulator);

    let snap = t.engine.check_quota("RS-UMLUJ", days_ahead(1), 3).await.unwrap();
    assert_eq!(snap.used, 7);
    assert_eq!(snap.remaining, 3);
    assert!(snap.available);
}

#[tokio::test]
async fn test_live_check_falls_back_to_local_usage() {
    let regulator = Arc::new(ScriptedRegulator {
        usage_fails: true,
        ..ScriptedRegulator::default()
    });
    let t = TestEngine::with_authority(regulator);
    book_directly(&t.store, "RS-UMLUJ", days_ahead(1), 2, 10).await;

    let snap = t.engine.check_quota("RS-UMLUJ", days_ahead(1), 1).await.unwrap();
    assert_eq!(snap.used, 2);
}

#[tokio::test]
async fn test_live_cancel_forwards_only_live_permits() {
    let regulator = Arc::new(ScriptedRegulator::default());
    let t = TestEngine::with_authority(regulator.clone());
    let date = days_ahead(1);

    let live = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 2, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();
    let live_permit = live.permit().unwrap();
    assert!(!live_permit.is_mock());

    let mock = book_directly(&t.store, "RS-UMLUJ", date, 2, 10).await;
    let mock_permit = mock.permit().unwrap();

    t.engine
        .cancel_permit(live_permit.as_str(), "guest cancelled")
        .await
        .unwrap();
    t.engine
        .cancel_permit(mock_permit.as_str(), "guest cancelled")
        .await
        .unwrap();

    let forwarded = regulator.cancelled.lock().await.clone();
    assert_eq!(forwarded, vec![live_permit]);

    let mock_row = t.store.find_by_id(mock.id).await.unwrap().unwrap();
    assert_eq!(mock_row.status, ReservationStatus::Cancelled);
}

// ── Approval that cannot be recorded ───────────────────────

/// Store whose approvals always fail.
#[derive(Debug)]
struct ApprovalFailsStore {
    inner: Arc<MemoryReservationStore>,
}

#[async_trait]
impl ReservationStore for ApprovalFailsStore {
    async fn approved_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32> {
        self.inner.approved_total(site_code, date).await
    }

    async fn held_total(&self, site_code: &str, date: NaiveDate) -> AppResult<u32> {
        self.inner.held_total(site_code, date).await
    }

    async fn reserve_pending(
        &self,
        request: &NewReservation,
        daily_limit: u32,
    ) -> AppResult<Reservation> {
        self.inner.reserve_pending(request, daily_limit).await
    }

    async fn mark_approved(&self, _id: Uuid, _permit: &PermitNumber) -> AppResult<Reservation> {
        Err(AppError::database("connection reset"))
    }

    async fn mark_cancelled(&self, id: Uuid, reason: &str) -> AppResult<Reservation> {
        self.inner.mark_cancelled(id, reason).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_permit(&self, permit: &PermitNumber) -> AppResult<Option<Reservation>> {
        self.inner.find_by_permit(permit).await
    }

    async fn find_by_trip(&self, trip_id: Uuid) -> AppResult<Vec<Reservation>> {
        self.inner.find_by_trip(trip_id).await
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        self.inner.find_stale_pending(cutoff).await
    }
}

#[tokio::test]
async fn test_unrecorded_approval_is_cancelled_everywhere() {
    let inner = Arc::new(MemoryReservationStore::new());
    let (engine, authority) = TestEngine::with_store(Arc::new(ApprovalFailsStore {
        inner: inner.clone(),
    }));
    let date = days_ahead(1);
    let trip = Uuid::new_v4();

    let err = engine
        .reserve_permit("RS-UMLUJ", date, 3, Uuid::new_v4(), trip)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);

    let rows = inner.find_by_trip(trip).await.unwrap();
    assert_eq!(rows[0].status, ReservationStatus::Cancelled);
    assert_eq!(rows[0].reason.as_deref(), Some("local approval failed"));
    assert_eq!(inner.held_total("RS-UMLUJ", date).await.unwrap(), 0);
    assert_eq!(authority.issued_count(), 1);
    assert_eq!(authority.cancelled_count(), 1);
}
