//! Concurrent reservations never overbook a site-date.

mod helpers;

use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use divequota_core::error::ErrorKind;
use divequota_core::result::AppResult;
use divequota_database::ReservationStore;
use divequota_entity::Reservation;
use divequota_service::QuotaEngine;

use helpers::{TestEngine, days_ahead};

async fn spawn_reserves(
    engine: &Arc<QuotaEngine>,
    site_code: &'static str,
    date: chrono::NaiveDate,
    divers: &[i32],
) -> Vec<AppResult<Reservation>> {
    let handles = divers.iter().map(|&d| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .reserve_permit(site_code, date, d, Uuid::new_v4(), Uuid::new_v4())
                .await
        })
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_slot_goes_to_exactly_one_caller() {
    let t = TestEngine::new();
    let date = days_ahead(1);

    t.engine
        .reserve_permit("RS-WRECK", date, 3, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();

    let results = spawn_reserves(&t.engine, "RS-WRECK", date, &[1; 8]).await;

    let won = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(won, 1);
    for lost in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(lost.kind, ErrorKind::QuotaExceeded);
    }
    assert_eq!(t.store.approved_total("RS-WRECK", date).await.unwrap(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reserves_never_exceed_limit() {
    let t = TestEngine::new();
    let date = days_ahead(2);

    // 40 requests of mixed sizes against a limit of 20.
    let sizes: Vec<i32> = (0..40).map(|i| 1 + (i % 3)).collect();
    let results = spawn_reserves(&t.engine, "RS-LIBERTY", date, &sizes).await;

    let granted: i32 = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|r| r.diver_count)
        .sum();
    assert!(granted <= 20, "granted {granted} divers against a limit of 20");
    assert!(granted >= 18, "capacity left unused: {granted}");

    for lost in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(lost.kind, ErrorKind::QuotaExceeded);
    }

    let held = t.store.held_total("RS-LIBERTY", date).await.unwrap();
    assert_eq!(held, granted as u32);
    let snap = t.engine.check_quota("RS-LIBERTY", date, 1).await.unwrap();
    assert_eq!(snap.used, granted as u32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dates_are_independent() {
    let t = TestEngine::new();
    let first = days_ahead(1);
    let second = days_ahead(2);

    let (a, b) = tokio::join!(
        spawn_reserves(&t.engine, "RS-UMLUJ", first, &[5, 5]),
        spawn_reserves(&t.engine, "RS-UMLUJ", second, &[5, 5]),
    );

    assert!(a.iter().all(|r| r.is_ok()));
    assert!(b.iter().all(|r| r.is_ok()));
    assert_eq!(t.store.approved_total("RS-UMLUJ", first).await.unwrap(), 10);
    assert_eq!(t.store.approved_total("RS-UMLUJ", second).await.unwrap(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_races_with_reserve() {
    let t = TestEngine::new();
    let date = days_ahead(3);

    let holder = t
        .engine
        .reserve_permit("RS-UMLUJ", date, 10, Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();
    let permit = holder.permit_number.clone().unwrap();

    let engine = t.engine.clone();
    let cancel = tokio::spawn(async move { engine.cancel_permit(&permit, "weather").await });
    let reserves = spawn_reserves(&t.engine, "RS-UMLUJ", date, &[4, 4, 4]).await;
    cancel.await.unwrap().unwrap();

    // Depending on ordering, up to two of the reserves fit after the cancel.
    let granted: i32 = reserves
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|r| r.diver_count)
        .sum();
    assert!(granted <= 8);
    assert_eq!(
        t.store.held_total("RS-UMLUJ", date).await.unwrap(),
        granted as u32
    );
}
