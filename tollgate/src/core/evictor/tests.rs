use super::Evictor;
use crate::core::bucket::RefillPolicy;
use crate::core::store::BucketStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn setup(ttl_secs: u64, interval_secs: u64) -> (Arc<BucketStore>, Evictor) {
    let store = Arc::new(BucketStore::new(RefillPolicy::new(
        3,
        Duration::from_secs(30),
        1,
    )));
    let evictor = Evictor::new(
        Arc::clone(&store),
        Duration::from_secs(ttl_secs),
        Duration::from_secs(interval_secs),
    );
    (store, evictor)
}

#[test]
fn test_sweep_empty_store() {
    let (_store, evictor) = setup(90, 60);
    let report = evictor.sweep(Instant::now());
    assert_eq!(report.removed, 0);
    assert_eq!(report.remaining, 0);
}

#[test]
fn test_idle_client_retained_then_removed() {
    let (store, evictor) = setup(90, 60);
    let t0 = Instant::now();
    store.get_or_create("B", t0).touch(t0);

    // t=61s: idle for 61s, within the 90s TTL
    let report = evictor.sweep(t0 + Duration::from_secs(61));
    assert_eq!(report.removed, 0);
    assert!(store.contains("B"));

    // t=121s: idle for 121s, past the TTL
    let report = evictor.sweep(t0 + Duration::from_secs(121));
    assert_eq!(report.removed, 1);
    assert_eq!(report.remaining, 0);
    assert!(!store.contains("B"));
}

#[test]
fn test_recently_seen_client_survives() {
    let (store, evictor) = setup(90, 60);
    let t0 = Instant::now();
    let _ = store.get_or_create("stale", t0);
    let _ = store.get_or_create("active", t0);

    store
        .get_or_create("active", t0)
        .touch(t0 + Duration::from_secs(100));

    let report = evictor.sweep(t0 + Duration::from_secs(150));
    assert_eq!(report.removed, 1);
    assert_eq!(report.remaining, 1);
    assert!(store.contains("active"));
    assert!(!store.contains("stale"));
}

#[test]
fn test_ttl_boundary_is_exclusive() {
    let (store, evictor) = setup(90, 60);
    let t0 = Instant::now();
    let _ = store.get_or_create("edge", t0);

    assert_eq!(evictor.sweep(t0 + Duration::from_secs(90)).removed, 0);
    assert_eq!(evictor.sweep(t0 + Duration::from_millis(90_001)).removed, 1);
}

#[test]
fn test_sweep_many_keys() {
    let (store, evictor) = setup(10, 5);
    let t0 = Instant::now();
    for i in 0..1000 {
        let seen = if i % 2 == 0 {
            t0
        } else {
            t0 + Duration::from_secs(20)
        };
        store.get_or_create(&format!("key_{i}"), t0).touch(seen);
    }

    let report = evictor.sweep(t0 + Duration::from_secs(25));
    assert_eq!(report.removed, 500);
    assert_eq!(report.remaining, 500);
    assert_eq!(store.len(), 500);
}

#[cfg(feature = "tokio")]
mod task {
    use super::setup;
    use crate::core::evictor::SweepReport;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn now() -> std::time::Instant {
        tokio::time::Instant::now().into_std()
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeps_on_interval() {
        let (store, evictor) = setup(90, 60);
        let reports = Arc::new(Mutex::new(Vec::<SweepReport>::new()));

        let _ = store.get_or_create("B", now());

        let sink = Arc::clone(&reports);
        let handle = evictor.spawn_with(move |report| sink.lock().unwrap().push(report));

        // First sweep at t=60s keeps the bucket
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(store.contains("B"));

        // Second sweep at t=120s removes it
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!store.contains("B"));

        let reports = reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].removed, 0);
        assert_eq!(reports[1].removed, 1);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sweep_before_first_interval() {
        let (store, evictor) = setup(1, 60);
        let _ = store.get_or_create("B", now());

        let handle = evictor.spawn();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.contains("B"));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let (store, evictor) = setup(1, 10);
        let handle = evictor.spawn();
        handle.shutdown().await;

        // No task left to sweep the stale bucket
        let _ = store.get_or_create("late", now());
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert!(store.contains("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_task() {
        let (store, evictor) = setup(1, 10);
        let handle = evictor.spawn();
        drop(handle);
        tokio::task::yield_now().await;

        let _ = store.get_or_create("late", now());
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert!(store.contains("late"));
    }
}
