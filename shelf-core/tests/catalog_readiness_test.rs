//! Catalog visibility and readiness behaviour across feeds

mod common;

use common::{eventually, init_test_logging, repository, static_feed, GatedFeed};
use shelf_core::catalog::{Lookup, PackageCatalog, PackageFeed, PackageRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_package_absent_before_and_after_ready() {
    init_test_logging();

    let gated = GatedFeed::new(repository("main", 0), vec![PackageRecord::new("a", "1.0")]);
    let feed: Arc<dyn PackageFeed> = gated.clone();
    let catalog = PackageCatalog::new(vec![feed]);
    catalog.start(&Handle::current());

    assert!(catalog.newest_package("never.indexed").is_none());
    assert!(matches!(catalog.lookup("never.indexed"), Lookup::Pending));

    gated.release();
    catalog.ready().await;

    assert!(catalog.newest_package("never.indexed").is_none());
    assert!(matches!(catalog.lookup("never.indexed"), Lookup::Absent));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_package_visible_before_global_readiness() {
    init_test_logging();

    let slow = GatedFeed::new(repository("slow", 1), vec![PackageRecord::new("b", "1.0")]);
    let slow_feed: Arc<dyn PackageFeed> = slow.clone();
    let fast = static_feed("fast", 0, vec![PackageRecord::new("a", "2.0")]);

    let catalog = PackageCatalog::new(vec![fast, slow_feed]);
    catalog.start(&Handle::current());

    eventually(|| catalog.newest_package("a").is_some()).await;
    assert!(!catalog.is_ready());
    assert_eq!(catalog.newest_package("a").unwrap().version, "2.0");
    assert!(matches!(catalog.lookup("b"), Lookup::Pending));

    slow.release();
    catalog.ready().await;
    assert_eq!(catalog.newest_package("b").unwrap().version, "1.0");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_newest_independent_of_load_order() {
    init_test_logging();

    for release_newer_first in [true, false] {
        let older = GatedFeed::new(repository("older", 0), vec![PackageRecord::new("x", "1.0")]);
        let newer = GatedFeed::new(repository("newer", 1), vec![PackageRecord::new("x", "1.2")]);
        let feeds: Vec<Arc<dyn PackageFeed>> = vec![older.clone(), newer.clone()];
        let catalog = PackageCatalog::new(feeds);
        catalog.start(&Handle::current());

        assert!(catalog.newest_package("x").is_none());

        let (first, second) = if release_newer_first {
            (&newer, &older)
        } else {
            (&older, &newer)
        };
        first.release();
        eventually(|| catalog.newest_package("x").is_some()).await;
        second.release();
        catalog.ready().await;

        let newest = catalog.newest_package("x").unwrap();
        assert_eq!(newest.version, "1.2");
        assert_eq!(newest.repository_name(), "newer");
        assert_eq!(catalog.versions("x").len(), 2);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_equal_versions_prefer_higher_priority_repository() {
    init_test_logging();

    for reversed in [false, true] {
        let mut feeds = vec![
            static_feed("preferred", 0, vec![PackageRecord::new("x", "1.0")]),
            static_feed("mirror", 5, vec![PackageRecord::new("x", "1.0")]),
        ];
        if reversed {
            feeds.reverse();
        }

        let catalog = PackageCatalog::new(feeds);
        catalog.load().await;

        assert_eq!(catalog.newest_package("x").unwrap().repository_name(), "preferred");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_for_ready_is_idempotent() {
    init_test_logging();

    let catalog = PackageCatalog::new(vec![static_feed("main", 0, vec![PackageRecord::new("a", "1")])]);
    catalog.start(&Handle::current());

    let waiter = catalog.clone();
    tokio::task::spawn_blocking(move || {
        waiter.wait_for_ready();

        let start = Instant::now();
        for _ in 0..100 {
            waiter.wait_for_ready();
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    })
    .await
    .unwrap();

    assert!(catalog.is_ready());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_waiters_unblock_after_last_feed() {
    init_test_logging();

    let first = GatedFeed::new(repository("first", 0), vec![PackageRecord::new("a", "1")]);
    let last = GatedFeed::new(repository("last", 1), vec![PackageRecord::new("b", "1")]);
    let feeds: Vec<Arc<dyn PackageFeed>> = vec![first.clone(), last.clone()];
    let catalog = PackageCatalog::new(feeds);
    catalog.start(&Handle::current());

    const WAITERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WAITERS + 1));
    let woke = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            let catalog = catalog.clone();
            let barrier = Arc::clone(&barrier);
            let woke = Arc::clone(&woke);
            std::thread::spawn(move || {
                barrier.wait();
                catalog.wait_for_ready();
                // Everything from the initial build is visible once woken
                assert!(catalog.newest_package("b").is_some());
                woke.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    tokio::task::spawn_blocking({
        let barrier = Arc::clone(&barrier);
        move || barrier.wait()
    })
    .await
    .unwrap();

    first.release();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(woke.load(Ordering::SeqCst), 0);
    assert!(!catalog.is_ready());

    last.release();
    for handle in handles {
        tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();
    }
    assert_eq!(woke.load(Ordering::SeqCst), WAITERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_feed_does_not_block_readiness() {
    init_test_logging();

    let broken = GatedFeed::failing(repository("broken", 0));
    let broken_feed: Arc<dyn PackageFeed> = broken.clone();
    let healthy = static_feed("healthy", 1, vec![PackageRecord::new("a", "1.0")]);

    let catalog = PackageCatalog::new(vec![broken_feed, healthy]);
    catalog.start(&Handle::current());

    eventually(|| catalog.newest_package("a").is_some()).await;
    assert!(!catalog.is_ready());

    broken.release();
    let waiter = catalog.clone();
    let ready = tokio::task::spawn_blocking(move || waiter.wait_for_ready_timeout(Duration::from_secs(5)))
        .await
        .unwrap();

    assert!(ready);
    assert_eq!(broken.load_count(), 1);
    assert_eq!(catalog.package_count(), 1);
    assert!(matches!(catalog.lookup("b"), Lookup::Absent));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scenario_two_repositories_offering_x() {
    init_test_logging();

    let a = GatedFeed::new(repository("A", 0), vec![PackageRecord::new("x", "1.0")]);
    let b = GatedFeed::new(repository("B", 1), vec![PackageRecord::new("x", "1.2")]);
    let feeds: Vec<Arc<dyn PackageFeed>> = vec![a.clone(), b.clone()];
    let catalog = PackageCatalog::new(feeds);
    catalog.start(&Handle::current());

    assert!(catalog.newest_package("x").is_none());

    a.release();
    b.release();
    catalog.ready().await;

    assert_eq!(catalog.newest_package("x").unwrap().version, "1.2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refresh_leaves_readiness_alone() {
    init_test_logging();

    let catalog = PackageCatalog::new(vec![static_feed("main", 0, vec![PackageRecord::new("a", "1.0")])]);
    catalog.load().await;

    let added = catalog.refresh_repository("main").await.unwrap();
    assert_eq!(added, 1);
    assert!(catalog.is_ready());
    assert_eq!(catalog.versions("a").len(), 1);

    assert!(catalog.refresh_repository("missing").await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_twice_loads_each_feed_once() {
    init_test_logging();

    let gated = GatedFeed::new(repository("main", 0), vec![PackageRecord::new("a", "1.0")]);
    let feed: Arc<dyn PackageFeed> = gated.clone();
    let catalog = PackageCatalog::new(vec![feed]);

    catalog.start(&Handle::current());
    catalog.start(&Handle::current());
    gated.release();
    catalog.ready().await;

    assert_eq!(gated.load_count(), 1);
}
