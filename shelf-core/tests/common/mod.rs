//! Shared helpers for catalog integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use shelf_core::catalog::{FeedError, PackageFeed, PackageRecord, Repository, StaticFeed};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tokio::sync::watch;

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn repository(name: &str, priority: u32) -> Arc<Repository> {
    Arc::new(Repository::new(name, format!("file:///repos/{name}.yaml")).with_priority(priority))
}

pub fn static_feed(name: &str, priority: u32, records: Vec<PackageRecord>) -> Arc<dyn PackageFeed> {
    Arc::new(StaticFeed::new(repository(name, priority), records))
}

/// Feed that holds its records back until released
pub struct GatedFeed {
    repository: Arc<Repository>,
    records: Vec<PackageRecord>,
    fail: bool,
    release: watch::Sender<bool>,
    loads: AtomicUsize,
}

impl GatedFeed {
    pub fn new(repository: Arc<Repository>, records: Vec<PackageRecord>) -> Arc<Self> {
        let (release, _) = watch::channel(false);
        Arc::new(Self {
            repository,
            records,
            fail: false,
            release,
            loads: AtomicUsize::new(0),
        })
    }

    /// Gated feed that reports an error once released
    pub fn failing(repository: Arc<Repository>) -> Arc<Self> {
        let (release, _) = watch::channel(false);
        Arc::new(Self {
            repository,
            records: Vec::new(),
            fail: true,
            release,
            loads: AtomicUsize::new(0),
        })
    }

    pub fn release(&self) {
        self.release.send_replace(true);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageFeed for GatedFeed {
    fn repository(&self) -> Arc<Repository> {
        Arc::clone(&self.repository)
    }

    async fn load(&self) -> Result<Vec<PackageRecord>, FeedError> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        let mut released = self.release.subscribe();
        let _ = released.wait_for(|open| *open).await;

        if self.fail {
            return Err(FeedError::Status {
                url: self.repository.url.clone(),
                status: 500,
            });
        }
        Ok(self.records.clone())
    }
}

/// Poll until `check` holds, giving spawned feed tasks time to run
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}
