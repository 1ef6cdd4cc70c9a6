//! The package catalog facade
//!
//! `PackageCatalog` is the single source of truth for "what is the best-known
//! record for package X right now". It is a cheap, cloneable handle: build
//! one per process and pass it to whatever needs lookups.
//!
//! Lookups never block and never fail. Until every feed has reported, an
//! absent package means "not known yet"; after readiness it means the
//! package is confirmed absent. Feed failures are logged and otherwise
//! indistinguishable from a repository that lists nothing.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::{CatalogIndex, Package, PackageFeed, ReadyGate, Repository};

/// Result of a lookup that distinguishes "unknown yet" from "absent"
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The newest indexed record
    Found(Arc<Package>),

    /// Not indexed, but the initial load is still running
    Pending,

    /// Not indexed, and every feed has reported
    Absent,
}

impl Lookup {
    pub fn package(&self) -> Option<&Arc<Package>> {
        match self {
            Lookup::Found(package) => Some(package),
            Lookup::Pending | Lookup::Absent => None,
        }
    }
}

struct CatalogInner {
    index: RwLock<CatalogIndex>,
    gate: ReadyGate,
    feeds: Vec<Arc<dyn PackageFeed>>,
    /// Feeds that have not reported success or failure yet
    pending: AtomicUsize,
    started: AtomicBool,
}

impl CatalogInner {
    fn read_index(&self) -> RwLockReadGuard<'_, CatalogIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, CatalogIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn feed_reported(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.open_gate();
        }
    }

    fn open_gate(&self) {
        if self.gate.open() {
            let index = self.read_index();
            info!(
                "Catalog ready: {} packages ({} records) from {} repositories",
                index.package_count(),
                index.version_count(),
                self.feeds.len()
            );
        }
    }
}

/// Reports a feed as finished even if its task panics or is cancelled
struct ReportOnDrop(Arc<CatalogInner>);

impl Drop for ReportOnDrop {
    fn drop(&mut self) {
        self.0.feed_reported();
    }
}

/// Shared handle to the package catalog
#[derive(Clone)]
pub struct PackageCatalog {
    inner: Arc<CatalogInner>,
}

impl std::fmt::Debug for PackageCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageCatalog")
            .field("feeds", &self.inner.feeds.len())
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl PackageCatalog {
    /// Create a catalog over the given feeds
    ///
    /// Nothing is loaded until `start` or `load` is called.
    pub fn new(feeds: Vec<Arc<dyn PackageFeed>>) -> Self {
        let pending = feeds.len();
        Self {
            inner: Arc::new(CatalogInner {
                index: RwLock::new(CatalogIndex::new()),
                gate: ReadyGate::new(),
                feeds,
                pending: AtomicUsize::new(pending),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Begin the initial build on the given runtime
    ///
    /// Spawns one task per feed. Each feed's records become visible as soon
    /// as that feed loads; the catalog turns ready once every feed has
    /// reported. Calling this more than once has no further effect.
    pub fn start(&self, runtime: &Handle) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }

        if self.inner.feeds.is_empty() {
            self.inner.open_gate();
            return;
        }

        debug!("Loading {} repository feeds", self.inner.feeds.len());
        for feed in &self.inner.feeds {
            let feed = Arc::clone(feed);
            let inner = Arc::clone(&self.inner);

            runtime.spawn(async move {
                let report = ReportOnDrop(inner);
                let repository = feed.repository();

                match feed.load().await {
                    Ok(records) => {
                        let added = report.0.write_index().replace_repository(&repository, records);
                        debug!("Indexed {} records from '{}'", added, repository.name);
                    }
                    Err(e) => {
                        warn!("Failed to load repository '{}': {:#}", repository.name, anyhow::Error::from(e));
                    }
                }
            });
        }
    }

    /// Start on the current runtime and wait until ready
    pub async fn load(&self) {
        self.start(&Handle::current());
        self.ready().await;
    }

    /// Newest record currently indexed for `identifier`
    ///
    /// Never blocks. Before readiness, `None` only means "not known yet".
    pub fn newest_package(&self, identifier: &str) -> Option<Arc<Package>> {
        self.inner.read_index().newest(identifier).cloned()
    }

    /// Like `newest_package`, but tells "pending" apart from "absent"
    pub fn lookup(&self, identifier: &str) -> Lookup {
        // Readiness first: a package indexed between the two reads would
        // otherwise be misreported as absent
        let ready = self.is_ready();
        match self.newest_package(identifier) {
            Some(package) => Lookup::Found(package),
            None if ready => Lookup::Absent,
            None => Lookup::Pending,
        }
    }

    /// Whether the initial build has completed
    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_open()
    }

    /// Block until the initial build has completed
    ///
    /// Must not be called on the interactive thread: it can take as long
    /// as the slowest repository feed.
    pub fn wait_for_ready(&self) {
        self.check_not_interactive();
        self.inner.gate.wait();
    }

    /// Block for at most `timeout`; returns whether the catalog is ready
    pub fn wait_for_ready_timeout(&self, timeout: Duration) -> bool {
        self.check_not_interactive();
        self.inner.gate.wait_timeout(timeout)
    }

    /// Wait for readiness from async code
    pub async fn ready(&self) {
        self.inner.gate.opened().await
    }

    fn check_not_interactive(&self) {
        if crate::dispatch::is_interactive_thread() && !self.is_ready() {
            tracing::error!("wait_for_ready called on the interactive thread");
            debug_assert!(false, "wait_for_ready must not block the interactive thread");
        }
    }

    /// All records for `identifier`, newest first
    pub fn versions(&self, identifier: &str) -> Vec<Arc<Package>> {
        self.inner.read_index().versions(identifier).to_vec()
    }

    /// Newest record of every package matching `query`, sorted by identifier
    pub fn search(&self, query: &str) -> Vec<Arc<Package>> {
        self.inner
            .read_index()
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Newest record of every package, sorted by identifier
    pub fn list_all(&self) -> Vec<Arc<Package>> {
        self.inner
            .read_index()
            .list_all()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of unique packages currently indexed
    pub fn package_count(&self) -> usize {
        self.inner.read_index().package_count()
    }

    /// Repositories backing this catalog, in feed order
    pub fn repositories(&self) -> Vec<Arc<Repository>> {
        self.inner.feeds.iter().map(|f| f.repository()).collect()
    }

    /// Reload one repository and replace its records
    ///
    /// Readiness is unaffected. On failure the repository's previous
    /// records stay in place and the error is returned.
    pub async fn refresh_repository(&self, name: &str) -> Result<usize> {
        let feed = self
            .inner
            .feeds
            .iter()
            .find(|f| f.repository().name == name)
            .with_context(|| format!("Repository '{name}' not found"))?;

        let repository = feed.repository();
        let records = feed
            .reload()
            .await
            .with_context(|| format!("Failed to refresh repository '{name}'"))?;

        let added = self.inner.write_index().replace_repository(&repository, records);
        info!("Refreshed '{}': {} records", name, added);
        Ok(added)
    }
}
