//! Shelf Catalog - package lookup across repositories
//!
//! This module owns the in-memory index of every package the configured
//! repositories advertise, and the readiness barrier dependents use to
//! defer authoritative decisions until the initial load has finished.
//!
//! # Overview
//!
//! The catalog system allows callers to:
//! - Ask for the newest known record of a package at any time
//! - Block (off the interactive thread) until every feed has reported
//! - Search and list packages once loaded
//! - Refresh a single repository without resetting readiness
//!
//! # Architecture
//!
//! ```text
//! repositories.yaml ──► RepositoryManager
//!                              │  one feed per repository
//!                              ▼
//!      FileFeed / HttpFeed / StaticFeed  (PackageFeed)
//!                              │  load() on tokio tasks
//!                              ▼
//!                       PackageCatalog
//!                 ├── CatalogIndex   (RwLock)
//!                 └── ReadyGate      (opens once every feed reported)
//! ```

mod error;
mod feed;
mod index;
mod manager;
mod package;
mod readiness;
mod repository;
mod version;

pub use error::FeedError;
pub use feed::{feed_for, FeedDocument, FeedOptions, FileFeed, PackageFeed, StaticFeed};
#[cfg(feature = "remote")]
pub use feed::HttpFeed;
pub use index::CatalogIndex;
pub use manager::{Lookup, PackageCatalog};
pub use package::{Package, PackageRecord};
pub use readiness::ReadyGate;
pub use repository::{
    Repository, RepositoryConfig, RepositoryEntry, RepositoryManager, DEFAULT_CACHE_TTL,
    DEFAULT_REPOSITORY_NAME, DEFAULT_REPOSITORY_URL,
};
pub use version::compare_versions;

#[cfg(test)]
mod tests;
