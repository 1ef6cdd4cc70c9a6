//! Catalog index: every known package, grouped by identifier
//!
//! Each identifier maps to all records the repositories advertise for it,
//! kept sorted newest-first so the head of the list is the answer to
//! "what is the newest package X".

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::version::compare_versions;
use super::{Package, PackageRecord, Repository};

/// In-memory package index
#[derive(Debug, Default)]
pub struct CatalogIndex {
    /// All records, keyed by identifier, newest first
    entries: HashMap<String, Vec<Arc<Package>>>,
}

/// Newest version first; equal versions fall back to repository
/// priority (lower wins), then repository name, then URL.
fn newest_first(a: &Package, b: &Package) -> Ordering {
    compare_versions(&b.version, &a.version)
        .then_with(|| a.repo_priority.cmp(&b.repo_priority))
        .then_with(|| a.repo_name.cmp(&b.repo_name))
        .then_with(|| a.repo_url.cmp(&b.repo_url))
}

impl CatalogIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything a repository contributed with a fresh set of records
    ///
    /// Returns the number of records indexed. Records with an empty
    /// identifier or version are skipped.
    pub fn replace_repository(
        &mut self,
        repository: &Arc<Repository>,
        records: Vec<PackageRecord>,
    ) -> usize {
        self.remove_where(|p| p.repo_name == repository.name && p.repo_url == repository.url);

        let mut added = 0;
        for record in records {
            if record.identifier.trim().is_empty() || record.version.trim().is_empty() {
                tracing::warn!(
                    "Skipping record without identifier or version from '{}'",
                    repository.name
                );
                continue;
            }

            let package = Arc::new(Package::from_record(record, repository));
            self.entries
                .entry(package.identifier.clone())
                .or_default()
                .push(package);
            added += 1;
        }

        for versions in self.entries.values_mut() {
            versions.sort_by(|a, b| newest_first(a, b));
        }

        added
    }

    /// Drop every record supplied by the named repository
    pub fn remove_repository(&mut self, name: &str) -> usize {
        self.remove_where(|p| p.repo_name == name)
    }

    fn remove_where(&mut self, predicate: impl Fn(&Package) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, versions| {
            let before = versions.len();
            versions.retain(|p| !predicate(p));
            removed += before - versions.len();
            !versions.is_empty()
        });
        removed
    }

    /// Get the newest record for an identifier
    pub fn newest(&self, identifier: &str) -> Option<&Arc<Package>> {
        self.entries.get(identifier).and_then(|v| v.first())
    }

    /// Get all records for an identifier, newest first
    pub fn versions(&self, identifier: &str) -> &[Arc<Package>] {
        self.entries
            .get(identifier)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    /// Search the newest record of every package
    ///
    /// Matches identifier, name, author and description (case-insensitive).
    /// Results are sorted by identifier.
    pub fn search(&self, query: &str) -> Vec<&Arc<Package>> {
        let query_lower = query.to_lowercase();
        let mut results: Vec<&Arc<Package>> = self
            .entries
            .values()
            .filter_map(|versions| versions.first())
            .filter(|p| p.matches(&query_lower))
            .collect();
        results.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        results
    }

    /// Get all packages (newest record of each), sorted by identifier
    pub fn list_all(&self) -> Vec<&Arc<Package>> {
        let mut all: Vec<&Arc<Package>> = self
            .entries
            .values()
            .filter_map(|versions| versions.first())
            .collect();
        all.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        all
    }

    /// Number of unique identifiers
    pub fn package_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of records across all identifiers
    pub fn version_count(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }
}
