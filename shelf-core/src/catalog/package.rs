//! Package records as indexed by the catalog

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

use super::Repository;

/// A package entry as it appears in a feed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    /// Stable package identifier (e.g. `com.example.tweak`)
    #[serde(rename = "package")]
    pub identifier: String,

    /// Version string
    pub version: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Author or maintainer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Icon URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Whether the package is sold rather than free
    #[serde(default)]
    pub commercial: bool,
}

impl PackageRecord {
    /// Minimal record, mostly useful for building in-memory feeds
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
            name: None,
            author: None,
            description: None,
            section: None,
            icon: None,
            commercial: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn commercial(mut self) -> Self {
        self.commercial = true;
        self
    }
}

/// A package known to the catalog
///
/// Records are immutable once indexed; a newer version from any repository
/// is a new `Package`, not an update of this one.
#[derive(Debug, Clone)]
pub struct Package {
    pub identifier: String,
    pub version: String,
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub section: Option<String>,
    pub icon: Option<String>,
    pub commercial: bool,

    /// Back-reference to the supplying repository. The repository does
    /// not own the record and may be gone by the time this is upgraded.
    pub source_repo: Weak<Repository>,

    /// Copied out of the repository so ordering never needs an upgrade
    pub(crate) repo_name: String,
    pub(crate) repo_priority: u32,
    pub(crate) repo_url: String,
}

impl Package {
    /// Attach a feed record to the repository that supplied it
    pub fn from_record(record: PackageRecord, repository: &Arc<Repository>) -> Self {
        Self {
            identifier: record.identifier,
            version: record.version,
            name: record.name,
            author: record.author,
            description: record.description,
            section: record.section,
            icon: record.icon,
            commercial: record.commercial,
            source_repo: Arc::downgrade(repository),
            repo_name: repository.name.clone(),
            repo_priority: repository.priority,
            repo_url: repository.url.clone(),
        }
    }

    /// Supplying repository, if it is still alive
    pub fn repository(&self) -> Option<Arc<Repository>> {
        self.source_repo.upgrade()
    }

    /// Name of the supplying repository, available even after it is dropped
    pub fn repository_name(&self) -> &str {
        &self.repo_name
    }

    /// Display name, falling back to the identifier
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }

    /// Case-insensitive match against identifier, name, author and description
    pub fn matches(&self, query_lower: &str) -> bool {
        let contains = |field: Option<&str>| {
            field
                .map(|f| f.to_lowercase().contains(query_lower))
                .unwrap_or(false)
        };

        self.identifier.to_lowercase().contains(query_lower)
            || contains(self.name.as_deref())
            || contains(self.author.as_deref())
            || contains(self.description.as_deref())
    }
}
