//! Repository configuration and management
//!
//! Manages the configured package repositories and turns them into
//! feeds for a `PackageCatalog`. Remote feeds cache their documents
//! with a 15-minute TTL to reduce network requests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{feed_for, FeedOptions, PackageCatalog, PackageFeed};

/// Default cache TTL (15 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Default repository name
pub const DEFAULT_REPOSITORY_NAME: &str = "main";

/// Default repository URL
pub const DEFAULT_REPOSITORY_URL: &str = "https://repo.shelf.dev/index.yaml";

/// Environment variable overriding the config directory
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";

/// A repository as seen by the catalog
///
/// Feeds own the strong handle; package records only point back at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Repository name (e.g., "main", "mycompany")
    pub name: String,

    /// Location of the feed document
    pub url: String,

    /// Preference when two repositories offer the same version (lower wins)
    pub priority: u32,
}

impl Repository {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// A configured repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryEntry {
    pub name: String,

    /// URL to the feed document (http(s):// or file://)
    pub url: String,

    /// Explicit priority; configured position is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    /// Whether this is the default repository
    #[serde(default)]
    pub is_default: bool,
}

/// Repository configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// List of configured repositories
    pub repositories: Vec<RepositoryEntry>,

    /// Cache TTL for remote feeds, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,

    /// How long CLI commands wait for the catalog, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_timeout_secs: Option<u64>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repositories: vec![RepositoryEntry {
                name: DEFAULT_REPOSITORY_NAME.to_string(),
                url: DEFAULT_REPOSITORY_URL.to_string(),
                priority: None,
                is_default: true,
            }],
            cache_ttl_secs: None,
            ready_timeout_secs: None,
        }
    }
}

/// Manages configured repositories
pub struct RepositoryManager {
    config: RepositoryConfig,
    config_dir: PathBuf,
}

impl RepositoryManager {
    /// Load repository configuration from the default location
    pub fn load() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::load_from_dir(config_dir)
    }

    /// Load repository configuration from a specific directory
    pub fn load_from_dir(config_dir: PathBuf) -> Result<Self> {
        let config_path = config_dir.join("repositories.yaml");

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read repository config: {}", config_path.display())
            })?;
            serde_yaml_ng::from_str(&content).with_context(|| {
                format!("Failed to parse repository config: {}", config_path.display())
            })?
        } else {
            RepositoryConfig::default()
        };

        Ok(Self { config, config_dir })
    }

    /// Get the config directory, honouring `SHELF_CONFIG_DIR`
    fn default_config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        directories::ProjectDirs::from("dev", "shelf", "shelf")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("shelf")))
            .context("Could not determine config directory")
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join("repositories.yaml")
    }

    /// Directory remote feeds cache their documents in
    pub fn cache_dir(&self) -> PathBuf {
        self.config_dir.join("cache")
    }

    /// Clear all cached feed documents
    pub fn clear_cache(&self) -> Result<()> {
        let cache_dir = self.cache_dir();
        if !cache_dir.exists() {
            return Ok(());
        }

        for entry in std::fs::read_dir(&cache_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "yaml").unwrap_or(false) {
                std::fs::remove_file(&path)?;
            }
        }

        Ok(())
    }

    /// Save the current configuration
    pub fn save(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(&self.config)
            .context("Failed to serialize repository config")?;

        std::fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.config_dir.display()
            )
        })?;

        let config_path = self.config_path();
        std::fs::write(&config_path, content).with_context(|| {
            format!("Failed to write repository config: {}", config_path.display())
        })?;

        Ok(())
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Get all configured repositories
    pub fn repositories(&self) -> &[RepositoryEntry] {
        &self.config.repositories
    }

    /// Get a repository by name
    pub fn get_repository(&self, name: &str) -> Option<&RepositoryEntry> {
        self.config.repositories.iter().find(|r| r.name == name)
    }

    /// Get the default repository
    pub fn default_repository(&self) -> Option<&RepositoryEntry> {
        self.config
            .repositories
            .iter()
            .find(|r| r.is_default)
            .or_else(|| self.config.repositories.first())
    }

    /// Add a new repository
    pub fn add_repository(&mut self, name: &str, url: &str, priority: Option<u32>) -> Result<()> {
        if self.config.repositories.iter().any(|r| r.name == name) {
            anyhow::bail!("Repository '{}' already exists", name);
        }

        if !["http://", "https://", "file://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            anyhow::bail!("Repository URL must start with http://, https:// or file://");
        }

        self.config.repositories.push(RepositoryEntry {
            name: name.to_string(),
            url: url.to_string(),
            priority,
            is_default: false,
        });

        Ok(())
    }

    /// Remove a repository by name
    pub fn remove_repository(&mut self, name: &str) -> Result<()> {
        if name == DEFAULT_REPOSITORY_NAME {
            anyhow::bail!(
                "Cannot remove the default '{}' repository",
                DEFAULT_REPOSITORY_NAME
            );
        }

        let initial_len = self.config.repositories.len();
        self.config.repositories.retain(|r| r.name != name);

        if self.config.repositories.len() == initial_len {
            anyhow::bail!("Repository '{}' not found", name);
        }

        Ok(())
    }

    /// Feed settings derived from this configuration
    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            cache_dir: Some(self.cache_dir()),
            cache_ttl: self
                .config
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CACHE_TTL),
            ..FeedOptions::default()
        }
    }

    /// How long callers should be willing to wait for the initial load
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.config.ready_timeout_secs.unwrap_or(60))
    }

    /// Build one feed per configured repository, in configured order
    ///
    /// Repositories whose URL has no feed implementation are skipped
    /// with a warning, the same way a failing feed would contribute nothing.
    pub fn feeds(&self) -> Vec<Arc<dyn PackageFeed>> {
        let options = self.feed_options();

        self.config
            .repositories
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                let priority = entry.priority.unwrap_or(position as u32);
                let repository =
                    Arc::new(Repository::new(&entry.name, &entry.url).with_priority(priority));

                match feed_for(repository, &options) {
                    Ok(feed) => Some(feed),
                    Err(e) => {
                        tracing::warn!("Skipping repository '{}': {}", entry.name, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Build a catalog over every configured repository
    ///
    /// The catalog is not started; call `start` or `load` on it.
    pub fn build_catalog(&self) -> PackageCatalog {
        PackageCatalog::new(self.feeds())
    }
}
