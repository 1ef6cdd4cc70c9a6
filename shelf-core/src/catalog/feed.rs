//! Repository feeds
//!
//! A feed supplies the package records of one repository. The catalog
//! drives feeds; it never parses documents or talks to the network itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{FeedError, PackageRecord, Repository, DEFAULT_CACHE_TTL};

/// Source of package records for a single repository
#[async_trait]
pub trait PackageFeed: Send + Sync {
    /// The repository this feed supplies
    fn repository(&self) -> Arc<Repository>;

    /// Load the repository's package records
    async fn load(&self) -> Result<Vec<PackageRecord>, FeedError>;

    /// Load again, bypassing any cache the feed keeps
    async fn reload(&self) -> Result<Vec<PackageRecord>, FeedError> {
        self.load().await
    }
}

/// A feed document (index.yaml)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocument {
    /// API version
    pub api_version: String,

    /// Kind (PackageIndex)
    pub kind: String,

    /// When the document was generated
    #[serde(default)]
    pub generated: String,

    /// Every package version the repository offers
    #[serde(default)]
    pub packages: Vec<PackageRecord>,
}

impl Default for FeedDocument {
    fn default() -> Self {
        Self {
            api_version: "shelf.dev/v1".to_string(),
            kind: "PackageIndex".to_string(),
            generated: chrono::Utc::now().to_rfc3339(),
            packages: Vec::new(),
        }
    }
}

impl FeedDocument {
    /// Parse a feed document; `origin` names the source in errors
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self, FeedError> {
        serde_yaml_ng::from_str(content).map_err(|source| FeedError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        use anyhow::Context;
        serde_yaml_ng::to_string(self).context("Failed to serialize feed document")
    }
}

/// Settings shared by the feeds of one catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    /// Where remote feeds cache documents; `None` disables caching
    pub cache_dir: Option<PathBuf>,

    /// How long a cached document stays fresh
    pub cache_ttl: Duration,

    /// Request timeout for remote feeds
    pub timeout: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Pick the feed implementation for a repository URL
///
/// `http(s)://` URLs get an `HttpFeed`, `file://` URLs and bare paths a
/// `FileFeed`. Any other scheme is unsupported.
pub fn feed_for(
    repository: Arc<Repository>,
    options: &FeedOptions,
) -> Result<Arc<dyn PackageFeed>, FeedError> {
    let url = repository.url.clone();

    if url.starts_with("http://") || url.starts_with("https://") {
        #[cfg(feature = "remote")]
        {
            let feed: Arc<dyn PackageFeed> = Arc::new(HttpFeed::new(repository, options.clone())?);
            return Ok(feed);
        }
        #[cfg(not(feature = "remote"))]
        {
            let _ = options;
            return Err(FeedError::FeatureDisabled);
        }
    }

    let path = match url.strip_prefix("file://") {
        Some(path) => path.to_string(),
        None if url.contains("://") => return Err(FeedError::UnsupportedUrl(url)),
        None => url,
    };

    let feed: Arc<dyn PackageFeed> = Arc::new(FileFeed::new(repository, path));
    Ok(feed)
}

/// Feed backed by a document on disk
pub struct FileFeed {
    repository: Arc<Repository>,
    path: PathBuf,
}

impl FileFeed {
    pub fn new(repository: Arc<Repository>, path: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            path: path.into(),
        }
    }
}

#[async_trait]
impl PackageFeed for FileFeed {
    fn repository(&self) -> Arc<Repository> {
        Arc::clone(&self.repository)
    }

    async fn load(&self) -> Result<Vec<PackageRecord>, FeedError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| FeedError::Io {
                    path: self.path.clone(),
                    source,
                })?;

        let document = FeedDocument::from_yaml(&content, &self.path.display().to_string())?;
        tracing::debug!(
            "Read {} records from {}",
            document.packages.len(),
            self.path.display()
        );
        Ok(document.packages)
    }
}

/// Feed holding its records in memory
pub struct StaticFeed {
    repository: Arc<Repository>,
    records: Vec<PackageRecord>,
}

impl StaticFeed {
    pub fn new(repository: Arc<Repository>, records: Vec<PackageRecord>) -> Self {
        Self {
            repository,
            records,
        }
    }
}

#[async_trait]
impl PackageFeed for StaticFeed {
    fn repository(&self) -> Arc<Repository> {
        Arc::clone(&self.repository)
    }

    async fn load(&self) -> Result<Vec<PackageRecord>, FeedError> {
        Ok(self.records.clone())
    }
}

#[cfg(feature = "remote")]
pub use remote::HttpFeed;

#[cfg(feature = "remote")]
mod remote {
    use super::*;
    use std::path::Path;
    use std::time::SystemTime;

    /// Cached document metadata
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct CachedDocument {
        /// When the document was cached (Unix timestamp)
        cached_at: u64,

        /// The cached feed document
        document: FeedDocument,
    }

    fn unix_now() -> u64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Feed fetched over HTTP, with an on-disk cache
    pub struct HttpFeed {
        repository: Arc<Repository>,
        options: FeedOptions,
        client: reqwest::Client,
    }

    impl HttpFeed {
        pub fn new(repository: Arc<Repository>, options: FeedOptions) -> Result<Self, FeedError> {
            let client = reqwest::Client::builder()
                .user_agent(concat!("shelf/", env!("CARGO_PKG_VERSION")))
                .timeout(options.timeout)
                .build()
                .map_err(|source| FeedError::Http {
                    url: repository.url.clone(),
                    source,
                })?;

            Ok(Self {
                repository,
                options,
                client,
            })
        }

        /// Get cache file path for this feed's URL
        fn cache_path(&self) -> Option<PathBuf> {
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};

            let cache_dir = self.options.cache_dir.as_ref()?;
            let mut hasher = DefaultHasher::new();
            self.repository.url.hash(&mut hasher);
            Some(cache_dir.join(format!("feed_{:016x}.yaml", hasher.finish())))
        }

        /// Load cached document if still fresh
        fn load_cached(&self, cache_path: &Path) -> Option<FeedDocument> {
            let content = std::fs::read_to_string(cache_path).ok()?;
            let cached: CachedDocument = match serde_yaml_ng::from_str(&content) {
                Ok(cached) => cached,
                Err(e) => {
                    tracing::debug!("Ignoring unreadable cache {}: {}", cache_path.display(), e);
                    return None;
                }
            };

            let age = Duration::from_secs(unix_now().saturating_sub(cached.cached_at));
            if age > self.options.cache_ttl {
                tracing::debug!("Cache expired for {} (age: {:?})", self.repository.url, age);
                return None;
            }

            tracing::debug!("Using cached feed for {} (age: {:?})", self.repository.url, age);
            Some(cached.document)
        }

        /// Save document to cache
        fn save_to_cache(&self, cache_path: &Path, document: &FeedDocument) -> anyhow::Result<()> {
            use anyhow::Context;

            if let Some(parent) = cache_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }

            let cached = CachedDocument {
                cached_at: unix_now(),
                document: document.clone(),
            };
            let content = serde_yaml_ng::to_string(&cached).context("Failed to serialize cache")?;
            std::fs::write(cache_path, content)
                .with_context(|| format!("Failed to write cache: {}", cache_path.display()))?;

            tracing::debug!("Saved feed to cache: {}", cache_path.display());
            Ok(())
        }

        async fn fetch(&self, force_refresh: bool) -> Result<Vec<PackageRecord>, FeedError> {
            let cache_path = self.cache_path();

            if !force_refresh {
                if let Some(document) = cache_path.as_deref().and_then(|p| self.load_cached(p)) {
                    return Ok(document.packages);
                }
            }

            let document = self.fetch_from_url().await?;

            // Caching is best effort
            if let Some(path) = cache_path.as_deref() {
                if let Err(e) = self.save_to_cache(path, &document) {
                    tracing::warn!("Failed to save feed to cache: {}", e);
                }
            }

            Ok(document.packages)
        }

        async fn fetch_from_url(&self) -> Result<FeedDocument, FeedError> {
            let url = &self.repository.url;
            let http_error = |source| FeedError::Http {
                url: url.clone(),
                source,
            };

            let response = self.client.get(url).send().await.map_err(http_error)?;

            if !response.status().is_success() {
                return Err(FeedError::Status {
                    url: url.clone(),
                    status: response.status().as_u16(),
                });
            }

            let content = response.text().await.map_err(http_error)?;
            FeedDocument::from_yaml(&content, url)
        }
    }

    #[async_trait]
    impl PackageFeed for HttpFeed {
        fn repository(&self) -> Arc<Repository> {
            Arc::clone(&self.repository)
        }

        async fn load(&self) -> Result<Vec<PackageRecord>, FeedError> {
            self.fetch(false).await
        }

        async fn reload(&self) -> Result<Vec<PackageRecord>, FeedError> {
            self.fetch(true).await
        }
    }

    #[cfg(test)]
    mod http_feed_tests {
        use super::*;
        use tempfile::TempDir;

        fn feed_with_cache(dir: &Path, url: &str) -> HttpFeed {
            let options = FeedOptions {
                cache_dir: Some(dir.to_path_buf()),
                ..FeedOptions::default()
            };
            HttpFeed::new(Arc::new(Repository::new("remote", url)), options).unwrap()
        }

        #[test]
        fn test_cache_paths_differ_per_url() {
            let temp_dir = TempDir::new().unwrap();
            let a = feed_with_cache(temp_dir.path(), "https://a.example.com/index.yaml");
            let b = feed_with_cache(temp_dir.path(), "https://b.example.com/index.yaml");

            let path_a = a.cache_path().unwrap();
            assert_ne!(path_a, b.cache_path().unwrap());
            assert!(path_a.to_string_lossy().ends_with(".yaml"));
        }

        #[tokio::test]
        async fn test_fresh_cache_avoids_network() {
            let temp_dir = TempDir::new().unwrap();
            // Unroutable host: any network attempt would fail the load
            let feed = feed_with_cache(temp_dir.path(), "https://cache-only.invalid/index.yaml");

            let mut document = FeedDocument::default();
            document.packages.push(PackageRecord::new("cached.pkg", "1.0"));
            let cache_path = feed.cache_path().unwrap();
            feed.save_to_cache(&cache_path, &document).unwrap();

            let records = feed.load().await.unwrap();
            assert_eq!(records, vec![PackageRecord::new("cached.pkg", "1.0")]);
        }

        #[test]
        fn test_expired_cache_is_ignored() {
            let temp_dir = TempDir::new().unwrap();
            let options = FeedOptions {
                cache_dir: Some(temp_dir.path().to_path_buf()),
                cache_ttl: Duration::ZERO,
                ..FeedOptions::default()
            };
            let feed = HttpFeed::new(
                Arc::new(Repository::new("remote", "https://stale.invalid/index.yaml")),
                options,
            )
            .unwrap();

            let cache_path = feed.cache_path().unwrap();
            let stale = CachedDocument {
                cached_at: 0,
                document: FeedDocument::default(),
            };
            std::fs::write(&cache_path, serde_yaml_ng::to_string(&stale).unwrap()).unwrap();

            assert!(feed.load_cached(&cache_path).is_none());
        }
    }
}
