//! Featured section documents
//!
//! ```yaml
//! title: Staff Picks
//! packages:
//!   - package: com.example.tweak
//!     packageIcon: https://example.com/icon.png
//!     packageName: Tweak
//!     packageAuthor: Jane
//!     repoName: Example Repo
//!     buttonText: Free
//!     useSeparator: false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One featured package entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedPackageConfig {
    /// Package identifier to look up in the catalog
    pub package: String,

    /// Icon URL; empty means the placeholder icon
    pub package_icon: String,

    pub package_name: String,

    pub package_author: String,

    /// Repository name shown on the version line
    pub repo_name: String,

    /// Overrides the queue button title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,

    /// Draw a separator under the card
    #[serde(default = "default_use_separator")]
    pub use_separator: bool,
}

fn default_use_separator() -> bool {
    true
}

impl FeaturedPackageConfig {
    /// Parse a single entry; missing required keys fail
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse featured package")
    }
}

/// A featured section: an optional heading and its packages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub packages: Vec<FeaturedPackageConfig>,
}

impl FeaturedSection {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse featured section")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read featured section: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid featured section: {}", path.display()))
    }
}
