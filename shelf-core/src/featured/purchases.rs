//! Locally recorded purchases
//!
//! The ledger only remembers which packages the user has bought. Checking
//! entitlements with a repository is the host's job.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLedger {
    /// Identifiers of purchased packages
    #[serde(default)]
    purchased: BTreeSet<String>,
}

impl PurchaseLedger {
    /// Load the ledger, or an empty one if the file does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read purchases: {}", path.display()))?;
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse purchases: {}", path.display()))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write purchases: {}", path.display()))?;
        Ok(())
    }

    /// Remember a purchase; returns `false` if it was already recorded
    pub fn record(&mut self, identifier: &str) -> bool {
        self.purchased.insert(identifier.to_string())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.purchased.contains(identifier)
    }
}
