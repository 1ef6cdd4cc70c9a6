//! Featured package card state and its catalog refresh

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{Appearance, AppearanceChannel, AppearanceObserver, FeaturedPackageConfig, PurchaseLedger};
use crate::catalog::{Lookup, Package, PackageCatalog};
use crate::dispatch::MainQueue;

/// Fixed card height, in points
pub const CARD_HEIGHT: f64 = 81.0;

/// Version line once the package is confirmed absent
pub const PACKAGE_UNAVAILABLE: &str = "Package unavailable";

const PLACEHOLDER_ICON: &str = "Tweak Icon";
const LOADING: &str = "Loading";

/// The package a card's queue button acts on
#[derive(Debug, Clone, Default)]
pub struct QueueButton {
    pub package: Option<Arc<Package>>,
    pub override_title: Option<String>,
}

impl QueueButton {
    pub fn title(&self) -> String {
        if let Some(title) = &self.override_title {
            return title.clone();
        }
        match &self.package {
            Some(package) if package.commercial => "Buy".to_string(),
            Some(_) => "Get".to_string(),
            None => "Unavailable".to_string(),
        }
    }
}

/// What activating a card leads to
#[derive(Debug, Clone)]
pub enum Depiction {
    /// Show the package's detail screen
    Push(Arc<Package>),

    /// Tell the user the package cannot be found
    Alert { title: String, message: String },
}

/// Purchase state of a card's package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Another update for this card is already running
    InProgress,
    /// Package or its repository is not available
    Unknown,
    Free,
    Purchased { repository: String },
    NotPurchased { repository: String },
}

#[derive(Debug)]
struct CardState {
    version_line: String,
    button: QueueButton,
    highlighted: bool,
    separator_color: Option<&'static str>,
    purchase_status: Option<PurchaseStatus>,
}

/// Plain copy of a card's visible state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSnapshot {
    pub package: String,
    pub title: String,
    pub author: String,
    pub icon: String,
    pub version_line: String,
    pub button_title: String,
    pub button_version: Option<String>,
    pub accessibility_label: String,
    pub highlighted: bool,
    pub separator_color: Option<String>,
    pub purchase_status: Option<PurchaseStatus>,
}

/// Headless featured package card
///
/// Shared as `Arc<FeaturedPackageCard>`; state changes are expected to
/// happen on the interactive thread.
#[derive(Debug)]
pub struct FeaturedPackageCard {
    config: FeaturedPackageConfig,
    state: Mutex<CardState>,
    updating_purchase: AtomicBool,
}

impl FeaturedPackageCard {
    /// Build a card, seeding the button with whatever the catalog knows now
    pub fn new(config: FeaturedPackageConfig, catalog: &PackageCatalog) -> Arc<Self> {
        let button = QueueButton {
            package: catalog.newest_package(&config.package),
            override_title: config.button_text.clone(),
        };

        let state = CardState {
            version_line: format!("{} · {}", LOADING, config.repo_name),
            button,
            highlighted: false,
            separator_color: None,
            purchase_status: None,
        };

        Arc::new(Self {
            config,
            state: Mutex::new(state),
            updating_purchase: AtomicBool::new(false),
        })
    }

    fn state(&self) -> MutexGuard<'_, CardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &FeaturedPackageConfig {
        &self.config
    }

    pub fn package_identifier(&self) -> &str {
        &self.config.package
    }

    pub fn title(&self) -> &str {
        &self.config.package_name
    }

    pub fn author(&self) -> &str {
        &self.config.package_author
    }

    /// Icon URL, or the placeholder icon name when none is configured
    pub fn icon(&self) -> &str {
        if self.config.package_icon.is_empty() {
            PLACEHOLDER_ICON
        } else {
            &self.config.package_icon
        }
    }

    pub fn accessibility_label(&self) -> String {
        format!("{} by {}", self.config.package_name, self.config.package_author)
    }

    pub fn height(&self) -> f64 {
        CARD_HEIGHT
    }

    pub fn version_line(&self) -> String {
        self.state().version_line.clone()
    }

    pub fn button(&self) -> QueueButton {
        self.state().button.clone()
    }

    pub fn is_highlighted(&self) -> bool {
        self.state().highlighted
    }

    /// Touch began (`true`) or ended/cancelled (`false`)
    pub fn set_highlighted(&self, highlighted: bool) {
        self.state().highlighted = highlighted;
    }

    pub fn separator_color(&self) -> Option<&'static str> {
        self.state().separator_color
    }

    /// Follow appearance changes when this card draws a separator
    pub fn attach_appearance(self: &Arc<Self>, channel: &AppearanceChannel) {
        if !self.config.use_separator {
            return;
        }
        self.state().separator_color = Some(channel.current().separator_color());
        channel.subscribe(self);
    }

    /// Apply the catalog's current answer
    ///
    /// Leaves the loading line alone while the catalog is still loading and
    /// never replaces a button package that is already set.
    pub fn refresh_from(&self, catalog: &PackageCatalog) {
        let lookup = catalog.lookup(&self.config.package);
        let mut state = self.state();

        match lookup {
            Lookup::Found(package) => {
                state.version_line = format!("{} · {}", package.version, self.config.repo_name);
                if state.button.package.is_none() {
                    state.button.package = Some(package);
                }
            }
            Lookup::Absent => state.version_line = PACKAGE_UNAVAILABLE.to_string(),
            Lookup::Pending => {}
        }
    }

    /// Wait for the catalog in the background, then refresh on the interactive thread
    ///
    /// The card is only weakly referenced while waiting. If it is dropped
    /// before the catalog is ready, the update does nothing.
    pub fn schedule_refresh(
        self: &Arc<Self>,
        catalog: &PackageCatalog,
        main_queue: &MainQueue,
        runtime: &Handle,
    ) -> JoinHandle<()> {
        let card = Arc::downgrade(self);
        let catalog = catalog.clone();
        let main_queue = main_queue.clone();

        runtime.spawn_blocking(move || {
            catalog.wait_for_ready();

            main_queue.dispatch(move || match card.upgrade() {
                Some(card) => card.refresh_from(&catalog),
                None => debug!("Featured card dropped before catalog was ready"),
            });
        })
    }

    /// Where activating (tap, accessibility activate) this card leads
    pub fn open_depiction(&self, catalog: &PackageCatalog) -> Depiction {
        match catalog.newest_package(&self.config.package) {
            Some(package) => Depiction::Push(package),
            None => Depiction::Alert {
                title: "Package Unavailable".to_string(),
                message: format!(
                    "This package is not available from {}. Try refreshing your sources.",
                    self.config.repo_name
                ),
            },
        }
    }

    /// Package for a peek preview, if any
    pub fn preview(&self, catalog: &PackageCatalog) -> Option<Arc<Package>> {
        catalog.newest_package(&self.config.package)
    }

    /// Work out whether the card's package is purchased
    ///
    /// Only one update runs at a time per card; a concurrent call returns
    /// `InProgress` without touching the stored status.
    pub fn update_purchase_status(
        &self,
        catalog: &PackageCatalog,
        ledger: &PurchaseLedger,
    ) -> PurchaseStatus {
        if self.updating_purchase.swap(true, Ordering::AcqRel) {
            return PurchaseStatus::InProgress;
        }

        let status = self.resolve_purchase_status(catalog, ledger);
        self.state().purchase_status = Some(status.clone());
        self.updating_purchase.store(false, Ordering::Release);
        status
    }

    fn resolve_purchase_status(
        &self,
        catalog: &PackageCatalog,
        ledger: &PurchaseLedger,
    ) -> PurchaseStatus {
        let Some(package) = catalog.newest_package(&self.config.package) else {
            return PurchaseStatus::Unknown;
        };
        let Some(repository) = package.repository() else {
            return PurchaseStatus::Unknown;
        };

        if ledger.contains(&package.identifier) {
            PurchaseStatus::Purchased {
                repository: repository.name.clone(),
            }
        } else if package.commercial {
            PurchaseStatus::NotPurchased {
                repository: repository.name.clone(),
            }
        } else {
            PurchaseStatus::Free
        }
    }

    pub fn purchase_status(&self) -> Option<PurchaseStatus> {
        self.state().purchase_status.clone()
    }

    pub fn snapshot(&self) -> CardSnapshot {
        let state = self.state();
        CardSnapshot {
            package: self.config.package.clone(),
            title: self.config.package_name.clone(),
            author: self.config.package_author.clone(),
            icon: self.icon().to_string(),
            version_line: state.version_line.clone(),
            button_title: state.button.title(),
            button_version: state.button.package.as_ref().map(|p| p.version.clone()),
            accessibility_label: self.accessibility_label(),
            highlighted: state.highlighted,
            separator_color: state.separator_color.map(str::to_string),
            purchase_status: state.purchase_status.clone(),
        }
    }
}

impl AppearanceObserver for FeaturedPackageCard {
    fn appearance_changed(&self, appearance: Appearance) {
        let mut state = self.state();
        if state.separator_color.is_some() {
            state.separator_color = Some(appearance.separator_color());
        }
    }
}
