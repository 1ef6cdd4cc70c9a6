//! Featured package cards
//!
//! A card is the headless state behind one "featured package" tile: title,
//! author, a version line, and the package its queue button acts on. Cards
//! are built from a featured section document and kept current against a
//! `PackageCatalog`.
//!
//! Cards answer from the catalog immediately (possibly stale or empty), then
//! `FeaturedPackageCard::schedule_refresh` waits for the catalog off the
//! interactive thread and applies the authoritative answer back on it.

mod appearance;
mod card;
mod config;
mod purchases;

pub use appearance::{Appearance, AppearanceChannel, AppearanceObserver};
pub use card::{
    CardSnapshot, Depiction, FeaturedPackageCard, PurchaseStatus, QueueButton, CARD_HEIGHT,
    PACKAGE_UNAVAILABLE,
};
pub use config::{FeaturedPackageConfig, FeaturedSection};
pub use purchases::PurchaseLedger;
