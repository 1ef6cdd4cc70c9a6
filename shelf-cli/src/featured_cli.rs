//! Headless run of the featured package cards

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tokio::runtime::Handle;

use shelf_core::catalog::RepositoryManager;
use shelf_core::dispatch::MainQueue;
use shelf_core::featured::{
    Appearance, AppearanceChannel, CardSnapshot, FeaturedPackageCard, FeaturedSection,
    PurchaseLedger, PurchaseStatus,
};

#[derive(Tabled)]
struct CardRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Version")]
    version_line: String,
    #[tabled(rename = "Button")]
    button: String,
    #[tabled(rename = "Purchase")]
    purchase: String,
}

impl From<&CardSnapshot> for CardRow {
    fn from(snapshot: &CardSnapshot) -> Self {
        let purchase = match &snapshot.purchase_status {
            None => "-".to_string(),
            Some(PurchaseStatus::InProgress) => "checking".to_string(),
            Some(PurchaseStatus::Unknown) => "unknown".to_string(),
            Some(PurchaseStatus::Free) => "free".to_string(),
            Some(PurchaseStatus::Purchased { repository }) => format!("purchased ({repository})"),
            Some(PurchaseStatus::NotPurchased { repository }) => {
                format!("not purchased ({repository})")
            }
        };

        Self {
            package: snapshot.package.clone(),
            title: snapshot.accessibility_label.clone(),
            version_line: snapshot.version_line.clone(),
            button: snapshot.button_title.clone(),
            purchase,
        }
    }
}

fn print_cards(heading: &str, snapshots: &[CardSnapshot]) {
    let rows: Vec<CardRow> = snapshots.iter().map(CardRow::from).collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{heading}:\n");
    println!("{table}\n");
}

fn load_ledger(manager: &RepositoryManager, path: Option<PathBuf>) -> Result<PurchaseLedger> {
    let path = path.unwrap_or_else(|| manager.config_dir().join("purchases.yaml"));
    PurchaseLedger::load_from_path(&path)
}

pub async fn execute_featured(
    manager: &RepositoryManager,
    file: &Path,
    purchases: Option<PathBuf>,
    dark: bool,
    json_output: bool,
) -> Result<()> {
    let section = FeaturedSection::load(file)?;
    let ledger = load_ledger(manager, purchases)?;

    let catalog = manager.build_catalog();
    let runtime = Handle::current();
    catalog.start(&runtime);

    let main_queue = MainQueue::spawn().context("Failed to start interactive thread")?;
    let appearance = AppearanceChannel::new(if dark {
        Appearance::Dark
    } else {
        Appearance::Light
    });

    // Cards answer from whatever the catalog has right now
    let cards: Vec<Arc<FeaturedPackageCard>> = section
        .packages
        .into_iter()
        .map(|config| {
            let card = FeaturedPackageCard::new(config, &catalog);
            card.attach_appearance(&appearance);
            card
        })
        .collect();

    let initial: Vec<CardSnapshot> = cards.iter().map(|c| c.snapshot()).collect();

    let refreshes: Vec<_> = cards
        .iter()
        .map(|card| card.schedule_refresh(&catalog, &main_queue, &runtime))
        .collect();

    let timeout = manager.ready_timeout();
    let waited = tokio::time::timeout(timeout, async {
        for refresh in refreshes {
            refresh.await.context("Card refresh task failed")?;
        }
        anyhow::Ok(())
    })
    .await;

    match waited {
        Ok(result) => result?,
        Err(_) => tracing::warn!(
            "Catalog not ready after {}s, showing cards as they are",
            timeout.as_secs()
        ),
    }

    // Purchase status and snapshots are read on the interactive thread,
    // after every refresh dispatched so far has run
    let queue = main_queue.clone();
    let catalog_handle = catalog.clone();
    let refreshed = tokio::task::spawn_blocking(move || {
        queue.dispatch_and_wait(move || {
            cards
                .iter()
                .map(|card| {
                    card.update_purchase_status(&catalog_handle, &ledger);
                    card.snapshot()
                })
                .collect::<Vec<_>>()
        })
    })
    .await
    .context("Interactive thread task failed")?
    .context("Interactive thread stopped before cards were read")?;

    tokio::task::spawn_blocking(move || main_queue.shutdown())
        .await
        .context("Failed to stop interactive thread")?;

    if json_output {
        let output = serde_json::json!({
            "title": section.title,
            "ready": catalog.is_ready(),
            "initial": initial,
            "refreshed": refreshed,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let Some(title) = &section.title {
        println!("{title}\n");
    }
    print_cards("Initial", &initial);
    print_cards("Refreshed", &refreshed);

    Ok(())
}
