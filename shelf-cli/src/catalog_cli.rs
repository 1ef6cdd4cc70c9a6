//! Repository and catalog query commands

use anyhow::{Context, Result};
use clap::Subcommand;
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use shelf_core::catalog::{Package, PackageCatalog, RepositoryManager};

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Add a package repository
    Add {
        /// Repository name (e.g., "community")
        name: String,
        /// Feed URL (http(s):// or file://, must serve a PackageIndex document)
        url: String,
        /// Priority when two repositories offer the same version (lower wins)
        #[clap(long)]
        priority: Option<u32>,
    },

    /// List configured repositories
    List,

    /// Remove a repository
    Remove {
        /// Repository name
        name: String,
    },
}

pub fn execute_repo_command(mut manager: RepositoryManager, command: RepoCommand) -> Result<()> {
    match command {
        RepoCommand::Add {
            name,
            url,
            priority,
        } => {
            manager.add_repository(&name, &url, priority)?;
            manager.save()?;
            println!("Added repository '{name}' -> {url}");
        }
        RepoCommand::List => {
            let default_name = manager.default_repository().map(|r| r.name.as_str());

            println!("Configured repositories:\n");
            for (position, entry) in manager.repositories().iter().enumerate() {
                let default_marker = if Some(entry.name.as_str()) == default_name {
                    " (default)"
                } else {
                    ""
                };
                let priority = entry.priority.unwrap_or(position as u32);
                println!(
                    "  {} -> {} [priority {}]{}",
                    entry.name, entry.url, priority, default_marker
                );
            }
        }
        RepoCommand::Remove { name } => {
            manager.remove_repository(&name)?;
            manager.save()?;
            println!("Removed repository '{name}'");
        }
    }

    Ok(())
}

/// Build the catalog and wait for it, up to the configured timeout
///
/// On timeout the catalog is returned anyway; lookups then reflect whatever
/// feeds have loaded so far.
pub async fn load_catalog(manager: &RepositoryManager, force_refresh: bool) -> Result<PackageCatalog> {
    if force_refresh {
        manager
            .clear_cache()
            .context("Failed to clear feed cache")?;
    }

    let catalog = manager.build_catalog();
    let timeout = manager.ready_timeout();

    if tokio::time::timeout(timeout, catalog.load()).await.is_err() {
        tracing::warn!(
            "Catalog not ready after {}s, showing partial results",
            timeout.as_secs()
        );
    }

    Ok(catalog)
}

fn package_json(package: &Package) -> serde_json::Value {
    serde_json::json!({
        "package": package.identifier,
        "version": package.version,
        "name": package.name,
        "author": package.author,
        "description": package.description,
        "section": package.section,
        "commercial": package.commercial,
        "repository": package.repository_name(),
    })
}

/// Table row for search results
#[derive(Tabled)]
struct SearchResultRow {
    #[tabled(rename = "Package")]
    identifier: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Repository")]
    repository: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max - 3).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

pub async fn execute_search(
    manager: &RepositoryManager,
    query: Option<&str>,
    json_output: bool,
    force_refresh: bool,
) -> Result<()> {
    let catalog = load_catalog(manager, force_refresh).await?;

    let results: Vec<Arc<Package>> = match query {
        Some(q) => catalog.search(q),
        None => catalog.list_all(),
    };

    if json_output {
        let json_results: Vec<serde_json::Value> =
            results.iter().map(|p| package_json(p)).collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No packages found.");
        return Ok(());
    }

    println!("Found {} package(s):\n", results.len());

    let table_rows: Vec<SearchResultRow> = results
        .iter()
        .map(|package| SearchResultRow {
            identifier: package.identifier.clone(),
            name: package.display_name().to_string(),
            version: package.version.clone(),
            repository: package.repository_name().to_string(),
            description: truncate(package.description.as_deref().unwrap_or(""), 50),
        })
        .collect();

    let table = Table::new(&table_rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
    Ok(())
}

pub async fn execute_show(
    manager: &RepositoryManager,
    identifier: &str,
    json_output: bool,
    force_refresh: bool,
) -> Result<()> {
    let catalog = load_catalog(manager, force_refresh).await?;

    let versions = catalog.versions(identifier);
    let newest = versions
        .first()
        .with_context(|| format!("Package '{identifier}' not found in any repository"))?;

    if json_output {
        let mut output = package_json(newest);
        output["versions"] = serde_json::json!(versions
            .iter()
            .map(|v| serde_json::json!({
                "version": v.version,
                "repository": v.repository_name(),
            }))
            .collect::<Vec<_>>());
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Package:    {}", newest.identifier);
    println!("Name:       {}", newest.display_name());
    if let Some(author) = &newest.author {
        println!("Author:     {author}");
    }
    if let Some(section) = &newest.section {
        println!("Section:    {section}");
    }
    println!("Newest:     {} ({})", newest.version, newest.repository_name());
    if newest.commercial {
        println!("Commercial: yes");
    }

    if let Some(description) = &newest.description {
        println!();
        println!("Description:");
        for line in description.lines() {
            println!("  {line}");
        }
    }

    println!();
    println!("Available versions:");
    for (i, package) in versions.iter().take(10).enumerate() {
        let marker = if i == 0 { " (newest)" } else { "" };
        println!(
            "  {} from {}{}",
            package.version,
            package.repository_name(),
            marker
        );
    }
    if versions.len() > 10 {
        println!("  ... and {} more", versions.len() - 10);
    }

    Ok(())
}
