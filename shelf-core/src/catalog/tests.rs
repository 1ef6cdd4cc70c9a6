//! Integration tests for the catalog module

#[cfg(test)]
mod integration_tests {
    use crate::catalog::{FeedDocument, Lookup, PackageRecord, RepositoryManager};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_feed(path: &Path, records: Vec<PackageRecord>) {
        let document = FeedDocument {
            packages: records,
            ..FeedDocument::default()
        };
        std::fs::write(path, document.to_yaml().unwrap()).unwrap();
    }

    /// Config with two file repositories and no remote default
    fn local_manager(temp_dir: &TempDir) -> RepositoryManager {
        let stable = temp_dir.path().join("stable.yaml");
        let beta = temp_dir.path().join("beta.yaml");

        let config = format!(
            "repositories:\n  - name: stable\n    url: file://{}\n    is_default: true\n  - name: beta\n    url: file://{}\n",
            stable.display(),
            beta.display()
        );
        std::fs::write(temp_dir.path().join("repositories.yaml"), config).unwrap();

        RepositoryManager::load_from_dir(temp_dir.path().to_path_buf()).unwrap()
    }

    /// Configured repositories load from disk and merge by version
    #[tokio::test]
    async fn test_catalog_from_configured_files() {
        let temp_dir = TempDir::new().unwrap();
        write_feed(
            &temp_dir.path().join("stable.yaml"),
            vec![
                PackageRecord::new("com.example.tweak", "1.0").with_name("Tweak"),
                PackageRecord::new("com.example.only-stable", "2.0"),
            ],
        );
        write_feed(
            &temp_dir.path().join("beta.yaml"),
            vec![PackageRecord::new("com.example.tweak", "1.2~beta1")],
        );

        let catalog = local_manager(&temp_dir).build_catalog();
        catalog.load().await;

        let newest = catalog.newest_package("com.example.tweak").unwrap();
        assert_eq!(newest.version, "1.2~beta1");
        assert_eq!(newest.repository_name(), "beta");
        assert!(newest.repository().is_some());

        assert!(catalog.newest_package("com.example.only-stable").is_some());
        assert!(matches!(catalog.lookup("com.example.missing"), Lookup::Absent));
    }

    /// A missing feed file counts as a failed feed, not a stall
    #[tokio::test]
    async fn test_missing_feed_file_still_ready() {
        let temp_dir = TempDir::new().unwrap();
        write_feed(
            &temp_dir.path().join("stable.yaml"),
            vec![PackageRecord::new("x", "1.0")],
        );
        // beta.yaml intentionally absent

        let catalog = local_manager(&temp_dir).build_catalog();
        catalog.load().await;

        assert!(catalog.is_ready());
        assert_eq!(catalog.newest_package("x").unwrap().repository_name(), "stable");
    }

    /// Refreshing picks up new records without touching readiness
    #[tokio::test]
    async fn test_refresh_repository_replaces_records() {
        let temp_dir = TempDir::new().unwrap();
        let stable = temp_dir.path().join("stable.yaml");
        write_feed(&stable, vec![PackageRecord::new("x", "1.0")]);
        write_feed(&temp_dir.path().join("beta.yaml"), vec![]);

        let catalog = local_manager(&temp_dir).build_catalog();
        catalog.load().await;
        assert_eq!(catalog.newest_package("x").unwrap().version, "1.0");

        write_feed(&stable, vec![PackageRecord::new("x", "1.1"), PackageRecord::new("y", "0.1")]);
        let added = catalog.refresh_repository("stable").await.unwrap();

        assert_eq!(added, 2);
        assert!(catalog.is_ready());
        assert_eq!(catalog.newest_package("x").unwrap().version, "1.1");
        assert_eq!(catalog.versions("x").len(), 1);
        assert!(catalog.newest_package("y").is_some());
    }

    /// A failed refresh keeps the previous records
    #[tokio::test]
    async fn test_failed_refresh_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let stable = temp_dir.path().join("stable.yaml");
        write_feed(&stable, vec![PackageRecord::new("x", "1.0")]);
        write_feed(&temp_dir.path().join("beta.yaml"), vec![]);

        let catalog = local_manager(&temp_dir).build_catalog();
        catalog.load().await;

        std::fs::remove_file(&stable).unwrap();
        assert!(catalog.refresh_repository("stable").await.is_err());
        assert_eq!(catalog.newest_package("x").unwrap().version, "1.0");
    }
}
