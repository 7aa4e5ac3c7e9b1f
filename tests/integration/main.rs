//! Integration tests for pixstash

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Source images, cache and export directories, and a config file pointing at them
struct Fixture {
    _temp: TempDir,
    sources: PathBuf,
    cache_dir: PathBuf,
    export_dir: PathBuf,
    config_path: PathBuf,
}

impl Fixture {
    fn new(count: usize) -> Self {
        Self::with_missing(count, &[])
    }

    /// `missing` indices are configured but never written
    fn with_missing(count: usize, missing: &[usize]) -> Self {
        let temp = TempDir::new().unwrap();
        let sources = temp.path().join("sources");
        let cache_dir = temp.path().join("cache");
        let export_dir = temp.path().join("export");
        fs::create_dir_all(&sources).unwrap();

        let urls: Vec<String> = (0..count)
            .map(|i| {
                let path = sources.join(format!("src{}.jpg", i));
                if !missing.contains(&i) {
                    fs::write(&path, format!("image {}", i)).unwrap();
                }
                format!("'file://{}'", path.display())
            })
            .collect();

        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            format!(
                "[cache]\nsources = [{}]\ndir = '{}'\n\n[export]\ndir = '{}'\n",
                urls.join(", "),
                cache_dir.display(),
                export_dir.display()
            ),
        )
        .unwrap();

        Self {
            _temp: temp,
            sources,
            cache_dir,
            export_dir,
            config_path,
        }
    }

    fn cached(&self, index: usize) -> PathBuf {
        self.cache_dir.join(format!("image_{}.jpg", index))
    }

    fn exported(&self, index: usize) -> PathBuf {
        self.export_dir.join(format!("image_{}.jpg", index))
    }

    async fn config(&self) -> pixstash::config::Config {
        pixstash::config::ConfigManager::with_path(self.config_path.clone())
            .load()
            .await
            .unwrap()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn pixstash() -> Command {
        let mut cmd = cargo_bin_cmd!("pixstash");
        cmd.env("PIXSTASH_PLAIN", "1").env_remove("PIXSTASH_CONFIG");
        cmd
    }

    fn with_config(fixture: &Fixture) -> Command {
        let mut cmd = pixstash();
        cmd.arg("--config").arg(&fixture.config_path);
        cmd
    }

    #[test]
    fn help_displays() {
        pixstash()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Local cache manager for remote media"));
    }

    #[test]
    fn version_displays() {
        pixstash()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pixstash"));
    }

    #[test]
    fn config_path() {
        let fixture = Fixture::new(1);
        with_config(&fixture)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let fixture = Fixture::new(1);
        with_config(&fixture)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("timeout_secs = 30"));
    }

    #[test]
    fn config_set_persists() {
        let fixture = Fixture::new(1);
        with_config(&fixture)
            .args(["config", "set", "fetch.timeout_secs", "7"])
            .assert()
            .success();

        with_config(&fixture)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("timeout_secs = 7"));
    }

    #[test]
    fn config_set_unknown_key() {
        let fixture = Fixture::new(1);
        with_config(&fixture)
            .args(["config", "set", "cache.colour", "red"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn populate_fetches_then_reports_cached() {
        let fixture = Fixture::new(3);

        with_config(&fixture)
            .args(["populate", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0\tfetched"))
            .stdout(predicate::str::contains("2\tfetched"));
        assert_eq!(read(&fixture.cached(2)), "image 2");

        with_config(&fixture)
            .args(["populate", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0\tcached"))
            .stdout(predicate::str::contains("fetched").not());
    }

    #[test]
    fn populate_json() {
        let fixture = Fixture::new(2);
        let output = with_config(&fixture)
            .args(["populate", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["status"], "fetched");
        assert!(entries[1]["path"].as_str().unwrap().ends_with("image_1.jpg"));
    }

    #[test]
    fn populate_tolerates_one_missing_source() {
        let fixture = Fixture::with_missing(3, &[1]);
        with_config(&fixture)
            .args(["populate", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1\tfailed"))
            .stdout(predicate::str::contains("2\tfetched"));
    }

    #[test]
    fn populate_fails_when_every_source_is_missing() {
        let fixture = Fixture::with_missing(2, &[0, 1]);
        with_config(&fixture)
            .args(["populate", "--format", "plain"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("All 2 populate operations failed"));
    }

    #[test]
    fn export_out_of_range() {
        let fixture = Fixture::new(3);
        with_config(&fixture)
            .args(["export", "5"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("out of range"));
        assert!(!fixture.cached(0).exists());
    }

    #[test]
    fn export_one() {
        let fixture = Fixture::new(3);
        with_config(&fixture)
            .args(["export", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("image_1.jpg"));
        assert_eq!(read(&fixture.exported(1)), "image 1");
        assert!(!fixture.exported(0).exists());
    }

    #[test]
    fn export_failed_entry() {
        let fixture = Fixture::with_missing(2, &[1]);
        with_config(&fixture)
            .args(["export", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not resolved"));
    }

    #[test]
    fn export_all_to_dest() {
        let fixture = Fixture::new(3);
        let dest = fixture.sources.join("picked");
        with_config(&fixture)
            .args(["export", "--all", "--dest"])
            .arg(&dest)
            .assert()
            .success();

        for i in 0..3 {
            assert_eq!(read(&dest.join(format!("image_{}.jpg", i))), format!("image {}", i));
        }
        assert!(!fixture.export_dir.exists());
    }

    #[test]
    fn clear_refetches() {
        let fixture = Fixture::new(2);
        with_config(&fixture).arg("populate").assert().success();
        fs::write(fixture.cached(0), "stale").unwrap();

        with_config(&fixture)
            .args(["clear", "--yes", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0\tfetched"))
            .stdout(predicate::str::contains("1\tfetched"));
        assert_eq!(read(&fixture.cached(0)), "image 0");
    }

    #[test]
    fn clear_without_refetch_deletes() {
        let fixture = Fixture::new(2);
        with_config(&fixture).arg("populate").assert().success();
        assert!(fixture.cached(1).exists());

        with_config(&fixture)
            .args(["clear", "--yes", "--no-refetch"])
            .assert()
            .success();
        assert!(!fixture.cached(0).exists());
        assert!(!fixture.cached(1).exists());
    }

    #[test]
    fn clear_aborts_without_confirmation() {
        let fixture = Fixture::new(1);
        with_config(&fixture).arg("populate").assert().success();

        with_config(&fixture)
            .args(["clear", "--no-refetch"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Aborted"));
        assert!(fixture.cached(0).exists());
    }
}

mod library_tests {
    use super::*;
    use async_trait::async_trait;
    use pixstash::cache::{
        CacheCoordinator, CacheKey, CacheStore, CoordinatorOptions, EntryStatus, Fetcher,
    };
    use pixstash::error::{ErrorKind, StashError, StashResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct StubFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, key: &CacheKey, dest: &Path) -> StashResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, key.as_str())
                .await
                .map_err(|e| StashError::io("writing stub", e))?;
            Ok(key.as_str().len() as u64)
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn keys(count: usize) -> Vec<CacheKey> {
        (0..count)
            .map(|i| CacheKey::parse(&format!("https://img.test/{}.jpg", i)).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn populate_clear_export_scenario() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(StubFetcher::default());
        let coordinator = CacheCoordinator::new(
            keys(3),
            CacheStore::new(fetcher.clone()),
            CoordinatorOptions::new(temp.path().join("cache"), temp.path().join("out")),
        )
        .unwrap();

        let first = coordinator.populate_all().await.unwrap();
        assert_eq!(first.statuses(), vec![EntryStatus::Fetched; 3]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        let second = coordinator.populate_all().await.unwrap();
        assert_eq!(second.statuses(), vec![EntryStatus::Cached; 3]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        let rebuilt = coordinator.clear_and_repopulate().await.unwrap();
        assert_eq!(rebuilt.statuses(), vec![EntryStatus::Fetched; 3]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 6);

        let err = coordinator.export_one(5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let exported = coordinator.export_one(2).await.unwrap();
        assert_eq!(read(&exported), "https://img.test/2.jpg");
    }

    #[tokio::test]
    async fn from_config_reads_file_sources() {
        let fixture = Fixture::new(2);
        let mut config = fixture.config().await;
        config.cache.clear_on_exit = true;

        let coordinator = CacheCoordinator::from_config(&config).unwrap();
        let snapshot = coordinator.populate_all().await.unwrap();

        assert_eq!(snapshot.statuses(), vec![EntryStatus::Fetched; 2]);
        assert_eq!(read(&fixture.cached(1)), "image 1");

        let report = coordinator.shutdown().await;
        assert_eq!(report.removed, 2);
        assert!(!fixture.cached(0).exists());
        assert!(fixture.sources.join("src0.jpg").exists());
    }

    #[tokio::test]
    async fn subscriber_sees_settled_snapshot() {
        let temp = TempDir::new().unwrap();
        let coordinator = CacheCoordinator::new(
            keys(2),
            CacheStore::new(Arc::new(StubFetcher::default())),
            CoordinatorOptions::new(temp.path().join("cache"), temp.path().join("out")),
        )
        .unwrap();
        let updates = coordinator.subscribe();

        coordinator.populate_all().await.unwrap();

        assert!(updates.borrow().is_settled());
        assert_eq!(updates.borrow().count(EntryStatus::Fetched), 2);
    }
}
