//! Integration tests for sourcecache

mod cache;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn sourcecache() -> Command {
        cargo_bin_cmd!("sourcecache")
    }

    fn quoted(path: &Path) -> String {
        toml::Value::String(path.display().to_string()).to_string()
    }

    /// Temp dir with a data file, a config pointing the cache root into the
    /// temp dir, and a catalog with one file-cached source named `sample`
    struct Fixture {
        temp: TempDir,
        config: PathBuf,
        catalog: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let data = temp.path().join("sample.csv");
            std::fs::write(&data, "id,value\n1,2\n").unwrap();

            let config = temp.path().join("config.toml");
            std::fs::write(
                &config,
                format!("[cache]\nroot = {}\n", quoted(&temp.path().join("cache"))),
            )
            .unwrap();

            let catalog = temp.path().join("catalog.toml");
            std::fs::write(
                &catalog,
                format!(
                    "[sources.sample]\n\
                     driver = \"csv\"\n\
                     description = \"sample data\"\n\
                     args = {{ urlpath = {} }}\n\n\
                     [[sources.sample.cache]]\n\
                     type = \"file\"\n\
                     argkey = \"urlpath\"\n",
                    quoted(&data)
                ),
            )
            .unwrap();

            Self {
                temp,
                config,
                catalog,
            }
        }

        fn cmd(&self, args: &[&str]) -> Command {
            let mut cmd = sourcecache();
            cmd.env_remove("SOURCECACHE_DISABLE")
                .arg("--config")
                .arg(&self.config)
                .args(args);
            cmd
        }

        fn catalog(&self) -> &str {
            self.catalog.to_str().unwrap()
        }

        fn cache_root(&self) -> PathBuf {
            self.temp.path().join("cache")
        }
    }

    #[test]
    fn help_displays() {
        sourcecache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("local disk cache for data sources"));
    }

    #[test]
    fn version_displays() {
        sourcecache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("sourcecache"));
    }

    #[test]
    fn config_path() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn sources_lists_catalog() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["sources", fixture.catalog(), "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sample"));
    }

    #[test]
    fn load_materializes_into_cache_root() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["load", fixture.catalog(), "sample"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sample.csv"));

        let cache_dir = fixture.cache_root().join("sample-0");
        assert!(cache_dir.join("cache_metadata.json").is_file());
    }

    #[test]
    fn metadata_json_after_load() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["load", fixture.catalog(), "sample"])
            .assert()
            .success();

        fixture
            .cmd(&["metadata", fixture.catalog(), "sample", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"original_path\""))
            .stdout(predicate::str::contains("\"created\""));
    }

    #[test]
    fn metadata_empty_before_load() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["metadata", fixture.catalog(), "sample", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn clear_all_removes_cache_dir() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["load", fixture.catalog(), "sample"])
            .assert()
            .success();

        fixture
            .cmd(&["clear", fixture.catalog(), "sample", "--all"])
            .assert()
            .success();
        assert!(!fixture.cache_root().join("sample-0").exists());
    }

    #[test]
    fn clear_forgets_entries() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["load", fixture.catalog(), "sample"])
            .assert()
            .success();

        fixture
            .cmd(&["clear", fixture.catalog(), "sample"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 1 entry"));

        fixture
            .cmd(&["metadata", fixture.catalog(), "sample", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn no_cache_passes_through() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["--no-cache", "load", fixture.catalog(), "sample"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Caching disabled"));

        assert!(!fixture.cache_root().exists());
    }

    #[test]
    fn missing_source_fails_with_hint() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["load", fixture.catalog(), "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Source not found"))
            .stderr(predicate::str::contains("sourcecache sources"));
    }

    #[test]
    fn remote_catalog_rejected() {
        let fixture = Fixture::new();
        fixture
            .cmd(&["load", "tcp://localhost:5000", "sample"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Remote catalogs are not supported"));
    }
}
