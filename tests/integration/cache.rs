//! End-to-end cache behavior through the library API

use serial_test::serial;
use sourcecache::cache::{
    caching_enabled, entry_id, set_caching_enabled, CacheBackend, CacheManager, CachingSwitch,
};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

struct Setup {
    _temp: TempDir,
    data: PathBuf,
    cache_dir: PathBuf,
}

fn setup() -> Setup {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("sample.csv");
    std::fs::write(&data, "id,value\n1,2\n").unwrap();
    let cache_dir = temp.path().join("cache");
    Setup {
        _temp: temp,
        data,
        cache_dir,
    }
}

fn mtime(path: &std::path::Path) -> std::time::SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}

#[tokio::test]
async fn load_reuse_clear_reload() {
    let s = setup();
    let locator = s.data.to_str().unwrap();
    let manager =
        CacheManager::new(&s.cache_dir, CacheBackend::File).with_switch(CachingSwitch::new());

    let first = manager.load(locator).await.unwrap();
    let expected = s.cache_dir.join(entry_id(locator)).join("sample.csv");
    assert_eq!(first, vec![expected.clone()]);
    let t0 = manager.get_metadata(locator).await[0].created;
    let m0 = mtime(&expected);

    let second = manager.load(locator).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(mtime(&expected), m0);

    manager.clear_cache(locator).await.unwrap();
    assert!(!expected.exists());
    assert!(manager.get_metadata(locator).await.is_empty());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let third = manager.load(locator).await.unwrap();
    assert_eq!(third, first);
    let t1 = manager.get_metadata(locator).await[0].created;
    assert!(t1 > t0);
}

#[tokio::test]
async fn deleted_file_is_regenerated_later() {
    let s = setup();
    let locator = s.data.to_str().unwrap();
    let manager =
        CacheManager::new(&s.cache_dir, CacheBackend::File).with_switch(CachingSwitch::new());

    let path = manager.load(locator).await.unwrap().remove(0);
    let before = mtime(&path);
    std::fs::remove_file(&path).unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let again = manager.load(locator).await.unwrap();
    assert_eq!(again, vec![path.clone()]);
    assert!(mtime(&path) > before);
    assert_eq!(manager.get_metadata(locator).await.len(), 1);
}

#[tokio::test]
async fn metadata_records_exist_on_disk() {
    let s = setup();
    let locator = s.data.to_str().unwrap();
    let manager =
        CacheManager::new(&s.cache_dir, CacheBackend::File).with_switch(CachingSwitch::new());

    manager.load(locator).await.unwrap();
    for record in manager.get_metadata(locator).await {
        assert_eq!(record.original_path, locator);
        assert!(record.cache_path.exists());
    }
}

#[tokio::test]
async fn clear_all_removes_cache_dir() {
    let s = setup();
    let locator = s.data.to_str().unwrap();
    let manager =
        CacheManager::new(&s.cache_dir, CacheBackend::File).with_switch(CachingSwitch::new());

    manager.load(locator).await.unwrap();
    manager.clear_all().await.unwrap();
    assert!(!s.cache_dir.exists());
    assert!(manager.get_metadata(locator).await.is_empty());
}

#[tokio::test]
async fn two_caches_do_not_interfere() {
    let s = setup();
    let locator = s.data.to_str().unwrap();
    let switch = CachingSwitch::new();
    let a = CacheManager::new(s.cache_dir.join("a"), CacheBackend::File)
        .with_switch(switch.clone());
    let b = CacheManager::new(s.cache_dir.join("b"), CacheBackend::File).with_switch(switch);

    let pa = a.load(locator).await.unwrap();
    let pb = b.load(locator).await.unwrap();
    assert_ne!(pa, pb);

    a.clear_cache(locator).await.unwrap();
    assert!(!pa[0].exists());
    assert!(pb[0].exists());
    assert_eq!(b.get_metadata(locator).await.len(), 1);
}

#[tokio::test]
#[serial]
async fn global_switch_passthrough() {
    let s = setup();
    let locator = s.data.to_str().unwrap();
    let manager = CacheManager::new(&s.cache_dir, CacheBackend::File);

    set_caching_enabled(false);
    assert!(!caching_enabled());
    let passthrough = manager.load(locator).await;
    set_caching_enabled(true);

    assert_eq!(passthrough.unwrap(), vec![PathBuf::from(locator)]);
    assert!(!s.cache_dir.exists());

    let cached = manager.load(locator).await.unwrap();
    assert!(cached[0].starts_with(&s.cache_dir));
}
