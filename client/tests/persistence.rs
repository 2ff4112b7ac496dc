use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use torwell_client::caches::{COUNTRY_STORAGE_KEY, SUMMARY_STORAGE_KEY, TIMELINE_STORAGE_KEY};
use torwell_client::config::CachesConfig;
use torwell_client::{ClientCaches, ConnectionEvent, Error, FileStore, MemoryStore, SnapshotStore};

/// A store whose every operation fails.
#[derive(Debug, Default)]
struct FailingStore {
  reads: AtomicUsize,
  writes: AtomicUsize,
  removals: AtomicUsize,
}

fn unavailable(key: &str) -> Error {
  Error::Storage {
    key: key.to_string(),
    source: io::Error::new(io::ErrorKind::PermissionDenied, "storage unavailable"),
  }
}

impl SnapshotStore for FailingStore {
  fn get_item(&self, key: &str) -> torwell_client::Result<Option<String>> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    Err(unavailable(key))
  }

  fn set_item(&self, key: &str, _value: &str) -> torwell_client::Result<()> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    Err(unavailable(key))
  }

  fn remove_item(&self, key: &str) -> torwell_client::Result<()> {
    self.removals.fetch_add(1, Ordering::SeqCst);
    Err(unavailable(key))
  }
}

fn sample_timeline() -> Vec<ConnectionEvent> {
  vec![ConnectionEvent {
    timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    status: "CONNECTED".to_string(),
    message: Some("bootstrapped".to_string()),
    detail: None,
    retry_count: Some(0),
    latency_ms: Some(120),
    memory_bytes: None,
    circuit_count: Some(3),
  }]
}

fn open(store: Arc<dyn SnapshotStore>) -> ClientCaches {
  ClientCaches::open(&CachesConfig::default(), Duration::from_secs(5), store).unwrap()
}

#[tokio::test]
async fn test_timeline_survives_restart() {
  let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());

  let first = open(store.clone());
  first.cache_connection_timeline("timeline:default", sample_timeline(), None);
  assert!(store.get_item(TIMELINE_STORAGE_KEY).unwrap().is_some());

  let second = open(store.clone());
  assert_eq!(second.timeline.get("timeline:default"), None);

  second.warmup().await;
  assert_eq!(second.timeline.get("timeline:default"), Some(sample_timeline()));
  assert_eq!(second.timeline.stats().warmups, 1);
}

#[tokio::test]
async fn test_invalidation_leaves_country_cache_alone() {
  let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
  let caches = open(store.clone());

  caches.cache_connection_timeline("timeline:default", sample_timeline(), None);
  caches.cache_country_lookup("1.1.1.1", "AU".to_string(), None);
  assert!(store.get_item(COUNTRY_STORAGE_KEY).unwrap().is_some());

  caches.invalidate_connection_caches();

  assert_eq!(caches.timeline.get("timeline:default"), None);
  assert_eq!(store.get_item(TIMELINE_STORAGE_KEY).unwrap(), None);
  assert_eq!(store.get_item(SUMMARY_STORAGE_KEY).unwrap(), None);
  assert_eq!(caches.country.get("1.1.1.1").as_deref(), Some("AU"));
  assert!(store.get_item(COUNTRY_STORAGE_KEY).unwrap().is_some());
}

#[tokio::test]
async fn test_reset_geo_cache_erases_snapshot() {
  let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
  let caches = open(store.clone());

  caches.cache_country_lookup("9.9.9.9", "CH".to_string(), None);
  caches.reset_geo_cache();

  assert_eq!(caches.country.get("9.9.9.9"), None);
  assert_eq!(store.get_item(COUNTRY_STORAGE_KEY).unwrap(), None);

  let reopened = open(store);
  reopened.warmup().await;
  assert_eq!(reopened.country.get("9.9.9.9"), None);
}

#[tokio::test]
async fn test_malformed_snapshot_is_ignored() {
  let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
  store.set_item(COUNTRY_STORAGE_KEY, "{ not json").unwrap();

  let caches = open(store);
  caches.warmup().await;

  assert!(caches.country.cache().is_empty());
  assert_eq!(caches.country.stats().warmups, 0);
}

#[tokio::test]
async fn test_hydrated_entries_expire_with_rehydrate_ttl() {
  let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
  open(store.clone()).cache_country_lookup("8.8.8.8", "US".to_string(), None);

  let caches = ClientCaches::open(&CachesConfig::default(), Duration::from_millis(30), store).unwrap();
  caches.warmup().await;
  assert_eq!(caches.country.get("8.8.8.8").as_deref(), Some("US"));

  tokio::time::sleep(Duration::from_millis(80)).await;
  assert_eq!(caches.country.get("8.8.8.8"), None);
}

#[tokio::test]
async fn test_file_store_persists_across_instances() {
  let dir = tempfile::tempdir().unwrap();

  {
    let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let caches = open(store);
    caches.cache_country_lookup("1.0.0.1", "AU".to_string(), Some(Duration::from_secs(600)));
  }
  assert!(dir.path().join(format!("{}.json", COUNTRY_STORAGE_KEY)).is_file());

  let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::open(dir.path()).unwrap());
  let caches = open(store);
  caches.warmup().await;
  assert_eq!(caches.country.get("1.0.0.1").as_deref(), Some("AU"));
}

#[tokio::test]
async fn test_failing_store_never_breaks_the_caches() {
  let store = Arc::new(FailingStore::default());
  let caches = open(store.clone());
  // One read per cache while planning warm-up.
  assert_eq!(store.reads.load(Ordering::SeqCst), 3);

  caches.warmup().await;
  assert!(caches.timeline.cache().is_empty());
  assert!(caches.country.cache().is_empty());

  assert_eq!(caches.cache_country_lookup("1.1.1.1", "AU".to_string(), None), "AU");
  assert_eq!(caches.country.get("1.1.1.1").as_deref(), Some("AU"));
  assert_eq!(store.writes.load(Ordering::SeqCst), 1);

  caches.cache_connection_timeline("timeline:default", sample_timeline(), None);
  caches.invalidate_connection_caches();
  assert_eq!(caches.timeline.get("timeline:default"), None);
  assert_eq!(store.removals.load(Ordering::SeqCst), 2);

  // Memory state is unaffected by the failed writes.
  assert_eq!(caches.country.get("1.1.1.1").as_deref(), Some("AU"));
}
