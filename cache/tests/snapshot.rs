use torwell_cache::{AdaptiveCache, CacheBuilder, EvictionPolicy, ManualClock, SetOptions, SnapshotEntry};

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn cache_at(clock: &ManualClock, policy: EvictionPolicy) -> AdaptiveCache<String, String> {
  CacheBuilder::new("snapshot")
    .max_entries(8)
    .eviction_policy(policy)
    .clock(Arc::new(clock.clone()))
    .build()
    .unwrap()
}

#[test]
fn test_snapshot_skips_expired_and_keeps_order() {
  let clock = ManualClock::new(100);
  let cache = cache_at(&clock, EvictionPolicy::Lru);

  cache.set("a".into(), "alpha".into(), SetOptions::new());
  cache.set("b".into(), "beta".into(), SetOptions::new().ttl(Duration::from_millis(10)));
  cache.set("c".into(), "gamma".into(), SetOptions::new().cost(3).tags(["geoip"]));
  clock.advance(Duration::from_millis(10));

  let snapshot = cache.snapshot();
  let keys: Vec<_> = snapshot.iter().map(|e| e.key.as_str()).collect();
  assert_eq!(keys, vec!["a", "c"]);

  let gamma = &snapshot[1];
  assert_eq!(gamma.cost, 3);
  assert_eq!(gamma.tags, Some(vec!["geoip".to_string()]));
  assert_eq!(gamma.expires_at, None);

  // Taking a snapshot is read-only.
  let stats = cache.stats();
  assert_eq!((stats.hits, stats.misses), (0, 0));
  assert_eq!(cache.len(), 3, "expired entry is still stored until touched");
}

#[test]
fn test_restore_into_fresh_cache() {
  let clock = ManualClock::new(0);
  let source = cache_at(&clock, EvictionPolicy::Lfu);
  source.set("de".into(), "Germany".into(), SetOptions::new().ttl(Duration::from_secs(60)).tags(["geoip"]));
  source.set("fr".into(), "France".into(), SetOptions::new());
  clock.advance(Duration::from_secs(20));
  let snapshot = source.snapshot();

  let target = cache_at(&clock, EvictionPolicy::Lfu);
  assert_eq!(target.restore(snapshot), 2);
  assert_eq!(target.get(&"de".to_string()), Some("Germany".to_string()));
  assert_eq!(target.get(&"fr".to_string()), Some("France".to_string()));

  // "de" keeps only its remaining 40 seconds.
  clock.advance(Duration::from_secs(41));
  assert!(!target.has(&"de".to_string()));
  assert!(target.has(&"fr".to_string()));
  assert_eq!(target.invalidate_by_tag("geoip"), 0);
}

#[test]
fn test_restore_keeps_entries_without_expiry_unbounded() {
  let clock = ManualClock::new(0);
  let source = cache_at(&clock, EvictionPolicy::Lru);
  source.set("fr".into(), "France".into(), SetOptions::new());

  let target: AdaptiveCache<String, String> = CacheBuilder::new("short-lived")
    .max_entries(8)
    .default_ttl(Duration::from_secs(1))
    .clock(Arc::new(clock.clone()))
    .build()
    .unwrap();
  assert_eq!(target.restore(source.snapshot()), 1);

  clock.advance(Duration::from_secs(3600));
  assert_eq!(target.get(&"fr".to_string()), Some("France".to_string()));
  assert_eq!(target.snapshot()[0].expires_at, None);

  // Plain writes still pick up the default.
  target.set("de".into(), "Germany".into(), SetOptions::new());
  clock.advance(Duration::from_secs(2));
  assert!(!target.has(&"de".to_string()));
}

#[test]
fn test_restore_skips_entries_expired_since_capture() {
  let clock = ManualClock::new(0);
  let cache = cache_at(&clock, EvictionPolicy::Fifo);
  let stale = SnapshotEntry {
    key: "stale".to_string(),
    value: "old".to_string(),
    expires_at: Some(50),
    frequency: 4,
    last_accessed: 10,
    cost: 1,
    tags: None,
  };
  let live = SnapshotEntry {
    key: "live".to_string(),
    expires_at: Some(500),
    ..stale.clone()
  };

  clock.set(50);
  assert_eq!(cache.restore(vec![stale, live]), 1);
  assert!(cache.has(&"live".to_string()));
  assert!(!cache.has(&"stale".to_string()));
}

#[test]
fn test_snapshot_entries_serialize_camel_case() {
  let clock = ManualClock::new(0);
  let cache = cache_at(&clock, EvictionPolicy::Lru);
  cache.set("k".into(), "v".into(), SetOptions::new().ttl(Duration::from_millis(250)).cost(2));

  let json = serde_json::to_value(cache.snapshot()).unwrap();
  assert_eq!(
    json,
    serde_json::json!([{
      "key": "k",
      "value": "v",
      "expiresAt": 250,
      "frequency": 0,
      "lastAccessed": 0,
      "cost": 2,
      "tags": null,
    }])
  );

  let back: Vec<SnapshotEntry<String, String>> = serde_json::from_value(json).unwrap();
  assert_eq!(back, cache.snapshot());
}
