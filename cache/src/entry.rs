use crate::time::millis;

use std::time::Duration;

/// A container for a value in the cache, holding all necessary metadata.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
  pub(crate) value: V,
  /// Absolute expiry in clock milliseconds. `None` means the entry never
  /// expires by time.
  pub(crate) expires_at: Option<u64>,
  /// Number of successful reads since the entry was stored.
  pub(crate) frequency: u64,
  pub(crate) last_accessed: u64,
  /// Always at least one.
  pub(crate) cost: u64,
  pub(crate) tags: Option<Vec<String>>,
}

impl<V> CacheEntry<V> {
  /// Creates a fresh entry stored at `now`.
  ///
  /// A zero TTL is treated like no TTL at all.
  pub(crate) fn new(
    value: V,
    now: u64,
    ttl: Option<Duration>,
    cost: u64,
    tags: Option<Vec<String>>,
  ) -> Self {
    let expires_at = ttl
      .filter(|ttl| !ttl.is_zero())
      .map(|ttl| now.saturating_add(millis(ttl)));

    Self {
      value,
      expires_at,
      frequency: 0,
      last_accessed: now,
      cost: cost.max(1),
      tags,
    }
  }

  #[inline]
  pub(crate) fn is_expired(&self, now: u64) -> bool {
    matches!(self.expires_at, Some(expires_at) if expires_at <= now)
  }

  /// Records a successful read.
  #[inline]
  pub(crate) fn touch(&mut self, now: u64) {
    self.frequency = self.frequency.saturating_add(1);
    self.last_accessed = now;
  }

  #[inline]
  pub(crate) fn has_tag(&self, tag: &str) -> bool {
    self
      .tags
      .as_ref()
      .is_some_and(|tags| tags.iter().any(|t| t == tag))
  }
}

/// Trims, drops blank tags and deduplicates while keeping first-seen order.
/// An empty result collapses to `None`.
pub(crate) fn normalize_tags<I, S>(tags: I) -> Option<Vec<String>>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut normalized: Vec<String> = Vec::new();
  for tag in tags {
    let tag = tag.as_ref().trim();
    if tag.is_empty() || normalized.iter().any(|t| t == tag) {
      continue;
    }
    normalized.push(tag.to_owned());
  }

  if normalized.is_empty() {
    None
  } else {
    Some(normalized)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tags_are_trimmed_and_deduplicated() {
    let tags = normalize_tags([" geoip", "geoip ", "", "  ", "connection"]);
    assert_eq!(tags, Some(vec!["geoip".to_string(), "connection".to_string()]));
  }

  #[test]
  fn empty_tags_collapse_to_none() {
    assert_eq!(normalize_tags(Vec::<String>::new()), None);
    assert_eq!(normalize_tags(["   "]), None);
  }

  #[test]
  fn zero_ttl_never_expires() {
    let entry = CacheEntry::new(1, 100, Some(Duration::ZERO), 1, None);
    assert_eq!(entry.expires_at, None);
    assert!(!entry.is_expired(u64::MAX));
  }

  #[test]
  fn huge_ttl_saturates() {
    let entry = CacheEntry::new(1, 100, Some(Duration::MAX), 1, None);
    assert_eq!(entry.expires_at, Some(u64::MAX));
    assert!(!entry.is_expired(u64::MAX - 1));
  }

  #[test]
  fn expiry_is_inclusive() {
    let entry = CacheEntry::new(1, 100, Some(Duration::from_millis(50)), 0, None);
    assert_eq!(entry.cost, 1, "cost is clamped to at least one");
    assert!(!entry.is_expired(149));
    assert!(entry.is_expired(150));
  }
}
