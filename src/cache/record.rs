use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted shape of one cache: a last-refresh timestamp plus a mapping
/// from identifier to value.
///
/// A key mapped to `None` is the null sentinel: "previously attempted and
/// failed". A key absent from the map has never been attempted. The staleness
/// policy treats both the same; the populator skip rule does not (it skips
/// anything already present, null included).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: Deserialize<'de>"))]
pub struct CacheRecord<V> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub values: BTreeMap<String, Option<V>>,
}

impl<V> Default for CacheRecord<V> {
    fn default() -> Self {
        Self {
            last_updated: None,
            values: BTreeMap::new(),
        }
    }
}

impl<V> CacheRecord<V> {
    /// The value for `key`, if one was ever successfully fetched.
    pub fn value(&self, key: &str) -> Option<&V> {
        self.values.get(key).and_then(|v| v.as_ref())
    }

    /// Whether `key` has been attempted at all (successfully or not).
    pub fn is_attempted(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Record a successful fetch. Always overwrites.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.values.insert(key.into(), Some(value));
    }

    /// Record a failed fetch. A prior non-null value is never clobbered;
    /// the null sentinel is only written where nothing better exists.
    pub fn record_failure(&mut self, key: impl Into<String>) {
        self.values.entry(key.into()).or_insert(None);
    }

    /// Advance `last_updated` to `now`, keeping it monotonic non-decreasing
    /// even if the caller's clock steps backwards between saves.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = Some(match self.last_updated {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }
}
