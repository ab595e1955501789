//! Tag-based response cache on top of `moka`.
//!
//! Read endpoints store rendered responses under a key and a set of tags;
//! mutations drop every entry carrying an affected tag. `moka` owns expiry
//! (fixed TTL) and size-bounded eviction; this module only keeps the
//! tag → keys index in step with it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moka::notification::RemovalCause;
use moka::sync::Cache;

use salonbook_core::{OwnerId, RecordId};

/// Tag covering every cached read of `resource` for `owner`.
pub fn resource_tag(resource: &str, owner: OwnerId) -> String {
    format!("{resource}:{owner}")
}

/// Tag covering cached reads of one record.
pub fn record_tag(resource: &str, owner: OwnerId, id: RecordId) -> String {
    format!("{resource}:{owner}:{id}")
}

type TagIndex = Arc<Mutex<HashMap<String, HashSet<String>>>>;

#[derive(Clone)]
struct Tagged<V> {
    value: V,
    tags: Arc<[String]>,
}

fn unlink(index: &TagIndex, key: &str, tags: &[String]) {
    let Ok(mut index) = index.lock() else {
        return;
    };
    for tag in tags {
        if let Some(keys) = index.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                index.remove(tag);
            }
        }
    }
}

pub struct TagCache<V> {
    entries: Cache<String, Tagged<V>>,
    by_tag: TagIndex,
    enabled: bool,
}

impl<V: Clone + Send + Sync + 'static> TagCache<V> {
    /// `capacity == 0` or a zero TTL gives a cache that never stores anything.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let by_tag: TagIndex = Arc::default();
        let index = by_tag.clone();
        let entries = Cache::builder()
            .max_capacity(capacity as u64)
            .time_to_live(ttl)
            .eviction_listener(move |key: Arc<String>, entry: Tagged<V>, cause: RemovalCause| {
                // A replaced entry's key was just re-linked by `put`.
                if !matches!(cause, RemovalCause::Replaced) {
                    unlink(&index, &key, &entry.tags);
                }
            })
            .build();
        Self {
            entries,
            by_tag,
            enabled: capacity > 0 && !ttl.is_zero(),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value)
    }

    pub fn put(&self, key: impl Into<String>, tags: Vec<String>, value: V) {
        if !self.enabled {
            return;
        }
        let key = key.into();
        // The index lock is released before touching `entries`: the eviction
        // listener takes it too.
        if let Ok(mut index) = self.by_tag.lock() {
            for tag in &tags {
                index.entry(tag.clone()).or_default().insert(key.clone());
            }
        }
        self.entries.insert(key, Tagged { value, tags: tags.into() });
    }

    /// Drop every entry carrying `tag`; returns how many keys were linked to it.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let keys = match self.by_tag.lock() {
            Ok(mut index) => index.remove(tag).unwrap_or_default(),
            Err(_) => return 0,
        };
        for key in &keys {
            self.entries.invalidate(key);
        }
        if !keys.is_empty() {
            tracing::debug!(tag, removed = keys.len(), "cache tag invalidated");
        }
        keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> TagCache<&'static str> {
        TagCache::new(Duration::from_secs(30), capacity)
    }

    #[test]
    fn tags_have_expected_shape() {
        let owner = OwnerId::new();
        let id = RecordId::new();
        assert_eq!(resource_tag("customers", owner), format!("customers:{owner}"));
        assert_eq!(record_tag("customers", owner, id), format!("customers:{owner}:{id}"));
    }

    #[test]
    fn invalidate_tag_removes_tagged_entries_only() {
        let c = cache(10);
        let a = OwnerId::new();
        let b = OwnerId::new();
        c.put("list-a", vec![resource_tag("customers", a)], "A");
        c.put("list-b", vec![resource_tag("customers", b)], "B");
        c.put("svc-a", vec![resource_tag("services", a)], "S");

        assert_eq!(c.invalidate_tag(&resource_tag("customers", a)), 1);
        assert_eq!(c.get("list-a"), None);
        assert_eq!(c.get("list-b"), Some("B"));
        assert_eq!(c.get("svc-a"), Some("S"));
        assert_eq!(c.invalidate_tag("unknown"), 0);
    }

    #[test]
    fn invalidating_one_tag_unlinks_the_entry_from_its_other_tags() {
        let c = cache(10);
        c.put("detail", vec!["record".into(), "list".into()], "D");
        assert_eq!(c.invalidate_tag("record"), 1);
        c.entries.run_pending_tasks();
        assert_eq!(c.invalidate_tag("list"), 0);
    }

    #[test]
    fn replacing_a_key_keeps_it_invalidatable() {
        let c = cache(10);
        c.put("k", vec!["t".into()], "old");
        c.put("k", vec!["t".into()], "new");
        c.entries.run_pending_tasks();
        assert_eq!(c.get("k"), Some("new"));
        assert_eq!(c.invalidate_tag("t"), 1);
        assert_eq!(c.get("k"), None);
    }

    #[test]
    fn entries_expire() {
        let c = TagCache::new(Duration::from_millis(50), 10);
        c.put("k", vec!["t".into()], "v");
        assert_eq!(c.get("k"), Some("v"));
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(c.get("k"), None);
    }

    #[test]
    fn capacity_bounds_the_entry_count() {
        let c = TagCache::new(Duration::from_secs(30), 5);
        for i in 0..50 {
            c.put(format!("k{i}"), vec!["bulk".into()], i);
        }
        c.entries.run_pending_tasks();
        assert!(c.entries.entry_count() <= 5);
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let c = cache(0);
        c.put("k", vec![], "v");
        assert_eq!(c.get("k"), None);
    }
}
