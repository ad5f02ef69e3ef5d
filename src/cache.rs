//! Session-scoped caches: the identity map of materialized objects, and the
//! existence cache that masks the store's eventually consistent query index.

use std::collections::HashMap;
use std::fmt::Write;

use tracing::debug;

use crate::filter::NormalizedFilter;
use crate::model::{KgObject, NodeType};

/// URI → last known state of the object.
#[derive(Debug, Default, Clone)]
pub struct ObjectCache {
    objects: HashMap<String, KgObject>,
}

impl ObjectCache {
    pub fn get(&self, uri: &str) -> Option<&KgObject> {
        self.objects.get(uri)
    }

    /// Upsert by id. Objects without an id are not cached.
    pub fn insert(&mut self, object: KgObject) -> bool {
        let Some(id) = object.id().map(str::to_string) else {
            return false;
        };
        debug!(target: "kg", %id, "caching object");
        self.objects.insert(id, object);
        true
    }

    pub fn remove(&mut self, uri: &str) -> Option<KgObject> {
        self.objects.remove(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.objects.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

/// Canonical form of a normalized filter: entries sorted by field name, list
/// values in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_filter(filter: &NormalizedFilter) -> CacheKey {
        let mut key = String::new();
        for (name, value) in filter {
            // serde_json renders compact, deterministic text for scalars and arrays
            let _ = write!(key, "{name}={value};");
        }
        CacheKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Node type → existence key → URI of the instance known to match.
#[derive(Debug, Default, Clone)]
pub struct SaveCache {
    by_type: HashMap<&'static str, HashMap<CacheKey, String>>,
}

impl SaveCache {
    pub fn get(&self, node_type: &NodeType, key: &CacheKey) -> Option<&str> {
        self.by_type
            .get(node_type.name)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    pub fn insert(&mut self, node_type: &'static NodeType, key: CacheKey, uri: impl Into<String>) {
        self.by_type
            .entry(node_type.name)
            .or_default()
            .insert(key, uri.into());
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_type.clear();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::filter::NormalizedFilter;
    use crate::model::KgObject;
    use crate::model::testing::{LICENSE, PERSON};

    use super::{CacheKey, ObjectCache, SaveCache};

    fn filter(entries: &[(&str, serde_json::Value)]) -> NormalizedFilter {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn key_ignores_insertion_order() {
        let a = filter(&[("name", json!("x")), ("alias", json!(["a", "b"]))]);
        let b = filter(&[("alias", json!(["a", "b"])), ("name", json!("x"))]);
        assert_eq!(CacheKey::from_filter(&a), CacheKey::from_filter(&b));
        let c = filter(&[("alias", json!(["b", "a"])), ("name", json!("x"))]);
        assert_ne!(CacheKey::from_filter(&a), CacheKey::from_filter(&c));
    }

    #[test]
    fn save_cache_is_per_type() {
        let key = CacheKey::from_filter(&filter(&[("name", json!("x"))]));
        let mut cache = SaveCache::default();
        cache.insert(&LICENSE, key.clone(), "https://kg.example/l1");
        assert_eq!(cache.get(&LICENSE, &key), Some("https://kg.example/l1"));
        assert_eq!(cache.get(&PERSON, &key), None);
    }

    #[test]
    fn objects_without_id_are_not_cached() {
        let mut cache = ObjectCache::default();
        assert!(!cache.insert(KgObject::new(&LICENSE)));
        assert!(cache.insert(KgObject::new(&LICENSE).with_id("https://kg.example/l1")));
        assert!(cache.contains("https://kg.example/l1"));
    }
}
