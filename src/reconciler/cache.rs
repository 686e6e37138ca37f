//! Entity name → canonical id memo for one run.
//!
//! First resolution wins: later writes for a cached name are ignored, and
//! nothing is evicted when the entity is deleted at the end of the run.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LookupCache {
    ids: HashMap<String, String>,
}

impl LookupCache {
    /// Cache `name → id` unless `name` is already resolved.
    /// Returns `true` if the entry was added.
    pub fn insert_if_absent(&mut self, name: &str, id: &str) -> bool {
        if self.ids.contains_key(name) {
            return false;
        }
        self.ids.insert(name.to_string(), id.to_string());
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_resolution_wins() {
        let mut cache = LookupCache::default();
        assert!(cache.insert_if_absent("bot1", "id-1"));
        assert!(!cache.insert_if_absent("bot1", "id-2"));
        assert_eq!(cache.get("bot1"), Some("id-1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss() {
        let cache = LookupCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.get("bot1"), None);
    }
}
