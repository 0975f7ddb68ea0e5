//! Ordered indexes keyed by names.
//!
//! Registry runs see millions of package names, usernames and requirement keys.
//! Keys are stored once as boxed `str` (no spare capacity) in sorted order, so
//! iteration and output are deterministic.

use std::collections::{BTreeMap, BTreeSet};

/// Set of names seen so far.
#[derive(Debug, Default, Clone)]
pub struct NameIndex {
    keys: BTreeSet<Box<str>>,
}

impl NameIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key`, returning `true` if it was not present before.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Map from names to values.
#[derive(Debug, Clone)]
pub struct NameMap<V> {
    entries: BTreeMap<Box<str>, V>,
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> NameMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Stored key and value for `key`.
    #[must_use]
    pub fn get_key_value(&self, key: &str) -> Option<(&str, &V)> {
        self.entries.get_key_value(key).map(|(k, v)| (&**k, v))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Insert or replace the value for `key`, returning the previous value.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        if let Some(slot) = self.entries.get_mut(key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.insert(key.into(), value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_reports_first_sighting_only() {
        let mut index = NameIndex::new();
        assert!(index.insert("react"));
        assert!(!index.insert("react"));
        assert!(index.insert("preact"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_name_map_insert_replaces() {
        let mut map = NameMap::new();
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("a", 2), Some(1));
        assert_eq!(map.get("a"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_name_map_mutation_and_order() {
        let mut map = NameMap::new();
        map.insert("lodash\0~4.17.0", vec![2]);
        map.insert("lodash\0^4.0.0", vec![1]);
        map.insert("lodash.merge\0^4.0.0", vec![3]);

        map.get_mut("lodash\0^4.0.0").unwrap().push(9);

        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["lodash\0^4.0.0", "lodash\0~4.17.0", "lodash.merge\0^4.0.0"]);
        assert_eq!(map.get_key_value("lodash\0^4.0.0"), Some(("lodash\0^4.0.0", &vec![1, 9])));
    }
}
