//! Keyed store with a no-overwrite conflict policy.

use std::collections::HashMap;

use crate::types::{McpError, McpResult};

/// An entry that can live in a [`KeyedStore`].
pub trait Keyed {
    /// Entry kind used in error messages (`tool`, `resource`, `prompt`).
    const KIND: &'static str;

    /// Unique key of this entry.
    fn key(&self) -> &str;
}

/// Map from key to entry.
///
/// Adding an entry whose key is already present fails with
/// [`McpError::DuplicateKey`] and leaves the existing entry untouched.
/// The store does no locking of its own; see [`super::Registries`].
#[derive(Debug)]
pub struct KeyedStore<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for KeyedStore<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Keyed + Clone> KeyedStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry; never overwrites.
    pub fn add(&mut self, entry: T) -> McpResult<()> {
        if self.entries.contains_key(entry.key()) {
            return Err(McpError::duplicate(T::KIND, entry.key()));
        }
        self.entries.insert(entry.key().to_string(), entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    /// Snapshot of all entries, order unspecified.
    pub fn list(&self) -> Vec<T> {
        self.entries.values().cloned().collect()
    }

    /// Remove and return an entry.
    pub fn remove(&mut self, key: &str) -> McpResult<T> {
        self.entries
            .remove(key)
            .ok_or_else(|| McpError::not_found(T::KIND, key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(&'static str, u32);

    impl Keyed for Entry {
        const KIND: &'static str = "entry";
        fn key(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn add_rejects_duplicates_and_keeps_first() {
        let mut store = KeyedStore::new();
        store.add(Entry("a", 1)).unwrap();
        let err = store.add(Entry("a", 2)).unwrap_err();
        assert!(matches!(err, McpError::DuplicateKey { kind: "entry", .. }));
        assert_eq!(store.get("a"), Some(&Entry("a", 1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_missing_is_not_found() {
        let mut store: KeyedStore<Entry> = KeyedStore::new();
        assert!(matches!(
            store.remove("ghost"),
            Err(McpError::NotFound { .. })
        ));
    }

    #[test]
    fn list_returns_every_entry() {
        let mut store = KeyedStore::new();
        store.add(Entry("a", 1)).unwrap();
        store.add(Entry("b", 2)).unwrap();
        let mut keys: Vec<_> = store.list().into_iter().map(|e| e.0).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
