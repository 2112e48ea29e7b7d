//! Named access to already-extracted asset bytes

use std::collections::HashMap;

/// Anything that can hand out asset bytes by logical file name.
///
/// Names are matched case-insensitively ("clear1.tem" == "CLEAR1.TEM").
pub trait AssetSource {
    fn read(&self, name: &str) -> Option<&[u8]>;

    fn contains(&self, name: &str) -> bool {
        self.read(name).is_some()
    }
}

/// In-memory asset table
#[derive(Debug, Default, Clone)]
pub struct AssetStore {
    files: HashMap<String, Vec<u8>>,
}

#[inline]
fn normalize(name: &str) -> String {
    name.to_ascii_uppercase()
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset, returning the previous bytes if any
    pub fn insert(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.files.insert(normalize(name), data.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetSource for AssetStore {
    fn read(&self, name: &str) -> Option<&[u8]> {
        self.files.get(&normalize(name)).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut store = AssetStore::new();
        store.insert("clear1.tmp", vec![1, 2, 3]);
        assert_eq!(store.read("CLEAR1.TMP"), Some(&[1u8, 2, 3][..]));
        assert!(store.contains("Clear1.Tmp"));
        assert!(!store.contains("W1.TMP"));
    }

    #[test]
    fn test_replace_and_remove() {
        let mut store = AssetStore::new();
        assert!(store.insert("A", vec![1]).is_none());
        assert_eq!(store.insert("a", vec![2]), Some(vec![1]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove("A"), Some(vec![2]));
        assert!(store.is_empty());
    }
}
