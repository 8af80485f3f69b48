//! Metadata records extracted from catalogue pages
//!
//! A [`MetadataCollector`] accumulates every distinct value seen for each key
//! while a page is parsed; [`Metadata`] is the flattened, single-value-per-key
//! record handed back to callers.

use std::fmt;

/// Joins the distinct values recorded for one key.
pub const MULTIVALUE_SEPARATOR: &str = " === ";

/// Joins text fragments gathered inside one value region.
pub const MULTIDATA_SEPARATOR: &str = " / ";

/// Key used when a value shows up before any key was ever seen.
pub const EMPTY_KEY_PLACEHOLDER: &str = "[vacío]";

/// Trailing character stripped from key text ("Title:" -> "Title").
pub const KEY_TERMINATOR: char = ':';

/// Ordered key/value record, one value per key, keys never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Value stored for `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, String)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            if key.is_empty() {
                continue;
            }
            match metadata.entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => metadata.entries.push((key, value)),
            }
        }
        metadata
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}

/// Ordered multimap from key to the distinct values observed for it.
///
/// Insertion order is preserved both for keys and for the values of each key;
/// recording a value already present for a key is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MetadataCollector {
    entries: Vec<(String, Vec<String>)>,
}

impl MetadataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` under `key`. Returns `false` for an exact duplicate.
    pub fn record(&mut self, key: &str, value: &str) -> bool {
        let values = match self.entries.iter().position(|(k, _)| k == key) {
            Some(index) => &mut self.entries[index].1,
            None => {
                self.entries.push((key.to_owned(), Vec::new()));
                let last = self.entries.len() - 1;
                &mut self.entries[last].1
            }
        };
        if values.iter().any(|v| v == value) {
            return false;
        }
        values.push(value.to_owned());
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Flatten into a [`Metadata`] record joining values with [`MULTIVALUE_SEPARATOR`]
    pub fn to_metadata(&self) -> Metadata {
        self.entries
            .iter()
            .map(|(key, values)| (key.clone(), values.join(MULTIVALUE_SEPARATOR)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_keeps_first_seen_order_and_skips_duplicates() {
        let mut collector = MetadataCollector::new();
        assert!(collector.record("Autor", "Cervantes"));
        assert!(collector.record("Título", "Don Quijote"));
        assert!(collector.record("Autor", "Saavedra"));
        assert!(!collector.record("Autor", "Cervantes"));

        let metadata = collector.to_metadata();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.keys().collect::<Vec<_>>(), vec!["Autor", "Título"]);
        assert_eq!(metadata.get("Autor"), Some("Cervantes === Saavedra"));
        assert_eq!(metadata.get("Título"), Some("Don Quijote"));
    }

    #[test]
    fn test_metadata_from_iter_drops_empty_keys() {
        let metadata: Metadata = vec![
            (String::new(), "orphan".to_string()),
            ("key".to_string(), "value".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("key"), Some("value"));
        assert_eq!(metadata.to_string(), "key: value\n");
    }

    #[test]
    fn test_clear_empties_collector() {
        let mut collector = MetadataCollector::new();
        collector.record("k", "v");
        collector.clear();
        assert!(collector.is_empty());
        assert!(collector.to_metadata().is_empty());
    }
}
