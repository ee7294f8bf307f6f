//! Partial-key index.
//!
//! Groups the full keys of one schema by their first `N` characters so a
//! user can fetch a record by typing only the start of its key.

use std::collections::{BTreeMap, BTreeSet};

/// Maps a fixed-length key prefix to the set of full keys sharing it.
///
/// Prefixes are counted in characters, so multi-byte keys never split
/// inside a character. Keys shorter than the prefix length are their own
/// prefix.
///
/// # Example
///
/// ```
/// use schemadb_core::PartialKeyIndex;
///
/// let index = PartialKeyIndex::rebuild(5, ["Alice", "Alicia", "Bob"]);
///
/// assert_eq!(index.lookup("Ali"), vec!["Alice", "Alicia"]);
/// assert_eq!(index.lookup("Alici"), vec!["Alicia"]);
/// assert!(index.lookup("Carol").is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PartialKeyIndex {
    prefix_len: usize,
    buckets: BTreeMap<String, BTreeSet<String>>,
}

impl PartialKeyIndex {
    /// Creates an empty index. A zero prefix length is treated as one.
    #[must_use]
    pub fn new(prefix_len: usize) -> Self {
        Self {
            prefix_len: prefix_len.max(1),
            buckets: BTreeMap::new(),
        }
    }

    /// Builds an index over `keys` from scratch.
    pub fn rebuild<I, S>(prefix_len: usize, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new(prefix_len);
        for key in keys {
            index.insert(key.as_ref());
        }
        index
    }

    /// Prefix length in characters.
    #[must_use]
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Returns the bucket prefix for `key`.
    #[must_use]
    pub fn prefix_of<'k>(&self, key: &'k str) -> &'k str {
        match key.char_indices().nth(self.prefix_len) {
            Some((end, _)) => &key[..end],
            None => key,
        }
    }

    /// Adds a key. Returns false if it was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        self.buckets
            .entry(self.prefix_of(key).to_string())
            .or_default()
            .insert(key.to_string())
    }

    /// Removes a key. Returns false if it was not present.
    ///
    /// The bucket stays behind even when it becomes empty.
    pub fn remove(&mut self, key: &str) -> bool {
        self.buckets
            .get_mut(self.prefix_of(key))
            .is_some_and(|bucket| bucket.remove(key))
    }

    /// Returns true if `key` is indexed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.buckets
            .get(self.prefix_of(key))
            .is_some_and(|bucket| bucket.contains(key))
    }

    /// Finds every full key starting with `partial`, in sorted order.
    ///
    /// An empty `partial` matches nothing.
    #[must_use]
    pub fn lookup(&self, partial: &str) -> Vec<String> {
        if partial.is_empty() {
            return Vec::new();
        }

        let matches: BTreeSet<&String> = if partial.chars().count() >= self.prefix_len {
            self.buckets
                .get(self.prefix_of(partial))
                .into_iter()
                .flatten()
                .filter(|key| key.starts_with(partial))
                .collect()
        } else {
            self.buckets
                .iter()
                .filter(|(prefix, _)| {
                    prefix.starts_with(partial) || partial.starts_with(prefix.as_str())
                })
                .flat_map(|(_, bucket)| bucket)
                .filter(|key| key.starts_with(partial))
                .collect()
        };

        matches.into_iter().cloned().collect()
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    /// Returns true if no keys are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(BTreeSet::is_empty)
    }

    /// Number of buckets, including empty ones.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterates over all indexed keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
    }

    /// Compares the index against the authoritative key set.
    ///
    /// A key is dangling if the index holds it but `keys` does not, or if it
    /// sits in the wrong bucket. A key is missing if `keys` holds it but the
    /// index cannot find it.
    pub fn verify<I, S>(&self, keys: I) -> IndexReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let expected: BTreeSet<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        let mut report = IndexReport::default();

        for (prefix, bucket) in &self.buckets {
            for key in bucket {
                if !expected.contains(key) || self.prefix_of(key) != prefix.as_str() {
                    report.dangling.push(key.clone());
                }
            }
        }
        for key in &expected {
            if !self.contains(key) {
                report.missing.push(key.clone());
            }
        }
        report.dangling.sort();
        report
    }
}

/// Equality ignores empty buckets, so an index maintained incrementally
/// equals one rebuilt from the same keys.
impl PartialEq for PartialKeyIndex {
    fn eq(&self, other: &Self) -> bool {
        let live = |index: &Self| {
            index
                .buckets
                .iter()
                .filter(|(_, bucket)| !bucket.is_empty())
                .map(|(prefix, bucket)| (prefix.clone(), bucket.clone()))
                .collect::<Vec<_>>()
        };
        self.prefix_len == other.prefix_len && live(self) == live(other)
    }
}

impl Eq for PartialKeyIndex {}

/// Result of [`PartialKeyIndex::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Indexed keys with no record, or filed under the wrong prefix.
    pub dangling: Vec<String>,
    /// Record keys the index cannot find.
    pub missing: Vec<String>,
}

impl IndexReport {
    /// Returns true if no problems were found.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.dangling.is_empty() && self.missing.is_empty()
    }
}
