//! Entry index: ordered, keyed directory of archive entries
//!
//! Entries keep record order for enumeration. Name lookups go through
//! [`normalize_path`], so they ignore case and accept either separator.
//! The index is immutable once built and is shared freely between threads.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::error::{Ba2Error, Ba2Result};
use crate::hash::{EntryHash, normalize_path};

/// Lookup structure over an archive's entries
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_hash: HashMap<EntryHash, usize>,
}

impl EntryIndex {
    /// Build the index.
    ///
    /// Duplicate names are a `CorruptIndex` error when `strict`; otherwise
    /// the later record wins for lookups. Duplicate hash triples always
    /// resolve to the later record.
    pub fn build(entries: Vec<Entry>, strict: bool) -> Ba2Result<Self> {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_hash = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            let key = normalize_path(&entry.name);
            if let Some(previous) = by_name.insert(key, position) {
                if strict {
                    return Err(Ba2Error::corrupt(
                        format!(
                            "duplicate entry name '{}' (records {previous} and {position})",
                            entry.name
                        ),
                        entry.offset(),
                    ));
                }
                warn!(
                    "Duplicate entry name '{}', record {} replaces record {}",
                    entry.name, position, previous
                );
            }
            if by_hash.insert(entry.hash, position).is_some() {
                debug!("Hash collision on {} for '{}'", entry.hash, entry.name);
            }
        }

        Ok(Self {
            entries,
            by_name,
            by_hash,
        })
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in record order
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Entry at a record position
    pub fn get(&self, position: usize) -> Option<&Entry> {
        self.entries.get(position)
    }

    /// Whether `entry` is one of this index's own records, by address
    pub fn contains(&self, entry: &Entry) -> bool {
        self.entries
            .as_ptr_range()
            .contains(&std::ptr::from_ref(entry))
    }

    /// Find an entry by path
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.by_name
            .get(&normalize_path(name))
            .map(|&position| &self.entries[position])
    }

    /// Find an entry by hash triple
    pub fn find_by_hash(&self, hash: &EntryHash) -> Option<&Entry> {
        self.by_hash
            .get(hash)
            .map(|&position| &self.entries[position])
    }
}

impl<'a> IntoIterator for &'a EntryIndex {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
