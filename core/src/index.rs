use crate::persist::{load_snapshot, save_snapshot};
use crate::{BookId, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

/// Term to posting-list map. Posting lists are kept sorted ascending and
/// duplicate-free by every mutating operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<BookId>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Load a snapshot. A missing file yields an empty index; lists read from
    /// disk are normalized so a hand-edited snapshot is still usable.
    pub fn load(path: &Path) -> Result<Self> {
        let postings = load_snapshot(path)?.unwrap_or_default();
        let mut index = Self { postings };
        index.clean_and_sort();
        Ok(index)
    }

    /// Rewrite the whole snapshot at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        save_snapshot(path, self)
    }

    /// Record that `book_id` contains each of `terms`. Calling it again with
    /// the same arguments changes nothing.
    pub fn add_document(&mut self, book_id: BookId, terms: &BTreeSet<String>) {
        for term in terms {
            let list = self.postings.entry(term.clone()).or_default();
            if let Err(pos) = list.binary_search(&book_id) {
                list.insert(pos, book_id);
            }
        }
    }

    /// Remove `book_id` from every posting list. Returns the number of lists
    /// it was removed from.
    pub fn remove_document(&mut self, book_id: BookId) -> usize {
        let mut removed = 0;
        for list in self.postings.values_mut() {
            if let Ok(pos) = list.binary_search(&book_id) {
                list.remove(pos);
                removed += 1;
            }
        }
        self.postings.retain(|_, list| !list.is_empty());
        removed
    }

    /// Sort and deduplicate every posting list and drop terms left without
    /// documents.
    pub fn clean_and_sort(&mut self) {
        for list in self.postings.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        self.postings.retain(|_, list| !list.is_empty());
    }

    pub fn postings(&self, term: &str) -> Option<&[BookId]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BookId])> {
        self.postings.iter().map(|(term, list)| (term.as_str(), list.as_slice()))
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    /// Distinct document ids appearing in any posting list.
    pub fn doc_ids(&self) -> HashSet<BookId> {
        self.postings.values().flatten().copied().collect()
    }

    pub fn contains_document(&self, book_id: BookId) -> bool {
        self.postings.values().any(|list| list.binary_search(&book_id).is_ok())
    }
}

impl From<HashMap<String, Vec<BookId>>> for InvertedIndex {
    fn from(postings: HashMap<String, Vec<BookId>>) -> Self {
        let mut index = Self { postings };
        index.clean_and_sort();
        index
    }
}
