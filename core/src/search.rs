//! Boolean AND/OR retrieval over an index snapshot, ranked by summed
//! smoothed IDF.

use crate::tokenizer::tokenize;
use crate::{BookId, InvertedIndex, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// How query terms combine into a candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Documents containing every query term.
    #[default]
    And,
    /// Documents containing at least one query term.
    Or,
}

impl SearchMode {
    /// `"or"` in any case selects [`SearchMode::Or`]; every other value,
    /// including unknown ones, means [`SearchMode::And`].
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("or") { SearchMode::Or } else { SearchMode::And }
    }
}

impl FromStr for SearchMode {
    type Err = Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> { Ok(Self::parse(s)) }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::And => f.write_str("and"),
            SearchMode::Or => f.write_str("or"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub book_id: BookId,
    pub score: f64,
}

/// An index plus the statistics derived from it. Never mutated after
/// construction.
struct Snapshot {
    index: InvertedIndex,
    idf: HashMap<String, f64>,
    num_docs: usize,
}

impl Snapshot {
    fn new(index: InvertedIndex) -> Self {
        let num_docs = index.doc_ids().len();
        let n = num_docs as f64;
        let idf = index
            .iter()
            .map(|(term, list)| (term.to_string(), smoothed_idf(n, list.len() as f64)))
            .collect();
        Self { index, idf, num_docs }
    }
}

/// `ln((N + 1) / (df + 1)) + 1`; strictly positive even when `df == N`.
pub fn smoothed_idf(num_docs: f64, df: f64) -> f64 {
    ((num_docs + 1.0) / (df + 1.0)).ln() + 1.0
}

/// Read-mostly search service. Queries take a reference-counted handle to
/// the current snapshot; [`reload`](Self::reload) builds a replacement in
/// full and swaps it in, so a query sees either the old or the new snapshot,
/// never a mix.
pub struct SearchEngine {
    current: RwLock<Arc<Snapshot>>,
}

impl SearchEngine {
    pub fn load(path: &Path) -> Result<Self> {
        let index = InvertedIndex::load(path)?;
        Ok(Self::from_index(index))
    }

    pub fn from_index(index: InvertedIndex) -> Self {
        Self { current: RwLock::new(Arc::new(Snapshot::new(index))) }
    }

    pub fn reload(&self, path: &Path) -> Result<()> {
        let index = InvertedIndex::load(path)?;
        self.replace(index);
        tracing::info!(path = %path.display(), docs = self.num_docs(), terms = self.num_terms(), "index reloaded");
        Ok(())
    }

    pub fn replace(&self, index: InvertedIndex) {
        let next = Arc::new(Snapshot::new(index));
        *self.current.write() = next;
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn num_docs(&self) -> usize { self.snapshot().num_docs }

    pub fn num_terms(&self) -> usize { self.snapshot().index.num_terms() }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.snapshot().idf.get(term).copied()
    }

    /// Rank documents for `query`. Results are ordered by descending score,
    /// then ascending book id.
    pub fn search(&self, query: &str, mode: SearchMode) -> Vec<ScoredDoc> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let snap = self.snapshot();
        let lists: Vec<(&str, &[BookId])> = terms
            .iter()
            .map(|t| (t.as_str(), snap.index.postings(t).unwrap_or(&[])))
            .collect();

        let candidates = match mode {
            SearchMode::Or => union(&lists),
            SearchMode::And => intersection(&lists),
        };

        let mut scored: Vec<ScoredDoc> = candidates
            .into_iter()
            .map(|book_id| {
                let score = lists
                    .iter()
                    .filter(|(_, list)| list.binary_search(&book_id).is_ok())
                    .map(|(term, _)| snap.idf.get(*term).copied().unwrap_or(0.0))
                    .sum();
                ScoredDoc { book_id, score }
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.book_id.cmp(&b.book_id)));
        scored
    }
}

fn union(lists: &[(&str, &[BookId])]) -> Vec<BookId> {
    let all: BTreeSet<BookId> = lists.iter().flat_map(|(_, list)| list.iter().copied()).collect();
    all.into_iter().collect()
}

fn intersection(lists: &[(&str, &[BookId])]) -> Vec<BookId> {
    let mut iter = lists.iter();
    let mut acc: Vec<BookId> = match iter.next() {
        Some((_, first)) => first.to_vec(),
        None => return Vec::new(),
    };
    for (_, list) in iter {
        if acc.is_empty() {
            break;
        }
        acc.retain(|id| list.binary_search(id).is_ok());
    }
    acc
}
