//! Drives the walker, tokenizer and stores to build the index bucket by
//! bucket.
//!
//! A bucket is one `(day, hour)` directory. After the last book of a bucket
//! the index snapshot is written first and the progress cursor second, so an
//! interrupted run redoes at most the bucket it was in. Re-adding books is
//! idempotent, which makes that redo harmless.
//!
//! Builds assume a single writer per index: callers must not run two builds
//! or updates against the same files at once.

use crate::progress::ProgressCursor;
use crate::tokenizer::tokenize;
use crate::walker::{BookEntry, DatalakeWalker};
use crate::{BookId, Error, IndexPaths, InvertedIndex, Result, BODY_FILE};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Counters for one build run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BuildReport {
    pub buckets: usize,
    pub books_indexed: usize,
    /// Books read successfully that contained no index terms.
    pub books_without_terms: usize,
    /// Books whose body could not be read; logged and left out.
    pub books_failed: usize,
    pub terms: usize,
    pub cursor: ProgressCursor,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub book_id: BookId,
    pub terms: usize,
    /// Whether the book had postings before the update.
    pub replaced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub books_indexed: usize,
    pub terms: usize,
    pub index_bytes: u64,
    pub last_update: Option<String>,
    pub cursor: ProgressCursor,
}

struct Bucket {
    day: String,
    hour: String,
    max_book_id: BookId,
}

impl Bucket {
    fn open(entry: &BookEntry) -> Self {
        tracing::info!(day = %entry.day, hour = %entry.hour, "scanning bucket");
        Self { day: entry.day.clone(), hour: entry.hour.clone(), max_book_id: entry.book_id }
    }

    fn holds(&self, entry: &BookEntry) -> bool {
        entry.bucket() == (self.day.as_str(), self.hour.as_str())
    }
}

pub struct IndexBuilder {
    datalake: PathBuf,
    paths: IndexPaths,
}

impl IndexBuilder {
    pub fn new<P: AsRef<Path>>(datalake: P, paths: IndexPaths) -> Self {
        Self { datalake: datalake.as_ref().to_path_buf(), paths }
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    /// Resume from the persisted cursor and index everything after it.
    pub fn build(&self) -> Result<BuildReport> {
        self.run(None)
    }

    /// Like [`build`](Self::build) but stop after `max_buckets` completed
    /// buckets. A later `build` picks up where this one stopped.
    pub fn build_limited(&self, max_buckets: usize) -> Result<BuildReport> {
        self.run(Some(max_buckets))
    }

    /// Clear the cursor and walk the whole datalake from the start. The
    /// existing snapshot is loaded and merged into, not discarded.
    pub fn rebuild(&self) -> Result<BuildReport> {
        ProgressCursor::clear(&self.paths.progress)?;
        tracing::info!(progress = %self.paths.progress.display(), "progress cleared for full rebuild");
        self.run(None)
    }

    fn run(&self, max_buckets: Option<usize>) -> Result<BuildReport> {
        let mut cursor = ProgressCursor::load(&self.paths.progress)?;
        let mut index = InvertedIndex::load(&self.paths.index)?;
        tracing::info!(
            last_day = ?cursor.last_day,
            last_hour = ?cursor.last_hour,
            last_book_id = ?cursor.last_book_id,
            terms = index.num_terms(),
            "starting build"
        );

        let walker = DatalakeWalker::new(&self.datalake).after(&cursor);
        let mut report = BuildReport::default();
        let mut bucket: Option<Bucket> = None;

        for entry in walker.iter() {
            if bucket.as_ref().is_some_and(|b| !b.holds(&entry)) {
                if let Some(done) = bucket.take() {
                    self.persist_bucket(&mut index, &mut cursor, done, &mut report)?;
                }
                if max_buckets.is_some_and(|max| report.buckets >= max) {
                    tracing::info!(buckets = report.buckets, "bucket limit reached, stopping");
                    break;
                }
            }
            let current = bucket.get_or_insert_with(|| Bucket::open(&entry));
            current.max_book_id = current.max_book_id.max(entry.book_id);
            index_book(&mut index, &entry, &mut report);
        }
        if let Some(done) = bucket.take() {
            self.persist_bucket(&mut index, &mut cursor, done, &mut report)?;
        }

        report.terms = index.num_terms();
        report.cursor = cursor;
        tracing::info!(
            buckets = report.buckets,
            books = report.books_indexed,
            failed = report.books_failed,
            terms = report.terms,
            "build complete"
        );
        Ok(report)
    }

    fn persist_bucket(
        &self,
        index: &mut InvertedIndex,
        cursor: &mut ProgressCursor,
        bucket: Bucket,
        report: &mut BuildReport,
    ) -> Result<()> {
        index.clean_and_sort();
        index.save(&self.paths.index)?;
        cursor.advance(&bucket.day, &bucket.hour, bucket.max_book_id);
        cursor.save(&self.paths.progress)?;
        report.buckets += 1;
        tracing::info!(
            day = %bucket.day,
            hour = %bucket.hour,
            last_book_id = bucket.max_book_id,
            "bucket persisted"
        );
        Ok(())
    }

    /// Re-index one book: drop its old postings, add the current ones and
    /// rewrite the snapshot. The cursor is left alone.
    pub fn update_book(&self, book_id: BookId) -> Result<UpdateReport> {
        let mut index = InvertedIndex::load(&self.paths.index)?;
        let dir = DatalakeWalker::new(&self.datalake)
            .locate(book_id)
            .ok_or(Error::NotFound(book_id))?;
        let body_path = dir.join(BODY_FILE);
        if !body_path.is_file() {
            return Err(Error::MissingBody { book_id, path: body_path });
        }
        let text = fs::read_to_string(&body_path)?;

        let replaced = index.remove_document(book_id) > 0;
        let terms = tokenize(&text);
        index.add_document(book_id, &terms);
        index.clean_and_sort();
        index.save(&self.paths.index)?;

        tracing::info!(book_id, terms = terms.len(), replaced, "book re-indexed");
        Ok(UpdateReport { book_id, terms: terms.len(), replaced })
    }

    pub fn status(&self) -> Result<IndexStatus> {
        let index = InvertedIndex::load(&self.paths.index)?;
        let cursor = ProgressCursor::load(&self.paths.progress)?;
        let meta = fs::metadata(&self.paths.index).ok();
        let last_update = meta
            .as_ref()
            .and_then(|m| m.modified().ok())
            .and_then(|t| OffsetDateTime::from(t).format(&Rfc3339).ok());
        Ok(IndexStatus {
            books_indexed: index.doc_ids().len(),
            terms: index.num_terms(),
            index_bytes: meta.map(|m| m.len()).unwrap_or(0),
            last_update,
            cursor,
        })
    }
}

fn index_book(index: &mut InvertedIndex, entry: &BookEntry, report: &mut BuildReport) {
    let text = match fs::read_to_string(&entry.body_path) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(book_id = entry.book_id, path = %entry.body_path.display(), error = %err, "failed to read body, skipping book");
            report.books_failed += 1;
            return;
        }
    };
    let terms = tokenize(&text);
    if terms.is_empty() {
        tracing::debug!(book_id = entry.book_id, "no terms in body");
        report.books_without_terms += 1;
        return;
    }
    index.add_document(entry.book_id, &terms);
    report.books_indexed += 1;
    tracing::debug!(book_id = entry.book_id, terms = terms.len(), "indexed book");
}
