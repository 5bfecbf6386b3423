//! Ordered enumeration of the `day/hour/book-id` datalake tree.
//!
//! ```text
//! {root}/
//! └── 20240101/          day, compared as a plain string
//!     └── 9/             hour, numeric when all digits
//!         └── 1342/      book id, all digits
//!             ├── header.txt
//!             └── body.txt
//! ```

use crate::progress::{ProgressCursor, SegmentKey};
use crate::{BookId, BODY_FILE};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const DAY_DEPTH: usize = 1;
const HOUR_DEPTH: usize = 2;
const BOOK_DEPTH: usize = 3;

/// One indexable book, in walk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookEntry {
    pub day: String,
    pub hour: String,
    pub book_id: BookId,
    pub body_path: PathBuf,
}

impl BookEntry {
    pub fn bucket(&self) -> (&str, &str) {
        (&self.day, &self.hour)
    }
}

struct BookDir {
    day: String,
    hour: String,
    book_id: BookId,
    dir: PathBuf,
}

/// Walks a datalake root in ascending `(day, hour, book id)` order.
///
/// The walker holds no iteration state: every call to [`iter`](Self::iter)
/// starts a fresh walk, and two walks over an unchanged tree yield the same
/// sequence.
#[derive(Debug, Clone)]
pub struct DatalakeWalker {
    root: PathBuf,
    cursor: ProgressCursor,
}

impl DatalakeWalker {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), cursor: ProgressCursor::default() }
    }

    /// Skip everything at or before `cursor`.
    pub fn after(mut self, cursor: &ProgressCursor) -> Self {
        self.cursor = cursor.clone();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily enumerate books that have a body file and sort after the cursor.
    pub fn iter(&self) -> impl Iterator<Item = BookEntry> {
        let cursor = self.cursor.clone();
        walk_book_dirs(&self.root, self.cursor.clone()).filter_map(move |book| {
            if cursor.should_skip(&book.day, &book.hour, book.book_id) {
                return None;
            }
            let body_path = book.dir.join(BODY_FILE);
            if !body_path.is_file() {
                tracing::debug!(book_id = book.book_id, dir = %book.dir.display(), "no body file, skipping");
                return None;
            }
            Some(BookEntry { day: book.day, hour: book.hour, book_id: book.book_id, body_path })
        })
    }

    /// Directory of `book_id`, first match in walk order, whether or not it
    /// holds a body file. The cursor is ignored.
    pub fn locate(&self, book_id: BookId) -> Option<PathBuf> {
        walk_book_dirs(&self.root, ProgressCursor::default())
            .find(|book| book.book_id == book_id)
            .map(|book| book.dir)
    }
}

fn walk_book_dirs(root: &Path, cursor: ProgressCursor) -> impl Iterator<Item = BookDir> {
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "datalake root missing, nothing to walk");
    }
    let walk = root.is_dir().then(|| {
        WalkDir::new(root)
            .max_depth(BOOK_DEPTH)
            .sort_by(sibling_order)
            .into_iter()
            .filter_entry(move |e| keep_entry(e, &cursor))
    });

    walk.into_iter()
        .flatten()
        .filter_map(|res| match res {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "unreadable datalake entry, skipping");
                None
            }
        })
        .filter(|e| e.depth() == BOOK_DEPTH)
        .filter_map(|e| {
            let book_id = parse_book_id(&name_of(e.path()))?;
            let hour_dir = e.path().parent()?;
            let day_dir = hour_dir.parent()?;
            Some(BookDir {
                day: name_of(day_dir),
                hour: name_of(hour_dir),
                book_id,
                dir: e.into_path(),
            })
        })
}

fn keep_entry(e: &DirEntry, cursor: &ProgressCursor) -> bool {
    let depth = e.depth();
    if depth == 0 {
        return true;
    }
    if !e.file_type().is_dir() {
        return false;
    }
    let name = name_of(e.path());
    match depth {
        DAY_DEPTH => !cursor.day_done(&name),
        HOUR_DEPTH => {
            let day = e.path().parent().map(name_of).unwrap_or_default();
            !cursor.hour_done(&day, &name)
        }
        BOOK_DEPTH => parse_book_id(&name).is_some(),
        _ => false,
    }
}

fn sibling_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    if a.depth() == DAY_DEPTH {
        a.file_name().cmp(b.file_name())
    } else {
        SegmentKey::parse(&name_of(a.path())).cmp(&SegmentKey::parse(&name_of(b.path())))
    }
}

/// Book directories are named by their id and nothing else.
pub fn parse_book_id(name: &str) -> Option<BookId> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

fn name_of(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
