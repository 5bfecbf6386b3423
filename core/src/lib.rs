pub mod builder;
pub mod error;
pub mod index;
pub mod persist;
pub mod progress;
pub mod search;
pub mod tokenizer;
pub mod walker;

pub use builder::{BuildReport, IndexBuilder, IndexStatus, UpdateReport};
pub use error::{Error, Result};
pub use index::InvertedIndex;
pub use persist::IndexPaths;
pub use progress::{ProgressCursor, SegmentKey};
pub use search::{ScoredDoc, SearchEngine, SearchMode};
pub use walker::{BookEntry, DatalakeWalker};

/// Book identifier, taken from the all-digit directory name in the datalake.
pub type BookId = u32;

/// Name of the per-book plain-text file the index is built from.
pub const BODY_FILE: &str = "body.txt";
