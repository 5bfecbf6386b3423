//! Error type shared by the builder, the stores and the search engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::BookId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Requested book id has no directory in the datalake
    #[error("book {0} not found in datalake")]
    NotFound(BookId),

    /// Book directory exists but has no body text
    #[error("body text not found for book {book_id} at {}", path.display())]
    MissingBody { book_id: BookId, path: PathBuf },

    /// Persisted cursor or snapshot could not be read back
    #[error("corrupt state at {}: {message}", path.display())]
    CorruptState { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corrupt(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::CorruptState {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True for the conditions a caller reports as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MissingBody { .. })
    }
}
