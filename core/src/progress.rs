//! Durable resumption point for incremental builds.

use crate::persist::{read_json, remove_if_exists, write_json};
use crate::{BookId, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Sort key for an hour or book directory name.
///
/// All-digit names compare numerically, so `"9" < "10"`. Any other name
/// sorts before every numeric one; those compare as plain strings. The
/// raw name breaks ties between numerically equal names (`"01"`/`"1"`)
/// so the ordering stays total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentKey {
    Text(String),
    Number(u64, String),
}

impl SegmentKey {
    pub fn parse(name: &str) -> Self {
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = name.parse::<u64>() {
                return SegmentKey::Number(n, name.to_string());
            }
        }
        SegmentKey::Text(name.to_string())
    }
}

/// Last fully processed `(day, hour, book id)` triple.
///
/// The zero value (all `None`) means nothing has been indexed yet; every
/// triple sorts after it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCursor {
    #[serde(default)]
    pub last_day: Option<String>,
    #[serde(default)]
    pub last_hour: Option<String>,
    #[serde(default)]
    pub last_book_id: Option<BookId>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ProgressCursor {
    /// Load the cursor at `path`. A missing file is the zero cursor; a file
    /// that cannot be read or parsed is `CorruptState`.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(read_json(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Forget any persisted progress.
    pub fn clear(path: &Path) -> Result<()> {
        remove_if_exists(path)
    }

    pub fn is_zero(&self) -> bool {
        self.last_day.is_none() && self.last_hour.is_none() && self.last_book_id.is_none()
    }

    fn key(&self) -> (Option<&str>, Option<SegmentKey>, Option<BookId>) {
        (self.last_day.as_deref(), self.last_hour.as_deref().map(SegmentKey::parse), self.last_book_id)
    }

    /// True iff the triple sorts at or before the cursor.
    pub fn should_skip(&self, day: &str, hour: &str, book_id: BookId) -> bool {
        (Some(day), Some(SegmentKey::parse(hour)), Some(book_id)) <= self.key()
    }

    /// True when every triple of `day` sorts before the cursor.
    pub fn day_done(&self, day: &str) -> bool {
        Some(day) < self.last_day.as_deref()
    }

    /// True when every triple of the `(day, hour)` bucket sorts before the cursor.
    pub fn hour_done(&self, day: &str, hour: &str) -> bool {
        let (last_day, last_hour, _) = self.key();
        (Some(day), Some(SegmentKey::parse(hour))) < (last_day, last_hour)
    }

    /// Move the cursor forward to the triple if it sorts after the current
    /// position. Never moves backward. Returns whether it moved.
    pub fn advance(&mut self, day: &str, hour: &str, book_id: BookId) -> bool {
        if self.should_skip(day, hour, book_id) {
            return false;
        }
        self.last_day = Some(day.to_string());
        self.last_hour = Some(hour.to_string());
        self.last_book_id = Some(book_id);
        self.timestamp = OffsetDateTime::now_utc().format(&Rfc3339).ok();
        true
    }
}
