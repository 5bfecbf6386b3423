//! On-disk layout and durable JSON writes for the index snapshot and the
//! progress cursor.
//!
//! Every write goes to a sibling `*.tmp` file which is fsynced and then
//! renamed over the target, so a reader (or a resumed build) only ever sees
//! a complete file.

use crate::{BookId, Error, InvertedIndex, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, create_dir_all, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_INDEX_FILE: &str = "inverted_index.json";
pub const DEFAULT_PROGRESS_FILE: &str = "progress.json";

/// Locations of the two files owned by a single index builder.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub index: PathBuf,
    pub progress: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(index: P, progress: Q) -> Self {
        Self { index: index.as_ref().to_path_buf(), progress: progress.as_ref().to_path_buf() }
    }

    /// Both files side by side under `root`.
    pub fn in_dir<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self { index: root.join(DEFAULT_INDEX_FILE), progress: root.join(DEFAULT_PROGRESS_FILE) }
    }
}

/// Write the full snapshot, terms in sorted order.
pub fn save_snapshot(path: &Path, index: &InvertedIndex) -> Result<()> {
    let ordered: BTreeMap<&str, &[BookId]> = index.iter().collect();
    write_json(path, &ordered)
}

/// Read a snapshot; `None` when the file does not exist.
pub fn load_snapshot(path: &Path) -> Result<Option<HashMap<String, Vec<BookId>>>> {
    read_json(path)
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut writer = BufWriter::new(File::create(&tmp)?);
    serde_json::to_writer(&mut writer, value).map_err(io::Error::from)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::corrupt(path, e)),
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| Error::corrupt(path, e))
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let got: Option<Vec<u32>> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn write_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/data.json");
        write_json(&path, &vec![1u32, 2, 3]).unwrap();
        let got: Option<Vec<u32>> = read_json(&path).unwrap();
        assert_eq!(got, Some(vec![1, 2, 3]));
        assert!(!dir.path().join("a/b/data.json.tmp").exists());
    }

    #[test]
    fn garbage_is_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = read_json::<Vec<u32>>(&path).unwrap_err();
        assert!(matches!(err, Error::CorruptState { .. }));
    }
}
