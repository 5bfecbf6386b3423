use booksearch_core::{Error, IndexBuilder, IndexPaths, InvertedIndex, ProgressCursor, BODY_FILE};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn add_book(datalake: &Path, day: &str, hour: &str, id: u32, body: &str) {
    let dir = datalake.join(day).join(hour).join(id.to_string());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("header.txt"), format!("Title: Book {id}")).unwrap();
    fs::write(dir.join(BODY_FILE), body).unwrap();
}

struct Fixture {
    _dir: TempDir,
    datalake: std::path::PathBuf,
    paths: IndexPaths,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let datalake = dir.path().join("datalake");
        let paths = IndexPaths::in_dir(dir.path().join("indexer"));
        let fx = Self { _dir: dir, datalake, paths };
        add_book(&fx.datalake, "20240101", "9", 1, "Alice was beginning to get very tired");
        add_book(&fx.datalake, "20240101", "9", 2, "Down the rabbit hole went Alice");
        add_book(&fx.datalake, "20240101", "10", 3, "The Queen of Hearts");
        add_book(&fx.datalake, "20240102", "0", 4, "La reina de corazones, canción");
        fx
    }

    fn builder(&self) -> IndexBuilder {
        IndexBuilder::new(&self.datalake, self.paths.clone())
    }

    fn index(&self) -> InvertedIndex {
        InvertedIndex::load(&self.paths.index).unwrap()
    }
}

#[test]
fn rebuild_indexes_every_bucket() {
    let fx = Fixture::new();
    let report = fx.builder().rebuild().unwrap();
    assert_eq!(report.buckets, 3);
    assert_eq!(report.books_indexed, 4);
    assert_eq!(report.books_failed, 0);

    let index = fx.index();
    assert_eq!(index.postings("alice"), Some(&[1, 2][..]));
    assert_eq!(index.postings("queen"), Some(&[3][..]));
    assert_eq!(index.postings("canción"), Some(&[4][..]));

    let cursor = ProgressCursor::load(&fx.paths.progress).unwrap();
    assert_eq!(cursor.last_day.as_deref(), Some("20240102"));
    assert_eq!(cursor.last_hour.as_deref(), Some("0"));
    assert_eq!(cursor.last_book_id, Some(4));
}

#[test]
fn interrupted_build_resumes_to_same_index() {
    let straight = Fixture::new();
    straight.builder().rebuild().unwrap();

    let resumed = Fixture::new();
    let first = resumed.builder().build_limited(1).unwrap();
    assert_eq!(first.buckets, 1);
    let partial = resumed.index();
    assert!(partial.postings("queen").is_none());

    let second = resumed.builder().build().unwrap();
    assert_eq!(second.buckets, 2);
    assert_eq!(second.books_indexed, 2);
    assert_eq!(resumed.index(), straight.index());
}

#[test]
fn build_only_picks_up_new_buckets() {
    let fx = Fixture::new();
    fx.builder().build().unwrap();
    add_book(&fx.datalake, "20240102", "1", 5, "A brand new hatter");
    let report = fx.builder().build().unwrap();
    assert_eq!(report.buckets, 1);
    assert_eq!(report.books_indexed, 1);
    assert_eq!(fx.index().postings("hatter"), Some(&[5][..]));
}

#[test]
fn empty_datalake_is_a_successful_run() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::in_dir(dir.path().join("indexer"));
    let builder = IndexBuilder::new(dir.path().join("missing"), paths.clone());
    let report = builder.rebuild().unwrap();
    assert_eq!(report.buckets, 0);
    assert_eq!(report.books_indexed, 0);
    assert!(report.cursor.is_zero());
}

#[test]
fn unreadable_body_skips_only_that_book() {
    let fx = Fixture::new();
    let bad = fx.datalake.join("20240101/9/7");
    fs::create_dir_all(&bad).unwrap();
    fs::write(bad.join(BODY_FILE), [0xff, 0xfe, 0xfd]).unwrap();

    let report = fx.builder().rebuild().unwrap();
    assert_eq!(report.books_failed, 1);
    assert_eq!(report.books_indexed, 4);
    assert_eq!(report.cursor.last_book_id, Some(4));
    assert!(!fx.index().contains_document(7));
}

#[test]
fn corrupt_cursor_is_fatal() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.paths.progress.parent().unwrap()).unwrap();
    fs::write(&fx.paths.progress, "not json").unwrap();
    let err = fx.builder().build().unwrap_err();
    assert!(matches!(err, Error::CorruptState { .. }));
    // a rebuild starts over and is unaffected
    assert!(fx.builder().rebuild().is_ok());
}

#[test]
fn update_replaces_postings_without_moving_cursor() {
    let fx = Fixture::new();
    fx.builder().rebuild().unwrap();
    let before = ProgressCursor::load(&fx.paths.progress).unwrap();

    fs::write(fx.datalake.join("20240101/9/2").join(BODY_FILE), "Cheshire cat grin").unwrap();
    let report = fx.builder().update_book(2).unwrap();
    assert!(report.replaced);
    assert_eq!(report.terms, 3);

    let index = fx.index();
    assert_eq!(index.postings("alice"), Some(&[1][..]));
    assert_eq!(index.postings("cheshire"), Some(&[2][..]));
    assert!(index.postings("rabbit").is_none());

    let after = ProgressCursor::load(&fx.paths.progress).unwrap();
    assert_eq!(after.last_book_id, before.last_book_id);
    assert_eq!(after.timestamp, before.timestamp);
}

#[test]
fn update_to_termless_content_removes_book() {
    let fx = Fixture::new();
    add_book(&fx.datalake, "20240101", "10", 5, "Tweedledum and Tweedledee");
    fx.builder().rebuild().unwrap();
    assert!(fx.index().contains_document(5));

    fs::write(fx.datalake.join("20240101/10/5").join(BODY_FILE), "1865 -- 1871 ...").unwrap();
    fx.builder().update_book(5).unwrap();
    let index = fx.index();
    assert!(!index.contains_document(5));
    assert!(index.postings("tweedledum").is_none());
}

#[test]
fn update_reports_not_found() {
    let fx = Fixture::new();
    let err = fx.builder().update_book(999).unwrap_err();
    assert!(matches!(err, Error::NotFound(999)));
    assert!(err.is_not_found());

    fs::create_dir_all(fx.datalake.join("20240101/9/8")).unwrap();
    let err = fx.builder().update_book(8).unwrap_err();
    assert!(matches!(err, Error::MissingBody { book_id: 8, .. }));
    assert!(err.is_not_found());
}

#[test]
fn status_reflects_snapshot() {
    let fx = Fixture::new();
    let empty = fx.builder().status().unwrap();
    assert_eq!(empty.books_indexed, 0);
    assert_eq!(empty.index_bytes, 0);
    assert!(empty.last_update.is_none());

    fx.builder().rebuild().unwrap();
    let status = fx.builder().status().unwrap();
    assert_eq!(status.books_indexed, 4);
    assert!(status.index_bytes > 0);
    assert!(status.last_update.is_some());
    assert_eq!(status.cursor.last_day.as_deref(), Some("20240102"));
}

#[test]
fn snapshot_round_trips() {
    let fx = Fixture::new();
    fx.builder().rebuild().unwrap();
    let index = fx.index();
    let copy = fx.paths.index.with_file_name("copy.json");
    index.save(&copy).unwrap();
    assert_eq!(InvertedIndex::load(&copy).unwrap(), index);

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&copy).unwrap()).unwrap();
    assert_eq!(raw["alice"], serde_json::json!([1, 2]));
}
