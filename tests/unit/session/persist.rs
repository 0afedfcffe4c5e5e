use chrono::TimeZone as _;

use super::*;

#[test]
fn filename_uses_label_and_hyphenated_utc_time() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    assert_eq!(
        suggested_filename(Quality::Fhd, at, "webm"),
        "presentation-FHD-2024-03-09T14-05-07.webm"
    );
    assert_eq!(
        suggested_filename(Quality::Uhd4k, at, "webm"),
        "presentation-4K-2024-03-09T14-05-07.webm"
    );
}

#[test]
fn directory_store_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(dir.path().join("out"));
    let first = store.save(b"one", "rec.webm").unwrap();
    let second = store.save(b"two", "rec.webm").unwrap();
    assert_ne!(first, second);
    assert_eq!(second.file_name().unwrap(), "rec-1.webm");
    assert_eq!(std::fs::read(&first).unwrap(), b"one");
    assert_eq!(std::fs::read(&second).unwrap(), b"two");
}

#[test]
fn directory_store_rejects_paths() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(dir.path());
    assert!(store.save(b"x", "../escape.webm").is_err());
    assert!(store.save(b"x", "a/b.webm").is_err());
}

#[test]
fn memory_store_shares_between_clones() {
    let store = MemoryStore::new();
    let handle = store.clone();
    let loc = store.save(b"abc", "x.webm").unwrap();
    assert_eq!(loc, PathBuf::from("memory://x.webm"));
    assert_eq!(handle.saved(), vec![("x.webm".to_owned(), b"abc".to_vec())]);
}
