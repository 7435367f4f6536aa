//! Integration tests for the CSV catalog store.

mod support;

use harvester_core::catalog::{CatalogError, CatalogStore, TransferStatus};
use tempfile::TempDir;

use support::entry;

#[test]
fn test_build_merge_creates_catalog_with_index_column() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.csv");
    let store = CatalogStore::new(&path);

    let rows = store
        .build_merge(vec![
            entry("1", "Intro to Widgets", "http://dl/1"),
            entry("2", "More Widgets", "http://dl/2"),
        ])
        .unwrap();
    assert_eq!(rows, 2);

    let raw = std::fs::read_to_string(&path).unwrap();
    let mut lines = raw.lines();
    let header = lines.next().unwrap();
    let (index_column, rest) = header.split_once(',').unwrap();
    assert!(index_column.is_empty() || index_column == "\"\"", "{header}");
    assert!(rest.starts_with("id,author,title,year"), "{header}");
    let first = lines.next().unwrap();
    assert!(first.starts_with("0,1,A. Smith,Intro to Widgets"), "{first}");
    assert!(
        first.contains(r#""[false,""initial link creation @01/01/2020 00:00:00""]""#),
        "{first}"
    );
}

#[test]
fn test_round_trip_preserves_entries() {
    let dir = TempDir::new().unwrap();
    let store = CatalogStore::new(dir.path().join("catalog.csv"));

    let mut unclassified = entry("3", "Commas, \"Quotes\"; and more", "http://dl/3");
    unclassified.classification_code = None;
    unclassified.year = None;
    let original = vec![entry("1", "Intro to Widgets", "http://dl/1"), unclassified];

    store.build_merge(original.clone()).unwrap();
    assert_eq!(store.load().unwrap(), original);
}

#[test]
fn test_build_merge_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.csv");
    let store = CatalogStore::new(&path);
    let batch = vec![
        entry("1", "Intro to Widgets", "http://dl/1"),
        entry("2", "More Widgets", "http://dl/2"),
    ];

    store.build_merge(batch.clone()).unwrap();
    let first = std::fs::read(&path).unwrap();
    store.build_merge(batch).unwrap();
    let second = std::fs::read(&path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_build_merge_keeps_existing_row_and_status() {
    let dir = TempDir::new().unwrap();
    let store = CatalogStore::new(dir.path().join("catalog.csv"));

    let archived = entry("1", "Intro to Widgets", "http://dl/1")
        .with_status(TransferStatus::succeeded("document successfully uploaded"));
    store.build_merge(vec![archived.clone()]).unwrap();

    let mut refetched = entry("1", "Intro to Widgets", "http://dl/other");
    refetched.classification_code = Some(640);
    let rows = store
        .build_merge(vec![refetched, entry("2", "More Widgets", "http://dl/2")])
        .unwrap();

    assert_eq!(rows, 2);
    let loaded = store.load().unwrap();
    assert_eq!(loaded[0], archived);
    assert_eq!(loaded[1].id, "2");
}

#[test]
fn test_same_id_with_different_title_is_a_distinct_row() {
    let dir = TempDir::new().unwrap();
    let store = CatalogStore::new(dir.path().join("catalog.csv"));

    let rows = store
        .build_merge(vec![
            entry("1", "Intro to Widgets", "http://dl/1"),
            entry("1", "Intro to Widgets, 2nd ed", "http://dl/1b"),
        ])
        .unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn test_status_merge_prefers_newest_status() {
    let dir = TempDir::new().unwrap();
    let store = CatalogStore::new(dir.path().join("catalog.csv"));
    let one = entry("1", "Intro to Widgets", "http://dl/1");
    let two = entry("2", "More Widgets", "http://dl/2");
    store.build_merge(vec![one.clone(), two.clone()]).unwrap();

    let updated = one.with_status(TransferStatus::failed("document failed to download"));
    store.status_merge(vec![updated.clone()]).unwrap();
    let retried = one.with_status(TransferStatus::succeeded("document saved to disk"));
    let rows = store.status_merge(vec![retried.clone()]).unwrap();

    assert_eq!(rows, 2);
    let loaded = store.load().unwrap();
    assert!(loaded.contains(&retried));
    assert!(loaded.contains(&two));
    assert!(!loaded.contains(&updated));
}

#[test]
fn test_load_missing_catalog_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = CatalogStore::new(dir.path().join("absent.csv"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn test_load_rejects_malformed_status_cell() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.csv");
    let store = CatalogStore::new(&path);
    store
        .build_merge(vec![entry("1", "Intro to Widgets", "http://dl/1")])
        .unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let corrupted = raw.replace("[false,", "[maybe,");
    std::fs::write(&path, corrupted).unwrap();

    let err = store.load().unwrap_err();
    assert!(
        matches!(&err, CatalogError::Status { id, .. } if id == "1"),
        "{err}"
    );
}

#[test]
fn test_write_leaves_no_temp_file_behind() {
    let dir = TempDir::new().unwrap();
    let store = CatalogStore::new(dir.path().join("catalog.csv"));
    store
        .build_merge(vec![entry("1", "Intro to Widgets", "http://dl/1")])
        .unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["catalog.csv".to_string()]);
}
