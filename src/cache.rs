//! A single-file cache of named tables.

use std::{collections::BTreeMap, path::PathBuf};

/// Side-band attributes stored with a table, e.g. the url it came from.
pub type Metadata = BTreeMap<String, String>;

/// The cache.
///
/// Only the path is held. Each operation opens the sqlite file, does its work, and closes it
/// again, so reads, writes and compaction from one process can be freely interleaved.
#[derive(Debug, Clone)]
pub struct Cache {
    path: PathBuf, // The backing sqlite file.
}

mod add_data;
mod clean;
mod query;
mod root;

#[cfg(test)]
pub(crate) mod unit {
    use super::*;
    use crate::errors::OxyfloatErr;

    use tempdir::TempDir;

    // struct to hold temporary data for tests.
    pub(crate) struct TestCache {
        pub(crate) tmp: TempDir,
        pub(crate) cache: Cache,
    }

    // Function to create a new cache to test.
    pub(crate) fn create_test_cache(name: &str) -> Result<TestCache, OxyfloatErr> {
        let tmp = TempDir::new("oxyfloat-test-cache")?;
        let cache = Cache::open(&tmp.path().join(name))?;

        Ok(TestCache { tmp, cache })
    }

    fn url_metadata(url: &str) -> Metadata {
        let mut md = Metadata::new();
        md.insert("url".to_owned(), url.to_owned());
        md
    }

    #[test]
    fn test_cache_create_new() {
        let TestCache { tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");

        assert!(tmp.path().join("cache.db").exists());
        assert_eq!(cache.path(), tmp.path().join("cache.db"));
    }

    #[test]
    fn test_cache_creates_parent_dirs() {
        let tmp = TempDir::new("oxyfloat-test-cache").expect("Failed to create temp dir.");
        let path = tmp.path().join("a").join("b").join("cache.db");
        assert!(Cache::open(&path).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip_with_metadata() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");

        let rows = vec![vec![1.0, 2.0], vec![3.5, -4.25]];
        cache
            .put("P1900650_001", &rows, Some(&url_metadata("http://x/y.nc")))
            .expect("Error saving.");

        let back: Vec<Vec<f64>> = cache.get("P1900650_001").expect("Error loading.");
        assert_eq!(back, rows);

        let md = cache
            .metadata("P1900650_001")
            .expect("Error loading metadata.")
            .expect("Metadata missing.");
        assert_eq!(md.get("url").map(String::as_str), Some("http://x/y.nc"));
    }

    #[test]
    fn test_missing_key_is_not_in_cache() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");

        match cache.get::<Vec<f64>>("status") {
            Err(OxyfloatErr::NotInCache(key)) => assert_eq!(key, "status"),
            Err(err) => panic!("Wrong error type returned: {}", err),
            Ok(_) => panic!("This should not exist in the cache."),
        }

        assert!(!cache.contains("status").expect("db error"));
        assert!(cache.metadata("status").unwrap_err().is_not_in_cache());
    }

    #[test]
    fn test_put_overwrites_same_key() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");

        cache.put("k", &vec![1_i32], None).expect("Error saving.");
        cache.put("k", &vec![2_i32, 3], None).expect("Error saving.");

        let back: Vec<i32> = cache.get("k").expect("Error loading.");
        assert_eq!(back, vec![2, 3]);
        assert_eq!(cache.keys().expect("db error"), vec!["k".to_owned()]);
        assert!(cache.metadata("k").expect("db error").is_none());
    }

    #[test]
    fn test_corrupt_file_is_not_not_found() {
        let tmp = TempDir::new("oxyfloat-test-cache").expect("Failed to create temp dir.");
        let path = tmp.path().join("cache.db");
        std::fs::write(&path, vec![0x42_u8; 4096]).expect("Failed to write garbage.");

        match Cache::open(&path) {
            Err(OxyfloatErr::Database(_)) => {}
            Err(err) => panic!("Wrong error type returned: {}", err),
            Ok(_) => panic!("Garbage should not open as a cache."),
        }
    }

    #[test]
    fn test_foreign_schema_rejected() {
        let tmp = TempDir::new("oxyfloat-test-cache").expect("Failed to create temp dir.");
        let path = tmp.path().join("other.db");
        {
            let conn = rusqlite::Connection::open(&path).expect("Failed to create db.");
            conn.execute_batch("CREATE TABLE sites (station_num INTEGER);")
                .expect("Failed to create table.");
        }

        match Cache::open(&path) {
            Err(OxyfloatErr::InvalidSchema) => {}
            Err(err) => panic!("Wrong error type returned: {}", err),
            Ok(_) => panic!("Foreign database should be rejected."),
        }

        let conn = rusqlite::Connection::open(&path).expect("Failed to reopen db.");
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .expect("Failed to prepare.")
            .query_map([], |row| row.get(0))
            .expect("Failed to query.")
            .collect::<Result<_, _>>()
            .expect("Failed to read table names.");
        assert_eq!(tables, vec!["sites".to_owned()]);
    }

    #[test]
    fn test_compact_keeps_entries_and_order() {
        let TestCache { tmp: _tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");

        let keys = ["status", "global_meta", "P1_001", "P1_002", "P1_003"];
        for (i, key) in keys.iter().enumerate() {
            cache.put(key, &vec![i as f64; 500], None).expect("Error saving.");
        }
        cache.remove("P1_002").expect("Error removing.");

        cache.compact().expect("Error compacting.");
        cache.compact().expect("Error compacting twice.");

        assert_eq!(
            cache.keys().expect("db error"),
            vec!["status", "global_meta", "P1_001", "P1_003"]
        );
        let back: Vec<f64> = cache.get("P1_003").expect("Error loading.");
        assert_eq!(back, vec![4.0; 500]);
    }

    #[test]
    fn test_interleaved_handles_on_same_file() {
        let TestCache { tmp, cache } =
            create_test_cache("cache.db").expect("Failed to create test cache.");
        let other = Cache::open(&tmp.path().join("cache.db")).expect("Failed to reopen.");

        cache.put("a", &"first", None).expect("Error saving.");
        other.compact().expect("Error compacting.");
        other.put("b", &"second", None).expect("Error saving.");

        let a: String = cache.get("a").expect("Error loading.");
        let b: String = cache.get("b").expect("Error loading.");
        assert_eq!((a.as_str(), b.as_str()), ("first", "second"));
    }
}
