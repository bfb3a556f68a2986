//! Tests for the store layer
//!
//! These tests verify:
//! - In-memory table get/put/delete and last-write-wins
//! - Range scans in key order with exclusive stop keys
//! - Store-side filtering with page limits
//! - Batched scans that copy rows only on demand
//! - Table pool bounds, reuse and release on drop

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use colmap::config::Config;
use colmap::query::{CompareOp, Predicate, ScanFilter};
use colmap::store::{MemStore, MemTable, Row, RowMutation, ScanSpec, Store, Table, TablePool};
use colmap::ColmapError;

use common::setup_pool;

// =============================================================================
// Helper Functions
// =============================================================================

fn put(table: &MemTable, key: &str, family: &str, qualifier: &str, value: &str, ts: i64) {
    let mut mutation = RowMutation::new(Bytes::copy_from_slice(key.as_bytes()), ts);
    mutation.add(family, qualifier, Bytes::copy_from_slice(value.as_bytes()));
    table.put(&mutation).unwrap();
}

fn keys(rows: Vec<Row>) -> Vec<String> {
    rows.into_iter()
        .map(|r| String::from_utf8(r.key.to_vec()).unwrap())
        .collect()
}

fn scan_keys(table: &MemTable, spec: ScanSpec) -> Vec<String> {
    let rows: Vec<Row> = table.scan(spec).unwrap().map(|r| r.unwrap()).collect();
    keys(rows)
}

fn seeded_table() -> MemTable {
    let table = MemTable::new("t");
    for key in ["a", "b", "c", "d", "e"] {
        put(&table, key, "f", "q", key, 1);
    }
    table
}

// =============================================================================
// MemTable Tests
// =============================================================================

#[test]
fn test_put_and_get() {
    let table = MemTable::new("t");
    put(&table, "row", "f", "q", "v", 10);

    let row = table.get(b"row").unwrap().unwrap();

    assert_eq!(row.key, Bytes::from_static(b"row"));
    assert_eq!(row.value("f", "q"), Some(&Bytes::from_static(b"v")));
    assert_eq!(row.cells[0].timestamp, 10);
}

#[test]
fn test_get_missing_row() {
    let table = MemTable::new("t");
    assert!(table.get(b"nope").unwrap().is_none());
}

#[test]
fn test_last_write_wins_per_cell() {
    let table = MemTable::new("t");
    put(&table, "row", "f", "a", "1", 1);
    put(&table, "row", "f", "b", "2", 1);
    put(&table, "row", "f", "a", "3", 2);

    let row = table.get(b"row").unwrap().unwrap();

    assert_eq!(row.cells.len(), 2);
    assert_eq!(row.value("f", "a"), Some(&Bytes::from_static(b"3")));
    assert_eq!(row.value("f", "b"), Some(&Bytes::from_static(b"2")));
}

#[test]
fn test_cells_ordered_by_column() {
    let table = MemTable::new("t");
    put(&table, "row", "z", "a", "1", 1);
    put(&table, "row", "a", "z", "2", 1);
    put(&table, "row", "a", "b", "3", 1);

    let row = table.get(b"row").unwrap().unwrap();
    let columns: Vec<(&str, &str)> = row
        .cells
        .iter()
        .map(|c| (c.family.as_str(), c.qualifier.as_str()))
        .collect();

    assert_eq!(columns, vec![("a", "b"), ("a", "z"), ("z", "a")]);
}

#[test]
fn test_delete_removes_row() {
    let table = seeded_table();
    table.delete(b"c").unwrap();

    assert!(table.get(b"c").unwrap().is_none());
    assert_eq!(table.row_count(), 4);
}

#[test]
fn test_put_batch() {
    let table = MemTable::new("t");
    let mutations: Vec<RowMutation> = (0..3)
        .map(|i| {
            let mut m = RowMutation::new(Bytes::from(format!("k{}", i)), 1);
            m.add("f", "q", Bytes::from_static(b"v"));
            m
        })
        .collect();

    table.put_batch(&mutations).unwrap();

    assert_eq!(table.row_count(), 3);
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_all_in_order() {
    let table = MemTable::new("t");
    for key in ["m", "b", "x", "a"] {
        put(&table, key, "f", "q", key, 1);
    }

    assert_eq!(scan_keys(&table, ScanSpec::default()), vec!["a", "b", "m", "x"]);
}

#[test]
fn test_scan_start_inclusive_stop_exclusive() {
    let table = seeded_table();
    let spec = ScanSpec {
        start: Some(Bytes::from_static(b"b")),
        stop: Some(Bytes::from_static(b"d")),
        filter: None,
    };

    assert_eq!(scan_keys(&table, spec), vec!["b", "c"]);
}

#[test]
fn test_scan_start_between_keys() {
    let table = seeded_table();
    let spec = ScanSpec::from_start(Some(Bytes::from_static(b"bb")));

    assert_eq!(scan_keys(&table, spec), vec!["c", "d", "e"]);
}

#[test]
fn test_scan_inverted_range_is_empty() {
    let table = seeded_table();
    let spec = ScanSpec {
        start: Some(Bytes::from_static(b"d")),
        stop: Some(Bytes::from_static(b"b")),
        filter: None,
    };

    assert!(scan_keys(&table, spec).is_empty());
}

#[test]
fn test_scan_with_page_limit_stops_examining() {
    let table = seeded_table();
    let spec = ScanSpec {
        filter: Some(ScanFilter::new(None, Some(2))),
        ..ScanSpec::default()
    };

    assert_eq!(scan_keys(&table, spec), vec!["a", "b"]);
    assert_eq!(table.rows_examined(), 2);
}

#[test]
fn test_scan_with_predicate() {
    let table = MemTable::new("t");
    put(&table, "a", "f", "color", "red", 1);
    put(&table, "b", "f", "color", "blue", 1);
    put(&table, "c", "f", "color", "red", 1);
    put(&table, "d", "f", "size", "big", 1);

    let predicate = Predicate::Column {
        family: "f".to_string(),
        qualifier: "color".to_string(),
        op: CompareOp::Equal,
        value: Bytes::from_static(b"red"),
    };
    let spec = ScanSpec {
        filter: Some(ScanFilter::new(Some(predicate), None)),
        ..ScanSpec::default()
    };

    assert_eq!(scan_keys(&table, spec), vec!["a", "c"]);
    assert_eq!(table.rows_examined(), 4);
}

#[test]
fn test_scan_while_match_halts() {
    let table = MemTable::new("t");
    put(&table, "a", "f", "color", "red", 1);
    put(&table, "b", "f", "color", "red", 1);
    put(&table, "c", "f", "color", "blue", 1);
    put(&table, "d", "f", "color", "red", 1);

    let predicate = Predicate::WhileMatch(Box::new(Predicate::Column {
        family: "f".to_string(),
        qualifier: "color".to_string(),
        op: CompareOp::Equal,
        value: Bytes::from_static(b"red"),
    }));
    let spec = ScanSpec {
        filter: Some(ScanFilter::new(Some(predicate), None)),
        ..ScanSpec::default()
    };

    table.reset_scan_counters();
    assert_eq!(scan_keys(&table, spec), vec!["a", "b"]);
    assert_eq!(table.rows_examined(), 3);
}

// =============================================================================
// Batched Scan Tests
// =============================================================================

fn batched_table(batch: usize) -> MemTable {
    let table = MemTable::with_scan_batch("t", batch);
    for key in ["a", "b", "c", "d", "e"] {
        put(&table, key, "f", "q", key, 1);
    }
    table
}

#[test]
fn test_batched_scan_returns_every_row_in_order() {
    let table = batched_table(2);
    let spec = ScanSpec {
        start: Some(Bytes::from_static(b"b")),
        stop: Some(Bytes::from_static(b"e")),
        filter: None,
    };

    assert_eq!(scan_keys(&table, spec), vec!["b", "c", "d"]);
    assert_eq!(table.rows_materialized(), 3);
}

#[test]
fn test_page_limit_stops_copying_rows() {
    let table = batched_table(2);
    let spec = ScanSpec {
        filter: Some(ScanFilter::new(None, Some(2))),
        ..ScanSpec::default()
    };

    assert_eq!(scan_keys(&table, spec), vec!["a", "b"]);
    assert_eq!(table.rows_materialized(), 2);
}

#[test]
fn test_while_match_stops_copying_rows() {
    let table = MemTable::with_scan_batch("t", 1);
    for (key, color) in [("a", "red"), ("b", "blue"), ("c", "red"), ("d", "red")] {
        put(&table, key, "f", "color", color, 1);
    }
    let predicate = Predicate::WhileMatch(Box::new(Predicate::Column {
        family: "f".to_string(),
        qualifier: "color".to_string(),
        op: CompareOp::Equal,
        value: Bytes::from_static(b"red"),
    }));
    let spec = ScanSpec {
        filter: Some(ScanFilter::new(Some(predicate), None)),
        ..ScanSpec::default()
    };

    assert_eq!(scan_keys(&table, spec), vec!["a"]);
    assert_eq!(table.rows_materialized(), 2);
}

#[test]
fn test_unconsumed_scan_copies_nothing() {
    let table = batched_table(2);

    let mut rows = table.scan(ScanSpec::default()).unwrap();
    assert_eq!(table.rows_materialized(), 0);

    rows.next().unwrap().unwrap();
    assert_eq!(table.rows_materialized(), 2);
}

#[test]
fn test_batched_scan_resumes_after_last_key() {
    let table = batched_table(2);
    let mut rows = table.scan(ScanSpec::default()).unwrap();

    let first = rows.next().unwrap().unwrap();
    assert_eq!(first.key, Bytes::from_static(b"a"));

    // "d" is dropped before the second batch is read
    table.delete(b"d").unwrap();
    let rest: Vec<Row> = rows.map(|r| r.unwrap()).collect();

    assert_eq!(keys(rest), vec!["b", "c", "e"]);
}

#[test]
fn test_store_tables_use_configured_scan_batch() {
    let config = Config::builder().scan_batch_size(3).build();
    let store = MemStore::with_config(&config);
    let table = store.create_table("t");
    for key in ["a", "b", "c", "d", "e"] {
        put(&table, key, "f", "q", key, 1);
    }

    let mut rows = table.scan(ScanSpec::default()).unwrap();
    rows.next().unwrap().unwrap();
    assert_eq!(table.rows_materialized(), 3);
}

#[test]
fn test_config_rejects_zero_scan_batch() {
    let config = Config::builder().scan_batch_size(0).build();
    assert!(matches!(config.validate(), Err(ColmapError::Config(_))));
}

#[test]
fn test_zero_scan_batch_is_clamped() {
    let table = batched_table(0);

    assert_eq!(scan_keys(&table, ScanSpec::default()).len(), 5);
}

// =============================================================================
// MemStore Tests
// =============================================================================

#[test]
fn test_store_auto_creates_tables() {
    let store = MemStore::new();
    let table = store.open_table("fresh").unwrap();

    assert_eq!(table.name(), "fresh");
    assert_eq!(store.table_names(), vec!["fresh".to_string()]);
}

#[test]
fn test_store_without_auto_create_fails() {
    let config = Config::builder().auto_create_tables(false).build();
    let store = MemStore::with_config(&config);

    assert!(matches!(store.open_table("missing"), Err(ColmapError::Store(_))));

    store.create_table("present");
    assert!(store.open_table("present").is_ok());
}

#[test]
fn test_store_handles_share_table() {
    let store = MemStore::new();
    let first = store.open_table("shared").unwrap();
    let second = store.open_table("shared").unwrap();

    let mut mutation = RowMutation::new(Bytes::from_static(b"k"), 1);
    mutation.add("f", "q", Bytes::from_static(b"v"));
    first.put(&mutation).unwrap();

    assert!(second.get(b"k").unwrap().is_some());
}

// =============================================================================
// Pool Tests
// =============================================================================

#[test]
fn test_pool_rejects_zero_bound() {
    let config = Config::builder().pool_max_handles(0).build();
    let result = TablePool::new(Arc::new(MemStore::new()), &config);
    assert!(matches!(result, Err(ColmapError::Config(_))));
}

#[test]
fn test_pool_release_on_drop_and_reuse() {
    let (_store, pool) = setup_pool(&Config::default());

    {
        let handle = pool.acquire("users").unwrap();
        assert_eq!(handle.name(), "users");
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.idle_handles("users"), 0);
    }

    assert_eq!(pool.in_use(), 0);
    assert_eq!(pool.idle_handles("users"), 1);

    let _again = pool.acquire("users").unwrap();
    assert_eq!(pool.idle_handles("users"), 0);
}

#[test]
fn test_pool_timeout_when_exhausted() {
    let config = Config::builder()
        .pool_max_handles(1)
        .pool_acquire_timeout_ms(20)
        .build();
    let (_store, pool) = setup_pool(&config);

    let _held = pool.acquire("a").unwrap();
    let result = pool.acquire("b");

    match result {
        Err(ColmapError::PoolTimeout { table, waited_ms }) => {
            assert_eq!(table, "b");
            assert_eq!(waited_ms, 20);
        }
        Err(other) => panic!("expected timeout, got {:?}", other),
        Ok(_) => panic!("expected timeout"),
    }
}

#[test]
fn test_pool_failed_open_returns_permit() {
    let config = Config::builder()
        .pool_max_handles(1)
        .pool_acquire_timeout_ms(20)
        .auto_create_tables(false)
        .build();
    let (store, pool) = setup_pool(&config);
    store.create_table("real");

    assert!(pool.acquire("missing").is_err());
    assert!(pool.acquire("missing").is_err());
    assert!(pool.acquire("real").is_ok());
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_pool_waiter_gets_released_handle() {
    let config = Config::builder()
        .pool_max_handles(1)
        .pool_acquire_timeout_ms(2_000)
        .build();
    let (_store, pool) = setup_pool(&config);

    let held = pool.acquire("t").unwrap();
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire("t").map(|h| h.name().to_string()))
    };

    thread::sleep(Duration::from_millis(20));
    drop(held);

    assert_eq!(waiter.join().unwrap().unwrap(), "t");
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_pool_concurrent_acquire_release() {
    let config = Config::builder().pool_max_handles(4).build();
    let (_store, pool) = setup_pool(&config);
    let mut handles = vec![];

    for i in 0..8 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for j in 0..50 {
                let table = pool.acquire(&format!("t{}", (i + j) % 3)).unwrap();
                let mut mutation = RowMutation::new(Bytes::from(format!("{}-{}", i, j)), 1);
                mutation.add("f", "q", Bytes::from_static(b"v"));
                table.put(&mutation).unwrap();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(pool.in_use(), 0);
}
