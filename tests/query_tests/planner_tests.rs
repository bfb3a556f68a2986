//! Tests for query planning
//!
//! These tests verify:
//! - Direct versus index strategy selection
//! - Start key derivation and explicit overrides
//! - Hint preference and equality preference
//! - Query failures surfaced from the store

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use bytes::Bytes;
use colmap::codec::{encode, ordered_bytes, Value};
use colmap::config::Config;
use colmap::mapping::Entity;
use colmap::query::{and, eq, ne, or, require, Query, QueryOpts, QueryPlanner, StrategyKind};
use colmap::store::MemStore;
use colmap::ColmapError;

use common::{setup_pool, Event, Ticket, User};

// =============================================================================
// Helper Functions
// =============================================================================

fn planner<E: Entity>() -> QueryPlanner {
    QueryPlanner::new(E::metadata().unwrap())
}

fn kind_prefix(kind: i32) -> Bytes {
    Bytes::from(ordered_bytes(i64::from(kind), false))
}

// =============================================================================
// Strategy Selection Tests
// =============================================================================

#[test]
fn test_no_criteria_is_direct_scan() {
    let strategy = planner::<Event>().plan(&QueryOpts::default(), None, None).unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Direct);
    assert_eq!(strategy.table(), "events");
    assert_eq!(strategy.start_key(), None);
}

#[test]
fn test_unindexed_criteria_is_direct_scan() {
    let criteria = eq("title", "x");
    let strategy = planner::<Event>()
        .plan(&QueryOpts::default(), Some(&criteria), None)
        .unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Direct);
}

#[test]
fn test_indexed_eq_is_index_scan() {
    let criteria = eq("kind", 2);
    let strategy = planner::<Event>()
        .plan(&QueryOpts::default(), Some(&criteria), None)
        .unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Index);
    assert_eq!(strategy.table(), "events-by_kind");
    assert_eq!(strategy.start_key(), Some(&kind_prefix(2)));
}

#[test]
fn test_indexes_disabled_is_direct_scan() {
    let criteria = eq("kind", 2);
    let opts = QueryOpts::default().use_indexes(false);
    let strategy = planner::<Event>().plan(&opts, Some(&criteria), None).unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Direct);
    assert_eq!(strategy.start_key(), None);
}

#[test]
fn test_unknown_property_fails_planning() {
    let criteria = eq("nope", 1);
    let result = planner::<Event>().plan(&QueryOpts::default(), Some(&criteria), None);
    assert!(matches!(result, Err(ColmapError::Mapping { .. })));
}

// =============================================================================
// Start Key Tests
// =============================================================================

#[test]
fn test_explicit_start_key_wins() {
    let criteria = eq("kind", 2);
    let opts = QueryOpts::default().start_key(Bytes::from_static(b"explicit"));
    let strategy = planner::<Event>().plan(&opts, Some(&criteria), None).unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Index);
    assert_eq!(strategy.start_key(), Some(&Bytes::from_static(b"explicit")));
}

#[test]
fn test_start_time_extends_start_key() {
    let criteria = eq("kind", 2);
    let opts = QueryOpts::default().start_time(5_000);
    let strategy = planner::<Event>().plan(&opts, Some(&criteria), None).unwrap();

    let mut expected = ordered_bytes(2, false);
    expected.push(b'-');
    expected.extend(ordered_bytes(5_000, true));
    assert_eq!(strategy.start_key(), Some(&Bytes::from(expected)));
}

#[test]
fn test_start_key_under_require_and_and() {
    let criteria = require(and([eq("title", "t"), eq("kind", 7)]));
    let strategy = planner::<Event>()
        .plan(&QueryOpts::default(), Some(&criteria), None)
        .unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Index);
    assert_eq!(strategy.start_key(), Some(&kind_prefix(7)));
}

#[test]
fn test_ne_on_index_scans_from_minimum() {
    let criteria = ne("kind", 2);
    let strategy = planner::<Event>()
        .plan(&QueryOpts::default(), Some(&criteria), None)
        .unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Index);
    assert_eq!(strategy.start_key(), None);
}

#[test]
fn test_eq_inside_or_scans_from_minimum() {
    let criteria = or([eq("kind", 1), eq("kind", 2)]);
    let strategy = planner::<Event>()
        .plan(&QueryOpts::default(), Some(&criteria), None)
        .unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Index);
    assert_eq!(strategy.start_key(), None);
}

#[test]
fn test_text_primary_start_key_is_encoded_literal() {
    let criteria = eq("priority", 4);
    let strategy = planner::<Ticket>()
        .plan(&QueryOpts::default(), Some(&criteria), None)
        .unwrap();

    assert_eq!(strategy.table(), "tickets-by_priority");
    assert_eq!(strategy.start_key(), Some(&kind_prefix(4)));

    let sharded = eq("status", "open");
    let strategy = planner::<Ticket>()
        .plan(&QueryOpts::default(), Some(&sharded), None)
        .unwrap();
    let encoded = encode(&Value::from("open")).unwrap();
    let mut expected = format!("{:02}-", crc32fast::hash(&encoded) % 100).into_bytes();
    expected.extend(encoded);
    assert_eq!(strategy.table(), "tickets-by_status");
    assert_eq!(strategy.start_key(), Some(&Bytes::from(expected)));
}

// =============================================================================
// Index Preference Tests
// =============================================================================

#[test]
fn test_eq_preferred_over_earlier_ne() {
    let criteria = and([ne("status", "closed"), eq("priority", 1)]);
    let strategy = planner::<Ticket>()
        .plan(&QueryOpts::default(), Some(&criteria), None)
        .unwrap();

    assert_eq!(strategy.table(), "tickets-by_priority");
}

#[test]
fn test_hint_preferred_over_criteria() {
    let criteria = and([eq("priority", 1), eq("status", "open")]);
    let hint = eq("status", "open");
    let strategy = planner::<Ticket>()
        .plan(&QueryOpts::default(), Some(&criteria), Some(&hint))
        .unwrap();

    assert_eq!(strategy.table(), "tickets-by_status");
}

#[test]
fn test_hint_alone_selects_index_without_filtering() {
    let config = Config::default();
    let (_store, pool) = setup_pool(&config);
    let query: Query<Event> =
        Query::new(pool, Event::metadata().unwrap(), QueryOpts::default()).using(eq("kind", 3));

    let strategy = query.plan().unwrap();

    assert_eq!(strategy.kind(), StrategyKind::Index);
    assert!(query.criteria().is_none());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_missing_index_table_is_query_failure() {
    let config = Config::builder().auto_create_tables(false).build();
    let (store, pool) = setup_pool(&config);
    store.create_table("events");

    let query: Query<Event> =
        Query::new(Arc::clone(&pool), Event::metadata().unwrap(), QueryOpts::default())
            .filter(eq("kind", 1));
    let result = query.execute();

    match result {
        Err(ColmapError::Query(cause)) => assert!(matches!(*cause, ColmapError::Store(_))),
        Err(other) => panic!("expected query failure, got {:?}", other),
        Ok(_) => panic!("expected query failure"),
    }
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_direct_scan_on_missing_table_is_query_failure() {
    let config = Config::builder().auto_create_tables(false).build();
    let store = Arc::new(MemStore::with_config(&config));
    let pool = colmap::store::TablePool::new(store, &config).unwrap();

    let query: Query<User> = Query::new(pool, User::metadata().unwrap(), QueryOpts::default());

    assert!(matches!(query.execute(), Err(ColmapError::Query(_))));
}
