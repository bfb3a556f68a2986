//! Tests for entity ↔ row conversion
//!
//! These tests verify:
//! - Round-trips including list and map fields
//! - Null scalars written as empty cells, empty collections written as nothing
//! - Missing row keys rejected
//! - Unmapped and undecodable cells skipped on read
//! - Narrowing on read, and failures that abort the record

#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use colmap::codec::{decode, encode, Value};
use colmap::mapping::{from_row, to_mutation, Entity};
use colmap::store::{Cell, Row, RowMutation};
use colmap::ColmapError;

use common::{Profile, User};

// =============================================================================
// Helper Functions
// =============================================================================

/// What a store would return for a single put of `mutation`
fn stored_row(mutation: &RowMutation) -> Row {
    let mut cells: Vec<Cell> = mutation
        .columns
        .iter()
        .map(|c| Cell {
            family: c.family.clone(),
            qualifier: c.qualifier.clone(),
            value: c.value.clone(),
            timestamp: mutation.timestamp,
        })
        .collect();
    cells.sort_by(|a, b| (&a.family, &a.qualifier).cmp(&(&b.family, &b.qualifier)));
    Row::new(mutation.row_key.clone(), cells)
}

fn cell(family: &str, qualifier: &str, value: &Value) -> Cell {
    Cell {
        family: family.to_string(),
        qualifier: qualifier.to_string(),
        value: Bytes::from(encode(value).unwrap()),
        timestamp: 1,
    }
}

// =============================================================================
// Write Path Tests
// =============================================================================

#[test]
fn test_to_mutation_scalar_cells() {
    let metadata = User::metadata().unwrap();
    let user = User::new("u1", "Ada", 36);

    let mutation = to_mutation(&metadata, &user, 1234).unwrap();

    assert_eq!(mutation.row_key, Bytes::from_static(b"u1"));
    assert_eq!(mutation.timestamp, 1234);
    assert_eq!(mutation.len(), 3);
    let age = mutation.value("profile", "age").unwrap();
    assert_eq!(decode(age).unwrap(), Some(Value::Int(36)));
}

#[test]
fn test_null_scalar_writes_empty_cell() {
    let metadata = User::metadata().unwrap();
    let user = User {
        id: "u2".to_string(),
        ..User::default()
    };

    let mutation = to_mutation(&metadata, &user, 1).unwrap();

    let name = mutation.value("profile", "name").unwrap();
    assert!(name.is_empty());
    assert_eq!(mutation.len(), 3);
}

#[test]
fn test_empty_collections_write_nothing() {
    let metadata = Profile::metadata().unwrap();
    let profile = Profile {
        id: 5,
        ..Profile::default()
    };

    let mutation = to_mutation(&metadata, &profile, 1).unwrap();

    assert!(mutation.columns.iter().all(|c| c.family == "main"));
}

#[test]
fn test_list_and_map_fan_out() {
    let metadata = Profile::metadata().unwrap();
    let profile = Profile::sample(9);

    let mutation = to_mutation(&metadata, &profile, 1).unwrap();

    let tag_1 = mutation.value("tags", "tag_1").unwrap();
    assert_eq!(decode(tag_1).unwrap(), Some(Value::from("hbase")));
    assert!(mutation.value("tags", "tag_3").is_none());

    let city = mutation.value("attrs", "attr:city").unwrap();
    assert_eq!(decode(city).unwrap(), Some(Value::from("Lisbon")));
}

#[test]
fn test_row_key_is_raw_bytes() {
    let metadata = Profile::metadata().unwrap();
    let mutation = to_mutation(&metadata, &Profile::sample(258), 1).unwrap();
    assert_eq!(mutation.row_key.as_ref(), &258i64.to_be_bytes());
}

#[test]
fn test_missing_row_key_rejected() {
    let metadata = User::metadata().unwrap();
    let user = User {
        id: String::new(),
        name: Some("nobody".to_string()),
        ..User::default()
    };

    let result = to_mutation(&metadata, &user, 1);
    assert!(matches!(result, Err(ColmapError::MissingRowKey { .. })));
}

// =============================================================================
// Read Path Tests
// =============================================================================

#[test]
fn test_round_trip_simple() {
    let metadata = User::metadata().unwrap();
    let user = User::new("u3", "Grace", 45);

    let row = stored_row(&to_mutation(&metadata, &user, 1).unwrap());
    let restored: User = from_row(&metadata, &row).unwrap();

    assert_eq!(restored, user);
}

#[test]
fn test_round_trip_every_field_kind() {
    let metadata = Profile::metadata().unwrap();
    let profile = Profile::sample(-42);

    let row = stored_row(&to_mutation(&metadata, &profile, 1).unwrap());
    let restored: Profile = from_row(&metadata, &row).unwrap();

    assert_eq!(restored.id, -42);
    assert_eq!(restored.nickname, profile.nickname);
    assert_eq!(restored.level, profile.level);
    assert_eq!(restored.score, profile.score);
    assert_eq!(restored.ratio, profile.ratio);
    assert_eq!(restored.avatar, profile.avatar);
    assert_eq!(restored.joined, profile.joined);
    assert_eq!(restored.mood, profile.mood);
    assert_eq!(restored.aliases, profile.aliases);
    assert_eq!(restored.attrs, profile.attrs);

    // Element order comes back as stored cell order
    let mut expected = profile.tags.clone();
    let mut got = restored.tags.clone();
    expected.sort();
    got.sort();
    assert_eq!(got, expected);
}

#[test]
fn test_round_trip_nulls() {
    let metadata = User::metadata().unwrap();
    let user = User {
        id: "u4".to_string(),
        ..User::default()
    };

    let row = stored_row(&to_mutation(&metadata, &user, 1).unwrap());
    let restored: User = from_row(&metadata, &row).unwrap();

    assert_eq!(restored, user);
}

#[test]
fn test_unmapped_cells_ignored() {
    let metadata = User::metadata().unwrap();
    let row = Row::new(
        Bytes::from_static(b"u5"),
        vec![
            cell("profile", "name", &Value::from("Linus")),
            cell("profile", "shoe_size", &Value::Int(44)),
            cell("legacy", "whatever", &Value::Bool(true)),
        ],
    );

    let restored: User = from_row(&metadata, &row).unwrap();

    assert_eq!(restored.id, "u5");
    assert_eq!(restored.name.as_deref(), Some("Linus"));
    assert_eq!(restored.age, None);
}

#[test]
fn test_undecodable_cell_skipped() {
    let metadata = User::metadata().unwrap();
    let row = Row::new(
        Bytes::from_static(b"u6"),
        vec![
            Cell {
                family: "profile".to_string(),
                qualifier: "age".to_string(),
                value: Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]),
                timestamp: 1,
            },
            cell("profile", "name", &Value::from("Ken")),
        ],
    );

    let restored: User = from_row(&metadata, &row).unwrap();

    assert_eq!(restored.age, None);
    assert_eq!(restored.name.as_deref(), Some("Ken"));
}

#[test]
fn test_stored_long_narrows_to_short_field() {
    let metadata = Profile::metadata().unwrap();
    let row = Row::new(
        Bytes::copy_from_slice(&7i64.to_be_bytes()),
        vec![cell("main", "level", &Value::Long(12))],
    );

    let restored: Profile = from_row(&metadata, &row).unwrap();

    assert_eq!(restored.id, 7);
    assert_eq!(restored.level, Some(12));
}

#[test]
fn test_narrowing_failure_aborts_record() {
    let metadata = Profile::metadata().unwrap();
    let row = Row::new(
        Bytes::copy_from_slice(&7i64.to_be_bytes()),
        vec![cell("main", "level", &Value::Long(1 << 20))],
    );

    let result: Result<Profile, _> = from_row(&metadata, &row);

    match result {
        Err(ColmapError::PropertyWrite { field, .. }) => assert_eq!(field, "level"),
        other => panic!("expected property write error, got {:?}", other),
    }
}

#[test]
fn test_kind_mismatch_aborts_record() {
    let metadata = User::metadata().unwrap();
    let row = Row::new(
        Bytes::from_static(b"u7"),
        vec![cell("profile", "age", &Value::from("forty"))],
    );

    let result: Result<User, _> = from_row(&metadata, &row);
    assert!(matches!(result, Err(ColmapError::PropertyWrite { .. })));
}

#[test]
fn test_write_coerces_to_declared_type() {
    let metadata = Profile::metadata().unwrap();
    let profile = Profile {
        id: 1,
        level: Some(4),
        ..Profile::default()
    };

    let mutation = to_mutation(&metadata, &profile, 1).unwrap();
    let level = mutation.value("main", "level").unwrap();
    assert_eq!(decode(level).unwrap(), Some(Value::Short(4)));
}
