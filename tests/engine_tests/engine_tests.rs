//! Tests for WalEngine statements
//!
//! These tests verify:
//! - Insert/select/update/remove semantics
//! - Duplicate and missing keys are no-ops that log nothing
//! - Rejected statements leave the log untouched
//! - Log order matches apply order
//! - Engine lifecycle (open/close, read-only, durability cadence)

use std::thread;
use std::time::{Duration, Instant};

use heapwal::index::IndexKind;
use heapwal::wal::OpType;
use heapwal::{
    Catalog, Config, HeapWalError, IndexDef, Outcome, Projection, Record, Statement,
    StatementResult, TableDef, Value, WalEngine,
};
use tempfile::TempDir;

use super::*;

fn setup_temp_engine() -> (TempDir, WalEngine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path());
    (temp_dir, engine)
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_open_creates_files() {
    let temp_dir = TempDir::new().unwrap();
    let fs_path = temp_dir.path().join("db");

    let engine = open_engine(&fs_path);

    assert!(fs_path.join("log").exists());
    assert!(fs_path.join("people").exists());
    assert!(engine.is_ready());
    assert!(!engine.is_read_only());
    engine.close().unwrap();
}

#[test]
fn test_open_rejects_bad_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().fs_path(temp_dir.path()).gc_interval_ms(0).build();

    let result = WalEngine::open(config, people_catalog(), false);

    assert!(matches!(result, Err(HeapWalError::Config(_))));
}

#[test]
fn test_open_rejects_bad_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Catalog::new().with_table(TableDef::new(
        "people",
        MAX_TUPLE_SIZE,
        people_schema(),
        vec![IndexDef::new([9])],
    ));

    let result = WalEngine::open(test_config(temp_dir.path()), catalog, false);

    assert!(matches!(result, Err(HeapWalError::Config(_))));
}

#[test]
fn test_group_commit_makes_log_durable() {
    let (_temp, engine) = setup_temp_engine();

    for id in 1..=10 {
        engine
            .insert(Statement::insert(id as u64, PEOPLE, person(id, "p", &format!("p{}@x", id), 20)))
            .unwrap();
    }
    assert_eq!(engine.log_appended(), 10);

    let deadline = Instant::now() + Duration::from_secs(2);
    while engine.log_synced() < 10 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(engine.log_synced(), 10);
    assert!(engine.log_sync_count() > 0);
}

#[test]
fn test_truncate_on_open_discards_state() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open_engine(temp_dir.path());
        engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
        engine.close().unwrap();
    }

    let config = Config::builder()
        .fs_path(temp_dir.path())
        .truncate_on_open(true)
        .build();
    let engine = WalEngine::open(config, people_catalog(), false).unwrap();
    engine.recover().unwrap();

    assert_eq!(engine.table_len(PEOPLE).unwrap(), 0);
    assert_eq!(engine.heap_slot_count(PEOPLE).unwrap(), 0);
    assert!(log_entries(engine.log_path()).is_empty());
}

#[test]
fn test_txn_brackets_are_accepted() {
    let (_temp, engine) = setup_temp_engine();

    engine.txn_begin();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
    engine.txn_end(true);

    assert!(select_id(&engine, 1).is_some());
}

// =============================================================================
// Insert / Select Tests
// =============================================================================

#[test]
fn test_insert_then_select() {
    let (_temp, engine) = setup_temp_engine();

    let outcome = engine
        .insert(Statement::insert(1, PEOPLE, person(1, "Ada Lovelace", "ada@x", 36)))
        .unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(select_id(&engine, 1).as_deref(), Some("1 Ada Lovelace ada@x 36"));
    assert_eq!(engine.table_len(PEOPLE).unwrap(), 1);
}

#[test]
fn test_select_missing_key() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(select_id(&engine, 42), None);
}

#[test]
fn test_select_through_secondary_index() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
    engine.insert(Statement::insert(2, PEOPLE, person(2, "Bob", "bob@x", 41))).unwrap();

    let row = engine
        .select(Statement::select(3, PEOPLE, 1, by_email("bob@x"), Projection::All))
        .unwrap();

    assert_eq!(row.as_deref(), Some("2 Bob bob@x 41"));
    assert_eq!(engine.index_len(PEOPLE, 1).unwrap(), 2);
}

#[test]
fn test_null_and_empty_text_keys_are_distinct() {
    let (_temp, engine) = setup_temp_engine();
    let no_email = Record::from_values(vec![Value::Int(1), Value::from("Ada"), Value::Null, Value::Int(36)]);

    let first = engine.insert(Statement::insert(1, PEOPLE, no_email)).unwrap();
    let second = engine.insert(Statement::insert(2, PEOPLE, person(2, "Bob", "", 41))).unwrap();

    assert_eq!((first, second), (Outcome::Applied, Outcome::Applied));
    assert_eq!(engine.index_len(PEOPLE, 1).unwrap(), 2);
    let row = engine
        .select(Statement::select(3, PEOPLE, 1, by_email(""), Projection::All))
        .unwrap();
    assert!(row.is_some_and(|r| r.starts_with("2 ")));
}

#[test]
fn test_select_projection() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    let row = engine
        .select(Statement::select(2, PEOPLE, 0, by_id(1), Projection::Fields(vec![AGE, NAME])))
        .unwrap();

    assert_eq!(row.as_deref(), Some("36 Ada"));
}

#[test]
fn test_select_is_not_logged() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    select_id(&engine, 1);
    select_id(&engine, 2);

    assert_eq!(engine.log_appended(), 1);
}

#[test]
fn test_duplicate_insert_keeps_first_value() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    let outcome = engine
        .insert(Statement::insert(2, PEOPLE, person(1, "Bob", "bob@x", 41)))
        .unwrap();

    assert_eq!(outcome, Outcome::Duplicate);
    assert_eq!(select_id(&engine, 1).as_deref(), Some("1 Ada ada@x 36"));
    assert_eq!(engine.log_appended(), 1);
    assert_eq!(engine.heap_slot_count(PEOPLE).unwrap(), 1);
}

#[test]
fn test_insert_over_capacity_rejected_before_logging() {
    let (_temp, engine) = setup_temp_engine();
    let long_name = "n".repeat(MAX_TUPLE_SIZE);

    let result = engine.insert(Statement::insert(1, PEOPLE, person(1, &long_name, "a@x", 1)));

    assert!(matches!(result, Err(HeapWalError::CapacityExceeded { .. })));
    assert_eq!(engine.log_appended(), 0);
    assert_eq!(engine.heap_slot_count(PEOPLE).unwrap(), 0);
    assert_eq!(select_id(&engine, 1), None);
}

#[test]
fn test_insert_with_wrong_field_type_rejected() {
    let (_temp, engine) = setup_temp_engine();
    let mut record = person(1, "Ada", "ada@x", 36);
    record.set(AGE, "thirty-six");

    let result = engine.insert(Statement::insert(1, PEOPLE, record));

    assert!(matches!(result, Err(HeapWalError::Serialization(_))));
    assert_eq!(engine.log_appended(), 0);
}

#[test]
fn test_unknown_table_and_index() {
    let (_temp, engine) = setup_temp_engine();

    let table = engine.select(Statement::select(1, 7, 0, by_id(1), Projection::All));
    let index = engine.select(Statement::select(1, PEOPLE, 5, by_id(1), Projection::All));

    assert!(matches!(table, Err(HeapWalError::UnknownTable(7))));
    assert!(matches!(
        index,
        Err(HeapWalError::UnknownIndex { table_id: 0, index_id: 5 })
    ));
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_reflects_new_fields() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    let mut record = by_id(1);
    record.set(NAME, "Ada King");
    record.set(AGE, 37i64);
    let outcome = engine
        .update(Statement::update(2, PEOPLE, record, vec![NAME, AGE]))
        .unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(select_id(&engine, 1).as_deref(), Some("1 Ada King ada@x 37"));
    // Updated in place: no new slot
    assert_eq!(engine.heap_slot_count(PEOPLE).unwrap(), 1);
}

#[test]
fn test_update_logs_after_image() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
    engine.update(set_age(2, 1, 40)).unwrap();
    let log_path = engine.log_path().to_path_buf();
    engine.close().unwrap();

    let entries = log_entries(&log_path);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].op_type, OpType::Update);
    assert_eq!(entries[1].payload, "1 Ada ada@x 40");
}

#[test]
fn test_update_missing_key_is_noop() {
    let (_temp, engine) = setup_temp_engine();

    let outcome = engine.update(set_age(1, 99, 40)).unwrap();

    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(engine.log_appended(), 0);
}

#[test]
fn test_update_of_key_field_rejected() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    let mut record = by_id(1);
    record.set(EMAIL, "new@x");
    let secondary = engine.update(Statement::update(2, PEOPLE, record, vec![EMAIL]));
    let primary = engine.update(Statement::update(3, PEOPLE, by_id(1), vec![ID]));

    assert!(matches!(secondary, Err(HeapWalError::KeyFieldUpdate { field_id: EMAIL, .. })));
    assert!(matches!(primary, Err(HeapWalError::KeyFieldUpdate { field_id: ID, .. })));
    assert_eq!(engine.log_appended(), 1);
}

#[test]
fn test_update_of_unknown_field_rejected() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    let result = engine.update(Statement::update(2, PEOPLE, by_id(1), vec![9]));

    assert!(matches!(result, Err(HeapWalError::UnknownField { field_id: 9, .. })));
}

#[test]
fn test_update_over_capacity_rejected_before_logging() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    let mut record = by_id(1);
    record.set(NAME, "n".repeat(MAX_TUPLE_SIZE));
    let result = engine.update(Statement::update(2, PEOPLE, record, vec![NAME]));

    assert!(matches!(result, Err(HeapWalError::CapacityExceeded { .. })));
    assert_eq!(engine.log_appended(), 1);
    assert_eq!(select_id(&engine, 1).as_deref(), Some("1 Ada ada@x 36"));
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove_then_select_not_found() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();

    let outcome = engine.remove(Statement::remove(2, PEOPLE, by_id(1))).unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(select_id(&engine, 1), None);
    let by_mail = engine
        .select(Statement::select(3, PEOPLE, 1, by_email("ada@x"), Projection::All))
        .unwrap();
    assert_eq!(by_mail, None);
    assert_eq!(engine.table_len(PEOPLE).unwrap(), 0);
    assert_eq!(engine.index_len(PEOPLE, 1).unwrap(), 0);
    // Lazy deletion: the slot stays
    assert_eq!(engine.heap_slot_count(PEOPLE).unwrap(), 1);
}

#[test]
fn test_remove_logs_before_image() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
    engine.remove(Statement::remove(2, PEOPLE, by_id(1))).unwrap();
    let log_path = engine.log_path().to_path_buf();
    engine.close().unwrap();

    let entries = log_entries(&log_path);

    assert_eq!(entries[1].op_type, OpType::Remove);
    assert_eq!(entries[1].payload, "1 Ada ada@x 36");
}

#[test]
fn test_remove_missing_key_is_noop() {
    let (_temp, engine) = setup_temp_engine();

    let outcome = engine.remove(Statement::remove(1, PEOPLE, by_id(5))).unwrap();

    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(engine.log_appended(), 0);
}

#[test]
fn test_reinsert_after_remove() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
    engine.remove(Statement::remove(2, PEOPLE, by_id(1))).unwrap();

    let outcome = engine
        .insert(Statement::insert(3, PEOPLE, person(1, "Ada", "ada@y", 37)))
        .unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(select_id(&engine, 1).as_deref(), Some("1 Ada ada@y 37"));
    assert_eq!(engine.heap_slot_count(PEOPLE).unwrap(), 2);
}

// =============================================================================
// Execute / Log Order Tests
// =============================================================================

#[test]
fn test_execute_routes_by_op_type() {
    let (_temp, engine) = setup_temp_engine();

    let inserted = engine
        .execute(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36)))
        .unwrap();
    let selected = engine
        .execute(Statement::select(2, PEOPLE, 0, by_id(1), Projection::Fields(vec![NAME])))
        .unwrap();
    let updated = engine.execute(set_age(3, 1, 37)).unwrap();
    let removed = engine.execute(Statement::remove(4, PEOPLE, by_id(1))).unwrap();
    let missing = engine.execute(Statement::remove(5, PEOPLE, by_id(1))).unwrap();

    assert_eq!(inserted, StatementResult::Write(Outcome::Applied));
    assert_eq!(selected, StatementResult::Row(Some("Ada".to_string())));
    assert_eq!(updated, StatementResult::Write(Outcome::Applied));
    assert_eq!(removed, StatementResult::Write(Outcome::Applied));
    assert_eq!(missing, StatementResult::Write(Outcome::NotFound));
}

#[test]
fn test_log_order_matches_apply_order() {
    let (_temp, engine) = setup_temp_engine();
    engine.insert(Statement::insert(10, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
    engine.insert(Statement::insert(11, PEOPLE, person(2, "Bob", "bob@x", 41))).unwrap();
    engine.update(set_age(12, 2, 42)).unwrap();
    engine.insert(Statement::insert(13, PEOPLE, person(2, "Dup", "dup@x", 1))).unwrap();
    engine.remove(Statement::remove(14, PEOPLE, by_id(1))).unwrap();
    engine.update(set_age(15, 1, 50)).unwrap();
    let log_path = engine.log_path().to_path_buf();
    engine.close().unwrap();

    let logged: Vec<(u64, OpType)> = log_entries(&log_path)
        .iter()
        .map(|e| (e.transaction_id, e.op_type))
        .collect();

    assert_eq!(
        logged,
        vec![
            (10, OpType::Insert),
            (11, OpType::Insert),
            (12, OpType::Update),
            (14, OpType::Remove),
        ]
    );
}

// =============================================================================
// Configuration Variant Tests
// =============================================================================

fn constant_hash(_key: &str) -> u64 {
    7
}

#[test]
fn test_hash_collision_aliases_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .fs_path(temp_dir.path())
        .key_hasher(constant_hash)
        .build();
    let engine = WalEngine::open(config, people_catalog(), false).unwrap();

    engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
    let second = engine
        .insert(Statement::insert(2, PEOPLE, person(2, "Bob", "bob@x", 41)))
        .unwrap();

    // Distinct keys with equal hashes are treated as the same key
    assert_eq!(second, Outcome::Duplicate);
    assert_eq!(select_id(&engine, 2).as_deref(), Some("1 Ada ada@x 36"));
}

#[test]
fn test_ordered_index_engine() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .fs_path(temp_dir.path())
        .index_kind(IndexKind::Ordered)
        .build();
    let engine = WalEngine::open(config, people_catalog(), false).unwrap();

    for id in 1..=5 {
        engine
            .insert(Statement::insert(id as u64, PEOPLE, person(id, "p", &format!("p{}@x", id), 30)))
            .unwrap();
    }
    engine.remove(Statement::remove(6, PEOPLE, by_id(3))).unwrap();
    engine.update(set_age(7, 4, 31)).unwrap();

    assert_eq!(engine.table_len(PEOPLE).unwrap(), 4);
    assert_eq!(select_id(&engine, 3), None);
    assert_eq!(select_id(&engine, 4).as_deref(), Some("4 p p4@x 31"));
}

#[test]
fn test_read_only_rejects_mutations() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open_engine(temp_dir.path());
        engine.insert(Statement::insert(1, PEOPLE, person(1, "Ada", "ada@x", 36))).unwrap();
        engine.close().unwrap();
    }

    let engine = WalEngine::open(test_config(temp_dir.path()), people_catalog(), true).unwrap();

    assert!(engine.is_read_only());
    assert!(!engine.is_ready());
    assert!(matches!(
        engine.insert(Statement::insert(2, PEOPLE, person(2, "Bob", "bob@x", 41))),
        Err(HeapWalError::ReadOnly)
    ));
    assert!(matches!(engine.update(set_age(3, 1, 40)), Err(HeapWalError::ReadOnly)));
    assert!(matches!(
        engine.remove(Statement::remove(4, PEOPLE, by_id(1))),
        Err(HeapWalError::ReadOnly)
    ));
    assert_eq!(engine.log_sync_count(), 0);
}
