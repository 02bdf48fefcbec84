//! Tests for bulk operations
//!
//! These tests verify:
//! - write_many / read_many / delete_many semantics
//! - Bucket creation on write, required existence on read/delete
//! - Reply messages produced at the operation boundary

use bucketkv::protocol::{Request, Status, Verb};
use bucketkv::{ErrorKind, KvError, Keystore};

use super::{keystore, setup_engine};

const NO_KEYS: &[&str] = &[];

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_write_then_read_all_returns_exactly_what_was_written() {
    let (_temp, engine) = setup_engine();
    let entries = keystore(&[("apple", "red"), ("pear", "green"), ("fig", "purple")]);

    let written = engine.write_many("shop", "food", &entries).unwrap();
    let read = engine.read_many("shop", "food", NO_KEYS).unwrap();

    assert_eq!(written, 3);
    assert_eq!(read, entries);
}

#[test]
fn test_write_upserts_existing_keys() {
    let (_temp, engine) = setup_engine();

    engine
        .write_many("shop", "food", &keystore(&[("apple", "red"), ("pear", "green")]))
        .unwrap();
    engine
        .write_many("shop", "food", &keystore(&[("apple", "yellow")]))
        .unwrap();

    let read = engine.read_many("shop", "food", NO_KEYS).unwrap();
    assert_eq!(read, keystore(&[("apple", "yellow"), ("pear", "green")]));
}

#[test]
fn test_read_selected_keys_omits_missing_ones() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many("shop", "food", &keystore(&[("apple", "red"), ("pear", "green")]))
        .unwrap();

    let read = engine
        .read_many("shop", "food", &["apple", "banana"])
        .unwrap();

    assert_eq!(read, keystore(&[("apple", "red")]));
}

#[test]
fn test_scan_is_in_key_byte_order() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many("shop", "food", &keystore(&[("b", "2"), ("a", "1"), ("B", "0"), ("c", "3")]))
        .unwrap();

    let handle = engine.open_handle("shop").unwrap();
    let keys = handle
        .run_read(|txn| {
            Ok(txn
                .lookup_bucket("food")?
                .iter()
                .map(|(k, _)| String::from_utf8(k.to_vec()).unwrap())
                .collect::<Vec<_>>())
        })
        .unwrap();

    assert_eq!(keys, vec!["B", "a", "b", "c"]);
}

// =============================================================================
// Bucket Existence Tests
// =============================================================================

#[test]
fn test_read_missing_bucket_is_bucket_not_found() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many("shop", "food", &keystore(&[("apple", "red")]))
        .unwrap();

    let err = engine.read_many("shop", "ghost", NO_KEYS).unwrap_err();
    assert!(matches!(err, KvError::BucketNotFound { ref bucket } if bucket == "ghost"));

    let err = engine.read_many("shop", "ghost", &["apple"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BucketNotFound);
}

#[test]
fn test_read_missing_bucket_in_fresh_database() {
    let (_temp, engine) = setup_engine();

    let err = engine.read_many("brand_new", "ghost", NO_KEYS).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BucketNotFound);
    assert!(engine.database_path("brand_new").exists());
}

#[test]
fn test_delete_missing_bucket_is_bucket_not_found() {
    let (_temp, engine) = setup_engine();

    let err = engine.delete_many("shop", "ghost", &["apple"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BucketNotFound);

    // Delete must not have created the bucket
    let err = engine.read_many("shop", "ghost", NO_KEYS).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BucketNotFound);
}

#[test]
fn test_empty_bucket_is_distinct_from_missing_bucket() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many("shop", "food", &keystore(&[("apple", "red")]))
        .unwrap();
    engine.delete_many("shop", "food", &["apple"]).unwrap();

    let read = engine.read_many("shop", "food", NO_KEYS).unwrap();
    assert!(read.is_empty());
}

#[test]
fn test_empty_write_still_creates_bucket() {
    let (_temp, engine) = setup_engine();

    let written = engine.write_many("shop", "food", &Keystore::new()).unwrap();

    assert_eq!(written, 0);
    assert!(engine.read_many("shop", "food", NO_KEYS).unwrap().is_empty());
}

#[test]
fn test_buckets_and_databases_are_separate_namespaces() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many("shop", "food", &keystore(&[("apple", "red")]))
        .unwrap();
    engine
        .write_many("shop", "drink", &keystore(&[("apple", "juice")]))
        .unwrap();
    engine
        .write_many("farm", "food", &keystore(&[("apple", "green")]))
        .unwrap();

    assert_eq!(
        engine.read_many("shop", "food", &["apple"]).unwrap(),
        keystore(&[("apple", "red")])
    );
    assert_eq!(
        engine.read_many("shop", "drink", &["apple"]).unwrap(),
        keystore(&[("apple", "juice")])
    );
    assert_eq!(
        engine.read_many("farm", "food", &["apple"]).unwrap(),
        keystore(&[("apple", "green")])
    );
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_then_read_same_keys_is_empty() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many(
            "shop",
            "food",
            &keystore(&[("apple", "red"), ("pear", "green"), ("fig", "purple")]),
        )
        .unwrap();

    engine.delete_many("shop", "food", &["apple", "fig"]).unwrap();

    assert!(engine
        .read_many("shop", "food", &["apple", "fig"])
        .unwrap()
        .is_empty());
    assert_eq!(
        engine.read_many("shop", "food", NO_KEYS).unwrap(),
        keystore(&[("pear", "green")])
    );
}

#[test]
fn test_delete_count_is_keys_requested() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many("shop", "food", &keystore(&[("apple", "red")]))
        .unwrap();

    let count = engine
        .delete_many("shop", "food", &["apple", "never-written"])
        .unwrap();

    assert_eq!(count, 2);
}

#[test]
fn test_delete_with_no_keys_is_noop() {
    let (_temp, engine) = setup_engine();
    engine
        .write_many("shop", "food", &keystore(&[("apple", "red")]))
        .unwrap();

    assert_eq!(engine.delete_many("shop", "food", NO_KEYS).unwrap(), 0);
    assert_eq!(engine.read_many("shop", "food", NO_KEYS).unwrap().len(), 1);
}

// =============================================================================
// Input Validation Tests
// =============================================================================

#[test]
fn test_empty_names_are_invalid_input() {
    let (temp, engine) = setup_engine();
    let entries = keystore(&[("apple", "red")]);

    assert_eq!(
        engine.write_many("", "food", &entries).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        engine.write_many("shop", "", &entries).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        engine.read_many("", "food", NO_KEYS).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        engine.delete_many("shop", "", NO_KEYS).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );

    // Rejected before any storage access
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_empty_key_aborts_whole_batch() {
    let (_temp, engine) = setup_engine();

    let err = engine
        .write_many("shop", "food", &keystore(&[("", "nothing"), ("apple", "red")]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        engine.read_many("shop", "food", NO_KEYS).unwrap_err().kind(),
        ErrorKind::BucketNotFound
    );
}

// =============================================================================
// Operation Boundary Tests
// =============================================================================

#[test]
fn test_execute_shop_scenario() {
    let (_temp, engine) = setup_engine();

    let response = engine.execute(
        Verb::Write,
        &Request::new("shop", "food", keystore(&[("apple", "red"), ("pear", "green")])),
    );
    assert_eq!(response.status, Status::Ok);
    assert!(response.reply.success);
    assert_eq!(response.reply.message, "Updated 2 keys in food");
    assert_eq!(response.reply.count, 2);

    let response = engine.execute(Verb::Read, &Request::new("shop", "food", Keystore::new()));
    assert!(response.reply.success);
    assert_eq!(
        response.reply.keystore,
        keystore(&[("apple", "red"), ("pear", "green")])
    );
    assert_eq!(response.reply.message, "Got 2 keys in food");

    let response = engine.execute(
        Verb::Delete,
        &Request::new("shop", "food", keystore(&[("apple", "")])),
    );
    assert!(response.reply.success);
    assert_eq!(response.reply.message, "Deleted 1 keys in food");

    let response = engine.execute(Verb::Read, &Request::new("shop", "food", Keystore::new()));
    assert!(response.reply.success);
    assert_eq!(response.reply.keystore, keystore(&[("pear", "green")]));
}

#[test]
fn test_execute_ghost_bucket_reply() {
    let (_temp, engine) = setup_engine();

    let response = engine.execute(Verb::Read, &Request::new("shop", "ghost", Keystore::new()));

    assert_eq!(response.status, Status::NotFound);
    assert!(!response.reply.success);
    assert_eq!(response.reply.message, "Error: 'Bucket does not exist'");
    assert!(response.reply.keystore.is_empty());
}

#[test]
fn test_execute_invalid_input_reply() {
    let (_temp, engine) = setup_engine();

    let response = engine.execute(
        Verb::Write,
        &Request::new("", "food", keystore(&[("apple", "red")])),
    );

    assert_eq!(response.status, Status::BadRequest);
    assert!(!response.reply.success);
    assert!(response.reply.message.starts_with("Error: 'Invalid input"));
}
