//! Interpreter Invariant Tests
//!
//! End-to-end checks of the command pipeline:
//! - Operation resolution is case-insensitive
//! - Relaxed literals normalize to the same structures as strict JSON
//! - 24-hex string values are tagged as opaque identifiers
//! - Identity collections are denied for every caller
//! - Arity is enforced and unknown operations fail closed
//! - Structural characters inside quoted strings are not delimiters
//! - Normalizing already-strict JSON is a no-op

use std::sync::Arc;

use docshell::interpreter::{CallerContext, Interpreter};
use docshell::store::{DocumentStore, MemoryStore};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (Arc<MemoryStore>, Interpreter) {
    let store = Arc::new(MemoryStore::new());
    let interpreter = Interpreter::new(store.clone());
    (store, interpreter)
}

fn operator() -> CallerContext {
    CallerContext::authenticated(Uuid::new_v4(), "operator")
}

// =============================================================================
// Case-Insensitive Operation Resolution
// =============================================================================

/// `db.a.Find()` and `db.a.find()` resolve identically.
#[test]
fn test_operation_resolution_is_case_insensitive() {
    let (_store, interpreter) = setup();
    let ctx = operator();
    interpreter.interpret("db.a.insertOne({x: 1})", &ctx);

    let lower = interpreter.interpret("db.a.find()", &ctx);
    let mixed = interpreter.interpret("db.a.Find()", &ctx);
    let upper = interpreter.interpret("db.a.FIND()", &ctx);

    assert!(lower.is_pass());
    assert_eq!(lower.output, mixed.output);
    assert_eq!(lower.output, upper.output);
}

#[test]
fn test_mixed_case_mutations_resolve() {
    let (_store, interpreter) = setup();
    let ctx = operator();

    assert!(interpreter.interpret("db.a.InsertOne({x: 1})", &ctx).is_pass());
    assert!(interpreter
        .interpret("db.a.UPDATEONE({x: 1}, {$set: {x: 2}})", &ctx)
        .is_pass());
}

// =============================================================================
// Normalization Round-Trip
// =============================================================================

/// The relaxed form and the strict form land in the store as equal
/// documents.
#[test]
fn test_relaxed_literal_equals_strict_json() {
    let (store, interpreter) = setup();
    let ctx = operator();

    interpreter.interpret("db.relaxed.insertOne({status:'open', count: 3})", &ctx);
    interpreter.interpret(
        r#"db.strict.insertOne({"status":"open","count":3})"#,
        &ctx,
    );

    let mut relaxed = store.find("relaxed", &json!({}), None).unwrap();
    let mut strict = store.find("strict", &json!({}), None).unwrap();

    // Identifiers are store-assigned and differ; compare the payload
    relaxed[0].as_object_mut().unwrap().remove("_id");
    strict[0].as_object_mut().unwrap().remove("_id");
    assert_eq!(relaxed, strict);
}

/// Already-strict literals are a fixed point of normalization.
#[test]
fn test_strict_json_literal_is_untouched() {
    let (store, interpreter) = setup();
    let ctx = operator();

    let result = interpreter.interpret(
        r#"db.a.insertOne({"nested":{"list":[1,2,3],"ok":true,"none":null}})"#,
        &ctx,
    );
    assert!(result.is_pass(), "{:?}", result);

    let doc = store.find_one("a", &json!({})).unwrap().unwrap();
    assert_eq!(doc["nested"], json!({"list": [1, 2, 3], "ok": true, "none": null}));
}

// =============================================================================
// Opaque Identifier Tagging
// =============================================================================

/// A 24-hex string value is tagged and is distinct from the same
/// characters stored through a strict plain-string path.
#[test]
fn test_hex_identifier_values_are_tagged() {
    let (store, interpreter) = setup();
    let ctx = operator();

    let result = interpreter.interpret(
        "db.a.insertOne({ref: '507f1f77bcf86cd799439011'})",
        &ctx,
    );
    assert!(result.is_pass());

    let doc = store.find_one("a", &json!({})).unwrap().unwrap();
    assert_eq!(doc["ref"], json!({"$oid": "507f1f77bcf86cd799439011"}));
    assert_ne!(doc["ref"], json!("507f1f77bcf86cd799439011"));
}

/// Tagged identifiers round-trip through filters: a filter written with
/// the same hex literal matches the stored tagged value.
#[test]
fn test_identifier_filter_round_trip() {
    let (_store, interpreter) = setup();
    let ctx = operator();

    interpreter.interpret(
        "db.a.insertOne({ref: '507f1f77bcf86cd799439011', n: 1})",
        &ctx,
    );

    let hit = interpreter.interpret("db.a.findOne({ref: '507f1f77bcf86cd799439011'})", &ctx);
    assert!(hit.is_pass());
    assert_eq!(hit.output["n"], 1);
}

/// Strings that are not exactly 24 hex digits stay plain strings.
#[test]
fn test_non_identifier_shaped_strings_stay_plain() {
    let (store, interpreter) = setup();
    let ctx = operator();

    interpreter.interpret("db.a.insertOne({short: 'abc123', text: 'hello world'})", &ctx);

    let doc = store.find_one("a", &json!({})).unwrap().unwrap();
    assert_eq!(doc["short"], json!("abc123"));
    assert_eq!(doc["text"], json!("hello world"));
}

// =============================================================================
// Access Policy
// =============================================================================

/// The identity collection is denied for every caller and operation.
#[test]
fn test_identity_collection_always_denied() {
    let (_store, interpreter) = setup();
    let contexts = [
        CallerContext::anonymous(),
        CallerContext::authenticated(Uuid::new_v4(), "alice"),
        CallerContext::authenticated(Uuid::new_v4(), "admin"),
    ];

    for ctx in &contexts {
        for command in [
            "db.users.find({})",
            "db.users.findOne({username: 'alice'})",
            "db.users.insertOne({username: 'mallory'})",
            "db.users.deleteMany({})",
            "db.users.drop()",
            "db.sessions.find({})",
        ] {
            let result = interpreter.interpret(command, ctx);
            assert!(!result.is_pass(), "{} passed", command);
            let text = result.output.as_str().unwrap();
            assert!(
                text.starts_with("AccessDenied"),
                "{} gave {}",
                command,
                text
            );
        }
    }
}

/// A denied request never reaches the store.
#[test]
fn test_denied_request_does_not_touch_store() {
    let (store, interpreter) = setup();

    interpreter.interpret("db.users.insertOne({username: 'mallory'})", &operator());
    assert_eq!(store.count("users", None).unwrap(), 0);
}

// =============================================================================
// Arity and Whitelist
// =============================================================================

/// Zero arguments to a one-argument operation fails with an arity
/// diagnostic.
#[test]
fn test_arity_is_enforced() {
    let (_store, interpreter) = setup();

    let result = interpreter.interpret("db.a.insertOne()", &operator());
    assert!(!result.is_pass());
    let text = result.output.as_str().unwrap();
    assert!(text.starts_with("ArityMismatch"), "{}", text);
    assert!(text.contains("insertOne"));
}

#[test]
fn test_too_many_arguments_rejected() {
    let (_store, interpreter) = setup();

    let result = interpreter.interpret("db.a.find({}, {}, {})", &operator());
    assert!(!result.is_pass());
    assert!(result.output.as_str().unwrap().starts_with("ArityMismatch"));
}

/// A single object holding both update halves is an arity error, not a
/// silently re-nested two-argument call.
#[test]
fn test_update_requires_true_two_argument_split() {
    let (_store, interpreter) = setup();
    let ctx = operator();
    interpreter.interpret("db.a.insertOne({x: 1})", &ctx);

    let result = interpreter.interpret("db.a.updateOne({x: 1})", &ctx);
    assert!(!result.is_pass());
    assert!(result.output.as_str().unwrap().starts_with("ArityMismatch"));
}

/// Operations outside the whitelist fail closed.
#[test]
fn test_unknown_operations_fail_closed() {
    let (_store, interpreter) = setup();
    let ctx = operator();

    for command in [
        "db.a.shutdown()",
        "db.a.eval('1 + 1')",
        "db.a.mapReduce({})",
        "db.a.renameCollection('b')",
    ] {
        let result = interpreter.interpret(command, &ctx);
        assert!(!result.is_pass(), "{} passed", command);
        assert!(result
            .output
            .as_str()
            .unwrap()
            .starts_with("OperationNotSupported"));
    }
}

// =============================================================================
// Quoted Structural Characters
// =============================================================================

/// Parentheses, commas and colons inside a quoted string are data.
#[test]
fn test_structural_characters_inside_strings() {
    let (store, interpreter) = setup();
    let ctx = operator();

    let result = interpreter.interpret(r#"db.a.insertOne({"note":"a (b), c: d"})"#, &ctx);
    assert!(result.is_pass(), "{:?}", result);

    let doc = store.find_one("a", &json!({})).unwrap().unwrap();
    assert_eq!(doc["note"], json!("a (b), c: d"));

    // And the same via a filter
    let hit = interpreter.interpret(r#"db.a.find({"note":"a (b), c: d"})"#, &ctx);
    assert_eq!(hit.output.as_array().unwrap().len(), 1);
}

#[test]
fn test_braces_inside_strings_are_data() {
    let (store, interpreter) = setup();
    let ctx = operator();

    let result = interpreter.interpret("db.a.insertOne({note: 'open { and ] mix'})", &ctx);
    assert!(result.is_pass(), "{:?}", result);

    let doc = store.find_one("a", &json!({})).unwrap().unwrap();
    assert_eq!(doc["note"], json!("open { and ] mix"));
}

// =============================================================================
// Malformed Input Fails Closed
// =============================================================================

#[test]
fn test_malformed_commands_fail_closed() {
    let (_store, interpreter) = setup();
    let ctx = operator();

    for command in [
        "events.find()",
        "db.events",
        "db.events.find({",
        "db.events.find()garbage",
        "db.events.find().limit(1)",
        "db..find()",
    ] {
        let result = interpreter.interpret(command, &ctx);
        assert!(!result.is_pass(), "{} passed", command);
        assert!(result
            .output
            .as_str()
            .unwrap()
            .starts_with("MalformedCommand"));
    }
}

#[test]
fn test_bad_literals_fail_closed() {
    let (_store, interpreter) = setup();
    let ctx = operator();

    for command in [
        "db.a.find({status: open})",
        "db.a.find({status 'open'})",
        "db.a.insertOne({a: 1},)",
    ] {
        let result = interpreter.interpret(command, &ctx);
        assert!(!result.is_pass(), "{} passed", command);
        assert!(result.output.as_str().unwrap().starts_with("InvalidLiteral"));
    }
}

// =============================================================================
// Deep Filters and Options
// =============================================================================

#[test]
fn test_nested_or_filter_through_pipeline() {
    let (_store, interpreter) = setup();
    let ctx = operator();
    interpreter.interpret(
        "db.t.insertMany([{s:'open', c: 1}, {s:'held', c: 20}, {s:'closed', c: 2}])",
        &ctx,
    );

    let result = interpreter.interpret(
        "db.t.find({$or: [{s: 'open'}, {c: {$gte: 10}}]})",
        &ctx,
    );
    assert!(result.is_pass(), "{:?}", result);
    assert_eq!(result.output.as_array().unwrap().len(), 2);
}

#[test]
fn test_find_options_shape_results() {
    let (_store, interpreter) = setup();
    let ctx = operator();
    interpreter.interpret("db.t.insertMany([{v: 2}, {v: 9}, {v: 5}])", &ctx);

    let result = interpreter.interpret(
        "db.t.find({}, {sort: {v: -1}, limit: 2, projection: {v: 1, _id: 0}})",
        &ctx,
    );
    assert_eq!(result.output, json!([{"v": 9}, {"v": 5}]));
}

/// Every request gets exactly one envelope with both fields populated.
#[test]
fn test_every_request_gets_a_complete_envelope() {
    let (_store, interpreter) = setup();
    let ctx = operator();

    for command in ["db.a.find()", "db.a.bogus()", "not a command", ""] {
        let envelope = interpreter.interpret(command, &ctx);
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value["status"] == "Pass" || value["status"] == "Fail");
        assert!(value.get("output").is_some());
    }
}
