//! Report generation tests.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use usage_report::{Path, PointerExtractor, Report, Session, SessionConfig, UsageError};

fn test_session() -> Session {
    Session::new(SessionConfig {
        skip_origin_check: true,
        ..Default::default()
    })
    .unwrap()
}

// --- Totals ---

#[test]
fn test_number_of_props_counts_leaves() {
    let session = test_session();
    session.transition(json!({"a": 1, "b": {"c": 2, "d": [3, null]}}));

    let report = session.generate_report().unwrap();
    assert_eq!(report.number_of_props, 4);
}

#[test]
fn test_nothing_read_has_no_percentage() {
    let session = test_session();
    let state = json!({"a": 1, "b": [1, 2, 3]});
    session.transition(state.clone());

    let report = session.generate_report().unwrap();
    assert_eq!(report.used, json!({}));
    assert_eq!(report.percent_used, None);
    assert_eq!(report.unused, state);
}

#[test]
fn test_store_size_is_utf8_bytes() {
    let session = test_session();
    session.transition(json!({"greeting": "こんにちは"}));

    let report = session.generate_report().unwrap();
    // 5 characters, 15 bytes
    assert_eq!(report.store_size, r#"{"greeting":""}"#.len() + 15);
}

#[test]
fn test_percent_used_is_serialized_share() {
    let session = test_session();
    let state = session.transition(json!({"a": 1, "b": 2}));
    state.get("a");

    let report = session.generate_report().unwrap();
    assert_eq!(report.used, json!({"a": 1}));
    assert_eq!(report.percent_used, Some(54));
}

// --- Unused ---

#[test]
fn test_unused_flat() {
    let session = test_session();
    let state = session.transition(json!({"a": 1, "b": 2}));
    state.get("a");

    let report = session.generate_report().unwrap();
    assert_eq!(report.unused, json!({"b": 2}));
}

#[test]
fn test_unused_keeps_untouched_siblings() {
    let session = test_session();
    let state = session.transition(json!({"a": {"x": 1, "y": 2}}));
    state.get("a").and_then(|a| a.get("x"));

    let report = session.generate_report().unwrap();
    assert_eq!(report.used, json!({"a": {"x": 1}}));
    assert_eq!(report.unused, json!({"a": {"y": 2}}));
}

#[test]
fn test_unused_preserves_element_positions() {
    let session = test_session();
    let state = session.transition(json!({"items": ["a", "b", "c"]}));
    state.get("items").and_then(|items| items.index(1));

    let report = session.generate_report().unwrap();
    assert_eq!(report.used, json!({"items": [null, "b"]}));
    assert_eq!(report.unused, json!({"items": ["a", null, "c"]}));
    assert!(report.is_used(&Path::parse("items.1")));
    assert!(!report.is_used(&Path::parse("items.0")));
}

#[test]
fn test_unread_null_element_reported_unused() {
    let session = test_session();
    let state = session.transition(json!({"l": [1, null, 3]}));
    let list = state.get("l").unwrap();
    list.index(0);
    list.index(2);

    let report = session.generate_report().unwrap();
    assert_eq!(report.used, json!({"l": [1, null, 3]}));
    assert_eq!(report.unused, json!({"l": [null, null, null]}));
    assert!(!report.is_used(&Path::parse("l.1")));

    list.index(1);
    let report = session.generate_report().unwrap();
    assert_eq!(report.unused, json!({}));
}

#[test]
fn test_fully_read_state() {
    let session = test_session();
    let state = session.transition(json!({"a": [1, {"b": true}]}));
    let a = state.get("a").unwrap();
    a.index(0);
    a.index(1).and_then(|item| item.get("b"));

    let report = session.generate_report().unwrap();
    assert_eq!(report.unused, json!({}));
    assert_eq!(report.used, report.state_copy);
}

#[test]
fn test_report_reflects_latest_state() {
    let session = test_session();
    let first = session.transition(json!({"count": 1, "label": "x"}));
    first.get("count");
    session.transition(json!({"count": 2, "label": "x"}));

    let report = session.generate_report().unwrap();
    assert_eq!(report.state_copy, json!({"count": 2, "label": "x"}));
    // The count read saw an older value
    assert_eq!(report.unused, json!({"count": 2, "label": "x"}));
    assert!(report.is_used(&Path::parse("count")));
}

// --- Isolation ---

#[test]
fn test_report_generation_records_nothing() {
    let session = test_session();
    let state = session.transition(json!({"a": 1, "b": {"c": 2}}));
    state.get("a");

    session.generate_report().unwrap();
    session.generate_report().unwrap();
    assert_eq!(session.accessed_paths(), vec![Path::parse("a")]);
}

#[test]
fn test_report_is_plain_json() {
    let session = test_session();
    let state = session.transition(json!({"a": 1}));
    state.get("a");

    let report = session.generate_report().unwrap();
    let text = serde_json::to_string(&report).unwrap();
    let back: Report = serde_json::from_str(&text).unwrap();
    assert_eq!(back, report);

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["stateCopy"], json!({"a": 1}));
    assert_eq!(value["numberOfProps"], json!(1));
    assert_eq!(value["percentUsed"], json!(100));
}

// --- Summary and subtree stats ---

#[test]
fn test_summary_extractor() {
    let session = Session::builder(SessionConfig {
        skip_origin_check: true,
        ..Default::default()
    })
    .summary(Arc::new(
        PointerExtractor::new()
            .field("query", "/request/query")
            .field("vertical", "/request/vertical"),
    ))
    .build()
    .unwrap();
    session.transition(json!({"request": {"query": "boots"}, "results": []}));

    let report = session.generate_report().unwrap();
    let mut expected = Map::new();
    expected.insert("query".to_string(), json!("boots"));
    assert_eq!(report.summary, expected);
    assert!(session.accessed_paths().is_empty());
}

#[test]
fn test_subtree_stats() {
    let session = test_session();
    session.transition(json!({"big": [1, 2, 3], "small": 4}));

    let report = session.generate_report().unwrap();
    let stats = report.subtree_stats(&Path::parse("big")).unwrap();
    assert_eq!(stats.props, 3);
    assert_eq!(stats.props_percent, 75.0);
    assert_eq!(stats.bytes, "[1,2,3]".len());
}

// --- Failures ---

#[test]
fn test_unserializable_depth_fails_without_corrupting_usage() {
    let session = test_session();
    let state = session.transition(json!({"a": 1}));
    state.get("a");

    let mut deep = json!("bottom");
    for _ in 0..300 {
        deep = json!({"next": deep});
    }
    session.transition(deep);

    let result = session.generate_report();
    assert!(matches!(result, Err(UsageError::Serialization(_))));
    assert_eq!(session.accessed_paths(), vec![Path::parse("a")]);

    session.transition(json!({"a": 1}));
    assert!(session.generate_report().is_ok());
}
