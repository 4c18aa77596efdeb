//! Tracked read tests.

use parking_lot::{Mutex, RwLock};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use usage_report::report::lookup;
use usage_report::{
    unused_diff, AccessTracker, AccessedPathTree, ActiveBreakpoint, CallSite, Guards,
    OriginConfig, Path, StackOriginFilter, StackSource,
};

struct Harness {
    tree: Arc<RwLock<AccessedPathTree>>,
    guards: Arc<Guards>,
}

impl Harness {
    fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(AccessedPathTree::new())),
            guards: Arc::new(Guards::new()),
        }
    }

    fn tracker(&self) -> AccessTracker {
        AccessTracker::new(Arc::clone(&self.tree), Arc::clone(&self.guards))
    }

    fn recorded(&self) -> Vec<String> {
        self.tree.read().paths().iter().map(Path::dotted).collect()
    }
}

struct FixedStack(Vec<CallSite>);

impl StackSource for FixedStack {
    fn capture(&self) -> Option<Vec<CallSite>> {
        Some(self.0.clone())
    }
}

fn stack_called_from(file: &str) -> Vec<CallSite> {
    vec![
        CallSite::new(
            "usage_report::tracker::view::AccessTracker::observe",
            "/work/usage-report/src/tracker/view.rs",
        ),
        CallSite::new(
            "usage_report::tracker::view::TrackedValue::get",
            "/work/usage-report/src/tracker/view.rs",
        ),
        CallSite::new("caller::read", file),
    ]
}

/// Every member and element path of `value`, parents before children.
fn all_paths(value: &Value) -> Vec<Path> {
    fn walk(value: &Value, prefix: &Path, out: &mut Vec<Path>) {
        match value {
            Value::Object(fields) => {
                for (key, child) in fields {
                    let path = prefix.child(key.as_str());
                    out.push(path.clone());
                    walk(child, &path, out);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    let path = prefix.child(i);
                    out.push(path.clone());
                    walk(child, &path, out);
                }
            }
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk(value, &Path::root(), &mut out);
    out
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-c]{1,2}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_root() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-d]{1,2}", arb_json(), 0..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

// --- Transparency ---

proptest! {
    #[test]
    fn prop_reads_match_plain_state(state in arb_json()) {
        let harness = Harness::new();
        let tracked = Arc::new(harness.tracker()).wrap(state.clone());

        for path in all_paths(&state) {
            let through_view = tracked.view().pointer(&path).map(|v| v.value().clone());
            prop_assert_eq!(through_view, lookup(&state, &path).cloned());
        }
        prop_assert!(tracked.view().get("zz-missing").is_none());
    }

    #[test]
    fn prop_full_read_leaves_nothing_unused(state in arb_root()) {
        let harness = Harness::new();
        let tracked = Arc::new(harness.tracker()).wrap(state.clone());

        for path in all_paths(&state) {
            prop_assert!(tracked.view().pointer(&path).is_some());
        }
        let tree = harness.tree.read();
        prop_assert_eq!(&tree.to_value(), &state);
        prop_assert_eq!(unused_diff(&state, tree.root()), json!({}));
    }

    #[test]
    fn prop_recorded_paths_are_never_lost(
        states in prop::collection::vec(arb_root(), 1..5),
        stride in 1usize..4,
    ) {
        let harness = Harness::new();
        let tracker = Arc::new(harness.tracker());
        let mut seen: Vec<Path> = Vec::new();

        for state in states {
            let tracked = tracker.wrap(state.clone());
            for path in all_paths(&state).into_iter().step_by(stride) {
                tracked.view().pointer(&path);
                seen.push(path);
            }

            let tree = harness.tree.read();
            for path in &seen {
                prop_assert!(tree.contains(path), "lost {}", path);
            }
        }
    }
}

// --- Recording ---

#[test]
fn test_wrapping_records_nothing() {
    let harness = Harness::new();
    let tracked = Arc::new(harness.tracker()).wrap(json!({"a": {"b": 1}}));

    assert_eq!(tracked.value(), &json!({"a": {"b": 1}}));
    assert!(harness.tree.read().is_empty());
}

#[test]
fn test_nested_read_records_full_path() {
    let harness = Harness::new();
    let tracked = Arc::new(harness.tracker()).wrap(json!({"todos": [{"text": "a", "done": false}]}));

    let text = tracked
        .get("todos")
        .and_then(|t| t.index(0))
        .and_then(|t| t.get("text"));
    assert_eq!(text.unwrap().as_str(), Some("a"));
    assert_eq!(harness.recorded(), vec!["todos", "todos.0", "todos.0.text"]);
    assert_eq!(
        harness.tree.read().to_value(),
        json!({"todos": [{"text": "a"}]})
    );
}

#[test]
fn test_repeated_reads_record_once() {
    let harness = Harness::new();
    let tracked = Arc::new(harness.tracker()).wrap(json!({"a": 1}));

    for _ in 0..5 {
        assert_eq!(tracked.get("a").unwrap(), json!(1));
    }
    assert_eq!(harness.tree.read().len(), 1);
}

#[test]
fn test_usage_accumulates_across_versions() {
    let harness = Harness::new();
    let tracker = Arc::new(harness.tracker());

    let first = tracker.wrap(json!({"a": 1, "b": 2}));
    first.get("a");
    let second = tracker.wrap(json!({"b": 3, "c": 4}));
    second.get("c");

    assert_eq!(harness.recorded(), vec!["a", "c"]);
}

#[test]
fn test_iteration_records_each_member() {
    let harness = Harness::new();
    let tracked = Arc::new(harness.tracker()).wrap(json!({"m": {"x": 1, "y": 2}, "l": [true]}));

    let m = tracked.get("m").unwrap();
    let total: i64 = m.entries().filter_map(|(_, v)| v.as_i64()).sum();
    assert_eq!(total, 3);
    assert_eq!(tracked.get("l").unwrap().elements().count(), 1);

    assert_eq!(harness.recorded(), vec!["l", "l.0", "m", "m.x", "m.y"]);
}

// --- Suppression ---

#[test]
fn test_guarded_reads_not_recorded() {
    let harness = Harness::new();
    let tracked = Arc::new(harness.tracker()).wrap(json!({"a": 1, "b": 2}));

    {
        let _transition = harness.guards.enter_transition();
        assert_eq!(tracked.get("a").unwrap(), json!(1));
    }
    {
        let _report = harness.guards.enter_report();
        assert_eq!(tracked.get("b").unwrap(), json!(2));
    }
    assert!(harness.tree.read().is_empty());

    tracked.get("a");
    assert_eq!(harness.recorded(), vec!["a"]);
}

#[test]
fn test_foreign_reads_return_values_unrecorded() {
    let harness = Harness::new();
    let foreign = StackOriginFilter::with_source(
        &OriginConfig::default(),
        Arc::new(FixedStack(stack_called_from(
            "/home/dev/.cargo/registry/src/index.crates.io-6f17d22bba15001f/devtools-0.3.1/src/lib.rs",
        ))),
    )
    .unwrap();
    let tracked = Arc::new(harness.tracker().with_origin_filter(Arc::new(foreign)))
        .wrap(json!({"secret": {"token": "t"}}));

    let token = tracked.get("secret").and_then(|s| s.get("token"));
    assert_eq!(token.unwrap().as_str(), Some("t"));
    assert!(harness.tree.read().is_empty());
}

#[test]
fn test_local_reads_recorded_with_filter() {
    let harness = Harness::new();
    let local = StackOriginFilter::with_source(
        &OriginConfig::default(),
        Arc::new(FixedStack(stack_called_from("/work/app/src/view.rs"))),
    )
    .unwrap();
    let tracked = Arc::new(harness.tracker().with_origin_filter(Arc::new(local)))
        .wrap(json!({"a": 1}));

    tracked.get("a");
    assert_eq!(harness.recorded(), vec!["a"]);
}

#[test]
fn test_skip_origin_check_records_everything() {
    let harness = Harness::new();
    let always_foreign = || true;
    let tracked = Arc::new(
        harness
            .tracker()
            .with_origin_filter(Arc::new(always_foreign))
            .skip_origin_check(true),
    )
    .wrap(json!({"a": 1}));

    tracked.get("a");
    assert_eq!(harness.recorded(), vec!["a"]);
}

#[test]
fn test_real_stack_records_application_reads() {
    let harness = Harness::new();
    let filter = StackOriginFilter::from_config(&OriginConfig::default()).unwrap();
    let tracked = Arc::new(harness.tracker().with_origin_filter(Arc::new(filter)))
        .wrap(json!({"a": {"b": 1}}));

    assert_eq!(tracked.get("a").and_then(|a| a.get("b")).unwrap(), json!(1));
    assert_eq!(harness.recorded(), vec!["a", "a.b"]);
}

// --- Breakpoint ---

#[test]
fn test_breakpoint_halts_on_exact_path() {
    let harness = Harness::new();
    let breakpoint = ActiveBreakpoint::new();
    breakpoint.set(Some("a.b.0".to_string()));

    let hits = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&hits);
    let tracker = harness
        .tracker()
        .with_breakpoint(breakpoint.clone())
        .with_halt_handler(Arc::new(move |path: &Path, value: &Value| {
            sink.lock().push((path.dotted(), value.clone()))
        }));
    let tracked = Arc::new(tracker).wrap(json!({"a": {"b": [10, 20]}}));

    let list = tracked.get("a").and_then(|a| a.get("b")).unwrap();
    list.index(1);
    assert!(hits.lock().is_empty());

    list.index(0);
    assert_eq!(*hits.lock(), vec![("a.b.0".to_string(), json!(10))]);

    breakpoint.clear();
    list.index(0);
    assert_eq!(hits.lock().len(), 1);
}
