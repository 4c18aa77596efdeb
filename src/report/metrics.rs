//! Structural diff and counting over plain state values.

use crate::tree::Node;
use crate::types::{Path, Seg};
use serde_json::{Map, Value};

/// Count leaf values. A non-null mapping or sequence counts the sum of its
/// children; everything else counts 1.
pub fn deep_count(value: &Value) -> usize {
    match value {
        Value::Object(fields) => fields.values().map(deep_count).sum(),
        Value::Array(items) => items.iter().map(deep_count).sum(),
        _ => 1,
    }
}

/// Find the value at `path`. Key segments address sequence elements by their
/// decimal text and index segments address mapping members by theirs.
pub fn lookup<'v>(value: &'v Value, path: &Path) -> Option<&'v Value> {
    path.segments()
        .iter()
        .try_fold(value, |node, seg| match (node, seg) {
            (Value::Object(fields), seg) => fields.get(&seg.as_key()),
            (Value::Array(items), Seg::Index(i)) => items.get(*i),
            (Value::Array(items), Seg::Key(k)) => items.get(k.parse::<usize>().ok()?),
            _ => None,
        })
}

/// Everything in `state` that the accessed tree `used` does not account for.
///
/// Mappings keep only members with unused content. Sequences keep their
/// length so element positions stay meaningful; fully used elements become
/// null. Unread slots are told apart from read ones by the tree itself, so an
/// unread null element is still reported. A fully used state yields an empty
/// mapping.
pub fn unused_diff(state: &Value, used: &Node) -> Value {
    diff(state, Some(used)).unwrap_or_else(|| Value::Object(Map::new()))
}

/// `None` when `used` covers all of `state`.
fn diff(state: &Value, used: Option<&Node>) -> Option<Value> {
    let Some(used) = used else {
        return Some(state.clone());
    };

    match (state, used) {
        // Node::get also resolves members of a sequence recorded under
        // decimal keys after a shape change, and the reverse.
        (Value::Object(fields), Node::Object(_) | Node::Array(_)) => {
            let out: Map<String, Value> = fields
                .iter()
                .filter_map(|(k, v)| {
                    diff(v, used.get(&Seg::Key(k.clone()))).map(|d| (k.clone(), d))
                })
                .collect();
            (!out.is_empty()).then_some(Value::Object(out))
        }
        (Value::Array(items), Node::Object(_) | Node::Array(_)) => {
            let out: Vec<Option<Value>> = items
                .iter()
                .enumerate()
                .map(|(i, v)| diff(v, used.get(&Seg::Index(i))))
                .collect();
            if out.iter().all(Option::is_none) {
                return None;
            }
            // Absent entries become explicit nulls so positions survive
            // serialization.
            Some(Value::Array(
                out.into_iter().map(|d| d.unwrap_or(Value::Null)).collect(),
            ))
        }
        (s, Node::Leaf(u)) if s == u => None,
        _ => Some(state.clone()),
    }
}
