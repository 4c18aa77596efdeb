//! Report value types.

use crate::types::Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::metrics::{deep_count, lookup};

/// Usage report for one state snapshot.
///
/// Fully plain: no tracked values leak into a report, and it serializes with
/// the field names report viewers expect (`stateCopy`, `percentUsed`, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// The part of the state that was read.
    pub used: Value,
    /// Everything in `state_copy` that `used` does not cover.
    pub unused: Value,
    /// Deep copy of the state at report time.
    pub state_copy: Value,
    /// Rounded percentage of serialized size that was read; `None` when
    /// nothing meaningful was read.
    pub percent_used: Option<u32>,
    /// Leaf count of `state_copy`.
    pub number_of_props: usize,
    /// UTF-8 byte length of the serialized `state_copy`.
    pub store_size: usize,
    /// Fields pulled out by the session's summary extractor.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub summary: Map<String, Value>,
}

/// Size share of one subtree of a report's state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeStats {
    pub props: usize,
    pub bytes: usize,
    /// Share of the state's leaf count, rounded to two decimals.
    pub props_percent: f64,
    /// Share of the state's serialized size, rounded to two decimals.
    pub size_percent: f64,
}

impl Report {
    /// Whether the value at `path` was read. Null entries in `used` are
    /// sequence placeholders and count as unread.
    pub fn is_used(&self, path: &Path) -> bool {
        lookup(&self.used, path).is_some_and(|v| !v.is_null())
    }

    /// Count and size of the subtree at `path` relative to the whole state.
    pub fn subtree_stats(&self, path: &Path) -> Option<SubtreeStats> {
        let node = lookup(&self.state_copy, path)?;
        let props = deep_count(node);
        let bytes = serde_json::to_string(node).map(|s| s.len()).ok()?;

        Some(SubtreeStats {
            props,
            bytes,
            props_percent: percent_of(props, self.number_of_props),
            size_percent: percent_of(bytes, self.store_size),
        })
    }
}

fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = part as f64 / total as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// Pulls application-specific summary fields out of the state.
pub trait SummaryExtractor: Send + Sync {
    fn extract(&self, state: &Value) -> Map<String, Value>;
}

impl<F> SummaryExtractor for F
where
    F: Fn(&Value) -> Map<String, Value> + Send + Sync,
{
    fn extract(&self, state: &Value) -> Map<String, Value> {
        self(state)
    }
}

/// Extracts named fields by JSON pointer. Fields missing from the state
/// are left out.
///
/// ```ignore
/// let extractor = PointerExtractor::new()
///     .field("query", "/preso/requestContext/query")
///     .field("verticalId", "/preso/requestContext/verticalId");
/// ```
#[derive(Clone, Debug, Default)]
pub struct PointerExtractor {
    fields: Vec<(String, String)>,
}

impl PointerExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, pointer: impl Into<String>) -> Self {
        self.fields.push((name.into(), pointer.into()));
        self
    }
}

impl SummaryExtractor for PointerExtractor {
    fn extract(&self, state: &Value) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(name, pointer)| {
                state
                    .pointer(pointer)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }
}
