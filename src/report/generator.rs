//! Report generation.

use crate::error::Result;
use crate::tracker::Guards;
use crate::tree::AccessedPathTree;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::metrics::{deep_count, unused_diff};
use super::types::{Report, SummaryExtractor};

/// Serialized length at or below which `used` counts as empty (`{}`).
const EMPTY_USED_LEN: usize = 2;

/// Builds [`Report`]s from an accessed-path tree and a state snapshot.
pub struct ReportGenerator {
    guards: Arc<Guards>,
    extractor: Option<Arc<dyn SummaryExtractor>>,
}

impl ReportGenerator {
    pub fn new(guards: Arc<Guards>) -> Self {
        Self {
            guards,
            extractor: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn SummaryExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Generate a report for `state` given everything read so far.
    ///
    /// Reads made while this runs are not recorded. Fails with
    /// [`UsageError::Serialization`](crate::UsageError::Serialization) when
    /// the state cannot make a canonical serialization round trip, for
    /// example when it nests deeper than the deserializer allows. The tree is
    /// left untouched either way.
    pub fn generate(&self, tree: &AccessedPathTree, state: &Value) -> Result<Report> {
        let _guard = self.guards.enter_report();

        let (used, used_text) = canonical_copy(&tree.to_value())?;
        let (state_copy, state_text) = canonical_copy(state)?;

        // Diffed against the tree, where unread sequence slots are distinct
        // from read nulls.
        let unused = unused_diff(&state_copy, tree.root());
        let number_of_props = deep_count(&state_copy);
        let store_size = state_text.len();
        let percent_used = percent_used(&used_text, &state_text);
        let summary = self
            .extractor
            .as_ref()
            .map(|extractor| extractor.extract(&state_copy))
            .unwrap_or_else(Map::new);

        debug!(
            paths = tree.len(),
            number_of_props,
            store_size,
            percent_used,
            "usage report generated"
        );

        Ok(Report {
            used,
            unused,
            state_copy,
            percent_used,
            number_of_props,
            store_size,
            summary,
        })
    }
}

/// Copy a value through its canonical serialization. Returns the copy and
/// the serialized text.
fn canonical_copy(value: &Value) -> Result<(Value, String)> {
    let text = serde_json::to_string(value)?;
    let copy = serde_json::from_str(&text)?;
    Ok((copy, text))
}

fn percent_used(used_text: &str, state_text: &str) -> Option<u32> {
    let used_len = used_text.chars().count();
    if used_len <= EMPTY_USED_LEN {
        return None;
    }
    let total_len = state_text.chars().count().max(1);
    Some((100.0 * used_len as f64 / total_len as f64).round() as u32)
}
