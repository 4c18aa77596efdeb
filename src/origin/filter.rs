//! Stack-based origin filtering.

use crate::error::Result;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

use super::stack::{BacktraceSource, CallSite, StackSource};
use super::OriginFilter;

/// Configuration for [`StackOriginFilter`].
///
/// Foreign-code locations depend on how the host is built and packaged, so
/// every pattern list is configurable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Source locations treated as foreign (matched against the file path).
    pub foreign_patterns: Vec<String>,

    /// Source locations that are never the initiator of a read. Frames from
    /// these files are stepped over when looking for the caller.
    pub passthrough_patterns: Vec<String>,

    /// Substring of the function name identifying the interception hook's
    /// own frames.
    pub hook_marker: String,

    /// Number of resolved instruction pointers to cache.
    pub cache_size: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            foreign_patterns: vec![
                r"[/\\]\.cargo[/\\]registry[/\\]".to_string(),
                r"[/\\]\.cargo[/\\]git[/\\]checkouts[/\\]".to_string(),
                r"/node_modules/".to_string(),
                r"\./~/".to_string(),
                r"extension://".to_string(),
            ],
            passthrough_patterns: vec![
                r"/rustc/[0-9a-f]+/library/".to_string(),
                r"^library/(core|alloc|std)/".to_string(),
            ],
            hook_marker: crate::tracker::HOOK_MARKER.to_string(),
            cache_size: 4096,
        }
    }
}

/// Classifies a read by the source file of the function that performed it.
///
/// The stack is captured at interception time. The initiator is the first
/// frame after the hook's own frames, stepping over passthrough frames and
/// frames without location info. No hook frame, or no initiator, means the
/// read is treated as local.
pub struct StackOriginFilter {
    foreign: RegexSet,
    passthrough: RegexSet,
    hook_marker: String,
    source: Arc<dyn StackSource>,
}

impl StackOriginFilter {
    /// Build a filter that walks the real call stack.
    pub fn from_config(config: &OriginConfig) -> Result<Self> {
        let source = Arc::new(BacktraceSource::with_cache_size(config.cache_size));
        Self::with_source(config, source)
    }

    /// Build a filter over an arbitrary stack source.
    pub fn with_source(config: &OriginConfig, source: Arc<dyn StackSource>) -> Result<Self> {
        Ok(Self {
            foreign: RegexSet::new(&config.foreign_patterns)?,
            passthrough: RegexSet::new(&config.passthrough_patterns)?,
            hook_marker: config.hook_marker.clone(),
            source,
        })
    }

    fn is_hook(&self, site: &CallSite) -> bool {
        site.function
            .as_deref()
            .is_some_and(|f| f.contains(&self.hook_marker))
    }

    fn is_passthrough(&self, site: &CallSite) -> bool {
        site.file
            .as_deref()
            .map_or(true, |file| self.passthrough.is_match(file))
    }

    /// The frame that performed the read, if it can be located.
    pub fn initiator<'s>(&self, stack: &'s [CallSite]) -> Option<&'s CallSite> {
        let hook_start = stack.iter().position(|site| self.is_hook(site))?;
        stack[hook_start..]
            .iter()
            .skip_while(|site| self.is_hook(site))
            .find(|site| !self.is_hook(site) && !self.is_passthrough(site))
    }

    /// Classify an already captured stack.
    pub fn classify(&self, stack: &[CallSite]) -> bool {
        match self.initiator(stack) {
            Some(site) => site
                .file
                .as_deref()
                .is_some_and(|file| self.foreign.is_match(file)),
            None => {
                trace!("no initiating frame found; treating access as local");
                false
            }
        }
    }
}

impl OriginFilter for StackOriginFilter {
    fn is_foreign(&self) -> bool {
        match self.source.capture() {
            Some(stack) => self.classify(&stack),
            None => {
                trace!("call stack unavailable; treating access as local");
                false
            }
        }
    }
}

/// Filter that treats every read as application code.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverForeign;

impl OriginFilter for NeverForeign {
    fn is_foreign(&self) -> bool {
        false
    }
}
