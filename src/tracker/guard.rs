//! Reentrancy guards.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Flags marking work the engine performs on state itself.
///
/// While a state transition is being computed or a report is being generated,
/// reads are the engine's own and must not count as usage. Each flag is a
/// depth count, so overlapping scopes from several threads keep it set until
/// the last one ends.
#[derive(Debug, Default)]
pub struct Guards {
    transition: AtomicUsize,
    report: AtomicUsize,
}

impl Guards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a state transition as in progress until the scope is dropped.
    pub fn enter_transition(&self) -> GuardScope<'_> {
        GuardScope::enter(&self.transition, "transition")
    }

    /// Mark a report as in progress until the scope is dropped.
    pub fn enter_report(&self) -> GuardScope<'_> {
        GuardScope::enter(&self.report, "report")
    }

    pub fn transition_in_progress(&self) -> bool {
        self.transition.load(Ordering::SeqCst) > 0
    }

    pub fn report_in_progress(&self) -> bool {
        self.report.load(Ordering::SeqCst) > 0
    }

    /// True while either guard is set.
    pub fn is_active(&self) -> bool {
        self.transition_in_progress() || self.report_in_progress()
    }
}

/// Active guard. Releases its hold on drop, so scopes nest, may end in any
/// order, and unwinding clears them.
#[must_use = "the guard is released as soon as the scope is dropped"]
pub struct GuardScope<'a> {
    depth: &'a AtomicUsize,
    name: &'static str,
}

impl<'a> GuardScope<'a> {
    fn enter(depth: &'a AtomicUsize, name: &'static str) -> Self {
        let previous = depth.fetch_add(1, Ordering::SeqCst);
        debug!(guard = name, depth = previous + 1, "guard entered");
        Self { depth, name }
    }
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        let previous = self.depth.fetch_sub(1, Ordering::SeqCst);
        debug!(guard = self.name, depth = previous - 1, "guard released");
    }
}
