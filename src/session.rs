//! Session: owns the tracking state of one instrumented application.

use crate::error::{Result, UsageError};
use crate::notify::Notifier;
use crate::origin::{OriginConfig, OriginFilter, StackOriginFilter};
use crate::persistence::{BreakpointStore, KeyValueStore, DEFAULT_BREAKPOINT_KEY};
use crate::report::{Report, ReportGenerator, SummaryExtractor};
use crate::tracker::{AccessTracker, ActiveBreakpoint, Guards, HaltHandler, TrackedState};
use crate::tree::AccessedPathTree;
use crate::types::Path;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Session configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Record every read without inspecting the caller's stack.
    pub skip_origin_check: bool,

    /// Quiescence window for change notifications, in milliseconds.
    pub debounce_ms: u64,

    /// Key of the breakpoint in the key-value store.
    pub breakpoint_key: String,

    /// Stack classification used when the origin check is enabled.
    pub origin: OriginConfig,
}

impl SessionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            skip_origin_check: false,
            debounce_ms: 10,
            breakpoint_key: DEFAULT_BREAKPOINT_KEY.to_string(),
            origin: OriginConfig::default(),
        }
    }
}

/// Builder for [`Session`] with optional collaborators.
pub struct SessionBuilder {
    config: SessionConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    origin: Option<Arc<dyn OriginFilter>>,
    halt: Option<Arc<dyn HaltHandler>>,
    extractor: Option<Arc<dyn SummaryExtractor>>,
}

impl SessionBuilder {
    /// Key-value store holding the breakpoint. Without one, breakpoint
    /// operations are no-ops.
    pub fn persistence(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the stack-based origin filter.
    pub fn origin_filter(mut self, filter: Arc<dyn OriginFilter>) -> Self {
        self.origin = Some(filter);
        self
    }

    pub fn halt_handler(mut self, halt: Arc<dyn HaltHandler>) -> Self {
        self.halt = Some(halt);
        self
    }

    /// Extractor for the report's `summary` fields.
    pub fn summary(mut self, extractor: Arc<dyn SummaryExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn build(self) -> Result<Session> {
        let SessionBuilder {
            config,
            store,
            origin,
            halt,
            extractor,
        } = self;

        let tree = Arc::new(RwLock::new(AccessedPathTree::new()));
        let guards = Arc::new(Guards::new());
        let notifier = Arc::new(Notifier::new(config.debounce())?);
        let breakpoints = BreakpointStore::new(store, config.breakpoint_key.clone());
        let active = ActiveBreakpoint::new();
        active.set(breakpoints.load());

        let mut tracker = AccessTracker::new(Arc::clone(&tree), Arc::clone(&guards))
            .skip_origin_check(config.skip_origin_check)
            .with_breakpoint(active.clone());

        if !config.skip_origin_check {
            let filter: Arc<dyn OriginFilter> = match origin {
                Some(filter) => filter,
                None => Arc::new(StackOriginFilter::from_config(&config.origin)?),
            };
            tracker = tracker.with_origin_filter(filter);
        }
        if let Some(halt) = halt {
            tracker = tracker.with_halt_handler(halt);
        }

        let sink = Arc::clone(&notifier);
        let tracker = Arc::new(tracker.on_access(move |path| sink.notify(&path.dotted())));

        let mut generator = ReportGenerator::new(Arc::clone(&guards));
        if let Some(extractor) = extractor {
            generator = generator.with_extractor(extractor);
        }

        info!(
            skip_origin_check = config.skip_origin_check,
            debounce_ms = config.debounce_ms,
            persistence = breakpoints.is_available(),
            "usage session started"
        );

        Ok(Session {
            config,
            tree,
            guards,
            tracker,
            breakpoints,
            active,
            notifier,
            generator,
            current: RwLock::new(None),
        })
    }
}

/// Tracks which parts of an application's state are read.
///
/// Every state version goes through [`Session::transition`] (or one of its
/// wrappers), which hands back a tracked view. Reads through that view are
/// accumulated across versions until [`Session::reset_usage`]. Sessions are
/// independent of each other; nothing is process-global.
pub struct Session {
    /// Session configuration.
    config: SessionConfig,

    /// Paths read so far, shared with the tracker.
    tree: Arc<RwLock<AccessedPathTree>>,

    /// Transition and report guards.
    guards: Arc<Guards>,

    /// Tracker wrapping every state version.
    tracker: Arc<AccessTracker>,

    /// Persistent breakpoint slot.
    breakpoints: BreakpointStore,

    /// Breakpoint the tracker checks on every read.
    active: ActiveBreakpoint,

    /// Debounced change notifications.
    notifier: Arc<Notifier>,

    /// Report generator.
    generator: ReportGenerator,

    /// Most recent tracked state.
    current: RwLock<Option<TrackedState>>,
}

impl Session {
    /// Create a session with no persistence and the default collaborators.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            store: None,
            origin: None,
            halt: None,
            extractor: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // --- State transitions ---

    /// Install `state` as the current state and return its tracked view.
    ///
    /// The breakpoint is re-read from persistence so a path set from another
    /// process takes effect on the next version.
    pub fn transition(&self, state: Value) -> TrackedState {
        let _guard = self.guards.enter_transition();

        if self.breakpoints.is_available() {
            self.active.set(self.breakpoints.load());
        }

        let tracked = self.tracker.wrap(state);
        *self.current.write() = Some(tracked.clone());
        debug!("state transition");

        self.notifier.notify("");
        tracked
    }

    /// Compute the next state from the previous one and install it.
    ///
    /// The reducer runs with the transition guard set, so reads it makes
    /// through any tracked view are not recorded.
    pub fn transition_with<A, F>(&self, action: A, reducer: F) -> TrackedState
    where
        F: FnOnce(Option<&Value>, A) -> Value,
    {
        let _guard = self.guards.enter_transition();
        let previous = self.current();
        let next = reducer(previous.as_ref().map(TrackedState::value), action);
        self.transition(next)
    }

    /// Serialize `state` and install it.
    pub fn update<S: Serialize>(&self, state: &S) -> Result<TrackedState> {
        let value = serde_json::to_value(state)?;
        Ok(self.transition(value))
    }

    pub fn current(&self) -> Option<TrackedState> {
        self.current.read().clone()
    }

    // --- Reports ---

    /// Report on the current state and everything read so far.
    pub fn generate_report(&self) -> Result<Report> {
        let current = self.current().ok_or(UsageError::NoState)?;
        let tree = self.tree.read();
        self.generator.generate(&tree, current.value())
    }

    /// Sorted list of every path read so far.
    pub fn accessed_paths(&self) -> Vec<Path> {
        self.tree.read().paths()
    }

    /// Forget all recorded reads. The current state stays installed.
    pub fn reset_usage(&self) {
        let previous = std::mem::take(&mut *self.tree.write());
        info!(paths = previous.len(), "usage reset");
    }

    // --- Notifications ---

    /// Set the single change subscriber, replacing any previous one.
    ///
    /// The callback gets the dotted path of the last read in a burst, or an
    /// empty string for a state transition.
    pub fn set_on_change<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.notifier.set_subscriber(callback);
    }

    pub fn clear_on_change(&self) {
        self.notifier.clear_subscriber();
    }

    // --- Breakpoint ---

    /// Watch `path` (dot-joined). An empty path clears the breakpoint.
    ///
    /// Breakpoints need a key-value store; without one this does nothing.
    pub fn set_breakpoint(&self, path: &str) -> Result<()> {
        if !self.breakpoints.is_available() {
            debug!(path, "no key-value store; breakpoint ignored");
            return Ok(());
        }
        self.breakpoints.save(Some(path))?;
        self.active.set(Some(path.to_string()));
        info!(path, "breakpoint set");
        Ok(())
    }

    pub fn clear_breakpoint(&self) -> Result<()> {
        if !self.breakpoints.is_available() {
            debug!("no key-value store; nothing to clear");
            return Ok(());
        }
        self.breakpoints.save(None)?;
        self.active.clear();
        info!("breakpoint cleared");
        Ok(())
    }

    /// The watched path. Always `None` without a key-value store.
    pub fn breakpoint(&self) -> Option<String> {
        if !self.breakpoints.is_available() {
            return None;
        }
        self.active.get()
    }
}
