//! Tracked views over state values.

use crate::origin::OriginFilter;
use crate::tree::AccessedPathTree;
use crate::types::{Path, Seg};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use super::breakpoint::{ActiveBreakpoint, DefaultHalt, HaltHandler};
use super::guard::Guards;

type AccessCallback = dyn Fn(&Path) + Send + Sync;

/// Records reads made through tracked views.
///
/// One tracker serves every state version of a session: each transition
/// wraps the new state with [`AccessTracker::wrap`], and all versions record
/// into the same [`AccessedPathTree`].
pub struct AccessTracker {
    tree: Arc<RwLock<AccessedPathTree>>,
    guards: Arc<Guards>,
    origin: Option<Arc<dyn OriginFilter>>,
    skip_origin_check: bool,
    breakpoint: ActiveBreakpoint,
    halt: Arc<dyn HaltHandler>,
    on_access: Option<Arc<AccessCallback>>,
}

impl AccessTracker {
    /// Create a tracker recording into `tree`, suppressed while `guards` are
    /// active. No origin filter, no breakpoint and no access callback.
    pub fn new(tree: Arc<RwLock<AccessedPathTree>>, guards: Arc<Guards>) -> Self {
        Self {
            tree,
            guards,
            origin: None,
            skip_origin_check: false,
            breakpoint: ActiveBreakpoint::new(),
            halt: Arc::new(DefaultHalt::default()),
            on_access: None,
        }
    }

    pub fn with_origin_filter(mut self, filter: Arc<dyn OriginFilter>) -> Self {
        self.origin = Some(filter);
        self
    }

    /// Record every read without consulting the origin filter.
    pub fn skip_origin_check(mut self, skip: bool) -> Self {
        self.skip_origin_check = skip;
        self
    }

    pub fn with_breakpoint(mut self, breakpoint: ActiveBreakpoint) -> Self {
        self.breakpoint = breakpoint;
        self
    }

    pub fn with_halt_handler(mut self, halt: Arc<dyn HaltHandler>) -> Self {
        self.halt = halt;
        self
    }

    /// Called after every recorded read with the read path.
    pub fn on_access<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        self.on_access = Some(Arc::new(callback));
        self
    }

    /// Wrap a state value. Nothing is read or recorded until the returned
    /// state is traversed.
    pub fn wrap(self: &Arc<Self>, state: Value) -> TrackedState {
        TrackedState {
            root: Arc::new(state),
            tracker: Arc::clone(self),
        }
    }

    /// Whether the read being intercepted right now should go unrecorded.
    pub fn should_skip(&self) -> bool {
        if self.guards.is_active() {
            return true;
        }
        if self.skip_origin_check {
            return false;
        }
        self.origin
            .as_ref()
            .is_some_and(|filter| filter.is_foreign())
    }

    /// Interception hook for a read of `value` at `path`.
    #[inline(never)]
    fn observe(&self, path: &Path, value: &Value) {
        if self.should_skip() {
            return;
        }

        if self.breakpoint.matches(path) {
            self.halt.halt(path, value);
        }

        let inserted = self.tree.write().record(path, value);
        trace!(path = %path, inserted, "state read");

        if let Some(callback) = &self.on_access {
            callback(path);
        }
    }
}

/// A state version wrapped for tracking.
///
/// Cheap to clone; clones share the underlying value and tracker.
#[derive(Clone)]
pub struct TrackedState {
    root: Arc<Value>,
    tracker: Arc<AccessTracker>,
}

impl TrackedState {
    /// Tracked view of the root value.
    pub fn view(&self) -> TrackedValue<'_> {
        TrackedValue {
            value: &self.root,
            path: Path::root(),
            tracker: &self.tracker,
        }
    }

    /// Read a top-level member.
    pub fn get(&self, key: &str) -> Option<TrackedValue<'_>> {
        self.view().get(key)
    }

    /// Read a top-level element.
    pub fn index(&self, index: usize) -> Option<TrackedValue<'_>> {
        self.view().index(index)
    }

    /// The plain state, bypassing tracking.
    pub fn value(&self) -> &Value {
        &self.root
    }
}

impl fmt::Debug for TrackedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedState")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// A value reached through a tracked state.
///
/// Member and element reads return further tracked views and record their
/// path. Inspecting the value itself (`as_str`, `is_object`, `keys`, ...)
/// records nothing beyond the read that produced this view.
#[derive(Clone)]
pub struct TrackedValue<'a> {
    value: &'a Value,
    path: Path,
    tracker: &'a AccessTracker,
}

impl<'a> TrackedValue<'a> {
    fn descend(&self, seg: Seg, child: &'a Value) -> TrackedValue<'a> {
        let path = self.path.child(seg);
        self.tracker.observe(&path, child);
        TrackedValue {
            value: child,
            path,
            tracker: self.tracker,
        }
    }

    /// Read a mapping member. `None` if this is not a mapping or the member
    /// does not exist; missing members are not recorded.
    pub fn get(&self, key: &str) -> Option<TrackedValue<'a>> {
        let child = self.value.as_object()?.get(key)?;
        Some(self.descend(Seg::Key(key.to_owned()), child))
    }

    /// Read a sequence element.
    pub fn index(&self, index: usize) -> Option<TrackedValue<'a>> {
        let child = self.value.as_array()?.get(index)?;
        Some(self.descend(Seg::Index(index), child))
    }

    /// Read a member or element by segment. Key segments also address
    /// sequence elements by their decimal text.
    pub fn at(&self, seg: &Seg) -> Option<TrackedValue<'a>> {
        match (seg, self.value) {
            (Seg::Key(k), Value::Array(_)) => self.index(k.parse().ok()?),
            (Seg::Key(k), _) => self.get(k),
            (Seg::Index(i), Value::Object(_)) => self.get(&i.to_string()),
            (Seg::Index(i), _) => self.index(*i),
        }
    }

    /// Read along `path`, recording every step.
    pub fn pointer(&self, path: &Path) -> Option<TrackedValue<'a>> {
        path.segments()
            .iter()
            .try_fold(self.clone(), |view, seg| view.at(seg))
    }

    /// Iterate mapping members, recording each one as it is yielded.
    pub fn entries(&self) -> Entries<'a> {
        Entries {
            parent: self.clone(),
            inner: self.value.as_object().map(|m| m.iter()),
        }
    }

    /// Iterate sequence elements, recording each one as it is yielded.
    pub fn elements(&self) -> Elements<'a> {
        Elements {
            parent: self.clone(),
            inner: self.value.as_array().map(|a| a.iter().enumerate()),
        }
    }

    /// Member names, without reading the members.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> {
        self.value
            .as_object()
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }

    /// Number of members or elements; 0 for primitives.
    pub fn len(&self) -> usize {
        match self.value {
            Value::Object(m) => m.len(),
            Value::Array(a) => a.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The plain value behind this view. Reads through it are not tracked.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.value.as_str()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value.as_u64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_object(&self) -> bool {
        self.value.is_object()
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }
}

impl PartialEq<Value> for TrackedValue<'_> {
    fn eq(&self, other: &Value) -> bool {
        self.value == other
    }
}

impl fmt::Debug for TrackedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedValue")
            .field("path", &self.path)
            .field("value", self.value)
            .finish()
    }
}

/// Iterator over the members of a tracked mapping.
pub struct Entries<'a> {
    parent: TrackedValue<'a>,
    inner: Option<serde_json::map::Iter<'a>>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, TrackedValue<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, child) = self.inner.as_mut()?.next()?;
        Some((key.as_str(), self.parent.descend(Seg::Key(key.clone()), child)))
    }
}

/// Iterator over the elements of a tracked sequence.
pub struct Elements<'a> {
    parent: TrackedValue<'a>,
    inner: Option<std::iter::Enumerate<std::slice::Iter<'a, Value>>>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = TrackedValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, child) = self.inner.as_mut()?.next()?;
        Some(self.parent.descend(Seg::Index(index), child))
    }
}
