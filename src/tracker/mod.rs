//! Transparent read tracking over state trees.
//!
//! [`AccessTracker::wrap`] turns a state value into a [`TrackedState`]. Reads
//! through its views return the same values the plain state would, and record
//! the path of every member or element read into the shared
//! [`AccessedPathTree`](crate::tree::AccessedPathTree). Nested values are
//! wrapped lazily as they are reached, so cost follows the traversal rather
//! than the size of the tree.
//!
//! Reads are not recorded while a [`Guards`] scope is active or when the
//! origin filter classifies the reader as foreign code.

mod breakpoint;
mod guard;
mod view;

pub use breakpoint::{ActiveBreakpoint, DefaultHalt, HaltHandler, LogHalt};
#[cfg(feature = "interactive-halt")]
pub use breakpoint::ConsoleHalt;
pub use guard::{GuardScope, Guards};
pub use view::{AccessTracker, Elements, Entries, TrackedState, TrackedValue};

/// Prefix of every function name in this module. The origin filter uses it
/// to find the interception frames on a captured stack.
pub(crate) const HOOK_MARKER: &str = concat!(module_path!(), "::");
