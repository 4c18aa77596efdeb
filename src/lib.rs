//! # Usage Report
//!
//! Instrumentation that records which parts of an application's state tree
//! are actually read, and reports the used and unused parts with size
//! metrics.
//!
//! ## Core Concepts
//!
//! - **Tracked state**: A transparent view over a state value that records
//!   every member and element read
//! - **Accessed paths**: The cumulative, monotonically growing record of what
//!   was read across all state versions
//! - **Origin filtering**: Reads performed by third-party or injected code
//!   are left out of the statistics
//! - **Reports**: Used/unused partition of one state snapshot, with leaf
//!   counts and serialized sizes
//! - **Breakpoint**: A single watched path that halts when read
//!
//! ## Example
//!
//! ```ignore
//! use usage_report::{Session, SessionConfig};
//! use serde_json::json;
//!
//! let session = Session::new(SessionConfig::default())?;
//! session.set_on_change(|hint| println!("usage changed: {hint}"));
//!
//! let state = session.transition(json!({
//!     "user": {"name": "Ada", "email": "ada@example.com"},
//!     "todos": [{"text": "write report", "done": false}]
//! }));
//!
//! // Application code reads through the tracked view
//! let name = state.get("user").and_then(|u| u.get("name"));
//!
//! let report = session.generate_report()?;
//! println!("{}% of the state was read", report.percent_used.unwrap_or(0));
//! ```

pub mod error;
pub mod notify;
pub mod origin;
pub mod persistence;
pub mod report;
pub mod session;
pub mod tracker;
pub mod tree;
pub mod types;

// Re-exports
pub use error::{Result, UsageError};
pub use notify::{ChangeCallback, Notifier};
pub use origin::{
    BacktraceSource, CallSite, NeverForeign, OriginConfig, OriginFilter, StackOriginFilter,
    StackSource,
};
pub use persistence::{
    BreakpointStore, FileStore, KeyValueStore, MemoryStore, DEFAULT_BREAKPOINT_KEY,
};
pub use report::{
    deep_count, unused_diff, PointerExtractor, Report, ReportGenerator, SubtreeStats,
    SummaryExtractor,
};
pub use session::{Session, SessionBuilder, SessionConfig};
#[cfg(feature = "interactive-halt")]
pub use tracker::ConsoleHalt;
pub use tracker::{
    AccessTracker, ActiveBreakpoint, DefaultHalt, Elements, Entries, GuardScope, Guards,
    HaltHandler, LogHalt, TrackedState, TrackedValue,
};
pub use tree::{AccessedPathTree, Node};
pub use types::{Path, Seg};
