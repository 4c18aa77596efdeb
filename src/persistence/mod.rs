//! Breakpoint persistence.
//!
//! The active breakpoint survives restarts by living in an external
//! key-value store under a single key. Hosts without such a store simply run
//! without persistence: saving becomes a no-op and loading finds nothing.

mod store;

pub use store::{BreakpointStore, FileStore, KeyValueStore, MemoryStore};

/// Default key the breakpoint is stored under.
pub const DEFAULT_BREAKPOINT_KEY: &str = "usageReportBreakpoint";
