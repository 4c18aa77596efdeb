//! Origin classification for intercepted reads.
//!
//! A read is "foreign" when the code that performed it is not application
//! code: a third-party dependency or an injected extension. Foreign reads are
//! left out of usage statistics.
//!
//! Classification sits behind [`OriginFilter`] so hosts without useful stack
//! introspection can plug in something else (an allow-list predicate, a
//! build-time marker). [`StackOriginFilter`] is the stack-walking default.
//!
//! # Example
//!
//! ```ignore
//! let filter = StackOriginFilter::from_config(&OriginConfig::default())?;
//! if filter.is_foreign() {
//!     // skip recording
//! }
//! ```

mod filter;
mod stack;

pub use filter::{NeverForeign, OriginConfig, StackOriginFilter};
pub use stack::{BacktraceSource, CallSite, StackSource};

/// Decides whether the read currently being intercepted came from foreign
/// code.
///
/// Implementations must not fail: when the origin cannot be determined the
/// answer is `false`, so legitimate application reads are still recorded.
pub trait OriginFilter: Send + Sync {
    fn is_foreign(&self) -> bool;
}

impl<F> OriginFilter for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_foreign(&self) -> bool {
        self()
    }
}
