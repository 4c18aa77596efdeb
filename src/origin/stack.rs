//! Call stack capture.

use lru::LruCache;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::num::NonZeroUsize;

/// Default number of resolved instruction pointers kept in the cache.
const DEFAULT_CACHE_SIZE: usize = 4096;

/// Frames deeper than this are not captured.
const DEFAULT_MAX_DEPTH: usize = 128;

/// One resolved frame of a call stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSite {
    /// Demangled function name, if known.
    pub function: Option<String>,
    /// Source file, if debug info is available.
    pub file: Option<String>,
}

impl CallSite {
    pub fn new(function: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            file: Some(file.into()),
        }
    }
}

/// Produces the current call stack, innermost frame first.
pub trait StackSource: Send + Sync {
    /// Capture the stack of the calling thread. `None` when capture is not
    /// possible on this platform.
    fn capture(&self) -> Option<Vec<CallSite>>;
}

/// Captures stacks with the `backtrace` crate.
///
/// Walking the stack is cheap; symbol resolution is not. Resolved frames are
/// cached per instruction pointer, so repeated reads from the same call sites
/// only pay for the walk.
pub struct BacktraceSource {
    /// Resolved symbols by instruction pointer. One pointer can expand to
    /// several call sites when functions were inlined.
    cache: Mutex<LruCache<usize, Vec<CallSite>>>,
    max_depth: usize,
}

impl BacktraceSource {
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(cache_size: usize) -> Self {
        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cache_size)),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    fn resolve(ip: usize) -> Vec<CallSite> {
        let mut sites = Vec::new();
        backtrace::resolve(ip as *mut c_void, |symbol| {
            sites.push(CallSite {
                function: symbol.name().map(|name| name.to_string()),
                file: symbol.filename().map(|path| path.display().to_string()),
            });
        });
        if sites.is_empty() {
            sites.push(CallSite::default());
        }
        sites
    }
}

impl Default for BacktraceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StackSource for BacktraceSource {
    fn capture(&self) -> Option<Vec<CallSite>> {
        let mut ips = Vec::with_capacity(32);
        backtrace::trace(|frame| {
            ips.push(frame.ip() as usize);
            ips.len() < self.max_depth
        });
        if ips.is_empty() {
            return None;
        }

        let mut cache = self.cache.lock();
        let mut stack = Vec::with_capacity(ips.len());
        for ip in ips {
            if let Some(sites) = cache.get(&ip) {
                stack.extend(sites.iter().cloned());
                continue;
            }
            let sites = Self::resolve(ip);
            stack.extend(sites.iter().cloned());
            cache.put(ip, sites);
        }
        Some(stack)
    }
}
