//! Breakpoint matching and halting.

use crate::types::Path;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// The single watched path, shared between a session and its trackers.
///
/// Setting a new path replaces the old one. An empty string clears it.
#[derive(Clone, Debug, Default)]
pub struct ActiveBreakpoint(Arc<RwLock<Option<String>>>);

impl ActiveBreakpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    pub fn set(&self, path: Option<String>) {
        *self.0.write() = path.filter(|p| !p.is_empty());
    }

    pub fn clear(&self) {
        *self.0.write() = None;
    }

    /// Whether `path` is exactly the watched path.
    pub fn matches(&self, path: &Path) -> bool {
        self.0
            .read()
            .as_deref()
            .is_some_and(|watched| path.matches_dotted(watched))
    }
}

/// Invoked synchronously when the watched path is read, before the value is
/// handed back to the reader.
pub trait HaltHandler: Send + Sync {
    fn halt(&self, path: &Path, value: &Value);
}

impl<F> HaltHandler for F
where
    F: Fn(&Path, &Value) + Send + Sync,
{
    fn halt(&self, path: &Path, value: &Value) {
        self(path, value)
    }
}

/// Halt handler used when none is configured: [`ConsoleHalt`] with the
/// `interactive-halt` feature, [`LogHalt`] otherwise.
#[cfg(feature = "interactive-halt")]
pub type DefaultHalt = ConsoleHalt;
#[cfg(not(feature = "interactive-halt"))]
pub type DefaultHalt = LogHalt;

/// Logs the hit with the reader's stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogHalt;

impl HaltHandler for LogHalt {
    fn halt(&self, path: &Path, value: &Value) {
        let stack = backtrace::Backtrace::new();
        warn!(path = %path, value = %value, stack = ?stack, "breakpoint hit");
    }
}

/// Suspends the process until a line is entered on stdin.
///
/// Only meant for interactive debugging sessions.
#[cfg(feature = "interactive-halt")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleHalt;

#[cfg(feature = "interactive-halt")]
impl HaltHandler for ConsoleHalt {
    fn halt(&self, path: &Path, value: &Value) {
        use std::io::{BufRead, Write};

        let stack = backtrace::Backtrace::new();
        let stderr = std::io::stderr();
        let mut out = stderr.lock();
        let _ = writeln!(out, "breakpoint hit at `{}`: {}", path, value);
        let _ = writeln!(out, "{:?}", stack);
        let _ = write!(out, "press Enter to continue... ");
        let _ = out.flush();
        drop(out);

        let mut line = String::new();
        if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
            warn!(error = %e, "could not wait on stdin; continuing");
        }
    }
}
