//! Accessed-state model.
//!
//! A mirror of the state tree holding only the paths that were read. The
//! tree grows monotonically: once a path is recorded it stays recorded for
//! the lifetime of the session, even if later state versions drop it.

mod accessed;

pub use accessed::{AccessedPathTree, Node};
