//! Core types for state paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step into a state tree.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Mapping member.
    Key(String),
    /// Sequence element.
    Index(usize),
}

impl Seg {
    /// Key form of this segment. Indices render as their decimal text.
    pub fn as_key(&self) -> String {
        match self {
            Seg::Key(k) => k.clone(),
            Seg::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Debug for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, "Key({:?})", k),
            Seg::Index(i) => write!(f, "Index({})", i),
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => f.write_str(k),
            Seg::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// Location of a value inside a state tree, from the root.
///
/// The canonical string form is dot-joined (`todos.0.text`), which is what
/// breakpoints are compared against.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dot-delimited path. Every segment becomes a key.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        Self(s.split('.').map(Seg::from).collect())
    }

    /// Return a new path with `seg` appended.
    pub fn child(&self, seg: impl Into<Seg>) -> Self {
        let mut segs = Vec::with_capacity(self.0.len() + 1);
        segs.extend_from_slice(&self.0);
        segs.push(seg.into());
        Self(segs)
    }

    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Dot-joined form, e.g. `a.b.0`.
    pub fn dotted(&self) -> String {
        self.to_string()
    }

    /// Compare against a dot-delimited string without allocating.
    pub fn matches_dotted(&self, dotted: &str) -> bool {
        if self.0.is_empty() {
            return dotted.is_empty();
        }
        let mut parts = dotted.split('.');
        for seg in &self.0 {
            let Some(part) = parts.next() else {
                return false;
            };
            let equal = match seg {
                Seg::Key(k) => k == part,
                Seg::Index(i) => is_canonical_index(part) && part.parse::<usize>().ok() == Some(*i),
            };
            if !equal {
                return false;
            }
        }
        parts.next().is_none()
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.to_string())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl From<Vec<Seg>> for Path {
    fn from(segs: Vec<Seg>) -> Self {
        Self(segs)
    }
}

/// Decimal digits without sign or leading zeros.
fn is_canonical_index(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s == "0" || !s.starts_with('0'))
}
