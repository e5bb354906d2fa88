//! Source positions

use std::fmt;
use std::sync::Arc;

/// Position in source code: file name plus byte offsets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pos {
    pub file: Arc<str>,
    pub start: usize,
    pub end: usize,
}

impl Pos {
    pub fn new(file: impl Into<Arc<str>>, start: usize, end: usize) -> Self {
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    /// Position for nodes that do not come from source text
    pub fn unknown() -> Self {
        Self::new("", 0, 0)
    }

    /// Smallest position covering both
    pub fn merge(&self, other: &Pos) -> Pos {
        if self.file != other.file {
            return self.clone();
        }
        Pos {
            file: self.file.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.file, self.start, self.end)
    }
}
