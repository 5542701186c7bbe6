//! Source location tracking

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in the source text, as reported by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

impl Location {
    /// Create a new location
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Create a dummy location (for testing and synthesized nodes)
    pub fn dummy() -> Self {
        Self { line: 0, column: 0 }
    }

    /// Check if this is the dummy location
    pub fn is_dummy(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::dummy()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
