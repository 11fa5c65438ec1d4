//! Source information for translating expression ids to positions.

use std::collections::HashMap;
use std::fmt;

/// Compute character offsets of each line start.
///
/// Returns a vector where index i contains the offset where line i starts.
/// Line 0 always starts at offset 0.
pub fn compute_line_offsets(source: &str) -> Vec<i32> {
    let mut offsets = vec![0];
    for (i, c) in source.chars().enumerate() {
        if c == '\n' {
            offsets.push((i + 1) as i32);
        }
    }
    offsets
}

/// A resolved source position.
///
/// `line` is 1-based. `column` is 0-based and displayed 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column + 1)
    }
}

/// Expression positions plus the line-start table of the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    description: String,
    line_offsets: Vec<i32>,
    positions: HashMap<i64, i32>,
}

impl SourceInfo {
    pub fn new(line_offsets: Vec<i32>, positions: HashMap<i64, i32>) -> Self {
        Self {
            description: String::new(),
            line_offsets,
            positions,
        }
    }

    /// Build source info for the given text with no expression positions yet.
    pub fn from_source(source: &str) -> Self {
        Self::new(compute_line_offsets(source), HashMap::new())
    }

    /// Name the source, e.g. a file name, for rendered diagnostics.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_position(mut self, expr_id: i64, offset: i32) -> Self {
        self.positions.insert(expr_id, offset);
        self
    }

    pub fn set_position(&mut self, expr_id: i64, offset: i32) {
        self.positions.insert(expr_id, offset);
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn line_offsets(&self) -> &[i32] {
        &self.line_offsets
    }

    /// Get the character offset recorded for an expression id.
    pub fn position(&self, expr_id: i64) -> Option<i32> {
        self.positions.get(&expr_id).copied()
    }

    /// Resolve an expression id to a line and column.
    pub fn location(&self, expr_id: i64) -> Option<Location> {
        self.position(expr_id).map(|offset| self.offset_location(offset))
    }

    /// Resolve a character offset to a line and column.
    pub fn offset_location(&self, offset: i32) -> Location {
        // Number of line starts at or before the offset is the 1-based line.
        let line = self.line_offsets.partition_point(|&start| start <= offset);
        if line == 0 {
            return Location {
                line: 1,
                column: offset.max(0) as u32,
            };
        }
        let start = self.line_offsets[line - 1];
        Location {
            line: line as u32,
            column: (offset - start) as u32,
        }
    }
}
