use thiserror::Error;

/// Range violations reported by [`crate::PieceTree`] queries and edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PieceTreeError {
    #[error("line {line} is out of range (line count {line_count})")]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("column {column} is out of range for line {line} (length {line_length})")]
    ColumnOutOfRange {
        line: usize,
        column: usize,
        line_length: usize,
    },

    #[error("offset {offset} is out of range (length {length})")]
    OffsetOutOfRange { offset: usize, length: usize },

    #[error("range {start}..{end} is out of bounds (length {length})")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        length: usize,
    },
}
