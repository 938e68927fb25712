/// A location inside one backing buffer, relative to that buffer's own
/// line starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferCursor {
    pub line: usize,
    pub column: usize,
}

impl BufferCursor {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Which buffer a piece reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Index into the immutable original buffers.
    Original(usize),
    /// The append-only add buffer.
    Add,
}

/// A contiguous span `[start, end)` of one buffer. `length` and
/// `line_feed_cnt` cache the length and line break count of that span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub(crate) kind: BufferKind,
    pub(crate) start: BufferCursor,
    pub(crate) end: BufferCursor,
    pub(crate) length: usize,
    pub(crate) line_feed_cnt: usize,
}

impl Piece {
    pub fn new(
        kind: BufferKind,
        start: BufferCursor,
        end: BufferCursor,
        length: usize,
        line_feed_cnt: usize,
    ) -> Self {
        Self {
            kind,
            start,
            end,
            length,
            line_feed_cnt,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(
            BufferKind::Add,
            BufferCursor::default(),
            BufferCursor::default(),
            0,
            0,
        )
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn start(&self) -> BufferCursor {
        self.start
    }

    pub fn end(&self) -> BufferCursor {
        self.end
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn line_feed_cnt(&self) -> usize {
        self.line_feed_cnt
    }
}
