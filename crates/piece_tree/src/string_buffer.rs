use crate::eol::{CR, LF, is_high_surrogate};
use crate::piece::BufferCursor;

/// Filler unit placed between an add-buffer `\r` and a following `\n` so the
/// two never fuse into one buffer-level line break.
const SEPARATOR: u16 = b'_' as u16;

/// An immutable chunk of UTF-16 text together with the offset at which each
/// of its lines starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringBuffer {
    buffer: Vec<u16>,
    line_starts: Vec<usize>,
}

impl StringBuffer {
    pub fn new(buffer: Vec<u16>) -> Self {
        let line_starts = Self::create_line_starts(&buffer);
        Self {
            buffer,
            line_starts,
        }
    }

    pub fn create_line_starts(text: &[u16]) -> Vec<usize> {
        let mut line_starts = vec![0];
        let len = text.len();
        let mut i = 0;

        while i < len {
            match text[i] {
                CR => {
                    if i + 1 < len && text[i + 1] == LF {
                        // \r\n
                        line_starts.push(i + 2);
                        i += 1;
                    } else {
                        line_starts.push(i + 1);
                    }
                }
                LF => line_starts.push(i + 1),
                _ => {}
            }

            i += 1;
        }

        line_starts
    }

    /// Cuts `text` into buffers of at most `max_len` units. A cut never
    /// separates `\r` from a following `\n`, nor a surrogate pair.
    pub fn split_into_chunks(text: &[u16], max_len: usize) -> Vec<StringBuffer> {
        let max_len = max_len.max(2);
        let mut chunks = Vec::with_capacity(text.len() / max_len + 1);
        let mut start = 0;
        while start < text.len() {
            let mut end = (start + max_len).min(text.len());
            if end < text.len() {
                let last = text[end - 1];
                if (last == CR && text[end] == LF) || is_high_surrogate(last) {
                    end -= 1;
                }
            }
            chunks.push(StringBuffer::new(text[start..end].to_vec()));
            start = end;
        }
        chunks
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn text(&self) -> &[u16] {
        &self.buffer
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    pub fn char_code_at(&self, offset: usize) -> Option<u16> {
        self.buffer.get(offset).copied()
    }

    /// Number of line breaks in the whole buffer.
    pub fn line_feed_count_total(&self) -> usize {
        self.line_starts.len() - 1
    }

    pub fn end_cursor(&self) -> BufferCursor {
        let last_line = self.line_starts.len() - 1;
        BufferCursor::new(last_line, self.buffer.len() - self.line_starts[last_line])
    }

    pub(crate) fn offset_of(&self, cursor: BufferCursor) -> usize {
        self.line_starts[cursor.line] + cursor.column
    }

    /// Cursor for `offset`, searching only lines `first_line..=last_line`.
    pub(crate) fn cursor_within(
        &self,
        offset: usize,
        first_line: usize,
        last_line: usize,
    ) -> BufferCursor {
        let candidates = &self.line_starts[first_line..=last_line];
        let idx = candidates
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line = first_line + idx;
        BufferCursor::new(line, offset - self.line_starts[line])
    }

    pub(crate) fn cursor_at(&self, offset: usize) -> BufferCursor {
        self.cursor_within(offset, 0, self.line_starts.len() - 1)
    }

    /// Line breaks in `[start, end)`. A span that stops between the `\r` and
    /// `\n` of a CRLF still owns that break.
    pub(crate) fn line_feed_count(&self, start: BufferCursor, end: BufferCursor) -> usize {
        if end.column == 0 || end.line == self.line_starts.len() - 1 {
            return end.line - start.line;
        }
        let end_offset = self.offset_of(end);
        let next_line_start = self.line_starts[end.line + 1];
        if next_line_start > end_offset + 1 {
            return end.line - start.line;
        }
        // The unit at `end_offset` is the `\n` that closes `end.line`.
        if self.buffer[end_offset - 1] == CR {
            end.line - start.line + 1
        } else {
            end.line - start.line
        }
    }
}

impl Default for StringBuffer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<&str> for StringBuffer {
    fn from(text: &str) -> Self {
        Self::new(text.encode_utf16().collect())
    }
}

/// The append-only buffer that holds all text inserted after construction.
#[derive(Debug, Clone, Default)]
pub struct AddBuffer {
    inner: StringBuffer,
}

impl AddBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_buffer(&self) -> &StringBuffer {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn end_cursor(&self) -> BufferCursor {
        self.inner.end_cursor()
    }

    /// Whether appending `text` right now would place a `\n` straight after
    /// a trailing `\r`.
    pub fn needs_separator(&self, text: &[u16]) -> bool {
        self.inner.buffer.last() == Some(&CR) && text.first() == Some(&LF)
    }

    /// Appends `text` and returns the cursors delimiting it.
    pub fn append(&mut self, text: &[u16]) -> (BufferCursor, BufferCursor) {
        if self.needs_separator(text) {
            self.inner.buffer.push(SEPARATOR);
        }
        let start_offset = self.inner.buffer.len();
        let new_starts = StringBuffer::create_line_starts(text);
        self.inner.buffer.extend_from_slice(text);
        self.inner
            .line_starts
            .extend(new_starts.into_iter().skip(1).map(|s| s + start_offset));

        (self.inner.cursor_at(start_offset), self.inner.end_cursor())
    }
}
