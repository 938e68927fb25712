//! Piece tree text storage.
//!
//! A document is a sequence of [`Piece`]s, each naming a span of one
//! immutable original [`StringBuffer`] or of the append-only [`AddBuffer`].
//! The pieces live in a red-black tree whose nodes cache the length and the
//! line feed count of their left subtree, which turns offset and line lookups
//! into a single root-to-leaf descent.
//!
//! All offsets, lengths and columns count UTF-16 code units.

mod eol;
mod error;
mod node;
mod piece;
mod string_buffer;

#[cfg(test)]
mod invariants;

use node::{NodeArena, NodeId, SENTINEL};
use tracing::{debug, trace};

pub use crate::eol::{
    EndOfLine, EolCounts, count_line_breaks, is_high_surrogate, normalize_eol, split_lines,
};
pub use crate::error::PieceTreeError;
pub use crate::node::NodeColor;
pub use crate::piece::{BufferCursor, BufferKind, Piece};
pub use crate::string_buffer::{AddBuffer, StringBuffer};

use crate::eol::{CR, LF};

/// Preferred size of the chunks created when the whole text is rebuilt.
pub const AVERAGE_BUFFER_SIZE: usize = 65535;

/// A 0-based line and a 0-based column in UTF-16 code units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Where a descent by offset ended up.
#[derive(Debug, Clone, Copy)]
struct NodePosition {
    node: NodeId,
    /// Offset inside the node's piece.
    remainder: usize,
    /// Line feeds in every piece before this node.
    lf_before: usize,
}

#[derive(Debug, Clone)]
pub struct PieceTree {
    nodes: NodeArena,
    buffers: Vec<StringBuffer>,
    add_buffer: AddBuffer,
    length: usize,
    line_count: usize,
    eol: EndOfLine,
    eol_normalized: bool,
}

impl Default for PieceTree {
    fn default() -> Self {
        Self::new(Vec::new(), EndOfLine::default(), false)
    }
}

impl PieceTree {
    /// Builds a tree with one piece per non-empty chunk, in order.
    ///
    /// With `eol_normalized` set, raw content is presented with every line
    /// break rendered as `eol`; the stored text is left as it is.
    pub fn new(chunks: Vec<StringBuffer>, eol: EndOfLine, eol_normalized: bool) -> Self {
        let mut tree = Self {
            nodes: NodeArena::new(),
            buffers: Vec::with_capacity(chunks.len()),
            add_buffer: AddBuffer::new(),
            length: 0,
            line_count: 1,
            eol,
            eol_normalized,
        };

        let mut seams = Vec::with_capacity(chunks.len());
        let mut last_node = SENTINEL;
        for chunk in chunks {
            if chunk.is_empty() {
                continue;
            }
            let piece = Piece::new(
                BufferKind::Original(tree.buffers.len()),
                BufferCursor::new(0, 0),
                chunk.end_cursor(),
                chunk.len(),
                chunk.line_feed_count_total(),
            );
            tree.length += chunk.len();
            seams.push(tree.length);
            tree.buffers.push(chunk);
            last_node = tree.nodes.insert_right(last_node, piece);
        }

        // A caller may hand over chunks that cut a CRLF in two.
        seams.pop();
        for seam in seams {
            tree.fix_crlf_at(seam);
        }
        tree.compute_buffer_metadata();

        debug!(
            buffers = tree.buffers.len(),
            length = tree.length,
            line_count = tree.line_count,
            "piece tree created"
        );
        tree
    }

    /// Total length of the stored text.
    pub fn get_buffer_length(&self) -> usize {
        self.length
    }

    pub fn get_line_count(&self) -> usize {
        self.line_count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_eol(&self) -> EndOfLine {
        self.eol
    }

    pub fn is_eol_normalized(&self) -> bool {
        self.eol_normalized
    }

    pub fn original_buffers(&self) -> &[StringBuffer] {
        &self.buffers
    }

    pub fn add_buffer(&self) -> &AddBuffer {
        &self.add_buffer
    }

    /// Pieces in document order.
    pub fn pieces(&self) -> Pieces<'_> {
        let root = self.nodes.root();
        let next = if root == SENTINEL {
            SENTINEL
        } else {
            self.nodes.leftmost(root)
        };
        Pieces { tree: self, next }
    }

    /// Every line, without its line break.
    pub fn get_content(&self) -> Vec<String> {
        let units = self.raw_units();
        split_lines(&units)
            .into_iter()
            .map(String::from_utf16_lossy)
            .collect()
    }

    /// The whole text, line breaks included.
    pub fn get_raw_content(&self) -> String {
        if self.eol_normalized {
            return self.get_content().join(self.eol.as_str());
        }
        String::from_utf16_lossy(&self.raw_units())
    }

    pub fn get_line(&self, line: usize) -> Result<String, PieceTreeError> {
        let (start, content_end, _) = self.line_bounds(line)?;
        Ok(String::from_utf16_lossy(
            &self.units_in_range(start, content_end),
        ))
    }

    /// Line `line` including its line break, if it has one.
    pub fn get_raw_line(&self, line: usize) -> Result<String, PieceTreeError> {
        let (start, content_end, raw_end) = self.line_bounds(line)?;
        if self.eol_normalized && raw_end > content_end {
            let mut text = self.units_in_range(start, content_end);
            text.extend_from_slice(self.eol.as_utf16());
            return Ok(String::from_utf16_lossy(&text));
        }
        Ok(String::from_utf16_lossy(&self.units_in_range(start, raw_end)))
    }

    pub fn get_line_length(&self, line: usize) -> Result<usize, PieceTreeError> {
        let (start, content_end, _) = self.line_bounds(line)?;
        Ok(content_end - start)
    }

    pub fn get_raw_line_length(&self, line: usize) -> Result<usize, PieceTreeError> {
        let (start, content_end, raw_end) = self.line_bounds(line)?;
        if self.eol_normalized && raw_end > content_end {
            return Ok(content_end - start + self.eol.as_utf16().len());
        }
        Ok(raw_end - start)
    }

    pub fn get_offset_at(&self, line: usize, column: usize) -> Result<usize, PieceTreeError> {
        let (start, content_end, _) = self.line_bounds(line)?;
        let line_length = content_end - start;
        if column > line_length {
            return Err(PieceTreeError::ColumnOutOfRange {
                line,
                column,
                line_length,
            });
        }
        Ok(start + column)
    }

    /// Position of `offset`. Offsets past the end clamp to the end of the
    /// document.
    pub fn get_position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.length);
        if offset == 0 {
            return Position::new(0, 0);
        }

        // Count the line breaks completed by the unit just before `offset`.
        let Some(found) = self.node_at(offset - 1) else {
            return Position::new(0, 0);
        };
        let piece = self.nodes[found.node].piece;
        let breaks = if found.remainder + 1 == piece.length {
            // Pieces never end inside a document-level CRLF.
            piece.line_feed_cnt
        } else {
            self.position_in_buffer(&piece, found.remainder + 1).line - piece.start.line
        };

        let line = found.lf_before + breaks;
        Position::new(line, offset - self.line_start_offset(line))
    }

    pub fn get_charcode_at(&self, offset: usize) -> Result<u16, PieceTreeError> {
        self.char_at(offset)
            .ok_or(PieceTreeError::OffsetOutOfRange {
                offset,
                length: self.length,
            })
    }

    /// The code unit at `index` of line `line`, line break included.
    pub fn get_line_charcode(&self, line: usize, index: usize) -> Result<u16, PieceTreeError> {
        let (start, _, raw_end) = self.line_bounds(line)?;
        if start + index >= raw_end {
            return Err(PieceTreeError::ColumnOutOfRange {
                line,
                column: index,
                line_length: raw_end - start,
            });
        }
        self.get_charcode_at(start + index)
    }

    /// Raw text of `[start, end)`.
    pub fn get_value_in_range(&self, start: usize, end: usize) -> Result<String, PieceTreeError> {
        if start > end || end > self.length {
            return Err(PieceTreeError::RangeOutOfBounds {
                start,
                end,
                length: self.length,
            });
        }
        Ok(String::from_utf16_lossy(&self.units_in_range(start, end)))
    }

    pub fn insert_at(&mut self, offset: usize, text: &str) -> Result<(), PieceTreeError> {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.insert_utf16_at(offset, &units)
    }

    pub fn insert_utf16_at(&mut self, offset: usize, text: &[u16]) -> Result<(), PieceTreeError> {
        if offset > self.length {
            return Err(PieceTreeError::OffsetOutOfRange {
                offset,
                length: self.length,
            });
        }
        if text.is_empty() {
            return Ok(());
        }

        if !self.try_extend_add_piece(offset, text) {
            match self.node_at(offset) {
                None => {
                    let piece = self.append_piece(text);
                    let last = self.nodes.rightmost(self.nodes.root());
                    self.nodes.insert_right(last, piece);
                }
                Some(found) if found.remainder == 0 => {
                    let piece = self.append_piece(text);
                    self.nodes.insert_left(found.node, piece);
                }
                Some(found) => {
                    self.split_node(found.node, found.remainder);
                    let piece = self.append_piece(text);
                    self.nodes.insert_right(found.node, piece);
                }
            }
        }

        self.length += text.len();
        self.fix_crlf_at(offset);
        self.fix_crlf_at(offset + text.len());
        self.compute_buffer_metadata();

        trace!(
            offset,
            len = text.len(),
            nodes = self.nodes.len(),
            "inserted text"
        );
        Ok(())
    }

    pub fn delete_at(&mut self, offset: usize, length: usize) -> Result<(), PieceTreeError> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= self.length)
            .ok_or(PieceTreeError::RangeOutOfBounds {
                start: offset,
                end: offset.saturating_add(length),
                length: self.length,
            })?;
        if length == 0 {
            return Ok(());
        }

        self.split_at(offset);
        self.split_at(end);

        // Both ends are piece boundaries now, so whole nodes starting at
        // `offset` are dropped until the range is used up. Handles are looked
        // up again each round because removal may move pieces between nodes.
        let mut remaining = length;
        while remaining > 0 {
            let Some(found) = self.node_at(offset) else {
                break;
            };
            remaining -= self.nodes[found.node].piece.length;
            self.nodes.remove(found.node);
        }

        self.length -= length;
        self.fix_crlf_at(offset);
        self.compute_buffer_metadata();

        trace!(
            offset,
            len = length,
            nodes = self.nodes.len(),
            "deleted text"
        );
        Ok(())
    }

    /// Rewrites every line break to `eol` and rebuilds the tree over fresh
    /// chunks. Presentation is normalized from then on.
    pub fn set_eol(&mut self, eol: EndOfLine) {
        let text = normalize_eol(&self.raw_units(), eol);
        let chunks = StringBuffer::split_into_chunks(&text, AVERAGE_BUFFER_SIZE);
        debug!(?eol, chunks = chunks.len(), "rewriting line breaks");
        *self = Self::new(chunks, eol, true);
    }

    fn compute_buffer_metadata(&mut self) {
        let mut x = self.nodes.root();

        let mut lf_cnt = 1;
        let mut len = 0;

        while x != SENTINEL {
            let node = &self.nodes[x];
            lf_cnt += node.lf_left + node.piece.line_feed_cnt;
            len += node.size_left + node.piece.length;
            x = node.right;
        }

        self.line_count = lf_cnt;
        self.length = len;
    }

    fn buffer(&self, kind: BufferKind) -> &StringBuffer {
        match kind {
            BufferKind::Original(idx) => &self.buffers[idx],
            BufferKind::Add => self.add_buffer.as_buffer(),
        }
    }

    fn piece_units(&self, piece: &Piece) -> &[u16] {
        let buffer = self.buffer(piece.kind);
        let start = buffer.offset_of(piece.start);
        &buffer.text()[start..start + piece.length]
    }

    fn raw_units(&self) -> Vec<u16> {
        let mut units = Vec::with_capacity(self.length);
        for piece in self.pieces() {
            units.extend_from_slice(self.piece_units(piece));
        }
        units
    }

    fn units_in_range(&self, start: usize, end: usize) -> Vec<u16> {
        let mut units = Vec::with_capacity(end.saturating_sub(start));
        if start >= end {
            return units;
        }
        let Some(found) = self.node_at(start) else {
            return units;
        };

        let wanted = end - start;
        let mut node = found.node;
        let mut from = found.remainder;
        while node != SENTINEL && units.len() < wanted {
            let piece_units = self.piece_units(&self.nodes[node].piece);
            let take = (piece_units.len() - from).min(wanted - units.len());
            units.extend_from_slice(&piece_units[from..from + take]);
            from = 0;
            node = self.nodes.next(node);
        }
        units
    }

    fn char_at(&self, offset: usize) -> Option<u16> {
        let found = self.node_at(offset)?;
        let piece = &self.nodes[found.node].piece;
        let buffer = self.buffer(piece.kind);
        buffer.char_code_at(buffer.offset_of(piece.start) + found.remainder)
    }

    /// Descends to the node whose piece contains `offset`.
    fn node_at(&self, mut offset: usize) -> Option<NodePosition> {
        let mut x = self.nodes.root();
        let mut lf_before = 0;

        while x != SENTINEL {
            let node = &self.nodes[x];
            if offset < node.size_left {
                x = node.left;
            } else if offset < node.size_left + node.piece.length {
                return Some(NodePosition {
                    node: x,
                    remainder: offset - node.size_left,
                    lf_before: lf_before + node.lf_left,
                });
            } else {
                offset -= node.size_left + node.piece.length;
                lf_before += node.lf_left + node.piece.line_feed_cnt;
                x = node.right;
            }
        }
        None
    }

    /// Offset of the first unit of `line`, descending by line feed counts.
    fn line_start_offset(&self, mut line: usize) -> usize {
        let mut x = self.nodes.root();
        let mut left_len = 0;

        while x != SENTINEL {
            let node = &self.nodes[x];
            if node.left != SENTINEL && node.lf_left >= line {
                x = node.left;
            } else if node.lf_left + node.piece.line_feed_cnt >= line {
                return left_len
                    + node.size_left
                    + self.accumulated_value(&node.piece, line - node.lf_left);
            } else {
                line -= node.lf_left + node.piece.line_feed_cnt;
                left_len += node.size_left + node.piece.length;
                x = node.right;
            }
        }
        left_len
    }

    /// Offset inside `piece` just past its `index`-th line break.
    fn accumulated_value(&self, piece: &Piece, index: usize) -> usize {
        if index == 0 {
            return 0;
        }
        let buffer = self.buffer(piece.kind);
        let expected_line = piece.start.line + index;
        if expected_line > piece.end.line {
            piece.length
        } else {
            buffer.line_starts()[expected_line] - buffer.offset_of(piece.start)
        }
    }

    /// `(start, content_end, raw_end)` offsets of `line`.
    fn line_bounds(&self, line: usize) -> Result<(usize, usize, usize), PieceTreeError> {
        if line >= self.line_count {
            return Err(PieceTreeError::LineOutOfRange {
                line,
                line_count: self.line_count,
            });
        }
        let start = self.line_start_offset(line);
        if line + 1 == self.line_count {
            return Ok((start, self.length, self.length));
        }

        let raw_end = self.line_start_offset(line + 1);
        let eol_len = if raw_end >= start + 2
            && self.char_at(raw_end - 1) == Some(LF)
            && self.char_at(raw_end - 2) == Some(CR)
        {
            2
        } else {
            1
        };
        Ok((start, raw_end - eol_len, raw_end))
    }

    fn position_in_buffer(&self, piece: &Piece, remainder: usize) -> BufferCursor {
        let buffer = self.buffer(piece.kind);
        let offset = buffer.offset_of(piece.start) + remainder;
        buffer.cursor_within(offset, piece.start.line, piece.end.line)
    }

    /// The part of `piece` between the relative offsets `from` and `to`.
    fn slice_piece(&self, piece: &Piece, from: usize, to: usize) -> Piece {
        let start = self.position_in_buffer(piece, from);
        let end = self.position_in_buffer(piece, to);
        let line_feed_cnt = self.buffer(piece.kind).line_feed_count(start, end);
        Piece::new(piece.kind, start, end, to - from, line_feed_cnt)
    }

    fn append_piece(&mut self, text: &[u16]) -> Piece {
        let (start, end) = self.add_buffer.append(text);
        let line_feed_cnt = self.add_buffer.as_buffer().line_feed_count(start, end);
        Piece::new(BufferKind::Add, start, end, text.len(), line_feed_cnt)
    }

    /// Grows the piece that ends at `offset` when it also ends the add
    /// buffer, which is the common case of typing text sequentially.
    fn try_extend_add_piece(&mut self, offset: usize, text: &[u16]) -> bool {
        if offset == 0 {
            return false;
        }
        let Some(found) = self.node_at(offset - 1) else {
            return false;
        };
        let piece = self.nodes[found.node].piece;
        if found.remainder + 1 != piece.length
            || piece.kind != BufferKind::Add
            || piece.end != self.add_buffer.end_cursor()
            || self.add_buffer.needs_separator(text)
        {
            return false;
        }

        let (_, end) = self.add_buffer.append(text);
        let line_feed_cnt = self.add_buffer.as_buffer().line_feed_count(piece.start, end);
        let grown = Piece::new(
            BufferKind::Add,
            piece.start,
            end,
            piece.length + text.len(),
            line_feed_cnt,
        );
        self.nodes.replace_piece(found.node, grown);
        true
    }

    fn split_node(&mut self, node: NodeId, remainder: usize) {
        let piece = self.nodes[node].piece;
        let head = self.slice_piece(&piece, 0, remainder);
        let tail = self.slice_piece(&piece, remainder, piece.length);
        self.nodes.replace_piece(node, head);
        self.nodes.insert_right(node, tail);
    }

    /// Makes `offset` a piece boundary.
    fn split_at(&mut self, offset: usize) {
        if let Some(found) = self.node_at(offset).filter(|found| found.remainder > 0) {
            self.split_node(found.node, found.remainder);
        }
    }

    /// Repairs the piece boundary at `offset` if it separates `\r` from `\n`.
    fn fix_crlf_at(&mut self, offset: usize) {
        if offset == 0 || offset >= self.length {
            return;
        }
        let Some(found) = self.node_at(offset) else {
            return;
        };
        if found.remainder != 0 {
            return;
        }
        let next = found.node;
        let prev = self.nodes.prev(next);
        if prev == SENTINEL {
            return;
        }
        let starts_with_lf = self.piece_units(&self.nodes[next].piece).first() == Some(&LF);
        let ends_with_cr = self.piece_units(&self.nodes[prev].piece).last() == Some(&CR);
        if starts_with_lf && ends_with_cr {
            self.fix_crlf(prev, next);
        }
    }

    /// Moves the `\r` ending `prev` and the `\n` starting `next` into one
    /// `"\r\n"` piece between them.
    fn fix_crlf(&mut self, prev: NodeId, next: NodeId) {
        trace!(offset = self.node_offset(next), "repairing split CRLF");

        let prev_piece = self.nodes[prev].piece;
        let next_piece = self.nodes[next].piece;
        let crlf = self.append_piece(&[CR, LF]);

        match (prev_piece.length == 1, next_piece.length == 1) {
            (true, true) => {
                self.nodes.replace_piece(prev, crlf);
                self.nodes.remove(next);
            }
            (true, false) => {
                let tail = self.slice_piece(&next_piece, 1, next_piece.length);
                self.nodes.replace_piece(prev, crlf);
                self.nodes.replace_piece(next, tail);
            }
            (false, true) => {
                let head = self.slice_piece(&prev_piece, 0, prev_piece.length - 1);
                self.nodes.replace_piece(prev, head);
                self.nodes.replace_piece(next, crlf);
            }
            (false, false) => {
                let head = self.slice_piece(&prev_piece, 0, prev_piece.length - 1);
                let tail = self.slice_piece(&next_piece, 1, next_piece.length);
                self.nodes.replace_piece(prev, head);
                self.nodes.replace_piece(next, tail);
                self.nodes.insert_right(prev, crlf);
            }
        }
    }

    /// Document offset at which `node` starts.
    fn node_offset(&self, node: NodeId) -> usize {
        let mut offset = self.nodes[node].size_left;
        let mut x = node;
        while x != self.nodes.root() {
            let parent = self.nodes[x].parent;
            if self.nodes[parent].right == x {
                offset += self.nodes[parent].size_left + self.nodes[parent].piece.length;
            }
            x = parent;
        }
        offset
    }
}

/// In-order iterator over the pieces of a [`PieceTree`].
pub struct Pieces<'a> {
    tree: &'a PieceTree,
    next: NodeId,
}

impl<'a> Iterator for Pieces<'a> {
    type Item = &'a Piece;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == SENTINEL {
            return None;
        }
        let tree = self.tree;
        let current = self.next;
        self.next = tree.nodes.next(current);
        Some(&tree.nodes[current].piece)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree_from(chunks: &[&str]) -> PieceTree {
        let buffers = chunks.iter().map(|c| StringBuffer::from(*c)).collect();
        PieceTree::new(buffers, EndOfLine::Lf, false)
    }

    #[test]
    fn lines_basic_unix() {
        let tree = tree_from(&["Hello\nWorld"]);

        assert_eq!(tree.get_content(), vec!["Hello", "World"]);
        assert_eq!(tree.get_line(0).unwrap(), "Hello");
        assert_eq!(tree.get_line(1).unwrap(), "World");
        assert_eq!(
            tree.get_line(2),
            Err(PieceTreeError::LineOutOfRange {
                line: 2,
                line_count: 2
            })
        );
    }

    #[test]
    fn lines_crlf_single_buffer() {
        let tree = tree_from(&["abc\r\ndef\r\nxyz"]);

        assert_eq!(tree.get_content(), vec!["abc", "def", "xyz"]);
        assert_eq!(tree.get_raw_line(0).unwrap(), "abc\r\n");
        assert_eq!(tree.get_raw_line(2).unwrap(), "xyz");
        assert_eq!(tree.get_line_length(1).unwrap(), 3);
        assert_eq!(tree.get_raw_line_length(1).unwrap(), 5);
        assert!(tree.get_line(3).is_err());
    }

    #[test]
    fn lines_multiple_chunks() {
        let tree = tree_from(&["foo\n", "bar\nbaz"]);

        assert_eq!(tree.get_content(), vec!["foo", "bar", "baz"]);
        assert_eq!(tree.get_line_count(), 3);
        assert_eq!(tree.get_line(2).unwrap(), "baz");
    }

    #[test]
    fn lines_trailing_newline() {
        let tree = tree_from(&["a\nb\n"]);

        assert_eq!(tree.get_content(), vec!["a", "b", ""]);
        assert_eq!(tree.get_line(2).unwrap(), "");
        assert!(tree.get_raw_line(3).is_err());
    }

    #[test]
    fn empty_document_has_one_empty_line() {
        let tree = PieceTree::default();
        assert_eq!(tree.get_content(), vec![""]);
        assert_eq!(tree.get_raw_content(), "");
        assert_eq!(tree.get_line_count(), 1);
        assert_eq!(tree.get_buffer_length(), 0);
        assert_eq!(tree.get_position_at(10), Position::new(0, 0));
    }

    #[test]
    fn chunks_splitting_crlf_are_repaired() {
        let tree = tree_from(&["World\r", "\nNext"]);
        assert_eq!(tree.get_line_count(), 2);
        assert_eq!(tree.get_content(), vec!["World", "Next"]);
        assert_eq!(tree.get_raw_content(), "World\r\nNext");
    }

    #[test]
    fn offset_and_position_round_trip() {
        let tree = tree_from(&["ab\r\n", "cde\n\r", "fg"]);
        for line in 0..tree.get_line_count() {
            for column in 0..=tree.get_line_length(line).unwrap() {
                let offset = tree.get_offset_at(line, column).unwrap();
                assert_eq!(tree.get_position_at(offset), Position::new(line, column));
            }
        }
    }

    #[test]
    fn offset_rejects_columns_past_line_end() {
        let tree = tree_from(&["ab\ncd"]);
        assert_eq!(tree.get_offset_at(1, 2), Ok(5));
        assert_eq!(
            tree.get_offset_at(0, 3),
            Err(PieceTreeError::ColumnOutOfRange {
                line: 0,
                column: 3,
                line_length: 2
            })
        );
    }

    #[test]
    fn position_between_cr_and_lf_stays_on_line() {
        let tree = tree_from(&["ab\r\ncd"]);
        assert_eq!(tree.get_position_at(3), Position::new(0, 3));
        assert_eq!(tree.get_position_at(4), Position::new(1, 0));
    }

    #[test]
    fn position_clamps_past_the_end() {
        let tree = tree_from(&["ab\ncd"]);
        assert_eq!(tree.get_position_at(1000), Position::new(1, 2));
    }

    #[test]
    fn charcode_reads_through_pieces() {
        let mut tree = tree_from(&["abc"]);
        tree.insert_at(1, "XY").unwrap();
        let codes: Vec<u16> = (0..5).map(|i| tree.get_charcode_at(i).unwrap()).collect();
        assert_eq!(codes, "aXYbc".encode_utf16().collect::<Vec<_>>());
        assert!(tree.get_charcode_at(5).is_err());
        assert_eq!(tree.get_line_charcode(0, 2).unwrap(), u16::from(b'Y'));
    }

    #[test]
    fn insert_composition_matches_string_splices() {
        let mut tree = PieceTree::default();
        let mut model = String::new();
        let steps = [
            (0, "ceLPHmFzvCtFeHkCBej "),
            (8, "gDCEfNYiBUNkSwtvB K "),
            (38, "cyNcHxjNPPoehBJldLS "),
            (59, "ejMx\nOTgWlbpeDExjOk "),
            (62, "VsdHfpUqCbqC\r\nKcq Jj"),
            (3, "\r\ngcIFLBDpETsAntCqzq"),
        ];
        for (offset, text) in steps {
            tree.insert_at(offset, text).unwrap();
            model.insert_str(offset, text);
            assert_eq!(tree.get_raw_content(), model);
            tree.assert_invariants();
        }
        assert_eq!(tree.get_line_count(), 4);
    }

    #[test]
    fn sequential_typing_extends_one_piece() {
        let mut tree = PieceTree::default();
        for (i, ch) in "hello world".chars().enumerate() {
            tree.insert_at(i, &ch.to_string()).unwrap();
        }
        assert_eq!(tree.get_raw_content(), "hello world");
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn inserting_lf_after_cr_joins_the_break() {
        let mut tree = tree_from(&["ab\r"]);
        tree.insert_at(3, "\ncd").unwrap();
        assert_eq!(tree.get_content(), vec!["ab", "cd"]);
        assert_eq!(tree.get_line_count(), 2);
        tree.assert_invariants();

        let mut tree = tree_from(&["ab\ncd"]);
        tree.insert_at(2, "\r").unwrap();
        assert_eq!(tree.get_content(), vec!["ab", "cd"]);
        assert_eq!(tree.get_raw_content(), "ab\r\ncd");
        tree.assert_invariants();
    }

    #[test]
    fn inserting_inside_crlf_splits_it() {
        let mut tree = tree_from(&["ab\r\ncd"]);
        tree.insert_at(3, "x").unwrap();
        assert_eq!(tree.get_content(), vec!["ab", "x", "cd"]);
        assert_eq!(tree.get_line_count(), 3);
        tree.assert_invariants();
    }

    #[test]
    fn delete_within_one_piece() {
        let mut tree = tree_from(&["Hello beautiful world!"]);
        tree.delete_at(6, 10).unwrap();
        assert_eq!(tree.get_raw_content(), "Hello world!");
        tree.assert_invariants();
    }

    #[test]
    fn delete_across_original_buffers() {
        let mut tree = tree_from(&["one\n", "two\n", "three"]);
        tree.delete_at(2, 8).unwrap();
        assert_eq!(tree.get_raw_content(), "onree");
        assert_eq!(tree.get_line_count(), 1);
        tree.assert_invariants();
    }

    #[test]
    fn delete_joining_cr_and_lf() {
        let mut tree = tree_from(&["ab\rX\ncd"]);
        tree.delete_at(3, 1).unwrap();
        assert_eq!(tree.get_content(), vec!["ab", "cd"]);
        assert_eq!(tree.get_line_count(), 2);
        tree.assert_invariants();
    }

    #[test]
    fn delete_everything_then_insert() {
        let mut tree = tree_from(&["abc\n", "def"]);
        tree.delete_at(0, 7).unwrap();
        assert_eq!(tree.get_content(), vec![""]);
        assert_eq!(tree.node_count(), 0);
        tree.insert_at(0, "again").unwrap();
        assert_eq!(tree.get_raw_content(), "again");
    }

    #[test]
    fn edits_reject_out_of_range_offsets() {
        let mut tree = tree_from(&["abc"]);
        assert_eq!(
            tree.insert_at(4, "x"),
            Err(PieceTreeError::OffsetOutOfRange {
                offset: 4,
                length: 3
            })
        );
        assert!(tree.delete_at(2, 2).is_err());
        assert!(tree.delete_at(usize::MAX, 2).is_err());
        assert_eq!(tree.get_raw_content(), "abc");
    }

    #[test]
    fn value_in_range_spans_pieces() {
        let tree = tree_from(&["abc", "def", "ghi"]);
        assert_eq!(tree.get_value_in_range(2, 7).unwrap(), "cdefg");
        assert_eq!(tree.get_value_in_range(4, 4).unwrap(), "");
        assert!(tree.get_value_in_range(5, 4).is_err());
        assert!(tree.get_value_in_range(0, 10).is_err());
    }

    #[test]
    fn normalized_presentation_keeps_stored_text() {
        let buffers = vec![StringBuffer::from("a\r\nb\rc")];
        let tree = PieceTree::new(buffers, EndOfLine::Lf, true);
        assert_eq!(tree.get_raw_content(), "a\nb\nc");
        assert_eq!(tree.get_raw_line(0).unwrap(), "a\n");
        assert_eq!(tree.get_raw_line_length(0).unwrap(), 2);
        assert_eq!(tree.get_buffer_length(), 6);
        assert_eq!(tree.get_content(), vec!["a", "b", "c"]);
    }

    #[test]
    fn first_insert_into_an_empty_tree() {
        let mut tree = PieceTree::default();
        tree.insert_at(0, "ceLPHmFzvCtFeHkCBej ").unwrap();
        assert_eq!(tree.get_raw_content(), "ceLPHmFzvCtFeHkCBej ");
        assert_eq!(tree.add_buffer().as_buffer().line_starts(), &[0]);
        tree.assert_invariants();
    }

    #[test]
    fn set_eol_rewrites_stored_text() {
        let mut tree = tree_from(&["a\nb\r", "\nc"]);
        tree.insert_at(2, "\r").unwrap();
        tree.set_eol(EndOfLine::Crlf);
        assert_eq!(tree.get_raw_content(), "a\r\n\r\nb\r\nc");
        assert_eq!(tree.get_buffer_length(), 9);
        assert_eq!(tree.get_eol(), EndOfLine::Crlf);
        assert!(tree.is_eol_normalized());
        tree.assert_invariants();
    }
}
