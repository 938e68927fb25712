use std::convert::Infallible;
use std::str::FromStr;

use piece_tree::{EndOfLine, PieceTree, PieceTreeError, Position};

use crate::buffer_builder::TextBufferBuilder;
use crate::options::CreateOptions;

/// An editable document. Lines and columns are 0-based, and offsets, lengths
/// and columns count UTF-16 code units.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    tree: PieceTree,
    bom: bool,
}

impl TextBuffer {
    pub(crate) fn new(tree: PieceTree, bom: bool) -> Self {
        Self { tree, bom }
    }

    /// Build from multiple chunks
    pub fn from_chunks<S: AsRef<str>>(chunks: &[S], options: CreateOptions) -> Self {
        let mut builder = TextBufferBuilder::new();
        for chunk in chunks {
            builder.push(chunk.as_ref().encode_utf16().collect());
        }
        builder.resolve();
        builder.assemble(options)
    }

    pub fn tree(&self) -> &PieceTree {
        &self.tree
    }

    /// Whether the loaded text started with a byte order mark. The mark is
    /// not part of the content.
    pub fn bom(&self) -> bool {
        self.bom
    }

    pub fn get_buffer_length(&self) -> usize {
        self.tree.get_buffer_length()
    }

    pub fn get_line_count(&self) -> usize {
        self.tree.get_line_count()
    }

    /// All lines, without their terminators.
    pub fn get_content(&self) -> Vec<String> {
        self.tree.get_content()
    }

    /// The whole document. Line breaks are rendered as [`Self::get_eol`] when
    /// the buffer is normalized.
    pub fn get_raw_content(&self) -> String {
        self.tree.get_raw_content()
    }

    pub fn get_line(&self, line: usize) -> Result<String, PieceTreeError> {
        self.tree.get_line(line)
    }

    pub fn get_raw_line(&self, line: usize) -> Result<String, PieceTreeError> {
        self.tree.get_raw_line(line)
    }

    pub fn get_line_length(&self, line: usize) -> Result<usize, PieceTreeError> {
        self.tree.get_line_length(line)
    }

    pub fn get_raw_line_length(&self, line: usize) -> Result<usize, PieceTreeError> {
        self.tree.get_raw_line_length(line)
    }

    /// Largest column a cursor can take on `line`, just past its last
    /// character.
    pub fn get_line_max_column(&self, line: usize) -> Result<usize, PieceTreeError> {
        self.get_line_length(line)
    }

    pub fn get_offset_at(&self, line: usize, column: usize) -> Result<usize, PieceTreeError> {
        self.tree.get_offset_at(line, column)
    }

    pub fn get_position_at(&self, offset: usize) -> Position {
        self.tree.get_position_at(offset)
    }

    pub fn get_charcode_at(&self, offset: usize) -> Result<u16, PieceTreeError> {
        self.tree.get_charcode_at(offset)
    }

    pub fn get_line_charcode(&self, line: usize, index: usize) -> Result<u16, PieceTreeError> {
        self.tree.get_line_charcode(line, index)
    }

    pub fn get_value_in_range(&self, start: usize, end: usize) -> Result<String, PieceTreeError> {
        self.tree.get_value_in_range(start, end)
    }

    pub fn insert_at(&mut self, offset: usize, text: &str) -> Result<(), PieceTreeError> {
        self.tree.insert_at(offset, text)
    }

    pub fn insert_utf16_at(&mut self, offset: usize, text: &[u16]) -> Result<(), PieceTreeError> {
        self.tree.insert_utf16_at(offset, text)
    }

    pub fn delete_at(&mut self, offset: usize, length: usize) -> Result<(), PieceTreeError> {
        self.tree.delete_at(offset, length)
    }

    /// Convenience: insert at a line and column.
    pub fn insert_at_position(
        &mut self,
        position: Position,
        text: &str,
    ) -> Result<(), PieceTreeError> {
        let offset = self.get_offset_at(position.line, position.column)?;
        self.insert_at(offset, text)
    }

    /// Convenience: delete the text between two positions.
    pub fn delete_range(&mut self, start: Position, end: Position) -> Result<(), PieceTreeError> {
        let from = self.get_offset_at(start.line, start.column)?;
        let to = self.get_offset_at(end.line, end.column)?;
        if to < from {
            return Err(PieceTreeError::RangeOutOfBounds {
                start: from,
                end: to,
                length: self.get_buffer_length(),
            });
        }
        self.delete_at(from, to - from)
    }

    pub fn get_eol(&self) -> EndOfLine {
        self.tree.get_eol()
    }

    /// Rewrites every line break in the document to `eol`.
    pub fn set_eol(&mut self, eol: EndOfLine) {
        self.tree.set_eol(eol);
    }
}

impl FromStr for TextBuffer {
    type Err = Infallible;

    /// Build from a single string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_chunks(&[s], CreateOptions::default()))
    }
}
