//! Editable text documents backed by a piece tree.
//!
//! Text arrives through a [`TextBufferBuilder`] in arbitrary chunks and is
//! turned into a [`TextBuffer`] according to [`CreateOptions`].

mod buffer;
mod buffer_builder;
mod error;
mod options;

pub use crate::buffer::TextBuffer;
pub use crate::buffer_builder::TextBufferBuilder;
pub use crate::error::BuilderError;
pub use crate::options::CreateOptions;
pub use piece_tree::{EndOfLine, PieceTreeError, Position};
