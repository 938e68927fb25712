use piece_tree::{EolCounts, PieceTree, StringBuffer, is_high_surrogate, normalize_eol};
use tracing::{debug, trace};

use crate::buffer::TextBuffer;
use crate::error::BuilderError;
use crate::options::CreateOptions;

const CR: u16 = b'\r' as u16;
const BOM: u16 = 0xFEFF;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum BuilderState {
    #[default]
    Receiving,
    Built,
    Created,
}

/// Collects a document chunk by chunk, then creates a [`TextBuffer`] from it.
///
/// The builder moves through three states: it receives chunks until
/// [`build`](Self::build) locks it, and [`create`](Self::create) consumes the
/// collected text exactly once. Chunk boundaries may fall anywhere, including
/// between the `\r` and `\n` of a CRLF or inside a surrogate pair.
#[derive(Debug, Default)]
pub struct TextBufferBuilder {
    chunks: Vec<Vec<u16>>,
    state: BuilderState,
    bom: bool,
    eol_counts: EolCounts,
}

impl TextBufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a chunk of text. Empty chunks are ignored.
    pub fn receive(&mut self, chunk: &str) -> Result<(), BuilderError> {
        self.ensure_receiving()?;
        self.push(chunk.encode_utf16().collect());
        Ok(())
    }

    /// Accept a chunk of raw UTF-16 code units, which may end or start in
    /// the middle of a surrogate pair.
    pub fn receive_utf16(&mut self, chunk: &[u16]) -> Result<(), BuilderError> {
        self.ensure_receiving()?;
        self.push(chunk.to_vec());
        Ok(())
    }

    /// Stops accepting chunks and settles the boundaries between them.
    pub fn build(&mut self) -> Result<(), BuilderError> {
        self.ensure_receiving()?;
        self.resolve();
        self.state = BuilderState::Built;
        Ok(())
    }

    /// Creates the document. Only valid once, after [`build`](Self::build).
    pub fn create(&mut self, options: CreateOptions) -> Result<TextBuffer, BuilderError> {
        match self.state {
            BuilderState::Receiving => return Err(BuilderError::NotBuilt),
            BuilderState::Created => return Err(BuilderError::AlreadyCreated),
            BuilderState::Built => {}
        }
        self.state = BuilderState::Created;
        Ok(self.assemble(options))
    }

    /// Builds and creates in one step.
    pub fn finish(mut self, options: CreateOptions) -> Result<TextBuffer, BuilderError> {
        self.build()?;
        self.create(options)
    }

    /// Whether the received text started with a byte order mark.
    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Line break kinds seen so far. Complete once the builder is built.
    pub fn eol_counts(&self) -> EolCounts {
        self.eol_counts
    }

    fn ensure_receiving(&self) -> Result<(), BuilderError> {
        match self.state {
            BuilderState::Receiving => Ok(()),
            BuilderState::Built | BuilderState::Created => Err(BuilderError::AlreadyBuilt),
        }
    }

    pub(crate) fn push(&mut self, chunk: Vec<u16>) {
        if chunk.is_empty() {
            return;
        }
        trace!(len = chunk.len(), index = self.chunks.len(), "received chunk");
        self.chunks.push(chunk);
    }

    /// Strips a leading BOM and moves a trailing `\r` or high surrogate of
    /// each chunk to the front of the next one, so no chunk ends in the
    /// middle of a line break or a character.
    pub(crate) fn resolve(&mut self) {
        let received = std::mem::take(&mut self.chunks);
        let received_count = received.len();
        let mut resolved: Vec<Vec<u16>> = Vec::with_capacity(received_count);
        let mut carry: Option<u16> = None;
        let mut carried = 0;

        for mut chunk in received {
            if resolved.is_empty() && carry.is_none() && !self.bom && chunk.first() == Some(&BOM) {
                chunk.remove(0);
                self.bom = true;
            }
            if let Some(unit) = carry.take() {
                chunk.insert(0, unit);
                carried += 1;
            }
            if chunk
                .last()
                .is_some_and(|&last| last == CR || is_high_surrogate(last))
            {
                carry = chunk.pop();
            }
            self.keep(&mut resolved, chunk);
        }
        if let Some(unit) = carry {
            self.keep(&mut resolved, vec![unit]);
        }
        self.chunks = resolved;

        debug!(
            received = received_count,
            chunks = self.chunks.len(),
            carried,
            bom = self.bom,
            cr = self.eol_counts.cr,
            lf = self.eol_counts.lf,
            crlf = self.eol_counts.crlf,
            "text buffer builder locked"
        );
    }

    fn keep(&mut self, resolved: &mut Vec<Vec<u16>>, chunk: Vec<u16>) {
        if chunk.is_empty() {
            return;
        }
        self.eol_counts.merge(EolCounts::scan(&chunk));
        resolved.push(chunk);
    }

    pub(crate) fn assemble(&mut self, options: CreateOptions) -> TextBuffer {
        let eol = if options.normalize_eol {
            options.default_eol
        } else {
            self.eol_counts.dominant(options.default_eol)
        };
        let rewrite =
            options.normalize_eol && options.force && self.eol_counts.differs_from(eol);

        let chunks: Vec<StringBuffer> = std::mem::take(&mut self.chunks)
            .into_iter()
            .map(|chunk| {
                if rewrite {
                    StringBuffer::new(normalize_eol(&chunk, eol))
                } else {
                    StringBuffer::new(chunk)
                }
            })
            .collect();

        debug!(
            ?eol,
            normalize = options.normalize_eol,
            rewrite,
            chunks = chunks.len(),
            "creating text buffer"
        );
        TextBuffer::new(PieceTree::new(chunks, eol, options.normalize_eol), self.bom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece_tree::EndOfLine;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn create(chunks: &[&str], options: CreateOptions) -> TextBuffer {
        let mut builder = TextBufferBuilder::new();
        for chunk in chunks {
            builder.receive(chunk).unwrap();
        }
        builder.build().unwrap();
        builder.create(options).unwrap()
    }

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn empty_input_is_one_empty_line() {
        let buffer = create(&[], CreateOptions::default());
        assert_eq!(buffer.get_line_count(), 1);
        assert_eq!(buffer.get_buffer_length(), 0);
        assert_eq!(buffer.get_content(), vec![String::new()]);
        assert_eq!(buffer.get_eol(), EndOfLine::Lf);

        let buffer = create(&["", ""], CreateOptions::default());
        assert_eq!(buffer.get_raw_content(), "");
    }

    #[test]
    fn a_lone_line_break_makes_two_empty_lines() {
        for text in ["\r", "\n", "\r\n"] {
            let buffer = create(&[text], CreateOptions::default());
            assert_eq!(buffer.get_line_count(), 2, "{text:?}");
            assert_eq!(buffer.get_content(), vec![String::new(), String::new()]);
            assert_eq!(buffer.get_raw_content(), text);
        }
    }

    #[test]
    fn crlf_split_across_chunks_is_one_break() {
        let whole = create(&["Hello\r\nWorld\r\n"], CreateOptions::default());
        for chunks in [
            &["Hello\r\nWorld", "\r\n"][..],
            &["Hello\r", "\nWorld\r", "\n"][..],
            &["Hello", "\r", "\n", "World\r\n"][..],
        ] {
            let split = create(chunks, CreateOptions::default());
            assert_eq!(split.get_content(), whole.get_content(), "{chunks:?}");
            assert_eq!(split.get_line_count(), 3);
            assert_eq!(split.get_raw_content(), "Hello\r\nWorld\r\n");
            assert_eq!(split.get_eol(), EndOfLine::Crlf);
        }
    }

    #[test]
    fn surrogate_pair_split_across_chunks_is_rejoined() {
        let text = utf16("a😀\r\nb");
        let mut builder = TextBufferBuilder::new();
        builder.receive_utf16(&text[..2]).unwrap();
        builder.receive_utf16(&text[2..]).unwrap();
        builder.build().unwrap();
        let buffer = builder.create(CreateOptions::default()).unwrap();

        assert_eq!(buffer.get_raw_content(), "a😀\r\nb");
        assert_eq!(buffer.get_charcode_at(1).unwrap(), 0xD83D);
        assert_eq!(buffer.get_charcode_at(2).unwrap(), 0xDE00);
        assert_eq!(buffer.get_line_length(0).unwrap(), 3);
        assert_eq!(buffer.tree().original_buffers()[0].len(), 1);
        assert_eq!(buffer.tree().original_buffers()[1].len(), 5);
    }

    #[test]
    fn trailing_cr_becomes_its_own_chunk() {
        let buffer = create(&["ab\r"], CreateOptions::default());
        let lens: Vec<usize> = buffer
            .tree()
            .original_buffers()
            .iter()
            .map(StringBuffer::len)
            .collect();
        assert_eq!(lens, vec![2, 1]);
        assert_eq!(buffer.get_content(), vec!["ab".to_string(), String::new()]);
    }

    #[test]
    fn leading_bom_is_stripped_and_reported() {
        let buffer = create(&["\u{FEFF}abc\n", "\u{FEFF}"], CreateOptions::default());
        assert!(buffer.bom());
        assert_eq!(buffer.get_raw_content(), "abc\n\u{FEFF}");

        let buffer = create(&["abc"], CreateOptions::default());
        assert!(!buffer.bom());
    }

    #[test]
    fn dominant_line_break_is_detected() {
        let buffer = create(&["a\r\nb\r\nc\nd"], CreateOptions::default());
        assert_eq!(buffer.get_eol(), EndOfLine::Crlf);
        assert!(!buffer.tree().is_eol_normalized());

        let buffer = create(&["a\r\nb\nc\nd"], CreateOptions::default());
        assert_eq!(buffer.get_eol(), EndOfLine::Lf);

        let buffer = create(
            &["no breaks"],
            CreateOptions::new().default_eol(EndOfLine::Crlf),
        );
        assert_eq!(buffer.get_eol(), EndOfLine::Crlf);
    }

    #[test]
    fn forced_normalization_rewrites_stored_text() {
        let options = CreateOptions::new()
            .normalize_eol(true)
            .default_eol(EndOfLine::Lf)
            .force(true);
        let chunks = ["a\r\nb\rc", "\nd\r", "\ne"];
        let buffer = create(&chunks, options);

        assert_eq!(buffer.get_raw_content(), "a\nb\nc\nd\ne");
        assert_eq!(
            buffer.get_content(),
            create(&chunks, CreateOptions::default()).get_content()
        );
        assert_eq!(buffer.get_buffer_length(), 9);
        assert!(
            buffer
                .tree()
                .original_buffers()
                .iter()
                .all(|chunk| !chunk.text().contains(&CR))
        );
        assert_eq!(buffer.get_line_count(), 5);
    }

    #[test]
    fn normalization_without_force_only_changes_presentation() {
        let text = "a\r\nb\rc\nd";
        let options = CreateOptions::new()
            .normalize_eol(true)
            .default_eol(EndOfLine::Crlf);
        let buffer = create(&[text], options);

        assert_eq!(buffer.get_raw_content(), "a\r\nb\r\nc\r\nd");
        assert_eq!(buffer.get_buffer_length(), text.encode_utf16().count());
        assert_eq!(buffer.get_eol(), EndOfLine::Crlf);

        let plain = create(&[text], CreateOptions::default());
        assert_eq!(buffer.get_content(), plain.get_content());
    }

    #[test]
    fn content_joined_by_eol_is_the_raw_content() {
        let buffer = create(&["one\r\ntwo\r\n", "three"], CreateOptions::default());
        let joined = buffer.get_content().join(buffer.get_eol().as_str());
        assert_eq!(joined, buffer.get_raw_content());
    }

    #[test]
    fn builder_protocol_is_enforced() {
        let mut builder = TextBufferBuilder::new();
        assert_eq!(
            builder.create(CreateOptions::default()).err(),
            Some(BuilderError::NotBuilt)
        );

        builder.receive("text").unwrap();
        builder.build().unwrap();
        assert_eq!(builder.build(), Err(BuilderError::AlreadyBuilt));
        assert_eq!(builder.receive("more"), Err(BuilderError::AlreadyBuilt));
        assert_eq!(builder.receive_utf16(&[0x61]), Err(BuilderError::AlreadyBuilt));

        let buffer = builder.create(CreateOptions::default()).unwrap();
        assert_eq!(buffer.get_raw_content(), "text");
        assert_eq!(
            builder.create(CreateOptions::default()).err(),
            Some(BuilderError::AlreadyCreated)
        );
        assert_eq!(builder.build(), Err(BuilderError::AlreadyBuilt));
    }

    #[test]
    fn finish_builds_and_creates() {
        let mut builder = TextBufferBuilder::new();
        builder.receive("x\ny").unwrap();
        let buffer = builder.finish(CreateOptions::default()).unwrap();
        assert_eq!(buffer.get_line_count(), 2);
    }

    proptest! {
        #[test]
        fn chunk_boundaries_do_not_change_the_document(
            text in "[ab\r\n😀]{0,40}",
            cuts in prop::collection::vec(any::<usize>(), 0..8),
        ) {
            let units = utf16(&text);
            let mut points: Vec<usize> = cuts.iter().map(|c| c % (units.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut builder = TextBufferBuilder::new();
            let mut last = 0;
            for point in points.into_iter().chain(std::iter::once(units.len())) {
                builder.receive_utf16(&units[last..point]).unwrap();
                last = point;
            }
            let split = builder.finish(CreateOptions::default()).unwrap();
            let whole = create(&[text.as_str()], CreateOptions::default());

            prop_assert_eq!(split.get_raw_content(), text);
            prop_assert_eq!(split.get_content(), whole.get_content());
            prop_assert_eq!(split.get_line_count(), whole.get_line_count());
            prop_assert_eq!(split.get_eol(), whole.get_eol());
        }
    }
}
