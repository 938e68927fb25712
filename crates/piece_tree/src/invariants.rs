//! Structural checks for tests: red-black coloring, left-subtree aggregates,
//! piece caches against their literal text, and document content.

use crate::eol::{CR, LF, count_line_breaks};
use crate::node::{NodeColor, NodeId, SENTINEL};
use crate::PieceTree;

impl PieceTree {
    /// Panics if any tree invariant is broken.
    pub(crate) fn assert_invariants(&self) {
        let root = self.nodes.root();
        assert_eq!(self.nodes.color(root), NodeColor::Black, "root must be black");
        if root != SENTINEL {
            assert_eq!(self.nodes[root].parent, SENTINEL, "root has a parent");
        }

        let (size, lf, _) = self.check_subtree(root);
        assert_eq!(size, self.length, "cached length is stale");
        assert_eq!(lf + 1, self.line_count, "cached line count is stale");

        let mut text = Vec::with_capacity(self.length);
        let mut prev_last = None;
        for piece in self.pieces() {
            let units = self.piece_units(piece);
            assert!(!units.is_empty(), "empty piece left in the tree");
            assert_eq!(units.len(), piece.length);
            assert_eq!(
                count_line_breaks(units),
                piece.line_feed_cnt,
                "line feed cache of {piece:?}"
            );
            assert!(
                !(prev_last == Some(CR) && units[0] == LF),
                "CRLF split across pieces"
            );
            prev_last = units.last().copied();
            text.extend_from_slice(units);
        }
        assert_eq!(text.len(), self.length);
        assert_eq!(count_line_breaks(&text) + 1, self.line_count);
    }

    /// Longest root-to-leaf path, counted in nodes.
    pub(crate) fn depth(&self) -> usize {
        fn walk(tree: &PieceTree, id: NodeId) -> usize {
            if id == SENTINEL {
                return 0;
            }
            let node = &tree.nodes[id];
            1 + walk(tree, node.left).max(walk(tree, node.right))
        }
        walk(self, self.nodes.root())
    }

    /// Returns `(total length, total line feeds, black height)` of the
    /// subtree rooted at `id`.
    fn check_subtree(&self, id: NodeId) -> (usize, usize, usize) {
        if id == SENTINEL {
            return (0, 0, 1);
        }
        let node = &self.nodes[id];
        if node.color == NodeColor::Red {
            assert_eq!(self.nodes.color(node.left), NodeColor::Black, "red-red");
            assert_eq!(self.nodes.color(node.right), NodeColor::Black, "red-red");
        }
        for child in [node.left, node.right] {
            if child != SENTINEL {
                assert_eq!(self.nodes[child].parent, id, "broken parent link");
            }
        }

        let (left_size, left_lf, left_height) = self.check_subtree(node.left);
        let (right_size, right_lf, right_height) = self.check_subtree(node.right);
        assert_eq!(node.size_left, left_size, "size_left");
        assert_eq!(node.lf_left, left_lf, "lf_left");
        assert_eq!(left_height, right_height, "black height differs");

        let own_height = usize::from(node.color == NodeColor::Black);
        (
            left_size + node.piece.length + right_size,
            left_lf + node.piece.line_feed_cnt + right_lf,
            left_height + own_height,
        )
    }
}

mod tests {
    use crate::{EndOfLine, PieceTree, Position, StringBuffer, split_lines};
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Edit {
        Insert { at: usize, text: String },
        Delete { at: usize, len: usize },
    }

    fn edit_strategy() -> impl Strategy<Value = Edit> {
        prop_oneof![
            3 => (any::<usize>(), "[ab\r\n😀]{1,8}")
                .prop_map(|(at, text)| Edit::Insert { at, text }),
            2 => (any::<usize>(), 1usize..12)
                .prop_map(|(at, len)| Edit::Delete { at, len }),
        ]
    }

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    /// Edits land on any code unit, so a surrogate pair may be cut or
    /// split apart by an insertion.
    fn apply(tree: &mut PieceTree, model: &mut Vec<u16>, edit: &Edit) {
        match edit {
            Edit::Insert { at, text } => {
                let at = at % (model.len() + 1);
                let units = utf16(text);
                tree.insert_utf16_at(at, &units).unwrap();
                model.splice(at..at, units);
            }
            Edit::Delete { at, len } => {
                if model.is_empty() {
                    return;
                }
                let at = at % model.len();
                let len = (*len).min(model.len() - at);
                tree.delete_at(at, len).unwrap();
                model.drain(at..at + len);
            }
        }
    }

    fn check_against_model(tree: &PieceTree, model: &[u16]) {
        assert_eq!(tree.get_raw_content(), String::from_utf16_lossy(model));
        assert_eq!(tree.get_buffer_length(), model.len());
        for (offset, &unit) in model.iter().enumerate() {
            assert_eq!(tree.get_charcode_at(offset), Ok(unit), "offset {offset}");
        }

        let lines: Vec<&[u16]> = split_lines(model);
        assert_eq!(tree.get_line_count(), lines.len());
        let expected: Vec<String> = lines.iter().map(|l| String::from_utf16_lossy(l)).collect();
        assert_eq!(tree.get_content(), expected);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(tree.get_line(i).unwrap(), String::from_utf16_lossy(line));
            assert_eq!(tree.get_line_length(i).unwrap(), line.len());
            let offset = tree.get_offset_at(i, line.len()).unwrap();
            assert_eq!(tree.get_position_at(offset), Position::new(i, line.len()));
        }
        tree.assert_invariants();
    }

    proptest! {
        #[test]
        fn random_edits_keep_every_invariant(
            initial in "[abc\r\n😀]{0,24}",
            edits in prop::collection::vec(edit_strategy(), 1..60),
        ) {
            let mut tree = PieceTree::new(
                vec![StringBuffer::from(initial.as_str())],
                EndOfLine::Lf,
                false,
            );
            let mut model = utf16(&initial);
            check_against_model(&tree, &model);

            for edit in &edits {
                apply(&mut tree, &mut model, edit);
                check_against_model(&tree, &model);
            }
        }

        #[test]
        fn chunked_construction_matches_single_chunk(
            text in "[ab\r\n😀]{0,40}",
            cuts in prop::collection::vec(any::<usize>(), 0..6),
        ) {
            let units = utf16(&text);
            let mut points: Vec<usize> = cuts.iter().map(|c| c % (units.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut chunks = Vec::new();
            let mut last = 0;
            for point in points.into_iter().chain(std::iter::once(units.len())) {
                chunks.push(StringBuffer::new(units[last..point].to_vec()));
                last = point;
            }

            let tree = PieceTree::new(chunks, EndOfLine::Lf, false);
            check_against_model(&tree, &units);
        }

        #[test]
        fn every_position_round_trips(
            text in "[ab\r\n]{0,30}",
            inserts in prop::collection::vec((any::<usize>(), "[ab\r\n😀]{1,4}"), 0..8),
        ) {
            let mut tree = PieceTree::new(vec![StringBuffer::from(text.as_str())], EndOfLine::Lf, false);
            let mut model = utf16(&text);
            for (at, piece) in &inserts {
                apply(&mut tree, &mut model, &Edit::Insert { at: *at, text: piece.clone() });
            }

            for line in 0..tree.get_line_count() {
                for column in 0..=tree.get_line_length(line).unwrap() {
                    let offset = tree.get_offset_at(line, column).unwrap();
                    prop_assert_eq!(tree.get_position_at(offset), Position::new(line, column));
                }
            }
        }
    }

    #[test]
    fn long_edit_session_stays_balanced() {
        let mut tree = PieceTree::default();
        let mut model = Vec::new();
        for i in 0..400usize {
            let edit = if i % 5 == 4 {
                Edit::Delete {
                    at: i * 7919,
                    len: i % 9 + 1,
                }
            } else {
                Edit::Insert {
                    at: i * 104_729,
                    text: format!("{i}\r\n"),
                }
            };
            apply(&mut tree, &mut model, &edit);
        }
        check_against_model(&tree, &model);

        // A red-black tree with n nodes is at most 2 * log2(n + 1) deep.
        let nodes = tree.node_count();
        let bound = 2 * (usize::BITS - (nodes + 1).leading_zeros()) as usize;
        assert!(tree.depth() <= bound, "depth {} > {bound}", tree.depth());
    }
}
