use std::ops::{Index, IndexMut};

use crate::piece::Piece;

/// Handle of a node in the arena. Slot 0 is the shared black sentinel that
/// stands in for every missing child and for the root's parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

pub(crate) const SENTINEL: NodeId = NodeId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Red,
    Black,
}

#[derive(Debug, Clone)]
pub(crate) struct TreeNode {
    pub(crate) piece: Piece,
    pub(crate) color: NodeColor,
    pub(crate) parent: NodeId,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
    /// Total length of the left subtree.
    pub(crate) size_left: usize,
    /// Total line feed count of the left subtree.
    pub(crate) lf_left: usize,
}

impl TreeNode {
    fn new(piece: Piece) -> Self {
        Self {
            piece,
            color: NodeColor::Red,
            parent: SENTINEL,
            left: SENTINEL,
            right: SENTINEL,
            size_left: 0,
            lf_left: 0,
        }
    }
}

/// Red-black tree of pieces stored in a vector. Children are owned by index
/// and `parent` is a plain back-index, so rotations never juggle references.
#[derive(Debug, Clone)]
pub(crate) struct NodeArena {
    nodes: Vec<TreeNode>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Index<NodeId> for NodeArena {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0]
    }
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        let mut sentinel = TreeNode::new(Piece::empty());
        sentinel.color = NodeColor::Black;
        Self {
            nodes: vec![sentinel],
            free: Vec::new(),
            root: SENTINEL,
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    fn alloc(&mut self, piece: Piece) -> NodeId {
        let node = TreeNode::new(piece);
        match self.free.pop() {
            Some(id) => {
                self[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self[id] = TreeNode::new(Piece::empty());
        self.free.push(id);
    }

    pub(crate) fn color(&self, id: NodeId) -> NodeColor {
        if id == SENTINEL {
            NodeColor::Black
        } else {
            self[id].color
        }
    }

    fn set_color(&mut self, id: NodeId, color: NodeColor) {
        if id != SENTINEL {
            self[id].color = color;
        }
    }

    fn left(&self, id: NodeId) -> NodeId {
        self[id].left
    }

    fn right(&self, id: NodeId) -> NodeId {
        self[id].right
    }

    fn parent(&self, id: NodeId) -> NodeId {
        self[id].parent
    }

    pub(crate) fn leftmost(&self, mut x: NodeId) -> NodeId {
        while self.left(x) != SENTINEL {
            x = self.left(x);
        }
        x
    }

    pub(crate) fn rightmost(&self, mut x: NodeId) -> NodeId {
        while self.right(x) != SENTINEL {
            x = self.right(x);
        }
        x
    }

    /// In-order successor, or `SENTINEL` after the last node.
    pub(crate) fn next(&self, mut x: NodeId) -> NodeId {
        if self.right(x) != SENTINEL {
            return self.leftmost(self.right(x));
        }
        while x != self.root && self.right(self.parent(x)) == x {
            x = self.parent(x);
        }
        if x == self.root {
            SENTINEL
        } else {
            self.parent(x)
        }
    }

    /// In-order predecessor, or `SENTINEL` before the first node.
    pub(crate) fn prev(&self, mut x: NodeId) -> NodeId {
        if self.left(x) != SENTINEL {
            return self.rightmost(self.left(x));
        }
        while x != self.root && self.left(self.parent(x)) == x {
            x = self.parent(x);
        }
        if x == self.root {
            SENTINEL
        } else {
            self.parent(x)
        }
    }

    /// Propagates a change in `x`'s own contribution to every ancestor that
    /// holds `x` in its left subtree.
    fn update_tree_metadata(&mut self, mut x: NodeId, delta: isize, lf_delta: isize) {
        if delta == 0 && lf_delta == 0 {
            return;
        }
        while x != self.root && x != SENTINEL {
            let parent = self.parent(x);
            if self.left(parent) == x {
                let p = &mut self[parent];
                p.size_left = p.size_left.wrapping_add_signed(delta);
                p.lf_left = p.lf_left.wrapping_add_signed(lf_delta);
            }
            x = parent;
        }
    }

    /// Swaps the piece held by `id`, keeping every aggregate exact.
    pub(crate) fn replace_piece(&mut self, id: NodeId, piece: Piece) {
        let old = self[id].piece;
        self[id].piece = piece;
        self.update_tree_metadata(
            id,
            piece.length as isize - old.length as isize,
            piece.line_feed_cnt as isize - old.line_feed_cnt as isize,
        );
    }

    fn left_rotate(&mut self, x: NodeId) {
        let y = self.right(x);

        // y's new left subtree is x together with x's left subtree.
        let (x_size_left, x_lf_left, x_len, x_lf) = {
            let xn = &self[x];
            (xn.size_left, xn.lf_left, xn.piece.length, xn.piece.line_feed_cnt)
        };
        self[y].size_left += x_size_left + x_len;
        self[y].lf_left += x_lf_left + x_lf;

        let y_left = self.left(y);
        self[x].right = y_left;
        if y_left != SENTINEL {
            self[y_left].parent = x;
        }

        let x_parent = self.parent(x);
        self[y].parent = x_parent;
        if x_parent == SENTINEL {
            self.root = y;
        } else if self.left(x_parent) == x {
            self[x_parent].left = y;
        } else {
            self[x_parent].right = y;
        }

        self[y].left = x;
        self[x].parent = y;
    }

    fn right_rotate(&mut self, y: NodeId) {
        let x = self.left(y);

        let (x_size_left, x_lf_left, x_len, x_lf) = {
            let xn = &self[x];
            (xn.size_left, xn.lf_left, xn.piece.length, xn.piece.line_feed_cnt)
        };
        self[y].size_left -= x_size_left + x_len;
        self[y].lf_left -= x_lf_left + x_lf;

        let x_right = self.right(x);
        self[y].left = x_right;
        if x_right != SENTINEL {
            self[x_right].parent = y;
        }

        let y_parent = self.parent(y);
        self[x].parent = y_parent;
        if y_parent == SENTINEL {
            self.root = x;
        } else if self.right(y_parent) == y {
            self[y_parent].right = x;
        } else {
            self[y_parent].left = x;
        }

        self[x].right = y;
        self[y].parent = x;
    }

    /// Inserts `piece` directly after `node` in document order. With an empty
    /// tree the new node becomes the root and `node` is ignored.
    pub(crate) fn insert_right(&mut self, node: NodeId, piece: Piece) -> NodeId {
        let z = self.alloc(piece);

        if self.root == SENTINEL {
            self.root = z;
            self[z].color = NodeColor::Black;
            return z;
        }

        if self.right(node) == SENTINEL {
            self[node].right = z;
            self[z].parent = node;
        } else {
            let next = self.leftmost(self.right(node));
            self[next].left = z;
            self[z].parent = next;
        }

        self.fix_insert(z);
        z
    }

    /// Inserts `piece` directly before `node` in document order.
    pub(crate) fn insert_left(&mut self, node: NodeId, piece: Piece) -> NodeId {
        let z = self.alloc(piece);

        if self.root == SENTINEL {
            self.root = z;
            self[z].color = NodeColor::Black;
            return z;
        }

        if self.left(node) == SENTINEL {
            self[node].left = z;
            self[z].parent = node;
        } else {
            let prev = self.rightmost(self.left(node));
            self[prev].right = z;
            self[z].parent = prev;
        }

        self.fix_insert(z);
        z
    }

    fn fix_insert(&mut self, z: NodeId) {
        let (len, lf) = (self[z].piece.length, self[z].piece.line_feed_cnt);
        self.update_tree_metadata(z, len as isize, lf as isize);

        let mut x = z;
        while x != self.root && self.color(self.parent(x)) == NodeColor::Red {
            let parent = self.parent(x);
            // A red parent is never the root, so the grandparent exists.
            let grand = self.parent(parent);

            if parent == self.left(grand) {
                let uncle = self.right(grand);
                if self.color(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    x = grand;
                } else {
                    if x == self.right(parent) {
                        x = parent;
                        self.left_rotate(x);
                    }
                    let parent = self.parent(x);
                    let grand = self.parent(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    self.right_rotate(grand);
                }
            } else {
                let uncle = self.left(grand);
                if self.color(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    x = grand;
                } else {
                    if x == self.left(parent) {
                        x = parent;
                        self.right_rotate(x);
                    }
                    let parent = self.parent(x);
                    let grand = self.parent(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grand, NodeColor::Red);
                    self.left_rotate(grand);
                }
            }
        }

        let root = self.root;
        self.set_color(root, NodeColor::Black);
    }

    /// Removes the piece held by `z` from the tree.
    ///
    /// When `z` has two children its in-order successor's piece is moved into
    /// `z` and the successor's slot is unlinked instead, so any other handle to
    /// that successor is invalid afterwards.
    pub(crate) fn remove(&mut self, z: NodeId) {
        let mut target = z;
        if self.left(z) != SENTINEL && self.right(z) != SENTINEL {
            let successor = self.leftmost(self.right(z));
            let moved = self[successor].piece;
            self.replace_piece(z, moved);
            target = successor;
        }

        let (len, lf) = (self[target].piece.length, self[target].piece.line_feed_cnt);
        self.update_tree_metadata(target, -(len as isize), -(lf as isize));
        self.unlink(target);
    }

    /// Splices out `y`, which has at most one child and no longer contributes
    /// to any aggregate.
    fn unlink(&mut self, y: NodeId) {
        let child = if self.left(y) != SENTINEL {
            self.left(y)
        } else {
            self.right(y)
        };
        let parent = self.parent(y);

        if child != SENTINEL {
            self[child].parent = parent;
        }
        if parent == SENTINEL {
            self.root = child;
        } else if self.left(parent) == y {
            self[parent].left = child;
        } else {
            self[parent].right = child;
        }

        let removed_color = self.color(y);
        self.release(y);

        if removed_color == NodeColor::Black {
            self.fix_remove(child, parent);
        }
    }

    /// CLRS delete fixup. `parent` is tracked explicitly because `x` may be
    /// the sentinel, whose own parent link is never written.
    fn fix_remove(&mut self, mut x: NodeId, mut parent: NodeId) {
        while x != self.root && self.color(x) == NodeColor::Black {
            if x == self.left(parent) {
                let mut w = self.right(parent);
                if self.color(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.left_rotate(parent);
                    w = self.right(parent);
                }
                if self.color(self.left(w)) == NodeColor::Black
                    && self.color(self.right(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = parent;
                    parent = self.parent(x);
                } else {
                    if self.color(self.right(w)) == NodeColor::Black {
                        let w_left = self.left(w);
                        self.set_color(w_left, NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.right_rotate(w);
                        w = self.right(parent);
                    }
                    let parent_color = self.color(parent);
                    self.set_color(w, parent_color);
                    self.set_color(parent, NodeColor::Black);
                    let w_right = self.right(w);
                    self.set_color(w_right, NodeColor::Black);
                    self.left_rotate(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.left(parent);
                if self.color(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.right_rotate(parent);
                    w = self.left(parent);
                }
                if self.color(self.left(w)) == NodeColor::Black
                    && self.color(self.right(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = parent;
                    parent = self.parent(x);
                } else {
                    if self.color(self.left(w)) == NodeColor::Black {
                        let w_right = self.right(w);
                        self.set_color(w_right, NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.left_rotate(w);
                        w = self.left(parent);
                    }
                    let parent_color = self.color(parent);
                    self.set_color(w, parent_color);
                    self.set_color(parent, NodeColor::Black);
                    let w_left = self.left(w);
                    self.set_color(w_left, NodeColor::Black);
                    self.right_rotate(parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, NodeColor::Black);
    }
}
