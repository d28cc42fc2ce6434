//! Cursor-style iteration over a tree, plus the low-level interface that
//! augmentation-specialized searches are built on.

use smallvec::SmallVec;

use crate::aug::{NodeRef, TreeConfig};
use crate::raw::node::Node;

/// Ancestor stacks hold this many frames inline before spilling to the
/// heap. A fanout-31 tree needs six levels for tens of millions of items.
const STACK_DEPTH: usize = 6;

struct Frame<'t, K, V, A> {
    node: &'t Node<K, V, A>,
    pos: i16,
}

impl<K, V, A> Clone for Frame<'_, K, V, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, A> Copy for Frame<'_, K, V, A> {}

/// A cursor over the entries of a map, in key order.
///
/// The iterator starts out unpositioned; position it with
/// [`first`](Iter::first), [`last`](Iter::last), [`seek_ge`](Iter::seek_ge)
/// or [`seek_lt`](Iter::seek_lt), then step with [`next`](Iter::next) and
/// [`prev`](Iter::prev). [`key`](Iter::key) and [`value`](Iter::value) may
/// only be called while [`valid`](Iter::valid) returns `true`.
///
/// The iterator borrows its map, so the map cannot be mutated while any
/// iterator over it is alive.
pub struct Iter<'t, K, V, Aux = (), A = ()> {
    cfg: &'t TreeConfig<K, Aux>,
    root: Option<&'t Node<K, V, A>>,
    length: usize,
    node: Option<&'t Node<K, V, A>>,
    pos: i16,
    stack: SmallVec<[Frame<'t, K, V, A>; STACK_DEPTH]>,
}

impl<'t, K, V, Aux, A> Iter<'t, K, V, Aux, A> {
    pub(crate) fn new(
        cfg: &'t TreeConfig<K, Aux>,
        root: Option<&'t Node<K, V, A>>,
        length: usize,
    ) -> Self {
        Self {
            cfg,
            root,
            length,
            node: root,
            pos: -1,
            stack: SmallVec::new(),
        }
    }

    pub(crate) fn tree_len(&self) -> usize {
        self.length
    }

    fn current(&self) -> &'t Node<K, V, A> {
        self.node.expect("`Iter` - iterator has no current node!")
    }

    fn descend_raw(&mut self) {
        let node = self.current();
        let child = node.children[self.pos as usize].as_ref();
        self.stack.push(Frame {
            node,
            pos: self.pos,
        });
        self.node = Some(child);
        self.pos = 0;
    }

    fn ascend_raw(&mut self) {
        let frame = self.stack.pop().expect("`Iter` - ascend above the root!");
        self.node = Some(frame.node);
        self.pos = frame.pos;
    }

    /// Returns the iterator to its initial unpositioned state.
    pub fn reset(&mut self) {
        self.node = self.root;
        self.pos = -1;
        self.stack.clear();
    }

    /// Positions the iterator at the first entry.
    pub fn first(&mut self) {
        self.reset();
        self.pos = 0;
        if self.node.is_none() {
            return;
        }
        while !self.current().leaf {
            self.descend_raw();
        }
        self.pos = 0;
    }

    /// Positions the iterator at the last entry.
    pub fn last(&mut self) {
        self.reset();
        if self.node.is_none() {
            return;
        }
        while !self.current().leaf {
            self.pos = self.current().count() as i16;
            self.descend_raw();
        }
        self.pos = self.current().count() as i16 - 1;
    }

    /// Positions the iterator at the first entry whose key is
    /// greater than or equal to `key`.
    pub fn seek_ge(&mut self, key: &K) {
        self.reset();
        if self.node.is_none() {
            return;
        }
        loop {
            let node = self.current();
            let (pos, found) = node.find(self.cfg.cmp, key);
            self.pos = pos as i16;
            if found {
                return;
            }
            if node.leaf {
                if self.pos == node.count() as i16 {
                    self.next();
                }
                return;
            }
            self.descend_raw();
        }
    }

    /// Positions the iterator at the last entry whose key is less
    /// than `key`.
    pub fn seek_lt(&mut self, key: &K) {
        self.reset();
        if self.node.is_none() {
            return;
        }
        loop {
            let node = self.current();
            let (pos, found) = node.find(self.cfg.cmp, key);
            self.pos = pos as i16;
            if found || node.leaf {
                self.prev();
                return;
            }
            self.descend_raw();
        }
    }

    /// Advances to the entry immediately following the current position.
    /// Saturates past the last entry, leaving the iterator invalid.
    pub fn next(&mut self) {
        let Some(node) = self.node else { return };
        if node.leaf {
            self.pos = (self.pos + 1).min(node.count() as i16);
            if (self.pos as usize) < node.count() {
                return;
            }
            while !self.stack.is_empty() && self.pos as usize >= self.current().count() {
                self.ascend_raw();
            }
            return;
        }
        if (self.pos + 1) as usize > node.count() {
            return;
        }
        self.pos += 1;
        self.descend_raw();
        while !self.current().leaf {
            self.pos = 0;
            self.descend_raw();
        }
        self.pos = 0;
    }

    /// Steps back to the entry immediately preceding the current position.
    /// Saturates before the first entry, leaving the iterator invalid.
    pub fn prev(&mut self) {
        let Some(node) = self.node else { return };
        if node.leaf {
            self.pos -= 1;
            if self.pos >= 0 {
                return;
            }
            while !self.stack.is_empty() && self.pos < 0 {
                self.ascend_raw();
                self.pos -= 1;
            }
            self.pos = self.pos.max(-1);
            return;
        }
        if self.pos < 0 {
            return;
        }
        self.descend_raw();
        while !self.current().leaf {
            self.pos = self.current().count() as i16;
            self.descend_raw();
        }
        self.pos = self.current().count() as i16 - 1;
    }

    /// Returns whether the iterator is positioned at an entry.
    pub fn valid(&self) -> bool {
        self.pos >= 0
            && match self.node {
                Some(node) => (self.pos as usize) < node.count(),
                None => false,
            }
    }

    /// Returns the key at the current position.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not [`valid`](Iter::valid).
    pub fn key(&self) -> &'t K {
        debug_assert!(self.valid(), "`Iter::key()` - iterator is not valid!");
        &self.current().keys[self.pos as usize]
    }

    /// Returns the value at the current position.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not [`valid`](Iter::valid).
    pub fn value(&self) -> &'t V {
        debug_assert!(self.valid(), "`Iter::value()` - iterator is not valid!");
        &self.current().values[self.pos as usize]
    }

    /// Exposes the iterator's node-level state for augmentation-specialized
    /// traversal.
    pub fn low_level(&mut self) -> LowLevel<'_, 't, K, V, Aux, A> {
        LowLevel { it: self }
    }
}

/// Node-level view of an [`Iter`], for augmentation-specialized searches.
///
/// The view exposes the iterator's current `(node, position)` frame and
/// direct control over descending and ascending. Calls to
/// [`descend`](LowLevel::descend) and [`ascend`](LowLevel::ascend) must be
/// balanced, and [`set_pos`](LowLevel::set_pos) is not bounds-checked
/// against the current node; code driving this interface is responsible
/// for leaving the iterator in a consistent position before handing
/// control back to entry-level iteration.
pub struct LowLevel<'a, 't, K, V, Aux = (), A = ()> {
    it: &'a mut Iter<'t, K, V, Aux, A>,
}

impl<'t, K, V, Aux, A> LowLevel<'_, 't, K, V, Aux, A> {
    /// Returns the tree's configuration.
    pub fn config(&self) -> &'t TreeConfig<K, Aux> {
        self.it.cfg
    }

    /// Returns the current node.
    ///
    /// # Panics
    ///
    /// Panics if the underlying tree is empty.
    pub fn node(&self) -> NodeRef<'t, K, V, A> {
        NodeRef::new(self.it.current())
    }

    /// Returns the position within the current node.
    pub fn pos(&self) -> i16 {
        self.it.pos
    }

    /// Sets the position within the current node, without bounds checks.
    pub fn set_pos(&mut self, pos: i16) {
        self.it.pos = pos;
    }

    /// Advances the position within the current node by one.
    pub fn increment_pos(&mut self) {
        self.it.pos += 1;
    }

    /// Returns whether the current node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.it.current().leaf
    }

    /// Returns the number of ancestors above the current node. It is
    /// illegal to call [`ascend`](LowLevel::ascend) when this is zero.
    pub fn depth(&self) -> usize {
        self.it.stack.len()
    }

    /// Returns the augmentation of the child at the current position.
    ///
    /// # Panics
    ///
    /// Panics if the current node is a leaf or the position holds no child.
    pub fn child_aug(&self) -> &'t A {
        &self.it.current().children[self.it.pos as usize].aug
    }

    /// Pushes the current frame and moves into the child at the current
    /// position, with the new position set to zero.
    pub fn descend(&mut self) {
        self.it.descend_raw();
    }

    /// Pops back up to the parent, restoring the position held when
    /// [`descend`](LowLevel::descend) was called.
    pub fn ascend(&mut self) {
        self.it.ascend_raw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_eq_size;

    // The frame niche: a frame is a borrowed node plus a position, and an
    // optional frame must cost no more than the frame itself.
    assert_eq_size!(Frame<'static, u64, u64, ()>, Option<Frame<'static, u64, u64, ()>>);
}
