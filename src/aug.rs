//! The augmentation contract: per-subtree summaries maintained by the tree.

use core::cmp::Ordering;
use core::ptr;

use crate::raw::node::Node;

/// Tree configuration handed to augmentation updaters: the key comparator
/// and any auxiliary data supplied when the tree was built.
pub struct TreeConfig<K, Aux = ()> {
    pub(crate) cmp: fn(&K, &K) -> Ordering,
    pub(crate) aux: Aux,
}

impl<K, Aux> TreeConfig<K, Aux> {
    pub(crate) fn new(aux: Aux, cmp: fn(&K, &K) -> Ordering) -> Self {
        Self { cmp, aux }
    }

    /// Compares two keys with the same comparator the tree uses.
    #[inline]
    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.cmp)(a, b)
    }

    /// Returns the auxiliary data supplied when the tree was built.
    #[inline]
    pub fn aux(&self) -> &Aux {
        &self.aux
    }
}

impl<K, Aux: Clone> Clone for TreeConfig<K, Aux> {
    fn clone(&self) -> Self {
        Self {
            cmp: self.cmp,
            aux: self.aux.clone(),
        }
    }
}

/// Read-only view of a node, exposed to augmentation updaters and to
/// low-level iteration.
///
/// The view is deliberately narrow — keys and child augmentations only —
/// so that augmentation code cannot perturb the tree structure.
pub trait NodeView<K, A> {
    /// Returns whether this node is a leaf.
    fn is_leaf(&self) -> bool;

    /// Returns the number of keys in this node.
    fn count(&self) -> usize;

    /// Returns the key at position `i`. Callable for `i` in `[0, count())`.
    fn key(&self, i: usize) -> &K;

    /// Returns the augmentation of the child at position `i`. Callable on
    /// interior nodes for `i` in `[0, count()]`.
    fn child_aug(&self, i: usize) -> &A;
}

/// A shared reference to a tree node, usable as a [`NodeView`] and
/// comparable by node identity.
pub struct NodeRef<'a, K, V, A> {
    pub(crate) node: &'a Node<K, V, A>,
}

impl<'a, K, V, A> NodeRef<'a, K, V, A> {
    pub(crate) fn new(node: &'a Node<K, V, A>) -> Self {
        Self { node }
    }
}

impl<K, V, A> Clone for NodeRef<'_, K, V, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, A> Copy for NodeRef<'_, K, V, A> {}

/// Two `NodeRef`s are equal when they refer to the same node, not when the
/// nodes have equal contents.
impl<K, V, A> PartialEq for NodeRef<'_, K, V, A> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.node, other.node)
    }
}

impl<K, V, A> Eq for NodeRef<'_, K, V, A> {}

impl<K, V, A> NodeView<K, A> for NodeRef<'_, K, V, A> {
    fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    fn count(&self) -> usize {
        self.node.count()
    }

    fn key(&self, i: usize) -> &K {
        self.node.key(i)
    }

    fn child_aug(&self, i: usize) -> &A {
        self.node.child_aug(i)
    }
}

/// Classification of the structural change that triggered an augmentation
/// update, with the data relevant to that change.
///
/// The contract is permissive: an updater that ignores the classification
/// and recomputes its value from the node view on every call is correct.
/// The variants exist so that updaters can maintain their value
/// incrementally instead.
pub enum UpdateMeta<K, A> {
    /// No assumptions may be made about the change; the augmentation must
    /// be recomputed in full from the node view.
    Default,

    /// The node gained `key`. When the change came from a rotation or a
    /// merge, `subtree` is the augmentation of the subtree that moved in
    /// alongside the key.
    Insertion {
        /// The inserted (or rotated-in) key.
        key: K,
        /// Augmentation of a subtree gained together with the key, if any.
        subtree: Option<A>,
    },

    /// The node lost `key`. When the change came from a rotation,
    /// `subtree` is the augmentation of the subtree that moved out
    /// alongside the key.
    Removal {
        /// The removed (or rotated-out) key.
        key: K,
        /// Augmentation of a subtree lost together with the key, if any.
        subtree: Option<A>,
    },

    /// The node is the left-hand side of a split. `right` is the
    /// already-updated augmentation of the new right-hand node and `sep`
    /// the separator key promoted to the parent.
    Split {
        /// The separator key moved into the parent.
        sep: K,
        /// Augmentation of the new right-hand node.
        right: A,
    },
}

/// A per-subtree summary maintained incrementally across tree mutations.
///
/// Implementations are invoked on a node after its structure changed, with
/// a classification of the change ([`UpdateMeta`]) and a read-only view of
/// the node's new state. The return value reports whether the stored
/// summary changed; when it is `false` the tree skips re-updating the
/// node's ancestors for that mutation.
///
/// Updaters must be total — there is no error channel — and must not
/// retain anything from the node view beyond the call.
///
/// Replacing the value of an existing key does not invoke the updater, so
/// summaries must depend on keys only, never on values.
pub trait Augmentation<K, Aux = ()>: Clone + Default {
    /// Brings `self` up to date with the node's post-change state.
    /// Returns whether the stored value changed.
    fn update(
        &mut self,
        cfg: &TreeConfig<K, Aux>,
        node: &impl NodeView<K, Self>,
        meta: UpdateMeta<K, Self>,
    ) -> bool;
}

/// The no-op augmentation backing plain (unaugmented) maps and sets.
impl<K, Aux> Augmentation<K, Aux> for () {
    fn update(
        &mut self,
        _cfg: &TreeConfig<K, Aux>,
        _node: &impl NodeView<K, Self>,
        _meta: UpdateMeta<K, Self>,
    ) -> bool {
        false
    }
}
