use core::cmp::Ordering;
use core::mem;
use std::sync::Arc;

use smallvec::SmallVec;

use super::pool::NodePool;
use crate::aug::{Augmentation, NodeView, TreeConfig, UpdateMeta};

#[cfg(test)]
pub(crate) const DEGREE: usize = 4;
#[cfg(not(test))]
pub(crate) const DEGREE: usize = 16;

pub(crate) const MAX_ENTRIES: usize = 2 * DEGREE - 1;
pub(crate) const MIN_ENTRIES: usize = DEGREE - 1;

/// Shared handle to a node. The `Arc` strong count is the node's reference
/// count: a count above one marks the node as frozen (shared with another
/// tree handle), and mutation first goes through [`Node::make_mut`].
pub(crate) type NodePtr<K, V, A> = Arc<Node<K, V, A>>;

/// A B-tree node. Keys and values are parallel vectors; interior nodes
/// additionally hold `count + 1` children. The augmentation summarizes the
/// subtree rooted at this node and is kept consistent by every structural
/// operation below.
pub(crate) struct Node<K, V, A> {
    pub(crate) leaf: bool,
    pub(crate) aug: A,
    pub(crate) keys: SmallVec<[K; MAX_ENTRIES]>,
    pub(crate) values: SmallVec<[V; MAX_ENTRIES]>,
    pub(crate) children: SmallVec<[NodePtr<K, V, A>; MAX_ENTRIES + 1]>,
}

impl<K, V, A> Node<K, V, A> {
    pub(crate) fn new(leaf: bool) -> Self
    where
        A: Default,
    {
        Self {
            leaf,
            aug: A::default(),
            keys: SmallVec::new(),
            values: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn key(&self, i: usize) -> &K {
        &self.keys[i]
    }

    #[inline]
    pub(crate) fn child_aug(&self, i: usize) -> &A {
        &self.children[i].aug
    }

    /// Binary-searches `keys` for `key`. Returns the position at which the
    /// key sits (`found`) or would be inserted.
    #[inline]
    pub(crate) fn find(&self, cmp: fn(&K, &K) -> Ordering, key: &K) -> (usize, bool) {
        match self.keys.binary_search_by(|probe| cmp(probe, key)) {
            Ok(i) => (i, true),
            Err(i) => (i, false),
        }
    }

    /// Inserts an entry at position `i`, with `child` becoming the subtree
    /// to the right of the new key on interior nodes.
    fn insert_at(&mut self, i: usize, key: K, value: V, child: Option<NodePtr<K, V, A>>) {
        self.keys.insert(i, key);
        self.values.insert(i, value);
        if let Some(child) = child {
            self.children.insert(i + 1, child);
        }
    }

    /// Removes the entry at position `i` together with the subtree to its
    /// right (on interior nodes).
    fn remove_at(&mut self, i: usize) -> (K, V, Option<NodePtr<K, V, A>>) {
        let key = self.keys.remove(i);
        let value = self.values.remove(i);
        let child = if self.leaf {
            None
        } else {
            Some(self.children.remove(i + 1))
        };
        (key, value, child)
    }

    fn push_back(&mut self, key: K, value: V, child: Option<NodePtr<K, V, A>>) {
        self.keys.push(key);
        self.values.push(value);
        if let Some(child) = child {
            self.children.push(child);
        }
    }

    fn push_front(&mut self, key: K, value: V, child: Option<NodePtr<K, V, A>>) {
        self.keys.insert(0, key);
        self.values.insert(0, value);
        if let Some(child) = child {
            self.children.insert(0, child);
        }
    }

    fn pop_back(&mut self) -> (K, V, Option<NodePtr<K, V, A>>) {
        let value = self.values.pop().expect("`Node::pop_back()` - node is empty!");
        let key = self.keys.pop().expect("`Node::pop_back()` - node is empty!");
        let child = if self.leaf { None } else { self.children.pop() };
        (key, value, child)
    }

    fn pop_front(&mut self) -> (K, V, Option<NodePtr<K, V, A>>) {
        let key = self.keys.remove(0);
        let value = self.values.remove(0);
        let child = if self.leaf {
            None
        } else {
            Some(self.children.remove(0))
        };
        (key, value, child)
    }
}

impl<K, V, A> NodeView<K, A> for Node<K, V, A> {
    fn is_leaf(&self) -> bool {
        self.leaf
    }

    fn count(&self) -> usize {
        self.keys.len()
    }

    fn key(&self, i: usize) -> &K {
        &self.keys[i]
    }

    fn child_aug(&self, i: usize) -> &A {
        &self.children[i].aug
    }
}

impl<K: Clone, V: Clone, A> Node<K, V, A> {
    /// Runs the augmentation updater against this node's current state.
    /// Returns whether the stored augmentation changed.
    pub(crate) fn apply_update<Aux>(
        &mut self,
        cfg: &TreeConfig<K, Aux>,
        meta: UpdateMeta<K, A>,
    ) -> bool
    where
        A: Augmentation<K, Aux>,
    {
        let mut aug = mem::take(&mut self.aug);
        let changed = aug.update(cfg, &*self, meta);
        self.aug = aug;
        changed
    }

    /// Returns a mutable reference to the node in `slot`, cloning it first
    /// if it is shared with another tree.
    ///
    /// This is the copy-on-write acquisition point: the first mutation
    /// after a tree clone forks exactly the nodes along the touched path,
    /// re-sharing their children, while unshared trees mutate in place
    /// without allocating. When this slot held the last reference to the
    /// original, the original's subtree is recycled into the pool.
    pub(crate) fn make_mut<'a>(
        slot: &'a mut NodePtr<K, V, A>,
        pool: &NodePool<K, V, A>,
    ) -> &'a mut Node<K, V, A>
    where
        A: Clone + Default,
    {
        if Arc::get_mut(slot).is_none() {
            let mut fresh = pool.alloc(slot.leaf);
            {
                let copy =
                    Arc::get_mut(&mut fresh).expect("`Node::make_mut()` - fresh node is shared!");
                copy.aug = slot.aug.clone();
                copy.keys.extend(slot.keys.iter().cloned());
                copy.values.extend(slot.values.iter().cloned());
                copy.children.extend(slot.children.iter().cloned());
            }
            let shared = mem::replace(slot, fresh);
            pool.release(shared, true);
        }
        Arc::get_mut(slot).expect("`Node::make_mut()` - node is shared!")
    }

    /// Splits this node at index `i`. The tail beyond `i` moves into a new
    /// right-hand node, the entry at `i` is returned as the separator, and
    /// both halves' augmentations are brought up to date.
    pub(crate) fn split<Aux>(
        &mut self,
        cfg: &TreeConfig<K, Aux>,
        pool: &NodePool<K, V, A>,
        i: usize,
    ) -> (K, V, NodePtr<K, V, A>)
    where
        A: Augmentation<K, Aux>,
    {
        let mut right_ptr = pool.alloc(self.leaf);
        {
            let right =
                Arc::get_mut(&mut right_ptr).expect("`Node::split()` - fresh node is shared!");
            right.keys.extend(self.keys.drain(i + 1..));
            right.values.extend(self.values.drain(i + 1..));
            if !self.leaf {
                right.children.extend(self.children.drain(i + 1..));
            }
            right.apply_update(cfg, UpdateMeta::Default);
        }
        let sep_value = self
            .values
            .pop()
            .expect("`Node::split()` - split index out of range!");
        let sep_key = self
            .keys
            .pop()
            .expect("`Node::split()` - split index out of range!");
        let right_aug = right_ptr.aug.clone();
        self.apply_update(
            cfg,
            UpdateMeta::Split {
                sep: sep_key.clone(),
                right: right_aug,
            },
        );
        (sep_key, sep_value, right_ptr)
    }

    /// Inserts `key`/`value` into the subtree rooted at this node, which
    /// must be uniquely owned. Full children are split pre-emptively on the
    /// way down so the recursion never has to back out. Returns the
    /// replaced entry, if any, and whether this node's augmentation
    /// changed.
    pub(crate) fn insert<Aux>(
        &mut self,
        cfg: &TreeConfig<K, Aux>,
        pool: &NodePool<K, V, A>,
        key: K,
        value: V,
    ) -> (Option<(K, V)>, bool)
    where
        A: Augmentation<K, Aux>,
    {
        let (mut i, found) = self.find(cfg.cmp, &key);
        if found {
            let old_key = mem::replace(&mut self.keys[i], key);
            let old_value = mem::replace(&mut self.values[i], value);
            return (Some((old_key, old_value)), false);
        }
        if self.leaf {
            let meta_key = key.clone();
            self.insert_at(i, key, value, None);
            let changed = self.apply_update(
                cfg,
                UpdateMeta::Insertion {
                    key: meta_key,
                    subtree: None,
                },
            );
            return (None, changed);
        }
        if self.children[i].count() >= MAX_ENTRIES {
            let (sep_key, sep_value, right) =
                Self::make_mut(&mut self.children[i], pool).split(cfg, pool, MAX_ENTRIES / 2);
            self.insert_at(i, sep_key, sep_value, Some(right));
            match (cfg.cmp)(&key, &self.keys[i]) {
                Ordering::Less => {}
                Ordering::Greater => i += 1,
                Ordering::Equal => {
                    // The key equals the separator we just promoted.
                    let old_key = mem::replace(&mut self.keys[i], key);
                    let old_value = mem::replace(&mut self.values[i], value);
                    return (Some((old_key, old_value)), false);
                }
            }
        }
        let meta_key = key.clone();
        let (replaced, new_bound) =
            Self::make_mut(&mut self.children[i], pool).insert(cfg, pool, key, value);
        let new_bound = if new_bound {
            self.apply_update(
                cfg,
                UpdateMeta::Insertion {
                    key: meta_key,
                    subtree: None,
                },
            )
        } else {
            false
        };
        (replaced, new_bound)
    }

    /// Removes `key` from the subtree rooted at this node, which must be
    /// uniquely owned. Under-minimum children are grown before descending;
    /// a rebalance restarts the search from this node because the target
    /// child may have been merged away.
    pub(crate) fn remove<Aux>(
        &mut self,
        cfg: &TreeConfig<K, Aux>,
        pool: &NodePool<K, V, A>,
        key: &K,
    ) -> (Option<(K, V)>, bool)
    where
        A: Augmentation<K, Aux>,
    {
        let (i, found) = self.find(cfg.cmp, key);
        if self.leaf {
            if !found {
                return (None, false);
            }
            let (out_key, out_value, _) = self.remove_at(i);
            let changed = self.apply_update(
                cfg,
                UpdateMeta::Removal {
                    key: out_key.clone(),
                    subtree: None,
                },
            );
            return (Some((out_key, out_value)), changed);
        }
        if self.children[i].count() <= MIN_ENTRIES {
            self.rebalance_or_merge(cfg, pool, i);
            return self.remove(cfg, pool, key);
        }
        let child = Self::make_mut(&mut self.children[i], pool);
        if found {
            // Replace the removed entry with the maximum of the left child.
            let (max_key, max_value) = child.remove_max(cfg, pool);
            let out_key = mem::replace(&mut self.keys[i], max_key);
            let out_value = mem::replace(&mut self.values[i], max_value);
            let changed = self.apply_update(
                cfg,
                UpdateMeta::Removal {
                    key: out_key.clone(),
                    subtree: None,
                },
            );
            return (Some((out_key, out_value)), changed);
        }
        let (removed, new_bound) = child.remove(cfg, pool, key);
        match removed {
            None => (None, false),
            Some((out_key, out_value)) => {
                let new_bound = if new_bound {
                    self.apply_update(
                        cfg,
                        UpdateMeta::Removal {
                            key: out_key.clone(),
                            subtree: None,
                        },
                    )
                } else {
                    false
                };
                (Some((out_key, out_value)), new_bound)
            }
        }
    }

    /// Removes and returns the maximum entry of the subtree rooted at this
    /// node, rebalancing on the way down as needed.
    fn remove_max<Aux>(&mut self, cfg: &TreeConfig<K, Aux>, pool: &NodePool<K, V, A>) -> (K, V)
    where
        A: Augmentation<K, Aux>,
    {
        if self.leaf {
            let (key, value, _) = self.pop_back();
            self.apply_update(
                cfg,
                UpdateMeta::Removal {
                    key: key.clone(),
                    subtree: None,
                },
            );
            return (key, value);
        }
        let i = self.count();
        if self.children[i].count() <= MIN_ENTRIES {
            self.rebalance_or_merge(cfg, pool, i);
            return self.remove_max(cfg, pool);
        }
        let (key, value) = Self::make_mut(&mut self.children[i], pool).remove_max(cfg, pool);
        self.apply_update(
            cfg,
            UpdateMeta::Removal {
                key: key.clone(),
                subtree: None,
            },
        );
        (key, value)
    }

    /// Grows `children[i]` so an entry can be removed from it while keeping
    /// it at or above the minimum: rotate an entry in from a sibling with
    /// spare capacity, or merge with a sibling when neither has any.
    fn rebalance_or_merge<Aux>(
        &mut self,
        cfg: &TreeConfig<K, Aux>,
        pool: &NodePool<K, V, A>,
        i: usize,
    ) where
        A: Augmentation<K, Aux>,
    {
        if i > 0 && self.children[i - 1].count() > MIN_ENTRIES {
            // Rotate from the left sibling: its last entry replaces the
            // separator, and the old separator moves down into the child.
            Self::make_mut(&mut self.children[i - 1], pool);
            Self::make_mut(&mut self.children[i], pool);
            let (moved_key, moved_value, grand) = Arc::get_mut(&mut self.children[i - 1])
                .expect("`Node::rebalance_or_merge()` - left sibling is shared!")
                .pop_back();
            let grand_aug = grand.as_ref().map(|g| g.aug.clone());
            Arc::get_mut(&mut self.children[i - 1])
                .expect("`Node::rebalance_or_merge()` - left sibling is shared!")
                .apply_update(
                    cfg,
                    UpdateMeta::Removal {
                        key: moved_key.clone(),
                        subtree: grand_aug.clone(),
                    },
                );
            let sep_key = mem::replace(&mut self.keys[i - 1], moved_key);
            let sep_value = mem::replace(&mut self.values[i - 1], moved_value);
            let child = Arc::get_mut(&mut self.children[i])
                .expect("`Node::rebalance_or_merge()` - child is shared!");
            child.push_front(sep_key.clone(), sep_value, grand);
            child.apply_update(
                cfg,
                UpdateMeta::Insertion {
                    key: sep_key,
                    subtree: grand_aug,
                },
            );
        } else if i < self.count() && self.children[i + 1].count() > MIN_ENTRIES {
            // Rotate from the right sibling, symmetrically.
            Self::make_mut(&mut self.children[i + 1], pool);
            Self::make_mut(&mut self.children[i], pool);
            let (moved_key, moved_value, grand) = Arc::get_mut(&mut self.children[i + 1])
                .expect("`Node::rebalance_or_merge()` - right sibling is shared!")
                .pop_front();
            let grand_aug = grand.as_ref().map(|g| g.aug.clone());
            Arc::get_mut(&mut self.children[i + 1])
                .expect("`Node::rebalance_or_merge()` - right sibling is shared!")
                .apply_update(
                    cfg,
                    UpdateMeta::Removal {
                        key: moved_key.clone(),
                        subtree: grand_aug.clone(),
                    },
                );
            let sep_key = mem::replace(&mut self.keys[i], moved_key);
            let sep_value = mem::replace(&mut self.values[i], moved_value);
            let child = Arc::get_mut(&mut self.children[i])
                .expect("`Node::rebalance_or_merge()` - child is shared!");
            child.push_back(sep_key.clone(), sep_value, grand);
            child.apply_update(
                cfg,
                UpdateMeta::Insertion {
                    key: sep_key,
                    subtree: grand_aug,
                },
            );
        } else {
            // Merge children[i] and children[i + 1] around their separator.
            let i = if i >= self.count() { self.count() - 1 } else { i };
            Self::make_mut(&mut self.children[i], pool);
            Self::make_mut(&mut self.children[i + 1], pool);
            let (sep_key, sep_value, right_ptr) = self.remove_at(i);
            let mut right_ptr =
                right_ptr.expect("`Node::rebalance_or_merge()` - interior node without child!");
            let right = Arc::get_mut(&mut right_ptr)
                .expect("`Node::rebalance_or_merge()` - detached sibling is shared!");
            let right_aug = mem::take(&mut right.aug);
            let child = Arc::get_mut(&mut self.children[i])
                .expect("`Node::rebalance_or_merge()` - child is shared!");
            child.keys.push(sep_key.clone());
            child.values.push(sep_value);
            child.keys.append(&mut right.keys);
            child.values.append(&mut right.values);
            child.children.append(&mut right.children);
            child.apply_update(
                cfg,
                UpdateMeta::Insertion {
                    key: sep_key,
                    subtree: Some(right_aug),
                },
            );
            // The detached node's children now belong to the merged child.
            pool.release(right_ptr, false);
        }
    }
}
