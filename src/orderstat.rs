//! Order-statistic map and set: rank and select queries in O(log n).

use core::cmp::Ordering;
use core::fmt;

use smallvec::SmallVec;

use crate::aug::{Augmentation, NodeView, TreeConfig, UpdateMeta};
use crate::iter::Iter;
use crate::map::ordered;
use crate::tree::AugMap;

/// Subtree cardinality: the number of entries rooted at each node.
///
/// Maintained incrementally — an insertion or removal adjusts the count by
/// the moved key plus any subtree that moved with it, and only the
/// `Default` action recounts from the node.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct OrderStatAug {
    items: usize,
}

impl OrderStatAug {
    /// The number of entries in the subtree this augmentation summarizes.
    pub fn items(&self) -> usize {
        self.items
    }
}

impl<K, Aux> Augmentation<K, Aux> for OrderStatAug {
    fn update(
        &mut self,
        _cfg: &TreeConfig<K, Aux>,
        node: &impl NodeView<K, Self>,
        meta: UpdateMeta<K, Self>,
    ) -> bool {
        match meta {
            UpdateMeta::Insertion { subtree, .. } => {
                self.items += 1 + subtree.map_or(0, |s| s.items);
                true
            }
            UpdateMeta::Removal { subtree, .. } => {
                self.items -= 1 + subtree.map_or(0, |s| s.items);
                true
            }
            UpdateMeta::Split { right, .. } => {
                self.items -= 1 + right.items;
                true
            }
            UpdateMeta::Default => {
                let orig = self.items;
                let mut items = node.count();
                if !node.is_leaf() {
                    for i in 0..=node.count() {
                        items += node.child_aug(i).items;
                    }
                }
                self.items = items;
                self.items != orig
            }
        }
    }
}

impl<'t, K, V, Aux> Iter<'t, K, V, Aux, OrderStatAug> {
    /// Returns the rank (zero-based position in key order) of the current
    /// entry, or `None` if the iterator is not valid.
    ///
    /// O(log n): every ancestor contributes the cardinality of the
    /// subtrees to the left of the descent path plus the keys preceding
    /// it.
    pub fn rank(&mut self) -> Option<usize> {
        if !self.valid() {
            return None;
        }
        let mut ll = self.low_level();
        let mut saved: SmallVec<[i16; 6]> = SmallVec::new();
        while ll.depth() > 0 {
            saved.push(ll.pos());
            ll.ascend();
        }
        let mut before = 0;
        while let Some(child_pos) = saved.pop() {
            let node = ll.node();
            let pos = ll.pos() as usize;
            for i in 0..pos {
                before += node.child_aug(i).items;
            }
            before += pos;
            ll.descend();
            ll.set_pos(child_pos);
        }
        let node = ll.node();
        let pos = ll.pos() as usize;
        if !node.is_leaf() {
            for i in 0..=pos {
                before += node.child_aug(i).items;
            }
        }
        before += pos;
        Some(before)
    }

    /// Positions the iterator at the `nth` entry in key order
    /// (zero-based), or leaves it invalid when `nth` is out of range.
    ///
    /// O(log n): subtree cardinalities steer the descent, so no key
    /// comparisons are performed.
    pub fn seek_nth(&mut self, nth: usize) {
        self.reset();
        if nth >= self.tree_len() {
            return;
        }
        let mut ll = self.low_level();
        ll.increment_pos();
        let mut consumed = 0;
        loop {
            if ll.is_leaf() {
                ll.set_pos((nth - consumed) as i16);
                return;
            }
            let below = ll.child_aug().items;
            if consumed + below > nth {
                ll.descend();
                continue;
            }
            consumed += below;
            if consumed == nth {
                // The separator at the current position is the target.
                return;
            }
            consumed += 1;
            ll.increment_pos();
        }
    }
}

/// An ordered map that additionally answers rank and select queries in
/// O(log n).
///
/// # Examples
///
/// ```
/// use augbtree::OrderStatMap;
///
/// let mut map = OrderStatMap::new();
/// map.upsert(2, 'a');
/// map.upsert(3, 'b');
/// map.upsert(5, 'c');
/// map.upsert(4, 'd');
///
/// assert_eq!(map.get_nth(2), Some((&4, &'d')));
/// assert_eq!(map.rank_of(&5), Some(3));
///
/// let mut it = map.iter();
/// it.seek_nth(0);
/// assert_eq!(it.key(), &2);
/// assert_eq!(it.rank(), Some(0));
/// ```
pub struct OrderStatMap<K, V> {
    tree: AugMap<K, V, (), OrderStatAug>,
}

impl<K: Ord + Clone, V: Clone> OrderStatMap<K, V> {
    /// Creates an empty map ordered by [`Ord`].
    pub fn new() -> Self {
        Self::with_cmp(ordered::<K>)
    }
}

impl<K: Clone, V: Clone> OrderStatMap<K, V> {
    /// Creates an empty map ordered by the provided comparator.
    pub fn with_cmp(cmp: fn(&K, &K) -> Ordering) -> Self {
        Self {
            tree: AugMap::new((), cmp),
        }
    }

    /// Inserts `key`/`value`, returning the previous entry if the key was
    /// already present.
    pub fn upsert(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.tree.upsert(key, value)
    }

    /// Removes the entry stored under `key`, returning it if present.
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        self.tree.delete(key)
    }
}

impl<K, V> OrderStatMap<K, V> {
    /// Returns a reference to the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key)
    }

    /// Returns whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    /// Returns the entry at position `nth` in key order (zero-based).
    pub fn get_nth(&self, nth: usize) -> Option<(&K, &V)> {
        let mut it = self.iter();
        it.seek_nth(nth);
        if it.valid() {
            Some((it.key(), it.value()))
        } else {
            None
        }
    }

    /// Returns the zero-based position of `key` in key order, or `None`
    /// if the key is not present.
    pub fn rank_of(&self, key: &K) -> Option<usize> {
        let mut it = self.iter();
        it.seek_ge(key);
        if it.valid() && self.tree.config().compare(it.key(), key) == Ordering::Equal {
            it.rank()
        } else {
            None
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns whether the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of levels in the tree.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Removes all entries.
    pub fn reset(&mut self) {
        self.tree.reset();
    }

    /// Returns a cursor over the map's entries, extended with
    /// [`rank`](Iter::rank) and [`seek_nth`](Iter::seek_nth).
    pub fn iter(&self) -> Iter<'_, K, V, (), OrderStatAug> {
        self.tree.iter()
    }
}

impl<K, V> Clone for OrderStatMap<K, V> {
    /// O(1); the clone shares all nodes with the original until one of
    /// them is mutated.
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> Default for OrderStatMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for OrderStatMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.upsert(key, value);
        }
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderStatMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}

/// An ordered set that additionally answers rank and select queries in
/// O(log n).
///
/// # Examples
///
/// ```
/// use augbtree::OrderStatSet;
///
/// let set: OrderStatSet<i64> = (0..100).collect();
/// assert_eq!(set.get_nth(41), Some(&41));
/// assert_eq!(set.rank_of(&99), Some(99));
/// ```
pub struct OrderStatSet<T> {
    map: OrderStatMap<T, ()>,
}

impl<T: Ord + Clone> OrderStatSet<T> {
    /// Creates an empty set ordered by [`Ord`].
    pub fn new() -> Self {
        Self::with_cmp(ordered::<T>)
    }
}

impl<T: Clone> OrderStatSet<T> {
    /// Creates an empty set ordered by the provided comparator.
    pub fn with_cmp(cmp: fn(&T, &T) -> Ordering) -> Self {
        Self {
            map: OrderStatMap::with_cmp(cmp),
        }
    }

    /// Inserts `item`, returning the previous equal item if one was
    /// present.
    pub fn upsert(&mut self, item: T) -> Option<T> {
        self.map.upsert(item, ()).map(|(item, ())| item)
    }

    /// Removes `item`, returning it if it was present.
    pub fn delete(&mut self, item: &T) -> Option<T> {
        self.map.delete(item).map(|(item, ())| item)
    }
}

impl<T> OrderStatSet<T> {
    /// Returns whether `item` is present.
    pub fn contains(&self, item: &T) -> bool {
        self.map.contains_key(item)
    }

    /// Returns the item at position `nth` in order (zero-based).
    pub fn get_nth(&self, nth: usize) -> Option<&T> {
        self.map.get_nth(nth).map(|(item, _)| item)
    }

    /// Returns the zero-based position of `item`, or `None` if it is not
    /// present.
    pub fn rank_of(&self, item: &T) -> Option<usize> {
        self.map.rank_of(item)
    }

    /// Returns the number of items in the set.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns whether the set contains no items.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Removes all items.
    pub fn reset(&mut self) {
        self.map.reset();
    }

    /// Returns a cursor over the set's items, extended with
    /// [`rank`](Iter::rank) and [`seek_nth`](Iter::seek_nth).
    pub fn iter(&self) -> Iter<'_, T, (), (), OrderStatAug> {
        self.map.iter()
    }
}

impl<T> Clone for OrderStatSet<T> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<T: Ord + Clone> Default for OrderStatSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> FromIterator<T> for OrderStatSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.upsert(item);
        }
        set
    }
}

impl<T: fmt::Debug> fmt::Debug for OrderStatSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut it = self.iter();
        it.first();
        let mut set = f.debug_set();
        while it.valid() {
            set.entry(it.key());
            it.next();
        }
        set.finish()
    }
}
