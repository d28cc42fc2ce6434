//! Plain (unaugmented) ordered map and set.

use core::cmp::Ordering;
use core::fmt;

use crate::iter::Iter;
use crate::tree::AugMap;

pub(crate) fn ordered<K: Ord>(a: &K, b: &K) -> Ordering {
    a.cmp(b)
}

/// An ordered map with O(1) snapshot clones.
///
/// `Map` fixes the augmentation of [`AugMap`](crate::AugMap) to the no-op
/// augmentation. Entries are kept in comparator order; lookups, inserts
/// and deletes are O(log n), and [`Clone`] is O(1) with copy-on-write
/// sharing between the clones.
///
/// # Examples
///
/// ```
/// use augbtree::Map;
///
/// let mut map = Map::new();
/// map.upsert(2, "two");
/// map.upsert(12, "twelve");
/// map.upsert(1, "one");
///
/// assert_eq!(map.get(&12), Some(&"twelve"));
/// assert_eq!(map.len(), 3);
///
/// let mut it = map.iter();
/// it.first();
/// let mut keys = Vec::new();
/// while it.valid() {
///     keys.push(*it.key());
///     it.next();
/// }
/// assert_eq!(keys, [1, 2, 12]);
/// ```
pub struct Map<K, V> {
    tree: AugMap<K, V>,
}

impl<K: Ord + Clone, V: Clone> Map<K, V> {
    /// Creates an empty map ordered by [`Ord`].
    pub fn new() -> Self {
        Self::with_cmp(ordered::<K>)
    }
}

impl<K: Clone, V: Clone> Map<K, V> {
    /// Creates an empty map ordered by the provided comparator.
    ///
    /// ```
    /// use augbtree::Map;
    ///
    /// // Reverse ordering.
    /// let mut map = Map::with_cmp(|a: &i64, b: &i64| b.cmp(a));
    /// map.upsert(1, ());
    /// map.upsert(2, ());
    ///
    /// let mut it = map.iter();
    /// it.first();
    /// assert_eq!(it.key(), &2);
    /// ```
    pub fn with_cmp(cmp: fn(&K, &K) -> Ordering) -> Self {
        Self {
            tree: AugMap::new((), cmp),
        }
    }

    /// Inserts `key`/`value`, returning the previous entry if the key was
    /// already present.
    ///
    /// ```
    /// use augbtree::Map;
    ///
    /// let mut map = Map::new();
    /// assert_eq!(map.upsert(5, "old"), None);
    /// assert_eq!(map.upsert(5, "new"), Some((5, "old")));
    /// assert_eq!(map.get(&5), Some(&"new"));
    /// ```
    pub fn upsert(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.tree.upsert(key, value)
    }

    /// Removes the entry stored under `key`, returning it if present.
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        self.tree.delete(key)
    }
}

impl<K, V> Map<K, V> {
    /// Returns a reference to the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.get(key)
    }

    /// Returns whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns whether the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of levels in the tree; an empty map has height
    /// zero.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Removes all entries, recycling the nodes this handle owned
    /// exclusively.
    pub fn reset(&mut self) {
        self.tree.reset();
    }

    /// Returns a cursor over the map's entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.tree.iter()
    }
}

impl<K, V> Clone for Map<K, V> {
    /// O(1); the clone shares all nodes with the original until one of
    /// them is mutated.
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.upsert(key, value);
        }
        map
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tree, f)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}

/// An ordered set with O(1) snapshot clones.
///
/// # Examples
///
/// ```
/// use augbtree::Set;
///
/// let mut set = Set::new();
/// set.upsert(3);
/// set.upsert(1);
/// set.upsert(2);
///
/// assert!(set.contains(&2));
/// assert_eq!(set.delete(&2), Some(2));
/// assert!(!set.contains(&2));
/// ```
pub struct Set<T> {
    map: Map<T, ()>,
}

impl<T: Ord + Clone> Set<T> {
    /// Creates an empty set ordered by [`Ord`].
    pub fn new() -> Self {
        Self::with_cmp(ordered::<T>)
    }
}

impl<T: Clone> Set<T> {
    /// Creates an empty set ordered by the provided comparator.
    pub fn with_cmp(cmp: fn(&T, &T) -> Ordering) -> Self {
        Self {
            map: Map::with_cmp(cmp),
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

impl<T> Set<T> {
    /// Returns whether `item` is present.
    pub fn contains(&self, item: &T) -> bool {
        self.map.contains_key(item)
    }

    /// Returns the number of items in the set.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns whether the set contains no items.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of levels in the tree.
    pub fn height(&self) -> usize {
        self.map.height()
    }

    /// Removes all items.
    pub fn reset(&mut self) {
        self.map.reset();
    }

    /// Returns a cursor over the set's items; read them with
    /// [`Iter::key`].
    pub fn iter(&self) -> Iter<'_, T, ()> {
        self.map.iter()
    }
}

impl<T> Clone for Set<T> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<T: Ord + Clone> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.upsert(item);
        }
        set
    }
}

impl<T: fmt::Debug> fmt::Debug for Set<T> {
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
