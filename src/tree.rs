//! The owning tree handle.

use core::cmp::Ordering;
use core::fmt;
use std::sync::Arc;

use crate::aug::{Augmentation, TreeConfig, UpdateMeta};
use crate::iter::Iter;
use crate::raw::node::{MAX_ENTRIES, Node, NodePtr};
use crate::raw::pool::NodePool;

/// An ordered map with copy-on-write structural sharing and a pluggable
/// per-subtree augmentation.
///
/// `AugMap` is the generic core behind [`Map`](crate::Map),
/// [`OrderStatMap`](crate::OrderStatMap) and
/// [`IntervalMap`](crate::IntervalMap). It is parameterized over the key
/// and value types, auxiliary configuration data made available to the
/// augmentation, and the augmentation type itself.
///
/// Cloning is O(1): the clone shares every node with the original, and
/// whichever handle mutates first copies just the nodes along the mutated
/// path. Spare nodes are recycled through a pool shared by all clones.
///
/// # Example: a custom augmentation
///
/// ```
/// use augbtree::{AugMap, Augmentation, NodeView, TreeConfig, UpdateMeta};
///
/// /// Total number of entries in the subtree.
/// #[derive(Clone, Default, PartialEq, Debug)]
/// struct Count(usize);
///
/// impl<K> Augmentation<K> for Count {
///     fn update(
///         &mut self,
///         _cfg: &TreeConfig<K>,
///         node: &impl NodeView<K, Self>,
///         _meta: UpdateMeta<K, Self>,
///     ) -> bool {
///         let mut total = node.count();
///         if !node.is_leaf() {
///             for i in 0..=node.count() {
///                 total += node.child_aug(i).0;
///             }
///         }
///         let changed = self.0 != total;
///         self.0 = total;
///         changed
///     }
/// }
///
/// let mut map: AugMap<i64, &str, (), Count> = AugMap::new((), |a, b| a.cmp(b));
/// map.upsert(1, "one");
/// map.upsert(2, "two");
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.get(&2), Some(&"two"));
/// ```
pub struct AugMap<K, V, Aux = (), A = ()> {
    root: Option<NodePtr<K, V, A>>,
    length: usize,
    cfg: TreeConfig<K, Aux>,
    pool: Arc<NodePool<K, V, A>>,
}

impl<K, V, Aux, A> AugMap<K, V, Aux, A> {
    /// Creates an empty map from auxiliary data and a key comparator.
    ///
    /// The comparator must induce a total order; the tree may otherwise
    /// corrupt silently.
    pub fn new(aux: Aux, cmp: fn(&K, &K) -> Ordering) -> Self {
        Self {
            root: None,
            length: 0,
            cfg: TreeConfig::new(aux, cmp),
            pool: Arc::new(NodePool::new()),
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns whether the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of levels in the tree; an empty map has height
    /// zero.
    pub fn height(&self) -> usize {
        let mut node = match &self.root {
            None => return 0,
            Some(root) => root.as_ref(),
        };
        let mut height = 1;
        while !node.leaf {
            node = node.children[0].as_ref();
            height += 1;
        }
        height
    }

    /// Removes all entries, recycling every node this handle owned
    /// exclusively back into the pool shared with its clones.
    pub fn reset(&mut self) {
        if let Some(root) = self.root.take() {
            self.pool.release(root, true);
        }
        self.length = 0;
    }

    /// Returns the map's configuration (comparator and auxiliary data).
    pub fn config(&self) -> &TreeConfig<K, Aux> {
        &self.cfg
    }

    /// Returns a cursor over the map's entries.
    pub fn iter(&self) -> Iter<'_, K, V, Aux, A> {
        Iter::new(&self.cfg, self.root.as_deref(), self.length)
    }

    /// Returns a reference to the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut it = self.iter();
        it.seek_ge(key);
        if it.valid() && self.cfg.compare(it.key(), key) == Ordering::Equal {
            Some(it.value())
        } else {
            None
        }
    }

    /// Returns whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }
}

impl<K, V, Aux, A> AugMap<K, V, Aux, A>
where
    K: Clone,
    V: Clone,
    A: Augmentation<K, Aux>,
{
    /// Inserts `key`/`value`, returning the previous entry if the key was
    /// already present.
    pub fn upsert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let root_is_full = self
            .root
            .as_ref()
            .is_some_and(|root| root.count() >= MAX_ENTRIES);
        if self.root.is_none() {
            self.root = Some(self.pool.alloc(true));
        } else if root_is_full {
            // Pre-split the root so the recursion below always has room to
            // push a separator up one level.
            let (sep_key, sep_value, right) = Node::make_mut(
                self.root.as_mut().expect("`AugMap::upsert()` - root vanished!"),
                &self.pool,
            )
            .split(&self.cfg, &self.pool, MAX_ENTRIES / 2);
            let old_root = self.root.take().expect("`AugMap::upsert()` - root vanished!");
            let mut new_root = self.pool.alloc(false);
            {
                let node = Arc::get_mut(&mut new_root)
                    .expect("`AugMap::upsert()` - fresh root is shared!");
                node.keys.push(sep_key);
                node.values.push(sep_value);
                node.children.push(old_root);
                node.children.push(right);
                node.apply_update(&self.cfg, UpdateMeta::Default);
            }
            self.root = Some(new_root);
        }
        let root = Node::make_mut(
            self.root.as_mut().expect("`AugMap::upsert()` - root vanished!"),
            &self.pool,
        );
        let (replaced, _) = root.insert(&self.cfg, &self.pool, key, value);
        if replaced.is_none() {
            self.length += 1;
        }
        replaced
    }

    /// Removes the entry stored under `key`, returning it if present.
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        self.root.as_ref()?;
        let root = Node::make_mut(
            self.root.as_mut().expect("`AugMap::delete()` - root vanished!"),
            &self.pool,
        );
        let (removed, _) = root.remove(&self.cfg, &self.pool, key);
        if removed.is_some() {
            self.length -= 1;
        }
        if self
            .root
            .as_ref()
            .is_some_and(|root| root.count() == 0)
        {
            // The root emptied out: drop a level (or empty the tree).
            let mut old = self.root.take().expect("`AugMap::delete()` - root vanished!");
            let node =
                Arc::get_mut(&mut old).expect("`AugMap::delete()` - mutated root is shared!");
            if !node.leaf {
                self.root = Some(node.children.remove(0));
            }
            self.pool.release(old, false);
        }
        removed
    }
}

impl<K, V, Aux: Clone, A> Clone for AugMap<K, V, Aux, A> {
    /// Clones the map in O(1) by sharing the root. The clone is a snapshot:
    /// mutations to either handle never affect the other.
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
            cfg: self.cfg.clone(),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<K, V, Aux, A> Drop for AugMap<K, V, Aux, A> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.pool.release(root, true);
        }
    }
}

/// Renders the tree in a Newick-like format: leaves as `k:v,k:v,…`,
/// interior nodes as `(subtree)k:v(subtree)…`, and the empty tree as `;`.
impl<K: fmt::Display, V: fmt::Display, Aux, A> fmt::Display for AugMap<K, V, Aux, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root.as_deref() {
            None => f.write_str(";"),
            Some(root) => write_node(f, root),
        }
    }
}

fn write_node<K: fmt::Display, V: fmt::Display, A>(
    f: &mut fmt::Formatter<'_>,
    node: &Node<K, V, A>,
) -> fmt::Result {
    if node.leaf {
        for i in 0..node.count() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", node.keys[i], node.values[i])?;
        }
        return Ok(());
    }
    for i in 0..=node.count() {
        f.write_str("(")?;
        write_node(f, node.children[i].as_ref())?;
        f.write_str(")")?;
        if i < node.count() {
            write!(f, "{}:{}", node.keys[i], node.values[i])?;
        }
    }
    Ok(())
}

impl<K: fmt::Debug, V: fmt::Debug, Aux, A> fmt::Debug for AugMap<K, V, Aux, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut it = self.iter();
        it.first();
        let mut map = f.debug_map();
        while it.valid() {
            map.entry(it.key(), it.value());
            it.next();
        }
        map.finish()
    }
}

#[cfg(test)]
impl<K, V, Aux, A> AugMap<K, V, Aux, A>
where
    K: Clone,
    V: Clone,
    A: Augmentation<K, Aux> + PartialEq + fmt::Debug,
{
    /// Checks every structural invariant: equal leaf depth, node occupancy
    /// bounds, strict key ordering, augmentation consistency, and the
    /// cached length.
    pub(crate) fn validate_invariants(&self) {
        let Some(root) = self.root.as_deref() else {
            assert_eq!(self.length, 0, "empty tree with non-zero length");
            return;
        };
        let mut leaf_depth = None;
        let total = self.validate_node(root, 0, &mut leaf_depth, true);
        assert_eq!(total, self.length, "cached length out of sync");
    }

    fn validate_node(
        &self,
        node: &Node<K, V, A>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        is_root: bool,
    ) -> usize {
        use crate::raw::node::MIN_ENTRIES;

        assert!(node.count() >= 1, "empty node reachable from the root");
        if !is_root {
            assert!(node.count() >= MIN_ENTRIES, "node below minimum occupancy");
        }
        assert!(node.count() <= MAX_ENTRIES, "node above maximum occupancy");
        assert_eq!(node.keys.len(), node.values.len(), "keys/values diverged");
        for i in 1..node.count() {
            assert_eq!(
                self.cfg.compare(node.key(i - 1), node.key(i)),
                Ordering::Less,
                "keys out of order within a node"
            );
        }

        let mut fresh = A::default();
        fresh.update(&self.cfg, node, UpdateMeta::Default);
        assert_eq!(fresh, node.aug, "augmentation out of sync");

        if node.leaf {
            assert!(node.children.is_empty(), "leaf with children");
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) => assert_eq!(depth, expected, "leaves at unequal depth"),
            }
            node.count()
        } else {
            assert_eq!(
                node.children.len(),
                node.count() + 1,
                "interior child count mismatch"
            );
            let mut total = node.count();
            for child in &node.children {
                total += self.validate_node(child, depth + 1, leaf_depth, false);
            }
            total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderstat::OrderStatAug;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn ordered(a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }

    fn new_map() -> AugMap<i64, i64, (), OrderStatAug> {
        AugMap::new((), ordered)
    }

    fn count_nodes<K, V, A>(node: &Node<K, V, A>) -> (usize, usize) {
        if node.leaf {
            (1, 0)
        } else {
            let mut leaves = 0;
            let mut interiors = 1;
            for child in &node.children {
                let (l, n) = count_nodes(child);
                leaves += l;
                interiors += n;
            }
            (leaves, interiors)
        }
    }

    #[test]
    fn upsert_is_idempotent_on_length() {
        let mut map = new_map();
        assert_eq!(map.upsert(7, 1), None);
        assert_eq!(map.upsert(7, 2), Some((7, 1)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&7), Some(&2));
    }

    #[test]
    fn delete_removes() {
        let mut map = new_map();
        for i in 0..100 {
            map.upsert(i, i * 10);
        }
        for i in 0..100 {
            assert_eq!(map.delete(&i), Some((i, i * 10)));
            assert_eq!(map.get(&i), None);
            assert_eq!(map.len(), (99 - i) as usize);
            map.validate_invariants();
        }
        assert_eq!(map.delete(&5), None);
        assert_eq!(map.height(), 0);
    }

    #[test]
    fn height_grows_with_splits() {
        let mut map = new_map();
        assert_eq!(map.height(), 0);
        map.upsert(0, 0);
        assert_eq!(map.height(), 1);
        for i in 1..200 {
            map.upsert(i, i);
        }
        assert!(map.height() >= 3, "degree-4 tree of 200 keys is deep");
        map.validate_invariants();
    }

    #[test]
    fn newick_rendering() {
        let mut map: AugMap<i64, i64> = AugMap::new((), ordered);
        assert_eq!(map.to_string(), ";");
        map.upsert(2, 20);
        map.upsert(1, 10);
        map.upsert(3, 30);
        // Three entries fit in a single leaf at test degree.
        assert_eq!(map.to_string(), "1:10,2:20,3:30");
    }

    #[test]
    fn clone_is_isolated() {
        let mut map = new_map();
        for i in 0..300 {
            map.upsert(i, i);
        }
        let mut fork = map.clone();
        for i in 150..300 {
            assert!(fork.delete(&i).is_some());
        }
        fork.upsert(1000, 1000);
        assert_eq!(map.len(), 300);
        assert_eq!(fork.len(), 151);
        for i in 0..300 {
            assert_eq!(map.get(&i), Some(&i), "original lost key {i}");
        }
        assert_eq!(map.get(&1000), None);
        assert_eq!(fork.get(&200), None);
        map.validate_invariants();
        fork.validate_invariants();
    }

    #[test]
    fn reset_returns_nodes_to_pool() {
        let mut map = new_map();
        for i in 0..500 {
            map.upsert(i, i);
        }
        let (leaves, interiors) =
            count_nodes(map.root.as_deref().expect("tree is non-empty"));
        map.reset();
        assert_eq!(map.len(), 0);
        assert_eq!(map.pool.spare_counts(), (leaves, interiors));

        // A rebuilt tree draws from the pool instead of the allocator.
        for i in 0..500 {
            map.upsert(i, i);
        }
        let (spare_leaves, _) = map.pool.spare_counts();
        assert!(spare_leaves < leaves);
        map.validate_invariants();
    }

    #[derive(Clone, Debug)]
    enum MapOp {
        Upsert(i64, i64),
        Delete(i64),
        Get(i64),
    }

    fn op_strategy() -> impl Strategy<Value = MapOp> {
        prop_oneof![
            4 => (-200i64..200, any::<i64>()).prop_map(|(k, v)| MapOp::Upsert(k, v)),
            2 => (-200i64..200).prop_map(MapOp::Delete),
            1 => (-200i64..200).prop_map(MapOp::Get),
        ]
    }

    proptest! {
        #[test]
        fn model_matches_btreemap(ops in prop::collection::vec(op_strategy(), 1..600)) {
            let mut map = new_map();
            let mut model: BTreeMap<i64, i64> = BTreeMap::new();

            for op in &ops {
                match *op {
                    MapOp::Upsert(k, v) => {
                        let replaced = map.upsert(k, v).map(|(_, old)| old);
                        prop_assert_eq!(replaced, model.insert(k, v));
                    }
                    MapOp::Delete(k) => {
                        let removed = map.delete(&k).map(|(_, old)| old);
                        prop_assert_eq!(removed, model.remove(&k));
                    }
                    MapOp::Get(k) => {
                        prop_assert_eq!(map.get(&k), model.get(&k));
                    }
                }
                prop_assert_eq!(map.len(), model.len());
            }

            map.validate_invariants();

            let mut it = map.iter();
            it.first();
            for (k, v) in &model {
                prop_assert!(it.valid());
                prop_assert_eq!(it.key(), k);
                prop_assert_eq!(it.value(), v);
                it.next();
            }
            prop_assert!(!it.valid());
        }

        #[test]
        fn snapshots_preserve_history(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let mut map = new_map();
            let mut snapshots: Vec<(AugMap<i64, i64, (), OrderStatAug>, Vec<(i64, i64)>)> =
                Vec::new();
            let mut model: BTreeMap<i64, i64> = BTreeMap::new();

            for (step, op) in ops.iter().enumerate() {
                match *op {
                    MapOp::Upsert(k, v) => {
                        map.upsert(k, v);
                        model.insert(k, v);
                    }
                    MapOp::Delete(k) => {
                        map.delete(&k);
                        model.remove(&k);
                    }
                    MapOp::Get(_) => {}
                }
                if step % 20 == 0 {
                    snapshots.push((map.clone(), model.iter().map(|(&k, &v)| (k, v)).collect()));
                }
            }

            for (snapshot, expected) in &snapshots {
                let mut it = snapshot.iter();
                it.first();
                for (k, v) in expected {
                    prop_assert!(it.valid());
                    prop_assert_eq!(it.key(), k);
                    prop_assert_eq!(it.value(), v);
                    it.next();
                }
                prop_assert!(!it.valid());
                snapshot.validate_invariants();
            }
        }
    }
}
