//! Interval map: an ordered map keyed by intervals, with overlap scans
//! that visit only the subtrees that can intersect the query.

use core::cmp::Ordering;
use core::fmt;
use core::ops::Range;

use crate::aug::{Augmentation, NodeRef, NodeView, TreeConfig, UpdateMeta};
use crate::iter::Iter;
use crate::tree::AugMap;

/// A half-open interval `[key, end)` over endpoint type `K`.
///
/// `key` is the inclusive start and `end` the exclusive end. When `end` is
/// not greater than `key`, the interval is treated as the single point
/// `key`.
pub trait Interval<K> {
    /// The inclusive start of the interval.
    fn key(&self) -> &K;

    /// The exclusive end of the interval.
    fn end(&self) -> &K;
}

impl<K> Interval<K> for Range<K> {
    fn key(&self) -> &K {
        &self.start
    }

    fn end(&self) -> &K {
        &self.end
    }
}

impl<K> Interval<K> for (K, K) {
    fn key(&self) -> &K {
        &self.0
    }

    fn end(&self) -> &K {
        &self.1
    }
}

/// An upper endpoint: a key together with whether the bound includes the
/// key itself.
///
/// Bounds order by key, with an inclusive bound ranking above an exclusive
/// bound on the same key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyBound<K> {
    key: K,
    inclusive: bool,
}

impl<K> KeyBound<K> {
    /// A bound that includes `key`.
    pub fn inclusive(key: K) -> Self {
        Self {
            key,
            inclusive: true,
        }
    }

    /// A bound that excludes `key`.
    pub fn exclusive(key: K) -> Self {
        Self {
            key,
            inclusive: false,
        }
    }

    /// The bound's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Whether the bound includes its key.
    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }
}

impl<K: Ord> KeyBound<K> {
    /// The upper endpoint of an interval: its exclusive end when the end
    /// exceeds the start, otherwise its start, inclusively (a point).
    pub fn upper<I: Interval<K>>(interval: &I) -> Self
    where
        K: Clone,
    {
        if interval.end() > interval.key() {
            Self::exclusive(interval.end().clone())
        } else {
            Self::inclusive(interval.key().clone())
        }
    }

    /// Whether `point` lies below this upper bound.
    pub fn contains(&self, point: &K) -> bool {
        match point.cmp(&self.key) {
            Ordering::Less => true,
            Ordering::Equal => self.inclusive,
            Ordering::Greater => false,
        }
    }
}

/// The maximum upper endpoint among all intervals in a subtree.
///
/// An insertion raises the stored bound when the incoming interval (or
/// subtree) reaches higher; a removal recomputes only when the removed
/// interval might have been the witness for the stored bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalAug<K> {
    max: Option<KeyBound<K>>,
}

impl<K> IntervalAug<K> {
    /// The subtree's maximum upper endpoint, or `None` for an empty
    /// subtree.
    pub fn max_bound(&self) -> Option<&KeyBound<K>> {
        self.max.as_ref()
    }
}

impl<K> Default for IntervalAug<K> {
    fn default() -> Self {
        Self { max: None }
    }
}

fn find_max<I, K>(node: &impl NodeView<I, IntervalAug<K>>) -> Option<KeyBound<K>>
where
    I: Interval<K>,
    K: Ord + Clone,
{
    let mut max: Option<KeyBound<K>> = None;
    for i in 0..node.count() {
        let up = KeyBound::upper(node.key(i));
        if max.as_ref().is_none_or(|m| *m < up) {
            max = Some(up);
        }
    }
    if !node.is_leaf() {
        for i in 0..=node.count() {
            if let Some(up) = node.child_aug(i).max.as_ref() {
                if max.as_ref().is_none_or(|m| m < up) {
                    max = Some(up.clone());
                }
            }
        }
    }
    max
}

impl<I, K> Augmentation<I> for IntervalAug<K>
where
    I: Interval<K> + Clone,
    K: Ord + Clone,
{
    fn update(
        &mut self,
        _cfg: &TreeConfig<I>,
        node: &impl NodeView<I, Self>,
        meta: UpdateMeta<I, Self>,
    ) -> bool {
        match meta {
            UpdateMeta::Insertion { key, subtree } => {
                let mut up = KeyBound::upper(&key);
                if let Some(sub) = subtree.and_then(|s| s.max) {
                    if sub > up {
                        up = sub;
                    }
                }
                if self.max.as_ref().is_none_or(|m| *m < up) {
                    self.max = Some(up);
                    true
                } else {
                    false
                }
            }
            UpdateMeta::Removal { key, subtree } => {
                let mut up = KeyBound::upper(&key);
                if let Some(sub) = subtree.and_then(|s| s.max) {
                    if sub > up {
                        up = sub;
                    }
                }
                if self.max.as_ref() == Some(&up) {
                    // The removed interval may have been the witness for
                    // the stored bound.
                    let prev = self.max.take();
                    self.max = find_max(node);
                    self.max != prev
                } else {
                    false
                }
            }
            UpdateMeta::Split { sep, right } => {
                if self.max != right.max && self.max.as_ref() != Some(&KeyBound::upper(&sep)) {
                    // The witness for the stored bound stayed on this side.
                    return false;
                }
                let prev = self.max.clone();
                self.max = find_max(node);
                self.max != prev
            }
            UpdateMeta::Default => {
                let prev = self.max.clone();
                self.max = find_max(node);
                self.max != prev
            }
        }
    }
}

fn compare_intervals<I, K>(a: &I, b: &I) -> Ordering
where
    I: Interval<K>,
    K: Ord,
{
    a.key().cmp(b.key()).then_with(|| a.end().cmp(b.end()))
}

/// An ordered map keyed by intervals, augmented for efficient overlap
/// queries.
///
/// Entries order by interval start, then end. [`IntervalIter`] extends the
/// cursor with [`first_overlap`](IntervalIter::first_overlap) and
/// [`next_overlap`](IntervalIter::next_overlap), which together emit
/// exactly the stored intervals intersecting a query, in ascending start
/// order.
///
/// `core::ops::Range` implements [`Interval`], so ranges work as keys
/// directly:
///
/// ```
/// use augbtree::IntervalMap;
///
/// let mut map = IntervalMap::new();
/// map.upsert(1..2, 'a');
/// map.upsert(2..3, 'b');
/// map.upsert(1..5, 'c');
/// map.upsert(0..6, 'd');
/// map.upsert(2..7, 'e');
///
/// let mut hits = Vec::new();
/// let mut it = map.iter();
/// it.first_overlap(4..5);
/// while it.valid() {
///     hits.push(it.interval().clone());
///     it.next_overlap();
/// }
/// assert_eq!(hits, [0..6, 1..5, 2..7]);
/// ```
pub struct IntervalMap<I, V, K> {
    tree: AugMap<I, V, (), IntervalAug<K>>,
}

impl<I, V, K> IntervalMap<I, V, K>
where
    I: Interval<K> + Clone,
    V: Clone,
    K: Ord + Clone,
{
    /// Creates an empty interval map ordered by `(start, end)`.
    pub fn new() -> Self {
        Self {
            tree: AugMap::new((), compare_intervals::<I, K>),
        }
    }

    /// Inserts `interval`/`value`, returning the previous entry if an
    /// equal interval was already present.
    pub fn upsert(&mut self, interval: I, value: V) -> Option<(I, V)> {
        self.tree.upsert(interval, value)
    }

    /// Removes the entry stored under `interval`, returning it if present.
    pub fn delete(&mut self, interval: &I) -> Option<(I, V)> {
        self.tree.delete(interval)
    }
}

impl<I, V, K> IntervalMap<I, V, K> {
    /// Returns a reference to the value stored under `interval`.
    pub fn get(&self, interval: &I) -> Option<&V> {
        self.tree.get(interval)
    }

    /// Returns whether `interval` is present.
    pub fn contains(&self, interval: &I) -> bool {
        self.tree.contains_key(interval)
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

    /// Returns a cursor over the map's entries, extended with overlap
    /// scanning.
    pub fn iter(&self) -> IntervalIter<'_, I, V, K> {
        IntervalIter {
            it: self.tree.iter(),
            scan: None,
        }
    }
}

impl<I, V, K> Clone for IntervalMap<I, V, K> {
    /// O(1); the clone shares all nodes with the original until one of
    /// them is mutated.
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<I, V, K> Default for IntervalMap<I, V, K>
where
    I: Interval<K> + Clone,
    V: Clone,
    K: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, V, K> FromIterator<(I, V)> for IntervalMap<I, V, K>
where
    I: Interval<K> + Clone,
    V: Clone,
    K: Ord + Clone,
{
    fn from_iter<T: IntoIterator<Item = (I, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (interval, value) in iter {
            map.upsert(interval, value);
        }
        map
    }
}

impl<I: fmt::Debug, V: fmt::Debug, K> fmt::Debug for IntervalMap<I, V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}

/// State of an in-progress overlap scan: the query, a *soft minimum*
/// (first position whose start is at or above the query's start — beyond
/// it every stored interval's end clears the query start, so emission
/// needs no further comparisons) and a *hard maximum* (first position
/// whose start exceeds the query's upper bound — the scan terminates
/// there). Both constraints are refined as the scan descends through
/// them.
struct OverlapScan<'t, I, V, K> {
    query: I,
    query_upper: KeyBound<K>,
    min_node: NodeRef<'t, I, V, IntervalAug<K>>,
    min_pos: i16,
    min_reached: bool,
    max_node: NodeRef<'t, I, V, IntervalAug<K>>,
    max_pos: i16,
}

/// First position in `node` whose interval starts at or above `start`.
fn lower_pos<I, V, K>(node: NodeRef<'_, I, V, IntervalAug<K>>, start: &K) -> i16
where
    I: Interval<K>,
    K: Ord,
{
    let mut lo = 0;
    let mut hi = node.count();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if *start <= *node.key(mid).key() {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo as i16
}

/// First position in `node` whose interval starts beyond `upper`.
fn upper_pos<I, V, K>(node: NodeRef<'_, I, V, IntervalAug<K>>, upper: &KeyBound<K>) -> i16
where
    I: Interval<K>,
    K: Ord,
{
    let mut lo = 0;
    let mut hi = node.count();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if upper.contains(node.key(mid).key()) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo as i16
}

/// A cursor over an [`IntervalMap`], in `(start, end)` order, extended
/// with overlap scanning.
///
/// Plain positioning ([`first`](IntervalIter::first),
/// [`seek_ge`](IntervalIter::seek_ge), …) and overlap scanning are
/// mutually exclusive modes; any plain positioning call abandons an
/// in-progress overlap scan.
pub struct IntervalIter<'t, I, V, K> {
    it: Iter<'t, I, V, (), IntervalAug<K>>,
    scan: Option<OverlapScan<'t, I, V, K>>,
}

impl<'t, I, V, K> IntervalIter<'t, I, V, K> {
    /// Returns the iterator to its initial unpositioned state.
    pub fn reset(&mut self) {
        self.scan = None;
        self.it.reset();
    }

    /// Positions the iterator at the first entry.
    pub fn first(&mut self) {
        self.scan = None;
        self.it.first();
    }

    /// Positions the iterator at the last entry.
    pub fn last(&mut self) {
        self.scan = None;
        self.it.last();
    }

    /// Advances to the entry immediately following the current position.
    pub fn next(&mut self) {
        self.it.next();
    }

    /// Steps back to the entry immediately preceding the current position.
    pub fn prev(&mut self) {
        self.it.prev();
    }

    /// Positions the iterator at the first entry ordered at or after
    /// `interval`.
    pub fn seek_ge(&mut self, interval: &I) {
        self.scan = None;
        self.it.seek_ge(interval);
    }

    /// Positions the iterator at the last entry ordered before `interval`.
    pub fn seek_lt(&mut self, interval: &I) {
        self.scan = None;
        self.it.seek_lt(interval);
    }

    /// Returns whether the iterator is positioned at an entry.
    pub fn valid(&self) -> bool {
        self.it.valid()
    }

    /// Returns the interval at the current position.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not [`valid`](IntervalIter::valid).
    pub fn interval(&self) -> &'t I {
        self.it.key()
    }

    /// Returns the value at the current position.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not [`valid`](IntervalIter::valid).
    pub fn value(&self) -> &'t V {
        self.it.value()
    }
}

impl<'t, I, V, K> IntervalIter<'t, I, V, K>
where
    I: Interval<K> + Clone,
    K: Ord + Clone,
{
    /// Positions the iterator at the first stored interval overlapping
    /// `query`; entries then come in ascending start order through
    /// [`next_overlap`](IntervalIter::next_overlap).
    ///
    /// An interval `[s, e)` overlaps `[qs, qe)` when `s` is below the
    /// query's upper bound and `e` is above `qs` (points participate with
    /// their single key).
    pub fn first_overlap(&mut self, query: I) {
        self.reset();
        self.it.low_level().increment_pos();
        if !self.it.valid() {
            return;
        }
        let query_upper = KeyBound::upper(&query);
        let root = self.it.low_level().node();
        let min_pos = lower_pos(root, query.key());
        let max_pos = upper_pos(root, &query_upper);
        self.scan = Some(OverlapScan {
            query,
            query_upper,
            min_node: root,
            min_pos,
            min_reached: false,
            max_node: root,
            max_pos,
        });
        self.find_next_overlap();
    }

    /// Advances to the next stored interval overlapping the query given to
    /// [`first_overlap`](IntervalIter::first_overlap). Without a scan in
    /// progress the iterator is reset instead.
    pub fn next_overlap(&mut self) {
        if !self.it.valid() {
            return;
        }
        if self.scan.is_none() {
            // Overlap stepping mixed into a plain scan.
            self.reset();
            return;
        }
        self.it.low_level().increment_pos();
        self.find_next_overlap();
    }

    fn find_next_overlap(&mut self) {
        let Some(scan) = self.scan.as_mut() else { return };
        let mut ll = self.it.low_level();
        let found = loop {
            if ll.pos() > ll.node().count() as i16 {
                if ll.depth() == 0 {
                    break false;
                }
                ll.ascend();
            } else if !ll.is_leaf() {
                let descend = scan.min_reached
                    || ll
                        .child_aug()
                        .max_bound()
                        .is_some_and(|bound| bound.contains(scan.query.key()));
                if descend {
                    let parent = ll.node();
                    let pos = ll.pos();
                    ll.descend();
                    // Refine a constraint when descending through it.
                    if parent == scan.min_node && pos == scan.min_pos {
                        scan.min_node = ll.node();
                        scan.min_pos = lower_pos(ll.node(), scan.query.key());
                    }
                    if parent == scan.max_node && pos == scan.max_pos {
                        scan.max_node = ll.node();
                        scan.max_pos = upper_pos(ll.node(), &scan.query_upper);
                    }
                    continue;
                }
            }

            if ll.node() == scan.max_node && ll.pos() == scan.max_pos {
                // Past every possible overlap.
                break false;
            }
            if ll.node() == scan.min_node && ll.pos() == scan.min_pos {
                scan.min_reached = true;
            }

            if ll.pos() < ll.node().count() as i16 {
                if scan.min_reached {
                    // Every interval from the soft minimum on ends above
                    // the query start; no comparison needed.
                    break true;
                }
                let node = ll.node();
                let key = node.key(ll.pos() as usize);
                if KeyBound::upper(key).contains(scan.query.key()) {
                    break true;
                }
            }
            ll.increment_pos();
        };
        if !found {
            self.scan = None;
            self.it.reset();
        }
    }
}
