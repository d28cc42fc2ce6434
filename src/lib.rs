//! Copy-on-write augmented B-tree collections for Rust.
//!
//! This crate provides ordered map and set collections backed by a B-tree
//! whose nodes are shared between logical clones and copied only when
//! mutated. [`Map::clone`] is O(1): it bumps a reference count on the root
//! node, and every subsequent mutation forks exactly the path it touches,
//! leaving unrelated subtrees shared. Each clone is an independent snapshot
//! and an independent writer target.
//!
//! Nodes additionally carry a user-defined *augmentation* — a per-subtree
//! summary that the tree maintains incrementally through splits, merges
//! and rotations. Two augmented specializations ship with the crate:
//!
//! - [`OrderStatMap`] / [`OrderStatSet`] — subtree cardinality, giving
//!   O(log n) rank and select queries.
//! - [`IntervalMap`] — maximum upper endpoint per subtree, giving overlap
//!   scans that visit only the subtrees that can intersect a query.
//!
//! Custom augmentations implement the [`Augmentation`] trait and plug into
//! the generic [`AugMap`]; augmentation-specialized searches are built on
//! the [`LowLevel`] iterator interface.
//!
//! # Example
//!
//! ```
//! use augbtree::Map;
//!
//! let mut map = Map::new();
//! map.upsert("a", 1);
//! map.upsert("b", 2);
//!
//! // O(1) snapshot; mutations to either side leave the other untouched.
//! let snapshot = map.clone();
//! map.upsert("c", 3);
//!
//! assert_eq!(map.len(), 3);
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(snapshot.get(&"c"), None);
//! ```
//!
//! # Concurrency
//!
//! A single map handle accepts one writer at a time; shared reads of one
//! handle are safe when no writer is active, which the borrow checker
//! enforces. Distinct clones may be mutated from distinct threads
//! concurrently — shared nodes are reference-counted atomically and copied
//! on first write.

#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]

mod aug;
mod iter;
mod raw;
mod tree;

pub mod interval;
pub mod map;
pub mod orderstat;

pub use aug::{Augmentation, NodeRef, NodeView, TreeConfig, UpdateMeta};
pub use interval::{Interval, IntervalAug, IntervalIter, IntervalMap, KeyBound};
pub use iter::{Iter, LowLevel};
pub use map::{Map, Set};
pub use orderstat::{OrderStatAug, OrderStatMap, OrderStatSet};
pub use tree::AugMap;
