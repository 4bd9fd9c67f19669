//! # persistent-hash-trie
//!
//! Persistent (structurally shared) hash map and set backed by a hash
//! array mapped trie with bitmap-compressed nodes.
//!
//! ## Features
//! - O(1) snapshots: `clone()` shares the whole tree
//! - Copy-on-write mutations touch at most one node per level
//! - Compact nodes: one allocation per node, 32-way branching
//! - Structural set algebra (union/intersection/difference) that
//!   reuses shared subtrees instead of rebuilding them
//! - Full-hash collisions degrade gracefully into collision nodes
//!
//! ## Architecture
//! - 32-way branching, 5 hash bits per level (13 levels per 64-bit hash)
//! - Two bitmaps per node: item buckets and child buckets; popcount
//!   rank translates buckets into dense storage slots
//! - Children grow forward and items grow backward inside a single
//!   variable-sized allocation
//! - Atomic per-node reference counts let independent snapshots be
//!   used from different threads
//!
//! ## Example
//! ```rust
//! use persistent_hash_trie::TrieMap;
//!
//! let mut prices = TrieMap::new();
//! prices.insert("apple", 3);
//! prices.insert("pear", 2);
//!
//! let saved = prices.clone();
//! prices.insert("plum", 4);
//!
//! assert_eq!(prices.len(), 3);
//! assert_eq!(saved.len(), 2);
//! ```

mod bitmap;
mod constants;
mod cursor;
mod hash;
mod map;
mod node;
mod set;
mod tree;

#[cfg(test)]
mod proptests;

pub use cursor::Cursor;
pub use hash::DefaultHashBuilder;
pub use map::TrieMap;
pub use set::{SetIntoIter, SetIter, TrieSet};
pub use tree::iter::{IntoIter, Iter, Keys, Values};
