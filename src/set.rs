//! Persistent hash-trie set.
//!
//! The set is the map with unit values; every piece of machinery is
//! shared. Only the set-algebra surface differs, exposing the
//! structural union/intersection/difference traversals directly.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;

use crate::cursor::Cursor;
use crate::hash::{DefaultHashBuilder, HashPath};
use crate::map::TrieMap;
use crate::node::NodeRef;
use crate::tree::algebra::{self, Shape};
use crate::tree::iter;

/// Persistent hash set backed by the same trie as [`TrieMap`].
///
/// Cloning is O(1) and mutations copy only the affected path; see the
/// map's documentation for the sharing and hashing rules.
///
/// # Example
/// ```rust
/// use persistent_hash_trie::TrieSet;
///
/// let evens: TrieSet<u32> = (0..10).filter(|n| n % 2 == 0).collect();
/// let small: TrieSet<u32> = (0..4).collect();
///
/// let both = evens.intersection(&small);
/// assert_eq!(both.len(), 2);
/// assert!(both.contains(&0) && both.contains(&2));
/// ```
pub struct TrieSet<T, S = DefaultHashBuilder> {
    map: TrieMap<T, (), S>,
}

impl<T> TrieSet<T, DefaultHashBuilder> {
    /// Create an empty set using the shared per-process hasher.
    pub fn new() -> Self {
        TrieSet { map: TrieMap::new() }
    }
}

impl<T, S> TrieSet<T, S> {
    /// Create an empty set with the given build hasher.
    pub fn with_hasher(hash_builder: S) -> Self {
        TrieSet {
            map: TrieMap::with_hasher(hash_builder),
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` if the set holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drop every element.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// The set's build hasher.
    pub fn hasher(&self) -> &S {
        self.map.hasher()
    }

    /// `true` if both sets share the same root node, which implies
    /// equal contents.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.map.ptr_eq(&other.map)
    }

    /// Iterate the elements, depth-first in slot order.
    pub fn iter(&self) -> SetIter<'_, T> {
        SetIter(self.map.iter())
    }
}

impl<T: Hash + Eq, S: BuildHasher> TrieSet<T, S> {
    /// `true` if `value` is present.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(value)
    }

    /// Look up the stored element equal to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get_key_value(value).map(|(element, _)| element)
    }

    /// Build a cursor to `value`'s item, if present.
    pub fn cursor_to<Q>(&self, value: &Q) -> Option<Cursor>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.cursor_to(value)
    }

    /// Resolve a cursor created on this same set value.
    pub fn element_at(&self, cursor: &Cursor) -> &T {
        self.map.entry_at(cursor).0
    }

    /// `true` if every element of `self` is in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        if self.ptr_eq(other) {
            return true;
        }
        self.iter().all(|element| other.contains(element))
    }

    /// `true` if every element of `other` is in `self`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// `true` if the sets share no element.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        if self.ptr_eq(other) {
            return false;
        }
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().all(|element| !large.contains(element))
    }
}

impl<T: Hash + Eq + Clone, S: BuildHasher> TrieSet<T, S> {
    /// Insert `value`. Returns `true` if it was newly added.
    pub fn insert(&mut self, value: T) -> bool {
        self.map.insert(value, ()).is_none()
    }

    /// Remove `value`. Returns `true` if it was present. A missing
    /// value is a no-op.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(value).is_some()
    }

    /// Persistent insert: a new set with `value` added.
    pub fn update(&self, value: T) -> Self
    where
        S: Clone,
    {
        TrieSet {
            map: self.map.update(value, ()),
        }
    }

    /// Persistent remove: a new set without `value`.
    pub fn without<Q>(&self, value: &Q) -> Self
    where
        S: Clone,
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        TrieSet {
            map: self.map.without(value),
        }
    }

    /// Elements in `self` or `other`. Subtrees unique to one side are
    /// shared with the result.
    pub fn union(&self, other: &Self) -> Self
    where
        S: Clone,
    {
        TrieSet {
            map: self.map.merge_with(&other.map, |_, _, _| ()),
        }
    }

    /// Elements in both sets, keeping `self`'s stored elements.
    pub fn intersection(&self, other: &Self) -> Self
    where
        S: Clone,
    {
        let hash_builder = self.hasher().clone();
        let root = match (self.map.root_node(), other.map.root_node()) {
            (Some(left), Some(right)) => shape_into_root(
                algebra::intersect_nodes(left, right, 0, &|element: &T| {
                    hash_builder.hash_one(element)
                }),
                &hash_builder,
            ),
            _ => None,
        };
        TrieSet {
            map: TrieMap::from_raw_parts(root, hash_builder),
        }
    }

    /// Elements of `self` not in `other`.
    pub fn difference(&self, other: &Self) -> Self
    where
        S: Clone,
    {
        let hash_builder = self.hasher().clone();
        let root = match (self.map.root_node(), other.map.root_node()) {
            (Some(left), Some(right)) => shape_into_root(
                algebra::diff_nodes(left, right, 0, &|element: &T| {
                    hash_builder.hash_one(element)
                }),
                &hash_builder,
            ),
            (Some(left), None) => Some(left.clone()),
            (None, _) => None,
        };
        TrieSet {
            map: TrieMap::from_raw_parts(root, hash_builder),
        }
    }

    /// Elements in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &Self) -> Self
    where
        S: Clone,
    {
        self.difference(other).union(&other.difference(self))
    }
}

/// Turn a root-level shape into an optional root node. A lone item
/// becomes a legal single-item root.
fn shape_into_root<T: Hash, S: BuildHasher>(
    shape: Shape<T, ()>,
    hash_builder: &S,
) -> Option<NodeRef<T, ()>> {
    match shape {
        Shape::Empty => None,
        Shape::Item(item) => {
            let hash = hash_builder.hash_one(&item.0);
            Some(NodeRef::new_single_item(HashPath::new(hash).bucket(), item))
        }
        Shape::Node(node) => Some(node),
    }
}

impl<T, S: Clone> Clone for TrieSet<T, S> {
    fn clone(&self) -> Self {
        TrieSet {
            map: self.map.clone(),
        }
    }
}

impl<T> Default for TrieSet<T, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, S> fmt::Debug for TrieSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Hash + Eq, S: BuildHasher> PartialEq for TrieSet<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<T: Hash + Eq, S: BuildHasher> Eq for TrieSet<T, S> {}

impl<T: Hash + Eq + Clone, S: BuildHasher> Extend<T> for TrieSet<T, S> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Hash + Eq + Clone> FromIterator<T> for TrieSet<T, DefaultHashBuilder> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Borrowing iterator over a set's elements.
pub struct SetIter<'a, T>(iter::Iter<'a, T, ()>);

impl<'a, T> Clone for SetIter<'a, T> {
    fn clone(&self) -> Self {
        SetIter(self.0.clone())
    }
}

impl<'a, T> Iterator for SetIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.0.next().map(|(element, _)| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for SetIter<'a, T> {}

impl<'a, T> FusedIterator for SetIter<'a, T> {}

impl<'a, T, S> IntoIterator for &'a TrieSet<T, S> {
    type Item = &'a T;
    type IntoIter = SetIter<'a, T>;

    fn into_iter(self) -> SetIter<'a, T> {
        self.iter()
    }
}

/// Owning iterator over a set's elements.
pub struct SetIntoIter<T>(iter::IntoIter<T, ()>);

impl<T: Clone> Iterator for SetIntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.next().map(|(element, _)| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T: Clone> ExactSizeIterator for SetIntoIter<T> {}

impl<T: Clone> FusedIterator for SetIntoIter<T> {}

impl<T: Clone, S> IntoIterator for TrieSet<T, S> {
    type Item = T;
    type IntoIter = SetIntoIter<T>;

    fn into_iter(self) -> SetIntoIter<T> {
        SetIntoIter(self.map.into_iter())
    }
}
