//! Set algebra over node pairs: union, intersection and difference by
//! recursive traversal at matching levels, classifying each bucket by
//! what the two sides hold there.
//!
//! Results preserve sharing: entries present on only one side are
//! adopted by reference, never rebuilt, and identical inputs short-
//! circuit on pointer equality. Collision nodes are folded item by
//! item; they are rare and tiny by construction.

use smallvec::SmallVec;

use crate::constants::{BUCKET_BITS, BUCKET_COUNT};
use crate::hash::{HashBits, HashPath};
use crate::node::NodeRef;
use crate::tree::insert::{expand_collision, join_subtrees, spawn_chain};
use crate::tree::lookup::find;
use crate::tree::remove::remove;

/// Result of an operation that can shrink a subtree: the canonical
/// replacement for the node pair.
pub enum Shape<K, V> {
    /// No surviving items.
    Empty,
    /// Exactly one surviving item; the parent inlines it.
    Item((K, V)),
    /// Two or more surviving items.
    Node(NodeRef<K, V>),
}

enum Part<K, V> {
    Item((K, V)),
    Child(NodeRef<K, V>),
}

type Parts<K, V> = SmallVec<[(u8, Part<K, V>); BUCKET_COUNT]>;

#[derive(Clone, Copy)]
enum Entry {
    Item(usize),
    Child(usize),
    Absent,
}

fn entry_at<K, V>(node: &NodeRef<K, V>, bucket: u8) -> Entry {
    let header = node.header();
    if header.item_map().contains(bucket) {
        Entry::Item(header.item_map().rank(bucket))
    } else if header.child_map().contains(bucket) {
        Entry::Child(header.child_map().rank(bucket))
    } else {
        Entry::Absent
    }
}

/// Union of two subtrees rooted at the same position.
///
/// `combine` resolves duplicate keys and is invoked exactly once per
/// duplicate, with the left value first.
pub fn union_nodes<K, V, H, F>(
    left: &NodeRef<K, V>,
    right: &NodeRef<K, V>,
    shift: u32,
    hash_of: &H,
    combine: &mut F,
) -> NodeRef<K, V>
where
    K: Eq + Clone,
    V: Clone,
    H: Fn(&K) -> HashBits,
    F: FnMut(&K, &V, &V) -> V,
{
    if NodeRef::ptr_eq(left, right) {
        return left.clone();
    }

    match (left.is_collision(), right.is_collision()) {
        (true, true) => union_collisions(left, right, shift, combine),
        (true, false) => {
            // Fold the colliding items (left side) into a copy of the
            // normal side.
            let mut result = right.clone();
            let hash = left.collision_hash();
            for slot in 0..left.item_count() {
                let item = left.item(slot).clone();
                merge_item_into(&mut result, shift, item, hash, true, hash_of, combine);
            }
            result
        }
        (false, true) => {
            let mut result = left.clone();
            let hash = right.collision_hash();
            for slot in 0..right.item_count() {
                let item = right.item(slot).clone();
                merge_item_into(&mut result, shift, item, hash, false, hash_of, combine);
            }
            result
        }
        (false, false) => union_normals(left, right, shift, hash_of, combine),
    }
}

fn union_collisions<K, V, F>(
    left: &NodeRef<K, V>,
    right: &NodeRef<K, V>,
    shift: u32,
    combine: &mut F,
) -> NodeRef<K, V>
where
    K: Eq + Clone,
    V: Clone,
    F: FnMut(&K, &V, &V) -> V,
{
    if left.collision_hash() != right.collision_hash() {
        return join_subtrees(
            HashPath::at(left.collision_hash(), shift),
            left.clone(),
            left.collision_hash(),
            right.clone(),
            right.collision_hash(),
        );
    }

    let mut result = left.clone();
    result.make_unique();
    for slot in 0..right.item_count() {
        let (key, value) = right.item(slot);
        match (0..result.item_count()).find(|&s| result.item(s).0 == *key) {
            Some(existing) => {
                let merged = combine(key, &result.item(existing).1, value);
                result.item_mut(existing).1 = merged;
            }
            None => result.append_collision_item((key.clone(), value.clone())),
        }
    }
    result
}

fn union_normals<K, V, H, F>(
    left: &NodeRef<K, V>,
    right: &NodeRef<K, V>,
    shift: u32,
    hash_of: &H,
    combine: &mut F,
) -> NodeRef<K, V>
where
    K: Eq + Clone,
    V: Clone,
    H: Fn(&K) -> HashBits,
    F: FnMut(&K, &V, &V) -> V,
{
    let occupied = left
        .header()
        .item_map()
        .union(left.header().child_map())
        .union(right.header().item_map())
        .union(right.header().child_map());

    let mut parts: Parts<K, V> = SmallVec::new();
    for bucket in occupied.iter() {
        let part = match (entry_at(left, bucket), entry_at(right, bucket)) {
            (Entry::Item(l), Entry::Absent) => Part::Item(left.item(l).clone()),
            (Entry::Absent, Entry::Item(r)) => Part::Item(right.item(r).clone()),
            (Entry::Child(l), Entry::Absent) => Part::Child(left.child(l).clone()),
            (Entry::Absent, Entry::Child(r)) => Part::Child(right.child(r).clone()),
            (Entry::Item(l), Entry::Item(r)) => {
                let (lk, lv) = left.item(l);
                let (rk, rv) = right.item(r);
                if lk == rk {
                    Part::Item((lk.clone(), combine(lk, lv, rv)))
                } else {
                    Part::Child(spawn_chain(
                        HashPath::at(hash_of(lk), shift).descend(),
                        (lk.clone(), lv.clone()),
                        hash_of(lk),
                        (rk.clone(), rv.clone()),
                        hash_of(rk),
                    ))
                }
            }
            (Entry::Item(l), Entry::Child(r)) => {
                let mut child = right.child(r).clone();
                let item = left.item(l).clone();
                let hash = hash_of(&item.0);
                merge_item_into(
                    &mut child,
                    shift + BUCKET_BITS,
                    item,
                    hash,
                    true,
                    hash_of,
                    combine,
                );
                Part::Child(child)
            }
            (Entry::Child(l), Entry::Item(r)) => {
                let mut child = left.child(l).clone();
                let item = right.item(r).clone();
                let hash = hash_of(&item.0);
                merge_item_into(
                    &mut child,
                    shift + BUCKET_BITS,
                    item,
                    hash,
                    false,
                    hash_of,
                    combine,
                );
                Part::Child(child)
            }
            (Entry::Child(l), Entry::Child(r)) => Part::Child(union_nodes(
                left.child(l),
                right.child(r),
                shift + BUCKET_BITS,
                hash_of,
                combine,
            )),
            (Entry::Absent, Entry::Absent) => unreachable!("bucket came from the occupancy maps"),
        };
        parts.push((bucket, part));
    }

    // A union never shrinks below its larger input, so a lone item can
    // only appear at the root, where it is a legal node. A lone
    // collision child is hoisted rather than wrapped.
    if parts.len() == 1 {
        if matches!(&parts[0].1, Part::Child(child) if child.is_collision()) {
            match parts.pop() {
                Some((_, Part::Child(child))) => return child,
                _ => unreachable!(),
            }
        }
    }
    build_node(parts)
}

/// Insert one item into a subtree, resolving a duplicate key with
/// `combine`. `item_is_left` states which side of the combine the
/// incoming item takes.
fn merge_item_into<K, V, H, F>(
    node: &mut NodeRef<K, V>,
    shift: u32,
    item: (K, V),
    item_hash: HashBits,
    item_is_left: bool,
    hash_of: &H,
    combine: &mut F,
) -> bool
where
    K: Eq + Clone,
    V: Clone,
    H: Fn(&K) -> HashBits,
    F: FnMut(&K, &V, &V) -> V,
{
    let path = HashPath::at(item_hash, shift);
    node.make_unique();

    if node.is_collision() {
        let collision_hash = node.collision_hash();
        if collision_hash == item_hash {
            if let Some(slot) = (0..node.item_count()).find(|&s| node.item(s).0 == item.0) {
                let merged = if item_is_left {
                    combine(&item.0, &item.1, &node.item(slot).1)
                } else {
                    combine(&item.0, &node.item(slot).1, &item.1)
                };
                node.item_mut(slot).1 = merged;
                return false;
            }
            node.append_collision_item(item);
            return true;
        }
        let collision = node.clone();
        *node = expand_collision(collision, path, collision_hash, item);
        return true;
    }

    let bucket = path.bucket();
    let item_map = node.header().item_map();
    let child_map = node.header().child_map();

    if item_map.contains(bucket) {
        let slot = item_map.rank(bucket);
        if node.item(slot).0 == item.0 {
            let merged = if item_is_left {
                combine(&item.0, &item.1, &node.item(slot).1)
            } else {
                combine(&item.0, &node.item(slot).1, &item.1)
            };
            node.item_mut(slot).1 = merged;
            return false;
        }
        let resident_hash = hash_of(&node.item(slot).0);
        node.replace_item_with_child(bucket, |resident| {
            spawn_chain(path.descend(), resident, resident_hash, item, item_hash)
        });
        return true;
    }

    if child_map.contains(bucket) {
        let slot = child_map.rank(bucket);
        let inserted = merge_item_into(
            node.child_mut(slot),
            shift + BUCKET_BITS,
            item,
            item_hash,
            item_is_left,
            hash_of,
            combine,
        );
        if inserted {
            node.header_mut().add_subtree_count(1);
        }
        return inserted;
    }

    node.insert_item(bucket, item_map.rank(bucket), item);
    true
}

/// Intersection of two subtrees rooted at the same position, keeping
/// the left side's stored values.
pub fn intersect_nodes<K, V, H>(
    left: &NodeRef<K, V>,
    right: &NodeRef<K, V>,
    shift: u32,
    hash_of: &H,
) -> Shape<K, V>
where
    K: Eq + Clone,
    V: Clone,
    H: Fn(&K) -> HashBits,
{
    if NodeRef::ptr_eq(left, right) {
        return Shape::Node(left.clone());
    }

    match (left.is_collision(), right.is_collision()) {
        (true, true) => {
            if left.collision_hash() != right.collision_hash() {
                return Shape::Empty;
            }
            let survivors: Vec<(K, V)> = (0..left.item_count())
                .map(|slot| left.item(slot))
                .filter(|item| {
                    (0..right.item_count()).any(|s| right.item(s).0 == item.0)
                })
                .cloned()
                .collect();
            collision_shape(left.collision_hash(), survivors)
        }
        (true, false) => {
            let hash = left.collision_hash();
            let survivors: Vec<(K, V)> = (0..left.item_count())
                .map(|slot| left.item(slot))
                .filter(|item| find(right, HashPath::at(hash, shift), &item.0).is_some())
                .cloned()
                .collect();
            collision_shape(hash, survivors)
        }
        (false, true) => {
            let hash = right.collision_hash();
            let survivors: Vec<(K, V)> = (0..right.item_count())
                .filter_map(|slot| {
                    find(left, HashPath::at(hash, shift), &right.item(slot).0).cloned()
                })
                .collect();
            collision_shape(hash, survivors)
        }
        (false, false) => intersect_normals(left, right, shift, hash_of),
    }
}

fn intersect_normals<K, V, H>(
    left: &NodeRef<K, V>,
    right: &NodeRef<K, V>,
    shift: u32,
    hash_of: &H,
) -> Shape<K, V>
where
    K: Eq + Clone,
    V: Clone,
    H: Fn(&K) -> HashBits,
{
    // Only buckets occupied on both sides can contribute.
    let occupied = left
        .header()
        .item_map()
        .union(left.header().child_map())
        .intersection(right.header().item_map().union(right.header().child_map()));

    let mut parts: Parts<K, V> = SmallVec::new();
    for bucket in occupied.iter() {
        match (entry_at(left, bucket), entry_at(right, bucket)) {
            (Entry::Item(l), Entry::Item(r)) => {
                let litem = left.item(l);
                if litem.0 == right.item(r).0 {
                    parts.push((bucket, Part::Item(litem.clone())));
                }
            }
            (Entry::Item(l), Entry::Child(r)) => {
                let litem = left.item(l);
                let hash = hash_of(&litem.0);
                let path = HashPath::at(hash, shift + BUCKET_BITS);
                if find(right.child(r), path, &litem.0).is_some() {
                    parts.push((bucket, Part::Item(litem.clone())));
                }
            }
            (Entry::Child(l), Entry::Item(r)) => {
                let rkey = &right.item(r).0;
                let path = HashPath::at(hash_of(rkey), shift + BUCKET_BITS);
                if let Some(item) = find(left.child(l), path, rkey) {
                    parts.push((bucket, Part::Item(item.clone())));
                }
            }
            (Entry::Child(l), Entry::Child(r)) => {
                match intersect_nodes(left.child(l), right.child(r), shift + BUCKET_BITS, hash_of) {
                    Shape::Empty => {}
                    Shape::Item(item) => parts.push((bucket, Part::Item(item))),
                    Shape::Node(node) => parts.push((bucket, Part::Child(node))),
                }
            }
            _ => {}
        }
    }
    assemble(parts)
}

/// Difference `left − right` of two subtrees rooted at the same
/// position.
pub fn diff_nodes<K, V, H>(
    left: &NodeRef<K, V>,
    right: &NodeRef<K, V>,
    shift: u32,
    hash_of: &H,
) -> Shape<K, V>
where
    K: Eq + Clone,
    V: Clone,
    H: Fn(&K) -> HashBits,
{
    if NodeRef::ptr_eq(left, right) {
        return Shape::Empty;
    }

    match (left.is_collision(), right.is_collision()) {
        (true, true) => {
            if left.collision_hash() != right.collision_hash() {
                return Shape::Node(left.clone());
            }
            let survivors: Vec<(K, V)> = (0..left.item_count())
                .map(|slot| left.item(slot))
                .filter(|item| {
                    !(0..right.item_count()).any(|s| right.item(s).0 == item.0)
                })
                .cloned()
                .collect();
            collision_shape(left.collision_hash(), survivors)
        }
        (true, false) => {
            let hash = left.collision_hash();
            let survivors: Vec<(K, V)> = (0..left.item_count())
                .map(|slot| left.item(slot))
                .filter(|item| find(right, HashPath::at(hash, shift), &item.0).is_none())
                .cloned()
                .collect();
            collision_shape(hash, survivors)
        }
        (false, true) => {
            let hash = right.collision_hash();
            let hits: Vec<&K> = (0..right.item_count())
                .map(|slot| &right.item(slot).0)
                .filter(|key| find(left, HashPath::at(hash, shift), *key).is_some())
                .collect();
            if hits.is_empty() {
                return Shape::Node(left.clone());
            }
            let mut node = left.clone();
            for key in hits {
                remove(&mut node, HashPath::at(hash, shift), key);
            }
            node_shape(node)
        }
        (false, false) => diff_normals(left, right, shift, hash_of),
    }
}

fn diff_normals<K, V, H>(
    left: &NodeRef<K, V>,
    right: &NodeRef<K, V>,
    shift: u32,
    hash_of: &H,
) -> Shape<K, V>
where
    K: Eq + Clone,
    V: Clone,
    H: Fn(&K) -> HashBits,
{
    let occupied = left.header().item_map().union(left.header().child_map());
    let right_occupied = right.header().item_map().union(right.header().child_map());

    // Nothing of the right side overlaps: the whole left node survives
    // by reference.
    if occupied.difference(right_occupied) == occupied {
        return Shape::Node(left.clone());
    }

    let mut parts: Parts<K, V> = SmallVec::new();
    for bucket in occupied.iter() {
        match (entry_at(left, bucket), entry_at(right, bucket)) {
            (Entry::Item(l), Entry::Absent) => {
                parts.push((bucket, Part::Item(left.item(l).clone())));
            }
            (Entry::Child(l), Entry::Absent) => {
                parts.push((bucket, Part::Child(left.child(l).clone())));
            }
            (Entry::Item(l), Entry::Item(r)) => {
                if left.item(l).0 != right.item(r).0 {
                    parts.push((bucket, Part::Item(left.item(l).clone())));
                }
            }
            (Entry::Item(l), Entry::Child(r)) => {
                let litem = left.item(l);
                let path = HashPath::at(hash_of(&litem.0), shift + BUCKET_BITS);
                if find(right.child(r), path, &litem.0).is_none() {
                    parts.push((bucket, Part::Item(litem.clone())));
                }
            }
            (Entry::Child(l), Entry::Item(r)) => {
                let rkey = &right.item(r).0;
                let path = HashPath::at(hash_of(rkey), shift + BUCKET_BITS);
                if find(left.child(l), path, rkey).is_none() {
                    parts.push((bucket, Part::Child(left.child(l).clone())));
                } else {
                    let mut child = left.child(l).clone();
                    remove(&mut child, path, rkey);
                    match node_shape(child) {
                        Shape::Empty => {}
                        Shape::Item(item) => parts.push((bucket, Part::Item(item))),
                        Shape::Node(node) => parts.push((bucket, Part::Child(node))),
                    }
                }
            }
            (Entry::Child(l), Entry::Child(r)) => {
                match diff_nodes(left.child(l), right.child(r), shift + BUCKET_BITS, hash_of) {
                    Shape::Empty => {}
                    Shape::Item(item) => parts.push((bucket, Part::Item(item))),
                    Shape::Node(node) => parts.push((bucket, Part::Child(node))),
                }
            }
            (Entry::Absent, _) => unreachable!("bucket came from the left occupancy maps"),
        }
    }
    assemble(parts)
}

/// Canonical shape for a list of items sharing one full hash.
fn collision_shape<K, V>(hash: HashBits, mut items: Vec<(K, V)>) -> Shape<K, V> {
    match items.len() {
        0 => Shape::Empty,
        1 => Shape::Item(items.pop().expect("one item")),
        _ => {
            let mut node = NodeRef::new_collision(hash, items.len());
            for item in items {
                node.append_collision_item(item);
            }
            Shape::Node(node)
        }
    }
}

/// Canonical shape for a possibly-degenerate node left behind by
/// removals. The node must be uniquely owned if degenerate.
fn node_shape<K: Clone, V: Clone>(mut node: NodeRef<K, V>) -> Shape<K, V> {
    if node.is_collision() {
        if node.item_count() == 1 {
            return Shape::Item(node.remove_collision_item(0));
        }
        return Shape::Node(node);
    }
    if node.item_count() == 0 && node.child_count() == 0 {
        return Shape::Empty;
    }
    if node.header().has_singleton_item() {
        let bucket = node.header().item_map().first().expect("singleton item");
        return Shape::Item(node.remove_item(bucket, 0));
    }
    if node.is_atrophied() {
        let bucket = node.header().child_map().first().expect("singleton child");
        return Shape::Node(node.remove_child(bucket, 0));
    }
    Shape::Node(node)
}

/// Canonical node for assembled parts, collapsing the degenerate
/// outcomes: no parts, a single item, or a single collision child.
fn assemble<K, V>(mut parts: Parts<K, V>) -> Shape<K, V> {
    if parts.is_empty() {
        return Shape::Empty;
    }
    if parts.len() == 1 {
        match parts.pop().expect("one part") {
            (_, Part::Item(item)) => return Shape::Item(item),
            (bucket, Part::Child(child)) => {
                if child.is_collision() {
                    return Shape::Node(child);
                }
                return Shape::Node(NodeRef::new_single_child(bucket, child));
            }
        }
    }
    Shape::Node(build_node(parts))
}

/// Materialize a node from bucket-ordered parts.
fn build_node<K, V>(parts: Parts<K, V>) -> NodeRef<K, V> {
    let mut items = 0;
    let mut children = 0;
    for (_, part) in &parts {
        match part {
            Part::Item(_) => items += 1,
            Part::Child(_) => children += 1,
        }
    }

    let mut node = NodeRef::new_normal(items, children);
    let mut item_slot = 0;
    let mut child_slot = 0;
    for (bucket, part) in parts {
        match part {
            Part::Item(item) => {
                node.insert_item(bucket, item_slot, item);
                item_slot += 1;
            }
            Part::Child(child) => {
                node.insert_child(bucket, child_slot, child);
                child_slot += 1;
            }
        }
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::insert::{collapse_atrophied_root, insert};

    fn hash_identity(key: &u64) -> HashBits {
        *key
    }

    fn tree_of(keys: &[u64]) -> NodeRef<u64, u64> {
        let mut root = NodeRef::new_single_item(
            HashPath::new(keys[0]).bucket(),
            (keys[0], keys[0] * 10),
        );
        for &key in &keys[1..] {
            insert(&mut root, HashPath::new(key), key, key * 10, &hash_identity);
        }
        collapse_atrophied_root(&mut root);
        root
    }

    fn keys_of(node: &NodeRef<u64, u64>) -> Vec<u64> {
        let mut keys = Vec::new();
        collect(node, &mut keys);
        keys.sort_unstable();
        return keys;

        fn collect(node: &NodeRef<u64, u64>, out: &mut Vec<u64>) {
            for slot in 0..node.item_count() {
                out.push(node.item(slot).0);
            }
            for slot in 0..node.child_count() {
                collect(node.child(slot), out);
            }
        }
    }

    fn keep_left(_: &u64, left: &u64, _: &u64) -> u64 {
        *left
    }

    #[test]
    fn test_union_disjoint_shares_children() {
        let left = tree_of(&[1, 33, 2]);
        let right = tree_of(&[5, 6]);

        let merged = union_nodes(&left, &right, 0, &hash_identity, &mut keep_left);
        assert_eq!(keys_of(&merged), vec![1, 2, 5, 6, 33]);
        assert_eq!(merged.subtree_count(), 5);

        // The chain under bucket 1 was adopted by reference.
        let slot = merged.header().child_map().rank(1);
        let left_slot = left.header().child_map().rank(1);
        assert!(NodeRef::ptr_eq(merged.child(slot), left.child(left_slot)));
    }

    #[test]
    fn test_union_identity_fast_path() {
        let tree = tree_of(&[1, 2, 3]);
        let merged = union_nodes(&tree, &tree, 0, &hash_identity, &mut |_, _, _| {
            unreachable!("identical trees need no combine")
        });
        assert!(NodeRef::ptr_eq(&merged, &tree));
    }

    #[test]
    fn test_union_combines_duplicates_once() {
        let left = tree_of(&[1, 2]);
        let right = tree_of(&[2, 3]);

        let mut calls = 0;
        let mut combine = |_: &u64, left: &u64, right: &u64| {
            calls += 1;
            left + right
        };
        let merged = union_nodes(&left, &right, 0, &hash_identity, &mut combine);

        assert_eq!(calls, 1);
        assert_eq!(keys_of(&merged), vec![1, 2, 3]);
        // 2 maps to 20 (left) + 20 (right).
        assert_eq!(
            find(&merged, HashPath::new(2), &2),
            Some(&(2, 40))
        );
    }

    #[test]
    fn test_union_of_collision_trees() {
        let constant = |_: &u64| 0x42u64;
        let mut left = NodeRef::new_collision_pair(0x42, (1u64, 10u64), (2, 20));
        let right = NodeRef::new_collision_pair(0x42, (2u64, 99u64), (3, 30));

        left = union_nodes(&left, &right, 0, &constant, &mut keep_left);
        assert!(left.is_collision());
        assert_eq!(left.item_count(), 3);
        // keep_left resolved the duplicate.
        assert_eq!(find(&left, HashPath::new(0x42), &2), Some(&(2, 20)));
    }

    #[test]
    fn test_union_of_distinct_collision_hashes() {
        let left = NodeRef::new_collision_pair(0x42, (1u64, 1u64), (2, 2));
        let right = NodeRef::new_collision_pair(0x43, (3u64, 3u64), (4, 4));

        let merged = union_nodes(&left, &right, 0, &|k: &u64| if *k <= 2 { 0x42 } else { 0x43 }, &mut keep_left);
        assert_eq!(keys_of(&merged), vec![1, 2, 3, 4]);
        assert_eq!(merged.subtree_count(), 4);
    }

    #[test]
    fn test_intersection_keeps_left_values() {
        let left = tree_of(&[1, 2, 33]);
        let mut right = tree_of(&[2, 5]);
        insert(&mut right, HashPath::new(2), 2, 999, &hash_identity);

        match intersect_nodes(&left, &right, 0, &hash_identity) {
            Shape::Item(item) => assert_eq!(item, (2, 20)),
            _ => panic!("single common key must collapse to an item"),
        }
    }

    #[test]
    fn test_intersection_identity_fast_path() {
        let tree = tree_of(&[1, 2, 33]);
        match intersect_nodes(&tree, &tree, 0, &hash_identity) {
            Shape::Node(node) => assert!(NodeRef::ptr_eq(&node, &tree)),
            _ => panic!("self-intersection returns the tree"),
        }
    }

    #[test]
    fn test_intersection_descends_chains() {
        let left = tree_of(&[1, 33, 65]);
        let right = tree_of(&[33, 65, 5]);

        match intersect_nodes(&left, &right, 0, &hash_identity) {
            Shape::Node(node) => {
                assert_eq!(keys_of(&node), vec![33, 65]);
                assert_eq!(node.subtree_count(), 2);
            }
            _ => panic!("two common keys form a node"),
        }
    }

    #[test]
    fn test_difference_removes_right_keys() {
        let left = tree_of(&[1, 2, 33, 5]);
        let right = tree_of(&[33, 5, 7]);

        match diff_nodes(&left, &right, 0, &hash_identity) {
            Shape::Node(node) => {
                assert_eq!(keys_of(&node), vec![1, 2]);
                assert_eq!(node.subtree_count(), 2);
            }
            _ => panic!("two survivors form a node"),
        }
    }

    #[test]
    fn test_difference_of_identical_trees_is_empty() {
        let tree = tree_of(&[1, 2, 3]);
        assert!(matches!(diff_nodes(&tree, &tree, 0, &hash_identity), Shape::Empty));
    }

    #[test]
    fn test_difference_shares_untouched_children() {
        let left = tree_of(&[1, 33, 5]);
        let right = tree_of(&[5]);

        match diff_nodes(&left, &right, 0, &hash_identity) {
            Shape::Node(node) => {
                assert_eq!(keys_of(&node), vec![1, 33]);
                let slot = node.header().child_map().rank(1);
                let left_slot = left.header().child_map().rank(1);
                assert!(NodeRef::ptr_eq(node.child(slot), left.child(left_slot)));
            }
            _ => panic!("two survivors form a node"),
        }
    }
}
