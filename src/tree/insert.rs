//! Insertion: the uniqueness-preserving walk, spawn chains and
//! collision expansion.

use std::mem;

use crate::hash::{HashBits, HashPath};
use crate::node::NodeRef;

/// Insert `key`/`value` along `path`, making every touched node
/// uniquely owned on the way down. Returns the previous value when the
/// key was already present (last write wins).
///
/// `hash_of` recomputes the full hash of a resident key when a bucket
/// conflict forces a spawn; items do not store their hashes.
pub fn insert<K, V, F>(
    node: &mut NodeRef<K, V>,
    path: HashPath,
    key: K,
    value: V,
    hash_of: &F,
) -> Option<V>
where
    K: Eq + Clone,
    V: Clone,
    F: Fn(&K) -> HashBits,
{
    node.make_unique();

    if node.is_collision() {
        let collision_hash = node.collision_hash();
        if collision_hash == path.hash() {
            for slot in 0..node.item_count() {
                if node.item(slot).0 == key {
                    return Some(mem::replace(&mut node.item_mut(slot).1, value));
                }
            }
            node.append_collision_item((key, value));
            return None;
        }
        // The new hash parts ways with the colliding one at this level
        // or below: wrap the collision node under normal nodes that
        // tell the two apart.
        let collision = node.clone();
        *node = expand_collision(collision, path, collision_hash, (key, value));
        return None;
    }

    let bucket = path.bucket();
    let item_map = node.header().item_map();
    let child_map = node.header().child_map();

    if item_map.contains(bucket) {
        let slot = item_map.rank(bucket);
        if node.item(slot).0 == key {
            return Some(mem::replace(&mut node.item_mut(slot).1, value));
        }
        // Two distinct keys at one bucket: spawn a child subtree.
        let resident_hash = hash_of(&node.item(slot).0);
        let new_hash = path.hash();
        node.replace_item_with_child(bucket, |resident| {
            spawn_chain(
                path.descend(),
                resident,
                resident_hash,
                (key, value),
                new_hash,
            )
        });
        return None;
    }

    if child_map.contains(bucket) {
        let slot = child_map.rank(bucket);
        let replaced = insert(node.child_mut(slot), path.descend(), key, value, hash_of);
        if replaced.is_none() {
            node.header_mut().add_subtree_count(1);
        }
        return replaced;
    }

    node.insert_item(bucket, item_map.rank(bucket), (key, value));
    None
}

/// Build the subtree distinguishing two items whose buckets collide at
/// the parent level: a chain of single-child nodes for as long as the
/// hashes agree, a two-item node at the first disagreement, or a
/// collision node when they never disagree.
///
/// The newer item lands last in the collision case.
pub(crate) fn spawn_chain<K, V>(
    path: HashPath,
    resident: (K, V),
    resident_hash: HashBits,
    new: (K, V),
    new_hash: HashBits,
) -> NodeRef<K, V> {
    if resident_hash == new_hash {
        return NodeRef::new_collision_pair(new_hash, resident, new);
    }
    debug_assert!(!path.is_bottom());
    let resident_bucket = path.bucket_of(resident_hash);
    let new_bucket = path.bucket_of(new_hash);
    if resident_bucket == new_bucket {
        NodeRef::new_single_child(
            new_bucket,
            spawn_chain(path.descend(), resident, resident_hash, new, new_hash),
        )
    } else {
        NodeRef::new_two_items(resident_bucket, resident, new_bucket, new)
    }
}

/// Wrap a collision node under fresh normal nodes until some level
/// separates its shared hash from the new item's hash. The path
/// carries the new item's hash.
pub(crate) fn expand_collision<K, V>(
    collision: NodeRef<K, V>,
    path: HashPath,
    collision_hash: HashBits,
    new: (K, V),
) -> NodeRef<K, V> {
    debug_assert_ne!(collision_hash, path.hash());
    debug_assert!(!path.is_bottom());
    let collision_bucket = path.bucket_of(collision_hash);
    let new_bucket = path.bucket();
    if collision_bucket == new_bucket {
        NodeRef::new_single_child(
            new_bucket,
            expand_collision(collision, path.descend(), collision_hash, new),
        )
    } else {
        NodeRef::new_item_and_child(new_bucket, new, collision_bucket, collision)
    }
}

/// Wrap two subtrees whose routing hashes differ under distinguishing
/// normal nodes. Each hash must route every key in its subtree, which
/// holds for collision nodes.
pub(crate) fn join_subtrees<K, V>(
    path: HashPath,
    a: NodeRef<K, V>,
    a_hash: HashBits,
    b: NodeRef<K, V>,
    b_hash: HashBits,
) -> NodeRef<K, V> {
    debug_assert_ne!(a_hash, b_hash);
    debug_assert!(!path.is_bottom());
    let a_bucket = path.bucket_of(a_hash);
    let b_bucket = path.bucket_of(b_hash);
    if a_bucket == b_bucket {
        NodeRef::new_single_child(
            a_bucket,
            join_subtrees(path.descend(), a, a_hash, b, b_hash),
        )
    } else {
        NodeRef::new_two_children(a_bucket, a, b_bucket, b)
    }
}

/// Promote an atrophied root's single collision child to be the root.
///
/// Insertion can atrophy the root in exactly one way: its lone item
/// spawns into a collision subtree. Everywhere else a spawn leaves at
/// least one sibling entry behind.
pub fn collapse_atrophied_root<K, V>(root: &mut NodeRef<K, V>) {
    if root.is_atrophied() {
        let bucket = root.header().child_map().first().expect("atrophied root has a child");
        let child = root.remove_child(bucket, 0);
        *root = child;
    }
}
