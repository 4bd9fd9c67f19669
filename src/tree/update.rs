//! In-place value access: `get_mut` and the defaulted two-phase
//! update behind `get_or_insert_with`.
//!
//! Both walks hash once and make every touched node unique, then hand
//! back a raw pointer to the value slot. The pointer stays valid until
//! the next structural change of the tree, which the facade's `&mut`
//! borrow rules out for as long as the returned reference lives.

use std::borrow::Borrow;

use crate::hash::{HashBits, HashPath};
use crate::node::NodeRef;
use crate::tree::insert::{expand_collision, spawn_chain};

/// Walk to `key` and return a pointer to its value slot, cloning
/// shared nodes along the way so the caller may write through it.
pub fn find_mut<K, V, Q>(node: &mut NodeRef<K, V>, path: HashPath, key: &Q) -> Option<*mut V>
where
    K: Borrow<Q> + Clone,
    V: Clone,
    Q: Eq + ?Sized,
{
    node.make_unique();

    if node.is_collision() {
        if node.collision_hash() != path.hash() {
            return None;
        }
        let slot = (0..node.item_count()).find(|&slot| key == node.item(slot).0.borrow())?;
        return Some(&mut node.item_mut(slot).1 as *mut V);
    }

    let bucket = path.bucket();
    let item_map = node.header().item_map();
    let child_map = node.header().child_map();

    if item_map.contains(bucket) {
        let slot = item_map.rank(bucket);
        if key == node.item(slot).0.borrow() {
            return Some(&mut node.item_mut(slot).1 as *mut V);
        }
        return None;
    }
    if child_map.contains(bucket) {
        let slot = child_map.rank(bucket);
        return find_mut(node.child_mut(slot), path.descend(), key);
    }
    None
}

/// Two-phase defaulted update in one walk: locate (or create) the slot
/// for `key`, inserting `default()` only when the key is absent, and
/// return the slot pointer plus whether an insertion happened.
pub fn upsert<K, V, D, F>(
    node: &mut NodeRef<K, V>,
    path: HashPath,
    key: K,
    default: D,
    hash_of: &F,
) -> (*mut V, bool)
where
    K: Eq + Clone,
    V: Clone,
    D: FnOnce() -> V,
    F: Fn(&K) -> HashBits,
{
    node.make_unique();

    if node.is_collision() {
        let collision_hash = node.collision_hash();
        if collision_hash == path.hash() {
            if let Some(slot) = (0..node.item_count()).find(|&slot| node.item(slot).0 == key) {
                return (&mut node.item_mut(slot).1 as *mut V, false);
            }
            node.append_collision_item((key, default()));
            let last = node.item_count() - 1;
            return (&mut node.item_mut(last).1 as *mut V, true);
        }
        let collision = node.clone();
        *node = expand_collision(collision, path, collision_hash, (key, default()));
        return (locate_new_value(node, path), true);
    }

    let bucket = path.bucket();
    let item_map = node.header().item_map();
    let child_map = node.header().child_map();

    if item_map.contains(bucket) {
        let slot = item_map.rank(bucket);
        if node.item(slot).0 == key {
            return (&mut node.item_mut(slot).1 as *mut V, false);
        }
        let resident_hash = hash_of(&node.item(slot).0);
        let new_hash = path.hash();
        node.replace_item_with_child(bucket, |resident| {
            spawn_chain(
                path.descend(),
                resident,
                resident_hash,
                (key, default()),
                new_hash,
            )
        });
        let child_slot = node.header().child_map().rank(bucket);
        return (
            locate_new_value(node.child_mut(child_slot), path.descend()),
            true,
        );
    }

    if child_map.contains(bucket) {
        let slot = child_map.rank(bucket);
        let (value, inserted) = upsert(node.child_mut(slot), path.descend(), key, default, hash_of);
        if inserted {
            node.header_mut().add_subtree_count(1);
        }
        return (value, inserted);
    }

    node.insert_item(bucket, item_map.rank(bucket), (key, default()));
    let slot = node.header().item_map().rank(bucket);
    (&mut node.item_mut(slot).1 as *mut V, true)
}

/// Walk a freshly built spawn or expansion subtree down to the newest
/// item. Every level on the new hash's route holds exactly one entry
/// for it; in the collision case the newest item sits last.
fn locate_new_value<K, V>(node: &mut NodeRef<K, V>, path: HashPath) -> *mut V {
    if node.is_collision() {
        let last = node.item_count() - 1;
        return &mut node.item_mut(last).1 as *mut V;
    }
    let bucket = path.bucket();
    let item_map = node.header().item_map();
    if item_map.contains(bucket) {
        let slot = item_map.rank(bucket);
        return &mut node.item_mut(slot).1 as *mut V;
    }
    let slot = node.header().child_map().rank(bucket);
    locate_new_value(node.child_mut(slot), path.descend())
}
