//! Structural invariant verification.
//!
//! With the `internal-checks` feature enabled, the facades re-verify
//! the whole tree after every public mutation. A violated invariant is
//! unrecoverable, so each check aborts with a diagnostic.

use crate::constants::{BUCKET_BITS, BUCKET_MASK};
use crate::hash::HashBits;
use crate::node::NodeRef;

/// Verify every structural invariant of the tree and its item total.
pub fn check_tree<K, V, H>(root: Option<&NodeRef<K, V>>, expected_count: usize, hash_of: &H)
where
    H: Fn(&K) -> HashBits,
{
    let total = match root {
        None => 0,
        Some(node) => check_node(node, 0, 0, 0, true, hash_of),
    };
    assert_eq!(total, expected_count, "tree count out of sync with item total");
}

/// Verify the subtree rooted at `node`, whose keys must hash to
/// `prefix` under `mask`, and return its item total.
fn check_node<K, V, H>(
    node: &NodeRef<K, V>,
    shift: u32,
    prefix: HashBits,
    mask: HashBits,
    is_root: bool,
    hash_of: &H,
) -> usize
where
    H: Fn(&K) -> HashBits,
{
    let header = node.header();

    if header.is_collision() {
        let count = header.item_count();
        assert!(count >= 2, "collision node holds fewer than two items");
        let hash = node.collision_hash();
        assert_eq!(hash & mask, prefix, "collision node off its route");
        for slot in 0..count {
            assert_eq!(
                hash_of(&node.item(slot).0),
                hash,
                "collision item disagrees with the shared hash"
            );
        }
        assert_eq!(header.subtree_count(), count, "collision subtree count out of sync");
        check_bytes(node);
        return count;
    }

    assert!(
        header.item_map().is_disjoint(header.child_map()),
        "item and child maps overlap"
    );

    let mut total = 0;
    for (slot, bucket) in header.item_map().iter().enumerate() {
        assert_eq!(
            header.item_map().select(slot),
            bucket,
            "rank and select disagree"
        );
        let hash = hash_of(&node.item(slot).0);
        assert_eq!(
            ((hash >> shift) & BUCKET_MASK) as u8,
            bucket,
            "item stored at the wrong bucket for its level"
        );
        assert_eq!(hash & mask, prefix, "item off its route");
        total += 1;
    }
    for (slot, bucket) in header.child_map().iter().enumerate() {
        let child_prefix = prefix | ((bucket as HashBits) << shift);
        let child_mask = mask | (BUCKET_MASK << shift);
        total += check_node(
            node.child(slot),
            shift + BUCKET_BITS,
            child_prefix,
            child_mask,
            false,
            hash_of,
        );
    }

    assert_eq!(header.subtree_count(), total, "subtree count out of sync");
    if !is_root {
        assert!(total >= 2, "non-root node covers fewer than two items");
        assert!(
            !header.has_singleton_item(),
            "non-root node holds a lone item"
        );
        assert!(
            !node.is_atrophied(),
            "non-root node atrophied over a collision child"
        );
    }
    check_bytes(node);
    total
}

/// Byte accounting: free plus used must equal the capacity.
fn check_bytes<K, V>(node: &NodeRef<K, V>) {
    let header = node.header();
    let mut used = header.item_count() * NodeRef::<K, V>::ITEM_SIZE;
    if header.is_collision() {
        used += std::mem::size_of::<HashBits>();
    } else {
        used += header.child_count() * NodeRef::<K, V>::CHILD_SIZE;
    }
    assert_eq!(
        header.bytes_free() as usize + used,
        header.byte_capacity() as usize,
        "byte accounting out of sync"
    );
}
