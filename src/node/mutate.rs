//! Single-node mutation primitives.
//!
//! All of these operate on a node that is already uniquely owned (the
//! walker's copy-on-write step guarantees it) and keep the header in
//! sync with every payload edit: bitmaps, byte accounting and subtree
//! count move together. Storage may be grown mid-operation, so raw
//! payload pointers are always recomputed after `ensure_free`.

use std::ptr;

use super::storage::NodeRef;
use crate::hash::HashBits;

impl<K, V> NodeRef<K, V> {
    /// Insert an item at `bucket`, whose dense slot is `slot`.
    ///
    /// Items at slots `[slot, item_count)` shift one position toward
    /// the payload front; the reverse layout makes that a single
    /// downward byte move.
    pub fn insert_item(&mut self, bucket: u8, slot: usize, item: (K, V)) {
        debug_assert!(self.is_unique(), "write to a shared node");
        debug_assert!(!self.header().is_collision());
        debug_assert!(self
            .header()
            .item_map()
            .is_disjoint(self.header().child_map()));
        debug_assert!(!self.header().item_map().contains(bucket));
        debug_assert!(!self.header().child_map().contains(bucket));
        debug_assert_eq!(slot, self.header().item_map().rank(bucket));

        self.ensure_free(Self::ITEM_SIZE);
        let count = self.header().item_count();
        // SAFETY: capacity for one more item was just ensured; the
        // moved byte range [end - count*sz, end - slot*sz) and its
        // destination one stride lower are both in bounds.
        unsafe {
            if slot < count && Self::ITEM_SIZE > 0 {
                let src = self.payload_end().sub(count * Self::ITEM_SIZE);
                ptr::copy(
                    src,
                    src.sub(Self::ITEM_SIZE),
                    (count - slot) * Self::ITEM_SIZE,
                );
            }
            ptr::write(self.item_slot_ptr(slot), item);
        }

        let header = self.header_mut();
        header.item_map_mut().insert(bucket);
        header.consume_bytes(Self::ITEM_SIZE as u32);
        header.add_subtree_count(1);
    }

    /// Remove and return the item at `bucket`/`slot`.
    pub fn remove_item(&mut self, bucket: u8, slot: usize) -> (K, V) {
        debug_assert!(self.is_unique(), "write to a shared node");
        debug_assert!(!self.header().is_collision());
        debug_assert!(self.header().item_map().contains(bucket));
        debug_assert_eq!(slot, self.header().item_map().rank(bucket));

        let count = self.header().item_count();
        // SAFETY: slot is initialized; after the read the survivors
        // at [slot+1, count) shift one stride toward the payload end,
        // reclosing the array over the vacated position.
        let item = unsafe {
            let item = ptr::read(self.item_slot_ptr(slot));
            if slot + 1 < count && Self::ITEM_SIZE > 0 {
                let src = self.payload_end().sub(count * Self::ITEM_SIZE);
                ptr::copy(
                    src,
                    src.add(Self::ITEM_SIZE),
                    (count - 1 - slot) * Self::ITEM_SIZE,
                );
            }
            item
        };

        let header = self.header_mut();
        header.item_map_mut().remove(bucket);
        header.release_bytes(Self::ITEM_SIZE as u32);
        header.sub_subtree_count(1);
        item
    }

    /// Insert a child at `bucket`, whose dense slot is `slot`.
    ///
    /// Adopts the child's subtree count into this node's.
    pub fn insert_child(&mut self, bucket: u8, slot: usize, child: NodeRef<K, V>) {
        debug_assert!(self.is_unique(), "write to a shared node");
        debug_assert!(!self.header().is_collision());
        debug_assert!(!self.header().item_map().contains(bucket));
        debug_assert!(!self.header().child_map().contains(bucket));
        debug_assert_eq!(slot, self.header().child_map().rank(bucket));

        self.ensure_free(Self::CHILD_SIZE);
        let count = self.header().child_count();
        let subtree = child.subtree_count();
        // SAFETY: capacity was ensured; children at [slot, count)
        // shift one element toward the free middle and the vacated
        // slot receives ownership of `child`.
        unsafe {
            let base = self.child_base();
            if slot < count {
                ptr::copy(base.add(slot), base.add(slot + 1), count - slot);
            }
            ptr::write(base.add(slot), child);
        }

        let header = self.header_mut();
        header.child_map_mut().insert(bucket);
        header.consume_bytes(Self::CHILD_SIZE as u32);
        header.add_subtree_count(subtree);
    }

    /// Remove and return the child at `bucket`/`slot`.
    pub fn remove_child(&mut self, bucket: u8, slot: usize) -> NodeRef<K, V> {
        debug_assert!(self.is_unique(), "write to a shared node");
        debug_assert!(!self.header().is_collision());
        debug_assert!(self.header().child_map().contains(bucket));
        debug_assert_eq!(slot, self.header().child_map().rank(bucket));

        let count = self.header().child_count();
        // SAFETY: slot is initialized; ownership moves out before the
        // survivors close over the gap.
        let child = unsafe {
            let base = self.child_base();
            let child = ptr::read(base.add(slot));
            if slot + 1 < count {
                ptr::copy(base.add(slot + 1), base.add(slot), count - 1 - slot);
            }
            child
        };

        let header = self.header_mut();
        header.child_map_mut().remove(bucket);
        header.release_bytes(Self::CHILD_SIZE as u32);
        header.sub_subtree_count(child.subtree_count());
        child
    }

    /// Expand the item at `bucket` into a child subtree: the item is
    /// moved out, handed to `build`, and the node it returns takes the
    /// item's place under the child map.
    pub fn replace_item_with_child<F>(&mut self, bucket: u8, build: F)
    where
        F: FnOnce((K, V)) -> NodeRef<K, V>,
    {
        let slot = self.header().item_map().rank(bucket);
        let item = self.remove_item(bucket, slot);
        let child = build(item);
        let child_slot = self.header().child_map().rank(bucket);
        self.insert_child(bucket, child_slot, child);
    }

    /// Collapse the child at `bucket` back into a single item. Returns
    /// the removed child so the caller can salvage its remains.
    pub fn replace_child_with_item(&mut self, bucket: u8, item: (K, V)) -> NodeRef<K, V> {
        let child_slot = self.header().child_map().rank(bucket);
        let child = self.remove_child(bucket, child_slot);
        let item_slot = self.header().item_map().rank(bucket);
        self.insert_item(bucket, item_slot, item);
        child
    }

    /// Append an item to a collision node and bump the shared count.
    pub fn append_collision_item(&mut self, item: (K, V)) {
        debug_assert!(self.is_unique(), "write to a shared node");
        // Valid on a fresh collision allocation (count 0) too.
        debug_assert!(self.header().item_map() == self.header().child_map());

        self.ensure_free(Self::ITEM_SIZE);
        let count = self.header().item_map().bits() as usize;
        // SAFETY: capacity was ensured and slot `count` is the next
        // free position from the payload end.
        unsafe {
            ptr::write(self.item_slot_ptr(count), item);
        }

        let header = self.header_mut();
        header.set_collision_count(count as u32 + 1);
        header.consume_bytes(Self::ITEM_SIZE as u32);
        header.add_subtree_count(1);
    }

    /// Remove and return the item at `slot` of a collision node.
    pub fn remove_collision_item(&mut self, slot: usize) -> (K, V) {
        debug_assert!(self.is_unique(), "write to a shared node");
        debug_assert!(self.header().is_collision());

        let count = self.header().item_count();
        debug_assert!(slot < count);
        // SAFETY: same shift discipline as `remove_item`.
        let item = unsafe {
            let item = ptr::read(self.item_slot_ptr(slot));
            if slot + 1 < count && Self::ITEM_SIZE > 0 {
                let src = self.payload_end().sub(count * Self::ITEM_SIZE);
                ptr::copy(
                    src,
                    src.add(Self::ITEM_SIZE),
                    (count - 1 - slot) * Self::ITEM_SIZE,
                );
            }
            item
        };

        let header = self.header_mut();
        header.set_collision_count(count as u32 - 1);
        header.release_bytes(Self::ITEM_SIZE as u32);
        header.sub_subtree_count(1);
        item
    }

    /// Node holding a single item.
    pub fn new_single_item(bucket: u8, item: (K, V)) -> Self {
        let mut node = Self::new_normal(1, 0);
        node.insert_item(bucket, 0, item);
        node
    }

    /// Node holding two items at distinct buckets.
    pub fn new_two_items(bucket_a: u8, item_a: (K, V), bucket_b: u8, item_b: (K, V)) -> Self {
        debug_assert_ne!(bucket_a, bucket_b);
        let mut node = Self::new_normal(2, 0);
        if bucket_a < bucket_b {
            node.insert_item(bucket_a, 0, item_a);
            node.insert_item(bucket_b, 1, item_b);
        } else {
            node.insert_item(bucket_b, 0, item_b);
            node.insert_item(bucket_a, 1, item_a);
        }
        node
    }

    /// Chain link: a node whose only entry is one child.
    pub fn new_single_child(bucket: u8, child: NodeRef<K, V>) -> Self {
        let mut node = Self::new_normal(0, 1);
        node.insert_child(bucket, 0, child);
        node
    }

    /// Node holding two children at distinct buckets.
    pub fn new_two_children(
        bucket_a: u8,
        child_a: NodeRef<K, V>,
        bucket_b: u8,
        child_b: NodeRef<K, V>,
    ) -> Self {
        debug_assert_ne!(bucket_a, bucket_b);
        let mut node = Self::new_normal(0, 2);
        if bucket_a < bucket_b {
            node.insert_child(bucket_a, 0, child_a);
            node.insert_child(bucket_b, 1, child_b);
        } else {
            node.insert_child(bucket_b, 0, child_b);
            node.insert_child(bucket_a, 1, child_a);
        }
        node
    }

    /// Node holding one item and one child at distinct buckets.
    pub fn new_item_and_child(
        item_bucket: u8,
        item: (K, V),
        child_bucket: u8,
        child: NodeRef<K, V>,
    ) -> Self {
        debug_assert_ne!(item_bucket, child_bucket);
        let mut node = Self::new_normal(1, 1);
        node.insert_item(item_bucket, 0, item);
        node.insert_child(child_bucket, 0, child);
        node
    }

    /// Collision node holding two items with the same full hash.
    ///
    /// The second item is the newer one and lands at the last slot.
    pub fn new_collision_pair(hash: HashBits, first: (K, V), second: (K, V)) -> Self {
        let mut node = Self::new_collision(hash, 2);
        node.append_collision_item(first);
        node.append_collision_item(second);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items_of(node: &NodeRef<u64, u64>) -> Vec<(u64, u64)> {
        (0..node.item_count()).map(|slot| *node.item(slot)).collect()
    }

    #[test]
    fn test_insert_item_slot_order() {
        let mut node = NodeRef::<u64, u64>::new_normal(3, 0);
        node.insert_item(10, 0, (10, 100));
        node.insert_item(3, 0, (3, 30));
        node.insert_item(20, 2, (20, 200));

        // Slots follow ascending bucket order regardless of insertion
        // order.
        assert_eq!(items_of(&node), vec![(3, 30), (10, 100), (20, 200)]);
        assert_eq!(node.subtree_count(), 3);
    }

    #[test]
    fn test_remove_item_closes_gap() {
        let mut node = NodeRef::<u64, u64>::new_normal(3, 0);
        node.insert_item(3, 0, (3, 30));
        node.insert_item(10, 1, (10, 100));
        node.insert_item(20, 2, (20, 200));

        assert_eq!(node.remove_item(10, 1), (10, 100));
        assert_eq!(items_of(&node), vec![(3, 30), (20, 200)]);
        assert_eq!(node.subtree_count(), 2);

        assert_eq!(node.remove_item(3, 0), (3, 30));
        assert_eq!(items_of(&node), vec![(20, 200)]);
    }

    #[test]
    fn test_insert_item_grows_storage() {
        let mut node = NodeRef::<u64, u64>::new_normal(1, 0);
        for bucket in 0..8u8 {
            node.insert_item(bucket, bucket as usize, (bucket as u64, 0));
        }
        assert_eq!(node.item_count(), 8);
        for slot in 0..8 {
            assert_eq!(node.item(slot).0, slot as u64);
        }
    }

    #[test]
    fn test_insert_remove_child() {
        let mut node = NodeRef::<u64, u64>::new_normal(0, 2);
        let a = NodeRef::new_single_item(0, (1, 1));
        let b = NodeRef::new_two_items(0, (2, 2), 1, (3, 3));

        node.insert_child(9, 0, a);
        node.insert_child(4, 0, b);
        assert_eq!(node.child_count(), 2);
        // Child slots are bucket ordered: bucket 4 first.
        assert_eq!(node.child(0).subtree_count(), 2);
        assert_eq!(node.child(1).subtree_count(), 1);
        assert_eq!(node.subtree_count(), 3);

        let removed = node.remove_child(4, 0);
        assert_eq!(removed.subtree_count(), 2);
        assert_eq!(node.subtree_count(), 1);
        assert_eq!(node.child_count(), 1);
    }

    #[test]
    fn test_replace_item_with_child() {
        let mut node = NodeRef::<u64, u64>::new_normal(2, 0);
        node.insert_item(5, 0, (5, 50));
        node.insert_item(9, 1, (9, 90));

        node.replace_item_with_child(5, |item| {
            NodeRef::new_two_items(0, item, 1, (99, 990))
        });

        assert_eq!(node.item_count(), 1);
        assert_eq!(node.child_count(), 1);
        assert_eq!(node.item(0).0, 9);
        assert_eq!(node.child(0).subtree_count(), 2);
        // One item left in place, two below: net one insertion.
        assert_eq!(node.subtree_count(), 3);
    }

    #[test]
    fn test_replace_child_with_item() {
        let mut node = NodeRef::<u64, u64>::new_normal(1, 1);
        node.insert_item(2, 0, (2, 20));
        node.insert_child(7, 0, NodeRef::new_single_item(0, (7, 70)));

        let child = node.replace_child_with_item(7, (7, 70));
        assert_eq!(child.subtree_count(), 1);
        assert_eq!(node.child_count(), 0);
        assert_eq!(node.item_count(), 2);
        assert_eq!(node.subtree_count(), 2);
    }

    #[test]
    fn test_collision_append_remove() {
        let mut node = NodeRef::<u64, u64>::new_collision(0xabc, 2);
        node.append_collision_item((1, 10));
        node.append_collision_item((2, 20));
        node.append_collision_item((3, 30));

        assert!(node.is_collision());
        assert_eq!(node.item_count(), 3);
        assert_eq!(node.subtree_count(), 3);
        assert_eq!(node.collision_hash(), 0xabc);

        let removed = node.remove_collision_item(1);
        assert_eq!(removed, (2, 20));
        assert_eq!(node.item_count(), 2);
        assert_eq!(node.collision_hash(), 0xabc);
    }

    #[test]
    fn test_collision_append_grows() {
        let mut node = NodeRef::<u64, u64>::new_collision(7, 2);
        for i in 0..40u64 {
            node.append_collision_item((i, i));
        }
        assert_eq!(node.item_count(), 40);
        assert_eq!(node.collision_hash(), 7);
        for slot in 0..40 {
            assert_eq!(node.item(slot).0, slot as u64);
        }
    }

    #[test]
    fn test_shape_constructors() {
        let two = NodeRef::<u64, u64>::new_two_items(8, (8, 80), 1, (1, 10));
        assert_eq!(two.item(0).0, 1);
        assert_eq!(two.item(1).0, 8);

        let chain = NodeRef::new_single_child(0, two);
        assert_eq!(chain.item_count(), 0);
        assert_eq!(chain.child_count(), 1);
        assert_eq!(chain.subtree_count(), 2);

        let mixed = NodeRef::new_item_and_child(3, (3, 30), 0, chain);
        assert_eq!(mixed.subtree_count(), 3);

        let pair = NodeRef::<u64, u64>::new_collision_pair(5, (1, 1), (2, 2));
        assert!(pair.is_collision());
        assert_eq!(pair.item_count(), 2);
        // The newer item occupies the last slot.
        assert_eq!(pair.item(1).0, 2);
    }
}
