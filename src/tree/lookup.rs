//! Hash-routed lookup.

use std::borrow::Borrow;

use crate::hash::HashPath;
use crate::node::NodeRef;

/// Find the item with the given key, consuming one bucket per level.
///
/// At a collision node the full hash is compared first; only a match
/// is worth a key scan.
pub fn find<'a, K, V, Q>(
    mut node: &'a NodeRef<K, V>,
    mut path: HashPath,
    key: &Q,
) -> Option<&'a (K, V)>
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    loop {
        let header = node.header();
        if header.is_collision() {
            if node.collision_hash() != path.hash() {
                return None;
            }
            return (0..header.item_count())
                .map(|slot| node.item(slot))
                .find(|item| key == item.0.borrow());
        }

        let bucket = path.bucket();
        if header.item_map().contains(bucket) {
            let item = node.item(header.item_map().rank(bucket));
            return if key == item.0.borrow() {
                Some(item)
            } else {
                None
            };
        }
        if header.child_map().contains(bucket) {
            node = node.child(header.child_map().rank(bucket));
            path = path.descend();
            continue;
        }
        return None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_item_and_miss() {
        let node = NodeRef::<u64, u64>::new_two_items(1, (1, 10), 2, (2, 20));

        assert_eq!(find(&node, HashPath::new(1), &1), Some(&(1, 10)));
        assert_eq!(find(&node, HashPath::new(2), &2), Some(&(2, 20)));
        // Bucket 3 is empty.
        assert_eq!(find(&node, HashPath::new(3), &3), None);
        // Bucket 1 is occupied by a different key.
        assert_eq!(find(&node, HashPath::new(33), &33), None);
    }

    #[test]
    fn test_find_descends_chain() {
        // Two keys agreeing in the low 5 bits: a chain under bucket 1.
        let child = NodeRef::<u64, u64>::new_two_items(0, (1, 10), 1, (33, 330));
        let root = NodeRef::new_single_child(1, child);

        assert_eq!(find(&root, HashPath::new(1), &1), Some(&(1, 10)));
        assert_eq!(find(&root, HashPath::new(33), &33), Some(&(33, 330)));
        assert_eq!(find(&root, HashPath::new(65), &65), None);
    }

    #[test]
    fn test_find_in_collision_node() {
        let node = NodeRef::<u64, u64>::new_collision_pair(0xff, (1, 10), (2, 20));

        assert_eq!(find(&node, HashPath::new(0xff), &1), Some(&(1, 10)));
        assert_eq!(find(&node, HashPath::new(0xff), &2), Some(&(2, 20)));
        // Same hash, unknown key.
        assert_eq!(find(&node, HashPath::new(0xff), &3), None);
        // Different hash short-circuits without a scan.
        assert_eq!(find(&node, HashPath::new(0xfe), &1), None);
    }
}
