//! Removal and the collapse rules that keep the tree canonical.

use std::borrow::Borrow;

use crate::hash::HashPath;
use crate::node::NodeRef;

/// Remove `key` along `path`, making every touched node uniquely
/// owned on the way down. Returns the removed item, or `None` when the
/// key is absent (in which case the walk leaves no observable change).
///
/// On unwinding, each parent re-canonicalizes the child it descended
/// into; the root's own shape is the caller's responsibility because
/// only the caller knows it is the root.
pub fn remove<K, V, Q>(node: &mut NodeRef<K, V>, path: HashPath, key: &Q) -> Option<(K, V)>
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
        return Some(node.remove_collision_item(slot));
    }

    let bucket = path.bucket();
    let item_map = node.header().item_map();
    let child_map = node.header().child_map();

    if item_map.contains(bucket) {
        let slot = item_map.rank(bucket);
        if key == node.item(slot).0.borrow() {
            return Some(node.remove_item(bucket, slot));
        }
        return None;
    }

    if child_map.contains(bucket) {
        let slot = child_map.rank(bucket);
        let removed = remove(node.child_mut(slot), path.descend(), key)?;
        node.header_mut().sub_subtree_count(1);
        restore_shape(node, bucket, slot);
        return Some(removed);
    }

    None
}

enum Fix {
    Keep,
    /// Child holds one last item: pull it up into this node.
    Inline,
    /// Child is a bare chain link over a collision node: hoist the
    /// collision node one level.
    Hoist,
}

/// Re-canonicalize after a removal inside the child at `bucket`.
///
/// A child node always covers at least two items; removal can leave it
/// with exactly one (collapse) or with nothing but a collision child
/// (atrophy). Fixing one level here is enough: the cascade continues
/// as the recursion unwinds.
fn restore_shape<K: Clone, V: Clone>(node: &mut NodeRef<K, V>, bucket: u8, slot: usize) {
    let fix = {
        let child = node.child(slot);
        if child.is_collision() {
            if child.item_count() == 1 {
                Fix::Inline
            } else {
                Fix::Keep
            }
        } else if child.header().has_singleton_item() {
            Fix::Inline
        } else if child.is_atrophied() {
            Fix::Hoist
        } else {
            Fix::Keep
        }
    };

    match fix {
        Fix::Keep => {}
        Fix::Inline => {
            let mut child = node.remove_child(bucket, slot);
            let item = if child.is_collision() {
                child.remove_collision_item(0)
            } else {
                let item_bucket = child.header().item_map().first().expect("singleton item");
                child.remove_item(item_bucket, 0)
            };
            let item_slot = node.header().item_map().rank(bucket);
            node.insert_item(bucket, item_slot, item);
        }
        Fix::Hoist => {
            let mut child = node.remove_child(bucket, slot);
            let grand_bucket = child.header().child_map().first().expect("singleton child");
            let grandchild = child.remove_child(grand_bucket, 0);
            let child_slot = node.header().child_map().rank(bucket);
            node.insert_child(bucket, child_slot, grandchild);
        }
    }
}
