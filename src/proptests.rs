//! Property tests driving the map and set against the standard
//! library collections as models.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use crate::{TrieMap, TrieSet};

#[derive(Debug, Clone)]
enum Op {
    Insert(u16, u16),
    Remove(u16),
    Upsert(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u16>(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        any::<u16>().prop_map(Op::Remove),
        any::<u16>().prop_map(Op::Upsert),
    ]
}

proptest! {
    #[test]
    fn prop_map_matches_hashmap(ops in prop::collection::vec(op_strategy(), 0..400)) {
        let mut map: TrieMap<u16, u16> = TrieMap::new();
        let mut model: HashMap<u16, u16> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(map.insert(key, value), model.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(map.remove(&key), model.remove(&key));
                }
                Op::Upsert(key) => {
                    *map.get_or_insert_with(key, || 0) += 1;
                    *model.entry(key).or_insert(0) += 1;
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        for (key, value) in &model {
            prop_assert_eq!(map.get(key), Some(value));
        }
        prop_assert_eq!(map.iter().count(), model.len());
    }

    #[test]
    fn prop_snapshots_are_independent(
        base in prop::collection::vec((any::<u16>(), any::<u16>()), 0..200),
        extra in prop::collection::vec((any::<u16>(), any::<u16>()), 0..50),
    ) {
        let map: TrieMap<u16, u16> = base.iter().copied().collect();
        let frozen: HashMap<u16, u16> = base.iter().copied().collect();

        let mut mutated = map.clone();
        for (key, value) in &extra {
            mutated.insert(*key, *value);
        }
        for (key, _) in &extra {
            mutated.remove(key);
        }

        // However the mutated clone evolved, the original still
        // matches its frozen model.
        prop_assert_eq!(map.len(), frozen.len());
        for (key, value) in &frozen {
            prop_assert_eq!(map.get(key), Some(value));
        }
    }

    #[test]
    fn prop_set_algebra_matches_hashset(
        left in prop::collection::hash_set(any::<u16>(), 0..200),
        right in prop::collection::hash_set(any::<u16>(), 0..200),
    ) {
        let a: TrieSet<u16> = left.iter().copied().collect();
        let b: TrieSet<u16> = right.iter().copied().collect();

        let union: HashSet<u16> = a.union(&b).iter().copied().collect();
        let expected: HashSet<u16> = left.union(&right).copied().collect();
        prop_assert_eq!(union, expected);

        let intersection: HashSet<u16> = a.intersection(&b).iter().copied().collect();
        let expected: HashSet<u16> = left.intersection(&right).copied().collect();
        prop_assert_eq!(intersection, expected);

        let difference: HashSet<u16> = a.difference(&b).iter().copied().collect();
        let expected: HashSet<u16> = left.difference(&right).copied().collect();
        prop_assert_eq!(difference, expected);

        let symmetric: HashSet<u16> = a.symmetric_difference(&b).iter().copied().collect();
        let expected: HashSet<u16> = left.symmetric_difference(&right).copied().collect();
        prop_assert_eq!(symmetric, expected);
    }

    #[test]
    fn prop_equality_is_order_independent(
        pairs in prop::collection::hash_map(any::<u16>(), any::<u16>(), 0..200),
        seed in any::<u64>(),
    ) {
        let ordered: Vec<(u16, u16)> = pairs.iter().map(|(k, v)| (*k, *v)).collect();
        let mut shuffled = ordered.clone();
        // Cheap deterministic shuffle keyed by the seed.
        let len = shuffled.len();
        if len > 1 {
            for i in 0..len {
                let j = (seed as usize).wrapping_mul(31).wrapping_add(i * 17) % len;
                shuffled.swap(i, j);
            }
        }

        let forward: TrieMap<u16, u16> = ordered.into_iter().collect();
        let scrambled: TrieMap<u16, u16> = shuffled.into_iter().collect();
        prop_assert_eq!(forward, scrambled);
    }
}
