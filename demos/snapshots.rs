//! Structural sharing: cheap snapshots that never see later changes.
//!
//! Run with: cargo run --example snapshots

use persistent_hash_trie::TrieMap;

fn main() {
    println!("=== persistent-hash-trie: snapshots ===\n");

    let mut ledger = TrieMap::new();
    for account in 0..100_000u64 {
        ledger.insert(account, 100u64);
    }

    // Clone is O(1): the snapshot shares every node with the ledger.
    let start = std::time::Instant::now();
    let snapshot = ledger.clone();
    println!("snapshot of {} accounts in {:?}", snapshot.len(), start.elapsed());

    // A mutation copies only the path to the changed item, at most one
    // node per trie level.
    let start = std::time::Instant::now();
    *ledger.get_mut(&42).unwrap() -= 30;
    ledger.insert(100_000, 500);
    println!("two mutations in {:?}\n", start.elapsed());

    println!("ledger:   account 42 = {:?}", ledger.get(&42));
    println!("snapshot: account 42 = {:?}", snapshot.get(&42));
    println!("ledger:   new account  = {:?}", ledger.get(&100_000));
    println!("snapshot: new account  = {:?}", snapshot.get(&100_000));

    // Snapshots compare in O(1) when they share a root.
    let frozen = snapshot.clone();
    println!("\nsnapshot == frozen: {}", snapshot == frozen);
    println!("snapshot == ledger: {}", snapshot == ledger);
}
