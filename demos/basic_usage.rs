//! Basic usage of the persistent map and set.
//!
//! Run with: cargo run --example basic_usage

use persistent_hash_trie::{TrieMap, TrieSet};

fn main() {
    println!("=== persistent-hash-trie: basic usage ===\n");

    // Map operations
    let mut inventory = TrieMap::new();
    inventory.insert("apples", 12u32);
    inventory.insert("pears", 4);
    inventory.insert("plums", 30);

    println!("inventory holds {} kinds of fruit", inventory.len());
    println!("apples in stock: {:?}", inventory.get("apples"));

    // Counting with a defaulted update: the default only runs when the
    // key is new, and the key is hashed once.
    let mut counts: TrieMap<&str, u32> = TrieMap::new();
    for word in ["the", "cat", "sat", "on", "the", "mat", "the", "end"] {
        *counts.get_or_insert_with(word, || 0) += 1;
    }
    println!("'the' appears {} times", counts["the"]);

    // Removal of a missing key is a silent no-op.
    inventory.remove("dragonfruit");
    println!("still {} kinds after removing nothing\n", inventory.len());

    // Set algebra
    let weekday_customers: TrieSet<&str> = ["ada", "brian", "grace"].into_iter().collect();
    let weekend_customers: TrieSet<&str> = ["grace", "linus"].into_iter().collect();

    let everyone = weekday_customers.union(&weekend_customers);
    let regulars = weekday_customers.intersection(&weekend_customers);

    println!("{} customers total", everyone.len());
    print!("regulars:");
    for name in &regulars {
        print!(" {name}");
    }
    println!();
}
