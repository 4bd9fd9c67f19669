//! Core constants and type definitions for persistent-hash-trie.
#![allow(dead_code)]

/// Number of hash bits consumed per trie level.
///
/// Compile-time knob. Changing it changes the node layout and the
/// shape of every tree; trees built with different values are not
/// compatible.
pub const BUCKET_BITS: u32 = 5;

/// Number of buckets per node (2^5 = 32).
pub const BUCKET_COUNT: usize = 1 << BUCKET_BITS;

/// Mask extracting a single bucket from a hash.
pub const BUCKET_MASK: u64 = (BUCKET_COUNT - 1) as u64;

/// Total number of hash bits consumed by a traversal.
///
/// Compile-time knob, tied to the width of [`crate::hash::HashBits`].
pub const HASH_WIDTH: u32 = 64;

/// Number of trie levels (13 for a 64-bit hash with 5-bit buckets).
///
/// The last level consumes the remaining 4 bits; below it only
/// collision nodes exist.
pub const MAX_LEVELS: u32 = (HASH_WIDTH + BUCKET_BITS - 1) / BUCKET_BITS;

/// Sentinel bucket for slots whose bucket identity is meaningless
/// (items inside a collision node).
pub const INVALID_BUCKET: u8 = u8::MAX;
