//! Hash slicing and the level cursor used to route keys through the trie.
//!
//! A key's 64-bit hash is partitioned into 5-bit buckets, least
//! significant first; [`HashPath`] pairs a hash with the shift of the
//! level currently being examined. Below the last level no bucket bits
//! remain (`is_bottom`) and only collision nodes can distinguish keys.

use std::hash::{BuildHasher, Hash};
use std::sync::OnceLock;

use crate::constants::{BUCKET_BITS, BUCKET_MASK, HASH_WIDTH};

/// Fixed-width hash consumed by the trie.
pub type HashBits = u64;

/// The default build hasher for maps and sets.
pub type DefaultHashBuilder = ahash::RandomState;

/// Hash a key with the given build hasher.
#[inline]
pub fn hash_key<K: Hash + ?Sized, S: BuildHasher>(builder: &S, key: &K) -> HashBits {
    builder.hash_one(key)
}

/// The per-process default hasher state.
///
/// All default-constructed maps share one seeded state so that two
/// default maps always agree on tree shape, which the structural
/// set-algebra operations rely on. With the `deterministic-hashing`
/// feature the seeds are pinned instead of drawn at first use.
fn shared_state() -> &'static ahash::RandomState {
    static STATE: OnceLock<ahash::RandomState> = OnceLock::new();
    STATE.get_or_init(|| {
        if cfg!(feature = "deterministic-hashing") {
            ahash::RandomState::with_seeds(
                0x243f_6a88_85a3_08d3,
                0x1319_8a2e_0370_7344,
                0xa409_3822_299f_31d0,
                0x082e_fa98_ec4e_6c89,
            )
        } else {
            ahash::RandomState::new()
        }
    })
}

/// A clone of the shared per-process hasher state.
#[inline]
pub fn default_hash_builder() -> DefaultHashBuilder {
    shared_state().clone()
}

/// A hash plus the shift of the level currently being examined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashPath {
    hash: HashBits,
    shift: u32,
}

impl HashPath {
    /// Start a traversal at the root level.
    #[inline]
    pub fn new(hash: HashBits) -> Self {
        HashPath { hash, shift: 0 }
    }

    /// Resume a traversal at an arbitrary shift.
    #[inline]
    pub fn at(hash: HashBits, shift: u32) -> Self {
        debug_assert!(shift % BUCKET_BITS == 0);
        HashPath { hash, shift }
    }

    /// The full hash being routed.
    #[inline]
    pub fn hash(&self) -> HashBits {
        self.hash
    }

    /// The bucket of this path's hash at the current level.
    #[inline]
    pub fn bucket(&self) -> u8 {
        debug_assert!(!self.is_bottom());
        ((self.hash >> self.shift) & BUCKET_MASK) as u8
    }

    /// The bucket of an arbitrary hash at the current level.
    ///
    /// Used when two hashes meet at one node: the path carries the
    /// level, the argument carries the other hash.
    #[inline]
    pub fn bucket_of(&self, hash: HashBits) -> u8 {
        debug_assert!(!self.is_bottom());
        ((hash >> self.shift) & BUCKET_MASK) as u8
    }

    /// Step one level down.
    #[inline]
    pub fn descend(self) -> Self {
        debug_assert!(!self.is_bottom());
        HashPath {
            hash: self.hash,
            shift: self.shift + BUCKET_BITS,
        }
    }

    /// `true` once no bucket bits remain in the hash.
    ///
    /// At the bottom, keys can only be told apart by full-hash
    /// comparison, which is what collision nodes do.
    #[inline]
    pub fn is_bottom(&self) -> bool {
        self.shift >= HASH_WIDTH
    }
}
