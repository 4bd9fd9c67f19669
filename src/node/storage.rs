//! Reference-counted node storage.
//!
//! A node is one contiguous allocation:
//!
//! ```text
//! [ header | children -> (forward) | ...free bytes... | (backward) <- items ]
//! ```
//!
//! Children occupy the payload prefix in ascending slot order; items
//! occupy the suffix in reverse slot order, so either array can grow
//! into the free middle without moving the other. Collision nodes
//! reserve the first payload word for the shared hash and store no
//! children.
//!
//! Read access goes through `&self` accessors; write access goes
//! through `&mut self` primitives that assert unique ownership in
//! debug builds. Borrow lifetimes keep both non-escaping, so a
//! reallocating grow can never invalidate a pointer that outlives the
//! call that produced it.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::atomic::Ordering;

use super::header::NodeHeader;
use crate::hash::HashBits;

/// Bytes reserved at the payload start of a collision node for the
/// shared hash word.
pub(crate) const COLLISION_HASH_BYTES: usize = mem::size_of::<HashBits>();

/// Owning, reference-counted handle to one node allocation.
///
/// `Clone` is a refcount increment; the final `Drop` deinitializes
/// the payload and frees the block. A parent node stores its children
/// as `NodeRef`s inside its own payload, which is what makes
/// structural sharing across tree values possible.
pub struct NodeRef<K, V> {
    ptr: NonNull<NodeHeader>,
    _marker: PhantomData<(K, V)>,
}

// SAFETY: a NodeRef can move between threads when the items it may
// drop or expose can. The refcount is atomic, and shared nodes are
// only read through `&self`; mutation requires both `&mut self` and a
// refcount of one.
unsafe impl<K: Send + Sync, V: Send + Sync> Send for NodeRef<K, V> {}
// SAFETY: same reasoning; `&NodeRef` only hands out shared access.
unsafe impl<K: Send + Sync, V: Send + Sync> Sync for NodeRef<K, V> {}

impl<K, V> NodeRef<K, V> {
    pub(crate) const ITEM_SIZE: usize = mem::size_of::<(K, V)>();
    pub(crate) const CHILD_SIZE: usize = mem::size_of::<NodeRef<K, V>>();

    /// Alignment the payload start and end must satisfy: child
    /// pointers at the front, items at the back, and the collision
    /// hash word all live there.
    const fn payload_align() -> usize {
        let mut align = mem::align_of::<NodeRef<K, V>>();
        if mem::align_of::<(K, V)>() > align {
            align = mem::align_of::<(K, V)>();
        }
        if mem::align_of::<HashBits>() > align {
            align = mem::align_of::<HashBits>();
        }
        align
    }

    /// Header bytes padded so the payload starts aligned.
    const fn payload_offset() -> usize {
        let align = Self::payload_align();
        (mem::size_of::<NodeHeader>() + align - 1) / align * align
    }

    const fn block_align() -> usize {
        let align = Self::payload_align();
        if mem::align_of::<NodeHeader>() > align {
            mem::align_of::<NodeHeader>()
        } else {
            align
        }
    }

    /// Round a payload capacity up so the payload end stays aligned
    /// for the reverse item array. Sizes are multiples of alignments
    /// in Rust, so a capacity that is a multiple of the payload
    /// alignment keeps every end-anchored item aligned.
    fn round_capacity(bytes: usize) -> usize {
        let align = Self::payload_align();
        (bytes + align - 1) / align * align
    }

    fn block_layout(byte_capacity: usize) -> Layout {
        Layout::from_size_align(
            Self::payload_offset() + byte_capacity,
            Self::block_align(),
        )
        .expect("node layout overflow")
    }

    /// Allocate an uninitialized block and install a fresh header.
    fn alloc_block(byte_capacity: usize, bytes_free: usize) -> NonNull<NodeHeader> {
        let layout = Self::block_layout(byte_capacity);
        // SAFETY: the layout is never zero-sized (the header alone is
        // 32 bytes).
        let raw = unsafe { alloc(layout) };
        if raw.is_null() {
            handle_alloc_error(layout);
        }
        let ptr = raw as *mut NodeHeader;
        // SAFETY: freshly allocated and aligned for NodeHeader.
        unsafe {
            ptr::write(ptr, NodeHeader::new(byte_capacity as u32, bytes_free as u32));
            NonNull::new_unchecked(ptr)
        }
    }

    /// New empty normal node sized for the stated item and child
    /// capacity.
    pub fn new_normal(item_capacity: usize, child_capacity: usize) -> Self {
        let capacity = Self::round_capacity(
            item_capacity * Self::ITEM_SIZE + child_capacity * Self::CHILD_SIZE,
        );
        NodeRef {
            ptr: Self::alloc_block(capacity, capacity),
            _marker: PhantomData,
        }
    }

    /// New empty collision node for the given shared hash, sized for
    /// the stated item capacity. The hash word is written up front;
    /// the node only becomes a recognizable collision node once items
    /// are appended.
    pub fn new_collision(hash: HashBits, item_capacity: usize) -> Self {
        let capacity = Self::round_capacity(
            COLLISION_HASH_BYTES + item_capacity * Self::ITEM_SIZE,
        );
        let node = NodeRef {
            ptr: Self::alloc_block(capacity, capacity - COLLISION_HASH_BYTES),
            _marker: PhantomData,
        };
        // SAFETY: the payload starts aligned for HashBits and the
        // capacity covers the reserved word.
        unsafe {
            ptr::write(node.payload_ptr() as *mut HashBits, hash);
        }
        node
    }

    #[inline]
    pub fn header(&self) -> &NodeHeader {
        // SAFETY: ptr is valid for the lifetime of self; the header
        // leads the allocation.
        unsafe { self.ptr.as_ref() }
    }

    /// Mutable header access. Part of the write-handle discipline:
    /// callers must hold the only reference.
    #[inline]
    pub fn header_mut(&mut self) -> &mut NodeHeader {
        debug_assert!(self.is_unique(), "write to a shared node");
        // SAFETY: ptr is valid and we are the only owner.
        unsafe { self.ptr.as_mut() }
    }

    #[inline]
    pub(crate) fn payload_ptr(&self) -> *mut u8 {
        // SAFETY: the payload begins payload_offset() bytes into the
        // same allocation.
        unsafe { (self.ptr.as_ptr() as *mut u8).add(Self::payload_offset()) }
    }

    #[inline]
    pub(crate) fn payload_end(&self) -> *mut u8 {
        // SAFETY: one-past-the-end of the allocation, never
        // dereferenced as such.
        unsafe {
            self.payload_ptr()
                .add(self.header().byte_capacity() as usize)
        }
    }

    /// Address of the item at `slot`, without bounds checking.
    ///
    /// Item `s` occupies the `s`-th position from the payload end.
    #[inline]
    pub(crate) fn item_slot_ptr(&self, slot: usize) -> *mut (K, V) {
        // SAFETY: in-bounds for any slot below the item capacity;
        // callers stay within item_count except while initializing.
        unsafe { self.payload_end().sub((slot + 1) * Self::ITEM_SIZE) as *mut (K, V) }
    }

    /// Base of the child array (normal nodes).
    #[inline]
    pub(crate) fn child_base(&self) -> *mut NodeRef<K, V> {
        self.payload_ptr() as *mut NodeRef<K, V>
    }

    #[inline]
    pub fn item(&self, slot: usize) -> &(K, V) {
        debug_assert!(slot < self.header().item_count());
        // SAFETY: slot is within the initialized item range.
        unsafe { &*self.item_slot_ptr(slot) }
    }

    #[inline]
    pub fn item_mut(&mut self, slot: usize) -> &mut (K, V) {
        debug_assert!(self.is_unique(), "write to a shared node");
        debug_assert!(slot < self.header().item_count());
        // SAFETY: slot is initialized and we are the only owner.
        unsafe { &mut *self.item_slot_ptr(slot) }
    }

    #[inline]
    pub fn child(&self, slot: usize) -> &NodeRef<K, V> {
        debug_assert!(slot < self.header().child_count());
        // SAFETY: slot is within the initialized child range.
        unsafe { &*self.child_base().add(slot) }
    }

    #[inline]
    pub fn child_mut(&mut self, slot: usize) -> &mut NodeRef<K, V> {
        debug_assert!(self.is_unique(), "write to a shared node");
        debug_assert!(slot < self.header().child_count());
        // SAFETY: slot is initialized and we are the only owner.
        unsafe { &mut *self.child_base().add(slot) }
    }

    /// The shared hash of a collision node, stored in the first
    /// payload word.
    #[inline]
    pub fn collision_hash(&self) -> HashBits {
        debug_assert!(self.header().is_collision());
        // SAFETY: collision allocations reserve and initialize the
        // leading hash word.
        unsafe { ptr::read(self.payload_ptr() as *const HashBits) }
    }

    #[inline]
    pub fn is_collision(&self) -> bool {
        self.header().is_collision()
    }

    #[inline]
    pub fn item_count(&self) -> usize {
        self.header().item_count()
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.header().child_count()
    }

    #[inline]
    pub fn subtree_count(&self) -> usize {
        self.header().subtree_count()
    }

    /// Atrophied: nothing but a single collision child. Forbidden
    /// anywhere except transiently at the root, where the collision
    /// child is promoted to be the root itself.
    pub fn is_atrophied(&self) -> bool {
        self.header().has_singleton_child() && self.child(0).is_collision()
    }

    /// `true` if the two handles designate the same allocation.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }

    /// The allocation address, used as an identity token by cursors.
    #[inline]
    pub(crate) fn node_id(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// `true` if this is the only reference to the allocation.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.header().ref_count().load(Ordering::Acquire) == 1
    }

    /// Bytes used ahead of the free region: the child array, or the
    /// reserved hash word of a collision node.
    fn front_bytes(&self) -> usize {
        if self.header().is_collision() {
            COLLISION_HASH_BYTES
        } else {
            self.header().child_count() * Self::CHILD_SIZE
        }
    }

    /// Reallocate with at least `additional` more free bytes,
    /// relocating children to the new prefix and items to the new
    /// suffix without running any clones or drops.
    pub(crate) fn grow(&mut self, additional: usize) {
        debug_assert!(self.is_unique(), "grow of a shared node");

        let old_capacity = self.header().byte_capacity() as usize;
        let old_free = self.header().bytes_free() as usize;
        let new_capacity =
            Self::round_capacity((old_capacity * 2).max(old_capacity + additional).max(16));
        let new_free = old_free + (new_capacity - old_capacity);

        let new_ptr = Self::alloc_block(new_capacity, new_free);
        let new_node: Self = NodeRef {
            ptr: new_ptr,
            _marker: PhantomData,
        };

        // SAFETY: both blocks are live and disjoint; the byte ranges
        // copied are within their respective payloads. Contents are
        // moved, never duplicated: the old block is freed without
        // running drops.
        unsafe {
            let header = new_node.ptr.as_ptr();
            (*header).set_subtree_count(self.header().subtree_count());
            *(*header).item_map_mut() = self.header().item_map();
            *(*header).child_map_mut() = self.header().child_map();

            let front = self.front_bytes();
            ptr::copy_nonoverlapping(self.payload_ptr(), new_node.payload_ptr(), front);

            let item_bytes = self.header().item_count() * Self::ITEM_SIZE;
            ptr::copy_nonoverlapping(
                self.payload_end().sub(item_bytes),
                new_node.payload_end().sub(item_bytes),
                item_bytes,
            );

            dealloc(
                self.ptr.as_ptr() as *mut u8,
                Self::block_layout(old_capacity),
            );
        }

        self.ptr = new_node.ptr;
        mem::forget(new_node);
    }

    /// Grow if fewer than `bytes` payload bytes are free.
    #[inline]
    pub(crate) fn ensure_free(&mut self, bytes: usize) {
        if (self.header().bytes_free() as usize) < bytes {
            self.grow(bytes);
        }
    }
}

impl<K: Clone, V: Clone> NodeRef<K, V> {
    /// Copy-on-write step: if the node is shared, replace this handle
    /// with a private duplicate. Duplication is shallow; children are
    /// adopted by reference.
    #[inline]
    pub fn make_unique(&mut self) {
        if !self.is_unique() {
            *self = self.duplicate();
        }
    }

    /// Allocate a private copy with the same layout: child references
    /// are cloned (refcount bumps), items are cloned one at a time.
    ///
    /// The item map is published bit by bit in ascending bucket order
    /// so that a panicking clone leaves the duplicate with exactly its
    /// initialized prefix, which its drop then releases correctly.
    fn duplicate(&self) -> Self {
        let capacity = self.header().byte_capacity() as usize;
        let free = self.header().bytes_free() as usize;
        let mut node = NodeRef::<K, V> {
            ptr: Self::alloc_block(capacity, free),
            _marker: PhantomData,
        };

        if self.header().is_collision() {
            // SAFETY: the fresh block reserves the same leading hash
            // word; item slots are written before being published via
            // the collision count.
            unsafe {
                ptr::write(node.payload_ptr() as *mut HashBits, self.collision_hash());
                let count = self.header().item_count();
                for slot in 0..count {
                    ptr::write(node.item_slot_ptr(slot), (*self.item_slot_ptr(slot)).clone());
                    node.header_mut().set_collision_count(slot as u32 + 1);
                }
            }
        } else {
            // Children first: refcount bumps cannot panic, so the
            // child map can be published wholesale.
            // SAFETY: child slots are in bounds for both blocks and
            // each write initializes a fresh NodeRef.
            unsafe {
                let children = self.header().child_count();
                for slot in 0..children {
                    ptr::write(node.child_base().add(slot), (*self.child_base().add(slot)).clone());
                }
                *node.header_mut().child_map_mut() = self.header().child_map();

                for (slot, bucket) in self.header().item_map().iter().enumerate() {
                    ptr::write(node.item_slot_ptr(slot), (*self.item_slot_ptr(slot)).clone());
                    node.header_mut().item_map_mut().insert(bucket);
                }
            }
        }

        node.header_mut()
            .set_subtree_count(self.header().subtree_count());
        node
    }
}

impl<K, V> Clone for NodeRef<K, V> {
    #[inline]
    fn clone(&self) -> Self {
        self.header().ref_count().fetch_add(1, Ordering::Relaxed);
        NodeRef {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<K, V> Drop for NodeRef<K, V> {
    fn drop(&mut self) {
        // Whoever observes the count hit zero owns the teardown.
        if self.header().ref_count().fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }

        // SAFETY: we hold the last reference. Items and children are
        // deinitialized in slot order, then the block is freed. Child
        // drops recurse at most one level per trie level.
        unsafe {
            let items = self.header().item_count();
            for slot in 0..items {
                ptr::drop_in_place(self.item_slot_ptr(slot));
            }
            let children = self.header().child_count();
            for slot in 0..children {
                ptr::drop_in_place(self.child_base().add(slot));
            }
            let layout = Self::block_layout(self.header().byte_capacity() as usize);
            ptr::drop_in_place(self.ptr.as_ptr());
            dealloc(self.ptr.as_ptr() as *mut u8, layout);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for NodeRef<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        if header.is_collision() {
            f.debug_struct("CollisionNode")
                .field("hash", &self.collision_hash())
                .field("items", &header.item_count())
                .finish()
        } else {
            f.debug_struct("Node")
                .field("item_map", &header.item_map())
                .field("child_map", &header.child_map())
                .field("subtree_count", &header.subtree_count())
                .finish()
        }
    }
}
