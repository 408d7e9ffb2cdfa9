/*!
 * Node Ownership Policy
 *
 * The only place that knows how nodes are allocated and reclaimed. The
 * containers never touch an allocator themselves; they acquire nodes through
 * a policy on the producer side and hand every node to exactly one `release`
 * call on the consumer side.
 */

use std::marker::PhantomData;
use std::ptr::NonNull;

/// Strategy for producing and reclaiming nodes.
///
/// A policy is cloned into every [`OwnedNode`](super::OwnedNode) handle, so
/// implementations should be cheap to clone (zero-sized, or an `Arc` around
/// shared pool state).
///
/// # Contract
///
/// - `acquire` places `value` somewhere with a stable address and returns a
///   pointer valid until that pointer is passed to `release` on a policy
///   describing the same pool.
/// - `release` must be safe to call from whichever thread ends up draining
///   nodes (always the single consumer thread in this crate's structures)
///   and must not panic.
/// - Allocation failure surfaces through the policy's own mechanism
///   (panic/abort for [`BoxPolicy`], matching `Box::new`). Pooled policies
///   that can run dry should pre-acquire and hand the containers an
///   `OwnedNode` through the `*_node` entry points, which only touch shared
///   state once the node exists.
pub trait NodePolicy<N>: Clone {
    /// Whether any two instances of this policy describe the same pool.
    const IS_ALWAYS_EQUAL: bool = false;

    /// Construct or retrieve a node holding `value`.
    fn acquire(&self, value: N) -> NonNull<N>;

    /// Reclaim a node previously produced by `acquire`.
    ///
    /// # Safety
    ///
    /// `node` must have been returned by `acquire` (or `clone_node`) on a
    /// policy for which [`same_pool`](Self::same_pool) holds, must not be
    /// linked into any structure, and must not be used afterwards.
    unsafe fn release(&self, node: NonNull<N>);

    /// Deep-copy a node. Required only by callers offering deep copy.
    fn clone_node(&self, node: &N) -> NonNull<N>
    where
        N: Clone,
    {
        self.acquire(node.clone())
    }

    /// Whether `self` and `other` may exchange nodes.
    ///
    /// Containers check this (in debug builds) before transferring ownership
    /// across instances, e.g. when merging or splicing lists.
    fn same_pool(&self, other: &Self) -> bool {
        let _ = other;
        Self::IS_ALWAYS_EQUAL
    }
}

/// Default heap policy: every node is an individually boxed allocation.
///
/// All instances describe the same pool (the global allocator).
pub struct BoxPolicy<N> {
    _marker: PhantomData<fn(N) -> N>,
}

impl<N> BoxPolicy<N> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<N> Clone for BoxPolicy<N> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<N> Copy for BoxPolicy<N> {}

impl<N> Default for BoxPolicy<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> NodePolicy<N> for BoxPolicy<N> {
    const IS_ALWAYS_EQUAL: bool = true;

    #[inline]
    fn acquire(&self, value: N) -> NonNull<N> {
        NonNull::from(Box::leak(Box::new(value)))
    }

    #[inline]
    unsafe fn release(&self, node: NonNull<N>) {
        drop(Box::from_raw(node.as_ptr()));
    }
}
