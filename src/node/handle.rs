/*!
 * Owned Node Handle
 *
 * Unique-ownership smart handle around a raw node pointer plus the policy
 * that reclaims it. The containers use raw pointers internally, but their
 * public APIs only hand out and accept these handles, so ownership transfer
 * is statically checked at the boundary.
 */

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use super::policy::NodePolicy;

/// Exclusively owned node.
///
/// Move-only: moving the handle transfers ownership, copying is disallowed.
/// The bound policy's `release` runs exactly once - either when the handle
/// is dropped, or never, if the caller takes the node back via
/// [`into_raw`](OwnedNode::into_raw). "No node" is modelled as
/// `Option<OwnedNode>`; a handle always owns exactly one node.
pub struct OwnedNode<N, P: NodePolicy<N>> {
    node: NonNull<N>,
    policy: P,
}

// The handle owns its node outright, so sendability reduces to the payload
// and the policy.
unsafe impl<N: Send, P: NodePolicy<N> + Send> Send for OwnedNode<N, P> {}
unsafe impl<N: Sync, P: NodePolicy<N> + Sync> Sync for OwnedNode<N, P> {}

impl<N, P: NodePolicy<N>> OwnedNode<N, P> {
    /// Acquire a fresh node holding `value` through `policy`.
    pub fn acquire(policy: &P, value: N) -> Self {
        Self {
            node: policy.acquire(value),
            policy: policy.clone(),
        }
    }

    /// Adopt a raw node pointer.
    ///
    /// # Safety
    ///
    /// `node` must have been produced by `policy.acquire` (or by `acquire`
    /// on a policy describing the same pool), must not be linked into any
    /// structure, and must not be owned by anyone else.
    pub unsafe fn from_raw(node: NonNull<N>, policy: P) -> Self {
        Self { node, policy }
    }

    /// Relinquish ownership, returning the raw pointer without invoking the
    /// policy. The caller becomes responsible for eventually releasing it.
    pub fn into_raw(self) -> NonNull<N> {
        let mut this = ManuallyDrop::new(self);
        // Drop the policy copy; the node pointer escapes un-released.
        unsafe { std::ptr::drop_in_place(&mut this.policy) };
        this.node
    }

    /// The policy bound to this node.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Raw pointer to the node, without giving up ownership.
    pub fn as_ptr(&self) -> NonNull<N> {
        self.node
    }
}

impl<N, P: NodePolicy<N>> Deref for OwnedNode<N, P> {
    type Target = N;

    fn deref(&self) -> &N {
        unsafe { self.node.as_ref() }
    }
}

impl<N, P: NodePolicy<N>> DerefMut for OwnedNode<N, P> {
    fn deref_mut(&mut self) -> &mut N {
        unsafe { self.node.as_mut() }
    }
}

impl<N, P: NodePolicy<N>> Drop for OwnedNode<N, P> {
    fn drop(&mut self) {
        unsafe { self.policy.release(self.node) };
    }
}

impl<N: fmt::Debug, P: NodePolicy<N>> fmt::Debug for OwnedNode<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedNode").field(&**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BoxPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct CountingPolicy {
        released: Arc<AtomicUsize>,
    }

    impl NodePolicy<u64> for CountingPolicy {
        fn acquire(&self, value: u64) -> NonNull<u64> {
            NonNull::from(Box::leak(Box::new(value)))
        }

        unsafe fn release(&self, node: NonNull<u64>) {
            self.released.fetch_add(1, Ordering::Relaxed);
            drop(Box::from_raw(node.as_ptr()));
        }
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let policy = CountingPolicy {
            released: released.clone(),
        };

        let node = OwnedNode::acquire(&policy, 42);
        assert_eq!(*node, 42);
        drop(node);

        assert_eq!(released.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_into_raw_skips_release() {
        let released = Arc::new(AtomicUsize::new(0));
        let policy = CountingPolicy {
            released: released.clone(),
        };

        let node = OwnedNode::acquire(&policy, 7);
        let raw = node.into_raw();
        assert_eq!(released.load(Ordering::Relaxed), 0);

        // Re-adopt and drop to avoid leaking the test allocation.
        let node = unsafe { OwnedNode::from_raw(raw, policy) };
        drop(node);
        assert_eq!(released.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_deref_mut() {
        let policy = BoxPolicy::<u64>::new();
        let mut node = OwnedNode::acquire(&policy, 1);
        *node += 9;
        assert_eq!(*node, 10);
    }
}
