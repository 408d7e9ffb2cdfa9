/*!
 * Treiber Stack
 *
 * A single atomic `head` pointer owning the chain reachable from it.
 * `push_front` is the standard CAS retry loop; `consume` swaps the whole
 * chain out in one exchange, which is the intended high-throughput path:
 * O(1) regardless of length, and the consumer then works on the detached
 * list with zero atomics.
 */

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::list::ForwardList;
use crate::node::{Linked, NodePolicy, OwnedNode};

/// Lock-free multi-producer stack over intrusively linked nodes.
///
/// Contention never surfaces as an error: pushes resolve it with bounded
/// CAS retries. Starvation under adversarial scheduling is the standard
/// lock-free caveat and is not bounded by this design.
pub struct MultiProducerStack<N: Linked, P: NodePolicy<N>> {
    head: CachePadded<AtomicPtr<N>>,
    policy: P,
}

unsafe impl<N: Linked + Send, P: NodePolicy<N> + Send> Send for MultiProducerStack<N, P> {}
unsafe impl<N: Linked + Send, P: NodePolicy<N> + Sync> Sync for MultiProducerStack<N, P> {}

impl<N: Linked, P: NodePolicy<N>> MultiProducerStack<N, P> {
    /// Create an empty stack bound to `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            head: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
            policy,
        }
    }

    /// The policy nodes are acquired from and released through.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Acquire a node for `value` and push it. Callable from any thread.
    ///
    /// The policy's `acquire` runs before any shared state is touched, so a
    /// panicking acquisition leaves the stack unchanged.
    pub fn push_front(&self, value: N) {
        self.push_front_node(OwnedNode::acquire(&self.policy, value));
    }

    /// Push an already-owned node. Callable from any thread; lock-free.
    pub fn push_front_node(&self, node: OwnedNode<N, P>) {
        debug_assert!(
            self.policy.same_pool(node.policy()),
            "node transferred across pools"
        );
        let node = node.into_raw().as_ptr();
        debug_assert!(unsafe { (*node).link().is_unlinked() }, "node already linked");

        let backoff = Backoff::new();
        // Acquire on the head read, not relaxed: when the consumer later
        // detaches the chain, every node below the new top must already be
        // visible, not just the top one's writes.
        let mut observed = self.head.load(Ordering::Acquire);
        loop {
            unsafe { (*node).link().set_next(observed, Ordering::Relaxed) };
            match self.head.compare_exchange_weak(
                observed,
                node,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => {
                    observed = actual;
                    backoff.spin();
                }
            }
        }
    }

    /// Detach and return the top node.
    ///
    /// # Caveat
    ///
    /// Safe only while no concurrent [`consume`](Self::consume) or other
    /// `pop_front` can run on the same instance: `consume` unconditionally
    /// swaps the whole chain out, and mixing the two concurrently is a
    /// contract violation with unspecified results. Under the crate's
    /// single-consumer discipline (one popping thread) this also rules out
    /// the ABA hazard of the classic Treiber pop.
    pub fn pop_front(&self) -> Option<OwnedNode<N, P>> {
        let backoff = Backoff::new();
        let mut observed = self.head.load(Ordering::Acquire);
        loop {
            let node = NonNull::new(observed)?;
            let next = unsafe { node.as_ref().link().next(Ordering::Relaxed) };
            match self.head.compare_exchange_weak(
                observed,
                next,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    unsafe { node.as_ref().link().set_next(ptr::null_mut(), Ordering::Relaxed) };
                    return Some(unsafe { OwnedNode::from_raw(node, self.policy.clone()) });
                }
                Err(actual) => {
                    observed = actual;
                    backoff.spin();
                }
            }
        }
    }

    /// Atomically detach the entire chain for exclusive single-threaded
    /// consumption. O(1) regardless of length.
    ///
    /// The returned list owns every node that was reachable from the head;
    /// the stack is left empty (concurrent pushes may refill it
    /// immediately). The list yields nodes most-recently-pushed first.
    pub fn consume(&self) -> ForwardList<N, P> {
        let chain = self.head.swap(ptr::null_mut(), Ordering::Acquire);
        unsafe { ForwardList::from_raw_chain(chain, self.policy.clone()) }
    }

    /// Drain the stack, releasing every node through the policy.
    pub fn clear(&self) {
        drop(self.consume());
    }

    /// Advisory emptiness check.
    ///
    /// A `false` immediately invalidated by a concurrent `consume` is
    /// expected, not a bug.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Relaxed).is_null()
    }
}

impl<N: Linked, P: NodePolicy<N> + Default> Default for MultiProducerStack<N, P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<N: Linked, P: NodePolicy<N>> Drop for MultiProducerStack<N, P> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<N: Linked, P: NodePolicy<N>> fmt::Debug for MultiProducerStack<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiProducerStack")
            .field("empty", &self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BoxPolicy, Link};

    struct Item {
        value: u64,
        link: Link<Item>,
    }

    impl Item {
        fn new(value: u64) -> Self {
            Self {
                value,
                link: Link::new(),
            }
        }
    }

    impl Linked for Item {
        fn link(&self) -> &Link<Self> {
            &self.link
        }
    }

    type Stack = MultiProducerStack<Item, BoxPolicy<Item>>;

    #[test]
    fn test_lifo_single_producer() {
        let stack = Stack::default();
        for v in 1..=5 {
            stack.push_front(Item::new(v));
        }

        let list = stack.consume();
        let values: Vec<u64> = list.iter().map(|n| n.value).collect();
        assert_eq!(values, vec![5, 4, 3, 2, 1]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_pop_front_single_thread() {
        let stack = Stack::default();
        stack.push_front(Item::new(1));
        stack.push_front(Item::new(2));

        assert_eq!(stack.pop_front().unwrap().value, 2);
        assert_eq!(stack.pop_front().unwrap().value, 1);
        assert!(stack.pop_front().is_none());
    }

    #[test]
    fn test_consume_empty_is_idempotent() {
        let stack = Stack::default();
        for _ in 0..3 {
            assert!(stack.consume().is_empty());
        }
        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_push_after_consume() {
        let stack = Stack::default();
        stack.push_front(Item::new(1));
        drop(stack.consume());

        stack.push_front(Item::new(2));
        let list = stack.consume();
        assert_eq!(list.iter().map(|n| n.value).collect::<Vec<_>>(), vec![2]);
    }
}
