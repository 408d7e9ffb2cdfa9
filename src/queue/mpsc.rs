/*!
 * Vyukov MPSC Queue
 *
 * Producers publish with a single `tail` exchange followed by a release
 * store into the predecessor's link; the consumer walks `head`. The
 * sentinel exists precisely to keep the consumer from concluding "empty"
 * while a producer has swapped the tail but not yet linked its node: that
 * window surfaces as [`TryDequeueError::Inconsistent`] ("try again"), never
 * as corruption or a false empty.
 *
 * Discipline: many threads may enqueue concurrently; exactly one thread may
 * dequeue/clear at a time. Debug builds assert the latter.
 */

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::time::{Duration, Instant};

#[cfg(debug_assertions)]
use std::sync::atomic::AtomicBool;

use crossbeam_utils::{Backoff, CachePadded};
use thiserror::Error;
use tracing::trace;

use crate::node::{Linked, NodePolicy, OwnedNode};
use crate::sync::park::{self, ParkOutcome};
use crate::sync::WakeResult;

/// Non-blocking dequeue outcomes that carry no node.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryDequeueError {
    /// The queue held no data.
    #[error("queue is empty")]
    Empty,

    /// A producer has claimed the tail slot but not yet finished linking
    /// its node; retry shortly.
    #[error("queue is settling after a concurrent enqueue")]
    Inconsistent,
}

/// Blocking dequeue outcomes that carry no node.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequeueError {
    /// The wait elapsed without data arriving. A normal outcome; the caller
    /// retries or treats the queue as (temporarily) empty.
    #[error("wait for a node timed out")]
    Timeout,
}

/// Lock-free multi-producer single-consumer FIFO.
///
/// `head` is the next position to read, `tail` the last node physically
/// linked (or the sentinel while the queue is settling). The sentinel is
/// heap-pinned: its address must stay stable for the lifetime of any
/// pending [`dequeue_wait_for`](Self::dequeue_wait_for), so it lives in its
/// own allocation rather than inline in the (movable) queue value.
pub struct MpscQueue<N: Linked, P: NodePolicy<N>> {
    /// Producer side: swapped by every enqueue.
    tail: CachePadded<AtomicPtr<N>>,
    /// Consumer side: only the single consumer reads or writes it.
    head: CachePadded<AtomicPtr<N>>,
    /// Pinned dummy node; never surfaced as application data.
    sentinel: NonNull<N>,
    policy: P,
    #[cfg(debug_assertions)]
    consumer_active: AtomicBool,
}

unsafe impl<N: Linked + Send, P: NodePolicy<N> + Send> Send for MpscQueue<N, P> {}
unsafe impl<N: Linked + Send, P: NodePolicy<N> + Sync> Sync for MpscQueue<N, P> {}

impl<N: Linked + Default, P: NodePolicy<N>> MpscQueue<N, P> {
    /// Create an empty queue bound to `policy`.
    ///
    /// The sentinel's payload comes from `N::default()` and is never read.
    pub fn new(policy: P) -> Self {
        let sentinel = NonNull::from(Box::leak(Box::new(N::default())));
        trace!(sentinel = ?sentinel.as_ptr(), "mpsc queue created");
        Self {
            tail: CachePadded::new(AtomicPtr::new(sentinel.as_ptr())),
            head: CachePadded::new(AtomicPtr::new(sentinel.as_ptr())),
            sentinel,
            policy,
            #[cfg(debug_assertions)]
            consumer_active: AtomicBool::new(false),
        }
    }
}

impl<N: Linked, P: NodePolicy<N>> MpscQueue<N, P> {
    /// The policy nodes are acquired from and released through.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Acquire a node for `value` and enqueue it. Callable from any thread.
    ///
    /// The policy's `acquire` runs before any shared state is touched, so a
    /// panicking acquisition leaves the queue unchanged.
    pub fn enqueue(&self, value: N) {
        self.enqueue_node(OwnedNode::acquire(&self.policy, value));
    }

    /// Enqueue an already-owned node. Exactly one atomic exchange; never
    /// blocks, never retries.
    pub fn enqueue_node(&self, node: OwnedNode<N, P>) {
        debug_assert!(
            self.policy.same_pool(node.policy()),
            "node transferred across pools"
        );
        self.link_node(node.into_raw().as_ptr());
    }

    /// Like [`enqueue`](Self::enqueue), additionally waking one consumer
    /// parked in [`dequeue_wait_for`](Self::dequeue_wait_for) when this
    /// enqueue took the queue out of the empty state.
    pub fn enqueue_notify(&self, value: N) {
        self.enqueue_node_notify(OwnedNode::acquire(&self.policy, value));
    }

    /// Notifying variant of [`enqueue_node`](Self::enqueue_node).
    pub fn enqueue_node_notify(&self, node: OwnedNode<N, P>) {
        debug_assert!(
            self.policy.same_pool(node.policy()),
            "node transferred across pools"
        );
        if self.link_node(node.into_raw().as_ptr()) {
            self.notify_one();
        }
    }

    /// Publish `node`; returns whether the previous tail was the sentinel
    /// (the queue looked empty to the consumer).
    fn link_node(&self, node: *mut N) -> bool {
        debug_assert!(unsafe { (*node).link().is_unlinked() }, "node already linked");
        unsafe { (*node).link().set_next(ptr::null_mut(), Ordering::Relaxed) };

        let prev = self.tail.swap(node, Ordering::AcqRel);
        // `prev` is exclusively ours between the swap and this store; the
        // release publishes the node's payload to the consumer.
        unsafe { (*prev).link().set_next(node, Ordering::Release) };
        prev == self.sentinel.as_ptr()
    }

    /// Detach the next node without blocking.
    ///
    /// Single-consumer only. `Err(Inconsistent)` means a producer is
    /// mid-publish; the caller retries rather than treating the queue as
    /// empty.
    pub fn try_dequeue(&self) -> Result<OwnedNode<N, P>, TryDequeueError> {
        #[cfg(debug_assertions)]
        let _guard = self.consumer_guard();
        unsafe { self.try_dequeue_inner() }
    }

    /// Detach the next node, spinning through the transient mid-publish
    /// window. Returns `None` only when the queue is truly empty.
    pub fn dequeue(&self) -> Option<OwnedNode<N, P>> {
        let backoff = Backoff::new();
        loop {
            match self.try_dequeue() {
                Ok(node) => return Some(node),
                Err(TryDequeueError::Empty) => return None,
                Err(TryDequeueError::Inconsistent) => backoff.snooze(),
            }
        }
    }

    /// Detach the next node, parking on the sentinel's link until a
    /// producer publishes data or `timeout` elapses (`None` waits
    /// indefinitely).
    ///
    /// An elapsed timeout is an ordinary outcome, not a failure. The only
    /// things that release a blocked consumer are a producer's notifying
    /// enqueue, an explicit [`notify_one`](Self::notify_one) /
    /// [`notify_all`](Self::notify_all), or the timeout.
    pub fn dequeue_wait_for(
        &self,
        timeout: Option<Duration>,
    ) -> Result<OwnedNode<N, P>, DequeueError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let backoff = Backoff::new();
        loop {
            match self.try_dequeue() {
                Ok(node) => return Ok(node),
                Err(TryDequeueError::Inconsistent) => {
                    backoff.snooze();
                    continue;
                }
                Err(TryDequeueError::Empty) => {}
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(DequeueError::Timeout);
                }
            }

            // Park on the sentinel's link. The validation runs under the
            // parking lock: if a producer has already linked past the
            // sentinel we skip the sleep and re-poll.
            let sentinel = unsafe { self.sentinel.as_ref() };
            let outcome = park::park(
                self.wait_address(),
                || sentinel.link().next(Ordering::Acquire).is_null(),
                deadline,
            );
            if outcome == ParkOutcome::TimedOut {
                trace!("dequeue wait timed out");
                return Err(DequeueError::Timeout);
            }
        }
    }

    /// Wake one consumer parked in `dequeue_wait_for`.
    pub fn notify_one(&self) -> WakeResult {
        WakeResult::from_count(park::unpark_one(self.wait_address()))
    }

    /// Wake every consumer parked in `dequeue_wait_for`.
    pub fn notify_all(&self) -> WakeResult {
        WakeResult::from_count(park::unpark_all(self.wait_address()))
    }

    /// Drain the queue, releasing every node through the policy.
    /// Single-consumer only.
    pub fn clear(&self) {
        while self.dequeue().is_some() {}
    }

    /// The address consumers park on: the sentinel's link word.
    #[inline]
    fn wait_address(&self) -> usize {
        unsafe { self.sentinel.as_ref() }.link().next_atomic() as *const _ as usize
    }

    /// Vyukov consumer path. Caller must be the single consumer.
    unsafe fn try_dequeue_inner(&self) -> Result<OwnedNode<N, P>, TryDequeueError> {
        let sentinel = self.sentinel.as_ptr();
        let mut head = self.head.load(Ordering::Relaxed);
        let mut next = (*head).link().next(Ordering::Acquire);

        if head == sentinel {
            if next.is_null() {
                return Err(TryDequeueError::Empty);
            }
            // Step past the sentinel; it stays linked until re-published.
            self.head.store(next, Ordering::Relaxed);
            head = next;
            next = (*head).link().next(Ordering::Acquire);
        }

        if !next.is_null() {
            self.head.store(next, Ordering::Relaxed);
            return Ok(self.take(head));
        }

        // `head` observed no successor: either it really is the last node,
        // or a producer swapped the tail and has not linked yet.
        let tail = self.tail.load(Ordering::Acquire);
        if head != tail {
            return Err(TryDequeueError::Inconsistent);
        }

        // `head` is the last node. Re-publish the sentinel behind it so the
        // chain never runs out from under the consumer.
        (*sentinel).link().set_next(ptr::null_mut(), Ordering::Relaxed);
        let prev = self.tail.swap(sentinel, Ordering::AcqRel);
        (*prev).link().set_next(sentinel, Ordering::Release);

        next = (*head).link().next(Ordering::Acquire);
        if next.is_null() {
            // Another producer won the tail between our check and the
            // re-publish; its link is still in flight.
            return Err(TryDequeueError::Inconsistent);
        }
        self.head.store(next, Ordering::Relaxed);
        Ok(self.take(head))
    }

    /// Hand `node` to the consumer as an owned handle.
    unsafe fn take(&self, node: *mut N) -> OwnedNode<N, P> {
        (*node).link().set_next(ptr::null_mut(), Ordering::Relaxed);
        OwnedNode::from_raw(NonNull::new_unchecked(node), self.policy.clone())
    }

    #[cfg(debug_assertions)]
    fn consumer_guard(&self) -> ConsumerGuard<'_> {
        assert!(
            !self.consumer_active.swap(true, Ordering::Acquire),
            "MpscQueue: concurrent consumer-side calls (single-consumer contract violated)"
        );
        ConsumerGuard {
            flag: &self.consumer_active,
        }
    }
}

#[cfg(debug_assertions)]
struct ConsumerGuard<'a> {
    flag: &'a AtomicBool,
}

#[cfg(debug_assertions)]
impl Drop for ConsumerGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<N: Linked + Default, P: NodePolicy<N> + Default> Default for MpscQueue<N, P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<N: Linked, P: NodePolicy<N>> Drop for MpscQueue<N, P> {
    fn drop(&mut self) {
        self.clear();
        // The sentinel never flows through the policy.
        drop(unsafe { Box::from_raw(self.sentinel.as_ptr()) });
    }
}

impl<N: Linked, P: NodePolicy<N>> fmt::Debug for MpscQueue<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpscQueue")
            .field("sentinel", &self.sentinel.as_ptr())
            .finish()
    }
}
