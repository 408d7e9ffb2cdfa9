/*!
 * MPSC Queue
 *
 * Lock-free Vyukov-style FIFO over intrusively linked nodes: wait-free
 * enqueue from any thread (one atomic exchange, never a retry), single
 * consumer dequeue with an optional futex-backed blocking variant, and a
 * permanently resident sentinel node resolving the enqueue/dequeue race at
 * the tail.
 */

mod mpsc;

pub use mpsc::{DequeueError, MpscQueue, TryDequeueError};
