/*!
 * Intrusive MPSC Messaging Core
 *
 * Lock-free multi-producer/single-consumer building blocks over intrusively
 * linked nodes:
 * - `MultiProducerStack`: Treiber stack with an O(1) bulk hand-off to a
 *   single consumer
 * - `MpscQueue`: Vyukov-style FIFO with a futex-backed blocking dequeue
 * - `ForwardList`: the consumer-side plain list produced by a bulk hand-off
 * - `NodePolicy` / `OwnedNode`: the node-ownership layer that lets arbitrary
 *   node types plug into all of the above without per-node heap bookkeeping
 *
 * # Concurrency discipline
 *
 * Any number of threads may push/enqueue concurrently; exactly one thread
 * may pop/dequeue/drain at a time. This is a hard precondition (checked by
 * assertion in debug builds), not something the algorithms defend against.
 */

pub mod list;
pub mod node;
pub mod queue;
pub mod stack;
pub mod sync;

// Re-exports
pub use list::ForwardList;
pub use node::{BoxPolicy, Link, Linked, NodePolicy, OwnedNode};
pub use queue::{DequeueError, MpscQueue, TryDequeueError};
pub use stack::MultiProducerStack;
pub use sync::{Futex, WaitOutcome, WakeResult};
