/*!
 * Multi-Producer Stack
 *
 * Lock-free Treiber stack with an O(1) bulk hand-off: any number of threads
 * push concurrently, and a single consumer detaches the whole chain at once
 * into a [`ForwardList`](crate::ForwardList) for non-atomic processing.
 */

mod treiber;

pub use treiber::MultiProducerStack;
