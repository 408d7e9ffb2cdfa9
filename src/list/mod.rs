/*!
 * Consumer-Side Forward List
 *
 * Plain singly-linked list over already-owned nodes. This is the view the
 * single consumer works with after a bulk hand-off from
 * [`MultiProducerStack::consume`](crate::MultiProducerStack::consume); every
 * operation assumes exclusive access and performs no atomic synchronization.
 */

mod forward;

pub use forward::{ForwardList, Iter};
