/*!
 * Node Capability and Ownership
 *
 * The contract a type must satisfy to act as an intrusively linked node
 * (`Link` + `Linked`), the pluggable allocation strategy that is the only
 * place aware of how nodes are produced and reclaimed (`NodePolicy`), and
 * the move-only handle that guarantees every acquired node is released
 * exactly once (`OwnedNode`).
 */

mod handle;
mod link;
mod policy;

pub use handle::OwnedNode;
pub use link::{Link, Linked};
pub use policy::{BoxPolicy, NodePolicy};
