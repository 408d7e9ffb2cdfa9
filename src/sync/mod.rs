/*!
 * Blocking Primitives
 *
 * The only suspension point in the crate lives here: an address-keyed
 * parking layer (the portable futex emulation) and the platform-neutral
 * [`Futex`] word built on top of it, with a raw `futex(2)` backend on
 * Linux. Everything else in the crate either spins briefly or runs a
 * single atomic instruction.
 */

pub(crate) mod park;

mod futex;

pub use futex::{Futex, WaitOutcome, WakeResult};
