/*!
 * Address-Keyed Parking
 *
 * Thin layer over `parking_lot_core`. The parked address itself is the key
 * (no hashing, no slot table): the queue parks its consumer on the
 * sentinel's link address, and the portable futex backend parks on the
 * waited word's address. `parking_lot_core` serializes the validation
 * closure against wake-ups on the same key, which is what makes the
 * check-then-sleep race-free.
 */

use std::time::Instant;

use parking_lot_core::{ParkResult, ParkToken, UnparkToken};

const TOKEN: ParkToken = ParkToken(0);

/// Why a parked thread resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParkOutcome {
    /// The validation closure failed: the watched state changed before the
    /// thread went to sleep.
    ValueChanged,
    /// Explicitly woken by an unpark.
    Notified,
    /// The deadline elapsed with no wake-up.
    TimedOut,
}

/// Park the calling thread on `addr` until unparked or `deadline`.
///
/// `validate` runs under the parking lock; the thread only sleeps if it
/// returns `true`. A waker that changes the watched state and then unparks
/// `addr` can therefore never be missed.
pub(crate) fn park(
    addr: usize,
    validate: impl FnOnce() -> bool,
    deadline: Option<Instant>,
) -> ParkOutcome {
    let result = unsafe {
        parking_lot_core::park(addr, validate, || {}, |_, _| {}, TOKEN, deadline)
    };
    match result {
        ParkResult::Unparked(_) => ParkOutcome::Notified,
        ParkResult::Invalid => ParkOutcome::ValueChanged,
        ParkResult::TimedOut => ParkOutcome::TimedOut,
    }
}

/// Wake at most one thread parked on `addr`; returns the number woken.
pub(crate) fn unpark_one(addr: usize) -> usize {
    let result = unsafe { parking_lot_core::unpark_one(addr, |_| UnparkToken(0)) };
    result.unparked_threads
}

/// Wake every thread parked on `addr`; returns the number woken.
pub(crate) fn unpark_all(addr: usize) -> usize {
    unsafe { parking_lot_core::unpark_all(addr, UnparkToken(0)) }
}
