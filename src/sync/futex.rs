/*!
 * Futex
 *
 * Platform-neutral wait/notify on a 32-bit word. On Linux this issues raw
 * `futex(2)` syscalls (`FUTEX_WAIT_PRIVATE` / `FUTEX_WAKE_PRIVATE`); on
 * every other platform it falls back to the address-keyed parking layer.
 * One contract above both backends: a thread blocks only if the word still
 * holds the expected value at the moment of the check, and wakes on
 * notify, timeout, or (raw backend only) signal interruption.
 */

use std::sync::atomic::AtomicU32;
use std::time::Duration;

#[cfg(not(target_os = "linux"))]
use std::sync::atomic::Ordering;
#[cfg(not(target_os = "linux"))]
use std::time::Instant;

#[cfg(target_os = "linux")]
use tracing::trace;

#[cfg(not(target_os = "linux"))]
use super::park;

/// Outcome of a [`Futex::wait`] call. The first four variants are disjoint;
/// any other platform status surfaces as [`Failed`](WaitOutcome::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The word no longer held the expected value; the call returned
    /// without blocking (or before sleeping).
    ValueChanged,
    /// A notify woke the thread.
    Notified,
    /// The timeout elapsed. A normal, non-exceptional outcome.
    TimedOut,
    /// A signal interrupted the wait (raw Linux backend only; the parking
    /// emulation never reports this).
    Interrupted,
    /// Generic platform failure, carrying the raw status code.
    Failed(i32),
}

impl WaitOutcome {
    /// Whether the wait ended because progress is possible (value changed
    /// or notified).
    #[inline(always)]
    pub fn is_success(&self) -> bool {
        matches!(self, WaitOutcome::ValueChanged | WaitOutcome::Notified)
    }

    #[inline(always)]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }
}

/// Result of a wake operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1).
    Woken(usize),
    /// No waiters were waiting.
    NoWaiters,
}

impl WakeResult {
    /// Check if any waiters were woken.
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none).
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }

    #[inline]
    pub(crate) fn from_count(n: usize) -> Self {
        if n == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(n)
        }
    }
}

/// A 32-bit word threads can block on.
///
/// The word's address is the wait channel, so a `Futex` must stay at a
/// stable address while any wait on it may be in flight (holding the
/// borrow for the duration of `wait` already guarantees this).
pub struct Futex {
    word: AtomicU32,
}

impl Futex {
    /// Create a futex word with the given initial value.
    pub const fn new(value: u32) -> Self {
        Self {
            word: AtomicU32::new(value),
        }
    }

    /// The underlying atomic word.
    #[inline(always)]
    pub fn value(&self) -> &AtomicU32 {
        &self.word
    }

    /// Block until the word changes away from `expected`, a notify arrives,
    /// or `timeout` elapses (`None` waits indefinitely).
    ///
    /// Returns immediately with [`WaitOutcome::ValueChanged`] if the word
    /// already differs from `expected` at the moment of the check.
    pub fn wait(&self, expected: u32, timeout: Option<Duration>) -> WaitOutcome {
        self.wait_impl(expected, timeout)
    }

    /// Wake at most one waiter. Returns how many were woken (0 or 1).
    pub fn notify_one(&self) -> WakeResult {
        self.notify_impl(1)
    }

    /// Wake every waiter. The reported count is platform-dependent in
    /// precision; the parking backend is exact.
    pub fn notify_all(&self) -> WakeResult {
        self.notify_impl(i32::MAX as usize)
    }

    #[cfg(target_os = "linux")]
    fn wait_impl(&self, expected: u32, timeout: Option<Duration>) -> WaitOutcome {
        let ts = timeout.map(|t| libc::timespec {
            tv_sec: t.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: t.subsec_nanos() as libc::c_long,
        });
        let ts_ptr = ts
            .as_ref()
            .map_or(std::ptr::null(), |ts| ts as *const libc::timespec);

        let rc = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.word.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                ts_ptr,
            )
        };
        if rc == 0 {
            return WaitOutcome::Notified;
        }
        match std::io::Error::last_os_error().raw_os_error() {
            Some(libc::EAGAIN) => WaitOutcome::ValueChanged,
            Some(libc::ETIMEDOUT) => WaitOutcome::TimedOut,
            Some(libc::EINTR) => WaitOutcome::Interrupted,
            code => {
                let code = code.unwrap_or(0);
                trace!(code, "futex wait failed");
                WaitOutcome::Failed(code)
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn notify_impl(&self, max: usize) -> WakeResult {
        let rc = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.word.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                max.min(i32::MAX as usize) as libc::c_int,
            )
        };
        if rc < 0 {
            trace!(
                code = std::io::Error::last_os_error().raw_os_error(),
                "futex wake failed"
            );
            return WakeResult::NoWaiters;
        }
        WakeResult::from_count(rc as usize)
    }

    #[cfg(not(target_os = "linux"))]
    fn wait_impl(&self, expected: u32, timeout: Option<Duration>) -> WaitOutcome {
        let deadline = timeout.map(|t| Instant::now() + t);
        let outcome = park::park(
            self.word.as_ptr() as usize,
            || self.word.load(Ordering::Acquire) == expected,
            deadline,
        );
        match outcome {
            park::ParkOutcome::ValueChanged => WaitOutcome::ValueChanged,
            park::ParkOutcome::Notified => WaitOutcome::Notified,
            park::ParkOutcome::TimedOut => WaitOutcome::TimedOut,
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn notify_impl(&self, max: usize) -> WakeResult {
        let addr = self.word.as_ptr() as usize;
        let woken = if max == 1 {
            park::unpark_one(addr)
        } else {
            park::unpark_all(addr)
        };
        WakeResult::from_count(woken)
    }
}

impl Default for Futex {
    fn default() -> Self {
        Self::new(0)
    }
}
