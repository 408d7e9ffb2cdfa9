/*!
 * Intrusive Link
 *
 * The link cell embedded in every node. Wraps an `AtomicPtr` so the same
 * field serves both the single-threaded consumer-side list (relaxed
 * operations under exclusive ownership) and the lock-free structures
 * (release/acquire publication between producers and the consumer).
 */

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Intrusive `next` link.
///
/// Embed one of these in a node type and expose it through [`Linked`] to
/// make the type usable with every container in this crate. A node is
/// linked into **at most one** structure at a time; before being pushed its
/// link must be null ("unlinked").
pub struct Link<N> {
    next: AtomicPtr<N>,
}

impl<N> Link<N> {
    /// Create an unlinked link.
    pub const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Load the successor pointer.
    #[inline(always)]
    pub fn next(&self, order: Ordering) -> *mut N {
        self.next.load(order)
    }

    /// Store the successor pointer.
    #[inline(always)]
    pub fn set_next(&self, next: *mut N, order: Ordering) {
        self.next.store(next, order);
    }

    /// The underlying atomic, for callers that need its address (the queue
    /// parks waiting consumers on the sentinel's link).
    #[inline(always)]
    pub fn next_atomic(&self) -> &AtomicPtr<N> {
        &self.next
    }

    /// Advisory check that this link points nowhere.
    ///
    /// A node at the tail of a structure also has a null link, so a `true`
    /// here does not prove the node is outside every container; it is used
    /// for debug assertions on the push paths.
    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.next.load(Ordering::Relaxed).is_null()
    }
}

impl<N> Default for Link<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> fmt::Debug for Link<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("next", &self.next.load(Ordering::Relaxed))
            .finish()
    }
}

/// Capability contract for intrusively linked node types.
///
/// Structural, not inheritance-based: any type that can hand out a reference
/// to an embedded [`Link`] qualifies, regardless of layout.
///
/// # Examples
///
/// ```
/// use intrusive_mpsc::{Link, Linked};
///
/// struct Message {
///     payload: u64,
///     link: Link<Message>,
/// }
///
/// impl Linked for Message {
///     fn link(&self) -> &Link<Self> {
///         &self.link
///     }
/// }
/// ```
pub trait Linked: Sized {
    /// Access the node's embedded link.
    fn link(&self) -> &Link<Self>;
}
