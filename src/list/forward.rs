/*!
 * Forward List
 *
 * Singly-linked list of intrusively linked nodes with merge/sort/splice
 * support, all by pointer relinking. No node is ever copied and no memory
 * is allocated by the list itself; nodes enter through a policy or through
 * a detached chain and leave through `pop_front` or the policy's `release`.
 *
 * All link accesses are relaxed: the precondition for every operation is
 * that exclusive ownership of the chain was already established (e.g. via
 * `MultiProducerStack::consume`).
 */

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::Ordering;

use crate::node::{Linked, NodePolicy, OwnedNode};

/// Single-threaded list over already-linked nodes.
pub struct ForwardList<N: Linked, P: NodePolicy<N>> {
    head: *mut N,
    policy: P,
}

// The list owns every node reachable from `head`.
unsafe impl<N: Linked + Send, P: NodePolicy<N> + Send> Send for ForwardList<N, P> {}

#[inline(always)]
fn next_of<N: Linked>(node: *mut N) -> *mut N {
    unsafe { (*node).link().next(Ordering::Relaxed) }
}

#[inline(always)]
fn set_next<N: Linked>(node: *mut N, next: *mut N) {
    unsafe { (*node).link().set_next(next, Ordering::Relaxed) };
}

impl<N: Linked, P: NodePolicy<N>> ForwardList<N, P> {
    /// Create an empty list bound to `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            head: ptr::null_mut(),
            policy,
        }
    }

    /// Adopt a detached chain.
    ///
    /// # Safety
    ///
    /// `head` must be the start of a valid, acyclic, null-terminated chain
    /// whose nodes were all acquired from `policy`'s pool, with no other
    /// owner and no concurrent access.
    pub(crate) unsafe fn from_raw_chain(head: *mut N, policy: P) -> Self {
        Self { head, policy }
    }

    /// The policy nodes of this list are released through.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Whether the list holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Number of nodes. O(n) walk; the list keeps no counter.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Borrow the first node.
    pub fn front(&self) -> Option<&N> {
        unsafe { self.head.as_ref() }
    }

    /// Acquire a node for `value` and link it at the front. O(1).
    pub fn push_front(&mut self, value: N) {
        self.push_front_node(OwnedNode::acquire(&self.policy, value));
    }

    /// Link an already-owned node at the front. O(1), no allocation.
    pub fn push_front_node(&mut self, node: OwnedNode<N, P>) {
        debug_assert!(
            self.policy.same_pool(node.policy()),
            "node transferred across pools"
        );
        let node = node.into_raw().as_ptr();
        debug_assert!(unsafe { (*node).link().is_unlinked() }, "node already linked");
        set_next(node, self.head);
        self.head = node;
    }

    /// Detach and return the first node. O(1).
    pub fn pop_front(&mut self) -> Option<OwnedNode<N, P>> {
        let node = NonNull::new(self.head)?;
        self.head = next_of(node.as_ptr());
        set_next(node.as_ptr(), ptr::null_mut());
        Some(unsafe { OwnedNode::from_raw(node, self.policy.clone()) })
    }

    /// Release every node through the policy.
    pub fn clear(&mut self) {
        let mut cur = std::mem::replace(&mut self.head, ptr::null_mut());
        while !cur.is_null() {
            let next = next_of(cur);
            set_next(cur, ptr::null_mut());
            unsafe { self.policy.release(NonNull::new_unchecked(cur)) };
            cur = next;
        }
    }

    /// Iterate the nodes front to back.
    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            cur: self.head,
            _marker: PhantomData,
        }
    }

    /// Merge `other` into `self`, assuming both lists are individually
    /// ordered by `less`. Stable: on ties, nodes already in `self` come
    /// first. O(n+m), pure relinking.
    pub fn merge_by<F>(&mut self, other: &mut Self, mut less: F)
    where
        F: FnMut(&N, &N) -> bool,
    {
        debug_assert!(
            self.policy.same_pool(&other.policy),
            "merge across pools"
        );
        let b = std::mem::replace(&mut other.head, ptr::null_mut());
        self.head = merge_chains(self.head, b, &mut less);
    }

    /// Sort by `less` using an iterative bottom-up merge sort.
    /// O(n log n), stable, pure relinking.
    pub fn sort_by<F>(&mut self, mut less: F)
    where
        F: FnMut(&N, &N) -> bool,
    {
        if self.head.is_null() || next_of(self.head).is_null() {
            return;
        }

        // Bottom-up scheme: repeatedly merge adjacent runs of `width`
        // nodes until a single run remains.
        let mut width = 1usize;
        let mut list = self.head;
        loop {
            let mut rest = list;
            list = ptr::null_mut();
            let mut tail: *mut N = ptr::null_mut();
            let mut merges = 0usize;

            while !rest.is_null() {
                merges += 1;

                // First run: up to `width` nodes starting at `rest`.
                let mut a = rest;
                let mut a_len = 0usize;
                let mut b = rest;
                while a_len < width && !b.is_null() {
                    a_len += 1;
                    b = next_of(b);
                }
                let mut b_len = width;
                rest = ptr::null_mut();

                // Merge run `a` (a_len nodes) with run `b` (at most width).
                while a_len > 0 || (b_len > 0 && !b.is_null()) {
                    let pick_b = if a_len == 0 {
                        true
                    } else if b_len == 0 || b.is_null() {
                        false
                    } else {
                        // Strictly-less keeps the earlier run's node on
                        // ties, preserving stability.
                        unsafe { less(&*b, &*a) }
                    };

                    let node;
                    if pick_b {
                        node = b;
                        b = next_of(b);
                        b_len -= 1;
                    } else {
                        node = a;
                        a = next_of(a);
                        a_len -= 1;
                    }

                    if tail.is_null() {
                        list = node;
                    } else {
                        set_next(tail, node);
                    }
                    tail = node;
                }

                rest = b;
            }
            set_next(tail, ptr::null_mut());

            if merges <= 1 {
                self.head = list;
                return;
            }
            width *= 2;
        }
    }

    /// Detach every node matching `pred` into a new list, preserving the
    /// relative order of both kept and removed nodes. Single pass, O(n).
    ///
    /// The returned scratch list owns the removed nodes; dropping it
    /// releases them through the policy.
    pub fn remove_if<F>(&mut self, mut pred: F) -> Self
    where
        F: FnMut(&N) -> bool,
    {
        let mut removed = Self::new(self.policy.clone());
        let mut removed_tail: *mut N = ptr::null_mut();

        let mut prev: *mut N = ptr::null_mut();
        let mut cur = self.head;
        while !cur.is_null() {
            let next = next_of(cur);
            if pred(unsafe { &*cur }) {
                if prev.is_null() {
                    self.head = next;
                } else {
                    set_next(prev, next);
                }
                set_next(cur, ptr::null_mut());
                if removed_tail.is_null() {
                    removed.head = cur;
                } else {
                    set_next(removed_tail, cur);
                }
                removed_tail = cur;
            } else {
                prev = cur;
            }
            cur = next;
        }
        removed
    }

    /// Detach every node that `same(prev, cur)` reports equal to its
    /// predecessor, keeping the first of each run. Single pass, O(n).
    pub fn dedup_by<F>(&mut self, mut same: F) -> Self
    where
        F: FnMut(&N, &N) -> bool,
    {
        let mut removed = Self::new(self.policy.clone());
        let mut removed_tail: *mut N = ptr::null_mut();

        let mut cur = self.head;
        if cur.is_null() {
            return removed;
        }
        let mut next = next_of(cur);
        while !next.is_null() {
            if same(unsafe { &*cur }, unsafe { &*next }) {
                let after = next_of(next);
                set_next(cur, after);
                set_next(next, ptr::null_mut());
                if removed_tail.is_null() {
                    removed.head = next;
                } else {
                    set_next(removed_tail, next);
                }
                removed_tail = next;
                next = after;
            } else {
                cur = next;
                next = next_of(next);
            }
        }
        removed
    }

    /// Move `count` nodes of `other`, starting at index `first`, into
    /// `self` after position `pos` (`None` inserts at the front).
    ///
    /// The relink itself is O(1); resolving the positions is a linear walk.
    /// Splicing zero nodes is a no-op. For moving a range within one list
    /// use [`splice_within`](Self::splice_within).
    ///
    /// # Panics
    ///
    /// Panics if `pos` or the source range is out of bounds.
    pub fn splice_after(
        &mut self,
        pos: Option<usize>,
        other: &mut Self,
        first: usize,
        count: usize,
    ) {
        debug_assert!(
            self.policy.same_pool(&other.policy),
            "splice across pools"
        );
        if count == 0 {
            return;
        }

        let (before, range_head, range_tail) = other.cut_range(first, count);
        if before.is_null() {
            other.head = next_of(range_tail);
        } else {
            set_next(before, next_of(range_tail));
        }
        self.insert_range_after(pos, range_head, range_tail);
    }

    /// Move `count` nodes starting at index `first` to the position after
    /// `pos` within this list. Self-splices that would leave the list
    /// unchanged (adjacent positions, or a target inside the moved range)
    /// are no-ops.
    ///
    /// # Panics
    ///
    /// Panics if `pos` or the range is out of bounds.
    pub fn splice_within(&mut self, pos: Option<usize>, first: usize, count: usize) {
        if count == 0 {
            return;
        }
        match pos {
            None if first == 0 => return,
            Some(p) if p + 1 == first => return,
            Some(p) if p >= first && p < first + count => return,
            _ => {}
        }

        let (before, range_head, range_tail) = self.cut_range(first, count);
        if before.is_null() {
            self.head = next_of(range_tail);
        } else {
            set_next(before, next_of(range_tail));
        }

        // Positions after the removed range shifted down by `count`.
        let pos = match pos {
            Some(p) if p >= first + count => Some(p - count),
            other => other,
        };
        self.insert_range_after(pos, range_head, range_tail);
    }

    /// Node pointer at `index`, panicking past the end.
    fn node_at(&self, index: usize) -> *mut N {
        let mut cur = self.head;
        for _ in 0..index {
            assert!(!cur.is_null(), "position out of bounds");
            cur = next_of(cur);
        }
        assert!(!cur.is_null(), "position out of bounds");
        cur
    }

    /// Resolve `[first, first + count)` to (predecessor, head, tail)
    /// pointers without unlinking. Predecessor is null when `first == 0`.
    fn cut_range(&self, first: usize, count: usize) -> (*mut N, *mut N, *mut N) {
        let before = if first == 0 {
            ptr::null_mut()
        } else {
            self.node_at(first - 1)
        };
        let range_head = if before.is_null() {
            assert!(!self.head.is_null(), "range out of bounds");
            self.head
        } else {
            let head = next_of(before);
            assert!(!head.is_null(), "range out of bounds");
            head
        };
        let mut range_tail = range_head;
        for _ in 1..count {
            range_tail = next_of(range_tail);
            assert!(!range_tail.is_null(), "range out of bounds");
        }
        (before, range_head, range_tail)
    }

    /// Link the detached chain `range_head..=range_tail` after `pos`.
    fn insert_range_after(&mut self, pos: Option<usize>, range_head: *mut N, range_tail: *mut N) {
        match pos {
            None => {
                set_next(range_tail, self.head);
                self.head = range_head;
            }
            Some(p) => {
                let at = self.node_at(p);
                set_next(range_tail, next_of(at));
                set_next(at, range_head);
            }
        }
    }
}

/// Stable two-way merge of two ordered chains.
fn merge_chains<N: Linked, F>(a: *mut N, b: *mut N, less: &mut F) -> *mut N
where
    F: FnMut(&N, &N) -> bool,
{
    if a.is_null() {
        return b;
    }
    if b.is_null() {
        return a;
    }

    let mut a = a;
    let mut b = b;
    let head;
    if unsafe { less(&*b, &*a) } {
        head = b;
        b = next_of(b);
    } else {
        head = a;
        a = next_of(a);
    }

    let mut tail = head;
    loop {
        if a.is_null() {
            set_next(tail, b);
            break;
        }
        if b.is_null() {
            set_next(tail, a);
            break;
        }
        if unsafe { less(&*b, &*a) } {
            set_next(tail, b);
            tail = b;
            b = next_of(b);
        } else {
            set_next(tail, a);
            tail = a;
            a = next_of(a);
        }
    }
    head
}

impl<N: Linked, P: NodePolicy<N> + Default> Default for ForwardList<N, P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<N: Linked, P: NodePolicy<N>> Drop for ForwardList<N, P> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<N: Linked + fmt::Debug, P: NodePolicy<N>> fmt::Debug for ForwardList<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Front-to-back borrowing iterator over a [`ForwardList`].
pub struct Iter<'a, N: Linked> {
    cur: *mut N,
    _marker: PhantomData<&'a N>,
}

impl<'a, N: Linked> Iterator for Iter<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<&'a N> {
        let node = unsafe { self.cur.as_ref()? };
        self.cur = node.link().next(Ordering::Relaxed);
        Some(node)
    }
}
