/*!
 * Shared Test Support
 *
 * A tagged test node plus an instrumented policy that counts every
 * acquire/release pair, so suites can assert round-trip ownership at
 * teardown (no leaks, no double release).
 */

// Each test binary compiles this module separately; not every binary uses
// every helper.
#![allow(dead_code)]

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use intrusive_mpsc::{Link, Linked, NodePolicy};

/// Payload-bearing node with a secondary tag for stability checks.
#[derive(Debug, Default)]
pub struct TestNode {
    pub value: u64,
    pub tag: u64,
    link: Link<TestNode>,
}

impl TestNode {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            tag: 0,
            link: Link::new(),
        }
    }

    pub fn tagged(value: u64, tag: u64) -> Self {
        Self {
            value,
            tag,
            link: Link::new(),
        }
    }
}

impl Linked for TestNode {
    fn link(&self) -> &Link<Self> {
        &self.link
    }
}

#[derive(Default)]
pub struct Counts {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// Heap policy that tallies acquires and releases.
#[derive(Clone, Default)]
pub struct CountingPolicy {
    counts: Arc<Counts>,
}

impl CountingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> usize {
        self.counts.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counts.released.load(Ordering::SeqCst)
    }

    /// Every acquired node has been handed to exactly one release.
    pub fn balanced(&self) -> bool {
        self.acquired() == self.released()
    }
}

impl NodePolicy<TestNode> for CountingPolicy {
    fn acquire(&self, value: TestNode) -> NonNull<TestNode> {
        self.counts.acquired.fetch_add(1, Ordering::SeqCst);
        NonNull::from(Box::leak(Box::new(value)))
    }

    unsafe fn release(&self, node: NonNull<TestNode>) {
        self.counts.released.fetch_add(1, Ordering::SeqCst);
        drop(Box::from_raw(node.as_ptr()));
    }

    fn same_pool(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.counts, &other.counts)
    }
}
