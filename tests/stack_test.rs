/*!
 * Multi-Producer Stack Integration Tests
 *
 * LIFO ordering, concurrent no-loss, bulk hand-off semantics, and
 * round-trip ownership accounting.
 */

mod common;

use common::{CountingPolicy, TestNode};
use intrusive_mpsc::MultiProducerStack;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Stack = MultiProducerStack<TestNode, CountingPolicy>;

#[test]
fn test_lifo_single_producer() {
    let policy = CountingPolicy::new();
    let stack = Stack::new(policy.clone());

    for v in 1..=100 {
        stack.push_front(TestNode::new(v));
    }

    let list = stack.consume();
    let values: Vec<u64> = list.iter().map(|n| n.value).collect();
    let expected: Vec<u64> = (1..=100).rev().collect();
    assert_eq!(values, expected);

    drop(list);
    drop(stack);
    assert!(policy.balanced(), "acquire/release counts diverged");
}

#[test]
fn test_no_loss_under_concurrent_producers() {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 5_000;

    let policy = CountingPolicy::new();
    let stack = Arc::new(Stack::new(policy.clone()));
    let done = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let stack = stack.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    stack.push_front(TestNode::new(p * PER_PRODUCER + i));
                }
            })
        })
        .collect();

    // Single consumer drains concurrently via repeated bulk hand-offs.
    let consumer = {
        let stack = stack.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut seen = HashSet::new();
            loop {
                let mut list = stack.consume();
                while let Some(node) = list.pop_front() {
                    assert!(seen.insert(node.value), "value surfaced twice");
                }
                if done.load(Ordering::Acquire) && stack.is_empty() {
                    // One final sweep for pushes that raced the flag.
                    let mut list = stack.consume();
                    while let Some(node) = list.pop_front() {
                        assert!(seen.insert(node.value));
                    }
                    return seen;
                }
                thread::yield_now();
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    done.store(true, Ordering::Release);

    let seen = consumer.join().unwrap();
    assert_eq!(seen.len(), (PRODUCERS * PER_PRODUCER) as usize);

    drop(stack);
    assert!(policy.balanced());
}

#[test]
fn test_consume_empty_is_idempotent() {
    let stack = Stack::new(CountingPolicy::new());
    for _ in 0..5 {
        assert!(stack.consume().is_empty());
        stack.clear();
        assert!(stack.is_empty());
    }
}

#[test]
fn test_consumed_list_supports_non_atomic_processing() {
    let policy = CountingPolicy::new();
    let stack = Stack::new(policy.clone());
    for v in [3u64, 1, 4, 1, 5, 9, 2, 6] {
        stack.push_front(TestNode::new(v));
    }

    let mut list = stack.consume();
    list.sort_by(|a, b| a.value < b.value);
    let removed = list.remove_if(|n| n.value > 4);

    let kept: Vec<u64> = list.iter().map(|n| n.value).collect();
    assert_eq!(kept, vec![1, 1, 2, 3, 4]);
    assert_eq!(removed.len(), 3);

    drop(list);
    drop(removed);
    drop(stack);
    assert!(policy.balanced());
}

#[test]
fn test_pop_front_under_single_consumer() {
    let policy = CountingPolicy::new();
    let stack = Arc::new(Stack::new(policy.clone()));

    let producers: Vec<_> = (0..2u64)
        .map(|p| {
            let stack = stack.clone();
            thread::spawn(move || {
                for i in 0..1_000 {
                    stack.push_front(TestNode::new(p * 1_000 + i));
                }
            })
        })
        .collect();

    // Single popper running concurrently with the producers.
    let mut popped = 0usize;
    while popped < 2_000 {
        if stack.pop_front().is_some() {
            popped += 1;
        } else {
            thread::sleep(Duration::from_micros(50));
        }
    }

    for handle in producers {
        handle.join().unwrap();
    }
    assert!(stack.pop_front().is_none());
    drop(stack);
    assert!(policy.balanced());
}

#[test]
fn test_drop_with_pending_nodes_releases_all() {
    let policy = CountingPolicy::new();
    {
        let stack = Stack::new(policy.clone());
        for v in 0..50 {
            stack.push_front(TestNode::new(v));
        }
    }
    assert_eq!(policy.acquired(), 50);
    assert_eq!(policy.released(), 50);
}
