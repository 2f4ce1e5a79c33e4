//! Cache replacement policies.
//!
//! Each policy is driven directly through `touch`, `fill` and `victim` on a
//! single four-way set.

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use sssim_core::core::units::cache::policies::{
    FifoPolicy, LruPolicy, RandomPolicy, ReplacementPolicy,
};

fn fill_all(policy: &mut impl ReplacementPolicy) {
    for way in 0..4 {
        policy.fill(0, way);
    }
}

#[test]
fn lru_initial_victim_is_last_way() {
    let mut policy = LruPolicy::new(1, 4);
    assert_eq!(policy.victim(0), 3);
}

#[test]
fn lru_evicts_least_recent_after_reuse() {
    let mut policy = LruPolicy::new(1, 4);
    fill_all(&mut policy);
    assert_eq!(policy.victim(0), 0);

    policy.touch(0, 0);
    assert_eq!(policy.victim(0), 1);
    policy.touch(0, 1);
    assert_eq!(policy.victim(0), 2);
}

#[test]
fn lru_sets_are_independent() {
    let mut policy = LruPolicy::new(2, 2);
    policy.fill(0, 0);
    policy.fill(0, 1);
    policy.touch(1, 1);
    assert_eq!(policy.victim(0), 0);
    assert_eq!(policy.victim(1), 0);
}

#[test]
fn fifo_follows_fill_order() {
    let mut policy = FifoPolicy::new(1, 4);
    fill_all(&mut policy);
    assert_eq!(policy.victim(0), 0);

    // Hits do not reorder.
    policy.touch(0, 0);
    assert_eq!(policy.victim(0), 0);

    policy.fill(0, 0);
    assert_eq!(policy.victim(0), 1);
    policy.fill(0, 1);
    assert_eq!(policy.victim(0), 2);
}

#[test]
fn random_stays_in_range_and_spreads() {
    let mut policy = RandomPolicy::new(4);
    let picks: HashSet<usize> = (0..64).map(|_| policy.victim(0)).collect();
    assert!(picks.iter().all(|&w| w < 4));
    assert!(picks.len() > 1, "always picked {picks:?}");
}

#[test]
fn random_sequence_is_reproducible() {
    let mut a = RandomPolicy::new(8);
    let mut b = RandomPolicy::new(8);
    let first: Vec<_> = (0..16).map(|_| a.victim(0)).collect();
    let second: Vec<_> = (0..16).map(|_| b.victim(0)).collect();
    assert_eq!(first, second);
}
