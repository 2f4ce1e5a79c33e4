//! Set-associative data cache.
//!
//! The test cache has 4 lines of 16 bytes in 2 ways, so 2 sets:
//! set index = (addr / 16) % 2. Blocks `0x00`, `0x20` and `0x40` all
//! compete for set 0; `0x10` lives in set 1.

use pretty_assertions::assert_eq;
use rstest::rstest;
use sssim_core::config::{CacheConfig, ReplacementPolicy, WritePolicy};
use sssim_core::core::units::cache::Cache;

const HIT: u64 = 2;
const MISS: u64 = 10;

fn config(replacement: ReplacementPolicy, write_policy: WritePolicy) -> CacheConfig {
    CacheConfig {
        enabled: true,
        lines: 4,
        associativity: 2,
        line_size: 16,
        replacement,
        write_policy,
        hit_latency: HIT,
        miss_latency: MISS,
    }
}

fn lru() -> Cache {
    Cache::new(&config(ReplacementPolicy::Lru, WritePolicy::WriteBack))
}

#[test]
fn cold_miss_then_hits_within_the_line() {
    let mut cache = lru();
    let miss = cache.access(0x24, false);
    assert!(!miss.hit);
    assert_eq!(miss.latency, HIT + MISS);
    assert!(!miss.writeback);

    for address in [0x20, 0x24, 0x2C] {
        let hit = cache.access(address, false);
        assert!(hit.hit, "{address:#x}");
        assert_eq!(hit.latency, HIT);
    }
    assert!(!cache.access(0x30, false).hit);
}

#[test]
fn sets_do_not_conflict() {
    let mut cache = lru();
    for address in [0x00, 0x20, 0x10] {
        let _ = cache.access(address, false);
    }
    assert!(cache.contains(0x00));
    assert!(cache.contains(0x20));
    assert!(cache.contains(0x10));
    assert_eq!(cache.valid_lines(), 3);
}

#[rstest]
#[case::lru_keeps_reused_block(ReplacementPolicy::Lru, 0x20)]
#[case::fifo_evicts_first_filled(ReplacementPolicy::Fifo, 0x00)]
fn replacement_picks_victim(#[case] replacement: ReplacementPolicy, #[case] evicted: u64) {
    let mut cache = Cache::new(&config(replacement, WritePolicy::WriteBack));
    let _ = cache.access(0x00, false);
    let _ = cache.access(0x20, false);
    assert!(cache.access(0x00, false).hit);
    let _ = cache.access(0x40, false);

    assert!(cache.contains(0x40));
    assert!(!cache.contains(evicted));
    let kept = if evicted == 0x00 { 0x20 } else { 0x00 };
    assert!(cache.contains(kept));
}

#[test]
fn random_replacement_keeps_set_full() {
    let mut cache = Cache::new(&config(ReplacementPolicy::Random, WritePolicy::WriteBack));
    for address in [0x00, 0x20, 0x40, 0x60, 0x80] {
        let _ = cache.access(address, false);
        assert!(cache.contains(address));
    }
    assert_eq!(cache.valid_lines(), 2);
}

#[test]
fn write_back_dirties_and_pays_on_eviction() {
    let mut cache = lru();
    let store = cache.access(0x00, true);
    assert!(!store.hit);
    assert!(!store.write_through);
    assert_eq!(cache.line(0x00).map(|l| l.dirty), Some(true));

    let _ = cache.access(0x20, false);
    let evicting = cache.access(0x40, false);
    assert!(evicting.writeback);
    assert_eq!(evicting.latency, HIT + 2 * MISS);
    assert!(!cache.contains(0x00));
}

#[test]
fn write_hit_dirties_clean_line() {
    let mut cache = lru();
    let _ = cache.access(0x10, false);
    assert_eq!(cache.line(0x10).map(|l| l.dirty), Some(false));
    assert!(cache.access(0x18, true).hit);
    assert_eq!(cache.line(0x10).map(|l| l.dirty), Some(true));
}

#[test]
fn write_through_never_dirties() {
    let mut cache = Cache::new(&config(ReplacementPolicy::Lru, WritePolicy::WriteThrough));
    let store = cache.access(0x00, true);
    assert!(store.write_through);
    assert_eq!(cache.line(0x00).map(|l| l.dirty), Some(false));

    let _ = cache.access(0x20, false);
    let evicting = cache.access(0x40, false);
    assert!(!evicting.writeback);
    assert_eq!(evicting.latency, HIT + MISS);
    assert!(!cache.access(0x44, false).write_through);
}

#[test]
fn flush_reports_dirty_lines() {
    let mut cache = lru();
    let _ = cache.access(0x00, true);
    let _ = cache.access(0x10, false);
    assert_eq!(cache.flush(), 1);
    assert_eq!(cache.valid_lines(), 0);
}
