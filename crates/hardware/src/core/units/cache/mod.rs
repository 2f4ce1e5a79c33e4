//! Set-Associative Data Cache.
//!
//! A timing model of the data cache between the load/store queue and the
//! memory image. It tracks tags, validity and dirtiness per line; the bytes
//! themselves always live in the memory image, so the cache decides when a
//! loaded value arrives but never what it is.
//!
//! Misses allocate a line for loads and stores alike. An invalid way is
//! filled before the replacement policy is asked for a victim. Under
//! write-back a store dirties its line and evicting a dirty line costs a
//! second `miss_latency`; under write-through lines stay clean and every
//! store is counted as a memory write.

/// Cache replacement policy implementations (LRU, FIFO, Random).
pub mod policies;

use serde::Serialize;

use self::policies::{ReplacementPolicy, ReplacementPolicyWrapper};
use crate::config::{CacheConfig, WritePolicy};
use crate::core::units::indexing::AddressSplit;

/// Cache line entry containing tag, validity, and dirty bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheLine {
    /// Address bits above the set index.
    pub tag: u64,
    /// Line holds a block.
    pub valid: bool,
    /// Line was written since it was filled.
    pub dirty: bool,
}

/// Outcome of one cache access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheAccess {
    /// The block was present.
    pub hit: bool,
    /// Cycles until the access completes.
    pub latency: u64,
    /// A dirty victim was written back to memory.
    pub writeback: bool,
    /// The store was also written to memory (write-through).
    pub write_through: bool,
}

/// Set-associative cache with a configurable replacement and write policy.
#[derive(Clone, Debug)]
pub struct Cache {
    lines: Vec<CacheLine>,
    ways: usize,
    split: AddressSplit,
    policy: ReplacementPolicyWrapper,
    write_policy: WritePolicy,
    hit_latency: u64,
    miss_latency: u64,
}

impl Cache {
    /// Creates an empty cache from a validated configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let sets = config.sets();
        let ways = config.associativity;
        Self {
            lines: vec![CacheLine::default(); sets * ways],
            ways,
            split: AddressSplit::new(config.line_size, sets),
            policy: ReplacementPolicyWrapper::new(config.replacement, sets, ways),
            write_policy: config.write_policy,
            hit_latency: config.hit_latency,
            miss_latency: config.miss_latency,
        }
    }

    fn set_lines(&self, set: usize) -> &[CacheLine] {
        &self.lines[set * self.ways..(set + 1) * self.ways]
    }

    fn find_way(&self, address: u64) -> Option<usize> {
        let tag = self.split.tag(address);
        self.set_lines(self.split.index(address))
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    /// Returns true if the block holding `address` is cached.
    pub fn contains(&self, address: u64) -> bool {
        self.find_way(address).is_some()
    }

    /// Line state of the block holding `address`, if cached.
    pub fn line(&self, address: u64) -> Option<CacheLine> {
        let way = self.find_way(address)?;
        Some(self.lines[self.split.index(address) * self.ways + way])
    }

    /// Performs a read (`is_write == false`) or write of `address`.
    pub fn access(&mut self, address: u64, is_write: bool) -> CacheAccess {
        let set = self.split.index(address);
        let base = set * self.ways;
        let dirty_on_write = is_write && self.write_policy == WritePolicy::WriteBack;
        let write_through = is_write && self.write_policy == WritePolicy::WriteThrough;

        if let Some(way) = self.find_way(address) {
            self.policy.touch(set, way);
            if dirty_on_write {
                self.lines[base + way].dirty = true;
            }
            return CacheAccess {
                hit: true,
                latency: self.hit_latency,
                writeback: false,
                write_through,
            };
        }

        let way = match self.set_lines(set).iter().position(|line| !line.valid) {
            Some(free) => free,
            None => self.policy.victim(set),
        };
        let victim = self.lines[base + way];
        let writeback = victim.valid && victim.dirty;
        self.lines[base + way] = CacheLine {
            tag: self.split.tag(address),
            valid: true,
            dirty: dirty_on_write,
        };
        self.policy.fill(set, way);

        let mut latency = self.hit_latency + self.miss_latency;
        if writeback {
            latency += self.miss_latency;
        }
        CacheAccess {
            hit: false,
            latency,
            writeback,
            write_through,
        }
    }

    /// Writes back and invalidates every line. Returns the dirty lines written.
    pub fn flush(&mut self) -> usize {
        let dirty = self.lines.iter().filter(|l| l.valid && l.dirty).count();
        self.lines.fill(CacheLine::default());
        dirty
    }

    /// Number of valid lines.
    pub fn valid_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.valid).count()
    }

    /// Line size in bytes.
    pub const fn line_size(&self) -> usize {
        self.split.block_bytes()
    }
}
