//! Cache Replacement Policies.
//!
//! Chooses which way of a full set a miss evicts.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used.
//! - `Fifo`: First-In, First-Out (fill order).
//! - `Random`: Pseudo-random selection from a fixed seed, so runs replay identically.

/// First-In, First-Out replacement policy.
pub mod fifo;

/// Least Recently Used replacement policy.
pub mod lru;

/// Random replacement policy.
pub mod random;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;
pub use random::RandomPolicy;

use crate::config::ReplacementPolicy as PolicyType;

/// Trait for cache replacement policies.
pub trait ReplacementPolicy {
    /// Records a hit on `way` of `set`.
    fn touch(&mut self, set: usize, way: usize);

    /// Records that `way` of `set` was just filled.
    fn fill(&mut self, set: usize, way: usize);

    /// Selects the way to evict from a full `set`.
    fn victim(&mut self, set: usize) -> usize;
}

/// Enum wrapper for static dispatch of replacement policies.
#[derive(Clone, Debug)]
pub enum ReplacementPolicyWrapper {
    /// Least recently used.
    Lru(LruPolicy),
    /// Fill order.
    Fifo(FifoPolicy),
    /// Pseudo-random.
    Random(RandomPolicy),
}

impl ReplacementPolicyWrapper {
    /// Creates the policy selected by the configuration.
    pub fn new(kind: PolicyType, sets: usize, ways: usize) -> Self {
        match kind {
            PolicyType::Lru => Self::Lru(LruPolicy::new(sets, ways)),
            PolicyType::Fifo => Self::Fifo(FifoPolicy::new(sets, ways)),
            PolicyType::Random => Self::Random(RandomPolicy::new(ways)),
        }
    }
}

impl ReplacementPolicy for ReplacementPolicyWrapper {
    #[inline(always)]
    fn touch(&mut self, set: usize, way: usize) {
        match self {
            Self::Lru(p) => p.touch(set, way),
            Self::Fifo(p) => p.touch(set, way),
            Self::Random(p) => p.touch(set, way),
        }
    }

    #[inline(always)]
    fn fill(&mut self, set: usize, way: usize) {
        match self {
            Self::Lru(p) => p.fill(set, way),
            Self::Fifo(p) => p.fill(set, way),
            Self::Random(p) => p.fill(set, way),
        }
    }

    #[inline(always)]
    fn victim(&mut self, set: usize) -> usize {
        match self {
            Self::Lru(p) => p.victim(set),
            Self::Fifo(p) => p.victim(set),
            Self::Random(p) => p.victim(set),
        }
    }
}
