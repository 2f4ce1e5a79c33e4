//! Random Replacement Policy.
//!
//! Picks a victim with a xorshift generator. The seed is fixed, so two runs
//! of the same program evict the same lines and re-simulation stays exact.

use super::ReplacementPolicy;

const SEED: u64 = 0x2545_F491_4F6C_DD1D;

/// Random Policy state.
#[derive(Clone, Debug)]
pub struct RandomPolicy {
    ways: usize,
    state: u64,
}

impl RandomPolicy {
    /// Creates a policy choosing among `ways` ways.
    pub const fn new(ways: usize) -> Self {
        Self { ways, state: SEED }
    }
}

impl ReplacementPolicy for RandomPolicy {
    fn touch(&mut self, _set: usize, _way: usize) {}

    fn fill(&mut self, _set: usize, _way: usize) {}

    fn victim(&mut self, _set: usize) -> usize {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x % self.ways.max(1) as u64) as usize
    }
}
