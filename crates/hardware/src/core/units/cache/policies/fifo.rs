//! First-In, First-Out (FIFO) Replacement Policy.
//!
//! Evicts the line that was filled longest ago, however often it has been
//! hit since. Hits leave the order untouched.

use std::collections::VecDeque;

use super::ReplacementPolicy;

/// FIFO Policy state.
#[derive(Clone, Debug)]
pub struct FifoPolicy {
    /// Ways of each set in fill order, oldest first.
    order: Vec<VecDeque<usize>>,
}

impl FifoPolicy {
    /// Creates a policy for `sets` sets of `ways` ways.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            order: (0..sets).map(|_| (0..ways).collect()).collect(),
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn touch(&mut self, _set: usize, _way: usize) {}

    fn fill(&mut self, set: usize, way: usize) {
        let queue = &mut self.order[set];
        queue.retain(|&w| w != way);
        queue.push_back(way);
    }

    fn victim(&mut self, set: usize) -> usize {
        self.order[set].front().copied().unwrap_or(0)
    }
}
