//! Least Recently Used (LRU) Replacement Policy.
//!
//! Each set keeps a recency stack of its ways. Hits and fills move the way
//! to the front (most recently used); the victim is the way at the back.

use super::ReplacementPolicy;

/// LRU Policy state.
#[derive(Clone, Debug)]
pub struct LruPolicy {
    /// One recency stack per set; index 0 is the MRU way.
    usage: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates a policy for `sets` sets of `ways` ways.
    ///
    /// Before any access the stack is `[0, 1, .., ways - 1]`, so way
    /// `ways - 1` is the first victim.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: (0..sets).map(|_| (0..ways).collect()).collect(),
        }
    }

    fn promote(&mut self, set: usize, way: usize) {
        let stack = &mut self.usage[set];
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }
}

impl ReplacementPolicy for LruPolicy {
    fn touch(&mut self, set: usize, way: usize) {
        self.promote(set, way);
    }

    fn fill(&mut self, set: usize, way: usize) {
        self.promote(set, way);
    }

    fn victim(&mut self, set: usize) -> usize {
        self.usage[set].last().copied().unwrap_or(0)
    }
}
