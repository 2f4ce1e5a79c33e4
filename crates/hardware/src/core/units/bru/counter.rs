//! Saturating counters.
//!
//! A counter of `bits` width counts up on taken outcomes and down on
//! not-taken outcomes, clamping at both ends. The prediction is its top bit.
//! A zero-width counter never changes and always predicts its reset state.

/// Saturating up/down counter of 0, 1 or 2 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounter {
    bits: u8,
    state: u8,
}

impl SaturatingCounter {
    /// Creates a counter of `bits` width in state `initial`.
    ///
    /// For a zero-width counter `initial` is the fixed prediction (0 or 1).
    pub const fn new(bits: u8, initial: u8) -> Self {
        Self {
            bits,
            state: initial,
        }
    }

    const fn max(self) -> u8 {
        if self.bits == 0 {
            self.state
        } else {
            (1 << self.bits) - 1
        }
    }

    /// Current state.
    pub const fn state(self) -> u8 {
        self.state
    }

    /// Predicted direction.
    pub const fn taken(self) -> bool {
        if self.bits == 0 {
            self.state != 0
        } else {
            self.state >> (self.bits - 1) == 1
        }
    }

    /// Trains the counter with an outcome.
    pub fn update(&mut self, taken: bool) {
        if self.bits == 0 {
            return;
        }
        if taken {
            if self.state < self.max() {
                self.state += 1;
            }
        } else if self.state > 0 {
            self.state -= 1;
        }
    }
}
