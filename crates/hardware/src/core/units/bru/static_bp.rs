//! Static Branch Predictor.
//!
//! Predicts every branch with one fixed direction taken from the configured
//! counter reset state. It is never trained; only its BTB learns targets, so
//! a statically-taken branch is still redirected once its target is known.

use super::{BranchPredictor, btb::Btb, counter::SaturatingCounter};

/// Static Branch Predictor structure.
#[derive(Clone, Debug)]
pub struct StaticPredictor {
    direction: SaturatingCounter,
    btb: Btb,
}

impl StaticPredictor {
    /// Creates a predictor with a fixed direction derived from `initial_state`.
    pub fn new(btb_size: usize, counter_bits: u8, initial_state: u8) -> Self {
        // Evaluated once as a full-width counter; the result is frozen.
        let taken = SaturatingCounter::new(counter_bits, initial_state).taken();
        Self {
            direction: SaturatingCounter::new(0, u8::from(taken)),
            btb: Btb::new(btb_size),
        }
    }
}

impl BranchPredictor for StaticPredictor {
    fn predict_branch(&self, pc: u64) -> (bool, Option<u64>) {
        if self.direction.taken() {
            (true, self.btb.lookup(pc))
        } else {
            (false, None)
        }
    }

    /// Only the BTB is updated; the direction never changes.
    fn update_branch(&mut self, pc: u64, _taken: bool, target: Option<u64>) {
        if let Some(tgt) = target {
            self.btb.update(pc, tgt);
        }
    }

    fn predict_btb(&self, pc: u64) -> Option<u64> {
        self.btb.lookup(pc)
    }
}
