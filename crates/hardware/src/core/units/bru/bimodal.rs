//! Bimodal Branch Predictor.
//!
//! A table of saturating counters indexed by the branch PC. Each static
//! branch trains its own counter (modulo aliasing).

use super::{BranchPredictor, btb::Btb, counter::SaturatingCounter};

/// Bimodal predictor structure.
#[derive(Clone, Debug)]
pub struct BimodalPredictor {
    /// Pattern history table.
    pht: Vec<SaturatingCounter>,
    btb: Btb,
}

impl BimodalPredictor {
    /// Creates a predictor with `table_size` counters (a power of two).
    pub fn new(btb_size: usize, table_size: usize, counter_bits: u8, initial_state: u8) -> Self {
        Self {
            pht: vec![SaturatingCounter::new(counter_bits, initial_state); table_size],
            btb: Btb::new(btb_size),
        }
    }

    fn index(&self, pc: u64) -> usize {
        ((pc >> 2) as usize) & (self.pht.len() - 1)
    }
}

impl BranchPredictor for BimodalPredictor {
    fn predict_branch(&self, pc: u64) -> (bool, Option<u64>) {
        if self.pht[self.index(pc)].taken() {
            (true, self.btb.lookup(pc))
        } else {
            (false, None)
        }
    }

    fn update_branch(&mut self, pc: u64, taken: bool, target: Option<u64>) {
        let idx = self.index(pc);
        self.pht[idx].update(taken);
        if let Some(tgt) = target {
            self.btb.update(pc, tgt);
        }
    }

    fn predict_btb(&self, pc: u64) -> Option<u64> {
        self.btb.lookup(pc)
    }
}
