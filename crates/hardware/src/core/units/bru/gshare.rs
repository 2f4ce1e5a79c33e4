//! GShare Branch Predictor.
//!
//! GShare correlates global branch history with the program counter using an XOR
//! hash. This allows the predictor to distinguish the same branch instruction
//! in different execution contexts.
//!
//! The history register is shifted at branch resolution, not at prediction,
//! so a flushed wrong-path branch never pollutes it.

use super::{BranchPredictor, btb::Btb, counter::SaturatingCounter};

/// GShare Predictor structure.
#[derive(Clone, Debug)]
pub struct GSharePredictor {
    /// Global History Register storing recent branch outcomes.
    ghr: u64,
    history_mask: u64,
    /// Pattern History Table.
    pht: Vec<SaturatingCounter>,
    btb: Btb,
}

impl GSharePredictor {
    /// Creates a new GShare Predictor.
    pub fn new(
        btb_size: usize,
        table_size: usize,
        counter_bits: u8,
        initial_state: u8,
        history_bits: u32,
    ) -> Self {
        Self {
            ghr: 0,
            history_mask: (1u64 << history_bits) - 1,
            pht: vec![SaturatingCounter::new(counter_bits, initial_state); table_size],
            btb: Btb::new(btb_size),
        }
    }

    /// XOR of the word-aligned PC and the global history, masked to the table.
    fn index(&self, pc: u64) -> usize {
        let mask = (self.pht.len() as u64) - 1;
        (((pc >> 2) ^ self.ghr) & mask) as usize
    }

    /// Current global history.
    pub const fn history(&self) -> u64 {
        self.ghr
    }
}

impl BranchPredictor for GSharePredictor {
    fn predict_branch(&self, pc: u64) -> (bool, Option<u64>) {
        if self.pht[self.index(pc)].taken() {
            (true, self.btb.lookup(pc))
        } else {
            (false, None)
        }
    }

    /// Trains the counter selected by the pre-update history, then shifts
    /// the outcome into the history register.
    fn update_branch(&mut self, pc: u64, taken: bool, target: Option<u64>) {
        let idx = self.index(pc);
        self.pht[idx].update(taken);
        self.ghr = ((self.ghr << 1) | u64::from(taken)) & self.history_mask;
        if let Some(tgt) = target {
            self.btb.update(pc, tgt);
        }
    }

    fn predict_btb(&self, pc: u64) -> Option<u64> {
        self.btb.lookup(pc)
    }
}
