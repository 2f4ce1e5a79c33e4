//! Branch prediction unit (BRU) implementations.
//!
//! This module contains the direction predictors (static, bimodal and gshare),
//! the saturating counters they are built from, and the branch target
//! buffer (BTB) shared by all of them.

pub use self::branch_predictor::BranchPredictor;

/// Branch predictor trait.
pub mod branch_predictor;

/// Bimodal (per-PC counter) branch predictor.
pub mod bimodal;

/// Branch Target Buffer for storing predicted branch targets.
pub mod btb;

/// Saturating counters.
pub mod counter;

/// Global history branch predictor (gshare algorithm).
pub mod gshare;

/// Static branch predictor (fixed direction).
pub mod static_bp;

use self::{bimodal::BimodalPredictor, gshare::GSharePredictor, static_bp::StaticPredictor};
use crate::config::{BranchPredictor as BpType, PredictorConfig};

/// Enum wrapper for static dispatch of Branch Predictors.
/// This avoids vtable lookups in the fetch loop.
#[derive(Clone, Debug)]
pub enum BranchPredictorWrapper {
    /// Fixed direction.
    Static(StaticPredictor),
    /// Per-PC counters.
    Bimodal(BimodalPredictor),
    /// Global-history counters.
    GShare(GSharePredictor),
}

impl BranchPredictorWrapper {
    /// Creates the predictor selected by the configuration.
    pub fn new(config: &PredictorConfig) -> Self {
        let PredictorConfig {
            kind,
            btb_size,
            table_size,
            counter_bits,
            initial_state,
            history_bits,
        } = *config;

        match kind {
            BpType::Static => Self::Static(StaticPredictor::new(btb_size, counter_bits, initial_state)),
            BpType::Bimodal => Self::Bimodal(BimodalPredictor::new(
                btb_size,
                table_size,
                counter_bits,
                initial_state,
            )),
            BpType::GShare => Self::GShare(GSharePredictor::new(
                btb_size,
                table_size,
                counter_bits,
                initial_state,
                history_bits,
            )),
        }
    }
}

impl BranchPredictor for BranchPredictorWrapper {
    #[inline(always)]
    fn predict_branch(&self, pc: u64) -> (bool, Option<u64>) {
        match self {
            Self::Static(bp) => bp.predict_branch(pc),
            Self::Bimodal(bp) => bp.predict_branch(pc),
            Self::GShare(bp) => bp.predict_branch(pc),
        }
    }

    #[inline(always)]
    fn update_branch(&mut self, pc: u64, taken: bool, target: Option<u64>) {
        match self {
            Self::Static(bp) => bp.update_branch(pc, taken, target),
            Self::Bimodal(bp) => bp.update_branch(pc, taken, target),
            Self::GShare(bp) => bp.update_branch(pc, taken, target),
        }
    }

    #[inline(always)]
    fn predict_btb(&self, pc: u64) -> Option<u64> {
        match self {
            Self::Static(bp) => bp.predict_btb(pc),
            Self::Bimodal(bp) => bp.predict_btb(pc),
            Self::GShare(bp) => bp.predict_btb(pc),
        }
    }
}
