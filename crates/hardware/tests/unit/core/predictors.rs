//! Branch Predictor Direction Tests.
//!
//! Verifies predict/update semantics of the three direction predictors, the
//! saturating counters they are built from and the BTB fallback.

use rstest::rstest;
use sssim_core::config::{BranchPredictor as Kind, PredictorConfig};
use sssim_core::core::units::bru::bimodal::BimodalPredictor;
use sssim_core::core::units::bru::counter::SaturatingCounter;
use sssim_core::core::units::bru::gshare::GSharePredictor;
use sssim_core::core::units::bru::{BranchPredictor, BranchPredictorWrapper};

// ══════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════

fn train<P: BranchPredictor>(bp: &mut P, pc: u64, taken: bool, target: u64, n: usize) {
    let tgt = taken.then_some(target);
    for _ in 0..n {
        bp.update_branch(pc, taken, tgt);
    }
}

fn config(kind: Kind, counter_bits: u8, initial_state: u8) -> PredictorConfig {
    PredictorConfig {
        kind,
        btb_size: 64,
        table_size: 64,
        counter_bits,
        initial_state,
        history_bits: 6,
    }
}

// ══════════════════════════════════════════════════════════
// 1. Saturating counters
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::one_bit(1, 0, 1)]
#[case::two_bit(2, 0, 3)]
fn counter_saturates(#[case] bits: u8, #[case] low: u8, #[case] high: u8) {
    let mut c = SaturatingCounter::new(bits, low);
    for _ in 0..8 {
        c.update(true);
    }
    assert_eq!(c.state(), high);
    assert!(c.taken());
    for _ in 0..8 {
        c.update(false);
    }
    assert_eq!(c.state(), low);
    assert!(!c.taken());
}

#[test]
fn two_bit_counter_has_hysteresis() {
    let mut c = SaturatingCounter::new(2, 3);
    c.update(false);
    assert!(c.taken(), "one not-taken outcome must not flip a strong counter");
    c.update(false);
    assert!(!c.taken());
}

#[test]
fn zero_bit_counter_is_fixed() {
    let mut c = SaturatingCounter::new(0, 1);
    c.update(false);
    assert!(c.taken());
}

// ══════════════════════════════════════════════════════════
// 2. Direction predictors
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::bimodal(Kind::Bimodal)]
#[case::gshare(Kind::GShare)]
fn dynamic_predictors_learn_taken(#[case] kind: Kind) {
    let mut bp = BranchPredictorWrapper::new(&config(kind, 2, 1));
    assert_eq!(bp.predict_branch(0x40), (false, None));
    // GShare needs the history to settle before the same counter is reused.
    train(&mut bp, 0x40, true, 0x10, 8);
    assert_eq!(bp.predict_branch(0x40), (true, Some(0x10)));
}

#[rstest]
#[case::not_taken(0, false)]
#[case::taken(3, true)]
fn static_direction_is_frozen(#[case] initial_state: u8, #[case] expect: bool) {
    let mut bp = BranchPredictorWrapper::new(&config(Kind::Static, 2, initial_state));
    train(&mut bp, 0x40, !expect, 0x10, 16);
    // Teach the BTB a target so a taken direction can be followed.
    bp.update_branch(0x40, true, Some(0x10));
    let expected = if expect { (true, Some(0x10)) } else { (false, None) };
    assert_eq!(bp.predict_branch(0x40), expected);
}

#[test]
fn taken_prediction_without_target_reports_none() {
    let bp = BimodalPredictor::new(64, 64, 2, 3);
    assert_eq!(bp.predict_branch(0x40), (true, None));
}

#[test]
fn gshare_history_tracks_outcomes() {
    let mut bp = GSharePredictor::new(64, 64, 2, 2, 3);
    for taken in [true, false, true, true] {
        bp.update_branch(0x8, taken, taken.then_some(0));
    }
    // Only the three most recent outcomes are kept: 0b011.
    assert_eq!(bp.history(), 0b011);
}

#[test]
fn gshare_separates_history_contexts() {
    let mut bp = GSharePredictor::new(64, 64, 2, 1, 2);
    // Alternating outcomes: the pattern becomes predictable per history.
    for _ in 0..16 {
        bp.update_branch(0x20, true, Some(0x100));
        bp.update_branch(0x20, false, None);
    }
    // History now ends with "taken, not taken"; the next outcome was taken.
    assert_eq!(bp.predict_branch(0x20), (true, Some(0x100)));
    bp.update_branch(0x20, true, Some(0x100));
    assert!(!bp.predict_branch(0x20).0);
}
