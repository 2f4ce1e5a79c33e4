//! End-to-end pipeline scenarios.
//!
//! Each test assembles a short program, runs it to completion and checks the
//! committed state together with the counters that show which pipeline path
//! was taken (forwarding, misprediction recovery, stalls, faults).

use pretty_assertions::assert_eq;
use rstest::rstest;
use sssim_core::common::{FaultKind, MemoryFault};
use sssim_core::config::BranchPredictor;
use sssim_core::core::cpu::{HaltReason, SimStatus};
use sssim_core::isa::{FuClass, MemoryLocation};

use crate::common::harness::reg;
use crate::common::{ProgramBuilder, TestContext};

fn retired_pcs(cpu: &sssim_core::Cpu) -> Vec<u64> {
    cpu.retired().iter().map(|r| r.pc).collect()
}

#[test]
fn dependent_chain_scalar() {
    let ctx = TestContext::scalar();
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 5)
        .addi("x2", "x1", 3)
        .inst("add", &["x3", "x1", "x2"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);

    assert_eq!(cpu.halt_reason(), Some(HaltReason::HaltInstruction));
    assert_eq!((reg(&cpu, "x1"), reg(&cpu, "x2"), reg(&cpu, "x3")), (5, 8, 13));
    assert_eq!(retired_pcs(&cpu), vec![0, 4, 8, 12]);
    assert!(cpu.stats().cycles <= 12, "took {} cycles", cpu.stats().cycles);
}

#[test]
fn source_read_before_destination_rename() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 1)
        .addi("x1", "x1", 1)
        .addi("x1", "x1", 1)
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!(reg(&cpu, "x1"), 3);
}

#[test]
fn multi_cycle_unit_result_reaches_dependents() {
    let mut ctx = TestContext::new();
    ctx.set_unit(FuClass::MulDiv, 1, 4);
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 6)
        .addi("x2", "x0", 7)
        .inst("mul", &["x3", "x1", "x2"])
        .addi("x4", "x3", 1)
        .addi("x5", "x0", 9)
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!((reg(&cpu, "x3"), reg(&cpu, "x4"), reg(&cpu, "x5")), (42, 43, 9));
    assert_eq!(retired_pcs(&cpu), vec![0, 4, 8, 12, 16, 20]);
}

#[test]
fn writes_to_zero_register_are_discarded() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .addi("x0", "x0", 5)
        .addi("x1", "x0", 1)
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!((reg(&cpu, "x0"), reg(&cpu, "x1")), (0, 1));
}

#[test]
fn float_pipeline_round_trip() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 3)
        .inst("fcvt.s.w", &["f1", "x1"])
        .inst("fadd.s", &["f2", "f1", "f1"])
        .inst("fmv.x.w", &["x2", "f2"])
        .inst("fcvt.w.s", &["x3", "f2"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!(reg(&cpu, "x2") as u32, 6.0f32.to_bits());
    assert_eq!(reg(&cpu, "x3"), 6);
}

#[test]
fn store_forwards_to_younger_load() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .data(MemoryLocation::zeroed("buf", 16, 4))
        .addi("x1", "x0", 42)
        .inst("sw", &["x1", "0", "x0"])
        .inst("lw", &["x2", "0", "x0"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);

    assert_eq!(reg(&cpu, "x2"), 42);
    let stats = cpu.stats();
    assert_eq!(stats.loads_forwarded, 1);
    assert_eq!(stats.loads_from_memory, 0);
    assert_eq!(stats.stores_committed, 1);
    // The load was ready first and had to wait for the store's address.
    assert!(stats.stalls_memory_order > 0);
    assert_eq!(
        cpu.state().memory.read(0, sssim_core::isa::AccessWidth::Word).unwrap(),
        42
    );
}

#[test]
fn narrow_load_from_forwarded_word() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .data(MemoryLocation::zeroed("buf", 8, 4))
        .addi("x1", "x0", -2)
        .inst("sw", &["x1", "0", "x0"])
        .inst("lbu", &["x2", "1", "x0"])
        .inst("lb", &["x3", "1", "x0"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!(reg(&cpu, "x2"), 0xFF);
    assert_eq!(reg(&cpu, "x3"), -1);
    assert_eq!(cpu.stats().loads_forwarded, 2);
}

#[test]
fn load_reads_initialised_data() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .data(MemoryLocation::words("table", &[10, 20, 30]))
        .inst("lw", &["x1", "8", "x0"])
        .inst("lh", &["x2", "4", "x0"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!((reg(&cpu, "x1"), reg(&cpu, "x2")), (30, 20));
    assert_eq!(cpu.stats().loads_from_memory, 2);
}

#[test]
fn mispredicted_jump_is_squashed() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 1)
        .inst("j", &["@skip"])
        .addi("x1", "x0", 99)
        .label("skip")
        .addi("x2", "x0", 2)
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);

    assert_eq!((reg(&cpu, "x1"), reg(&cpu, "x2")), (1, 2));
    assert_eq!(retired_pcs(&cpu), vec![0, 4, 12, 16]);
    let stats = cpu.stats();
    assert_eq!(stats.branch_mispredictions, 1);
    assert_eq!(stats.branches_taken, 1);
    assert!(stats.instructions_flushed >= 1);
    assert_eq!(stats.instructions_retired, 4);
}

#[test]
fn flush_penalty_delays_refetch() {
    let build = |penalty: u64| {
        let mut ctx = TestContext::new();
        ctx.config.pipeline.flush_penalty = penalty;
        let program = ProgramBuilder::new()
            .inst("j", &["@end"])
            .addi("x1", "x0", 1)
            .label("end")
            .halt()
            .build();
        ctx.run_to_end(&program).stats().cycles
    };
    assert_eq!(build(3), build(0) + 3);
}

#[test]
fn jal_links_return_address() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .inst("jal", &["ra", "@func"])
        .halt()
        .label("func")
        .addi("x5", "x0", 7)
        .inst("jr", &["ra"])
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!(cpu.halt_reason(), Some(HaltReason::HaltInstruction));
    assert_eq!((reg(&cpu, "ra"), reg(&cpu, "x5")), (4, 7));
    assert_eq!(retired_pcs(&cpu), vec![0, 8, 12, 4]);
}

#[rstest]
#[case::static_not_taken(BranchPredictor::Static)]
#[case::bimodal(BranchPredictor::Bimodal)]
#[case::gshare(BranchPredictor::GShare)]
fn counted_loop(#[case] kind: BranchPredictor) {
    let ctx = TestContext::new().with_predictor(kind);
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 5)
        .label("loop")
        .addi("x1", "x1", -1)
        .inst("bne", &["x1", "x0", "@loop"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);

    assert_eq!(reg(&cpu, "x1"), 0);
    assert_eq!(cpu.retired().len(), 12);
    let ids: Vec<_> = cpu.retired().iter().map(|r| r.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let stats = cpu.stats();
    assert_eq!(stats.branches_resolved, 5);
    assert_eq!(stats.branches_taken, 4);
    if kind == BranchPredictor::Static {
        assert_eq!(stats.branch_mispredictions, 4);
    } else {
        assert!(stats.branch_mispredictions <= 2, "{stats}");
    }
}

#[test]
fn load_fault_reported_at_commit() {
    let ctx = TestContext::new().with_register("x2", 0x10_0000);
    let program = ProgramBuilder::new()
        .addi("x3", "x0", 7)
        .inst("lw", &["x1", "0", "x2"])
        .addi("x4", "x0", 1)
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);

    assert_eq!(cpu.status(), SimStatus::Halted);
    assert_eq!(cpu.halt_reason(), Some(HaltReason::Fault));
    let fault = cpu.fault().unwrap();
    assert_eq!(
        fault.kind,
        FaultKind::Memory(MemoryFault::OutOfRange {
            address: 0x10_0000,
            width: 4
        })
    );
    assert_eq!((fault.pc, fault.line), (4, 2));
    assert_eq!((reg(&cpu, "x3"), reg(&cpu, "x4")), (7, 0));
    assert_eq!(retired_pcs(&cpu), vec![0]);
}

#[test]
fn misaligned_store_faults() {
    let ctx = TestContext::new();
    let program = ProgramBuilder::new()
        .data(MemoryLocation::zeroed("buf", 16, 4))
        .addi("x1", "x0", 1)
        .inst("sw", &["x1", "2", "x0"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert!(matches!(
        cpu.fault().map(|f| &f.kind),
        Some(FaultKind::Memory(MemoryFault::Misaligned { address: 2, .. }))
    ));
    assert_eq!(cpu.stats().stores_committed, 0);
}

#[test]
fn wrong_path_fault_is_discarded() {
    let ctx = TestContext::new().with_register("x2", 0x10_0000);
    let program = ProgramBuilder::new()
        .inst("j", &["@end"])
        .inst("lw", &["x1", "0", "x2"])
        .label("end")
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!(cpu.halt_reason(), Some(HaltReason::HaltInstruction));
    assert!(cpu.fault().is_none());
    assert_eq!(retired_pcs(&cpu), vec![0, 8]);
}

#[test]
fn small_rob_stalls_dispatch() {
    let mut ctx = TestContext::new();
    ctx.config.pipeline.rob_size = 2;
    ctx.set_unit(FuClass::MulDiv, 1, 4);
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 3)
        .inst("mul", &["x2", "x1", "x1"])
        .inst("mul", &["x3", "x2", "x1"])
        .addi("x4", "x3", 1)
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!(reg(&cpu, "x4"), 28);
    assert!(cpu.stats().stalls_rob_full > 0);
}

#[test]
fn small_lsq_stalls_dispatch() {
    let mut ctx = TestContext::new();
    ctx.config.memory.lsq_size = 1;
    let program = ProgramBuilder::new()
        .data(MemoryLocation::words("v", &[4, 5]))
        .inst("lw", &["x1", "0", "x0"])
        .inst("lw", &["x2", "4", "x0"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!((reg(&cpu, "x1"), reg(&cpu, "x2")), (4, 5));
    assert!(cpu.stats().stalls_lsq_full > 0);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
fn independent_work_scales_with_width(#[case] width: usize) {
    let ctx = TestContext::wide(width);
    let mut builder = ProgramBuilder::new();
    for i in 0..8 * width {
        builder = builder.addi(&format!("x{}", i % 31 + 1), "x0", i as i64);
    }
    let cpu = ctx.run_to_end(&builder.halt().build());

    let stats = cpu.stats();
    assert_eq!(stats.instructions_retired, 8 * width as u64 + 1);
    assert!(stats.cycles <= 16, "width {width} took {} cycles", stats.cycles);
    assert!(stats.ipc() > width as f64 * 0.5, "ipc {}", stats.ipc());
}

#[test]
fn two_operand_add_scalar_timing() {
    let ctx = TestContext::scalar();
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 5)
        .addi("x2", "x0", 7)
        .inst("add", &["x3", "x1", "x2"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);

    assert_eq!(reg(&cpu, "x3"), 12);
    assert_eq!(cpu.halt_reason(), Some(HaltReason::HaltInstruction));
    // One fetch per cycle; the add waits a cycle for x2's wakeup and the
    // halt commits alone in the last cycle.
    assert_eq!(cpu.cycle(), 9);
}

#[rstest]
fn n_independent_on_n_wide_take_constant_cycles(
    #[values(1, 2, 3, 4, 8, 16, 30)] width: usize,
) {
    let ctx = TestContext::wide(width);
    let mut builder = ProgramBuilder::new();
    for i in 0..width {
        builder = builder.addi(&format!("x{}", i + 1), "x0", i as i64);
    }
    let cpu = ctx.run_to_end(&builder.build());

    assert_eq!(cpu.status(), SimStatus::Idle);
    assert_eq!(cpu.stats().instructions_retired, width as u64);
    // Fetch, dispatch, issue, execute, commit: one cycle each whatever the width.
    assert_eq!(cpu.cycle(), 5, "width {width}");
}
