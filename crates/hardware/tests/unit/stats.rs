//! Statistics gathered over whole runs and their text report.

use pretty_assertions::assert_eq;
use sssim_core::config::{BranchPredictor, CacheConfig};
use sssim_core::isa::{FuClass, MemoryLocation};
use sssim_core::stats::{STATS_SECTIONS, SimStats};

use crate::common::{ProgramBuilder, TestContext};

fn mixed_program() -> sssim_core::isa::Program {
    ProgramBuilder::new()
        .data(MemoryLocation::words("buf", &[0, 0]))
        .addi("x1", "x0", 3)
        .inst("add", &["x2", "x1", "x1"])
        .inst("sw", &["x2", "@buf", "x0"])
        .inst("lw", &["x3", "@buf", "x0"])
        .inst("beq", &["x3", "x0", "@end"])
        .inst("nop", &[])
        .label("end")
        .halt()
        .build()
}

#[test]
fn instruction_mix_counts_retired_instructions() {
    let cpu = TestContext::new().run_to_end(&mixed_program());
    let stats = cpu.stats();
    assert_eq!(stats.instructions_retired, 7);
    assert_eq!(
        (stats.inst_int, stats.inst_store, stats.inst_load, stats.inst_branch, stats.inst_control),
        (2, 1, 1, 1, 2)
    );
    assert_eq!(stats.inst_fp, 0);
    assert_eq!(stats.stores_committed, 1);
    assert_eq!(stats.loads_forwarded + stats.loads_from_memory, 1);
    assert_eq!(stats.branches_resolved, 1);
    assert_eq!(stats.branches_taken, 0);
}

#[test]
fn flow_counters_are_ordered() {
    let cpu = TestContext::new().run_to_end(&mixed_program());
    let stats = cpu.stats();
    assert!(stats.instructions_fetched >= stats.instructions_dispatched);
    assert!(stats.instructions_dispatched >= stats.instructions_retired);
    assert_eq!(stats.cycles, cpu.cycle());
    assert!(stats.ipc() > 0.0 && stats.ipc() <= 4.0);
}

#[test]
fn busy_cycles_cover_every_configured_pool() {
    let cpu = TestContext::new().run_to_end(&mixed_program());
    let busy = &cpu.stats().unit_busy_cycles;
    assert!(busy.get(&FuClass::IntAlu).copied().unwrap_or(0) >= 2);
    assert!(busy.get(&FuClass::Memory).copied().unwrap_or(0) >= 2);
    assert!(busy.get(&FuClass::Branch).copied().unwrap_or(0) >= 1);
}

#[test]
fn report_renders_every_section_by_default() {
    let cpu = TestContext::new().run_to_end(&mixed_program());
    let report = cpu.stats().to_string();
    for heading in ["PIPELINE", "INSTRUCTION MIX", "BRANCH PREDICTION", "MEMORY"] {
        assert!(report.contains(heading), "missing {heading}");
    }
    assert!(report.contains(&format!("sim_cycles               {}", cpu.cycle())));
    assert!(report.contains("sim_insts                7"));
}

#[test]
fn report_sections_can_be_selected() {
    let stats = SimStats {
        cycles: 8,
        instructions_retired: 4,
        ..SimStats::default()
    };
    assert!(STATS_SECTIONS.contains(&"summary"));
    let report = stats.render_sections(&["summary"]);
    assert!(report.contains("sim_ipc                  0.5000"));
    assert!(!report.contains("BRANCH PREDICTION"));
    assert!(!report.contains("MEMORY"));
}

#[test]
fn stats_serialize_for_reporting() {
    let cpu = TestContext::new().run_to_end(&mixed_program());
    let json = serde_json::to_value(cpu.stats()).unwrap();
    assert_eq!(json["instructions_retired"], 7);
    assert!(json["unit_busy_cycles"]["IntAlu"].is_u64());
}

fn counted_loop() -> sssim_core::isa::Program {
    ProgramBuilder::new()
        .addi("x1", "x0", 0)
        .addi("x2", "x0", 4)
        .label("loop")
        .addi("x1", "x1", 1)
        .inst("bne", &["x1", "x2", "@loop"])
        .halt()
        .build()
}

#[test]
fn per_instruction_counters_follow_the_program() {
    let cpu = TestContext::new()
        .with_predictor(BranchPredictor::Static)
        .run_to_end(&counted_loop());
    let lines = cpu.instruction_stats();
    assert_eq!(lines.len(), 5);

    let committed: Vec<u64> = lines.iter().map(|l| l.committed).collect();
    assert_eq!(committed, vec![1, 1, 4, 4, 1]);
    let branch = &lines[3];
    assert_eq!((branch.correct_predictions, branch.mispredictions), (1, 3));
    assert!(lines.iter().all(|l| l.fetched >= l.committed));
    assert!(lines[0..3].iter().all(|l| l.correct_predictions + l.mispredictions == 0));
    // Each recovery had already fetched the halt down the wrong path.
    assert!(lines[4].fetched > lines[4].committed);
    assert_eq!(
        lines.iter().map(|l| l.committed).sum::<u64>(),
        cpu.stats().instructions_retired
    );
}

#[test]
fn snapshot_carries_per_instruction_counters() {
    let cpu = TestContext::new().run_to_end(&counted_loop());
    let json = serde_json::to_value(cpu.snapshot()).unwrap();
    let lines = json["stats"]["instruction_stats"].as_array().unwrap();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[3]["committed"], 4);
    assert!(lines[3]["cache_misses"].is_u64());
}

#[test]
fn report_lists_cache_and_per_instruction_counters() {
    let mut ctx = TestContext::new();
    ctx.config.memory.cache = CacheConfig::enabled();
    let cpu = ctx.run_to_end(&mixed_program());
    let report = cpu.stats().to_string();

    assert!(report.contains("PER INSTRUCTION"));
    assert!(report.contains("cache.misses           1"));
    assert!(report.contains("cache.miss_rate"));
    // The committed store at line 2 missed; the forwarded load never asked.
    assert!(report.contains("     2        1          1        0           0           1"));
}
