//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for the pipeline. It provides:
//! 1. **Cycle and IPC:** Total cycles, retired instructions, and derived IPC/CPI.
//! 2. **Pipeline flow:** Instances fetched, dispatched, issued and flushed.
//! 3. **Instruction mix:** Retired counts by category.
//! 4. **Branch prediction:** Resolutions, mispredictions, and accuracy.
//! 5. **Memory:** Forwarded loads, memory reads, committed stores, cache hits and misses.
//! 6. **Stalls:** Dispatch and memory-ordering stall counts by cause.
//! 7. **Per instruction:** Fetches, commits, prediction outcomes and cache
//!    misses of every static instruction, indexed by its position in the program.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::isa::instruction::INSTRUCTION_SIZE;
use crate::isa::semantics::{Effect, FuClass, InstructionClass, InstructionSemantics};

/// Counters for one static instruction.
///
/// Commit-time counters only cover the correct path; `fetched` also counts
/// wrong-path instances that were later flushed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InstructionStats {
    /// Instances created by fetch.
    pub fetched: u64,
    /// Instances committed.
    pub committed: u64,
    /// Committed branch instances whose prediction was right.
    pub correct_predictions: u64,
    /// Committed branch instances whose prediction was wrong.
    pub mispredictions: u64,
    /// Committed loads and stores that missed in the data cache.
    pub cache_misses: u64,
}

/// Simulation statistics structure tracking all performance metrics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Total simulated cycles.
    pub cycles: u64,
    /// Number of instructions committed (retired).
    pub instructions_retired: u64,

    /// Instances created by fetch, wrong-path ones included.
    pub instructions_fetched: u64,
    /// Instances renamed into the backend.
    pub instructions_dispatched: u64,
    /// Instances started on a functional unit.
    pub instructions_issued: u64,
    /// Instances discarded by misprediction recovery.
    pub instructions_flushed: u64,

    /// Integer arithmetic instructions retired.
    pub inst_int: u64,
    /// Floating-point arithmetic instructions retired.
    pub inst_fp: u64,
    /// Branch/jump instructions retired.
    pub inst_branch: u64,
    /// Loads retired.
    pub inst_load: u64,
    /// Stores retired.
    pub inst_store: u64,
    /// Halt and no-op instructions retired.
    pub inst_control: u64,

    /// Branches resolved on the correct path.
    pub branches_resolved: u64,
    /// Resolved branches that were taken.
    pub branches_taken: u64,
    /// Number of branch predictions that were correct.
    pub branch_predictions: u64,
    /// Number of branch predictions that were wrong (mispredictions).
    pub branch_mispredictions: u64,

    /// Loads satisfied by store-to-load forwarding.
    pub loads_forwarded: u64,
    /// Loads that read the memory image.
    pub loads_from_memory: u64,
    /// Stores written to memory at commit.
    pub stores_committed: u64,
    /// Data cache accesses that hit, wrong-path loads included.
    pub cache_hits: u64,
    /// Data cache accesses that missed, wrong-path loads included.
    pub cache_misses: u64,
    /// Dirty lines written back on eviction.
    pub cache_writebacks: u64,
    /// Stores written through to memory.
    pub cache_write_throughs: u64,

    /// Dispatch stall cycles: reorder buffer full.
    pub stalls_rob_full: u64,
    /// Dispatch stall cycles: reservation station full.
    pub stalls_rs_full: u64,
    /// Dispatch stall cycles: load/store queue full.
    pub stalls_lsq_full: u64,
    /// Fetch stall cycles: fetch buffer full.
    pub stalls_fetch_buffer: u64,
    /// Load attempts deferred by an older store.
    pub stalls_memory_order: u64,

    /// Busy unit-cycles per functional-unit class.
    pub unit_busy_cycles: BTreeMap<FuClass, u64>,

    /// Per static instruction, indexed by program position.
    pub instruction_stats: Vec<InstructionStats>,
}

/// Section names for selective stats output.
///
/// Pass an empty slice to `render_sections` to render all sections.
pub const STATS_SECTIONS: &[&str] = &[
    "summary",
    "pipeline",
    "instruction_mix",
    "branch",
    "memory",
    "instructions",
];

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

impl SimStats {
    /// Empty counters for a program of `len` instructions.
    pub fn for_program(len: usize) -> Self {
        Self {
            instruction_stats: vec![InstructionStats::default(); len],
            ..Self::default()
        }
    }

    /// Counters of the instruction at `pc`.
    pub fn line_mut(&mut self, pc: u64) -> Option<&mut InstructionStats> {
        let idx = usize::try_from(pc / INSTRUCTION_SIZE).ok()?;
        self.instruction_stats.get_mut(idx)
    }

    /// Counters of the instruction at `pc`.
    pub fn line(&self, pc: u64) -> Option<&InstructionStats> {
        let idx = usize::try_from(pc / INSTRUCTION_SIZE).ok()?;
        self.instruction_stats.get(idx)
    }

    /// Fraction of cache accesses that missed, in `[0, 1]`.
    pub fn cache_miss_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_misses as f64 / total as f64
        }
    }

    /// Records the outcome of a data cache access.
    pub fn record_cache(&mut self, hit: bool, writeback: bool, write_through: bool) {
        if hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
        self.cache_writebacks += u64::from(writeback);
        self.cache_write_throughs += u64::from(write_through);
    }

    /// Instructions retired per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.instructions_retired as f64 / self.cycles as f64
        }
    }

    /// Fraction of resolved branches predicted correctly, in `[0, 1]`.
    pub fn prediction_accuracy(&self) -> f64 {
        let total = self.branch_predictions + self.branch_mispredictions;
        if total == 0 {
            0.0
        } else {
            self.branch_predictions as f64 / total as f64
        }
    }

    /// Counts a retired instruction in the mix.
    pub fn record_retired(&mut self, semantics: &InstructionSemantics) {
        self.instructions_retired += 1;
        let counter = match (&semantics.effect, semantics.class) {
            (Effect::Load { .. }, _) => &mut self.inst_load,
            (Effect::Store { .. }, _) => &mut self.inst_store,
            (_, InstructionClass::Branch) => &mut self.inst_branch,
            (_, InstructionClass::FloatArithmetic) => &mut self.inst_fp,
            (_, InstructionClass::Control) => &mut self.inst_control,
            _ => &mut self.inst_int,
        };
        *counter += 1;
    }

    /// Adds one cycle of `busy` occupied units of `class`.
    pub fn record_busy(&mut self, class: FuClass, busy: usize) {
        *self.unit_busy_cycles.entry(class).or_default() += busy as u64;
    }

    /// Renders only the requested sections.
    ///
    /// Each element of `sections` should be one of [`STATS_SECTIONS`]; an
    /// empty slice renders everything.
    pub fn render_sections(&self, sections: &[&str]) -> String {
        let want = |s: &str| sections.is_empty() || sections.contains(&s);
        let cyc = self.cycles.max(1);
        let instr = self.instructions_retired.max(1);
        let mut out = String::new();
        let rule = "----------------------------------------------------------";

        // Writing into a String never fails.
        let mut line = |text: String| {
            let _ = writeln!(out, "{text}");
        };

        line("==========================================================".into());
        line("PIPELINE SIMULATION STATISTICS".into());
        line("==========================================================".into());
        if want("summary") {
            line(format!("sim_cycles               {}", self.cycles));
            line(format!("sim_insts                {}", self.instructions_retired));
            line(format!("sim_ipc                  {:.4}", self.ipc()));
            line(format!("sim_cpi                  {:.4}", cyc as f64 / instr as f64));
            line(rule.into());
        }
        if want("pipeline") {
            line("PIPELINE".into());
            line(format!("  fetched                {}", self.instructions_fetched));
            line(format!("  dispatched             {}", self.instructions_dispatched));
            line(format!("  issued                 {}", self.instructions_issued));
            line(format!("  flushed                {}", self.instructions_flushed));
            for (name, value) in [
                ("stalls.rob_full", self.stalls_rob_full),
                ("stalls.rs_full", self.stalls_rs_full),
                ("stalls.lsq_full", self.stalls_lsq_full),
                ("stalls.fetch_buffer", self.stalls_fetch_buffer),
            ] {
                line(format!("  {name:<22} {value} ({:.2}%)", percent(value, cyc)));
            }
            for (class, busy) in &self.unit_busy_cycles {
                line(format!("  busy.{:<17} {busy}", format!("{class:?}")));
            }
            line(rule.into());
        }
        if want("instruction_mix") {
            line("INSTRUCTION MIX".into());
            for (name, value) in [
                ("op.int", self.inst_int),
                ("op.fp", self.inst_fp),
                ("op.branch", self.inst_branch),
                ("op.load", self.inst_load),
                ("op.store", self.inst_store),
                ("op.control", self.inst_control),
            ] {
                line(format!("  {name:<22} {value} ({:.2}%)", percent(value, instr)));
            }
            line(rule.into());
        }
        if want("branch") {
            line("BRANCH PREDICTION".into());
            line(format!("  bp.resolved            {}", self.branches_resolved));
            line(format!("  bp.taken               {}", self.branches_taken));
            line(format!("  bp.mispredicts         {}", self.branch_mispredictions));
            line(format!("  bp.accuracy            {:.2}%", 100.0 * self.prediction_accuracy()));
            line(rule.into());
        }
        if want("memory") {
            line("MEMORY".into());
            line(format!("  loads.forwarded        {}", self.loads_forwarded));
            line(format!("  loads.memory           {}", self.loads_from_memory));
            line(format!("  stores.committed       {}", self.stores_committed));
            line(format!("  stalls.memory_order    {}", self.stalls_memory_order));
            line(format!("  cache.hits             {}", self.cache_hits));
            line(format!("  cache.misses           {}", self.cache_misses));
            line(format!("  cache.miss_rate        {:.2}%", 100.0 * self.cache_miss_rate()));
            line(format!("  cache.writebacks       {}", self.cache_writebacks));
            line(format!("  cache.write_throughs   {}", self.cache_write_throughs));
            line(rule.into());
        }
        if want("instructions") {
            line("PER INSTRUCTION".into());
            line("  line  fetched  committed  correct  mispredict  cache_miss".into());
            for (idx, s) in self.instruction_stats.iter().enumerate() {
                line(format!(
                    "  {idx:>4}  {:>7}  {:>9}  {:>7}  {:>10}  {:>10}",
                    s.fetched, s.committed, s.correct_predictions, s.mispredictions, s.cache_misses
                ));
            }
        }
        line("==========================================================".into());
        out
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_sections(&[]))
    }
}
