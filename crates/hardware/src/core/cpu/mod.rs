//! CPU Driver Definition and Cycle Loop.
//!
//! This module defines `Cpu`, the driver that owns one run and advances it a
//! cycle at a time. It coordinates the following:
//! 1. **Construction:** Validates the configuration and builds the machine image.
//! 2. **Cycle loop:** Runs the stages in reverse order (commit first, fetch last),
//!    so every stage sees the state its downstream neighbour left behind.
//! 3. **Termination:** Detects halt, fault, cycle limit and idle drain.
//! 4. **Introspection:** Snapshots, retirement history and step-back by
//!    deterministic re-simulation from the initial image.

/// Owned machine state of one run.
pub mod state;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::common::error::{FaultDescriptor, SimError};
use crate::common::reg::RegisterFile;
use crate::config::Config;
use crate::core::pipeline::commit::commit_stage;
use crate::core::pipeline::dispatch::dispatch_stage;
use crate::core::pipeline::execute::{execute_stage, memory_stage};
use crate::core::pipeline::fetch::fetch_stage;
use crate::core::pipeline::issue::issue_stage;
use crate::isa::instruction::Program;
use crate::isa::semantics::InstructionSet;
use crate::sim::loader::load_program;
use crate::stats::{InstructionStats, SimStats};

pub use self::state::{CpuState, HaltReason, MachineImage, RetiredInstruction, SimStatus};

/// Serializable summary of a run, for reporting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CpuSnapshot {
    /// Cycles completed.
    pub cycle: u64,
    /// Next fetch address.
    pub pc: u64,
    /// Run state.
    pub status: SimStatus,
    /// Why the run halted, if it has.
    pub halt_reason: Option<HaltReason>,
    /// Committed register values (raw bits) by canonical name.
    pub registers: BTreeMap<String, u64>,
    /// Counters, per-instruction counters included.
    pub stats: SimStats,
    /// Fault that stopped the run.
    pub fault: Option<FaultDescriptor>,
}

/// Pipeline driver for one run.
#[derive(Clone, Debug)]
pub struct Cpu {
    image: MachineImage,
    state: CpuState,
}

impl Cpu {
    /// Creates a driver for `program` on the machine described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the program does not
    /// decode against `isa`, its data does not fit in memory, or it needs a
    /// functional-unit class the configuration does not provide.
    pub fn new(
        config: Config,
        isa: &InstructionSet,
        registers: RegisterFile,
        program: &Program,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let image = load_program(config, isa, registers, program)?;
        Ok(Self::from_image(image))
    }

    /// Creates a driver at the reset state of `image`.
    pub fn from_image(image: MachineImage) -> Self {
        let state = CpuState::new(&image);
        Self { image, state }
    }

    /// Returns true once the run has halted or gone idle.
    pub fn sim_ended(&self) -> bool {
        self.state.status != SimStatus::Running
    }

    /// Run state.
    pub const fn status(&self) -> SimStatus {
        self.state.status
    }

    /// Why the run halted, if it has.
    pub const fn halt_reason(&self) -> Option<HaltReason> {
        self.state.halt_reason
    }

    /// Fault that stopped the run.
    pub const fn fault(&self) -> Option<&FaultDescriptor> {
        self.state.fault.as_ref()
    }

    /// Cycles completed so far.
    pub const fn cycle(&self) -> u64 {
        self.state.cycle
    }

    /// Counters.
    pub const fn stats(&self) -> &SimStats {
        &self.state.stats
    }

    /// Counters of each static instruction, indexed by program position.
    pub fn instruction_stats(&self) -> &[InstructionStats] {
        &self.state.stats.instruction_stats
    }

    /// Committed instances in commit order.
    pub fn retired(&self) -> &[RetiredInstruction] {
        &self.state.retired
    }

    /// Full machine state, read-only.
    pub const fn state(&self) -> &CpuState {
        &self.state
    }

    /// Address bound to a code label or memory location.
    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.image.symbols.get(name).copied()
    }

    /// Returns to the reset state.
    pub fn reset(&mut self) {
        self.state = CpuState::new(&self.image);
    }

    /// Advances the machine by one cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Stopped`] if the run has already ended.
    pub fn step(&mut self) -> Result<(), SimError> {
        if self.sim_ended() {
            return Err(SimError::Stopped(self.state.status));
        }
        let state = &mut self.state;

        commit_stage(state);
        if state.status == SimStatus::Halted {
            state.cycle += 1;
            state.stats.cycles = state.cycle;
            return Ok(());
        }
        execute_stage(state);
        memory_stage(state);
        issue_stage(state);
        dispatch_stage(state);
        fetch_stage(state);

        for pool in state.units.iter() {
            state.stats.record_busy(pool.class(), pool.busy_units());
        }
        state.cycle += 1;
        state.stats.cycles = state.cycle;

        if state.drained() {
            state.status = SimStatus::Idle;
            info!(cycle = state.cycle, "pipeline drained");
        } else if state
            .config
            .pipeline
            .max_cycles
            .is_some_and(|limit| state.cycle >= limit)
        {
            state.halt(HaltReason::MaxCycles);
            info!(cycle = state.cycle, "cycle limit reached");
        }
        Ok(())
    }

    /// Steps until the run ends or `max_cycles` cycles have elapsed.
    ///
    /// Returns the number of cycles executed.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Stopped`] if the run had already ended.
    pub fn run(&mut self, max_cycles: u64) -> Result<u64, SimError> {
        if self.sim_ended() {
            return Err(SimError::Stopped(self.state.status));
        }
        let mut executed = 0;
        while executed < max_cycles && !self.sim_ended() {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Moves the machine to the state after `cycle` cycles.
    ///
    /// Moving backwards re-simulates from the reset state; since a run is
    /// deterministic the result is identical to the state first seen there.
    /// Stops early if the run ends before `cycle`.
    pub fn simulate_to(&mut self, cycle: u64) {
        if cycle < self.state.cycle {
            self.reset();
        }
        while self.state.cycle < cycle && !self.sim_ended() {
            // Only fails once the run has ended, which the loop condition excludes.
            let _ = self.step();
        }
    }

    /// Serializable summary of the current state.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            cycle: self.state.cycle,
            pc: self.state.pc,
            status: self.state.status,
            halt_reason: self.state.halt_reason,
            registers: self
                .state
                .regs
                .iter()
                .map(|(_, reg)| (reg.name.clone(), reg.value))
                .collect(),
            stats: self.state.stats.clone(),
            fault: self.state.fault.clone(),
        }
    }
}
