//! Owned machine state of one simulation run.
//!
//! `CpuState` bundles everything a cycle reads or writes: the committed
//! architectural state (registers, memory, PC) and every speculative
//! structure (arena, fetch buffer, rename table, stations, units, ROB,
//! LSQ, predictor, data cache). Each run owns exactly one; nothing is
//! shared between runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::common::error::FaultDescriptor;
use crate::common::reg::RegisterFile;
use crate::config::Config;
use crate::core::pipeline::instance::{InstanceArena, InstanceId};
use crate::core::pipeline::lsq::LoadStoreQueue;
use crate::core::pipeline::rename::RenameTable;
use crate::core::pipeline::reservation::ReservationStations;
use crate::core::pipeline::rob::Rob;
use crate::core::units::bru::BranchPredictorWrapper;
use crate::core::units::cache::Cache;
use crate::core::units::fu::ExecutionUnits;
use crate::isa::decode::DecodedInstruction;
use crate::isa::instruction::INSTRUCTION_SIZE;
use crate::memory::MemoryImage;
use crate::stats::SimStats;

/// Coarse run state of the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum SimStatus {
    /// More cycles can make progress.
    #[default]
    Running,
    /// Stopped by a halt instruction, a fault or the cycle limit.
    Halted,
    /// Fetch ran off the program and the pipeline drained.
    Idle,
}

/// Why a run halted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HaltReason {
    /// A halt instruction committed.
    HaltInstruction,
    /// A faulting instruction reached commit.
    Fault,
    /// The configured cycle limit was reached.
    MaxCycles,
}

/// One committed instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RetiredInstruction {
    /// Instance identity (fetch order).
    pub id: InstanceId,
    /// Address of the instruction.
    pub pc: u64,
    /// Commit cycle.
    pub cycle: u64,
}

/// Immutable inputs a run starts from.
#[derive(Clone, Debug)]
pub struct MachineImage {
    /// Validated configuration.
    pub config: Config,
    /// Decoded program; instruction `i` lives at `i * INSTRUCTION_SIZE`.
    pub program: Arc<[Arc<DecodedInstruction>]>,
    /// Initial register file.
    pub registers: RegisterFile,
    /// Initial memory image with data locations placed.
    pub memory: MemoryImage,
    /// Address execution starts at.
    pub entry_pc: u64,
    /// Label and memory location addresses.
    pub symbols: HashMap<String, u64>,
}

/// Complete state of one run.
#[derive(Clone, Debug)]
pub struct CpuState {
    /// Machine configuration.
    pub config: Config,
    /// Decoded program.
    pub program: Arc<[Arc<DecodedInstruction>]>,
    /// Committed register values.
    pub regs: RegisterFile,
    /// Committed memory.
    pub memory: MemoryImage,
    /// Next fetch address.
    pub pc: u64,
    /// Cycles completed so far.
    pub cycle: u64,

    /// Live instances.
    pub arena: InstanceArena,
    /// Fetched, not yet dispatched, in fetch order.
    pub fetch_buffer: VecDeque<InstanceId>,
    /// Register producers.
    pub rename: RenameTable,
    /// Waiting instances per unit class.
    pub stations: ReservationStations,
    /// Functional units.
    pub units: ExecutionUnits,
    /// Reorder buffer.
    pub rob: Rob,
    /// Load/store queue.
    pub lsq: LoadStoreQueue,
    /// Branch predictor and BTB.
    pub predictor: BranchPredictorWrapper,
    /// Data cache, when enabled.
    pub cache: Option<Cache>,

    /// Fetch stopped after reading a halt instruction.
    pub fetch_halted: bool,
    /// First cycle fetch may run after a redirect.
    pub fetch_resume_at: u64,

    /// Run state.
    pub status: SimStatus,
    /// Why the run halted, once it has.
    pub halt_reason: Option<HaltReason>,
    /// Fault that stopped the run.
    pub fault: Option<FaultDescriptor>,
    /// Committed instances in commit order.
    pub retired: Vec<RetiredInstruction>,
    /// Counters.
    pub stats: SimStats,
}

impl CpuState {
    /// Creates the reset state of a run.
    pub fn new(image: &MachineImage) -> Self {
        let config = image.config.clone();
        Self {
            program: Arc::clone(&image.program),
            regs: image.registers.clone(),
            memory: image.memory.clone(),
            pc: image.entry_pc,
            cycle: 0,
            arena: InstanceArena::new(),
            fetch_buffer: VecDeque::with_capacity(config.pipeline.fetch_buffer_size),
            rename: RenameTable::new(&image.registers),
            stations: ReservationStations::new(config.pipeline.rs_size),
            units: ExecutionUnits::new(&config.units),
            rob: Rob::new(config.pipeline.rob_size),
            lsq: LoadStoreQueue::new(config.memory.lsq_size),
            predictor: BranchPredictorWrapper::new(&config.predictor),
            cache: config
                .memory
                .cache
                .enabled
                .then(|| Cache::new(&config.memory.cache)),
            fetch_halted: false,
            fetch_resume_at: 0,
            status: SimStatus::Running,
            halt_reason: None,
            fault: None,
            retired: Vec::new(),
            stats: SimStats::for_program(image.program.len()),
            config,
        }
    }

    /// Decoded instruction at `pc`, if `pc` is inside the program.
    pub fn decoded_at(&self, pc: u64) -> Option<&Arc<DecodedInstruction>> {
        if pc % INSTRUCTION_SIZE != 0 {
            return None;
        }
        let idx = usize::try_from(pc / INSTRUCTION_SIZE).ok()?;
        self.program.get(idx)
    }

    /// Stops the run.
    pub fn halt(&mut self, reason: HaltReason) {
        self.status = SimStatus::Halted;
        self.halt_reason = Some(reason);
    }

    /// Returns true once fetch has nothing left and the pipeline has drained.
    pub fn drained(&self) -> bool {
        self.decoded_at(self.pc).is_none() && self.fetch_buffer.is_empty() && self.rob.is_empty()
    }
}
