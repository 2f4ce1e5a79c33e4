//! Configuration system for the pipeline simulator.
//!
//! This module defines the machine parameters consumed by the core. It provides:
//! 1. **Defaults:** Baseline widths, buffer depths, unit latencies and predictor sizes.
//! 2. **Structures:** Hierarchical config for the pipeline, functional units, predictor and memory.
//! 3. **Validation:** Range and consistency checks run before a simulation is constructed.
//!
//! Configuration is supplied as JSON (`Config::from_json`, `Config::from_file`) or
//! built in code starting from `Config::default()`.

use std::path::Path;

use serde::Deserialize;

use crate::common::error::ConfigError;
use crate::isa::semantics::FuClass;

/// Default configuration constants for the simulator.
mod defaults {
    /// Instructions fetched per cycle.
    pub const FETCH_WIDTH: usize = 3;

    /// Instructions renamed and dispatched per cycle (the issue width).
    pub const DISPATCH_WIDTH: usize = 3;

    /// Instructions retired per cycle.
    pub const COMMIT_WIDTH: usize = 4;

    /// Reorder buffer entries.
    pub const ROB_SIZE: usize = 256;

    /// Entries per reservation station (one station per unit class).
    pub const RS_SIZE: usize = 16;

    /// Fetched-but-undispatched instructions held between fetch and dispatch.
    pub const FETCH_BUFFER_SIZE: usize = 16;

    /// Predicted-taken branches followed within one fetch group.
    pub const BRANCH_FOLLOW_LIMIT: usize = 1;

    /// Branch Target Buffer entries.
    pub const BTB_SIZE: usize = 1024;

    /// Pattern history table entries.
    pub const TABLE_SIZE: usize = 1024;

    /// Saturating counter width in bits.
    pub const COUNTER_BITS: u8 = 2;

    /// Counter state after reset (weakly taken for 2-bit counters).
    pub const INITIAL_STATE: u8 = 2;

    /// Global history register length for gshare.
    pub const HISTORY_BITS: u32 = 10;

    /// Data memory size in bytes (64 KiB).
    pub const MEMORY_SIZE: usize = 64 * 1024;

    /// Load/store queue entries.
    pub const LSQ_SIZE: usize = 64;

    /// Cycles from a load's memory access start to its result.
    pub const LOAD_LATENCY: u64 = 1;

    /// Loads that may start a memory access per cycle.
    pub const LOAD_PORTS: usize = 1;

    /// Data cache lines.
    pub const CACHE_LINES: usize = 64;

    /// Data cache ways per set.
    pub const CACHE_ASSOCIATIVITY: usize = 2;

    /// Data cache line size in bytes.
    pub const CACHE_LINE_SIZE: usize = 32;

    /// Cycles for a cache hit.
    pub const CACHE_HIT_LATENCY: u64 = 1;

    /// Extra cycles to fill a line from memory (and to write a dirty one back).
    pub const CACHE_MISS_LATENCY: u64 = 10;
}

/// Branch predictor implementation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BranchPredictor {
    /// Fixed prediction taken from the initial counter state; never trained.
    #[default]
    Static,
    /// Per-PC table of saturating counters.
    Bimodal,
    /// Counters indexed by PC xor global history.
    #[serde(alias = "Gshare")]
    GShare,
}

/// Cache replacement policy types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ReplacementPolicy {
    /// Evicts the least recently used line of the set.
    #[default]
    #[serde(alias = "LRU")]
    Lru,
    /// Evicts lines in the order they were filled.
    #[serde(alias = "FIFO")]
    Fifo,
    /// Evicts a pseudo-random line.
    Random,
}

/// How stores reach memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum WritePolicy {
    /// Stores dirty the line; memory is written when the line is evicted.
    #[default]
    WriteBack,
    /// Every store is also written to memory; lines are never dirty.
    WriteThrough,
}

/// Top-level simulator configuration.
///
/// # Examples
///
/// ```
/// use sssim_core::config::{BranchPredictor, Config};
///
/// let json = r#"{
///     "pipeline": { "fetch_width": 4, "commit_width": 4 },
///     "predictor": { "kind": "GShare", "history_bits": 8 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.pipeline.fetch_width, 4);
/// assert_eq!(config.predictor.kind, BranchPredictor::GShare);
/// assert_eq!(config.memory.lsq_size, 64);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Widths and buffer depths.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Functional units, one entry per class.
    #[serde(default = "Config::default_units")]
    pub units: Vec<FunctionalUnitConfig>,
    /// Branch predictor.
    #[serde(default)]
    pub predictor: PredictorConfig,
    /// Data memory and load/store queue.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Pipeline widths and buffer depths.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Instructions fetched per cycle.
    #[serde(default = "PipelineConfig::default_fetch_width")]
    pub fetch_width: usize,
    /// Instructions dispatched per cycle.
    #[serde(default = "PipelineConfig::default_dispatch_width")]
    pub dispatch_width: usize,
    /// Instructions committed per cycle.
    #[serde(default = "PipelineConfig::default_commit_width")]
    pub commit_width: usize,
    /// Reorder buffer entries.
    #[serde(default = "PipelineConfig::default_rob_size")]
    pub rob_size: usize,
    /// Entries per reservation station.
    #[serde(default = "PipelineConfig::default_rs_size")]
    pub rs_size: usize,
    /// Fetch buffer entries.
    #[serde(default = "PipelineConfig::default_fetch_buffer_size")]
    pub fetch_buffer_size: usize,
    /// Extra idle fetch cycles after a misprediction redirect.
    #[serde(default)]
    pub flush_penalty: u64,
    /// Predicted-taken branches followed per fetch group.
    #[serde(default = "PipelineConfig::default_branch_follow_limit")]
    pub branch_follow_limit: usize,
    /// Hard stop after this many cycles.
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

impl PipelineConfig {
    fn default_fetch_width() -> usize {
        defaults::FETCH_WIDTH
    }

    fn default_dispatch_width() -> usize {
        defaults::DISPATCH_WIDTH
    }

    fn default_commit_width() -> usize {
        defaults::COMMIT_WIDTH
    }

    fn default_rob_size() -> usize {
        defaults::ROB_SIZE
    }

    fn default_rs_size() -> usize {
        defaults::RS_SIZE
    }

    fn default_fetch_buffer_size() -> usize {
        defaults::FETCH_BUFFER_SIZE
    }

    fn default_branch_follow_limit() -> usize {
        defaults::BRANCH_FOLLOW_LIMIT
    }

    /// A scalar machine: every width is one.
    pub fn scalar() -> Self {
        Self {
            fetch_width: 1,
            dispatch_width: 1,
            commit_width: 1,
            ..Self::default()
        }
    }

    /// Every width set to `width`, with buffers deep enough to sustain it.
    pub fn wide(width: usize) -> Self {
        let base = Self::default();
        Self {
            fetch_width: width,
            dispatch_width: width,
            commit_width: width,
            rs_size: base.rs_size.max(width),
            fetch_buffer_size: base.fetch_buffer_size.max(2 * width),
            rob_size: base.rob_size.max(4 * width),
            ..base
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_width: defaults::FETCH_WIDTH,
            dispatch_width: defaults::DISPATCH_WIDTH,
            commit_width: defaults::COMMIT_WIDTH,
            rob_size: defaults::ROB_SIZE,
            rs_size: defaults::RS_SIZE,
            fetch_buffer_size: defaults::FETCH_BUFFER_SIZE,
            flush_penalty: 0,
            branch_follow_limit: defaults::BRANCH_FOLLOW_LIMIT,
            max_cycles: None,
        }
    }
}

/// Count and latency of one functional-unit class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FunctionalUnitConfig {
    /// Unit class.
    pub class: FuClass,
    /// Number of identical units.
    #[serde(default = "FunctionalUnitConfig::default_count")]
    pub count: usize,
    /// Cycles a unit is occupied per instruction.
    #[serde(default = "FunctionalUnitConfig::default_latency")]
    pub latency: u64,
}

impl FunctionalUnitConfig {
    const fn default_count() -> usize {
        1
    }

    const fn default_latency() -> u64 {
        1
    }

    /// Creates a unit entry.
    pub const fn new(class: FuClass, count: usize, latency: u64) -> Self {
        Self {
            class,
            count,
            latency,
        }
    }
}

/// Branch predictor parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Predictor algorithm.
    #[serde(default)]
    pub kind: BranchPredictor,
    /// Branch Target Buffer entries (power of two).
    #[serde(default = "PredictorConfig::default_btb_size")]
    pub btb_size: usize,
    /// Pattern history table entries (power of two).
    #[serde(default = "PredictorConfig::default_table_size")]
    pub table_size: usize,
    /// Saturating counter width (0, 1 or 2).
    #[serde(default = "PredictorConfig::default_counter_bits")]
    pub counter_bits: u8,
    /// Counter state after reset.
    #[serde(default = "PredictorConfig::default_initial_state")]
    pub initial_state: u8,
    /// Global history length for gshare.
    #[serde(default = "PredictorConfig::default_history_bits")]
    pub history_bits: u32,
}

impl PredictorConfig {
    fn default_btb_size() -> usize {
        defaults::BTB_SIZE
    }

    fn default_table_size() -> usize {
        defaults::TABLE_SIZE
    }

    fn default_counter_bits() -> u8 {
        defaults::COUNTER_BITS
    }

    fn default_initial_state() -> u8 {
        defaults::INITIAL_STATE
    }

    fn default_history_bits() -> u32 {
        defaults::HISTORY_BITS
    }
}

impl Default for PredictorConfig {
    /// Static not-taken prediction.
    fn default() -> Self {
        Self {
            kind: BranchPredictor::Static,
            btb_size: defaults::BTB_SIZE,
            table_size: defaults::TABLE_SIZE,
            counter_bits: defaults::COUNTER_BITS,
            initial_state: 0,
            history_bits: defaults::HISTORY_BITS,
        }
    }
}

/// Data memory and load/store queue parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Memory image size in bytes.
    #[serde(default = "MemoryConfig::default_size")]
    pub size: usize,
    /// Load/store queue entries.
    #[serde(default = "MemoryConfig::default_lsq_size")]
    pub lsq_size: usize,
    /// Cycles from access start to load result.
    #[serde(default = "MemoryConfig::default_load_latency")]
    pub load_latency: u64,
    /// Loads that may start an access per cycle.
    #[serde(default = "MemoryConfig::default_load_ports")]
    pub load_ports: usize,
    /// Address where data directives are placed.
    #[serde(default)]
    pub data_base: u64,
    /// Data cache in front of the memory image.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl MemoryConfig {
    fn default_size() -> usize {
        defaults::MEMORY_SIZE
    }

    fn default_lsq_size() -> usize {
        defaults::LSQ_SIZE
    }

    fn default_load_latency() -> u64 {
        defaults::LOAD_LATENCY
    }

    fn default_load_ports() -> usize {
        defaults::LOAD_PORTS
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            size: defaults::MEMORY_SIZE,
            lsq_size: defaults::LSQ_SIZE,
            load_latency: defaults::LOAD_LATENCY,
            load_ports: defaults::LOAD_PORTS,
            data_base: 0,
            cache: CacheConfig::default(),
        }
    }
}

/// Data cache parameters.
///
/// The cache models timing only: loaded values always come from the memory
/// image. When disabled every load that is not forwarded takes
/// `MemoryConfig::load_latency`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Route loads and committed stores through the cache.
    #[serde(default)]
    pub enabled: bool,
    /// Total number of lines.
    #[serde(default = "CacheConfig::default_lines")]
    pub lines: usize,
    /// Ways per set; `lines / associativity` sets must be a power of two.
    #[serde(default = "CacheConfig::default_associativity")]
    pub associativity: usize,
    /// Line size in bytes (a power of two, at least 8).
    #[serde(default = "CacheConfig::default_line_size")]
    pub line_size: usize,
    /// Victim selection.
    #[serde(default)]
    pub replacement: ReplacementPolicy,
    /// Store handling.
    #[serde(default)]
    pub write_policy: WritePolicy,
    /// Cycles for a hit.
    #[serde(default = "CacheConfig::default_hit_latency")]
    pub hit_latency: u64,
    /// Extra cycles for a line fill, and again for a dirty victim write-back.
    #[serde(default = "CacheConfig::default_miss_latency")]
    pub miss_latency: u64,
}

impl CacheConfig {
    fn default_lines() -> usize {
        defaults::CACHE_LINES
    }

    fn default_associativity() -> usize {
        defaults::CACHE_ASSOCIATIVITY
    }

    fn default_line_size() -> usize {
        defaults::CACHE_LINE_SIZE
    }

    fn default_hit_latency() -> u64 {
        defaults::CACHE_HIT_LATENCY
    }

    fn default_miss_latency() -> u64 {
        defaults::CACHE_MISS_LATENCY
    }

    /// An enabled cache with the default geometry.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Number of sets.
    pub const fn sets(&self) -> usize {
        if self.associativity == 0 {
            0
        } else {
            self.lines / self.associativity
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lines: defaults::CACHE_LINES,
            associativity: defaults::CACHE_ASSOCIATIVITY,
            line_size: defaults::CACHE_LINE_SIZE,
            replacement: ReplacementPolicy::Lru,
            write_policy: WritePolicy::WriteBack,
            hit_latency: defaults::CACHE_HIT_LATENCY,
            miss_latency: defaults::CACHE_MISS_LATENCY,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn at_least_one(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(invalid(field, "must be at least 1"))
    } else {
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            units: Self::default_units(),
            predictor: PredictorConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Config {
    fn default_units() -> Vec<FunctionalUnitConfig> {
        vec![
            FunctionalUnitConfig::new(FuClass::IntAlu, 2, 1),
            FunctionalUnitConfig::new(FuClass::MulDiv, 1, 4),
            FunctionalUnitConfig::new(FuClass::Fpu, 1, 2),
            FunctionalUnitConfig::new(FuClass::Branch, 1, 2),
            FunctionalUnitConfig::new(FuClass::Memory, 1, 1),
        ]
    }

    /// Default machine with every unit latency set to `latency`.
    pub fn with_uniform_latency(latency: u64) -> Self {
        let mut config = Self::default();
        for unit in &mut config.units {
            unit.latency = latency;
        }
        config
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Latency of a unit class, if configured.
    pub fn unit(&self, class: FuClass) -> Option<&FunctionalUnitConfig> {
        self.units.iter().find(|u| u.class == class)
    }

    /// Checks ranges and consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        at_least_one("pipeline.fetch_width", p.fetch_width as u64)?;
        at_least_one("pipeline.dispatch_width", p.dispatch_width as u64)?;
        at_least_one("pipeline.commit_width", p.commit_width as u64)?;
        at_least_one("pipeline.rob_size", p.rob_size as u64)?;
        at_least_one("pipeline.rs_size", p.rs_size as u64)?;
        at_least_one("pipeline.fetch_buffer_size", p.fetch_buffer_size as u64)?;
        at_least_one("pipeline.branch_follow_limit", p.branch_follow_limit as u64)?;
        if p.max_cycles == Some(0) {
            return Err(invalid("pipeline.max_cycles", "must be at least 1 when set"));
        }

        if self.units.is_empty() {
            return Err(invalid("units", "at least one functional unit is required"));
        }
        for (i, unit) in self.units.iter().enumerate() {
            at_least_one("units.count", unit.count as u64)?;
            at_least_one("units.latency", unit.latency)?;
            if self.units[..i].iter().any(|u| u.class == unit.class) {
                return Err(invalid("units.class", format!("{:?} is listed twice", unit.class)));
            }
        }

        let bp = &self.predictor;
        if !bp.btb_size.is_power_of_two() {
            return Err(invalid("predictor.btb_size", "must be a power of two"));
        }
        if !bp.table_size.is_power_of_two() {
            return Err(invalid("predictor.table_size", "must be a power of two"));
        }
        if bp.counter_bits > 2 {
            return Err(invalid("predictor.counter_bits", "must be 0, 1 or 2"));
        }
        let max_state = if bp.counter_bits == 0 {
            1
        } else {
            (1u8 << bp.counter_bits) - 1
        };
        if bp.initial_state > max_state {
            return Err(invalid(
                "predictor.initial_state",
                format!("must be at most {max_state} for {}-bit counters", bp.counter_bits),
            ));
        }
        if bp.history_bits > 30 {
            return Err(invalid("predictor.history_bits", "must be at most 30"));
        }

        let m = &self.memory;
        at_least_one("memory.size", m.size as u64)?;
        at_least_one("memory.lsq_size", m.lsq_size as u64)?;
        at_least_one("memory.load_latency", m.load_latency)?;
        at_least_one("memory.load_ports", m.load_ports as u64)?;
        if m.data_base >= m.size as u64 {
            return Err(invalid("memory.data_base", "must lie inside memory"));
        }

        let c = &m.cache;
        at_least_one("memory.cache.lines", c.lines as u64)?;
        at_least_one("memory.cache.associativity", c.associativity as u64)?;
        at_least_one("memory.cache.hit_latency", c.hit_latency)?;
        if c.lines % c.associativity != 0 {
            return Err(invalid(
                "memory.cache.associativity",
                "must divide the number of lines",
            ));
        }
        if !c.sets().is_power_of_two() {
            return Err(invalid("memory.cache.lines", "lines / associativity must be a power of two"));
        }
        if !c.line_size.is_power_of_two() || c.line_size < 8 {
            return Err(invalid("memory.cache.line_size", "must be a power of two of at least 8"));
        }
        Ok(())
    }
}
