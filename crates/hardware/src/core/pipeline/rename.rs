//! Register renaming table.
//!
//! Maps each architectural register to the in-flight instance that will
//! produce its next value, or to the architectural file when no producer is
//! in flight. This lets dispatch resolve every source operand with a single
//! lookup instead of scanning the reorder buffer.
//!
//! Each mapping carries a [`Readiness`] state with a fixed set of legal
//! transitions:
//! 1. **Rename:** any state to `Speculative` when a new producer dispatches.
//! 2. **Completion:** `Speculative` to `Computed` when that producer finishes.
//! 3. **Commit:** `Computed` to `Committed` when that producer retires.
//! 4. **Rollback:** `Speculative`/`Computed` to `Unassigned` on a flush.
//!
//! Constant registers are never renamed.

use serde::Serialize;

use crate::common::reg::{RegId, RegisterFile};
use crate::core::pipeline::instance::InstanceId;

/// Readiness of a register mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum Readiness {
    /// The architectural file holds the value; never renamed since reset or rollback.
    #[default]
    Unassigned,
    /// A dispatched instance will produce the value.
    Speculative,
    /// The producer has finished; its value can be forwarded.
    Computed,
    /// The producer has retired; the architectural file holds the value.
    Committed,
}

impl Readiness {
    /// Returns true if moving from `self` to `next` is legal.
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (_, Self::Speculative)
                | (Self::Speculative, Self::Computed)
                | (Self::Computed, Self::Committed)
                | (Self::Speculative | Self::Computed, Self::Unassigned)
        )
    }

    /// Returns true if the architectural file holds the current value.
    pub const fn is_architectural(self) -> bool {
        matches!(self, Self::Unassigned | Self::Committed)
    }
}

/// Current mapping of one register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub struct Mapping {
    /// Producing instance, when one is in flight.
    pub producer: Option<InstanceId>,
    /// Readiness state.
    pub readiness: Readiness,
}

/// Where a source operand's value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandSource {
    /// Read the architectural register file.
    Architectural,
    /// Forward the computed result of this instance.
    Forward(InstanceId),
    /// Wait for this instance to compute.
    Pending(InstanceId),
}

/// Rename table covering every architectural register.
#[derive(Clone, Debug)]
pub struct RenameTable {
    mappings: Vec<Mapping>,
    constant: Vec<bool>,
}

impl RenameTable {
    /// Creates a table with every register `Unassigned`.
    pub fn new(regs: &RegisterFile) -> Self {
        Self {
            mappings: vec![Mapping::default(); regs.len()],
            constant: regs.iter().map(|(_, r)| r.constant).collect(),
        }
    }

    fn transition(&mut self, reg: RegId, producer: Option<InstanceId>, next: Readiness) {
        let mapping = &mut self.mappings[reg.index()];
        debug_assert!(
            mapping.readiness.can_become(next),
            "illegal rename transition {:?} -> {next:?} for register {}",
            mapping.readiness,
            reg.0
        );
        *mapping = Mapping {
            producer,
            readiness: next,
        };
    }

    /// Current mapping of `reg`.
    pub fn mapping(&self, reg: RegId) -> Mapping {
        self.mappings[reg.index()]
    }

    /// Resolves a source register for dispatch.
    pub fn lookup(&self, reg: RegId) -> OperandSource {
        let mapping = self.mappings[reg.index()];
        match (mapping.readiness, mapping.producer) {
            (Readiness::Speculative, Some(id)) => OperandSource::Pending(id),
            (Readiness::Computed, Some(id)) => OperandSource::Forward(id),
            _ => OperandSource::Architectural,
        }
    }

    /// Makes `id` the producer of `reg`. Constant registers are left alone.
    pub fn map_register_to_producer(&mut self, reg: RegId, id: InstanceId) {
        if self.constant[reg.index()] {
            return;
        }
        self.transition(reg, Some(id), Readiness::Speculative);
    }

    /// Marks every mapping still owned by `id` as computed.
    pub fn mark_computed(&mut self, id: InstanceId) {
        for idx in 0..self.mappings.len() {
            let mapping = self.mappings[idx];
            if mapping.producer == Some(id) && mapping.readiness == Readiness::Speculative {
                self.transition(RegId(idx as u16), Some(id), Readiness::Computed);
            }
        }
    }

    /// Retires `id` as a producer of `reg`.
    ///
    /// Returns false when a younger instance has remapped the register since,
    /// in which case the mapping is left untouched.
    pub fn commit(&mut self, reg: RegId, id: InstanceId) -> bool {
        if self.mappings[reg.index()].producer != Some(id) {
            return false;
        }
        self.transition(reg, None, Readiness::Committed);
        true
    }

    /// Recomputes the table after a flush from the surviving in-flight
    /// producers, given oldest first as `(register, producer, computed)`.
    pub fn rebuild(&mut self, survivors: impl IntoIterator<Item = (RegId, InstanceId, bool)>) {
        for idx in 0..self.mappings.len() {
            if !self.mappings[idx].readiness.is_architectural() {
                self.transition(RegId(idx as u16), None, Readiness::Unassigned);
            }
        }
        for (reg, id, computed) in survivors {
            self.map_register_to_producer(reg, id);
            if computed && !self.constant[reg.index()] {
                self.transition(reg, Some(id), Readiness::Computed);
            }
        }
    }

    /// Returns true if any mapping names `id` as its producer.
    pub fn references(&self, id: InstanceId) -> bool {
        self.mappings.iter().any(|m| m.producer == Some(id))
    }

    /// Iterates mappings in register order.
    pub fn iter(&self) -> impl Iterator<Item = (RegId, Mapping)> + '_ {
        self.mappings
            .iter()
            .enumerate()
            .map(|(idx, m)| (RegId(idx as u16), *m))
    }
}
