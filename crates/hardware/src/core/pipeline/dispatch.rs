//! Dispatch Stage: rename and allocation.
//!
//! Moves instances from the fetch buffer into the backend in fetch order:
//! 1. Checks for a free ROB slot, a free station slot of the right class and,
//!    for memory instructions, a free LSQ slot. The first instance that cannot
//!    get all of them stalls itself and every younger instance.
//! 2. Resolves source operands through the rename table before renaming the
//!    destination, so `addi x1, x1, 1` reads the previous producer.
//! 3. Maps destinations to the new instance and allocates the entries.
//!
//! Halt and no-op need no unit: they complete as soon as they enter the ROB.

use tracing::debug;

use crate::common::value::Value;
use crate::core::cpu::CpuState;
use crate::core::pipeline::instance::Stage;
use crate::core::pipeline::lsq::AccessKind;
use crate::core::pipeline::rename::OperandSource;
use crate::core::pipeline::reservation::{Operand, RsEntry};
use crate::isa::decode::DecodedOperand;
use crate::isa::semantics::Effect;

/// Why dispatch stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DispatchStall {
    /// No free reorder buffer slot.
    RobFull,
    /// No free slot in the station of the instance's class.
    StationFull,
    /// No free load/store queue slot.
    LsqFull,
}

/// Executes the Dispatch stage.
///
/// A stall ends the stage and is counted by cause in the statistics.
pub fn dispatch_stage(state: &mut CpuState) {
    let cycle = state.cycle;
    for _ in 0..state.config.pipeline.dispatch_width {
        let Some(&id) = state.fetch_buffer.front() else {
            break;
        };
        let Some(decoded) = state.arena.get(id).map(|i| std::sync::Arc::clone(&i.decoded)) else {
            // Dropped by a flush; nothing to dispatch.
            let _ = state.fetch_buffer.pop_front();
            continue;
        };
        let sem = &decoded.semantics;
        let access = match sem.effect {
            Effect::Load { .. } => Some(AccessKind::Load),
            Effect::Store { .. } => Some(AccessKind::Store),
            _ => None,
        };

        let stall = if state.rob.is_full() {
            Some(DispatchStall::RobFull)
        } else if sem
            .unit
            .is_some_and(|class| state.stations.station(class).is_full())
        {
            Some(DispatchStall::StationFull)
        } else if access.is_some() && state.lsq.is_full() {
            Some(DispatchStall::LsqFull)
        } else {
            None
        };
        if let Some(cause) = stall {
            match cause {
                DispatchStall::RobFull => state.stats.stalls_rob_full += 1,
                DispatchStall::StationFull => state.stats.stalls_rs_full += 1,
                DispatchStall::LsqFull => state.stats.stalls_lsq_full += 1,
            }
            debug!(cycle, %id, ?cause, "dispatch stall");
            return;
        }
        let _ = state.fetch_buffer.pop_front();

        let slots: Vec<Operand> = sem
            .arguments
            .iter()
            .zip(&decoded.operands)
            .enumerate()
            .map(|(pos, (arg, operand))| match *operand {
                DecodedOperand::Immediate(value) => Operand::Ready(value),
                DecodedOperand::Register(_) if !sem.sources().contains(&pos) => {
                    Operand::Ready(Value::zero(arg.data_type))
                }
                DecodedOperand::Register(reg) => {
                    let ty = arg.data_type;
                    match state.rename.lookup(reg) {
                        OperandSource::Architectural => {
                            Operand::Ready(Value::from_raw(state.regs.read(reg), ty))
                        }
                        OperandSource::Forward(producer) => {
                            match state.arena.get(producer).and_then(|p| p.result) {
                                Some(v) => Operand::Ready(Value::from_raw(v.raw(), ty)),
                                None => Operand::Waiting { producer, ty },
                            }
                        }
                        OperandSource::Pending(producer) => Operand::Waiting { producer, ty },
                    }
                }
            })
            .collect();

        for reg in decoded.destination_registers() {
            state.rename.map_register_to_producer(reg, id);
        }
        let _ = state.rob.push(id);

        match sem.unit {
            Some(class) => {
                let _ = state.stations.station_mut(class).insert(RsEntry {
                    id,
                    slots,
                    class,
                    eligible_at: cycle + 1,
                });
                if let Some(kind) = access {
                    let _ = state.lsq.allocate(id, kind);
                }
            }
            None => state.rob.complete(id),
        }

        if let Some(inst) = state.arena.get_mut(id) {
            inst.timing.dispatched = Some(cycle);
            if sem.unit.is_some() {
                inst.stage = Stage::Dispatched;
            } else {
                inst.stage = Stage::Completed;
                inst.timing.completed = Some(cycle);
            }
        }
        state.stats.instructions_dispatched += 1;
        debug!(cycle, %id, inst = %decoded, "dispatch");
    }
}
