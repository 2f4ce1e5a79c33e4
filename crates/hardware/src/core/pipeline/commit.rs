//! Commit Stage: retire instances from the ROB head.
//!
//! Retires up to `commit_width` instances per cycle, strictly in fetch order:
//! 1. Writes the result to the architectural register file.
//! 2. Retires the rename mapping if it still names this instance.
//! 3. Applies a store's write to memory, passing it through the data cache.
//! 4. Updates the per-instruction counters.
//! 5. Stops the run on a halt instruction or a faulted head.
//!
//! A committed store never stalls commit: its cache latency is absorbed by
//! the write path.

use tracing::{info, trace, warn};

use crate::common::error::{FaultDescriptor, FaultKind};
use crate::core::cpu::{CpuState, HaltReason, RetiredInstruction};
use crate::core::pipeline::rob::RobState;
use crate::isa::semantics::Effect;

fn raise(state: &mut CpuState, descriptor: FaultDescriptor) {
    warn!(cycle = state.cycle, fault = %descriptor, "fault reached commit");
    state.fault = Some(descriptor);
    state.halt(HaltReason::Fault);
}

/// Executes the Commit stage.
pub fn commit_stage(state: &mut CpuState) {
    let cycle = state.cycle;
    for _ in 0..state.config.pipeline.commit_width {
        let Some(head) = state.rob.peek_head() else {
            break;
        };
        if head.state == RobState::Pending {
            break;
        }
        let Some(entry) = state.rob.pop_head() else {
            break;
        };
        let Some(inst) = state.arena.retire(entry.id) else {
            continue;
        };

        if let Some(kind) = entry.fault {
            raise(
                state,
                FaultDescriptor {
                    kind,
                    instance: inst.id,
                    pc: inst.pc(),
                    line: inst.decoded.line,
                    cycle,
                },
            );
            break;
        }

        if let Some(value) = inst.result {
            for reg in inst.decoded.destination_registers() {
                state.regs.write(reg, value.raw());
                let _ = state.rename.commit(reg, inst.id);
            }
        }
        if let Some(write) = state.lsq.commit(inst.id) {
            if let Err(f) = state.memory.write(write.address, write.width, write.data) {
                raise(
                    state,
                    FaultDescriptor {
                        kind: FaultKind::Memory(f),
                        instance: inst.id,
                        pc: inst.pc(),
                        line: inst.decoded.line,
                        cycle,
                    },
                );
                break;
            }
            state.stats.stores_committed += 1;
            if let Some(cache) = state.cache.as_mut() {
                let access = cache.access(write.address, true);
                state
                    .stats
                    .record_cache(access.hit, access.writeback, access.write_through);
                if !access.hit
                    && let Some(line) = state.stats.line_mut(inst.pc())
                {
                    line.cache_misses += 1;
                }
            }
        }

        state.retired.push(RetiredInstruction {
            id: inst.id,
            pc: inst.pc(),
            cycle,
        });
        state.stats.record_retired(&inst.decoded.semantics);
        if let Some(line) = state.stats.line_mut(inst.pc()) {
            line.committed += 1;
            line.cache_misses += u64::from(inst.cache_miss);
            if inst.resolution.is_some() {
                if inst.mispredicted() {
                    line.mispredictions += 1;
                } else {
                    line.correct_predictions += 1;
                }
            }
        }
        trace!(cycle, id = %inst.id, pc = inst.pc(), "commit");

        if inst.decoded.semantics.effect == Effect::Halt {
            info!(cycle, pc = inst.pc(), "halt committed");
            state.halt(HaltReason::HaltInstruction);
            break;
        }
    }
}
