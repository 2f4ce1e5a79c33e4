//! Execute and memory stages, and misprediction recovery.
//!
//! Completion runs in instance-id order, so when two branches resolve in the
//! same cycle the older one flushes first and the younger, now discarded,
//! is skipped. Each completion:
//! 1. Evaluates the instance's semantics over the operands captured at issue.
//! 2. Publishes the result: rename mapping to `Computed`, waiting station
//!    entries woken (eligible from the next cycle), ROB entry completed.
//! 3. For branches, trains the predictor and recovers on a misprediction.
//! 4. For loads and stores, hands the effective address to the LSQ.
//!
//! The memory half then starts load accesses, timed by the data cache.
//!
//! Faults never stop the cycle: they are recorded in the ROB and only take
//! effect if the instance reaches commit.

use tracing::{debug, trace};

use crate::common::error::FaultKind;
use crate::common::value::Value;
use crate::core::cpu::CpuState;
use crate::core::pipeline::instance::{InstanceId, Resolution, Stage};
use crate::core::pipeline::lsq::ForwardResult;
use crate::core::units::bru::BranchPredictor;
use crate::isa::instruction::INSTRUCTION_SIZE;
use crate::isa::semantics::Outcome;

/// Publishes a finished instance's result.
fn finish(state: &mut CpuState, id: InstanceId, value: Option<Value>) {
    let cycle = state.cycle;
    if let Some(inst) = state.arena.get_mut(id) {
        inst.result = value;
        inst.stage = Stage::Completed;
        inst.timing.completed = Some(cycle);
    }
    if let Some(v) = value {
        state.rename.mark_computed(id);
        let _ = state.stations.wakeup(id, v, cycle);
    }
    state.rob.complete(id);
    trace!(cycle, %id, value = ?value, "complete");
}

/// Records a fault against an instance.
fn fault(state: &mut CpuState, id: InstanceId, kind: FaultKind) {
    let cycle = state.cycle;
    if let Some(inst) = state.arena.get_mut(id) {
        inst.stage = Stage::Completed;
        inst.timing.completed = Some(cycle);
    }
    debug!(cycle, %id, fault = %kind, "fault recorded");
    state.rob.fault(id, kind);
}

/// Discards every instance younger than `branch` and redirects fetch.
///
/// The rename table is rebuilt from the surviving ROB entries, oldest first,
/// so every register ends up mapped to its youngest surviving producer.
pub fn recover(state: &mut CpuState, branch: InstanceId, redirect: u64) {
    let flushed = state.arena.flush_younger(branch);
    state.fetch_buffer.clear();
    let _ = state.rob.flush_after(branch);
    state.stations.flush_younger(branch);
    state.units.flush_younger(branch);
    state.lsq.flush_younger(branch);

    let survivors: Vec<_> = state
        .rob
        .iter()
        .filter_map(|entry| state.arena.get(entry.id))
        .flat_map(|inst| {
            let computed = inst.result.is_some();
            inst.decoded
                .destination_registers()
                .map(move |reg| (reg, inst.id, computed))
        })
        .collect();
    state.rename.rebuild(survivors);

    state.pc = redirect;
    state.fetch_halted = false;
    state.fetch_resume_at = state.cycle + 1 + state.config.pipeline.flush_penalty;
    state.stats.instructions_flushed += flushed as u64;
    debug!(cycle = state.cycle, %branch, flushed, redirect, "misprediction flush");
}

fn resolve_branch(state: &mut CpuState, id: InstanceId, taken: bool, target: u64) {
    let Some(inst) = state.arena.get_mut(id) else {
        return;
    };
    let pc = inst.pc();
    let next_pc = if taken { target } else { pc + INSTRUCTION_SIZE };
    inst.resolution = Some(Resolution {
        taken,
        target,
        next_pc,
    });
    let mispredicted = inst.mispredicted();

    state.predictor.update_branch(pc, taken, taken.then_some(target));
    state.stats.branches_resolved += 1;
    if taken {
        state.stats.branches_taken += 1;
    }
    if mispredicted {
        state.stats.branch_mispredictions += 1;
        recover(state, id, next_pc);
    } else {
        state.stats.branch_predictions += 1;
    }
}

/// Executes the completion half of the Execute stage.
pub fn execute_stage(state: &mut CpuState) {
    let cycle = state.cycle;
    for id in state.units.drain_completed(cycle) {
        // Flushed by an older branch earlier in this loop.
        let Some(inst) = state.arena.get(id) else {
            continue;
        };
        let decoded = std::sync::Arc::clone(&inst.decoded);
        let outcome = decoded.semantics.execute(&inst.operands, decoded.pc);

        match outcome {
            Err(err) => fault(state, id, FaultKind::Semantics(err)),
            Ok(Outcome::Value(v)) => finish(state, id, Some(v)),
            Ok(Outcome::None) => finish(state, id, None),
            Ok(Outcome::Branch {
                taken,
                target,
                link,
            }) => {
                finish(state, id, link);
                resolve_branch(state, id, taken, target);
            }
            Ok(Outcome::Load { address, width }) => {
                if let Err(f) = state.memory.check(address, width) {
                    state.lsq.cancel(id);
                    fault(state, id, FaultKind::Memory(f));
                } else {
                    state.lsq.resolve_load(id, address, width);
                    trace!(cycle, %id, address, "load address");
                }
            }
            Ok(Outcome::Store {
                address,
                width,
                data,
            }) => {
                if let Err(f) = state.memory.check(address, width) {
                    state.lsq.cancel(id);
                    fault(state, id, FaultKind::Memory(f));
                } else {
                    state.lsq.resolve_store(id, address, width, data);
                    finish(state, id, None);
                }
            }
        }
    }
}

/// Reads `address` through the data cache, returning the access latency.
///
/// Without a cache every read takes `load_latency`.
fn cache_read(state: &mut CpuState, id: InstanceId, address: u64) -> u64 {
    let Some(cache) = state.cache.as_mut() else {
        return state.config.memory.load_latency;
    };
    let access = cache.access(address, false);
    state
        .stats
        .record_cache(access.hit, access.writeback, access.write_through);
    if let Some(inst) = state.arena.get_mut(id) {
        inst.cache_miss = !access.hit;
    }
    trace!(cycle = state.cycle, %id, address, hit = access.hit, "cache read");
    access.latency
}

/// Executes the memory half of the Execute stage.
///
/// Delivers loads whose access finished, then starts up to `load_ports`
/// waiting loads, oldest first. A load blocked by an older store is skipped
/// so younger independent loads can still proceed. Forwarded loads take
/// `load_latency`; loads that read memory go through the data cache when one
/// is configured.
pub fn memory_stage(state: &mut CpuState) {
    let cycle = state.cycle;
    for (id, value) in state.lsq.deliver(cycle) {
        finish(state, id, Some(value));
    }

    let mut ports = state.config.memory.load_ports;
    let forward_latency = state.config.memory.load_latency;
    for id in state.lsq.resolved_loads() {
        if ports == 0 {
            break;
        }
        let Some((address, width)) = state
            .lsq
            .find(id)
            .and_then(|e| Some((e.address?, e.width?)))
        else {
            continue;
        };
        let Some(semantics) = state
            .arena
            .get(id)
            .map(|i| std::sync::Arc::clone(&i.decoded.semantics))
        else {
            continue;
        };

        let (raw, latency) = match state.lsq.forward_load(id, address, width) {
            ForwardResult::Stall => {
                state.stats.stalls_memory_order += 1;
                continue;
            }
            ForwardResult::Hit(raw) => {
                state.stats.loads_forwarded += 1;
                (raw, forward_latency)
            }
            ForwardResult::Miss => match state.memory.read(address, width) {
                Ok(raw) => {
                    state.stats.loads_from_memory += 1;
                    (raw, cache_read(state, id, address))
                }
                Err(f) => {
                    state.lsq.cancel(id);
                    fault(state, id, FaultKind::Memory(f));
                    continue;
                }
            },
        };
        let value = semantics.load_result(raw, width);
        state.lsq.begin_access(id, value, cycle + latency);
        ports -= 1;
        trace!(cycle, %id, address, "load access");
    }
}
