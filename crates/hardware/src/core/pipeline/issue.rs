//! Issue Stage: select ready instances onto free units.
//!
//! For every unit class, the oldest ready station entries (by instance id)
//! are started on that class's free units, one entry per free unit.

use tracing::debug;

use crate::core::cpu::CpuState;
use crate::core::pipeline::instance::Stage;
use crate::isa::semantics::FuClass;

/// Executes the Issue stage.
pub fn issue_stage(state: &mut CpuState) {
    let cycle = state.cycle;
    for class in FuClass::ALL {
        let Some(pool) = state.units.pool_mut(class) else {
            continue;
        };
        let free = pool.free_units();
        if free == 0 {
            continue;
        }
        for entry in state.stations.station_mut(class).select(free, cycle) {
            let Some(operands) = entry.values() else {
                continue;
            };
            if pool.start(entry.id, cycle).is_none() {
                continue;
            }
            if let Some(inst) = state.arena.get_mut(entry.id) {
                inst.operands = operands;
                inst.stage = Stage::Issued;
                inst.timing.issued = Some(cycle);
            }
            state.stats.instructions_issued += 1;
            debug!(cycle, id = %entry.id, ?class, "issue");
        }
    }
}
