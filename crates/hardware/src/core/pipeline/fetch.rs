//! Fetch Stage: instance creation and branch prediction.
//!
//! Reads up to `fetch_width` instructions starting at the PC, creating one
//! new instance per instruction read. Branches consult the predictor for a
//! direction and the BTB for a target; a predicted-taken branch with no
//! known target falls through. The group ends at the fetch buffer limit,
//! after `branch_follow_limit` predicted-taken branches, at the end of the
//! program, or after a halt instruction (fetch then waits for a redirect).

use std::sync::Arc;

use tracing::trace;

use crate::core::cpu::CpuState;
use crate::core::pipeline::instance::Prediction;
use crate::core::units::bru::BranchPredictor;
use crate::isa::instruction::INSTRUCTION_SIZE;
use crate::isa::semantics::Effect;

/// Executes the Fetch stage.
pub fn fetch_stage(state: &mut CpuState) {
    if state.fetch_halted || state.cycle < state.fetch_resume_at {
        return;
    }

    let width = state.config.pipeline.fetch_width;
    let buffer_size = state.config.pipeline.fetch_buffer_size;
    let follow_limit = state.config.pipeline.branch_follow_limit;
    let mut taken_followed = 0;

    for _ in 0..width {
        if state.fetch_buffer.len() >= buffer_size {
            state.stats.stalls_fetch_buffer += 1;
            break;
        }
        let pc = state.pc;
        let Some(decoded) = state.decoded_at(pc).map(Arc::clone) else {
            break;
        };

        let fall_through = pc + INSTRUCTION_SIZE;
        let prediction = if decoded.semantics.is_branch() {
            match state.predictor.predict_branch(pc) {
                (true, Some(target)) => Prediction {
                    taken: true,
                    next_pc: target,
                },
                _ => Prediction {
                    taken: false,
                    next_pc: fall_through,
                },
            }
        } else {
            Prediction {
                taken: false,
                next_pc: fall_through,
            }
        };

        let is_halt = decoded.semantics.effect == Effect::Halt;
        let id = state.arena.allocate(decoded, prediction, state.cycle);
        state.fetch_buffer.push_back(id);
        state.stats.instructions_fetched += 1;
        if let Some(line) = state.stats.line_mut(pc) {
            line.fetched += 1;
        }
        trace!(
            cycle = state.cycle,
            %id,
            pc,
            taken = prediction.taken,
            next_pc = prediction.next_pc,
            "fetch"
        );

        state.pc = prediction.next_pc;
        if is_halt {
            state.fetch_halted = true;
            break;
        }
        if prediction.taken {
            taken_followed += 1;
            if taken_followed >= follow_limit {
                break;
            }
        }
    }
}
