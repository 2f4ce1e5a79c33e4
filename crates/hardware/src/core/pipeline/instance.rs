//! In-flight instruction instances and the arena that owns them.
//!
//! A new [`InFlightInstruction`] is created every time fetch reads a line, so
//! the iterations of a loop are distinct instances sharing one
//! [`DecodedInstruction`]. Every other pipeline structure refers to an
//! instance by its [`InstanceId`] only.
//!
//! Ids are handed out in fetch order and never reused, which makes the id
//! double as the fetch sequence number: "younger than X" is simply `id > X`,
//! and a flush is a single range removal from the arena.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::common::value::Value;
use crate::isa::decode::DecodedInstruction;

/// Identity and fetch sequence number of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct InstanceId(pub u64);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle position of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum Stage {
    /// Waiting in the fetch buffer.
    #[default]
    Fetched,
    /// Renamed, waiting in a reservation station.
    Dispatched,
    /// Executing on a functional unit or in the load/store queue.
    Issued,
    /// Result (or fault) known, waiting to commit.
    Completed,
}

/// Direction and next fetch address chosen for an instance at fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub struct Prediction {
    /// Predicted taken.
    pub taken: bool,
    /// Address fetch continued at.
    pub next_pc: u64,
}

/// Actual outcome of a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Branch was taken.
    pub taken: bool,
    /// Taken target.
    pub target: u64,
    /// Address execution actually continues at.
    pub next_pc: u64,
}

/// Cycle stamps of the lifecycle transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub struct Timing {
    /// Cycle the instance was fetched.
    pub fetched: u64,
    /// Cycle it left the fetch buffer.
    pub dispatched: Option<u64>,
    /// Cycle it started executing.
    pub issued: Option<u64>,
    /// Cycle its result became known.
    pub completed: Option<u64>,
}

/// One dynamic execution of a static instruction.
#[derive(Clone, Debug)]
pub struct InFlightInstruction {
    /// Identity and fetch order.
    pub id: InstanceId,
    /// Shared decoded form of the source line.
    pub decoded: Arc<DecodedInstruction>,
    /// Lifecycle position.
    pub stage: Stage,
    /// Operand values, one per argument, captured at issue.
    pub operands: Vec<Value>,
    /// Value written to the destination register, once computed.
    pub result: Option<Value>,
    /// Fetch-time prediction.
    pub prediction: Prediction,
    /// Branch outcome, once resolved.
    pub resolution: Option<Resolution>,
    /// Cycle stamps.
    pub timing: Timing,
    /// The load missed in the data cache.
    pub cache_miss: bool,
}

impl InFlightInstruction {
    /// Address of the instruction.
    pub fn pc(&self) -> u64 {
        self.decoded.pc
    }

    /// Returns true when the branch resolved against its prediction.
    pub fn mispredicted(&self) -> bool {
        self.resolution
            .is_some_and(|r| r.next_pc != self.prediction.next_pc)
    }
}

/// Owner of every live instance.
#[derive(Clone, Debug, Default)]
pub struct InstanceArena {
    live: BTreeMap<InstanceId, InFlightInstruction>,
    next_id: u64,
}

impl InstanceArena {
    /// Creates an empty arena. The first id handed out is `#1`.
    pub fn new() -> Self {
        Self {
            live: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Creates a new instance of `decoded`, fetched on `cycle`.
    pub fn allocate(
        &mut self,
        decoded: Arc<DecodedInstruction>,
        prediction: Prediction,
        cycle: u64,
    ) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        let _ = self.live.insert(
            id,
            InFlightInstruction {
                id,
                decoded,
                stage: Stage::Fetched,
                operands: Vec::new(),
                result: None,
                prediction,
                resolution: None,
                timing: Timing {
                    fetched: cycle,
                    ..Timing::default()
                },
                cache_miss: false,
            },
        );
        id
    }

    /// Looks up a live instance.
    pub fn get(&self, id: InstanceId) -> Option<&InFlightInstruction> {
        self.live.get(&id)
    }

    /// Looks up a live instance mutably.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut InFlightInstruction> {
        self.live.get_mut(&id)
    }

    /// Returns true if `id` is live.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.live.contains_key(&id)
    }

    /// Removes a committed instance.
    pub fn retire(&mut self, id: InstanceId) -> Option<InFlightInstruction> {
        self.live.remove(&id)
    }

    /// Removes every instance younger than `id`, returning how many were removed.
    pub fn flush_younger(&mut self, id: InstanceId) -> usize {
        let removed = self.live.split_off(&InstanceId(id.0 + 1));
        removed.len()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live instances in fetch order.
    pub fn iter(&self) -> impl Iterator<Item = &InFlightInstruction> {
        self.live.values()
    }

    /// Id the next allocation will receive.
    pub const fn next_id(&self) -> InstanceId {
        InstanceId(self.next_id)
    }
}
