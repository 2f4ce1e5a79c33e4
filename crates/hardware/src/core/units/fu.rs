//! Functional-unit pools.
//!
//! Each configured class owns `count` identical, non-pipelined units with a
//! fixed latency. An instance issued on cycle `c` occupies its unit until
//! cycle `c + latency`, when it completes and the unit becomes free for an
//! issue in that same cycle.

use crate::config::FunctionalUnitConfig;
use crate::core::pipeline::instance::InstanceId;
use crate::isa::semantics::FuClass;

/// An instance occupying a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Occupant {
    id: InstanceId,
    done_at: u64,
}

/// All units of one class.
#[derive(Clone, Debug)]
pub struct FunctionalUnitPool {
    class: FuClass,
    latency: u64,
    units: Vec<Option<Occupant>>,
}

impl FunctionalUnitPool {
    /// Creates a pool from its configuration.
    pub fn new(config: &FunctionalUnitConfig) -> Self {
        Self {
            class: config.class,
            latency: config.latency,
            units: vec![None; config.count],
        }
    }

    /// Unit class.
    pub const fn class(&self) -> FuClass {
        self.class
    }

    /// Cycles an instance occupies a unit.
    pub const fn latency(&self) -> u64 {
        self.latency
    }

    /// Number of idle units.
    pub fn free_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_none()).count()
    }

    /// Number of occupied units.
    pub fn busy_units(&self) -> usize {
        self.units.len() - self.free_units()
    }

    /// Starts `id` on an idle unit. Returns the completion cycle, or `None`
    /// if every unit is busy.
    pub fn start(&mut self, id: InstanceId, cycle: u64) -> Option<u64> {
        let slot = self.units.iter_mut().find(|u| u.is_none())?;
        let done_at = cycle + self.latency;
        *slot = Some(Occupant { id, done_at });
        Some(done_at)
    }

    /// Frees every unit whose instance finishes by `cycle`, returning those
    /// instances.
    pub fn drain_completed(&mut self, cycle: u64) -> Vec<InstanceId> {
        let mut done = Vec::new();
        for unit in &mut self.units {
            if let Some(occ) = *unit
                && occ.done_at <= cycle
            {
                done.push(occ.id);
                *unit = None;
            }
        }
        done
    }

    /// Instances currently occupying a unit.
    pub fn occupants(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.units.iter().flatten().map(|occ| occ.id)
    }

    /// Drops every occupant younger than `id`.
    pub fn flush_younger(&mut self, id: InstanceId) {
        for unit in &mut self.units {
            if unit.is_some_and(|occ| occ.id > id) {
                *unit = None;
            }
        }
    }
}

/// One optional pool per unit class, indexed by [`FuClass::index`].
#[derive(Clone, Debug)]
pub struct ExecutionUnits {
    pools: Vec<Option<FunctionalUnitPool>>,
}

impl ExecutionUnits {
    /// Builds the pools listed in the configuration.
    pub fn new(units: &[FunctionalUnitConfig]) -> Self {
        let mut pools = vec![None; FuClass::ALL.len()];
        for unit in units {
            pools[unit.class.index()] = Some(FunctionalUnitPool::new(unit));
        }
        Self { pools }
    }

    /// Returns true if at least one unit of `class` exists.
    pub fn has(&self, class: FuClass) -> bool {
        self.pools[class.index()].is_some()
    }

    /// Pool of `class`, if configured.
    pub fn pool(&self, class: FuClass) -> Option<&FunctionalUnitPool> {
        self.pools[class.index()].as_ref()
    }

    /// Mutable pool of `class`, if configured.
    pub fn pool_mut(&mut self, class: FuClass) -> Option<&mut FunctionalUnitPool> {
        self.pools[class.index()].as_mut()
    }

    /// Drains finished instances from every pool, oldest first.
    pub fn drain_completed(&mut self, cycle: u64) -> Vec<InstanceId> {
        let mut done: Vec<InstanceId> = self
            .pools
            .iter_mut()
            .flatten()
            .flat_map(|pool| pool.drain_completed(cycle))
            .collect();
        done.sort_unstable();
        done
    }

    /// Flushes every pool.
    pub fn flush_younger(&mut self, id: InstanceId) {
        for pool in self.pools.iter_mut().flatten() {
            pool.flush_younger(id);
        }
    }

    /// Iterates over configured pools.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionalUnitPool> {
        self.pools.iter().flatten()
    }
}
