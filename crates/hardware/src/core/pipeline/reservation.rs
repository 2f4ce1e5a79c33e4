//! Reservation stations.
//!
//! One station per functional-unit class holds dispatched instances until
//! every operand slot is resolved. Selection is strictly oldest-first by
//! instance id, never by position in the station.

use crate::common::value::{DataType, Value};
use crate::core::pipeline::instance::InstanceId;
use crate::isa::semantics::FuClass;

/// One operand slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    /// Value known.
    Ready(Value),
    /// Waiting on a producer; the value is read back as `ty`.
    Waiting {
        /// Producing instance.
        producer: InstanceId,
        /// Declared type of the argument.
        ty: DataType,
    },
}

impl Operand {
    /// Returns the value of a resolved slot.
    pub const fn value(&self) -> Option<Value> {
        match self {
            Self::Ready(v) => Some(*v),
            Self::Waiting { .. } => None,
        }
    }
}

/// A waiting instance.
#[derive(Clone, Debug, PartialEq)]
pub struct RsEntry {
    /// Waiting instance.
    pub id: InstanceId,
    /// One slot per declared argument.
    pub slots: Vec<Operand>,
    /// Unit class the instance executes on.
    pub class: FuClass,
    /// First cycle the entry may issue.
    pub eligible_at: u64,
}

impl RsEntry {
    /// Returns true once every slot holds a value.
    pub fn is_ready(&self) -> bool {
        self.slots.iter().all(|s| matches!(s, Operand::Ready(_)))
    }

    /// Returns true if a slot still waits on `producer`.
    pub fn waits_on(&self, producer: InstanceId) -> bool {
        self.slots
            .iter()
            .any(|s| matches!(s, Operand::Waiting { producer: p, .. } if *p == producer))
    }

    /// Operand values, if every slot is resolved.
    pub fn values(&self) -> Option<Vec<Value>> {
        self.slots.iter().map(Operand::value).collect()
    }
}

/// Station for one unit class.
#[derive(Clone, Debug)]
pub struct ReservationStation {
    class: FuClass,
    capacity: usize,
    entries: Vec<RsEntry>,
}

impl ReservationStation {
    /// Creates an empty station.
    pub const fn new(class: FuClass, capacity: usize) -> Self {
        Self {
            class,
            capacity,
            entries: Vec::new(),
        }
    }

    /// Unit class served.
    pub const fn class(&self) -> FuClass {
        self.class
    }

    /// Number of waiting entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if no entry can be inserted.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Inserts an entry. Returns false if the station is full.
    pub fn insert(&mut self, entry: RsEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Resolves every slot waiting on `producer` with `value`, reinterpreted
    /// as the slot's declared type. Entries that become ready may issue from
    /// `cycle + 1`. Returns the number of slots resolved.
    pub fn wakeup(&mut self, producer: InstanceId, value: Value, cycle: u64) -> usize {
        let mut resolved = 0;
        for entry in &mut self.entries {
            let mut touched = false;
            for slot in &mut entry.slots {
                if let Operand::Waiting { producer: p, ty } = *slot
                    && p == producer
                {
                    *slot = Operand::Ready(Value::from_raw(value.raw(), ty));
                    touched = true;
                    resolved += 1;
                }
            }
            if touched && entry.is_ready() {
                entry.eligible_at = entry.eligible_at.max(cycle + 1);
            }
        }
        resolved
    }

    /// Removes and returns up to `limit` ready entries eligible on `cycle`,
    /// oldest first.
    pub fn select(&mut self, limit: usize, cycle: u64) -> Vec<RsEntry> {
        let mut candidates: Vec<InstanceId> = self
            .entries
            .iter()
            .filter(|e| e.eligible_at <= cycle && e.is_ready())
            .map(|e| e.id)
            .collect();
        candidates.sort_unstable();
        candidates.truncate(limit);

        let mut chosen = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
                chosen.push(self.entries.swap_remove(pos));
            }
        }
        chosen
    }

    /// Drops every entry younger than `id`.
    pub fn flush_younger(&mut self, id: InstanceId) {
        self.entries.retain(|e| e.id <= id);
    }

    /// Waiting entries, in no particular order.
    pub fn entries(&self) -> &[RsEntry] {
        &self.entries
    }
}

/// Every station, indexed by [`FuClass::index`].
#[derive(Clone, Debug)]
pub struct ReservationStations {
    stations: Vec<ReservationStation>,
}

impl ReservationStations {
    /// Creates one station of `capacity` entries per class.
    pub fn new(capacity: usize) -> Self {
        Self {
            stations: FuClass::ALL
                .iter()
                .map(|&class| ReservationStation::new(class, capacity))
                .collect(),
        }
    }

    /// Station of `class`.
    pub fn station(&self, class: FuClass) -> &ReservationStation {
        &self.stations[class.index()]
    }

    /// Mutable station of `class`.
    pub fn station_mut(&mut self, class: FuClass) -> &mut ReservationStation {
        &mut self.stations[class.index()]
    }

    /// Broadcasts a result to every station.
    pub fn wakeup(&mut self, producer: InstanceId, value: Value, cycle: u64) -> usize {
        self.stations
            .iter_mut()
            .map(|s| s.wakeup(producer, value, cycle))
            .sum()
    }

    /// Flushes every station.
    pub fn flush_younger(&mut self, id: InstanceId) {
        for station in &mut self.stations {
            station.flush_younger(id);
        }
    }

    /// Returns true if any entry still waits on `producer`.
    pub fn references(&self, producer: InstanceId) -> bool {
        self.stations
            .iter()
            .flat_map(|s| s.entries.iter())
            .any(|e| e.id == producer || e.waits_on(producer))
    }

    /// Total waiting entries.
    pub fn len(&self) -> usize {
        self.stations.iter().map(ReservationStation::len).sum()
    }

    /// Returns true if every station is empty.
    pub fn is_empty(&self) -> bool {
        self.stations.iter().all(ReservationStation::is_empty)
    }
}
