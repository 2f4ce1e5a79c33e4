//! Load/Store Queue.
//!
//! Every load and store takes an entry at dispatch and keeps it until it
//! commits, so the queue always lists in-flight memory accesses in program
//! order. It provides:
//! 1. **Resolution:** Records effective addresses (and store data) once the AGU runs.
//! 2. **Disambiguation:** A load waits while any older store's address is unknown.
//! 3. **Forwarding:** A load fully covered by the newest overlapping older store takes its data.
//! 4. **Commit:** Hands a store's write to the caller exactly once, at retirement.

use std::collections::VecDeque;

use serde::Serialize;

use crate::common::value::Value;
use crate::core::pipeline::instance::InstanceId;
use crate::isa::semantics::AccessWidth;

/// Result of store-to-load forwarding check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardResult {
    /// Store fully covers the load: use the forwarded data.
    Hit(u64),
    /// No overlap with any older store: safe to read from memory.
    Miss,
    /// Unknown older address or partial overlap: retry later.
    Stall,
}

/// Direction of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AccessKind {
    /// Memory to register.
    Load,
    /// Register to memory, applied at commit.
    Store,
}

/// Lifecycle state of a queue entry.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum LsqState {
    /// Address not yet generated.
    #[default]
    Pending,
    /// Address (and store data) known; loads wait for a port.
    Resolved,
    /// Load data being returned; available on `done_at`.
    Accessing {
        /// Cycle the value is delivered.
        done_at: u64,
        /// Loaded value.
        value: Value,
    },
    /// Load delivered, or store waiting to commit.
    Done,
}

/// A single entry in the queue.
#[derive(Clone, Debug, PartialEq)]
pub struct LsqEntry {
    /// Accessing instance.
    pub id: InstanceId,
    /// Load or store.
    pub kind: AccessKind,
    /// Effective address, once known.
    pub address: Option<u64>,
    /// Access width, once known.
    pub width: Option<AccessWidth>,
    /// Store data, masked to the width.
    pub data: u64,
    /// Current lifecycle state.
    pub state: LsqState,
}

impl LsqEntry {
    fn overlaps(&self, address: u64, width: AccessWidth) -> Option<bool> {
        let start = self.address?;
        let end = start + self.width?.bytes() as u64;
        Some(address < end && address + width.bytes() as u64 > start)
    }
}

/// A store leaving the queue at commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreWrite {
    /// Byte address.
    pub address: u64,
    /// Width.
    pub width: AccessWidth,
    /// Data, masked to the width.
    pub data: u64,
}

/// Load/store queue in program order.
#[derive(Clone, Debug)]
pub struct LoadStoreQueue {
    entries: VecDeque<LsqEntry>,
    capacity: usize,
}

impl LoadStoreQueue {
    /// Creates a new queue with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the queue is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Reserves an entry at dispatch. Returns false if the queue is full.
    pub fn allocate(&mut self, id: InstanceId, kind: AccessKind) -> bool {
        if self.is_full() {
            return false;
        }
        debug_assert!(self.entries.back().is_none_or(|e| e.id < id));
        self.entries.push_back(LsqEntry {
            id,
            kind,
            address: None,
            width: None,
            data: 0,
            state: LsqState::Pending,
        });
        true
    }

    fn find_mut(&mut self, id: InstanceId) -> Option<&mut LsqEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Finds the entry of `id`.
    pub fn find(&self, id: InstanceId) -> Option<&LsqEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Records a store's address and data. The store is then complete.
    pub fn resolve_store(&mut self, id: InstanceId, address: u64, width: AccessWidth, data: u64) {
        if let Some(entry) = self.find_mut(id) {
            entry.address = Some(address);
            entry.width = Some(width);
            entry.data = data;
            entry.state = LsqState::Done;
        }
    }

    /// Records a load's address; it then waits for a memory port.
    pub fn resolve_load(&mut self, id: InstanceId, address: u64, width: AccessWidth) {
        if let Some(entry) = self.find_mut(id) {
            entry.address = Some(address);
            entry.width = Some(width);
            entry.state = LsqState::Resolved;
        }
    }

    /// Drops an entry whose access faulted at address generation.
    pub fn cancel(&mut self, id: InstanceId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Loads waiting for a port, oldest first.
    pub fn resolved_loads(&self) -> Vec<InstanceId> {
        self.entries
            .iter()
            .filter(|e| e.kind == AccessKind::Load && e.state == LsqState::Resolved)
            .map(|e| e.id)
            .collect()
    }

    /// Checks the stores older than load `id` for the bytes it reads.
    ///
    /// Any older store with an unresolved address stalls the load. Otherwise
    /// the newest overlapping older store decides: full cover forwards its
    /// data, partial overlap stalls until that store commits.
    pub fn forward_load(&self, id: InstanceId, address: u64, width: AccessWidth) -> ForwardResult {
        let older = || {
            self.entries
                .iter()
                .take_while(move |e| e.id < id)
                .filter(|e| e.kind == AccessKind::Store)
        };
        if older().any(|e| e.address.is_none()) {
            return ForwardResult::Stall;
        }

        let Some(store) = older()
            .filter(|e| e.overlaps(address, width) == Some(true))
            .last()
        else {
            return ForwardResult::Miss;
        };
        let (Some(start), Some(store_width)) = (store.address, store.width) else {
            return ForwardResult::Stall;
        };
        let end = start + store_width.bytes() as u64;
        if start <= address && address + width.bytes() as u64 <= end {
            let shifted = store.data >> ((address - start) * 8);
            ForwardResult::Hit(shifted & width.mask())
        } else {
            ForwardResult::Stall
        }
    }

    /// Starts returning `value` for load `id`, delivered on `done_at`.
    pub fn begin_access(&mut self, id: InstanceId, value: Value, done_at: u64) {
        if let Some(entry) = self.find_mut(id) {
            entry.state = LsqState::Accessing { done_at, value };
        }
    }

    /// Loads whose value is delivered by `cycle`, oldest first. They are marked done.
    pub fn deliver(&mut self, cycle: u64) -> Vec<(InstanceId, Value)> {
        let mut delivered = Vec::new();
        for entry in &mut self.entries {
            if let LsqState::Accessing { done_at, value } = entry.state
                && done_at <= cycle
            {
                entry.state = LsqState::Done;
                delivered.push((entry.id, value));
            }
        }
        delivered
    }

    /// Removes the committing instance's entry, returning the write a store
    /// must apply to memory.
    pub fn commit(&mut self, id: InstanceId) -> Option<StoreWrite> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(pos)?;
        match (entry.kind, entry.address, entry.width) {
            (AccessKind::Store, Some(address), Some(width)) => Some(StoreWrite {
                address,
                width,
                data: entry.data,
            }),
            _ => None,
        }
    }

    /// Drops every entry younger than `id`.
    pub fn flush_younger(&mut self, id: InstanceId) {
        while self.entries.back().is_some_and(|e| e.id > id) {
            let _ = self.entries.pop_back();
        }
    }

    /// Entries in program order.
    pub fn iter(&self) -> impl Iterator<Item = &LsqEntry> {
        self.entries.iter()
    }
}
