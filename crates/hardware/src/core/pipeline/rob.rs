//! Reorder Buffer (ROB) for in-order commit.
//!
//! The ROB is a circular buffer holding every dispatched instance in fetch
//! order. It provides:
//! 1. **Allocation:** Appends an instance at dispatch; dispatch stalls when full.
//! 2. **Completion:** Marks instances done, or faulted, when execution finishes.
//! 3. **In-order Commit:** Retires from the head only, so commit follows fetch order.
//! 4. **Flush:** Drops every entry younger than a mispredicted branch.

use serde::Serialize;

use crate::common::error::FaultKind;
use crate::core::pipeline::instance::InstanceId;

/// Lifecycle state of an ROB entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum RobState {
    /// Waiting for execution to finish.
    #[default]
    Pending,
    /// Finished without fault; may commit.
    Completed,
    /// Finished with a fault; stops the run when it reaches the head.
    Faulted,
}

/// A single entry in the Reorder Buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobEntry {
    /// Instance held by this entry.
    pub id: InstanceId,
    /// Current lifecycle state.
    pub state: RobState,
    /// Fault raised while executing, if any.
    pub fault: Option<FaultKind>,
}

/// Reorder Buffer: circular buffer for in-order commit.
#[derive(Clone, Debug)]
pub struct Rob {
    /// Fixed-size slot array; `None` marks a free slot.
    entries: Vec<Option<RobEntry>>,
    /// Index of the oldest entry (commit point).
    head: usize,
    /// Index where the next entry will be allocated.
    tail: usize,
    /// Number of occupied slots.
    count: usize,
}

impl Rob {
    /// Creates a new ROB with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the ROB capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the ROB is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the ROB is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Returns the number of free slots.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.entries.len() - self.count
    }

    fn next(&self, idx: usize) -> usize {
        (idx + 1) % self.entries.len()
    }

    fn prev(&self, idx: usize) -> usize {
        if idx == 0 {
            self.entries.len() - 1
        } else {
            idx - 1
        }
    }

    /// Appends an instance. Returns false if the ROB is full.
    ///
    /// Instances must be pushed in increasing id order.
    pub fn push(&mut self, id: InstanceId) -> bool {
        if self.is_full() {
            return false;
        }
        debug_assert!(
            self.iter().last().is_none_or(|e| e.id < id),
            "ROB allocation out of fetch order"
        );
        self.entries[self.tail] = Some(RobEntry {
            id,
            state: RobState::Pending,
            fault: None,
        });
        self.tail = self.next(self.tail);
        self.count += 1;
        true
    }

    /// Marks an entry as Completed.
    pub fn complete(&mut self, id: InstanceId) {
        if let Some(entry) = self.find_entry_mut(id) {
            entry.state = RobState::Completed;
        }
    }

    /// Marks an entry as Faulted.
    pub fn fault(&mut self, id: InstanceId, kind: FaultKind) {
        if let Some(entry) = self.find_entry_mut(id) {
            entry.state = RobState::Faulted;
            entry.fault = Some(kind);
        }
    }

    /// Returns the head entry (oldest), if any.
    pub fn peek_head(&self) -> Option<&RobEntry> {
        if self.count == 0 {
            None
        } else {
            self.entries[self.head].as_ref()
        }
    }

    /// Removes and returns the head entry if it has finished, faulted or not.
    pub fn pop_head(&mut self) -> Option<RobEntry> {
        if self.peek_head()?.state == RobState::Pending {
            return None;
        }
        let entry = self.entries[self.head].take();
        self.head = self.next(self.head);
        self.count -= 1;
        entry
    }

    /// Flushes every entry younger than `id`, returning how many were dropped.
    pub fn flush_after(&mut self, id: InstanceId) -> usize {
        let mut dropped = 0;
        while self.count > 0 {
            let last = self.prev(self.tail);
            match &self.entries[last] {
                Some(entry) if entry.id > id => {
                    self.entries[last] = None;
                    self.tail = last;
                    self.count -= 1;
                    dropped += 1;
                }
                _ => break,
            }
        }
        dropped
    }

    /// Finds the entry holding `id`.
    pub fn find_entry(&self, id: InstanceId) -> Option<&RobEntry> {
        self.iter().find(|e| e.id == id)
    }

    fn find_entry_mut(&mut self, id: InstanceId) -> Option<&mut RobEntry> {
        self.entries.iter_mut().flatten().find(|e| e.id == id)
    }

    /// Entries from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &RobEntry> {
        let len = self.entries.len();
        (0..self.count).filter_map(move |i| self.entries[(self.head + i) % len].as_ref())
    }
}
