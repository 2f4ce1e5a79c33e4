//! Branch Target Buffer (BTB).
//!
//! A direct-mapped table of taken targets, looked up by fetch before the
//! branch executes. Entries are located with the same tag/index split the
//! data cache uses, with one instruction per block.

use crate::core::units::indexing::AddressSplit;
use crate::isa::instruction::INSTRUCTION_SIZE;

#[derive(Clone, Copy, Debug, Default)]
struct BtbEntry {
    tag: u64,
    target: u64,
    valid: bool,
}

/// Branch Target Buffer structure.
#[derive(Clone, Debug)]
pub struct Btb {
    table: Vec<BtbEntry>,
    split: AddressSplit,
}

impl Btb {
    /// Creates a BTB with `size` entries (a power of two).
    pub fn new(size: usize) -> Self {
        Self {
            table: vec![BtbEntry::default(); size],
            split: AddressSplit::new(INSTRUCTION_SIZE as usize, size),
        }
    }

    /// Target recorded for `pc`, if its entry is present.
    pub fn lookup(&self, pc: u64) -> Option<u64> {
        let entry = self.table[self.split.index(pc)];
        (entry.valid && entry.tag == self.split.tag(pc)).then_some(entry.target)
    }

    /// Records `target` for `pc`, replacing whatever held the slot.
    pub fn update(&mut self, pc: u64, target: u64) {
        self.table[self.split.index(pc)] = BtbEntry {
            tag: self.split.tag(pc),
            target,
            valid: true,
        };
    }
}
