//! Address splitting for direct-mapped and set-associative tables.
//!
//! The BTB and the data cache both locate an address the same way: the low
//! block-offset bits are dropped, the next bits select a set and whatever is
//! left is kept as the tag.

/// Splits addresses into tag, set index and block offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressSplit {
    offset_bits: u32,
    index_bits: u32,
}

impl AddressSplit {
    /// Creates a split for blocks of `block_bytes` spread over `sets` sets.
    ///
    /// Both must be powers of two; configuration validation guarantees it.
    pub const fn new(block_bytes: usize, sets: usize) -> Self {
        Self {
            offset_bits: block_bytes.trailing_zeros(),
            index_bits: sets.trailing_zeros(),
        }
    }

    /// Number of sets.
    pub const fn sets(&self) -> usize {
        1 << self.index_bits
    }

    /// Bytes per block.
    pub const fn block_bytes(&self) -> usize {
        1 << self.offset_bits
    }

    /// Set selected by `address`.
    pub const fn index(&self, address: u64) -> usize {
        let mask = (1u64 << self.index_bits) - 1;
        ((address >> self.offset_bits) & mask) as usize
    }

    /// Tag stored for `address`.
    pub const fn tag(&self, address: u64) -> u64 {
        match address.checked_shr(self.offset_bits + self.index_bits) {
            Some(tag) => tag,
            None => 0,
        }
    }

    /// Byte offset of `address` within its block.
    pub const fn offset(&self, address: u64) -> usize {
        (address & ((1u64 << self.offset_bits) - 1)) as usize
    }

    /// First address of the block holding `address`.
    pub const fn block_base(&self, address: u64) -> u64 {
        address & !((1u64 << self.offset_bits) - 1)
    }
}
