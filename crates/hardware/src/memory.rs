//! Byte-addressable memory image.
//!
//! A flat, little-endian byte array starting at address zero. Every access is
//! checked: it must lie entirely inside the image and be naturally aligned to
//! its width. Violations are reported as [`MemoryFault`]s rather than panics,
//! since a fault raised by a speculative access must travel to commit.

use crate::common::error::MemoryFault;
use crate::isa::semantics::AccessWidth;

/// Simulated data memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: Vec<u8>,
}

impl MemoryImage {
    /// Creates a zero-filled image of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Size of the image in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-sized image.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Validates an access without performing it.
    pub fn check(&self, address: u64, width: AccessWidth) -> Result<(), MemoryFault> {
        let bytes = width.bytes();
        if address % bytes as u64 != 0 {
            return Err(MemoryFault::Misaligned {
                address,
                width: bytes,
            });
        }
        self.range(address, bytes).map(|_| ())
    }

    fn range(&self, address: u64, len: usize) -> Result<std::ops::Range<usize>, MemoryFault> {
        let out_of_range = MemoryFault::OutOfRange {
            address,
            width: len,
        };
        let start = usize::try_from(address).map_err(|_| out_of_range)?;
        let end = start.checked_add(len).ok_or(out_of_range)?;
        if end > self.bytes.len() {
            return Err(out_of_range);
        }
        Ok(start..end)
    }

    /// Reads `width` bytes, zero-extended.
    pub fn read(&self, address: u64, width: AccessWidth) -> Result<u64, MemoryFault> {
        self.check(address, width)?;
        let range = self.range(address, width.bytes())?;
        let mut buf = [0u8; 8];
        buf[..width.bytes()].copy_from_slice(&self.bytes[range]);
        Ok(u64::from_le_bytes(buf))
    }

    /// Writes the low `width` bytes of `value`.
    pub fn write(&mut self, address: u64, width: AccessWidth, value: u64) -> Result<(), MemoryFault> {
        self.check(address, width)?;
        let range = self.range(address, width.bytes())?;
        let bytes = value.to_le_bytes();
        self.bytes[range].copy_from_slice(&bytes[..width.bytes()]);
        Ok(())
    }

    /// Copies raw bytes into the image, without an alignment requirement.
    pub fn load(&mut self, address: u64, data: &[u8]) -> Result<(), MemoryFault> {
        let range = self.range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Borrows a byte range.
    pub fn slice(&self, address: u64, len: usize) -> Result<&[u8], MemoryFault> {
        let range = self.range(address, len)?;
        Ok(&self.bytes[range])
    }
}
