//! Single-device bus: the narrow waist between the CPU and DRAM.

use crate::dram::{Dram, MemoryError, DRAM_BASE};

pub struct Bus {
    dram: Dram,
}

impl Bus {
    pub fn new() -> Self {
        Bus { dram: Dram::new() }
    }

    pub fn dram(&self) -> &Dram {
        &self.dram
    }

    pub fn load(&self, addr: u64, width: u32) -> Result<u64, MemoryError> {
        self.dram.load(addr, width)
    }

    pub fn store(&mut self, addr: u64, width: u32, value: u64) -> Result<(), MemoryError> {
        self.dram.store(addr, width, value)
    }

    /// Copies a whole file's bytes into DRAM starting at the current
    /// watermark and returns the guest physical address they now start at.
    pub fn alloc_data(&mut self, data: &[u8]) -> Result<u64, MemoryError> {
        self.dram.alloc_data(data)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure GPA <-> offset arithmetic, kept free of any DRAM instance so it can
/// be unit tested and reused by the loader and the disassembler alike.
pub fn offset_of(addr: u64) -> Result<u64, MemoryError> {
    addr.checked_sub(DRAM_BASE)
        .ok_or(MemoryError::BelowBase { addr })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_of_base_is_zero() {
        assert_eq!(offset_of(DRAM_BASE).unwrap(), 0);
    }

    #[test]
    fn offset_of_below_base_errors() {
        assert!(offset_of(DRAM_BASE - 1).is_err());
    }

    #[test]
    fn bus_roundtrips_through_dram() {
        let mut bus = Bus::new();
        bus.alloc_data(&[0u8; 8]).unwrap();
        bus.store(DRAM_BASE, 32, 42).unwrap();
        assert_eq!(bus.load(DRAM_BASE, 32).unwrap(), 42);
    }
}
