//! Fixed-capacity DRAM backing store with little-endian typed access.

use thiserror::Error;

/// Guest physical address at which DRAM byte 0 is mapped.
pub const DRAM_BASE: u64 = 0x8000_0000;

/// Total DRAM capacity in bytes (1 MiB).
pub const DRAM_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum MemoryError {
    #[error("address {addr:#x} is below DRAM_BASE ({base:#x})", base = DRAM_BASE)]
    BelowBase { addr: u64 },
    #[error("load at {addr:#x} (width {width}) exceeds allocated DRAM ({alloc:#x})")]
    LoadOutOfBounds { addr: u64, width: u32, alloc: u64 },
    #[error("store at {addr:#x} (width {width}) exceeds DRAM capacity ({size:#x})")]
    StoreOutOfBounds { addr: u64, width: u32, size: u64 },
}

/// A byte-addressed memory region of fixed capacity [`DRAM_SIZE`].
///
/// `alloc_size` is a watermark advanced only by the loader; loads past it
/// fault even though the backing buffer is fully allocated and zeroed.
pub struct Dram {
    mem: Vec<u8>,
    alloc_size: u64,
}

impl Dram {
    pub fn new() -> Self {
        Dram {
            mem: vec![0u8; DRAM_SIZE as usize],
            alloc_size: 0,
        }
    }

    pub fn alloc_size(&self) -> u64 {
        self.alloc_size
    }

    fn offset(addr: u64) -> Result<u64, MemoryError> {
        addr.checked_sub(DRAM_BASE)
            .ok_or(MemoryError::BelowBase { addr })
    }

    /// Appends `data` to the buffer starting at the current watermark,
    /// advancing it. Used by the ELF loader for the whole-file copy.
    pub fn alloc_data(&mut self, data: &[u8]) -> Result<u64, MemoryError> {
        let start = self.alloc_size;
        let end = start
            .checked_add(data.len() as u64)
            .ok_or(MemoryError::StoreOutOfBounds {
                addr: DRAM_BASE + start,
                width: data.len() as u32 * 8,
                size: DRAM_SIZE,
            })?;
        if end > DRAM_SIZE {
            return Err(MemoryError::StoreOutOfBounds {
                addr: DRAM_BASE + start,
                width: data.len() as u32 * 8,
                size: DRAM_SIZE,
            });
        }
        self.mem[start as usize..end as usize].copy_from_slice(data);
        self.alloc_size = end;
        Ok(DRAM_BASE + start)
    }

    pub fn load(&self, addr: u64, width: u32) -> Result<u64, MemoryError> {
        let offset = Self::offset(addr)?;
        let nbytes = (width / 8) as u64;
        if offset + nbytes > self.alloc_size {
            return Err(MemoryError::LoadOutOfBounds {
                addr,
                width,
                alloc: self.alloc_size,
            });
        }
        let mut value: u64 = 0;
        for i in 0..nbytes {
            value |= (self.mem[(offset + i) as usize] as u64) << (8 * i);
        }
        Ok(value)
    }

    pub fn store(&mut self, addr: u64, width: u32, value: u64) -> Result<(), MemoryError> {
        let offset = Self::offset(addr)?;
        let nbytes = (width / 8) as u64;
        if offset + nbytes > DRAM_SIZE {
            return Err(MemoryError::StoreOutOfBounds {
                addr,
                width,
                size: DRAM_SIZE,
            });
        }
        for i in 0..nbytes {
            self.mem[(offset + i) as usize] = ((value >> (8 * i)) & 0xff) as u8;
        }
        if offset + nbytes > self.alloc_size {
            self.alloc_size = offset + nbytes;
        }
        Ok(())
    }
}

impl Default for Dram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_initialised() {
        let mut d = Dram::new();
        d.alloc_data(&[0u8; 16]).unwrap();
        assert_eq!(d.load(DRAM_BASE, 64).unwrap(), 0);
    }

    #[test]
    fn byte_write_then_read() {
        let mut d = Dram::new();
        d.alloc_data(&[0u8; 8]).unwrap();
        d.store(DRAM_BASE, 8, 0xab).unwrap();
        assert_eq!(d.load(DRAM_BASE, 8).unwrap(), 0xab);
    }

    #[test]
    fn little_endian_halfword() {
        let mut d = Dram::new();
        d.alloc_data(&[0u8; 8]).unwrap();
        d.store(DRAM_BASE, 16, 0xbeef).unwrap();
        assert_eq!(d.load(DRAM_BASE, 8).unwrap(), 0xef);
        assert_eq!(d.load(DRAM_BASE + 1, 8).unwrap(), 0xbe);
        assert_eq!(d.load(DRAM_BASE, 16).unwrap(), 0xbeef);
    }

    #[test]
    fn little_endian_word_and_doubleword() {
        let mut d = Dram::new();
        d.alloc_data(&[0u8; 16]).unwrap();
        d.store(DRAM_BASE, 32, 0xdead_beef).unwrap();
        assert_eq!(d.load(DRAM_BASE, 32).unwrap(), 0xdead_beef);
        d.store(DRAM_BASE + 8, 64, 0x0123_4567_89ab_cdef).unwrap();
        assert_eq!(d.load(DRAM_BASE + 8, 64).unwrap(), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn load_past_watermark_faults() {
        let mut d = Dram::new();
        d.alloc_data(&[1, 2, 3, 4]).unwrap();
        assert!(d.load(DRAM_BASE + 4, 8).is_err());
    }

    #[test]
    fn store_past_capacity_faults() {
        let mut d = Dram::new();
        assert!(d.store(DRAM_BASE + DRAM_SIZE - 1, 16, 1).is_err());
    }

    #[test]
    fn address_below_base_faults() {
        let d = Dram::new();
        assert_eq!(d.load(0, 8), Err(MemoryError::BelowBase { addr: 0 }));
    }

    #[test]
    fn store_advances_watermark() {
        let mut d = Dram::new();
        d.store(DRAM_BASE, 32, 1).unwrap();
        assert_eq!(d.alloc_size(), 4);
    }
}
