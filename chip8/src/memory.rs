use std::fmt::Display;

use log::warn;

use crate::error::{Chip8Error, Result};
use crate::{MAX_ROM_SIZE, MEM_SIZE, ROM_ADDR};

pub struct Memory {
    data: [u8; MEM_SIZE],
}

impl Memory {
    /// Create an empty instance of the Memory struct
    pub fn new() -> Self {
        Self {
            data: [0; MEM_SIZE],
        }
    }

    pub fn read(&self, addr: usize) -> Result<u8> {
        self.data
            .get(addr)
            .copied()
            .ok_or(Chip8Error::MemoryBounds { addr })
    }

    pub fn write(&mut self, addr: usize, value: u8) -> Result<()> {
        let cell = self
            .data
            .get_mut(addr)
            .ok_or(Chip8Error::MemoryBounds { addr })?;
        if addr < ROM_ADDR {
            warn!("write of {:#04x} into reserved memory at {:#05x}", value, addr);
        }
        *cell = value;
        Ok(())
    }

    /// Fail unless all of `addr..addr + len` lies inside memory
    pub fn check_range(&self, addr: usize, len: usize) -> Result<()> {
        if addr + len > self.data.len() {
            return Err(Chip8Error::MemoryBounds {
                addr: addr.max(MEM_SIZE),
            });
        }
        Ok(())
    }

    /// Write `data` into memory starting at `addr`, failing before any byte is
    /// written if the block does not fit
    pub fn write_slice(&mut self, addr: usize, data: &[u8]) -> Result<()> {
        self.check_range(addr, data.len())?;
        self.data[addr..addr + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8]> {
        self.data
            .get(addr..addr + len)
            .ok_or(Chip8Error::MemoryBounds {
                addr: addr.max(MEM_SIZE),
            })
    }

    /// Copy a program image to the start of program memory
    pub fn load_program(&mut self, rom: &[u8]) -> Result<()> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.data[ROM_ADDR..].fill(0);
        self.write_slice(ROM_ADDR, rom)
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const BYTES_PER_LINE: usize = 16;
        for (line, chunk) in self.data.chunks(BYTES_PER_LINE).enumerate() {
            if chunk.iter().all(|&b| b == 0) {
                continue;
            }
            write!(f, "{:04X}: ", line * BYTES_PER_LINE)?;
            for byte in chunk {
                write!(f, "{:02X} ", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
