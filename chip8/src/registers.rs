use std::ops::{Index, IndexMut};

use crate::REGISTER_COUNT;

/// Index of the flag register, VF
pub const FLAG: u8 = 0xF;

/// The 16 general-purpose 8-bit registers V0 through VF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers([u8; REGISTER_COUNT]);

impl Index<u8> for Registers {
    type Output = u8;

    fn index(&self, register: u8) -> &Self::Output {
        &self.0[(register & 0xF) as usize]
    }
}

impl IndexMut<u8> for Registers {
    fn index_mut(&mut self, register: u8) -> &mut Self::Output {
        &mut self.0[(register & 0xF) as usize]
    }
}

impl Registers {
    pub fn new() -> Self {
        Self([0; REGISTER_COUNT])
    }

    pub fn set_flag(&mut self, value: bool) {
        self[FLAG] = value as u8;
    }

    /// Registers V0 through Vx inclusive
    pub fn up_to(&self, x: u8) -> &[u8] {
        &self.0[..=(x & 0xF) as usize]
    }

    pub fn up_to_mut(&mut self, x: u8) -> &mut [u8] {
        &mut self.0[..=(x & 0xF) as usize]
    }

    pub fn as_array(&self) -> [u8; REGISTER_COUNT] {
        self.0
    }
}
