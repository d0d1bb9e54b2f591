use crate::error::{Chip8Error, Result};
use crate::STACK_SIZE;

/// A stack for 16-bit return addresses, used to call subroutines and return from them
pub struct Stack {
    slots: [u16; STACK_SIZE],
    /// Number of pending return addresses, also the index of the next free slot
    sp: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_SIZE],
            sp: 0,
        }
    }

    /// Push a return address. `pc` is the address of the call, used for reporting
    pub fn push(&mut self, addr: u16, pc: u16) -> Result<()> {
        let slot = self
            .slots
            .get_mut(self.sp)
            .ok_or(Chip8Error::StackOverflow { pc })?;
        *slot = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self, pc: u16) -> Result<u16> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { pc });
        }
        self.sp -= 1;
        Ok(self.slots[self.sp])
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn is_in_bounds(&self) -> bool {
        self.sp <= STACK_SIZE
    }

    #[cfg(test)]
    pub(crate) fn top(&self) -> Option<u16> {
        self.sp.checked_sub(1).map(|i| self.slots[i])
    }
}
