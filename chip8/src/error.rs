use thiserror::Error;

/// Everything that can stop the interpreter or reject a program image.
///
/// Only [`Chip8Error::RomTooLarge`] is recoverable; every other variant is fatal
/// and latches the machine in a halted state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Chip8Error {
    #[error("rom is {size} bytes, at most {max} bytes fit in program memory")]
    RomTooLarge { size: usize, max: usize },

    #[error("memory access out of bounds at {addr:#06x}")]
    MemoryBounds { addr: usize },

    #[error("call stack overflow at {pc:#06x}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at {pc:#06x}")]
    StackUnderflow { pc: u16 },

    #[error("program counter out of bounds: {pc:#06x}")]
    ProgramCounterOutOfBounds { pc: u16 },

    #[error("index register out of bounds: {i:#06x}")]
    IndexOutOfBounds { i: u16 },

    #[error("stack pointer out of bounds: {sp}")]
    StackPointerOutOfBounds { sp: usize },
}

impl Chip8Error {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Chip8Error::RomTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
