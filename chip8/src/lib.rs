mod display;
mod error;
mod instruction;
mod keypad;
mod memory;
mod registers;
mod stack;
mod timers;

use std::fmt::Display as FmtDisplay;
use std::path::Path;

use anyhow::Context;
use log::{debug, error, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::display::Display;
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::registers::Registers;
use crate::stack::Stack;
use crate::timers::Timers;

pub use crate::display::FrameBuffer;
pub use crate::error::{Chip8Error, Result};
pub use crate::instruction::{Instruction, Opcode};
pub use crate::keypad::Key;
pub use crate::timers::{Audio, Silent};

pub const FONT_CHAR_LENGTH: usize = 5;

pub const FONT_DATA: [u8; FONT_CHAR_LENGTH * 0x10] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub const FONT_ADDR: usize = 0x050;

pub const MEM_SIZE: usize = 0x1000;
pub const ROM_ADDR: usize = 0x200;
pub const MAX_ROM_SIZE: usize = MEM_SIZE - ROM_ADDR;
pub const STACK_SIZE: usize = 0x10;
pub const REGISTER_COUNT: usize = 0x10;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

struct Chip8Config {
    /// Shifts copy Vy into Vx before shifting
    legacy_shift: bool,
    /// BNNN jumps to NNN + V0 instead of NNN + Vx
    jump_offset_v0: bool,
    /// FX55/FX65 leave I pointing just past the last register transferred
    memory_increment_i: bool,
}

impl Chip8Config {
    pub fn new() -> Self {
        Self {
            legacy_shift: false,
            jump_offset_v0: false,
            memory_increment_i: true,
        }
    }
}

/// What a successful call to [`Chip8::step`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed(Instruction),
    /// FX0A found no key held; the same instruction runs again next step
    AwaitingKey,
    /// The word at `addr` is not an instruction. Execution continues after it
    Unknown { addr: u16, word: u16 },
}

/// Read-only copy of the CPU state, handed to step observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub pc: u16,
    pub i: u16,
    pub sp: usize,
    pub v: [u8; REGISTER_COUNT],
    pub delay: u8,
    pub sound: u8,
    /// The most recently fetched instruction word
    pub opcode: u16,
}

impl FmtDisplay for CpuSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..4 {
            for col in 0..4 {
                let r = col * 4 + row;
                write!(f, "V{:X}: {:#04x}  ", r, self.v[r])?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "PC: {:#06x}  I: {:#06x}  SP: {}  DT: {}  ST: {}  OP: {}",
            self.pc,
            self.i,
            self.sp,
            self.delay,
            self.sound,
            Instruction::decode(self.opcode)
        )
    }
}

type Observer = Box<dyn FnMut(&CpuSnapshot)>;

pub struct Chip8 {
    config: Chip8Config,
    /// RAM that stores font data, ROMs, and is fully writeable
    memory: Memory,
    /// A frame buffer containing binary pixel states
    display: Display,
    /// A hexadecimal keypad containing 16 key states labelled 0 through F
    keypad: Keypad,
    /// A stack for 16-bit addresses, which is used to call subroutines/functions and return from them
    stack: Stack,
    /// 16 8-bit general-purpose variable registers numbered 0 through F hexadecimal
    v: Registers,
    /// The program counter points to the current instruction in memory
    pc: u16,
    /// The index register is used to point at locations in memory
    i: u16,
    timers: Timers,
    rng: StdRng,
    opcode: u16,
    /// Set by the first fatal error; the machine refuses to run afterwards
    fault: Option<Chip8Error>,
    observer: Option<Observer>,
}

impl Chip8 {
    pub fn new() -> anyhow::Result<Self> {
        let mut memory = Memory::new();
        memory
            .write_slice(FONT_ADDR, &FONT_DATA)
            .context("write font into memory")?;

        Ok(Chip8 {
            config: Chip8Config::new(),
            memory,
            display: Display::new(),
            keypad: Keypad::new(),
            stack: Stack::new(),
            v: Registers::new(),
            pc: ROM_ADDR as u16,
            i: 0,
            timers: Timers::new(),
            rng: StdRng::from_os_rng(),
            opcode: 0,
            fault: None,
            observer: None,
        })
    }

    /* Config builder functions */
    pub fn legacy_shift(mut self, value: bool) -> Self {
        self.config.legacy_shift = value;
        self
    }

    pub fn jump_offset_v0(mut self, value: bool) -> Self {
        self.config.jump_offset_v0 = value;
        self
    }

    pub fn memory_increment_i(mut self, value: bool) -> Self {
        self.config.memory_increment_i = value;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Register a hook that receives a snapshot after every successful step
    pub fn on_step(mut self, observer: impl FnMut(&CpuSnapshot) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Load a program image and reset the machine to run it from the start.
    /// Config, random source and observer survive the reset
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        self.memory.load_program(rom)?;
        self.pc = ROM_ADDR as u16;
        self.i = 0;
        self.v = Registers::new();
        self.stack = Stack::new();
        self.timers = Timers::new();
        self.display = Display::new();
        self.opcode = 0;
        self.fault = None;
        debug!("loaded {} byte rom at {:#05x}", rom.len(), ROM_ADDR);
        Ok(())
    }

    pub fn load_rom_from_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let buf = std::fs::read(path)
            .with_context(|| format!("read rom file {}", path.display()))?;
        self.load_rom(&buf).context("load rom from file")?;
        Ok(())
    }

    pub fn is_fb_dirty(&self) -> bool {
        self.display.is_dirty()
    }

    pub fn clear_dirty(&mut self) {
        self.display.clear_dirty();
    }

    pub fn framebuffer_snapshot(&self) -> FrameBuffer {
        self.display.snapshot()
    }

    pub fn is_sound_playing(&self) -> bool {
        self.timers.sound > 0
    }

    pub fn fault(&self) -> Option<&Chip8Error> {
        self.fault.as_ref()
    }

    pub fn keydown(&mut self, key: Key) {
        self.keypad.keydown(key);
    }

    pub fn keyup(&mut self, key: Key) {
        self.keypad.keyup(key);
    }

    /// Advance both timers by one 60 Hz tick, gating `audio` on the sound timer
    pub fn tick(&mut self, audio: &mut dyn Audio) {
        self.timers.tick(audio);
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            pc: self.pc,
            i: self.i,
            sp: self.stack.sp(),
            v: self.v.as_array(),
            delay: self.timers.delay,
            sound: self.timers.sound,
            opcode: self.opcode,
        }
    }

    /// Run one fetch-decode-execute cycle.
    ///
    /// A fatal error halts the machine: it is returned now and on every later call.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        match self.try_step() {
            Ok(outcome) => {
                if self.observer.is_some() {
                    let snapshot = self.snapshot();
                    if let Some(observer) = self.observer.as_mut() {
                        observer(&snapshot);
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                error!("halting: {}", e);
                self.fault = Some(e.clone());
                Err(e)
            }
        }
    }

    fn try_step(&mut self) -> Result<StepOutcome> {
        self.check_bounds()?;
        let addr = self.pc;
        let word = self.fetch()?;
        let instruction = Instruction::decode(word);
        trace!("{:#05x}: {:04X} {}", addr, word, instruction);
        self.execute(instruction, addr)
    }

    fn check_bounds(&self) -> Result<()> {
        if self.pc as usize + 1 >= MEM_SIZE {
            return Err(Chip8Error::ProgramCounterOutOfBounds { pc: self.pc });
        }
        if self.i as usize >= MEM_SIZE {
            return Err(Chip8Error::IndexOutOfBounds { i: self.i });
        }
        if !self.stack.is_in_bounds() {
            return Err(Chip8Error::StackPointerOutOfBounds {
                sp: self.stack.sp(),
            });
        }
        Ok(())
    }

    fn fetch(&mut self) -> Result<u16> {
        let pc = self.pc as usize;
        let b1 = self.memory.read(pc)? as u16;
        let b2 = self.memory.read(pc + 1)? as u16;

        self.pc += 2;
        self.opcode = b1 << 8 | b2;

        Ok(self.opcode)
    }

    fn execute(&mut self, instruction: Instruction, addr: u16) -> Result<StepOutcome> {
        use Instruction::*;

        match instruction {
            ClearScreen => self.op_cls(),
            Return => self.op_sub_return(addr)?,
            Jump { nnn } => self.op_jump(nnn),
            Call { nnn } => self.op_sub_call(nnn, addr)?,
            SkipEqImm { x, nn } => self.op_skip_eq(x, nn),
            SkipNeImm { x, nn } => self.op_skip_ne(x, nn),
            SkipEqReg { x, y } => self.op_skip_reg_eq(x, y),
            LoadImm { x, nn } => self.op_set(x, nn),
            AddImm { x, nn } => self.op_add(x, nn),
            Copy { x, y } => self.op_reg_set(x, y),
            Or { x, y } => self.op_reg_or(x, y),
            And { x, y } => self.op_reg_and(x, y),
            Xor { x, y } => self.op_reg_xor(x, y),
            AddReg { x, y } => self.op_reg_add(x, y),
            Sub { x, y } => self.op_reg_sub_right(x, y),
            ShiftRight { x, y } => self.op_reg_shift_right(x, y),
            SubReverse { x, y } => self.op_reg_sub_left(x, y),
            ShiftLeft { x, y } => self.op_reg_shift_left(x, y),
            SkipNeReg { x, y } => self.op_skip_reg_ne(x, y),
            LoadIndex { nnn } => self.op_set_index(nnn),
            JumpOffset { x, nnn } => self.op_jump_with_offset(nnn, x),
            Random { x, nn } => self.op_random(x, nn),
            Draw { x, y, n } => self.op_display(x, y, n)?,
            SkipKeyDown { x } => self.op_skip_if_key_down(x),
            SkipKeyUp { x } => self.op_skip_if_key_up(x),
            ReadDelay { x } => self.op_dt_get(x),
            WaitKey { x } => {
                if !self.op_get_key(x) {
                    return Ok(StepOutcome::AwaitingKey);
                }
            }
            SetDelay { x } => self.op_dt_set(x),
            SetSound { x } => self.op_st_set(x),
            AddIndex { x } => self.op_add_to_index(x),
            LoadGlyph { x } => self.op_font_character(x),
            StoreDigits { x } => self.op_convert_to_decimal(x)?,
            StoreRegisters { x } => self.op_memory_store(x)?,
            LoadRegisters { x } => self.op_memory_load(x)?,
            Unknown(word) => {
                warn!("unknown instruction {:04X} at {:#05x}, skipping", word, addr);
                return Ok(StepOutcome::Unknown { addr, word });
            }
        }

        Ok(StepOutcome::Executed(instruction))
    }

    /* Operations */

    /// 0x00E0
    fn op_cls(&mut self) {
        self.display.clear();
    }

    /// 0x00EE
    fn op_sub_return(&mut self, addr: u16) -> Result<()> {
        self.pc = self.stack.pop(addr)?;
        Ok(())
    }

    /// 0x1NNN
    fn op_jump(&mut self, nnn: u16) {
        self.pc = nnn;
    }

    /// 0x2NNN
    fn op_sub_call(&mut self, nnn: u16, addr: u16) -> Result<()> {
        self.stack.push(self.pc, addr)?;
        self.pc = nnn;
        Ok(())
    }

    /// 0x3XNN
    fn op_skip_eq(&mut self, x: u8, nn: u8) {
        if self.v[x] == nn {
            self.pc += 2;
        }
    }

    /// 0x4XNN
    fn op_skip_ne(&mut self, x: u8, nn: u8) {
        if self.v[x] != nn {
            self.pc += 2;
        }
    }

    /// 0x5XY0
    fn op_skip_reg_eq(&mut self, x: u8, y: u8) {
        if self.v[x] == self.v[y] {
            self.pc += 2;
        }
    }

    /// 0x6XNN
    fn op_set(&mut self, x: u8, nn: u8) {
        self.v[x] = nn;
    }

    /// 0x7XNN
    fn op_add(&mut self, x: u8, nn: u8) {
        self.v[x] = self.v[x].wrapping_add(nn);
    }

    /// 0x8XY0
    fn op_reg_set(&mut self, x: u8, y: u8) {
        self.v[x] = self.v[y];
    }

    /// 0x8XY1
    fn op_reg_or(&mut self, x: u8, y: u8) {
        self.v[x] |= self.v[y];
    }

    /// 0x8XY2
    fn op_reg_and(&mut self, x: u8, y: u8) {
        self.v[x] &= self.v[y];
    }

    /// 0x8XY3
    fn op_reg_xor(&mut self, x: u8, y: u8) {
        self.v[x] ^= self.v[y];
    }

    /// 0x8XY4
    fn op_reg_add(&mut self, x: u8, y: u8) {
        let (sum, overflow) = self.v[x].overflowing_add(self.v[y]);
        self.v[x] = sum;
        self.v.set_flag(overflow);
    }

    /// 0x8XY5, VF is 1 when no borrow occurred
    fn op_reg_sub_right(&mut self, x: u8, y: u8) {
        let (diff, borrow) = self.v[x].overflowing_sub(self.v[y]);
        self.v[x] = diff;
        self.v.set_flag(!borrow);
    }

    /// 0x8XY6
    fn op_reg_shift_right(&mut self, x: u8, y: u8) {
        if self.config.legacy_shift {
            self.v[x] = self.v[y];
        }
        let flag = self.v[x] & 0x1;
        self.v[x] >>= 1;
        self.v.set_flag(flag == 1);
    }

    /// 0x8XY7, VF is 1 when no borrow occurred
    fn op_reg_sub_left(&mut self, x: u8, y: u8) {
        let (diff, borrow) = self.v[y].overflowing_sub(self.v[x]);
        self.v[x] = diff;
        self.v.set_flag(!borrow);
    }

    /// 0x8XYE
    fn op_reg_shift_left(&mut self, x: u8, y: u8) {
        if self.config.legacy_shift {
            self.v[x] = self.v[y];
        }
        let flag = self.v[x] >> 7 & 0x1;
        self.v[x] <<= 1;
        self.v.set_flag(flag == 1);
    }

    /// 0x9XY0
    fn op_skip_reg_ne(&mut self, x: u8, y: u8) {
        if self.v[x] != self.v[y] {
            self.pc += 2;
        }
    }

    /// 0xANNN
    fn op_set_index(&mut self, nnn: u16) {
        self.i = nnn;
    }

    /// 0xBNNN. Offsets by Vx unless configured for the V0 variant
    fn op_jump_with_offset(&mut self, nnn: u16, x: u8) {
        let idx = if self.config.jump_offset_v0 { 0 } else { x };
        self.pc = nnn + self.v[idx] as u16;
    }

    /// 0xCXNN
    fn op_random(&mut self, x: u8, nn: u8) {
        self.v[x] = nn & self.rng.random::<u8>();
    }

    /// 0xDXYN
    fn op_display(&mut self, x: u8, y: u8, n: u8) -> Result<()> {
        let vx = self.v[x] as usize;
        let vy = self.v[y] as usize;

        let rows = self.memory.slice(self.i as usize, n as usize)?;
        let collision = self.display.draw_sprite(vx, vy, rows);
        self.v.set_flag(collision);
        Ok(())
    }

    /// 0xEX9E
    fn op_skip_if_key_down(&mut self, x: u8) {
        if self.keypad.is_key_down(self.v[x]) {
            self.pc += 2;
        }
    }

    /// 0xEXA1
    fn op_skip_if_key_up(&mut self, x: u8) {
        if self.keypad.is_key_up(self.v[x]) {
            self.pc += 2;
        }
    }

    /// 0xFX07
    fn op_dt_get(&mut self, x: u8) {
        self.v[x] = self.timers.delay;
    }

    /// 0xFX0A. Returns false and rewinds to this instruction while no key is held
    fn op_get_key(&mut self, x: u8) -> bool {
        match self.keypad.first_pressed() {
            Some(key) => {
                self.v[x] = key.code();
                true
            }
            None => {
                self.pc -= 2;
                false
            }
        }
    }

    /// 0xFX15
    fn op_dt_set(&mut self, x: u8) {
        self.timers.delay = self.v[x];
    }

    /// 0xFX18
    fn op_st_set(&mut self, x: u8) {
        self.timers.sound = self.v[x];
    }

    /// 0xFX1E
    fn op_add_to_index(&mut self, x: u8) {
        self.i = self.i.wrapping_add(self.v[x] as u16);
    }

    /// 0xFX29
    fn op_font_character(&mut self, x: u8) {
        self.i = (FONT_ADDR + FONT_CHAR_LENGTH * self.v[x] as usize) as u16;
    }

    /// 0xFX33
    fn op_convert_to_decimal(&mut self, x: u8) -> Result<()> {
        let n = self.v[x];
        let i = self.i as usize;
        self.memory.check_range(i, 3)?;
        self.memory.write(i, n / 100)?;
        self.memory.write(i + 1, n / 10 % 10)?;
        self.memory.write(i + 2, n % 10)?;
        Ok(())
    }

    /// 0xFX55
    fn op_memory_store(&mut self, x: u8) -> Result<()> {
        let start = self.i as usize;
        self.memory.check_range(start, x as usize + 1)?;
        for (offset, &value) in self.v.up_to(x).iter().enumerate() {
            self.memory.write(start + offset, value)?;
        }
        if self.config.memory_increment_i {
            self.i += x as u16 + 1;
        }
        Ok(())
    }

    /// 0xFX65
    fn op_memory_load(&mut self, x: u8) -> Result<()> {
        let bytes = self.memory.slice(self.i as usize, x as usize + 1)?;
        self.v.up_to_mut(x).copy_from_slice(bytes);
        if self.config.memory_increment_i {
            self.i += x as u16 + 1;
        }
        Ok(())
    }
}

impl FmtDisplay for Chip8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "=== CPU ===\n{}\n=== Display ===\n{}=== Memory ===\n{}",
            self.snapshot(),
            self.display,
            self.memory
        )
    }
}
