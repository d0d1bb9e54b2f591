use std::fmt;

pub const KEY_COUNT: usize = 0x10;

/// A key on the hexadecimal keypad, always in 0x0..=0xF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(u8);

impl Key {
    pub fn new(code: u8) -> Option<Self> {
        (code < KEY_COUNT as u8).then_some(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Last-written pressed state of each key. Hosts overwrite it on every poll
pub struct Keypad {
    pub(crate) keys: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
        }
    }

    pub fn keydown(&mut self, key: Key) {
        self.keys[key.0 as usize] = true;
    }

    pub fn keyup(&mut self, key: Key) {
        self.keys[key.0 as usize] = false;
    }

    /// Only the low nibble of `code` selects the key
    pub fn is_key_down(&self, code: u8) -> bool {
        self.keys[(code & 0xF) as usize]
    }

    pub fn is_key_up(&self, code: u8) -> bool {
        !self.is_key_down(code)
    }

    /// Lowest-numbered key that is currently held
    pub fn first_pressed(&self) -> Option<Key> {
        self.keys
            .iter()
            .position(|&down| down)
            .map(|code| Key(code as u8))
    }
}
