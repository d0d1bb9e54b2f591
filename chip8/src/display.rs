use std::fmt::Display as FmtDisplay;

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub type FrameBuffer = [[bool; SCREEN_WIDTH]; SCREEN_HEIGHT];

pub struct Display {
    /// Row-major pixel grid, a set cell is a lit pixel
    pub(crate) fb: FrameBuffer,
    pub(crate) dirty: bool,
}

impl Display {
    pub fn new() -> Self {
        Self {
            fb: [[false; SCREEN_WIDTH]; SCREEN_HEIGHT],
            dirty: false,
        }
    }

    pub fn snapshot(&self) -> FrameBuffer {
        self.fb
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// XOR the pixel at the coordinates, wrapping both axes, and return true if it was already on
    /// This function marks the display as dirty, causing it to be re-rendered on the next update
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        self.dirty = true;
        let pixel = &mut self.fb[y % SCREEN_HEIGHT][x % SCREEN_WIDTH];
        let prev = *pixel;
        *pixel = !prev;
        prev
    }

    /// Composite an 8-pixel-wide sprite onto the screen with its top-left corner at (x, y).
    /// Pixels past the right or bottom edge wrap around to the opposite edge.
    /// Returns true if any lit sprite pixel landed on an already lit pixel
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        self.dirty = true;
        let mut collision = false;
        for (row, byte) in rows.iter().enumerate() {
            for col in 0..8 {
                if (byte >> (7 - col)) & 0x1 == 1 {
                    collision |= self.toggle(x + col, y + row);
                }
            }
        }
        collision
    }

    /// Clear the display contents by zeroing out the framebuffer
    /// This function marks the display as dirty, causing it to be re-rendered on the next update
    pub fn clear(&mut self) {
        self.dirty = true;
        for row in self.fb.iter_mut() {
            row.fill(false);
        }
    }

    #[cfg(test)]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.fb[y][x]
    }
}

impl FmtDisplay for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.fb.iter() {
            for &pixel in row.iter() {
                write!(f, "{}", if pixel { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
