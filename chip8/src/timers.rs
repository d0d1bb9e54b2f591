/// Receiver of the sound timer's tone gate.
///
/// The gate is level-triggered: every timer tick asserts one of the two calls.
pub trait Audio {
    fn tone_on(&mut self);
    fn tone_off(&mut self);
}

/// An audio sink that drops every call, for headless runs and tests
pub struct Silent;

impl Audio for Silent {
    fn tone_on(&mut self) {}
    fn tone_off(&mut self) {}
}

#[derive(Debug, Default)]
pub struct Timers {
    /// The delay timer is decremented at a rate of 60 Hz until it reaches 0
    pub(crate) delay: u8,
    /// The sound timer is decremented at a rate of 60 Hz until it reaches 0, and gates a tone while it's not 0
    pub(crate) sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, audio: &mut dyn Audio) {
        self.delay = self.delay.saturating_sub(1);
        if self.sound > 0 {
            self.sound -= 1;
            audio.tone_on();
        } else {
            audio.tone_off();
        }
    }
}
