use anyhow::Context;
use chip8::Audio;
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, Sink};

const TONE_HZ: f32 = 440.0;
const VOLUME: f32 = 0.2;

/// A continuous tone on the default output device, paused while the gate is off
pub struct Beeper {
    // dropping the stream closes the device
    _stream: OutputStream,
    sink: Sink,
}

impl Beeper {
    pub fn new() -> anyhow::Result<Self> {
        let (stream, handle) = OutputStream::try_default().context("open audio output")?;
        let sink = Sink::try_new(&handle).context("create audio sink")?;
        sink.pause();
        sink.append(SineWave::new(TONE_HZ).amplify(VOLUME));
        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

impl Audio for Beeper {
    fn tone_on(&mut self) {
        if self.sink.is_paused() {
            self.sink.play();
        }
    }

    fn tone_off(&mut self) {
        if !self.sink.is_paused() {
            self.sink.pause();
        }
    }
}
