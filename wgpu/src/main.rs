mod audio;
mod clock;
mod keymap;

use std::{
    path::PathBuf,
    sync::Arc,
    time::{self, Instant},
};

use anyhow::Context;
use chip8::{Audio, Chip8, Chip8Error, Silent};
use clap::Parser;
use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{self, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::Window,
};

use crate::audio::Beeper;
use crate::clock::FixedRate;

const TITLE: &str = "CHIP-8";
const TIMER_HZ: u32 = 60;
const MAX_TICKS_PER_FRAME: u32 = 4;
const FRAME_INTERVAL: time::Duration = time::Duration::new(0, 1_000_000_000u32 / 60);

struct AppConfig {
    pub window: winit::window::WindowAttributes,
    pub args: Args,
}

impl AppConfig {
    pub fn new(args: Args) -> Self {
        Self {
            window: Window::default_attributes()
                .with_title(TITLE)
                .with_inner_size(LogicalSize::new(
                    (chip8::SCREEN_WIDTH as u32) * args.scale,
                    (chip8::SCREEN_HEIGHT as u32) * args.scale,
                ))
                .with_resizable(false),
            args,
        }
    }
}

struct State {
    pub(crate) chip8: Chip8,
    pub(crate) window: Arc<Window>,
    pub(crate) pixels: Pixels<'static>,
    pub(crate) audio: Box<dyn Audio>,
    cpu_clock: FixedRate,
    timer_clock: FixedRate,
    last_update: Instant,
}

impl State {
    /// Run the steps and timer ticks that came due since the last update
    fn update(&mut self) -> Result<(), Chip8Error> {
        let now = Instant::now();
        let elapsed = now - self.last_update;
        self.last_update = now;

        if self.chip8.fault().is_some() {
            return Ok(());
        }

        for _ in 0..self.cpu_clock.advance(elapsed) {
            if let Err(e) = self.chip8.step() {
                self.audio.tone_off();
                self.window.set_title(&format!("{} (halted: {})", TITLE, e));
                return Err(e);
            }
        }
        for _ in 0..self.timer_clock.advance(elapsed) {
            self.chip8.tick(&mut *self.audio);
        }

        if self.chip8.is_fb_dirty() {
            self.window.request_redraw();
        }
        Ok(())
    }
}

struct App {
    config: AppConfig,
    state: Option<State>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn init(&mut self, event_loop: &event_loop::ActiveEventLoop) -> anyhow::Result<()> {
        let args = &self.config.args;
        let mut chip8 = Chip8::new()
            .context("construct new chip8 instance")?
            .legacy_shift(args.legacy_shift)
            .jump_offset_v0(args.jump_offset_v0)
            .memory_increment_i(!args.no_memory_increment_i);
        if args.trace {
            chip8 = chip8.on_step(|snapshot| debug!("\n{}", snapshot));
        }

        chip8
            .load_rom_from_file(&args.rom)
            .context("load rom from file")?;

        debug!("{}", chip8);

        let window = event_loop
            .create_window(self.config.window.to_owned())
            .context("create window")?;
        let window = Arc::new(window);

        let window_size = window.inner_size();
        let surface_texture =
            SurfaceTexture::new(window_size.width, window_size.height, window.clone());

        let pixels = Pixels::new(
            chip8::SCREEN_WIDTH as u32,
            chip8::SCREEN_HEIGHT as u32,
            surface_texture,
        )
        .context("create pixels instance")?;

        let audio = open_audio(args.mute);

        let mut state = State {
            chip8,
            window,
            pixels,
            audio,
            cpu_clock: FixedRate::from_hz(args.ips).max_per_advance(args.max_steps_per_frame),
            timer_clock: FixedRate::from_hz(TIMER_HZ).max_per_advance(MAX_TICKS_PER_FRAME),
            last_update: Instant::now(),
        };

        App::render(&mut state).context("render first frame")?;
        state.window.request_redraw();
        self.state = Some(state);

        Ok(())
    }

    pub fn render(state: &mut State) -> anyhow::Result<()> {
        let fb = state.chip8.framebuffer_snapshot();
        state.chip8.clear_dirty();
        for (i, pixel) in state.pixels.frame_mut().chunks_exact_mut(4).enumerate() {
            let x = i % chip8::SCREEN_WIDTH;
            let y = i / chip8::SCREEN_WIDTH;

            let rgba = if fb[y][x] {
                [255, 255, 255, 255]
            } else {
                [0, 0, 0, 255]
            };

            pixel.copy_from_slice(&rgba);
        }

        state.pixels.render().context("render pixels")?;
        Ok(())
    }
}

fn open_audio(mute: bool) -> Box<dyn Audio> {
    if mute {
        return Box::new(Silent);
    }
    match Beeper::new() {
        Ok(beeper) => Box::new(beeper),
        Err(e) => {
            warn!("continuing without sound: {:#}", e);
            Box::new(Silent)
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &event_loop::ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            error!("init failed: {:?}", e);
            std::process::exit(1);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: winit::event::WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Exiting...");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = self.state.as_mut() else {
                    return;
                };

                state.window.pre_present_notify();
                if let Err(e) = App::render(state) {
                    error!("render failed: {:?}", e);
                }
            }
            WindowEvent::KeyboardInput {
                device_id: _,
                event,
                is_synthetic: _,
            } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };

                if code == KeyCode::Escape {
                    info!("Exiting...");
                    event_loop.exit();
                    return;
                }

                let (Some(state), Some(key)) = (self.state.as_mut(), keymap::key_for(code)) else {
                    return;
                };

                if event.state.is_pressed() {
                    if event.repeat {
                        return;
                    }
                    state.chip8.keydown(key);
                } else {
                    state.chip8.keyup(key);
                }
            }
            _ => (),
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(value_name = "ROM", help = "Program image to load at 0x200", value_hint = clap::ValueHint::FilePath)]
    rom: PathBuf,
    #[arg(long, default_value_t = 700, value_parser = clap::value_parser!(u32).range(1..=100_000), help = "Instructions executed per second")]
    ips: u32,
    #[arg(long, default_value_t = 48, value_parser = clap::value_parser!(u32).range(1..), help = "Upper bound on instructions run to catch up after a stall")]
    max_steps_per_frame: u32,
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=64), help = "Window pixels per display pixel")]
    scale: u32,
    #[arg(long, help = "Disable the tone output")]
    mute: bool,
    #[arg(long, help = "Log CPU state after every instruction")]
    trace: bool,
    #[arg(long, help = "Exit with an error status when the program faults")]
    exit_on_fault: bool,
    #[arg(long, help = "Shift Vy into Vx for 8XY6/8XYE")]
    legacy_shift: bool,
    #[arg(long, help = "Offset BNNN jumps by V0 instead of Vx")]
    jump_offset_v0: bool,
    #[arg(long, help = "Leave I unchanged after FX55/FX65")]
    no_memory_increment_i: bool,
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let default_filter = if args.trace { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("create event loop: {}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    let exit_on_fault = args.exit_on_fault;
    let config = AppConfig::new(args);

    let mut app = App::new(config);

    loop {
        let timeout = Some(time::Duration::ZERO);
        let status = event_loop.pump_app_events(timeout, &mut app);

        if let PumpStatus::Exit(exit_code) = status {
            break std::process::ExitCode::from(exit_code as u8);
        }

        if let Some(state) = app.state.as_mut() {
            if let Err(e) = state.update() {
                if exit_on_fault {
                    error!("program fault: {}", e);
                    break std::process::ExitCode::FAILURE;
                }
                warn!("program halted, window kept open for inspection");
                debug!("{}", state.chip8);
            }
        }

        std::thread::sleep(FRAME_INTERVAL);
    }
}
