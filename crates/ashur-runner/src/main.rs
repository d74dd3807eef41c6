use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ashur_engine::config::EngineConfig;
use ashur_engine::coords::{ColorRgba, Rect};
use ashur_engine::core::{App, AppControl, DrawCtx, TickCtx};
use ashur_engine::input::{ControlCommand, Controls};
use ashur_engine::logging::{LoggingConfig, init_logging};
use ashur_engine::render::{DrawParams, LayoutKind, RendererContext};
use ashur_engine::texture::{FsImageSource, PictureId};
use ashur_engine::window::{HeadlessOptions, HeadlessRuntime, Runtime, joystick_source};

/// Ashur engine demo runner
#[derive(Parser)]
#[command(version, about = "Runs the Ashur 2D engine with a small demo scene.")]
struct Cli {
    /// INI configuration file, loaded on top of the defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run without a window on the recording backend.
    #[arg(long)]
    headless: bool,

    /// Stop after this many presented frames (headless runs).
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Pace headless runs on the wall clock.
    #[arg(long)]
    realtime: bool,

    /// Display layout: single or dual.
    #[arg(long, value_name = "LAYOUT")]
    layout: Option<LayoutKind>,

    /// Pictures to show, loaded lazily on first draw.
    #[arg(long = "picture", value_name = "PATH")]
    pictures: Vec<PathBuf>,

    /// Log filter in env_logger syntax, e.g. "debug" or "ashur_engine::texture=trace".
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

/// A box walking over the loaded pictures, driven by player 1.
struct Demo {
    paths: Vec<PathBuf>,
    pictures: Vec<PictureId>,
    x: f32,
    y: f32,
    screen: (f32, f32),
    angle: f32,
}

impl Demo {
    const SPEED: f32 = 3.0;
    const SIZE: f32 = 32.0;

    fn new(paths: Vec<PathBuf>, config: &EngineConfig) -> Self {
        let screen = (config.screen.width as f32, config.screen.height as f32);
        Self {
            paths,
            pictures: Vec::new(),
            x: (screen.0 - Self::SIZE) / 2.0,
            y: (screen.1 - Self::SIZE) / 2.0,
            screen,
            angle: 0.0,
        }
    }

    fn walk(&mut self, c: &Controls) {
        let mut dx = c.analog_x;
        let mut dy = c.analog_y;
        if c.get(ControlCommand::Left) {
            dx = -1.0;
        }
        if c.get(ControlCommand::Right) {
            dx = 1.0;
        }
        if c.get(ControlCommand::Up) {
            dy = -1.0;
        }
        if c.get(ControlCommand::Down) {
            dy = 1.0;
        }
        let speed = if c.get(ControlCommand::Run) { Self::SPEED * 2.0 } else { Self::SPEED };

        self.x = (self.x + dx * speed).clamp(0.0, self.screen.0 - Self::SIZE);
        self.y = (self.y + dy * speed).clamp(0.0, self.screen.1 - Self::SIZE);
        if c.get(ControlCommand::Jump) {
            self.angle = (self.angle + 6.0) % 360.0;
        }
    }
}

impl App for Demo {
    fn on_start(&mut self, renderer: &mut RendererContext) -> AppControl {
        self.pictures = self.paths.iter().map(|p| renderer.lazy_load_picture(p)).collect();
        log::info!("demo registered {} pictures", self.pictures.len());
        AppControl::Continue
    }

    fn on_tick(&mut self, ctx: &mut TickCtx<'_>) -> AppControl {
        let c = ctx.controls(0);
        if c.get(ControlCommand::Start) && c.get(ControlCommand::Drop) {
            return AppControl::Exit;
        }
        self.walk(&c);
        AppControl::Continue
    }

    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
        let r = &mut *ctx.renderer;

        r.set_target_layer(0);
        r.draw_rect(
            Rect::new(0.0, 0.0, self.screen.0, self.screen.1),
            ColorRgba::from_rgba8(40, 60, 110, 255),
            true,
        );

        r.set_target_layer(1);
        let mut x = 16.0;
        for &id in &self.pictures {
            let Some((w, h)) = r.textures().get(id).map(|p| (p.width(), p.height())) else {
                continue;
            };
            r.draw_texture(id, &DrawParams::new(Rect::new(x, 16.0, w as f32, h as f32)));
            x += w as f32 + 8.0;
        }

        r.set_target_layer(2);
        let player = Rect::new(self.x, self.y, Demo::SIZE, Demo::SIZE);
        match self.pictures.first() {
            Some(&id) => r.draw_texture(id, &DrawParams::new(player).rotated(self.angle, None)),
            None => r.draw_rect(player, ColorRgba::from_rgba8(240, 200, 60, 255), true),
        }
        r.draw_rect(player, ColorRgba::white(), false);
    }

    fn on_stop(&mut self, renderer: &mut RendererContext) {
        for &id in &self.pictures {
            renderer.lazy_unload(id);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(layout) = cli.layout {
        config.screen.layout = layout;
    }

    init_logging(LoggingConfig::with_filter(cli.log.clone().or(config.log_filter.clone())));
    log::info!("ashur runner starting ({} layout)", config.screen.layout);

    let demo = Demo::new(cli.pictures.clone(), &config);
    let mut joysticks = joystick_source(&config);

    if cli.headless {
        let options = HeadlessOptions {
            max_frames: Some(cli.frames.unwrap_or(600)),
            realtime: cli.realtime,
        };
        let (_, stats) =
            HeadlessRuntime::run(&config, Box::new(FsImageSource), joysticks.as_mut(), demo, options)?;
        println!(
            "{} iterations, {} ticks, {} frames",
            stats.iterations, stats.ticks, stats.renders
        );
        return Ok(());
    }

    Runtime::run(config, Box::new(FsImageSource), joysticks, demo)
}
