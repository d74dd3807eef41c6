use anyhow::{Result, anyhow};

use crate::config::EngineConfig;
use crate::core::{App, Engine};
use crate::device::HeadlessBackend;
use crate::input::JoystickSource;
use crate::render::{RendererContext, RendererSettings};
use crate::texture::ImageSource;
use crate::time::{Clock, LoopStats, ManualClock, MonotonicClock};

/// Options of a [`HeadlessRuntime`] run.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct HeadlessOptions {
    /// Stop after this many presented frames.
    pub max_frames: Option<u64>,
    /// Pace on the wall clock instead of simulated time.
    pub realtime: bool,
}

/// Windowless entry point: the same engine on a [`HeadlessBackend`].
pub struct HeadlessRuntime;

impl HeadlessRuntime {
    /// Runs `app` until it exits or `options.max_frames` is reached, returning
    /// the app and the loop totals.
    pub fn run<A: App>(
        config: &EngineConfig,
        source: Box<dyn ImageSource>,
        joysticks: &mut dyn JoystickSource,
        app: A,
        options: HeadlessOptions,
    ) -> Result<(A, LoopStats)> {
        let backend = HeadlessBackend::new(config.textures.video_memory_bytes);
        let renderer = RendererContext::new(
            Box::new(backend),
            source,
            RendererSettings::from_config(config),
        )
        .map_err(|e| anyhow!("renderer setup failed: {e}"))?;

        let mut engine = Engine::new(app, renderer, config);
        let mut clock: Box<dyn Clock> = if options.realtime {
            Box::new(MonotonicClock::new())
        } else {
            Box::new(ManualClock::new())
        };

        let result = engine.run(clock.as_mut(), joysticks, options.max_frames);
        engine.stop();
        let stats = result.map_err(|e| anyhow!("headless run failed: {e}"))?;
        Ok((engine.into_app(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AppControl, DrawCtx, TickCtx};
    use crate::device::ImageData;
    use crate::input::NoJoysticks;
    use crate::render::DrawParams;
    use crate::texture::{MemoryImageSource, PictureId};
    use crate::coords::Rect;

    #[derive(Default)]
    struct Sprite {
        picture: Option<PictureId>,
        loaded: bool,
        ticks: u64,
    }

    impl App for Sprite {
        fn on_start(&mut self, renderer: &mut RendererContext) -> AppControl {
            self.picture = Some(renderer.lazy_load_picture("hero.png"));
            AppControl::Continue
        }

        fn on_tick(&mut self, _ctx: &mut TickCtx<'_>) -> AppControl {
            self.ticks += 1;
            AppControl::Continue
        }

        fn on_draw(&mut self, ctx: &mut DrawCtx<'_>) {
            if let Some(id) = self.picture {
                ctx.renderer.set_target_layer(1);
                ctx.renderer.draw_texture(id, &DrawParams::new(Rect::new(10.0, 10.0, 32.0, 32.0)));
                self.loaded = ctx.renderer.textures().get(id).is_some_and(|p| p.is_loaded());
            }
        }
    }

    #[test]
    fn headless_run_loads_pictures_on_first_draw() {
        let mut config = EngineConfig::default();
        config.timer.tick_rate = 50.0;
        let source = MemoryImageSource::new().with_image("hero.png", ImageData::solid(32, 32, [0, 0, 255, 255]));

        let options = HeadlessOptions { max_frames: Some(3), realtime: false };
        let (app, stats) =
            HeadlessRuntime::run(&config, Box::new(source), &mut NoJoysticks, Sprite::default(), options).unwrap();

        assert_eq!(stats.renders, 3);
        assert_eq!(app.ticks, 3);
        assert!(app.loaded);
    }
}
