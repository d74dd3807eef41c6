use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use log::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::EngineConfig;
use crate::core::{App, AppControl, Engine};
use crate::device::{Gpu, GpuInit, WgpuBackend};
use crate::input::JoystickSource;
use crate::input::platform::translate_window_event;
use crate::render::{RendererContext, RendererSettings};
use crate::texture::ImageSource;
use crate::time::{Clock, MonotonicClock};

/// Windowed entry point: winit event loop, wgpu surface, engine pacing.
pub struct Runtime;

impl Runtime {
    /// Opens the window described by `config` and runs `app` until it exits
    /// or the window closes.
    pub fn run<A>(
        config: EngineConfig,
        source: Box<dyn ImageSource>,
        joysticks: Box<dyn JoystickSource>,
        app: A,
    ) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = RuntimeState {
            config,
            pending: Some((app, source)),
            window: None,
            engine: None,
            clock: MonotonicClock::new(),
            joysticks,
            failure: None,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct RuntimeState<A: App> {
    config: EngineConfig,
    /// App and picture source until the window exists.
    pending: Option<(A, Box<dyn ImageSource>)>,
    window: Option<Arc<Window>>,
    engine: Option<Engine<A>>,
    clock: MonotonicClock,
    joysticks: Box<dyn JoystickSource>,
    failure: Option<anyhow::Error>,
}

impl<A: App> RuntimeState<A> {
    fn create_engine(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some((app, source)) = self.pending.take() else {
            return Ok(());
        };

        let attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(self.config.window.width),
                f64::from(self.config.window.height),
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

        let gpu = pollster::block_on(Gpu::new(
            window.clone(),
            GpuInit::with_vsync(self.config.window.vsync),
        ))
        .context("GPU initialization failed")?;

        let size = window.inner_size();
        let mut settings = RendererSettings::from_config(&self.config);
        settings.compositor.window_w = size.width.max(1);
        settings.compositor.window_h = size.height.max(1);

        let backend = WgpuBackend::new(
            gpu,
            self.config.textures.video_memory_bytes,
            self.config.textures.max_texture_rows,
        );
        let renderer = RendererContext::new(Box::new(backend), source, settings)
            .map_err(|e| anyhow!("renderer setup failed: {e}"))?;

        let mut engine = Engine::new(app, renderer, &self.config);
        if engine.start() == AppControl::Exit {
            info!("app exited during start");
        }

        window.request_redraw();
        self.window = Some(window);
        self.engine = Some(engine);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        self.failure = Some(e);
        event_loop.exit();
    }

    fn exit_requested(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.exit_requested())
    }
}

impl<A: App> ApplicationHandler for RuntimeState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.create_engine(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested() {
            event_loop.exit();
            return;
        }
        let (Some(engine), Some(window)) = (&self.engine, &self.window) else {
            return;
        };

        let wait = engine.time_until_next_tick(self.clock.now());
        if wait.is_zero() {
            window.request_redraw();
            event_loop.set_control_flow(ControlFlow::Wait);
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + wait));
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let (Some(engine), Some(window)) = (&mut self.engine, &self.window) else {
            return;
        };

        if let Some(ev) = translate_window_event(window.inner_size(), engine.input_state(), &event) {
            engine.handle_event(ev);
        }
        if engine.app_mut().on_window_event(&event) == AppControl::Exit {
            engine.request_exit();
        }

        match &event {
            WindowEvent::CloseRequested => engine.request_exit(),

            WindowEvent::Resized(size) => {
                if let Err(e) = engine.renderer_mut().resize_window(size.width, size.height) {
                    let e = anyhow!("resizing to {}x{} failed: {e}", size.width, size.height);
                    self.fail(event_loop, e);
                    return;
                }
                window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                let now = self.clock.now();
                match engine.step(now, self.joysticks.as_mut()) {
                    Ok(AppControl::Continue) => {
                        if engine.time_until_next_tick(now) == Duration::ZERO {
                            window.request_redraw();
                        }
                    }
                    Ok(AppControl::Exit) => engine.request_exit(),
                    Err(e) => {
                        let e = anyhow!("presenting a frame failed: {e}");
                        self.fail(event_loop, e);
                        return;
                    }
                }
            }

            _ => {}
        }

        if self.exit_requested() {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = &mut self.engine {
            engine.stop();
        }
    }
}
