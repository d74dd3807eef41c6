use std::time::Duration;

use log::{debug, info};

use crate::config::EngineConfig;
use crate::device::BackendError;
use crate::coords::Vec2;
use crate::input::{
    InputEvent, InputFrame, InputFrontEnd, InputState, JoystickSource, TouchEvent, TouchPhase,
};
use crate::render::{Compositor, RendererContext, ScreenId, TargetKind};
use crate::time::{
    Clock, FrameClock, FrameLoopHooks, FrameTime, FrameTimer, LoopStats, run_frame_loop,
};

use super::app::{App, AppControl};
use super::ctx::{DrawCtx, TickCtx};

/// Drives an [`App`]: fixed-step ticks from the frame timer, input polling
/// before each tick, and a draw plus present after each granted batch.
pub struct Engine<A: App> {
    timer: FrameTimer,
    /// Clock reading of the previous [`step`](Engine::step).
    last_step: Option<Duration>,
    session: Session<A>,
}

/// Everything but the timer, so the frame loop can borrow the two apart.
struct Session<A: App> {
    app: A,
    renderer: RendererContext,
    input: InputFrontEnd,
    input_state: InputState,
    input_frame: InputFrame,
    frame_clock: FrameClock,
    show_touch_overlay: bool,
    tick_index: u64,
    started: bool,
    exit: bool,
}

/// Where the touch key overlay is drawn.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum OverlayTarget {
    SubScreen,
    Texture,
}

impl<A: App> Engine<A> {
    pub fn new(app: A, renderer: RendererContext, config: &EngineConfig) -> Self {
        Self {
            timer: FrameTimer::from_config(&config.timer),
            last_step: None,
            session: Session {
                app,
                renderer,
                input: InputFrontEnd::from_config(config),
                input_state: InputState::default(),
                input_frame: InputFrame::default(),
                frame_clock: FrameClock::new(),
                show_touch_overlay: config.touch.enabled,
                tick_index: 0,
                started: false,
                exit: false,
            },
        }
    }

    pub fn app(&self) -> &A {
        &self.session.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.session.app
    }

    pub fn renderer(&self) -> &RendererContext {
        &self.session.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut RendererContext {
        &mut self.session.renderer
    }

    pub fn input(&self) -> &InputFrontEnd {
        &self.session.input
    }

    pub fn input_mut(&mut self) -> &mut InputFrontEnd {
        &mut self.session.input
    }

    pub fn input_state(&self) -> &InputState {
        &self.session.input_state
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn tick_index(&self) -> u64 {
        self.session.tick_index
    }

    pub fn set_touch_overlay(&mut self, show: bool) {
        self.session.show_touch_overlay = show;
    }

    pub fn exit_requested(&self) -> bool {
        self.session.exit
    }

    pub fn request_exit(&mut self) {
        self.session.exit = true;
    }

    /// Runs `App::on_start` once. Later calls do nothing.
    pub fn start(&mut self) -> AppControl {
        self.session.start()
    }

    /// Feeds one translated platform event into the input state.
    ///
    /// Touches arrive normalized to the window and are rescaled onto the
    /// display the touch keys are drawn on.
    pub fn handle_event(&mut self, event: InputEvent) {
        let s = &mut self.session;
        let event = match event {
            InputEvent::Touch(touch) => match touch_on_panel(s.renderer.compositor(), touch) {
                Some(touch) => InputEvent::Touch(touch),
                None => return,
            },
            other => other,
        };
        s.input_state.apply_event(&mut s.input_frame, event);
    }

    /// Banks the time since the previous step and runs what the timer grants.
    ///
    /// The first step only records `now` as the baseline.
    pub fn step(
        &mut self,
        now: Duration,
        joysticks: &mut dyn JoystickSource,
    ) -> Result<AppControl, BackendError> {
        let elapsed = self.last_step.map_or(Duration::ZERO, |l| now.saturating_sub(l));
        self.last_step = Some(now);

        let plan = self.timer.advance(elapsed);
        for i in 0..plan.ticks {
            if self.session.tick(joysticks) == AppControl::Exit {
                return Ok(AppControl::Exit);
            }
            if plan.render && i + 1 == plan.ticks {
                let time = self.session.frame_clock.tick_at(now);
                self.session.draw(time)?;
            }
        }

        Ok(self.session.control())
    }

    /// How long the runtime may sleep before the next step is worth running.
    pub fn time_until_next_tick(&self, now: Duration) -> Duration {
        match self.last_step {
            Some(l) => self.timer.wait_for(now.saturating_sub(l)),
            None => Duration::ZERO,
        }
    }

    /// Runs the frame loop on `clock` until the app exits, drawing fails, or
    /// `max_frames` frames were presented.
    ///
    /// Frame times follow simulated time (ticks × period) so runs on a
    /// manual clock are reproducible.
    pub fn run(
        &mut self,
        clock: &mut dyn Clock,
        joysticks: &mut dyn JoystickSource,
        max_frames: Option<u64>,
    ) -> Result<LoopStats, BackendError> {
        if self.start() == AppControl::Exit {
            return Ok(LoopStats::default());
        }

        let mut hooks = LoopHooks {
            session: &mut self.session,
            joysticks,
            period: self.timer.period(),
            max_frames,
            frames: 0,
            ticks: 0,
            error: None,
        };
        let stats = run_frame_loop(&mut self.timer, clock, &mut hooks);
        let error = hooks.error.take();

        info!(
            "frame loop finished: {} ticks, {} frames drawn, {} skipped",
            stats.ticks,
            stats.renders,
            self.timer.skipped_frames()
        );

        match error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// Consumes the engine; the renderer is shut down on drop.
    pub fn into_app(self) -> A {
        self.session.app
    }

    /// Runs `App::on_stop` and shuts the renderer down.
    pub fn stop(&mut self) {
        let s = &mut self.session;
        if !s.renderer.is_running() {
            return;
        }
        s.app.on_stop(&mut s.renderer);
        s.renderer.quit();
    }
}

impl<A: App> Session<A> {
    fn control(&self) -> AppControl {
        if self.exit { AppControl::Exit } else { AppControl::Continue }
    }

    fn start(&mut self) -> AppControl {
        if !self.started {
            self.started = true;
            if self.app.on_start(&mut self.renderer) == AppControl::Exit {
                self.exit = true;
            }
        }
        self.control()
    }

    fn tick(&mut self, joysticks: &mut dyn JoystickSource) -> AppControl {
        self.input.update(&self.input_state, &self.input_state, joysticks);

        let mut ctx = TickCtx {
            players: self.input.players(),
            input: &self.input_state,
            input_frame: &self.input_frame,
            tick_index: self.tick_index,
            renderer: &mut self.renderer,
        };
        if self.app.on_tick(&mut ctx) == AppControl::Exit {
            debug!("app requested exit on tick {}", self.tick_index);
            self.exit = true;
        }

        self.tick_index += 1;
        self.input_frame.clear();
        self.control()
    }

    fn draw(&mut self, time: FrameTime) -> Result<(), BackendError> {
        {
            let mut ctx = DrawCtx {
                renderer: &mut self.renderer,
                time,
                touch: self.input.touch(),
            };
            self.app.on_draw(&mut ctx);
        }

        if self.show_touch_overlay && self.input.touch().touch_supported(&self.input_state) {
            self.draw_touch_overlay();
        }

        self.renderer.present()
    }

    fn draw_touch_overlay(&mut self) {
        let (target, w, h) = overlay_target(self.renderer.compositor());
        match target {
            OverlayTarget::SubScreen => self.renderer.set_target_sub_screen(),
            OverlayTarget::Texture => self.renderer.set_target_texture(),
        }
        for (rect, color) in self.input.touch().overlay(w, h) {
            self.renderer.draw_rect(rect, color, true);
        }
    }
}

/// The sub screen when the layout has one that is not showing the game,
/// otherwise the screen plane layer in logical coordinates.
fn overlay_target(compositor: &Compositor) -> (OverlayTarget, u32, u32) {
    let sub = compositor
        .screens()
        .iter()
        .find(|s| s.kind == TargetKind::Screen(ScreenId::Sub));
    match sub {
        Some(s) if !compositor.frame_state().screen_swapped => {
            (OverlayTarget::SubScreen, s.used_w, s.used_h)
        }
        _ => {
            let (w, h) = compositor.screen_size();
            (OverlayTarget::Texture, w, h)
        }
    }
}

/// Window touch to sub screen coordinates when the overlay lives there.
///
/// Contacts that start outside the sub screen are dropped and a contact
/// dragged off it ends.
fn touch_on_panel(compositor: &Compositor, touch: TouchEvent) -> Option<TouchEvent> {
    if overlay_target(compositor).0 != OverlayTarget::SubScreen {
        return Some(touch);
    }
    let Some(region) = compositor.screen_region(ScreenId::Sub).filter(|r| !r.is_empty()) else {
        return Some(touch);
    };

    let inside = region.contains(Vec2::new(touch.x, touch.y));
    let x = ((touch.x - region.x()) / region.w()).clamp(0.0, 1.0);
    let y = ((touch.y - region.y()) / region.h()).clamp(0.0, 1.0);
    let phase = match touch.phase {
        TouchPhase::Started if !inside => return None,
        TouchPhase::Moved if !inside => TouchPhase::Ended,
        phase => phase,
    };
    Some(TouchEvent { phase, x, y, ..touch })
}

struct LoopHooks<'a, A: App> {
    session: &'a mut Session<A>,
    joysticks: &'a mut dyn JoystickSource,
    period: Duration,
    max_frames: Option<u64>,
    frames: u64,
    ticks: u64,
    error: Option<BackendError>,
}

impl<A: App> LoopHooks<'_, A> {
    fn running(&self) -> bool {
        !self.session.exit && self.error.is_none()
    }
}

impl<A: App> FrameLoopHooks for LoopHooks<'_, A> {
    fn condition(&mut self) -> bool {
        self.running() && self.max_frames.is_none_or(|max| self.frames < max)
    }

    fn sub_condition(&mut self) -> bool {
        self.running()
    }

    fn post_tick(&mut self, render: bool) {
        self.ticks += 1;
        if self.session.tick(self.joysticks) == AppControl::Exit || !render {
            return;
        }

        let now = self.period.mul_f64(self.ticks as f64);
        let time = self.session.frame_clock.tick_at(now);
        match self.session.draw(time) {
            Ok(()) => self.frames += 1,
            Err(e) => {
                log::error!("drawing frame {} failed: {e}", self.frames);
                self.error = Some(e);
            }
        }
    }
}
