use winit::event::WindowEvent;

use crate::render::RendererContext;

use super::ctx::{DrawCtx, TickCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Game contract driven by the [`Engine`](super::Engine).
///
/// Logic runs in `on_tick` at the fixed tick rate; `on_draw` follows the last
/// tick of every batch that is not skipped.
pub trait App {
    /// Called once, after the renderer is up and before the first tick.
    fn on_start(&mut self, renderer: &mut RendererContext) -> AppControl {
        let _ = renderer;
        AppControl::Continue
    }

    fn on_tick(&mut self, ctx: &mut TickCtx<'_>) -> AppControl;

    fn on_draw(&mut self, ctx: &mut DrawCtx<'_>);

    /// Called once before the renderer shuts down.
    fn on_stop(&mut self, renderer: &mut RendererContext) {
        let _ = renderer;
    }

    /// Raw window events, seen before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }
}
