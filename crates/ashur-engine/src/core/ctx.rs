use crate::input::{Controls, InputFrame, InputState, TouchScreenController};
use crate::render::RendererContext;
use crate::time::FrameTime;

/// Per-tick context passed to `core::App::on_tick`.
pub struct TickCtx<'a> {
    /// Controls of every active player, player 1 first.
    pub players: &'a [Controls],
    pub input: &'a InputState,
    /// Events and key transitions since the previous tick.
    pub input_frame: &'a InputFrame,
    pub tick_index: u64,
    /// For loading and releasing pictures from game logic.
    pub renderer: &'a mut RendererContext,
}

impl TickCtx<'_> {
    /// Controls of `player` (0-based); all released for inactive players.
    pub fn controls(&self, player: usize) -> Controls {
        self.players.get(player).copied().unwrap_or_default()
    }
}

/// Per-frame context passed to `core::App::on_draw`.
pub struct DrawCtx<'a> {
    pub renderer: &'a mut RendererContext,
    pub time: FrameTime,
    pub touch: &'a TouchScreenController,
}
