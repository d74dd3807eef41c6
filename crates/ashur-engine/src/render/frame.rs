/// Per-frame compositor bookkeeping.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameState {
    pub in_frame: bool,
    /// Presented frames since startup.
    pub frame_counter: u64,
    /// Stereoscopic depth, `0.0..=1.0`.
    pub depth_slider: f32,
    /// The game is shown on the sub screen.
    pub screen_swapped: bool,
}

/// Editor state that changes where the game image is composited.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct UiContext {
    pub level_editor: bool,
    pub magic_hand: bool,
    /// The editor UI currently owns the secondary display.
    pub editor_screen_active: bool,
}

impl UiContext {
    /// Touch input maps at double scale onto the game screen.
    #[inline]
    pub fn editor_mapping(&self) -> bool {
        (self.level_editor || self.magic_hand) && self.editor_screen_active
    }
}
