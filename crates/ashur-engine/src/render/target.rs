use crate::device::{TargetDesc, TargetHandle};

/// Number of offscreen layers the compositor stacks (back to front).
pub const LAYER_COUNT: usize = 4;

/// Layer that holds the screen plane (HUD, overlays).
pub const SCREEN_PLANE_LAYER: usize = 2;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScreenId {
    /// Primary display (left eye on stereo hardware).
    Main,
    /// Right eye of the primary display.
    RightEye,
    /// Secondary display (touch screen on dual layouts).
    Sub,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TargetKind {
    Screen(ScreenId),
    Layer(usize),
}

impl TargetKind {
    pub fn label(self) -> String {
        match self {
            TargetKind::Screen(ScreenId::Main) => "screen main".to_string(),
            TargetKind::Screen(ScreenId::RightEye) => "screen right eye".to_string(),
            TargetKind::Screen(ScreenId::Sub) => "screen sub".to_string(),
            TargetKind::Layer(n) => format!("layer {n}"),
        }
    }
}

/// An offscreen buffer the compositor draws into.
///
/// `width`/`height` are buffer pixels. `used_w`/`used_h` are the upright
/// content dimensions: the texture area of a layer, or the display size of a
/// screen.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub kind: TargetKind,
    pub handle: TargetHandle,
    pub width: u32,
    pub height: u32,
    pub used_w: u32,
    pub used_h: u32,
    pub rotated: bool,
    pub depth_stencil: bool,
}

impl RenderTarget {
    pub fn desc(&self) -> TargetDesc {
        TargetDesc {
            label: self.label(),
            width: self.width,
            height: self.height,
            rotated: self.rotated,
            depth_stencil: self.depth_stencil,
        }
    }

    pub fn label(&self) -> String {
        self.kind.label()
    }
}
