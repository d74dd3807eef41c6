//! Render target compositor.
//!
//! Draws land in offscreen layers (back to front, layer 2 is the screen
//! plane). At present the layers are composited onto the physical screen
//! targets chosen by the [`DisplayLayout`], with stereo parallax on layouts
//! that have a right-eye screen.
//!
//! Convention:
//! - Draw coordinates are logical screen pixels (top-left origin, +Y down).
//! - Screen targets may be rotated 90° relative to their display.

pub mod composite;
mod compositor;
mod context;
pub mod draw;
mod frame;
mod layout;
mod target;
pub mod viewport;

pub use compositor::{Compositor, CompositorSettings, DrawParams};
pub use context::{RendererContext, RendererSettings};
pub use frame::{FrameState, UiContext};
pub use layout::{DisplayLayout, DualScreen, LayerGeometry, LayoutKind, ScreenSpec, SingleScreen, fit_rect};
pub use target::{LAYER_COUNT, RenderTarget, SCREEN_PLANE_LAYER, ScreenId, TargetKind};
