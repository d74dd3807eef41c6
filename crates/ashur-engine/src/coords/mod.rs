//! Coordinate and geometry types shared by the compositor, backends and input.
//!
//! Canonical CPU space:
//! - Logical screen pixels (the game's `screen_w × screen_h` canvas)
//! - Origin top-left
//! - +X right, +Y down
//!
//! Backends convert to hardware space through the viewport and view transform.

mod color;
mod flip;
mod pixel_rect;
mod rect;
mod transform;
mod vec2;

pub use color::ColorRgba;
pub use flip::Flip;
pub use pixel_rect::PixelRect;
pub use rect::Rect;
pub use transform::Transform2D;
pub use vec2::Vec2;
