use crate::coords::{PixelRect, Vec2};
use crate::device::{HwViewport, ViewportOrigin};

/// Logical viewport plus the view offset applied on top of it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportState {
    /// In logical screen pixels.
    pub rect: PixelRect,
    pub offset: Vec2,
    /// Skip `offset` when building the view transform.
    pub ignore_offset: bool,
}

impl ViewportState {
    pub fn full(screen_w: u32, screen_h: u32) -> Self {
        Self {
            rect: PixelRect::new(0, 0, screen_w as i32, screen_h as i32),
            offset: Vec2::zero(),
            ignore_offset: false,
        }
    }
}

/// Converts a logical viewport to a hardware viewport on a target buffer.
///
/// `scale` maps logical pixels to upright target pixels. The result is
/// clamped to the `buffer_w × buffer_h` framebuffer. Rotated buffers swap axes
/// and mirror X; on upright buffers a bottom-left `origin` flips Y.
pub fn compute_hw_viewport(
    viewport: PixelRect,
    scale: Vec2,
    buffer_w: u32,
    buffer_h: u32,
    rotated: bool,
    origin: ViewportOrigin,
) -> HwViewport {
    let fb_w = buffer_w.max(1) as i32;
    let fb_h = buffer_h.max(1) as i32;

    let vx = (viewport.x as f32 * scale.x).round() as i32;
    let vy = (viewport.y as f32 * scale.y).round() as i32;
    let vw = (viewport.w as f32 * scale.x).round() as i32;
    let vh = (viewport.h as f32 * scale.y).round() as i32;

    if rotated {
        let hw_x = vy.clamp(0, fb_w - 1);
        let hw_y = vx.clamp(0, fb_h - 1);
        let hw_w = (fb_w - hw_x).min(vh).max(0);
        let hw_h = (fb_h - hw_y).min(vw).max(0);

        HwViewport {
            rect: PixelRect::new(fb_w - hw_x - hw_w, hw_y, hw_w, hw_h),
            scene_w: hw_h as f32 / scale.x,
            scene_h: hw_w as f32 / scale.y,
            rotated: true,
        }
    } else {
        let hw_x = vx.clamp(0, fb_w - 1);
        let hw_y = vy.clamp(0, fb_h - 1);
        let hw_w = (fb_w - hw_x).min(vw).max(0);
        let hw_h = (fb_h - hw_y).min(vh).max(0);

        let y = match origin {
            ViewportOrigin::TopLeft => hw_y,
            ViewportOrigin::BottomLeft => fb_h - hw_y - hw_h,
        };

        HwViewport {
            rect: PixelRect::new(hw_x, y, hw_w, hw_h),
            scene_w: hw_w as f32 / scale.x,
            scene_h: hw_h as f32 / scale.y,
            rotated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: Vec2 = Vec2::new(1.0, 1.0);

    #[test]
    fn upright_viewport_is_clamped_to_the_buffer() {
        let vp = compute_hw_viewport(
            PixelRect::new(-20, 10, 1000, 100),
            ONE,
            512,
            256,
            false,
            ViewportOrigin::TopLeft,
        );
        assert_eq!(vp.rect, PixelRect::new(0, 10, 512, 100));
        assert_eq!((vp.scene_w, vp.scene_h), (512.0, 100.0));
    }

    #[test]
    fn bottom_left_origin_flips_y() {
        let vp = compute_hw_viewport(
            PixelRect::new(0, 10, 100, 50),
            ONE,
            512,
            256,
            false,
            ViewportOrigin::BottomLeft,
        );
        assert_eq!(vp.rect, PixelRect::new(0, 256 - 10 - 50, 100, 50));
    }

    #[test]
    fn rotated_viewport_swaps_axes_and_mirrors_x() {
        let vp = compute_hw_viewport(
            PixelRect::new(100, 50, 200, 100),
            ONE,
            240,
            400,
            true,
            ViewportOrigin::BottomLeft,
        );
        assert_eq!(vp.rect, PixelRect::new(90, 100, 100, 200));
        assert_eq!((vp.scene_w, vp.scene_h), (200.0, 100.0));
        assert!(vp.rotated);
    }

    #[test]
    fn half_resolution_layers_keep_logical_scene_units() {
        let vp = compute_hw_viewport(
            PixelRect::new(0, 0, 800, 480),
            Vec2::new(0.5, 0.5),
            512,
            256,
            false,
            ViewportOrigin::TopLeft,
        );
        assert_eq!(vp.rect, PixelRect::new(0, 0, 400, 240));
        assert_eq!((vp.scene_w, vp.scene_h), (800.0, 480.0));
    }
}
