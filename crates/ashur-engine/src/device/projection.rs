use crate::coords::{Rect, Vec2};

use super::{HwViewport, ViewportOrigin};

/// Maps a scene-space point into top-left buffer pixels.
///
/// `buffer_h` is only consulted for bottom-left viewports.
pub fn scene_to_buffer(p: Vec2, vp: &HwViewport, buffer_h: u32, origin: ViewportOrigin) -> Vec2 {
    let r = viewport_top_left(vp, buffer_h, origin);
    let sw = vp.scene_w.max(f32::EPSILON);
    let sh = vp.scene_h.max(f32::EPSILON);

    if vp.rotated {
        Vec2::new(
            r.x() + r.w() - p.y * r.w() / sh,
            r.y() + p.x * r.h() / sw,
        )
    } else {
        Vec2::new(r.x() + p.x * r.w() / sw, r.y() + p.y * r.h() / sh)
    }
}

/// Viewport rectangle expressed with a top-left origin.
pub fn viewport_top_left(vp: &HwViewport, buffer_h: u32, origin: ViewportOrigin) -> Rect {
    let r = vp.rect;
    let y = match origin {
        ViewportOrigin::BottomLeft if !vp.rotated => buffer_h as i32 - r.y - r.h,
        _ => r.y,
    };
    Rect::new(r.x as f32, y as f32, r.w as f32, r.h as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::PixelRect;

    #[test]
    fn upright_viewport_scales_scene() {
        let vp = HwViewport {
            rect: PixelRect::new(10, 20, 200, 100),
            scene_w: 400.0,
            scene_h: 200.0,
            rotated: false,
        };
        let p = scene_to_buffer(Vec2::new(400.0, 200.0), &vp, 512, ViewportOrigin::TopLeft);
        assert_eq!(p, Vec2::new(210.0, 120.0));
    }

    #[test]
    fn bottom_left_origin_flips_rows() {
        let vp = HwViewport {
            rect: PixelRect::new(0, 0, 100, 50),
            scene_w: 100.0,
            scene_h: 50.0,
            rotated: false,
        };
        let p = scene_to_buffer(Vec2::zero(), &vp, 256, ViewportOrigin::BottomLeft);
        assert_eq!(p, Vec2::new(0.0, 206.0));
    }

    #[test]
    fn rotated_viewport_runs_scene_x_down_the_buffer() {
        // 400x240 display stored in a 240x400 buffer.
        let vp = HwViewport {
            rect: PixelRect::new(0, 0, 240, 400),
            scene_w: 400.0,
            scene_h: 240.0,
            rotated: true,
        };
        let origin = scene_to_buffer(Vec2::zero(), &vp, 400, ViewportOrigin::TopLeft);
        let far = scene_to_buffer(Vec2::new(400.0, 240.0), &vp, 400, ViewportOrigin::TopLeft);
        assert_eq!(origin, Vec2::new(240.0, 0.0));
        assert_eq!(far, Vec2::new(0.0, 400.0));
    }
}
