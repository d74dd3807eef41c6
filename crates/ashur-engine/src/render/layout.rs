use std::fmt;
use std::str::FromStr;

use crate::coords::{PixelRect, Rect};
use crate::device::ScreenPlacement;

use super::target::{LAYER_COUNT, RenderTarget, ScreenId, TargetKind};

/// Which [`DisplayLayout`] to build at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LayoutKind {
    Single,
    Dual,
}

impl LayoutKind {
    pub fn build(self) -> Box<dyn DisplayLayout> {
        match self {
            LayoutKind::Single => Box::new(SingleScreen),
            LayoutKind::Dual => Box::new(DualScreen),
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutKind::Single => "single",
            LayoutKind::Dual => "dual",
        })
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(LayoutKind::Single),
            "dual" => Ok(LayoutKind::Dual),
            other => Err(format!("unknown layout {other:?} (expected single or dual)")),
        }
    }
}

/// A physical display the layout exposes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScreenSpec {
    pub id: ScreenId,
    /// Upright display size.
    pub width: u32,
    pub height: u32,
    /// The framebuffer is mounted 90° to the display.
    pub rotated: bool,
}

impl ScreenSpec {
    /// Framebuffer size (axes swapped when rotated).
    pub fn buffer_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Size of the offscreen layers for a logical screen size.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LayerGeometry {
    /// Content area drawn into each layer.
    pub tex_w: u32,
    pub tex_h: u32,
    /// Allocated layer buffer.
    pub mem_w: u32,
    pub mem_h: u32,
    /// Only layer 0 exists; every layer selection lands there.
    pub single_layer: bool,
}

impl LayerGeometry {
    pub fn layer_count(&self) -> usize {
        if self.single_layer { 1 } else { LAYER_COUNT }
    }
}

/// Platform display strategy.
pub trait DisplayLayout {
    fn kind(&self) -> LayoutKind;

    /// Screens to allocate for a window of `window_w × window_h`.
    fn screens(&self, window_w: u32, window_h: u32) -> Vec<ScreenSpec>;

    /// Layer buffers for a logical screen. `budget` is the video memory
    /// available for them.
    fn layer_geometry(&self, screen_w: u32, screen_h: u32, swapped: bool, budget: u64) -> LayerGeometry;

    /// Where the game image lands on the display it is composited onto
    /// (the sub screen when swapped).
    fn physical_rect(&self, geometry: &LayerGeometry, swapped: bool, window_w: u32, window_h: u32) -> PixelRect;

    /// Horizontal offset between the sub and main display coordinate spaces.
    fn letterbox_offset(&self) -> i32;

    fn supports_stereo(&self) -> bool;

    /// Resolves a requested screen swap against what the layout can show.
    fn should_swap(&self, requested: bool) -> bool;

    /// Where each screen buffer appears in the presentation surface.
    fn placements(&self, screens: &[RenderTarget]) -> Vec<ScreenPlacement>;
}

/// Largest rectangle with the aspect of `content` centred in `area`.
pub fn fit_rect(content_w: u32, content_h: u32, area_w: u32, area_h: u32) -> PixelRect {
    if content_w == 0 || content_h == 0 {
        return PixelRect::new(0, 0, area_w as i32, area_h as i32);
    }
    let scale = (area_w as f64 / content_w as f64).min(area_h as f64 / content_h as f64);
    let w = (content_w as f64 * scale).round() as i32;
    let h = (content_h as f64 * scale).round() as i32;
    PixelRect::new((area_w as i32 - w) / 2, (area_h as i32 - h) / 2, w, h)
}

/// Desktop window: one display, full-resolution layers, no stereo.
#[derive(Debug, Default, Copy, Clone)]
pub struct SingleScreen;

impl DisplayLayout for SingleScreen {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Single
    }

    fn screens(&self, window_w: u32, window_h: u32) -> Vec<ScreenSpec> {
        vec![ScreenSpec {
            id: ScreenId::Main,
            width: window_w.max(1),
            height: window_h.max(1),
            rotated: false,
        }]
    }

    fn layer_geometry(&self, screen_w: u32, screen_h: u32, _swapped: bool, budget: u64) -> LayerGeometry {
        let w = screen_w.max(1);
        let h = screen_h.max(1);
        // Color plus depth/stencil per layer.
        let per_layer = w as u64 * h as u64 * 4 * 2;
        LayerGeometry {
            tex_w: w,
            tex_h: h,
            mem_w: w,
            mem_h: h,
            single_layer: per_layer * LAYER_COUNT as u64 > budget / 2,
        }
    }

    fn physical_rect(&self, geometry: &LayerGeometry, _swapped: bool, window_w: u32, window_h: u32) -> PixelRect {
        fit_rect(geometry.tex_w, geometry.tex_h, window_w.max(1), window_h.max(1))
    }

    fn letterbox_offset(&self) -> i32 {
        0
    }

    fn supports_stereo(&self) -> bool {
        false
    }

    fn should_swap(&self, _requested: bool) -> bool {
        false
    }

    fn placements(&self, screens: &[RenderTarget]) -> Vec<ScreenPlacement> {
        screens
            .iter()
            .filter(|s| s.kind == TargetKind::Screen(ScreenId::Main))
            .map(|s| ScreenPlacement {
                target: s.handle,
                region: Rect::new(0.0, 0.0, 1.0, 1.0),
                rotated: s.rotated,
            })
            .collect()
    }
}

/// Handheld profile: a 400×240 stereo top display over a 320×240 touch
/// display, both with framebuffers rotated 90°.
///
/// Layers are half the logical resolution in power-of-two buffers.
#[derive(Debug, Default, Copy, Clone)]
pub struct DualScreen;

impl DualScreen {
    pub const TOP: (u32, u32) = (400, 240);
    pub const BOTTOM: (u32, u32) = (320, 240);
}

impl DisplayLayout for DualScreen {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Dual
    }

    fn screens(&self, _window_w: u32, _window_h: u32) -> Vec<ScreenSpec> {
        let (tw, th) = Self::TOP;
        let (bw, bh) = Self::BOTTOM;
        vec![
            ScreenSpec { id: ScreenId::Main, width: tw, height: th, rotated: true },
            ScreenSpec { id: ScreenId::RightEye, width: tw, height: th, rotated: true },
            ScreenSpec { id: ScreenId::Sub, width: bw, height: bh, rotated: true },
        ]
    }

    fn layer_geometry(&self, screen_w: u32, screen_h: u32, swapped: bool, _budget: u64) -> LayerGeometry {
        let mut tex_w = (screen_w / 2).max(1);
        let mut tex_h = (screen_h / 2).max(1);

        let mem_w = if tex_w <= 256 {
            256
        } else if tex_w <= 512 {
            512
        } else {
            1024
        };
        let mem_h = if tex_h <= 256 { 256 } else { 512 };

        tex_w = tex_w.min(mem_w);
        tex_h = tex_h.min(mem_h);

        LayerGeometry {
            tex_w,
            tex_h,
            mem_w,
            mem_h,
            single_layer: (mem_w >= 512 && mem_h == 512) || self.should_swap(swapped),
        }
    }

    fn physical_rect(&self, geometry: &LayerGeometry, swapped: bool, _window_w: u32, _window_h: u32) -> PixelRect {
        let (dw, dh) = if swapped { Self::BOTTOM } else { Self::TOP };
        fit_rect(geometry.tex_w, geometry.tex_h, dw, dh)
    }

    fn letterbox_offset(&self) -> i32 {
        ((Self::TOP.0 - Self::BOTTOM.0) / 2) as i32
    }

    fn supports_stereo(&self) -> bool {
        true
    }

    fn should_swap(&self, requested: bool) -> bool {
        requested
    }

    fn placements(&self, screens: &[RenderTarget]) -> Vec<ScreenPlacement> {
        let sub_w = Self::BOTTOM.0 as f32 / Self::TOP.0 as f32;
        screens
            .iter()
            .filter_map(|s| {
                let region = match s.kind {
                    TargetKind::Screen(ScreenId::Main) => Rect::new(0.0, 0.0, 1.0, 0.5),
                    TargetKind::Screen(ScreenId::Sub) => {
                        Rect::new((1.0 - sub_w) / 2.0, 0.5, sub_w, 0.5)
                    }
                    _ => return None,
                };
                Some(ScreenPlacement {
                    target: s.handle,
                    region,
                    rotated: s.rotated,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── dual ──────────────────────────────────────────────────────────────

    #[test]
    fn dual_geometry_uses_power_of_two_buffers() {
        let g = DualScreen.layer_geometry(800, 480, false, 0);
        assert_eq!((g.tex_w, g.tex_h, g.mem_w, g.mem_h), (400, 240, 512, 256));
        assert!(!g.single_layer);
        assert_eq!(g.layer_count(), LAYER_COUNT);
    }

    #[test]
    fn dual_geometry_collapses_on_large_buffers_or_swap() {
        let tall = DualScreen.layer_geometry(800, 600, false, 0);
        assert_eq!((tall.mem_w, tall.mem_h), (512, 512));
        assert!(tall.single_layer);

        let swapped = DualScreen.layer_geometry(800, 480, true, 0);
        assert!(swapped.single_layer);
    }

    #[test]
    fn dual_geometry_clamps_texture_to_buffer() {
        let g = DualScreen.layer_geometry(2400, 1200, false, 0);
        assert_eq!((g.mem_w, g.mem_h), (1024, 512));
        assert_eq!((g.tex_w, g.tex_h), (1024, 512));
    }

    #[test]
    fn dual_phys_rect_fits_the_target_display() {
        let g = DualScreen.layer_geometry(800, 480, false, 0);
        assert_eq!(DualScreen.physical_rect(&g, false, 0, 0), PixelRect::new(0, 0, 400, 240));
        assert_eq!(DualScreen.physical_rect(&g, true, 0, 0), PixelRect::new(0, 24, 320, 192));
        assert_eq!(DualScreen.letterbox_offset(), 40);
    }

    #[test]
    fn dual_screens_are_rotated() {
        let screens = DualScreen.screens(0, 0);
        assert_eq!(screens.len(), 3);
        assert!(screens.iter().all(|s| s.rotated));
        assert_eq!(screens[0].buffer_size(), (240, 400));
    }

    // ── single ────────────────────────────────────────────────────────────

    #[test]
    fn single_layout_letterboxes_into_the_window() {
        let g = SingleScreen.layer_geometry(800, 600, false, u64::MAX);
        assert!(!g.single_layer);
        assert_eq!(SingleScreen.physical_rect(&g, false, 1600, 900), PixelRect::new(200, 0, 1200, 900));
        assert!(!SingleScreen.should_swap(true));
    }

    #[test]
    fn single_layout_drops_to_one_layer_on_small_budgets() {
        let g = SingleScreen.layer_geometry(800, 600, false, 8 * 1024 * 1024);
        assert!(g.single_layer);
    }

    #[test]
    fn layout_kind_parses_case_insensitively() {
        assert_eq!("Dual".parse::<LayoutKind>(), Ok(LayoutKind::Dual));
        assert!("triple".parse::<LayoutKind>().is_err());
        assert_eq!(LayoutKind::Single.to_string(), "single");
    }
}
