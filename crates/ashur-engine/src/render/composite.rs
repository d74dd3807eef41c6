use crate::coords::{PixelRect, Rect};

use super::frame::UiContext;
use super::target::{LAYER_COUNT, ScreenId};

/// Depth slider values at or below this render mono.
pub const STEREO_THRESHOLD: f32 = 0.05;

/// Everything that decides how layers reach the screens.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CompositeInput {
    pub swapped: bool,
    pub ui: UiContext,
    pub depth_slider: f32,
    pub single_layer: bool,
    /// The layout has a right-eye screen.
    pub stereo: bool,
    pub phys: PixelRect,
    pub letterbox: i32,
    pub tex_w: u32,
    pub tex_h: u32,
    pub max_3d_offset: f32,
}

/// Draw of one layer's content onto a screen.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerBlit {
    pub layer: usize,
    /// Layer texels.
    pub src: Rect,
    /// Display pixels of the screen.
    pub dst: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositePass {
    pub screen: ScreenId,
    pub blits: Vec<LayerBlit>,
}

/// Decides which screens receive the layers and with what parallax.
///
/// In order of precedence: swapped with the editor screen active (main screen,
/// shifted right by the letterbox), swapped (sub screen), level editor with
/// its screen inactive (sub screen, shifted left), mono (main screen), and
/// stereo (main and right-eye screens with per-layer parallax).
pub fn plan_composite(input: &CompositeInput) -> Vec<CompositePass> {
    let layers = if input.single_layer { 1 } else { LAYER_COUNT };
    let phys = input.phys;
    let mono_src = Rect::new(0.0, 0.0, input.tex_w as f32, input.tex_h as f32);

    let mono = |screen: ScreenId, dx: i32| -> CompositePass {
        let dst = Rect::new((phys.x + dx) as f32, phys.y as f32, phys.w as f32, phys.h as f32);
        CompositePass {
            screen,
            blits: (0..layers)
                .map(|layer| LayerBlit { layer, src: mono_src, dst })
                .collect(),
        }
    };

    let ui = input.ui;
    if input.swapped && ui.editor_mapping() {
        return vec![mono(ScreenId::Main, input.letterbox)];
    }
    if input.swapped {
        return vec![mono(ScreenId::Sub, 0)];
    }
    if ui.level_editor && !ui.editor_screen_active {
        return vec![mono(ScreenId::Sub, -input.letterbox)];
    }
    if input.depth_slider <= STEREO_THRESHOLD || input.single_layer || !input.stereo {
        return vec![mono(ScreenId::Main, 0)];
    }

    let shift = (input.max_3d_offset / 2.0) as i32;
    let table = [shift as f32, shift as f32 * 0.4, 0.0, shift as f32 * -0.4];
    let show_w = (input.tex_w as i32 - 2 * shift).max(1) as f32;
    let dst = phys.to_rect();

    let eye = |screen: ScreenId, sign: i32| -> CompositePass {
        CompositePass {
            screen,
            blits: (0..LAYER_COUNT)
                .map(|layer| {
                    let parallax = (table[layer] * input.depth_slider) as i32;
                    let x = shift + sign * parallax;
                    LayerBlit {
                        layer,
                        src: Rect::new(x as f32, 0.0, show_w, input.tex_h as f32),
                        dst,
                    }
                })
                .collect(),
        }
    };

    vec![eye(ScreenId::Main, 1), eye(ScreenId::RightEye, -1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CompositeInput {
        CompositeInput {
            swapped: false,
            ui: UiContext::default(),
            depth_slider: 0.0,
            single_layer: false,
            stereo: true,
            phys: PixelRect::new(0, 0, 400, 240),
            letterbox: 40,
            tex_w: 400,
            tex_h: 240,
            max_3d_offset: 20.0,
        }
    }

    fn screens(passes: &[CompositePass]) -> Vec<ScreenId> {
        passes.iter().map(|p| p.screen).collect()
    }

    // ── routing ───────────────────────────────────────────────────────────

    #[test]
    fn swapped_editor_goes_to_main_shifted_right() {
        let mut i = input();
        i.swapped = true;
        i.ui = UiContext { level_editor: true, magic_hand: false, editor_screen_active: true };
        let passes = plan_composite(&i);
        assert_eq!(screens(&passes), vec![ScreenId::Main]);
        assert_eq!(passes[0].blits[0].dst.x(), 40.0);
    }

    #[test]
    fn swapped_goes_to_sub() {
        let mut i = input();
        i.swapped = true;
        i.ui.magic_hand = true;
        let passes = plan_composite(&i);
        assert_eq!(screens(&passes), vec![ScreenId::Sub]);
        assert_eq!(passes[0].blits[0].dst.x(), 0.0);
    }

    #[test]
    fn inactive_level_editor_goes_to_sub_shifted_left() {
        let mut i = input();
        i.ui.level_editor = true;
        i.depth_slider = 1.0;
        let passes = plan_composite(&i);
        assert_eq!(screens(&passes), vec![ScreenId::Sub]);
        assert_eq!(passes[0].blits[0].dst.x(), -40.0);
    }

    #[test]
    fn low_slider_or_single_layer_is_mono() {
        let mut i = input();
        i.depth_slider = 0.05;
        let passes = plan_composite(&i);
        assert_eq!(screens(&passes), vec![ScreenId::Main]);
        assert_eq!(passes[0].blits.len(), LAYER_COUNT);

        i.depth_slider = 1.0;
        i.single_layer = true;
        let passes = plan_composite(&i);
        assert_eq!(screens(&passes), vec![ScreenId::Main]);
        assert_eq!(passes[0].blits.len(), 1);
        assert_eq!(passes[0].blits[0].src, Rect::new(0.0, 0.0, 400.0, 240.0));
    }

    // ── stereo ────────────────────────────────────────────────────────────

    #[test]
    fn stereo_shifts_layers_in_opposite_directions() {
        let mut i = input();
        i.depth_slider = 1.0;
        let passes = plan_composite(&i);
        assert_eq!(screens(&passes), vec![ScreenId::Main, ScreenId::RightEye]);

        let left: Vec<f32> = passes[0].blits.iter().map(|b| b.src.x()).collect();
        let right: Vec<f32> = passes[1].blits.iter().map(|b| b.src.x()).collect();
        assert_eq!(left, vec![20.0, 14.0, 10.0, 6.0]);
        assert_eq!(right, vec![0.0, 6.0, 10.0, 14.0]);
        assert!(passes[0].blits.iter().all(|b| b.src.w() == 380.0));
    }

    #[test]
    fn stereo_parallax_scales_with_the_slider() {
        let mut i = input();
        i.depth_slider = 0.5;
        let passes = plan_composite(&i);
        assert_eq!(passes[0].blits[0].src.x(), 15.0);
        assert_eq!(passes[1].blits[0].src.x(), 5.0);
    }
}
