use log::{debug, info};

use crate::coords::{ColorRgba, Flip, PixelRect, Rect, Transform2D, Vec2};
use crate::device::{
    BackendError, DrawImage, DrawSource, HwViewport, RenderBackend, TargetDesc, TextureFilter,
};
use crate::texture::{PictureId, TextureManager};

use super::composite::{CompositeInput, plan_composite};
use super::draw::split_draw;
use super::frame::{FrameState, UiContext};
use super::layout::{DisplayLayout, LayerGeometry, LayoutKind};
use super::target::{LAYER_COUNT, RenderTarget, SCREEN_PLANE_LAYER, ScreenId, TargetKind};
use super::viewport::{ViewportState, compute_hw_viewport};

/// Startup parameters for [`Compositor`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CompositorSettings {
    pub layout: LayoutKind,
    /// Logical game screen.
    pub screen_w: u32,
    pub screen_h: u32,
    /// Presentation window in physical pixels.
    pub window_w: u32,
    pub window_h: u32,
    pub max_3d_offset: f32,
    pub swap_screens: bool,
}

/// Arguments of a picture draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawParams {
    pub dst: Rect,
    /// Picture pixels; `None` draws the whole picture.
    pub src: Option<Rect>,
    /// Clockwise degrees.
    pub angle: f32,
    /// Rotation centre relative to `dst`'s origin; defaults to its centre.
    pub pivot: Option<Vec2>,
    pub flip: Flip,
    pub tint: ColorRgba,
}

impl DrawParams {
    pub fn new(dst: Rect) -> Self {
        Self {
            dst,
            src: None,
            angle: 0.0,
            pivot: None,
            flip: Flip::NONE,
            tint: ColorRgba::white(),
        }
    }

    pub fn with_src(mut self, src: Rect) -> Self {
        self.src = Some(src);
        self
    }

    pub fn rotated(mut self, angle: f32, pivot: Option<Vec2>) -> Self {
        self.angle = angle;
        self.pivot = pivot;
        self
    }

    pub fn flipped(mut self, flip: Flip) -> Self {
        self.flip = flip;
        self
    }

    pub fn tinted(mut self, tint: ColorRgba) -> Self {
        self.tint = tint;
        self
    }
}

/// Routes draws into offscreen layers and composites them onto the screens.
///
/// A frame opens implicitly on the first target selection or draw and closes
/// with [`present`](Self::present). Layers are cleared to transparent when a
/// frame opens; screens are cleared to black when selected or composited.
pub struct Compositor {
    layout: Box<dyn DisplayLayout>,
    screen_w: u32,
    screen_h: u32,
    window_w: u32,
    window_h: u32,
    max_3d_offset: f32,
    swap_requested: bool,
    geometry: LayerGeometry,
    layers: Vec<RenderTarget>,
    screens: Vec<RenderTarget>,
    phys: PixelRect,
    frame: FrameState,
    ui: UiContext,
    current: Option<TargetKind>,
    viewport: ViewportState,
    view: Transform2D,
}

impl Compositor {
    pub fn new(backend: &mut dyn RenderBackend, settings: CompositorSettings) -> Result<Self, BackendError> {
        let layout = settings.layout.build();
        let geometry = layout.layer_geometry(settings.screen_w, settings.screen_h, false, u64::MAX);

        let mut compositor = Self {
            layout,
            screen_w: settings.screen_w.max(1),
            screen_h: settings.screen_h.max(1),
            window_w: settings.window_w.max(1),
            window_h: settings.window_h.max(1),
            max_3d_offset: settings.max_3d_offset,
            swap_requested: settings.swap_screens,
            geometry,
            layers: Vec::new(),
            screens: Vec::new(),
            phys: PixelRect::default(),
            frame: FrameState::default(),
            ui: UiContext::default(),
            current: None,
            viewport: ViewportState::full(settings.screen_w, settings.screen_h),
            view: Transform2D::IDENTITY,
        };

        compositor.create_screens(backend)?;
        compositor.update_phys_coords(backend, settings.screen_w, settings.screen_h)?;

        info!(
            "compositor ready: {:?} layout on {}, screen {}x{}, layers {}x{} ({} allocated), phys {:?}",
            compositor.layout.kind(),
            backend.name(),
            compositor.screen_w,
            compositor.screen_h,
            compositor.geometry.tex_w,
            compositor.geometry.tex_h,
            compositor.layers.len(),
            compositor.phys
        );
        Ok(compositor)
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn layout_kind(&self) -> LayoutKind {
        self.layout.kind()
    }

    pub fn frame_state(&self) -> FrameState {
        self.frame
    }

    pub fn ui(&self) -> UiContext {
        self.ui
    }

    pub fn geometry(&self) -> LayerGeometry {
        self.geometry
    }

    pub fn is_single_layer(&self) -> bool {
        self.geometry.single_layer
    }

    pub fn phys_rect(&self) -> PixelRect {
        self.phys
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_w, self.screen_h)
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_w, self.window_h)
    }

    pub fn layers(&self) -> &[RenderTarget] {
        &self.layers
    }

    pub fn screens(&self) -> &[RenderTarget] {
        &self.screens
    }

    pub fn current_target(&self) -> Option<TargetKind> {
        self.current
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn view(&self) -> Transform2D {
        self.view
    }

    fn target(&self, kind: TargetKind) -> Option<&RenderTarget> {
        match kind {
            TargetKind::Layer(n) => self.layers.get(n),
            TargetKind::Screen(_) => self.screens.iter().find(|s| s.kind == kind),
        }
    }

    // ── state ─────────────────────────────────────────────────────────────

    pub fn set_ui(&mut self, ui: UiContext) {
        self.ui = ui;
    }

    pub fn set_depth_slider(&mut self, depth: f32) {
        self.frame.depth_slider = if depth.is_finite() { depth.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Requests the game on the secondary display; applied by the next
    /// [`update_phys_coords`](Self::update_phys_coords).
    pub fn set_swap_requested(&mut self, swap: bool) {
        self.swap_requested = swap;
    }

    // ── targets ───────────────────────────────────────────────────────────

    fn create_screens(&mut self, backend: &mut dyn RenderBackend) -> Result<(), BackendError> {
        for screen in self.screens.drain(..) {
            backend.destroy_target(screen.handle);
        }
        for spec in self.layout.screens(self.window_w, self.window_h) {
            let kind = TargetKind::Screen(spec.id);
            let (width, height) = spec.buffer_size();
            let desc = TargetDesc {
                label: kind.label(),
                width,
                height,
                rotated: spec.rotated,
                depth_stencil: false,
            };
            let handle = backend.create_target(&desc)?;
            self.screens.push(RenderTarget {
                kind,
                handle,
                width,
                height,
                used_w: spec.width,
                used_h: spec.height,
                rotated: spec.rotated,
                depth_stencil: false,
            });
        }
        if matches!(self.current, Some(TargetKind::Screen(_))) {
            self.current = None;
        }
        Ok(())
    }

    fn create_layers(&mut self, backend: &mut dyn RenderBackend) -> Result<(), BackendError> {
        for layer in self.layers.drain(..) {
            backend.destroy_target(layer.handle);
        }

        let geometry = self.layout.layer_geometry(
            self.screen_w,
            self.screen_h,
            self.frame.screen_swapped,
            backend.free_memory(),
        );

        for n in 0..geometry.layer_count() {
            let desc = TargetDesc {
                label: TargetKind::Layer(n).label(),
                width: geometry.mem_w,
                height: geometry.mem_h,
                rotated: false,
                depth_stencil: true,
            };
            let handle = backend.create_target(&desc)?;
            self.layers.push(RenderTarget {
                kind: TargetKind::Layer(n),
                handle,
                width: geometry.mem_w,
                height: geometry.mem_h,
                used_w: geometry.tex_w,
                used_h: geometry.tex_h,
                rotated: false,
                depth_stencil: true,
            });
        }

        self.geometry = geometry;
        if matches!(self.current, Some(TargetKind::Layer(_))) {
            self.current = None;
        }
        debug!(
            "layer targets recreated: {} x {}x{} (content {}x{})",
            self.layers.len(),
            geometry.mem_w,
            geometry.mem_h,
            geometry.tex_w,
            geometry.tex_h
        );
        Ok(())
    }

    /// Recomputes layer geometry and the physical game rectangle.
    ///
    /// Layers are recreated when the logical size or the swap state changes.
    pub fn update_phys_coords(
        &mut self,
        backend: &mut dyn RenderBackend,
        screen_w: u32,
        screen_h: u32,
    ) -> Result<(), BackendError> {
        let screen_w = screen_w.max(1);
        let screen_h = screen_h.max(1);
        let swapped = self.layout.should_swap(self.swap_requested);

        let recreate = self.layers.is_empty()
            || (screen_w, screen_h) != (self.screen_w, self.screen_h)
            || swapped != self.frame.screen_swapped;

        self.screen_w = screen_w;
        self.screen_h = screen_h;
        self.frame.screen_swapped = swapped;

        if recreate {
            self.create_layers(backend)?;
            self.viewport = ViewportState::full(screen_w, screen_h);
        }

        self.phys = self
            .layout
            .physical_rect(&self.geometry, swapped, self.window_w, self.window_h);

        for layer in &self.layers {
            backend.set_target_filter(layer.handle, TextureFilter::Linear);
        }
        Ok(())
    }

    /// Follows a window resize; window-sized screens are reallocated.
    pub fn resize_window(
        &mut self,
        backend: &mut dyn RenderBackend,
        window_w: u32,
        window_h: u32,
    ) -> Result<(), BackendError> {
        let window_w = window_w.max(1);
        let window_h = window_h.max(1);
        if (window_w, window_h) == (self.window_w, self.window_h) {
            return Ok(());
        }
        self.window_w = window_w;
        self.window_h = window_h;
        backend.resize_surface(window_w, window_h);

        let specs = self.layout.screens(window_w, window_h);
        let unchanged = specs.len() == self.screens.len()
            && specs
                .iter()
                .zip(&self.screens)
                .all(|(s, t)| (s.width, s.height) == (t.used_w, t.used_h));
        if !unchanged {
            self.create_screens(backend)?;
        }

        self.phys = self
            .layout
            .physical_rect(&self.geometry, self.frame.screen_swapped, window_w, window_h);
        Ok(())
    }

    /// Releases every target; the compositor is unusable afterwards.
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend) {
        for target in self.layers.drain(..).chain(self.screens.drain(..)) {
            backend.destroy_target(target.handle);
        }
        self.current = None;
        self.frame.in_frame = false;
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Opens a frame if none is open: layers and the sub screen start
    /// transparent.
    pub fn begin_frame(&mut self, backend: &mut dyn RenderBackend) {
        if self.frame.in_frame {
            return;
        }
        backend.begin_frame();
        for layer in &self.layers {
            backend.clear(layer.handle, ColorRgba::transparent());
        }
        if let Some(sub) = self.target(TargetKind::Screen(ScreenId::Sub)) {
            backend.clear(sub.handle, ColorRgba::transparent());
        }
        self.frame.in_frame = true;
    }

    fn bind(&mut self, backend: &mut dyn RenderBackend, kind: TargetKind) -> bool {
        let Some(target) = self.target(kind) else {
            debug!("no {kind:?} target in the {:?} layout", self.layout.kind());
            return false;
        };
        backend.bind_target(target.handle);
        self.current = Some(kind);
        true
    }

    /// Draws into layer `layer` (layer 0 in single-layer mode).
    pub fn set_target_layer(&mut self, backend: &mut dyn RenderBackend, layer: usize) {
        self.begin_frame(backend);
        let n = if self.geometry.single_layer { 0 } else { layer.min(LAYER_COUNT - 1) };
        if self.bind(backend, TargetKind::Layer(n)) {
            self.apply_viewport(backend);
        }
    }

    /// Draws into the screen-plane layer across the full logical screen,
    /// ignoring the viewport and its offset.
    pub fn set_target_texture(&mut self, backend: &mut dyn RenderBackend) {
        self.begin_frame(backend);
        let n = if self.geometry.single_layer { 0 } else { SCREEN_PLANE_LAYER };
        if !self.bind(backend, TargetKind::Layer(n)) {
            return;
        }
        self.view = Transform2D::IDENTITY;
        if let Some(hw) = self.hw_viewport(backend, PixelRect::new(0, 0, self.screen_w as i32, self.screen_h as i32)) {
            backend.set_viewport(hw);
        }
    }

    pub fn set_target_main_screen(&mut self, backend: &mut dyn RenderBackend) {
        self.set_target_screen(backend, ScreenId::Main);
    }

    pub fn set_target_sub_screen(&mut self, backend: &mut dyn RenderBackend) {
        self.set_target_screen(backend, ScreenId::Sub);
    }

    /// Selects a physical screen in display coordinates, cleared to black.
    fn set_target_screen(&mut self, backend: &mut dyn RenderBackend, id: ScreenId) {
        self.begin_frame(backend);
        let kind = TargetKind::Screen(id);
        let Some(screen) = self.target(kind).cloned() else {
            debug!("no {id:?} screen in the {:?} layout", self.layout.kind());
            return;
        };
        backend.clear(screen.handle, ColorRgba::black());
        self.bind(backend, kind);
        self.view = Transform2D::IDENTITY;
        backend.set_viewport(full_viewport(&screen));
    }

    /// Composites the frame onto the screens and presents it.
    ///
    /// Does nothing outside a frame.
    pub fn present(&mut self, backend: &mut dyn RenderBackend) -> Result<(), BackendError> {
        if !self.frame.in_frame {
            return Ok(());
        }

        let plan = plan_composite(&self.composite_input());
        self.view = Transform2D::IDENTITY;

        for pass in plan {
            let Some(screen) = self.target(TargetKind::Screen(pass.screen)).cloned() else {
                continue;
            };
            backend.clear(screen.handle, ColorRgba::black());
            backend.bind_target(screen.handle);
            backend.set_viewport(full_viewport(&screen));

            for blit in pass.blits {
                let Some(layer) = self.layers.get(blit.layer) else { continue };
                backend.draw_image(&DrawImage {
                    source: DrawSource::Target(layer.handle),
                    dst: blit.dst,
                    src: blit.src,
                    flip: Flip::NONE,
                    tint: ColorRgba::white(),
                    transform: Transform2D::IDENTITY,
                });
            }
        }

        let placements = self.layout.placements(&self.screens);
        self.frame.frame_counter += 1;
        self.frame.in_frame = false;
        self.current = None;
        backend.end_frame(&placements)
    }

    /// Alias of [`present`](Self::present).
    pub fn end_frame(&mut self, backend: &mut dyn RenderBackend) -> Result<(), BackendError> {
        self.present(backend)
    }

    /// Blanks every screen; only acts between frames.
    pub fn clear_buffer(&mut self, backend: &mut dyn RenderBackend) -> Result<(), BackendError> {
        if self.frame.in_frame {
            return Ok(());
        }
        backend.begin_frame();
        for screen in &self.screens {
            backend.clear(screen.handle, ColorRgba::black());
        }
        backend.end_frame(&self.layout.placements(&self.screens))
    }

    fn composite_input(&self) -> CompositeInput {
        CompositeInput {
            swapped: self.frame.screen_swapped,
            ui: self.ui,
            depth_slider: self.frame.depth_slider,
            single_layer: self.geometry.single_layer,
            stereo: self.layout.supports_stereo(),
            phys: self.phys,
            letterbox: self.layout.letterbox_offset(),
            tex_w: self.geometry.tex_w,
            tex_h: self.geometry.tex_h,
            max_3d_offset: self.max_3d_offset,
        }
    }

    // ── viewport ──────────────────────────────────────────────────────────

    fn hw_viewport(&self, backend: &dyn RenderBackend, rect: PixelRect) -> Option<HwViewport> {
        let target = self.target(self.current?)?;
        let scale = Vec2::new(
            target.used_w as f32 / self.screen_w as f32,
            target.used_h as f32 / self.screen_h as f32,
        );
        Some(compute_hw_viewport(
            rect,
            scale,
            target.width,
            target.height,
            target.rotated,
            backend.limits().viewport_origin,
        ))
    }

    /// Rebuilds the view transform and hardware viewport for the current
    /// target. Outside a frame this does nothing.
    pub fn apply_viewport(&mut self, backend: &mut dyn RenderBackend) {
        if !self.frame.in_frame {
            return;
        }
        self.view = Transform2D::IDENTITY;
        if !self.viewport.ignore_offset {
            self.view.translate(self.viewport.offset.x, self.viewport.offset.y);
        }
        if let Some(hw) = self.hw_viewport(backend, self.viewport.rect) {
            backend.set_viewport(hw);
        }
    }

    /// Sets the logical viewport rectangle.
    pub fn set_viewport(&mut self, backend: &mut dyn RenderBackend, rect: PixelRect) {
        self.viewport.rect = rect;
        self.apply_viewport(backend);
    }

    pub fn reset_viewport(&mut self, backend: &mut dyn RenderBackend) {
        self.viewport.rect = PixelRect::new(0, 0, self.screen_w as i32, self.screen_h as i32);
        self.apply_viewport(backend);
    }

    pub fn set_viewport_offset(&mut self, backend: &mut dyn RenderBackend, x: f32, y: f32) {
        self.viewport.offset = Vec2::new(x, y);
        self.apply_viewport(backend);
    }

    pub fn set_viewport_offset_ignore(&mut self, backend: &mut dyn RenderBackend, ignore: bool) {
        self.viewport.ignore_offset = ignore;
        self.apply_viewport(backend);
    }

    // ── coordinates ───────────────────────────────────────────────────────

    /// Window (or touch display) coordinates to logical screen coordinates.
    pub fn map_to_screen(&self, p: Vec2) -> Vec2 {
        if self.ui.editor_mapping() {
            return p * 2.0;
        }
        let mut x = p.x;
        if !self.frame.screen_swapped {
            x += self.layout.letterbox_offset() as f32;
        }
        let phys_w = self.phys.w.max(1) as f32;
        let phys_h = self.phys.h.max(1) as f32;
        Vec2::new(
            (x - self.phys.x as f32) * self.screen_w as f32 / phys_w,
            (p.y - self.phys.y as f32) * self.screen_h as f32 / phys_h,
        )
    }

    /// Normalized window region the layout presents screen `id` in.
    pub fn screen_region(&self, id: ScreenId) -> Option<Rect> {
        let screen = self.target(TargetKind::Screen(id))?;
        self.layout
            .placements(&self.screens)
            .into_iter()
            .find(|p| p.target == screen.handle)
            .map(|p| p.region)
    }

    /// Inverse of [`map_to_screen`](Self::map_to_screen).
    pub fn map_from_screen(&self, p: Vec2) -> Vec2 {
        if self.ui.editor_mapping() {
            return p / 2.0;
        }
        let mut x = p.x * self.phys.w as f32 / self.screen_w as f32 + self.phys.x as f32;
        let y = p.y * self.phys.h as f32 / self.screen_h as f32 + self.phys.y as f32;
        if !self.frame.screen_swapped {
            x -= self.layout.letterbox_offset() as f32;
        }
        Vec2::new(x, y)
    }

    // ── drawing ───────────────────────────────────────────────────────────

    fn ensure_target(&mut self, backend: &mut dyn RenderBackend) {
        if !self.frame.in_frame || self.current.is_none() {
            self.set_target_layer(backend, 0);
        }
    }

    /// Draws a picture into the current target.
    ///
    /// Failed and uninitialized pictures are skipped; lazy pictures load on
    /// first draw. Source rows spanning backing textures are split into
    /// several draws.
    pub fn draw_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        textures: &mut TextureManager,
        picture: PictureId,
        params: &DrawParams,
    ) {
        if !textures.get(picture).is_some_and(|p| p.is_inited()) {
            return;
        }
        self.ensure_target(backend);
        if !textures.ensure_resident(backend, picture) {
            return;
        }
        let Some(pic) = textures.get(picture) else { return };

        let src = params
            .src
            .unwrap_or_else(|| Rect::new(0.0, 0.0, pic.width() as f32, pic.height() as f32));
        let handles = *pic.textures();
        let available = handles.map(|h| h.is_some());
        let unit = pic.unit_rows();

        let saved = self.view;
        let mut dst = params.dst;
        if params.angle != 0.0 {
            let pivot = params
                .pivot
                .unwrap_or_else(|| Vec2::new(dst.w() / 2.0, dst.h() / 2.0));
            self.view.translate(dst.x() + pivot.x, dst.y() + pivot.y);
            self.view.rotate_degrees(params.angle);
            dst = Rect::new(-pivot.x, -pivot.y, dst.w(), dst.h());
        }

        for piece in split_draw(src, dst, unit, available, params.flip.vertical()) {
            let Some(handle) = handles[piece.texture] else { continue };
            backend.draw_image(&DrawImage {
                source: DrawSource::Texture(handle),
                dst: piece.dst,
                src: piece.src,
                flip: params.flip,
                tint: params.tint,
                transform: self.view,
            });
        }

        self.view = saved;
    }

    /// Solid or one-pixel outline rectangle in the current target.
    pub fn draw_rect(&mut self, backend: &mut dyn RenderBackend, rect: Rect, color: ColorRgba, filled: bool) {
        self.ensure_target(backend);
        let r = rect.normalized();
        if filled {
            backend.fill_rect(r, color, self.view);
            return;
        }
        let t = 1.0f32.min(r.w()).min(r.h());
        let edges = [
            Rect::new(r.x(), r.y(), r.w(), t),
            Rect::new(r.x(), r.y() + r.h() - t, r.w(), t),
            Rect::new(r.x(), r.y() + t, t, r.h() - 2.0 * t),
            Rect::new(r.x() + r.w() - t, r.y() + t, t, r.h() - 2.0 * t),
        ];
        for edge in edges.into_iter().filter(|e| !e.is_empty()) {
            backend.fill_rect(edge, color, self.view);
        }
    }
}

/// Whole-buffer viewport in display coordinates.
fn full_viewport(target: &RenderTarget) -> HwViewport {
    HwViewport {
        rect: PixelRect::new(0, 0, target.width as i32, target.height as i32),
        scene_w: target.used_w as f32,
        scene_h: target.used_h as f32,
        rotated: target.rotated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BackendCommand, HeadlessBackend, ImageData, TargetHandle};
    use crate::texture::{MemoryImageSource, TextureSettings};

    const MIB: u64 = 1024 * 1024;

    fn settings(layout: LayoutKind, screen_w: u32, screen_h: u32) -> CompositorSettings {
        CompositorSettings {
            layout,
            screen_w,
            screen_h,
            window_w: 800,
            window_h: 480,
            max_3d_offset: 20.0,
            swap_screens: false,
        }
    }

    fn dual() -> (HeadlessBackend, Compositor) {
        let mut be = HeadlessBackend::new(256 * MIB);
        let c = Compositor::new(&mut be, settings(LayoutKind::Dual, 800, 480)).unwrap();
        be.take_commands();
        (be, c)
    }

    fn bound(be: &HeadlessBackend) -> Option<TargetHandle> {
        be.commands().iter().rev().find_map(|c| match c {
            BackendCommand::Bind(t) => Some(*t),
            _ => None,
        })
    }

    fn count(be: &HeadlessBackend, pred: impl Fn(&BackendCommand) -> bool) -> usize {
        be.commands().iter().filter(|c| pred(c)).count()
    }

    // ── frame lifecycle ───────────────────────────────────────────────────

    #[test]
    fn frame_opens_once_and_clears_layers_and_sub_screen() {
        let (mut be, mut c) = dual();
        c.set_target_layer(&mut be, 1);
        c.set_target_layer(&mut be, 3);

        assert_eq!(count(&be, |cmd| matches!(cmd, BackendCommand::BeginFrame)), 1);
        let transparent = count(&be, |cmd| {
            matches!(cmd, BackendCommand::Clear { color, .. } if *color == ColorRgba::transparent())
        });
        assert_eq!(transparent, LAYER_COUNT + 1);
        assert_eq!(bound(&be), Some(c.layers()[3].handle));
        assert!(c.frame_state().in_frame);
    }

    #[test]
    fn present_outside_a_frame_is_a_noop() {
        let (mut be, mut c) = dual();
        c.present(&mut be).unwrap();
        assert_eq!(be.frames_presented(), 0);
        assert_eq!(c.frame_state().frame_counter, 0);
    }

    #[test]
    fn present_composites_and_closes_the_frame() {
        let (mut be, mut c) = dual();
        c.set_target_layer(&mut be, 0);
        c.present(&mut be).unwrap();

        let state = c.frame_state();
        assert!(!state.in_frame);
        assert_eq!(state.frame_counter, 1);
        assert_eq!(c.current_target(), None);

        let layer_draws = be
            .draws()
            .iter()
            .filter(|d| matches!(d.source, DrawSource::Target(_)))
            .count();
        assert_eq!(layer_draws, LAYER_COUNT);

        match be.commands().last() {
            Some(BackendCommand::EndFrame { placements }) => assert_eq!(placements.len(), 2),
            other => panic!("expected end of frame, got {other:?}"),
        }
    }

    #[test]
    fn stereo_present_fills_both_eyes() {
        let (mut be, mut c) = dual();
        c.set_depth_slider(1.0);
        c.set_target_layer(&mut be, 0);
        c.present(&mut be).unwrap();

        let main = c.target(TargetKind::Screen(ScreenId::Main)).unwrap().handle;
        let right = c.target(TargetKind::Screen(ScreenId::RightEye)).unwrap().handle;
        let draws_into = |t: TargetHandle| {
            count(&be, |cmd| matches!(cmd, BackendCommand::Draw { target: Some(h), .. } if *h == t))
        };
        assert_eq!(draws_into(main), LAYER_COUNT);
        assert_eq!(draws_into(right), LAYER_COUNT);
    }

    #[test]
    fn clear_buffer_only_runs_between_frames() {
        let (mut be, mut c) = dual();
        c.clear_buffer(&mut be).unwrap();
        assert_eq!(be.frames_presented(), 1);
        assert_eq!(c.frame_state().frame_counter, 0);

        c.set_target_layer(&mut be, 0);
        c.clear_buffer(&mut be).unwrap();
        assert_eq!(be.frames_presented(), 1);
    }

    // ── target selection ──────────────────────────────────────────────────

    #[test]
    fn single_layer_mode_collapses_every_layer() {
        let mut be = HeadlessBackend::new(256 * MIB);
        let mut c = Compositor::new(&mut be, settings(LayoutKind::Dual, 800, 600)).unwrap();
        assert!(c.is_single_layer());
        assert_eq!(c.layers().len(), 1);

        c.set_target_layer(&mut be, 3);
        assert_eq!(c.current_target(), Some(TargetKind::Layer(0)));
        c.set_target_texture(&mut be);
        assert_eq!(c.current_target(), Some(TargetKind::Layer(0)));
    }

    #[test]
    fn texture_target_is_the_screen_plane_layer() {
        let (mut be, mut c) = dual();
        c.set_viewport_offset(&mut be, 10.0, 5.0);
        c.set_target_texture(&mut be);
        assert_eq!(c.current_target(), Some(TargetKind::Layer(SCREEN_PLANE_LAYER)));
        assert!(c.view().is_identity());
    }

    #[test]
    fn selecting_a_screen_clears_it_to_black() {
        let (mut be, mut c) = dual();
        c.set_target_main_screen(&mut be);
        let main = c.target(TargetKind::Screen(ScreenId::Main)).unwrap().handle;
        assert!(be.commands().contains(&BackendCommand::Clear {
            target: main,
            color: ColorRgba::black(),
        }));
        assert_eq!(bound(&be), Some(main));
    }

    #[test]
    fn sub_screen_is_absent_on_single_layout() {
        let mut be = HeadlessBackend::new(256 * MIB);
        let mut c = Compositor::new(&mut be, settings(LayoutKind::Single, 800, 600)).unwrap();
        c.set_target_sub_screen(&mut be);
        assert_eq!(c.current_target(), None);
    }

    // ── geometry ──────────────────────────────────────────────────────────

    #[test]
    fn phys_coords_recreate_layers_only_on_change() {
        let (mut be, mut c) = dual();
        let before: Vec<_> = c.layers().iter().map(|l| l.handle).collect();
        assert!(before.iter().all(|h| be.target_filter(*h) == Some(TextureFilter::Linear)));

        c.update_phys_coords(&mut be, 800, 480).unwrap();
        let same: Vec<_> = c.layers().iter().map(|l| l.handle).collect();
        assert_eq!(before, same);

        c.update_phys_coords(&mut be, 640, 480).unwrap();
        assert_ne!(c.layers()[0].handle, before[0]);
        assert_eq!(c.geometry().tex_w, 320);

        c.set_swap_requested(true);
        c.update_phys_coords(&mut be, 640, 480).unwrap();
        assert!(c.frame_state().screen_swapped);
        assert!(c.is_single_layer());
        assert_eq!(be.live_targets(), 3 + 1);
    }

    #[test]
    fn layers_carry_depth_stencil() {
        let (be, c) = dual();
        let desc = be.target_desc(c.layers()[0].handle).unwrap();
        assert!(desc.depth_stencil);
        assert_eq!((desc.width, desc.height), (512, 256));
    }

    #[test]
    fn window_resize_reallocates_single_layout_screen() {
        let mut be = HeadlessBackend::new(256 * MIB);
        let mut c = Compositor::new(&mut be, settings(LayoutKind::Single, 800, 600)).unwrap();
        let old = c.screens()[0].handle;

        c.resize_window(&mut be, 1600, 900).unwrap();
        assert_ne!(c.screens()[0].handle, old);
        assert_eq!(c.phys_rect(), PixelRect::new(200, 0, 1200, 900));
    }

    // ── viewport ──────────────────────────────────────────────────────────

    #[test]
    fn layer_viewport_is_scaled_to_layer_resolution() {
        let (mut be, mut c) = dual();
        c.set_target_layer(&mut be, 0);
        be.take_commands();

        c.set_viewport(&mut be, PixelRect::new(100, 40, 200, 120));
        let vp = be.commands().iter().find_map(|cmd| match cmd {
            BackendCommand::Viewport(vp) => Some(*vp),
            _ => None,
        });
        let vp = vp.unwrap();
        assert_eq!(vp.rect, PixelRect::new(50, 20, 100, 60));
        assert_eq!((vp.scene_w, vp.scene_h), (200.0, 120.0));
    }

    #[test]
    fn viewport_offset_translates_the_view_unless_ignored() {
        let (mut be, mut c) = dual();
        c.set_target_layer(&mut be, 0);
        c.set_viewport_offset(&mut be, 16.0, -8.0);
        assert_eq!(c.view().apply(Vec2::zero()), Vec2::new(16.0, -8.0));

        c.set_viewport_offset_ignore(&mut be, true);
        assert!(c.view().is_identity());
    }

    // ── coordinate mapping ────────────────────────────────────────────────

    #[test]
    fn mapping_round_trips_unswapped_and_swapped() {
        let (mut be, mut c) = dual();
        let points = [Vec2::new(0.0, 0.0), Vec2::new(123.0, 77.0), Vec2::new(319.0, 239.0)];

        for p in points {
            let back = c.map_from_screen(c.map_to_screen(p));
            assert!(back.distance(p) < 1e-3, "{p:?} -> {back:?}");
        }
        // Bottom-screen x=0 sits 40px into the top screen.
        assert_eq!(c.map_to_screen(Vec2::zero()), Vec2::new(80.0, 0.0));

        c.set_swap_requested(true);
        c.update_phys_coords(&mut be, 800, 480).unwrap();
        for p in points {
            let back = c.map_from_screen(c.map_to_screen(p));
            assert!(back.distance(p) < 1e-3, "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn screen_regions_follow_the_layout() {
        let (_be, c) = dual();
        assert_eq!(c.screen_region(ScreenId::Main), Some(Rect::new(0.0, 0.0, 1.0, 0.5)));
        let sub = c.screen_region(ScreenId::Sub).unwrap();
        for (got, want) in [(sub.x(), 0.1), (sub.y(), 0.5), (sub.w(), 0.8), (sub.h(), 0.5)] {
            assert!((got - want).abs() < 1e-6, "{sub:?}");
        }

        let mut be = HeadlessBackend::new(256 * MIB);
        let single = Compositor::new(&mut be, settings(LayoutKind::Single, 800, 600)).unwrap();
        assert_eq!(single.screen_region(ScreenId::Main), Some(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(single.screen_region(ScreenId::Sub), None);
    }

    #[test]
    fn editor_mapping_doubles() {
        let (_be, mut c) = dual();
        c.set_ui(UiContext { level_editor: true, magic_hand: false, editor_screen_active: true });
        assert_eq!(c.map_to_screen(Vec2::new(10.0, 20.0)), Vec2::new(20.0, 40.0));
        assert_eq!(c.map_from_screen(Vec2::new(20.0, 40.0)), Vec2::new(10.0, 20.0));
    }

    // ── drawing ───────────────────────────────────────────────────────────

    fn textures(source: MemoryImageSource) -> TextureManager {
        TextureManager::new(Box::new(source), TextureSettings::default())
    }

    #[test]
    fn draw_splits_tall_pictures_across_backing_textures() {
        let (mut be, mut c) = dual();
        let mut tm = textures(
            MemoryImageSource::new().with_image("bg.png", ImageData::solid(64, 3000, [0, 0, 0, 255])),
        );
        let id = tm.lazy_load_picture("bg.png", None, None);

        c.draw_texture(
            &mut be,
            &mut tm,
            id,
            &DrawParams::new(Rect::new(0.0, 0.0, 64.0, 200.0)).with_src(Rect::new(0.0, 1000.0, 64.0, 200.0)),
        );

        let draws = be.draws();
        assert_eq!(draws.len(), 2);
        let backing = tm.get(id).unwrap().textures();
        assert_eq!(draws[0].source, DrawSource::Texture(backing[0].unwrap()));
        assert_eq!(draws[1].source, DrawSource::Texture(backing[1].unwrap()));
        assert_eq!(draws[0].dst.h() + draws[1].dst.h(), 200.0);
        assert_eq!(c.current_target(), Some(TargetKind::Layer(0)));
    }

    #[test]
    fn rotated_draw_pivots_and_restores_the_view() {
        let (mut be, mut c) = dual();
        let mut tm = textures(MemoryImageSource::new().with_image("a.png", ImageData::solid(8, 8, [255; 4])));
        let id = tm.load(&mut be, "a.png", None, None);

        c.set_target_layer(&mut be, 1);
        let before = c.view();
        c.draw_texture(
            &mut be,
            &mut tm,
            id,
            &DrawParams::new(Rect::new(100.0, 50.0, 8.0, 8.0)).rotated(90.0, None),
        );

        let draw = be.draws()[0];
        assert_eq!(draw.dst, Rect::new(-4.0, -4.0, 8.0, 8.0));
        let centre = draw.transform.apply(Vec2::zero());
        assert!(centre.distance(Vec2::new(104.0, 54.0)) < 1e-4);
        assert_eq!(c.view(), before);
    }

    #[test]
    fn failed_pictures_are_not_drawn() {
        let (mut be, mut c) = dual();
        let mut tm = textures(MemoryImageSource::new());
        let id = tm.load(&mut be, "missing.png", None, None);

        c.draw_texture(&mut be, &mut tm, id, &DrawParams::new(Rect::new(0.0, 0.0, 8.0, 8.0)));
        assert!(be.draws().is_empty());
        assert!(!c.frame_state().in_frame);
    }

    #[test]
    fn outline_rect_is_four_edges() {
        let (mut be, mut c) = dual();
        c.draw_rect(&mut be, Rect::new(0.0, 0.0, 10.0, 10.0), ColorRgba::white(), false);
        c.draw_rect(&mut be, Rect::new(0.0, 0.0, 10.0, 10.0), ColorRgba::white(), true);
        assert_eq!(count(&be, |cmd| matches!(cmd, BackendCommand::Fill { .. })), 5);
    }
}
