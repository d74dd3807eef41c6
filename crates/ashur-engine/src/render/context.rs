use std::path::Path;

use log::info;

use crate::config::EngineConfig;
use crate::coords::{ColorRgba, Rect, Vec2};
use crate::device::{BackendError, RenderBackend};
use crate::texture::{ImageSource, PictureId, TextureManager, TextureSettings};

use super::compositor::{Compositor, CompositorSettings, DrawParams};

/// Everything needed to bring up a [`RendererContext`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RendererSettings {
    pub compositor: CompositorSettings,
    pub textures: TextureSettings,
}

impl RendererSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            compositor: CompositorSettings {
                layout: config.screen.layout,
                screen_w: config.screen.width,
                screen_h: config.screen.height,
                window_w: config.window.width,
                window_h: config.window.height,
                max_3d_offset: config.screen.max_3d_offset,
                swap_screens: config.screen.swap_screens,
            },
            textures: TextureSettings {
                max_texture_rows: config.textures.max_texture_rows,
                low_water_bytes: config.textures.low_water_bytes,
            },
        }
    }
}

/// Owns the backend, the picture registry and the compositor for the
/// lifetime of a renderer.
///
/// Created by [`new`](Self::new) and torn down by [`quit`](Self::quit)
/// (also run on drop).
pub struct RendererContext {
    backend: Box<dyn RenderBackend>,
    textures: TextureManager,
    compositor: Compositor,
    running: bool,
}

impl RendererContext {
    pub fn new(
        mut backend: Box<dyn RenderBackend>,
        source: Box<dyn ImageSource>,
        settings: RendererSettings,
    ) -> Result<Self, BackendError> {
        let compositor = Compositor::new(backend.as_mut(), settings.compositor)?;
        let textures = TextureManager::new(source, settings.textures);

        info!(
            "renderer up on {}: {} bytes of video memory free",
            backend.name(),
            backend.free_memory()
        );

        Ok(Self {
            backend,
            textures,
            compositor,
            running: true,
        })
    }

    /// Releases every picture and target. Later calls do nothing.
    pub fn quit(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.textures.clear_all(self.backend.as_mut());
        self.textures.set_active(false);
        self.compositor.destroy(self.backend.as_mut());
        info!("renderer shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ── parts ─────────────────────────────────────────────────────────────

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Split borrow for callers that drive the parts directly.
    pub fn parts(&mut self) -> (&mut dyn RenderBackend, &mut TextureManager, &mut Compositor) {
        (self.backend.as_mut(), &mut self.textures, &mut self.compositor)
    }

    // ── pictures ──────────────────────────────────────────────────────────

    pub fn load_picture(&mut self, path: impl AsRef<Path>) -> PictureId {
        self.textures.load(self.backend.as_mut(), path, None, None)
    }

    pub fn lazy_load_picture(&mut self, path: impl AsRef<Path>) -> PictureId {
        self.textures.lazy_load_picture(path, None, None)
    }

    pub fn lazy_unload(&mut self, id: PictureId) {
        self.textures.lazy_unload(self.backend.as_mut(), id);
    }

    pub fn delete_texture(&mut self, id: PictureId) {
        self.textures.delete_texture(self.backend.as_mut(), id, false);
    }

    // ── frame ─────────────────────────────────────────────────────────────

    pub fn set_target_layer(&mut self, layer: usize) {
        self.compositor.set_target_layer(self.backend.as_mut(), layer);
    }

    pub fn set_target_main_screen(&mut self) {
        self.compositor.set_target_main_screen(self.backend.as_mut());
    }

    pub fn set_target_sub_screen(&mut self) {
        self.compositor.set_target_sub_screen(self.backend.as_mut());
    }

    pub fn set_target_texture(&mut self) {
        self.compositor.set_target_texture(self.backend.as_mut());
    }

    pub fn draw_texture(&mut self, picture: PictureId, params: &DrawParams) {
        self.compositor
            .draw_texture(self.backend.as_mut(), &mut self.textures, picture, params);
    }

    pub fn draw_rect(&mut self, rect: Rect, color: ColorRgba, filled: bool) {
        self.compositor.draw_rect(self.backend.as_mut(), rect, color, filled);
    }

    pub fn present(&mut self) -> Result<(), BackendError> {
        self.compositor.present(self.backend.as_mut())
    }

    pub fn clear_buffer(&mut self) -> Result<(), BackendError> {
        self.compositor.clear_buffer(self.backend.as_mut())
    }

    pub fn resize_window(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.compositor.resize_window(self.backend.as_mut(), width, height)
    }

    pub fn update_phys_coords(&mut self, screen_w: u32, screen_h: u32) -> Result<(), BackendError> {
        self.compositor
            .update_phys_coords(self.backend.as_mut(), screen_w, screen_h)
    }

    pub fn map_to_screen(&self, p: Vec2) -> Vec2 {
        self.compositor.map_to_screen(p)
    }

    pub fn map_from_screen(&self, p: Vec2) -> Vec2 {
        self.compositor.map_from_screen(p)
    }
}

impl Drop for RendererContext {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessBackend, ImageData};
    use crate::render::LayoutKind;
    use crate::texture::{LoadState, MemoryImageSource};

    fn context(source: MemoryImageSource) -> RendererContext {
        let mut config = EngineConfig::default();
        config.screen.layout = LayoutKind::Dual;
        config.screen.width = 800;
        config.screen.height = 480;
        RendererContext::new(
            Box::new(HeadlessBackend::new(64 * 1024 * 1024)),
            Box::new(source),
            RendererSettings::from_config(&config),
        )
        .unwrap()
    }

    #[test]
    fn settings_follow_config() {
        let mut config = EngineConfig::default();
        config.textures.low_water_bytes = 1234;
        config.screen.swap_screens = true;
        let s = RendererSettings::from_config(&config);
        assert_eq!(s.textures.low_water_bytes, 1234);
        assert!(s.compositor.swap_screens);
        assert_eq!(s.compositor.layout, config.screen.layout);
    }

    #[test]
    fn quit_releases_everything_once() {
        let mut ctx = context(MemoryImageSource::new().with_image("a.png", ImageData::solid(16, 16, [255; 4])));
        let before = ctx.backend().free_memory();
        let id = ctx.load_picture("a.png");
        assert_eq!(ctx.textures().get(id).map(|p| p.state()), Some(LoadState::Loaded));
        assert!(ctx.backend().free_memory() < before);

        ctx.quit();
        assert!(!ctx.is_running());
        assert_eq!(ctx.textures().loaded_count(), 0);
        assert_eq!(ctx.backend().free_memory(), 64 * 1024 * 1024);
        ctx.quit();
    }

    #[test]
    fn a_frame_round_trip_presents_once() {
        let mut ctx = context(MemoryImageSource::new().with_image("a.png", ImageData::solid(16, 16, [255; 4])));
        let id = ctx.lazy_load_picture("a.png");
        ctx.set_target_layer(1);
        ctx.draw_texture(id, &DrawParams::new(Rect::new(0.0, 0.0, 16.0, 16.0)));
        ctx.present().unwrap();

        assert_eq!(ctx.compositor().frame_state().frame_counter, 1);
        assert!(ctx.textures().get(id).is_some_and(|p| p.is_loaded()));
    }
}
