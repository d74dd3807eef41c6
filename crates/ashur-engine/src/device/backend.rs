use crate::coords::{ColorRgba, Flip, PixelRect, Rect, Transform2D};

use super::{BackendError, ImageData};

/// Opaque handle to an uploaded picture texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureHandle(pub(crate) u32);

/// Opaque handle to an offscreen render target (layer or screen buffer).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TargetHandle(pub(crate) u32);

/// Where the backend's viewport Y axis starts.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewportOrigin {
    /// wgpu / D3D / Metal convention.
    TopLeft,
    /// GL-style; rows count up from the bottom of the buffer.
    BottomLeft,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Static capabilities reported by a backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BackendLimits {
    /// Largest texture edge the device accepts.
    pub max_texture_size: u32,
    /// Largest texture height used for picture storage; taller pictures are
    /// spread across up to three textures.
    pub max_texture_rows: u32,
    pub viewport_origin: ViewportOrigin,
}

/// Offscreen target creation parameters.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TargetDesc {
    pub label: String,
    /// Physical buffer size.
    pub width: u32,
    pub height: u32,
    /// Buffer is mounted 90° relative to the display it feeds.
    pub rotated: bool,
    /// Request a depth/stencil attachment alongside the color buffer.
    pub depth_stencil: bool,
}

impl TargetDesc {
    #[inline]
    pub fn byte_len(&self) -> u64 {
        let color = self.width as u64 * self.height as u64 * 4;
        if self.depth_stencil { color * 2 } else { color }
    }
}

/// Hardware viewport for the bound target.
///
/// `rect` is in buffer pixels using the backend's [`ViewportOrigin`] (rotated
/// targets always use top-left). Scene coordinates `0..scene_w × 0..scene_h`
/// span the rectangle; for rotated targets scene X runs down the buffer and
/// scene Y runs right-to-left.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HwViewport {
    pub rect: PixelRect,
    pub scene_w: f32,
    pub scene_h: f32,
    pub rotated: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawSource {
    Texture(TextureHandle),
    Target(TargetHandle),
}

/// One textured quad submission.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawImage {
    pub source: DrawSource,
    /// Destination in scene units, before `transform`.
    pub dst: Rect,
    /// Source region in texels of `source`.
    pub src: Rect,
    pub flip: Flip,
    pub tint: ColorRgba,
    pub transform: Transform2D,
}

/// Where a screen buffer appears in the presentation surface.
///
/// `region` is normalized to `0..1` of the window; rotated buffers are turned
/// upright when blitted.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenPlacement {
    pub target: TargetHandle,
    pub region: Rect,
    pub rotated: bool,
}

/// GPU abstraction consumed by the texture manager and compositor.
///
/// All calls happen on the render thread. Draw calls are only valid between
/// `begin_frame` and `end_frame` with a target bound.
pub trait RenderBackend {
    fn name(&self) -> &'static str;

    fn limits(&self) -> BackendLimits;

    /// Bytes of video memory still available for allocations.
    fn free_memory(&self) -> u64;

    fn create_texture(
        &mut self,
        image: &ImageData,
        filter: TextureFilter,
    ) -> Result<TextureHandle, BackendError>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetHandle, BackendError>;

    fn destroy_target(&mut self, target: TargetHandle);

    fn set_target_filter(&mut self, target: TargetHandle, filter: TextureFilter);

    fn begin_frame(&mut self);

    fn bind_target(&mut self, target: TargetHandle);

    fn clear(&mut self, target: TargetHandle, color: ColorRgba);

    fn set_viewport(&mut self, viewport: HwViewport);

    fn draw_image(&mut self, draw: &DrawImage);

    fn fill_rect(&mut self, rect: Rect, color: ColorRgba, transform: Transform2D);

    /// Flushes the frame and shows `placements` on the output surface.
    fn end_frame(&mut self, placements: &[ScreenPlacement]) -> Result<(), BackendError>;

    /// Notifies the backend that the presentation surface changed size.
    fn resize_surface(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }
}
