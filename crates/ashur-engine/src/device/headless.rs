use std::collections::HashMap;

use crate::coords::{ColorRgba, Rect, Transform2D};

use super::{
    BackendError, BackendLimits, DrawImage, HwViewport, ImageData, RenderBackend,
    ScreenPlacement, TargetDesc, TargetHandle, TextureFilter, TextureHandle, VramLedger,
    ViewportOrigin,
};

/// Command recorded by [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    BeginFrame,
    Bind(TargetHandle),
    Clear { target: TargetHandle, color: ColorRgba },
    Viewport(HwViewport),
    Draw { target: Option<TargetHandle>, draw: DrawImage },
    Fill { target: Option<TargetHandle>, rect: Rect, color: ColorRgba, transform: Transform2D },
    EndFrame { placements: Vec<ScreenPlacement> },
}

#[derive(Debug, Clone)]
struct TextureRecord {
    width: u32,
    height: u32,
    bytes: u64,
}

#[derive(Debug, Clone)]
struct TargetRecord {
    desc: TargetDesc,
    filter: TextureFilter,
}

/// GPU-less backend that enforces a memory budget and records every command.
///
/// Drives headless runs and the test suite; nothing is rasterized.
#[derive(Debug)]
pub struct HeadlessBackend {
    limits: BackendLimits,
    ledger: VramLedger,
    next_id: u32,
    textures: HashMap<u32, TextureRecord>,
    targets: HashMap<u32, TargetRecord>,
    bound: Option<TargetHandle>,
    in_frame: bool,
    frames: u64,
    commands: Vec<BackendCommand>,
    texture_allocations: u64,
}

impl HeadlessBackend {
    pub fn new(budget: u64) -> Self {
        Self::with_limits(
            budget,
            BackendLimits {
                max_texture_size: 8192,
                max_texture_rows: 1024,
                viewport_origin: ViewportOrigin::TopLeft,
            },
        )
    }

    pub fn with_limits(budget: u64, limits: BackendLimits) -> Self {
        Self {
            limits,
            ledger: VramLedger::new(budget),
            next_id: 1,
            textures: HashMap::new(),
            targets: HashMap::new(),
            bound: None,
            in_frame: false,
            frames: 0,
            commands: Vec::new(),
            texture_allocations: 0,
        }
    }

    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Image draws recorded so far, in submission order.
    pub fn draws(&self) -> Vec<DrawImage> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::Draw { draw, .. } => Some(*draw),
                _ => None,
            })
            .collect()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    /// Total successful `create_texture` calls since construction.
    pub fn texture_allocations(&self) -> u64 {
        self.texture_allocations
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&texture.0).map(|t| (t.width, t.height))
    }

    pub fn target_desc(&self, target: TargetHandle) -> Option<&TargetDesc> {
        self.targets.get(&target.0).map(|t| &t.desc)
    }

    pub fn target_filter(&self, target: TargetHandle) -> Option<TextureFilter> {
        self.targets.get(&target.0).map(|t| t.filter)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn used_memory(&self) -> u64 {
        self.ledger.used()
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn limits(&self) -> BackendLimits {
        self.limits
    }

    fn free_memory(&self) -> u64 {
        self.ledger.free()
    }

    fn create_texture(
        &mut self,
        image: &ImageData,
        _filter: TextureFilter,
    ) -> Result<TextureHandle, BackendError> {
        if !image.is_consistent() {
            return Err(BackendError::BadImageData {
                expected: image.byte_len() as usize,
                actual: image.pixels.len(),
            });
        }
        let max = self.limits.max_texture_size;
        if image.width > max || image.height > max {
            return Err(BackendError::TooLarge {
                width: image.width,
                height: image.height,
                max,
            });
        }

        let bytes = image.byte_len();
        self.ledger.reserve(bytes)?;

        let id = self.alloc_id();
        self.textures.insert(
            id,
            TextureRecord {
                width: image.width,
                height: image.height,
                bytes,
            },
        );
        self.texture_allocations += 1;
        Ok(TextureHandle(id))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(t) = self.textures.remove(&texture.0) {
            self.ledger.release(t.bytes);
        }
    }

    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetHandle, BackendError> {
        self.ledger.reserve(desc.byte_len())?;
        let id = self.alloc_id();
        self.targets.insert(
            id,
            TargetRecord {
                desc: desc.clone(),
                filter: TextureFilter::Nearest,
            },
        );
        Ok(TargetHandle(id))
    }

    fn destroy_target(&mut self, target: TargetHandle) {
        if let Some(t) = self.targets.remove(&target.0) {
            self.ledger.release(t.desc.byte_len());
        }
        if self.bound == Some(target) {
            self.bound = None;
        }
    }

    fn set_target_filter(&mut self, target: TargetHandle, filter: TextureFilter) {
        if let Some(t) = self.targets.get_mut(&target.0) {
            t.filter = filter;
        }
    }

    fn begin_frame(&mut self) {
        debug_assert!(!self.in_frame, "begin_frame called twice");
        self.in_frame = true;
        self.commands.push(BackendCommand::BeginFrame);
    }

    fn bind_target(&mut self, target: TargetHandle) {
        self.bound = Some(target);
        self.commands.push(BackendCommand::Bind(target));
    }

    fn clear(&mut self, target: TargetHandle, color: ColorRgba) {
        self.commands.push(BackendCommand::Clear { target, color });
    }

    fn set_viewport(&mut self, viewport: HwViewport) {
        self.commands.push(BackendCommand::Viewport(viewport));
    }

    fn draw_image(&mut self, draw: &DrawImage) {
        self.commands.push(BackendCommand::Draw {
            target: self.bound,
            draw: *draw,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: ColorRgba, transform: Transform2D) {
        self.commands.push(BackendCommand::Fill {
            target: self.bound,
            rect,
            color,
            transform,
        });
    }

    fn end_frame(&mut self, placements: &[ScreenPlacement]) -> Result<(), BackendError> {
        self.in_frame = false;
        self.bound = None;
        self.frames += 1;
        self.commands.push(BackendCommand::EndFrame {
            placements: placements.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textures_are_charged_against_the_budget() {
        let mut be = HeadlessBackend::new(1000);
        let img = ImageData::solid(10, 10, [0, 0, 0, 255]);
        let t = be.create_texture(&img, TextureFilter::Nearest).unwrap();
        assert_eq!(be.free_memory(), 600);

        let err = be.create_texture(&img, TextureFilter::Nearest).unwrap_err();
        assert!(err.is_out_of_memory());

        be.destroy_texture(t);
        assert_eq!(be.free_memory(), 1000);
        assert_eq!(be.live_textures(), 0);
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let mut be = HeadlessBackend::new(u64::MAX);
        let img = ImageData::solid(1, 9000, [0; 4]);
        assert!(matches!(
            be.create_texture(&img, TextureFilter::Nearest),
            Err(BackendError::TooLarge { .. })
        ));
    }

    #[test]
    fn draws_record_the_bound_target() {
        let mut be = HeadlessBackend::new(u64::MAX);
        let target = be
            .create_target(&TargetDesc {
                label: "layer".into(),
                width: 4,
                height: 4,
                rotated: false,
                depth_stencil: true,
            })
            .unwrap();
        assert_eq!(be.used_memory(), 4 * 4 * 4 * 2);

        be.begin_frame();
        be.bind_target(target);
        be.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), ColorRgba::white(), Transform2D::IDENTITY);
        be.end_frame(&[]).unwrap();

        assert!(be.commands().iter().any(|c| matches!(
            c,
            BackendCommand::Fill { target: Some(t), .. } if *t == target
        )));
        assert_eq!(be.frames_presented(), 1);
    }
}
