use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

use crate::coords::{ColorRgba, PixelRect, Rect, Transform2D, Vec2};

use super::projection::{scene_to_buffer, viewport_top_left};
use super::{
    BackendError, BackendLimits, DrawImage, DrawSource, Gpu, HwViewport, ImageData,
    RenderBackend, ScreenPlacement, SurfaceErrorAction, TargetDesc, TargetHandle,
    TextureFilter, TextureHandle, ViewportOrigin, VramLedger,
};

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SpriteVertex {
    pos: [f32; 2],
    uv: [f32; 2],
    color: [f32; 4],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos (NDC)
        1 => Float32x2, // uv
        2 => Float32x4  // tint
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

struct GpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    bytes: u64,
}

struct GpuTarget {
    image: GpuImage,
    desc: TargetDesc,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SourceKey {
    Texture(u32),
    Target(u32),
    White,
}

#[derive(Debug, Copy, Clone)]
enum Op {
    Clear {
        target: u32,
        color: wgpu::Color,
    },
    Quads {
        target: u32,
        source: SourceKey,
        first: u32,
        count: u32,
        scissor: (u32, u32, u32, u32),
    },
}

impl Op {
    fn target(&self) -> u32 {
        match *self {
            Op::Clear { target, .. } | Op::Quads { target, .. } => target,
        }
    }
}

struct Pipelines {
    layout: wgpu::BindGroupLayout,
    /// Straight-alpha pictures into offscreen targets.
    offscreen_straight: wgpu::RenderPipeline,
    /// Premultiplied layer contents into offscreen targets.
    offscreen_premul: wgpu::RenderPipeline,
    /// Screen buffers onto the window surface.
    surface: wgpu::RenderPipeline,
}

/// Records drawing for the current frame; flushed in `end_frame`.
#[derive(Default)]
struct FrameRecording {
    ops: Vec<Op>,
    vertices: Vec<SpriteVertex>,
    bound: Option<u32>,
    viewport: Option<HwViewport>,
}

/// wgpu implementation of [`RenderBackend`].
///
/// Pictures, layers and screen buffers are all offscreen `Rgba8Unorm`
/// textures. Quads are projected on the CPU into one vertex buffer per frame;
/// `end_frame` replays the recorded passes and blits screen buffers onto the
/// window surface. Depth/stencil requests are accounted for but not allocated,
/// since 2D draws never test depth.
pub struct WgpuBackend {
    gpu: Gpu,
    ledger: VramLedger,
    max_texture_rows: u32,
    next_id: u32,
    textures: HashMap<u32, GpuImage>,
    targets: HashMap<u32, GpuTarget>,
    pipelines: Pipelines,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
    white: GpuImage,
    frame: FrameRecording,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    warned_self_sample: bool,
}

impl WgpuBackend {
    pub fn new(gpu: Gpu, video_budget: u64, max_texture_rows: u32) -> Self {
        let device = gpu.device();
        let pipelines = create_pipelines(device, gpu.surface_format());

        let nearest = create_sampler(device, TextureFilter::Nearest);
        let linear = create_sampler(device, TextureFilter::Linear);

        let white = upload_image(
            &gpu,
            &pipelines.layout,
            &nearest,
            &ImageData::solid(1, 1, [255; 4]),
            "ashur white texel",
        );

        let max_size = device.limits().max_texture_dimension_2d;

        Self {
            ledger: VramLedger::new(video_budget),
            max_texture_rows: max_texture_rows.min(max_size),
            next_id: 1,
            textures: HashMap::new(),
            targets: HashMap::new(),
            pipelines,
            nearest,
            linear,
            white,
            frame: FrameRecording::default(),
            vertex_buffer: None,
            vertex_capacity: 0,
            warned_self_sample: false,
            gpu,
        }
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    fn sampler(&self, filter: TextureFilter) -> &wgpu::Sampler {
        match filter {
            TextureFilter::Nearest => &self.nearest,
            TextureFilter::Linear => &self.linear,
        }
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn bound_target(&self) -> Option<&GpuTarget> {
        self.frame.bound.and_then(|id| self.targets.get(&id))
    }

    fn current_viewport(&self, target: &GpuTarget) -> HwViewport {
        self.frame.viewport.unwrap_or(HwViewport {
            rect: PixelRect::new(0, 0, target.desc.width as i32, target.desc.height as i32),
            scene_w: target.desc.width as f32,
            scene_h: target.desc.height as f32,
            rotated: false,
        })
    }

    fn source_size(&self, source: SourceKey) -> Option<(u32, u32)> {
        match source {
            SourceKey::Texture(id) => self.textures.get(&id).map(|t| (t.width, t.height)),
            SourceKey::Target(id) => self
                .targets
                .get(&id)
                .map(|t| (t.image.width, t.image.height)),
            SourceKey::White => Some((1, 1)),
        }
    }

    fn bind_group(&self, source: SourceKey) -> Option<&wgpu::BindGroup> {
        match source {
            SourceKey::Texture(id) => self.textures.get(&id).map(|t| &t.bind_group),
            SourceKey::Target(id) => self.targets.get(&id).map(|t| &t.image.bind_group),
            SourceKey::White => Some(&self.white.bind_group),
        }
    }

    /// Projects a quad into the bound target and appends a draw op.
    fn push_quad(&mut self, source: SourceKey, dst: Rect, uv: [f32; 4], tint: ColorRgba, transform: Transform2D) {
        let Some(target_id) = self.frame.bound else {
            log::debug!("draw without a bound target ignored");
            return;
        };
        let (vp, buffer_h, fb_w, fb_h) = {
            let Some(target) = self.bound_target() else { return };
            let d = &target.desc;
            (self.current_viewport(target), d.height, d.width as f32, d.height as f32)
        };

        let scissor = {
            let r = viewport_top_left(&vp, buffer_h, ViewportOrigin::TopLeft);
            let x0 = r.x().clamp(0.0, fb_w) as u32;
            let y0 = r.y().clamp(0.0, fb_h) as u32;
            let x1 = (r.x() + r.w()).clamp(0.0, fb_w) as u32;
            let y1 = (r.y() + r.h()).clamp(0.0, fb_h) as u32;
            (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
        };
        if scissor.2 == 0 || scissor.3 == 0 {
            return;
        }

        let corners = [
            Vec2::new(dst.x(), dst.y()),
            Vec2::new(dst.x() + dst.w(), dst.y()),
            Vec2::new(dst.x() + dst.w(), dst.y() + dst.h()),
            Vec2::new(dst.x(), dst.y() + dst.h()),
        ];
        let [u0, v0, u1, v1] = uv;
        let uvs = [[u0, v0], [u1, v0], [u1, v1], [u0, v1]];
        let color = [tint.r, tint.g, tint.b, tint.a];

        let ndc = corners.map(|p| {
            let b = scene_to_buffer(transform.apply(p), &vp, buffer_h, ViewportOrigin::TopLeft);
            [b.x / fb_w * 2.0 - 1.0, 1.0 - b.y / fb_h * 2.0]
        });

        let first = self.frame.vertices.len() as u32;
        for i in [0usize, 1, 2, 0, 2, 3] {
            self.frame.vertices.push(SpriteVertex {
                pos: ndc[i],
                uv: uvs[i],
                color,
            });
        }

        // Extend the previous op when it uses the same source and clip.
        if let Some(Op::Quads { target, source: s, count, scissor: sc, .. }) = self.frame.ops.last_mut() {
            if *target == target_id && *s == source && *sc == scissor {
                *count += 6;
                return;
            }
        }
        self.frame.ops.push(Op::Quads {
            target: target_id,
            source,
            first,
            count: 6,
            scissor,
        });
    }

    fn ensure_vertex_capacity(&mut self, required: usize) {
        if required <= self.vertex_capacity && self.vertex_buffer.is_some() {
            return;
        }
        let cap = required.next_power_of_two().max(1024);
        self.vertex_buffer = Some(self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("ashur sprite vbo"),
            size: (cap * std::mem::size_of::<SpriteVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = cap;
    }

    fn encode_offscreen(&self, encoder: &mut wgpu::CommandEncoder, vbo: &wgpu::Buffer) {
        let ops = &self.frame.ops;
        let mut i = 0;
        while i < ops.len() {
            let target_id = ops[i].target();
            let (load, start) = match ops[i] {
                Op::Clear { color, .. } => (wgpu::LoadOp::Clear(color), i + 1),
                Op::Quads { .. } => (wgpu::LoadOp::Load, i),
            };
            let mut end = start;
            while end < ops.len()
                && matches!(ops[end], Op::Quads { target, .. } if target == target_id)
            {
                end += 1;
            }
            i = end;

            let Some(target) = self.targets.get(&target_id) else { continue };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ashur offscreen pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.image.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_vertex_buffer(0, vbo.slice(..));

            for op in &ops[start..end] {
                let Op::Quads { source, first, count, scissor, .. } = *op else { continue };
                let Some(bg) = self.bind_group(source) else { continue };
                let pipeline = match source {
                    SourceKey::Target(_) => &self.pipelines.offscreen_premul,
                    _ => &self.pipelines.offscreen_straight,
                };
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, bg, &[]);
                rpass.set_scissor_rect(scissor.0, scissor.1, scissor.2, scissor.3);
                rpass.draw(first..first + count, 0..1);
            }
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn limits(&self) -> BackendLimits {
        BackendLimits {
            max_texture_size: self.gpu.device().limits().max_texture_dimension_2d,
            max_texture_rows: self.max_texture_rows,
            viewport_origin: ViewportOrigin::TopLeft,
        }
    }

    fn free_memory(&self) -> u64 {
        self.ledger.free()
    }

    fn create_texture(
        &mut self,
        image: &ImageData,
        filter: TextureFilter,
    ) -> Result<TextureHandle, BackendError> {
        if !image.is_consistent() {
            return Err(BackendError::BadImageData {
                expected: image.byte_len() as usize,
                actual: image.pixels.len(),
            });
        }
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if image.width == 0 || image.height == 0 || image.width > max || image.height > max {
            return Err(BackendError::TooLarge {
                width: image.width,
                height: image.height,
                max,
            });
        }

        self.ledger.reserve(image.byte_len())?;

        let gpu_image = upload_image(
            &self.gpu,
            &self.pipelines.layout,
            self.sampler(filter),
            image,
            "ashur picture",
        );
        let id = self.alloc_id();
        self.textures.insert(id, gpu_image);
        Ok(TextureHandle(id))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(t) = self.textures.remove(&texture.0) {
            self.ledger.release(t.bytes);
            t.texture.destroy();
        }
    }

    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetHandle, BackendError> {
        self.ledger.reserve(desc.byte_len())?;

        let device = self.gpu.device();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = create_bind_group(device, &self.pipelines.layout, &view, &self.nearest);

        let id = self.alloc_id();
        self.targets.insert(
            id,
            GpuTarget {
                image: GpuImage {
                    texture,
                    view,
                    bind_group,
                    width: desc.width,
                    height: desc.height,
                    bytes: desc.byte_len(),
                },
                desc: desc.clone(),
            },
        );
        Ok(TargetHandle(id))
    }

    fn destroy_target(&mut self, target: TargetHandle) {
        if let Some(t) = self.targets.remove(&target.0) {
            self.ledger.release(t.image.bytes);
            t.image.texture.destroy();
        }
        if self.frame.bound == Some(target.0) {
            self.frame.bound = None;
        }
    }

    fn set_target_filter(&mut self, target: TargetHandle, filter: TextureFilter) {
        let sampler = match filter {
            TextureFilter::Nearest => &self.nearest,
            TextureFilter::Linear => &self.linear,
        };
        if let Some(t) = self.targets.get_mut(&target.0) {
            t.image.bind_group =
                create_bind_group(self.gpu.device(), &self.pipelines.layout, &t.image.view, sampler);
        }
    }

    fn begin_frame(&mut self) {
        self.frame = FrameRecording::default();
    }

    fn bind_target(&mut self, target: TargetHandle) {
        self.frame.bound = Some(target.0);
        self.frame.viewport = None;
    }

    fn clear(&mut self, target: TargetHandle, color: ColorRgba) {
        self.frame.ops.push(Op::Clear {
            target: target.0,
            color: color.to_wgpu(),
        });
    }

    fn set_viewport(&mut self, viewport: HwViewport) {
        self.frame.viewport = Some(viewport);
    }

    fn draw_image(&mut self, draw: &DrawImage) {
        let source = match draw.source {
            DrawSource::Texture(t) => SourceKey::Texture(t.0),
            DrawSource::Target(t) => {
                if self.frame.bound == Some(t.0) {
                    if !self.warned_self_sample {
                        log::warn!("target sampled while bound; draw skipped");
                        self.warned_self_sample = true;
                    }
                    return;
                }
                SourceKey::Target(t.0)
            }
        };
        let Some((w, h)) = self.source_size(source) else {
            log::debug!("draw from a released texture skipped");
            return;
        };

        let (w, h) = (w.max(1) as f32, h.max(1) as f32);
        let mut u0 = draw.src.x() / w;
        let mut u1 = (draw.src.x() + draw.src.w()) / w;
        let mut v0 = draw.src.y() / h;
        let mut v1 = (draw.src.y() + draw.src.h()) / h;
        if draw.flip.horizontal() {
            std::mem::swap(&mut u0, &mut u1);
        }
        if draw.flip.vertical() {
            std::mem::swap(&mut v0, &mut v1);
        }

        self.push_quad(source, draw.dst, [u0, v0, u1, v1], draw.tint, draw.transform);
    }

    fn fill_rect(&mut self, rect: Rect, color: ColorRgba, transform: Transform2D) {
        self.push_quad(SourceKey::White, rect, [0.0, 0.0, 1.0, 1.0], color, transform);
    }

    fn end_frame(&mut self, placements: &[ScreenPlacement]) -> Result<(), BackendError> {
        // Screen blits go after the offscreen geometry.
        let mut blits = Vec::with_capacity(placements.len());
        for p in placements {
            if !self.targets.contains_key(&p.target.0) {
                continue;
            }
            let r = p.region;
            let (x0, y0) = (r.x() * 2.0 - 1.0, 1.0 - r.y() * 2.0);
            let (x1, y1) = ((r.x() + r.w()) * 2.0 - 1.0, 1.0 - (r.y() + r.h()) * 2.0);
            let pos = [[x0, y0], [x1, y0], [x1, y1], [x0, y1]];
            let uv = if p.rotated {
                [[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]
            } else {
                [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            };
            let first = self.frame.vertices.len() as u32;
            for i in [0usize, 1, 2, 0, 2, 3] {
                self.frame.vertices.push(SpriteVertex {
                    pos: pos[i],
                    uv: uv[i],
                    color: [1.0; 4],
                });
            }
            blits.push((p.target.0, first));
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                self.frame = FrameRecording::default();
                return match action {
                    SurfaceErrorAction::Fatal => Err(BackendError::Surface(action)),
                    _ => Ok(()),
                };
            }
        };

        let vertex_count = self.frame.vertices.len();
        self.ensure_vertex_capacity(vertex_count.max(1));
        let Some(vbo) = self.vertex_buffer.as_ref() else {
            return Ok(());
        };
        if vertex_count > 0 {
            self.gpu
                .queue()
                .write_buffer(vbo, 0, bytemuck::cast_slice(&self.frame.vertices));
        }

        self.encode_offscreen(&mut frame.encoder, vbo);

        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ashur present pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(&self.pipelines.surface);
            rpass.set_vertex_buffer(0, vbo.slice(..));
            for (target, first) in blits {
                let Some(t) = self.targets.get(&target) else { continue };
                rpass.set_bind_group(0, &t.image.bind_group, &[]);
                rpass.draw(first..first + 6, 0..1);
            }
        }

        self.gpu.submit(frame);
        self.frame = FrameRecording::default();
        Ok(())
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
    }
}

fn create_sampler(device: &wgpu::Device, filter: TextureFilter) -> wgpu::Sampler {
    let mode = match filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("ashur sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: mode,
        min_filter: mode,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("ashur sprite bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn upload_image(
    gpu: &Gpu,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    image: &ImageData,
    label: &str,
) -> GpuImage {
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    gpu.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.width * 4),
            rows_per_image: Some(image.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = create_bind_group(gpu.device(), layout, &view, sampler);

    GpuImage {
        texture,
        view,
        bind_group,
        width: image.width,
        height: image.height,
        bytes: image.byte_len(),
    }
}

fn create_pipelines(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Pipelines {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("ashur sprite shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("ashur sprite bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("ashur sprite pipeline layout"),
        bind_group_layouts: &[&layout],
        immediate_size: 0,
    });

    let build = |format: wgpu::TextureFormat, blend: wgpu::BlendState, label: &str| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SpriteVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    };

    let offscreen_straight = build(
        OFFSCREEN_FORMAT,
        wgpu::BlendState::ALPHA_BLENDING,
        "ashur sprite pipeline",
    );
    let offscreen_premul = build(
        OFFSCREEN_FORMAT,
        wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        "ashur layer composite pipeline",
    );
    let surface = build(
        surface_format,
        wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        "ashur present pipeline",
    );

    Pipelines {
        layout,
        offscreen_straight,
        offscreen_premul,
        surface,
    }
}
