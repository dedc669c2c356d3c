//! wgpu backend.
//!
//! Transparency buffers are storage buffers bound as group 1; per-draw
//! uniforms live in a dynamic-offset ring bound as group 0. Draws are
//! recorded and flushed into one render pass at each `memory_barrier` (and
//! at `end_frame`), so pass boundaries order the storage writes of one pass
//! before the reads of the next. Opaque draws go into their own
//! depth-tested pass at `end_frame`.
//!
//! Resource creation runs inside out-of-memory and validation error scopes,
//! so a rejected allocation comes back as a [`BackendError`] instead of
//! reaching the device's uncaptured-error handler.

use std::num::NonZeroU64;

use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::error::BackendError;
use crate::scene::{Geometry, Rgba, Vertex};

use super::{
    Backend, BufferId, BufferKind, DrawUniforms, GeometryId, ProgramId, ProgramKind,
    TransparencyBuffers,
};

/// Largest `write_buffer` staged by one `fill` step.
const FILL_CHUNK_WORDS: usize = 1 << 16;

/// Storage buffers the write and sort programs bind.
const REQUIRED_STORAGE_BUFFERS: u32 = 3;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

struct GpuProgram {
    kind: ProgramKind,
    pipeline: wgpu::RenderPipeline,
}

struct GpuGeometry {
    /// `None` for empty geometry; draws of it are skipped.
    buffers: Option<(wgpu::Buffer, wgpu::Buffer)>,
    index_count: u32,
}

struct PendingDraw {
    program: ProgramId,
    geometry: GeometryId,
}

struct FrameTarget {
    encoder: wgpu::CommandEncoder,
    view: wgpu::TextureView,
}

struct DepthTarget {
    view: wgpu::TextureView,
    size: (u32, u32),
}

/// Maps the errors captured by an allocation's error scopes.
fn scope_result(label: &'static str, error: Option<wgpu::Error>) -> Result<(), BackendError> {
    match error {
        None => Ok(()),
        Some(e) => Err(BackendError::Allocation {
            label,
            reason: e.to_string(),
        }),
    }
}

/// Dynamic-offset uniform buffer, rewound every frame.
struct UniformRing {
    buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    capacity: u64,
    cursor: u64,
    stride: u64,
    staging: Vec<u8>,
}

impl UniformRing {
    fn new(alignment: u32) -> Self {
        let size = std::mem::size_of::<DrawUniforms>() as u64;
        let alignment = u64::from(alignment.max(1));
        Self {
            buffer: None,
            bind_group: None,
            capacity: 0,
            cursor: 0,
            stride: size.div_ceil(alignment) * alignment,
            staging: Vec::new(),
        }
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Uploads `blocks` contiguously; returns the offset of the first one.
    ///
    /// Grows by allocating a fresh buffer, so passes already recorded this
    /// frame keep reading the old one.
    fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        blocks: &[DrawUniforms],
    ) -> Option<u64> {
        let needed = self.stride * blocks.len() as u64;
        if self.buffer.is_none() || self.cursor + needed > self.capacity {
            let capacity = needed.max(self.capacity * 2).max(self.stride * 64);
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("voxel oit uniform ring"),
                size: capacity,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("voxel oit uniform bind group"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64),
                    }),
                }],
            });
            self.buffer = Some(buffer);
            self.bind_group = Some(bind_group);
            self.capacity = capacity;
            self.cursor = 0;
        }

        let buffer = self.buffer.as_ref()?;
        self.staging.clear();
        self.staging.resize(needed as usize, 0);
        for (i, block) in blocks.iter().enumerate() {
            let at = i * self.stride as usize;
            let bytes = bytemuck::bytes_of(block);
            self.staging[at..at + bytes.len()].copy_from_slice(bytes);
        }

        let base = self.cursor;
        queue.write_buffer(buffer, base, &self.staging);
        self.cursor += needed;
        Some(base)
    }
}

/// Backend drawing through a wgpu device into a host-provided target.
///
/// Per frame, the host calls [`WgpuBackend::set_target`] before the renderer
/// displays and [`WgpuBackend::take_encoder`] afterwards to submit.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    limits: wgpu::Limits,
    viewport: (u32, u32),

    shader: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    transparency_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    opaque_layout: wgpu::PipelineLayout,

    buffers: SlotMap<BufferId, GpuBuffer>,
    programs: SlotMap<ProgramId, GpuProgram>,
    geometries: SlotMap<GeometryId, GpuGeometry>,

    transparency: Option<wgpu::BindGroup>,
    uniforms: UniformRing,
    bound: Option<ProgramId>,
    pending: Vec<PendingDraw>,
    pending_uniforms: Vec<DrawUniforms>,

    opaque_pipeline: Option<wgpu::RenderPipeline>,
    opaque_pending: Vec<GeometryId>,
    opaque_uniforms: Vec<DrawUniforms>,
    depth: Option<DepthTarget>,

    target: Option<FrameTarget>,
    background: Rgba,
    cleared: bool,
    fill_scratch: Vec<u32>,
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        let limits = device.limits();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("voxel oit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("oit.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("voxel oit uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64),
                },
                count: None,
            }],
        });

        let storage = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let transparency_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("voxel oit transparency bgl"),
            entries: &[storage(0), storage(1), storage(2)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxel oit pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &transparency_layout],
            immediate_size: 0,
        });
        let opaque_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxel opaque pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            immediate_size: 0,
        });

        Self {
            device: device.clone(),
            queue: queue.clone(),
            surface_format,
            uniforms: UniformRing::new(limits.min_uniform_buffer_offset_alignment),
            limits,
            viewport: (0, 0),
            shader,
            uniform_layout,
            transparency_layout,
            pipeline_layout,
            opaque_layout,
            buffers: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            transparency: None,
            bound: None,
            pending: Vec::new(),
            pending_uniforms: Vec::new(),
            opaque_pipeline: None,
            opaque_pending: Vec::new(),
            opaque_uniforms: Vec::new(),
            depth: None,
            target: None,
            background: Rgba::BLACK,
            cleared: false,
            fill_scratch: Vec::new(),
        }
    }

    /// Sets the encoder and color view the next frame records into.
    pub fn set_target(&mut self, encoder: wgpu::CommandEncoder, view: wgpu::TextureView) {
        self.target = Some(FrameTarget { encoder, view });
    }

    /// Returns the encoder of the finished frame, ready for submission.
    pub fn take_encoder(&mut self) -> Option<wgpu::CommandEncoder> {
        self.target.take().map(|t| t.encoder)
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    #[inline]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Largest single storage buffer the device can bind.
    fn max_storage_bytes(&self) -> u64 {
        self.limits
            .max_buffer_size
            .min(u64::from(self.limits.max_storage_buffer_binding_size))
    }

    /// Runs `create` inside out-of-memory and validation error scopes.
    ///
    /// Scopes are popped in reverse order and resolved on this thread; the
    /// created value is dropped when either scope caught an error.
    fn scoped<T>(&self, label: &'static str, create: impl FnOnce() -> T) -> Result<T, BackendError> {
        let oom = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create();
        let validation = pollster::block_on(validation.pop());
        let oom = pollster::block_on(oom.pop());

        if let Some(e) = &oom {
            log::error!("{label}: out of device memory: {e}");
        }
        scope_result(label, oom.or(validation))?;
        Ok(value)
    }

    fn build_pipeline(&self, kind: ProgramKind) -> wgpu::RenderPipeline {
        let (label, vs, fs, write_mask) = match kind {
            ProgramKind::VolumeWrite => ("voxel oit volume write", "vs_world", "fs_volume_write", wgpu::ColorWrites::empty()),
            ProgramKind::MeshWrite => ("voxel oit mesh write", "vs_world", "fs_mesh_write", wgpu::ColorWrites::empty()),
            ProgramKind::Sort => ("voxel oit sort", "vs_screen", "fs_sort", wgpu::ColorWrites::ALL),
        };
        self.pipeline(label, &self.pipeline_layout, vs, fs, write_mask, None)
    }

    /// Depth-tested pipeline drawing actors without the transparency buffers.
    fn build_opaque_pipeline(&self) -> wgpu::RenderPipeline {
        let depth = wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };
        self.pipeline(
            "voxel opaque",
            &self.opaque_layout,
            "vs_world",
            "fs_opaque",
            wgpu::ColorWrites::ALL,
            Some(depth),
        )
    }

    fn pipeline(
        &self,
        label: &'static str,
        layout: &wgpu::PipelineLayout,
        vs: &'static str,
        fs: &'static str,
        write_mask: wgpu::ColorWrites,
        depth_stencil: Option<wgpu::DepthStencilState>,
    ) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),

            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some(vs),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            // Write programs only touch storage buffers; the color target
            // is attached to give the pass its size.
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(fs),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: None,
                    write_mask,
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

            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    /// Records every pending draw into one render pass.
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let draws = std::mem::take(&mut self.pending);
        let blocks = std::mem::take(&mut self.pending_uniforms);

        let Some(target) = self.target.as_mut() else {
            log::debug!("dropping {} draws recorded without a render target", draws.len());
            return;
        };
        let Some(transparency) = self.transparency.as_ref() else {
            log::debug!("dropping {} draws: transparency buffers detached", draws.len());
            return;
        };
        let Some(base) = self.uniforms.upload(&self.device, &self.queue, &self.uniform_layout, &blocks) else {
            return;
        };
        let Some(uniform_group) = self.uniforms.bind_group.as_ref() else { return };
        let stride = self.uniforms.stride;

        let load = if self.cleared {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(self.background.clamped().to_wgpu())
        };
        self.cleared = true;

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("voxel oit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
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

        rpass.set_bind_group(1, transparency, &[]);

        for (i, draw) in draws.iter().enumerate() {
            let Some(program) = self.programs.get(draw.program) else { continue };
            let Some(geometry) = self.geometries.get(draw.geometry) else { continue };
            let Some((vbo, ibo)) = geometry.buffers.as_ref() else { continue };
            let Ok(offset) = u32::try_from(base + i as u64 * stride) else { continue };

            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, uniform_group, &[offset]);
            rpass.set_vertex_buffer(0, vbo.slice(..));
            rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..geometry.index_count, 0, 0..1);
        }
    }

    /// (Re)creates the depth attachment at the current viewport size.
    fn ensure_depth(&mut self) -> Result<(), BackendError> {
        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            return Err(BackendError::EmptyAllocation { label: "opaque depth" });
        }
        if self.depth.as_ref().is_some_and(|d| d.size == (width, height)) {
            return Ok(());
        }
        self.depth = None;

        let texture = self.scoped("opaque depth", || {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("voxel opaque depth"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some(DepthTarget { view, size: (width, height) });
        Ok(())
    }

    /// Records every pending opaque draw into one depth-tested pass.
    fn flush_opaque(&mut self) {
        if self.opaque_pending.is_empty() {
            return;
        }
        let draws = std::mem::take(&mut self.opaque_pending);
        let blocks = std::mem::take(&mut self.opaque_uniforms);

        if self.opaque_pipeline.is_none() {
            match self.scoped("opaque program", || self.build_opaque_pipeline()) {
                Ok(pipeline) => self.opaque_pipeline = Some(pipeline),
                Err(e) => {
                    log::error!("dropping {} opaque draws: {e}", draws.len());
                    return;
                }
            }
        }
        if let Err(e) = self.ensure_depth() {
            log::error!("dropping {} opaque draws: {e}", draws.len());
            return;
        }
        let Some(base) = self.uniforms.upload(&self.device, &self.queue, &self.uniform_layout, &blocks) else {
            return;
        };

        let (Some(target), Some(pipeline), Some(depth), Some(uniform_group)) = (
            self.target.as_mut(),
            self.opaque_pipeline.as_ref(),
            self.depth.as_ref(),
            self.uniforms.bind_group.as_ref(),
        ) else {
            log::debug!("dropping {} opaque draws recorded without a render target", draws.len());
            return;
        };
        let stride = self.uniforms.stride;

        let load = if self.cleared {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(self.background.clamped().to_wgpu())
        };
        self.cleared = true;

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("voxel opaque pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        for (i, id) in draws.iter().enumerate() {
            let Some(geometry) = self.geometries.get(*id) else { continue };
            let Some((vbo, ibo)) = geometry.buffers.as_ref() else { continue };
            let Ok(offset) = u32::try_from(base + i as u64 * stride) else { continue };

            rpass.set_bind_group(0, uniform_group, &[offset]);
            rpass.set_vertex_buffer(0, vbo.slice(..));
            rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..geometry.index_count, 0, 0..1);
        }
    }

    /// Clears the target when the frame recorded no pass.
    fn clear_target(&mut self) {
        let Some(target) = self.target.as_mut() else { return };
        let _rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("voxel clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.background.clamped().to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.cleared = true;
    }
}

impl Backend for WgpuBackend {
    fn begin_frame(&mut self, background: Rgba) {
        self.background = background;
        self.cleared = false;
        self.bound = None;
        self.pending.clear();
        self.pending_uniforms.clear();
        self.opaque_pending.clear();
        self.opaque_uniforms.clear();
        self.uniforms.rewind();
    }

    fn end_frame(&mut self) {
        self.flush();
        self.flush_opaque();
        if !self.cleared {
            self.clear_target();
        }
        self.bound = None;
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn allocate(&mut self, kind: BufferKind) -> Result<BufferId, BackendError> {
        let label = kind.label();
        let bytes = kind.byte_size();
        if bytes == 0 {
            return Err(BackendError::EmptyAllocation { label });
        }
        let limit = self.max_storage_bytes();
        if bytes > limit {
            return Err(BackendError::AllocationTooLarge { label, bytes, limit });
        }

        let buffer = self.scoped(label, || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: bytes,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;
        log::debug!("allocated {label}: {bytes} bytes");
        Ok(self.buffers.insert(GpuBuffer { buffer, kind }))
    }

    fn fill(&mut self, buffer: BufferId, value: u32) -> Result<(), BackendError> {
        let slot = self.buffers.get(buffer).ok_or(BackendError::UnknownHandle("buffer"))?;
        let words = slot.kind.byte_size() / 4;

        let chunk = (words as usize).min(FILL_CHUNK_WORDS);
        self.fill_scratch.clear();
        self.fill_scratch.resize(chunk, value);

        let mut written = 0u64;
        while written < words {
            let n = (words - written).min(chunk as u64) as usize;
            self.queue
                .write_buffer(&slot.buffer, written * 4, bytemuck::cast_slice(&self.fill_scratch[..n]));
            written += n as u64;
        }
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.remove(buffer) {
            log::debug!("released {}", slot.kind.label());
        }
    }

    fn attach_transparency(&mut self, buffers: TransparencyBuffers) -> Result<(), BackendError> {
        let get = |id| {
            self.buffers
                .get(id)
                .map(|b: &GpuBuffer| b.buffer.as_entire_binding())
                .ok_or(BackendError::UnknownHandle("transparency buffer"))
        };
        let entries = [
            wgpu::BindGroupEntry { binding: 0, resource: get(buffers.heads)? },
            wgpu::BindGroupEntry { binding: 1, resource: get(buffers.counter)? },
            wgpu::BindGroupEntry { binding: 2, resource: get(buffers.fragments)? },
        ];
        let group = self.scoped("transparency bind group", || {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("voxel oit transparency bind group"),
                layout: &self.transparency_layout,
                entries: &entries,
            })
        })?;
        self.transparency = Some(group);
        Ok(())
    }

    fn detach_transparency(&mut self) {
        self.transparency = None;
    }

    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramId, BackendError> {
        if self.limits.max_storage_buffers_per_shader_stage < REQUIRED_STORAGE_BUFFERS {
            return Err(BackendError::Program {
                kind,
                reason: format!(
                    "device binds {} storage buffers per stage, {REQUIRED_STORAGE_BUFFERS} needed",
                    self.limits.max_storage_buffers_per_shader_stage
                ),
            });
        }
        let pipeline = self.scoped("program", || self.build_pipeline(kind))?;
        Ok(self.programs.insert(GpuProgram { kind, pipeline }))
    }

    fn bind_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        if !self.programs.contains_key(program) {
            return Err(BackendError::UnknownHandle("program"));
        }
        self.bound = Some(program);
        Ok(())
    }

    fn release_program(&mut self, program: ProgramId) {
        if let Some(p) = self.programs.remove(program) {
            log::debug!("released {:?} program", p.kind);
        }
        if self.bound == Some(program) {
            self.bound = None;
        }
    }

    fn upload_geometry(&mut self, geometry: &Geometry) -> Result<GeometryId, BackendError> {
        geometry.validate().map_err(BackendError::Geometry)?;
        let index_count = u32::try_from(geometry.indices().len())
            .map_err(|_| BackendError::Geometry("too many indices".to_string()))?;

        let buffers = if geometry.is_empty() {
            None
        } else {
            let uploaded = self.scoped("actor geometry", || {
                let vbo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("voxel actor vbo"),
                    contents: bytemuck::cast_slice(geometry.vertices()),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let ibo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("voxel actor ibo"),
                    contents: bytemuck::cast_slice(geometry.indices()),
                    usage: wgpu::BufferUsages::INDEX,
                });
                (vbo, ibo)
            })?;
            Some(uploaded)
        };

        Ok(self.geometries.insert(GpuGeometry { buffers, index_count }))
    }

    fn release_geometry(&mut self, geometry: GeometryId) {
        self.geometries.remove(geometry);
    }

    fn draw(&mut self, geometry: GeometryId, uniforms: &DrawUniforms) -> Result<(), BackendError> {
        let program = self.bound.ok_or(BackendError::NoProgramBound)?;
        if !self.geometries.contains_key(geometry) {
            return Err(BackendError::UnknownHandle("geometry"));
        }
        if self.transparency.is_none() {
            return Err(BackendError::TransparencyDetached);
        }
        self.pending.push(PendingDraw { program, geometry });
        self.pending_uniforms.push(*uniforms);
        Ok(())
    }

    fn draw_opaque(&mut self, geometry: GeometryId, uniforms: &DrawUniforms) -> Result<(), BackendError> {
        if !self.geometries.contains_key(geometry) {
            return Err(BackendError::UnknownHandle("geometry"));
        }
        self.opaque_pending.push(geometry);
        self.opaque_uniforms.push(*uniforms);
        Ok(())
    }

    fn memory_barrier(&mut self) {
        self.flush();
    }
}
