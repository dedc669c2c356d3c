//! Rendering backends.
//!
//! The renderer, sequences and actors issue GPU work only through [`Backend`].
//! Handles are opaque keys; each backend owns the resources behind them.
//!
//! Implementations:
//! - [`WgpuBackend`]: real GPU passes (WGSL write + sort shaders)
//! - [`SoftwareBackend`]: CPU reference of the same per-pixel linked-list
//!   algorithm with framebuffer readback and call counters

mod software;
mod wgpu_backend;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::error::BackendError;
use crate::oit::FragmentNode;
use crate::scene::Geometry;
use crate::scene::Rgba;

pub use software::{BackendStats, SoftwareBackend};
pub use wgpu_backend::WgpuBackend;

slotmap::new_key_type! {
    /// Backend-owned storage buffer.
    pub struct BufferId;
    /// Backend-owned program (pipeline).
    pub struct ProgramId;
    /// Backend-owned uploaded geometry.
    pub struct GeometryId;
}

/// The three programs of the OIT pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramKind {
    /// Appends dense-volume fragments (alpha scaled by vertex weight).
    VolumeWrite,
    /// Appends mesh fragments.
    MeshWrite,
    /// Resolves per-pixel lists into the framebuffer.
    Sort,
}

/// Transparency resources a backend can allocate.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    /// One `u32` list head per pixel.
    HeadPointers { width: u32, height: u32 },
    /// Single `u32` fragment allocator.
    AtomicCounter,
    /// `capacity` fragment nodes shared by every pixel.
    FragmentStorage { capacity: u64 },
}

impl BufferKind {
    pub fn label(&self) -> &'static str {
        match self {
            BufferKind::HeadPointers { .. } => "head-pointer image",
            BufferKind::AtomicCounter => "atomic counter",
            BufferKind::FragmentStorage { .. } => "fragment storage",
        }
    }

    /// Size in bytes; saturates instead of overflowing for absurd requests.
    pub fn byte_size(&self) -> u64 {
        match *self {
            BufferKind::HeadPointers { width, height } => {
                u64::from(width).saturating_mul(u64::from(height)).saturating_mul(4)
            }
            BufferKind::AtomicCounter => 4,
            BufferKind::FragmentStorage { capacity } => {
                capacity.saturating_mul(std::mem::size_of::<FragmentNode>() as u64)
            }
        }
    }
}

/// Buffers the write and sort programs read and write.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransparencyBuffers {
    pub heads: BufferId,
    pub counter: BufferId,
    pub fragments: BufferId,
}

/// Per-draw uniform block. Layout matches `DrawUniforms` in `oit.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub background: [f32; 4],
    pub viewport: [f32; 2],
    pub depth_budget: u32,
    pub blend_method: u32,
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
            background: [0.0; 4],
            viewport: [0.0; 2],
            depth_budget: 0,
            blend_method: 0,
        }
    }
}

impl DrawUniforms {
    #[inline]
    pub fn model_view_projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection)
            * Mat4::from_cols_array_2d(&self.view)
            * Mat4::from_cols_array_2d(&self.model)
    }
}

/// GPU command surface used by the rendering core.
///
/// All methods run on the render thread. Calls that can fail report
/// synchronously so callers can check every allocation individually.
pub trait Backend {
    /// Starts a frame; the target is cleared to `background`.
    fn begin_frame(&mut self, background: Rgba);

    /// Ends the frame, flushing any recorded work.
    fn end_frame(&mut self);

    /// Informs the backend of the drawable size in physical pixels.
    fn set_viewport(&mut self, width: u32, height: u32);

    fn allocate(&mut self, kind: BufferKind) -> Result<BufferId, BackendError>;

    /// Sets every `u32` of a head-pointer or counter buffer to `value`.
    fn fill(&mut self, buffer: BufferId, value: u32) -> Result<(), BackendError>;

    fn release_buffer(&mut self, buffer: BufferId);

    /// Binds the transparency buffers used by every write/sort draw.
    fn attach_transparency(&mut self, buffers: TransparencyBuffers) -> Result<(), BackendError>;

    fn detach_transparency(&mut self);

    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramId, BackendError>;

    fn bind_program(&mut self, program: ProgramId) -> Result<(), BackendError>;

    fn release_program(&mut self, program: ProgramId);

    fn upload_geometry(&mut self, geometry: &Geometry) -> Result<GeometryId, BackendError>;

    fn release_geometry(&mut self, geometry: GeometryId);

    /// Draws `geometry` with the bound program after pushing `uniforms`.
    fn draw(&mut self, geometry: GeometryId, uniforms: &DrawUniforms) -> Result<(), BackendError>;

    /// Draws `geometry` straight into the target with depth testing, ignoring
    /// the bound program and the transparency buffers.
    ///
    /// Fragments below one 8-bit alpha step are discarded; the rest are
    /// written with full opacity.
    fn draw_opaque(&mut self, geometry: GeometryId, uniforms: &DrawUniforms) -> Result<(), BackendError>;

    /// Makes writes of previous draws visible to subsequent draws.
    fn memory_barrier(&mut self);
}
