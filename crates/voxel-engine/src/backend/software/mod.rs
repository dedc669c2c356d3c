//! Headless CPU backend.
//!
//! Runs the same per-pixel linked-list algorithm as the WGSL programs:
//! write draws rasterize triangles and push fragment nodes onto each pixel's
//! list; the sort draw resolves every list into the framebuffer. Used by the
//! engine's tests and by hosts without a GPU.

mod raster;

use glam::Vec4;
use slotmap::SlotMap;

use crate::error::BackendError;
use crate::oit::{collect_list, resolve_pixel, FragmentNode, HEAD_SENTINEL, MAX_SORTED_LAYERS};
use crate::scene::{BlendMethod, Geometry, Rgba};

use super::{
    Backend, BufferId, BufferKind, DrawUniforms, GeometryId, ProgramId, ProgramKind,
    TransparencyBuffers,
};

use raster::{rasterize_triangle, ClipVertex};

/// Volume fragments below one 8-bit alpha step are not stored.
const MIN_VOLUME_ALPHA: f32 = 1.0 / 255.0;

/// Call counters, for asserting which work a frame issued.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BackendStats {
    pub frames: u64,
    pub allocations: u64,
    pub releases: u64,
    pub fills: u64,
    pub program_binds: u64,
    pub draws: u64,
    /// Draws that bypassed the transparency buffers.
    pub opaque_draws: u64,
    pub barriers: u64,
    pub fragments_written: u64,
    /// Appends past the end of fragment storage.
    pub fragments_dropped: u64,
}

#[derive(Debug)]
enum BufferSlot {
    Words { width: u32, height: u32, data: Vec<u32> },
    /// Fragment storage. Nodes are materialized as the counter reaches
    /// them, so a large capacity costs nothing until it is written.
    Nodes { capacity: usize, nodes: Vec<FragmentNode> },
}

impl BufferSlot {
    fn words(&self) -> Option<&[u32]> {
        match self {
            BufferSlot::Words { data, .. } => Some(data),
            BufferSlot::Nodes { .. } => None,
        }
    }
}

/// CPU reference backend with framebuffer readback.
#[derive(Debug)]
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    framebuffer: Vec<[f32; 4]>,
    /// Depth of opaque draws; cleared to the far plane every frame.
    depth: Vec<f32>,

    buffers: SlotMap<BufferId, BufferSlot>,
    programs: SlotMap<ProgramId, ProgramKind>,
    geometries: SlotMap<GeometryId, Geometry>,

    bound: Option<ProgramKind>,
    transparency: Option<TransparencyBuffers>,
    max_buffer_bytes: Option<u64>,
    stats: BackendStats,
    scratch: Vec<FragmentNode>,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            framebuffer: vec![[0.0; 4]; width as usize * height as usize],
            depth: vec![1.0; width as usize * height as usize],
            buffers: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            bound: None,
            transparency: None,
            max_buffer_bytes: None,
            stats: BackendStats::default(),
            scratch: Vec::new(),
        }
    }

    /// Fails allocations larger than `bytes`, like a device buffer limit.
    pub fn with_max_buffer_bytes(mut self, bytes: u64) -> Self {
        self.max_buffer_bytes = Some(bytes);
        self
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    #[inline]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    /// Resolved color at `(x, y)`, straight from the last sort pass.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.framebuffer.get((y * self.width + x) as usize).copied()
    }

    pub fn framebuffer(&self) -> &[[f32; 4]] {
        &self.framebuffer
    }

    /// Head pointers of the attached transparency buffers.
    pub fn head_pointers(&self) -> Option<&[u32]> {
        let t = self.transparency?;
        self.buffers.get(t.heads)?.words()
    }

    /// Current value of the attached fragment counter.
    pub fn counter_value(&self) -> Option<u32> {
        let t = self.transparency?;
        self.buffers.get(t.counter)?.words()?.first().copied()
    }

    pub fn fragments(&self) -> Option<&[FragmentNode]> {
        let t = self.transparency?;
        match self.buffers.get(t.fragments)? {
            BufferSlot::Nodes { nodes, .. } => Some(nodes),
            BufferSlot::Words { .. } => None,
        }
    }

    fn append_fragments(&mut self, geometry: GeometryId, kind: ProgramKind, uniforms: &DrawUniforms) -> Result<(), BackendError> {
        let t = self.transparency.ok_or(BackendError::TransparencyDetached)?;
        let geometry = self.geometries.get(geometry).ok_or(BackendError::UnknownHandle("geometry"))?;
        let [heads, counter, nodes] = self
            .buffers
            .get_disjoint_mut([t.heads, t.counter, t.fragments])
            .ok_or(BackendError::UnknownHandle("buffer"))?;

        let (
            BufferSlot::Words { width, height, data: heads },
            BufferSlot::Words { data: counter, .. },
            BufferSlot::Nodes { capacity, nodes },
        ) = (heads, counter, nodes)
        else {
            return Err(BackendError::TransparencyDetached);
        };
        let (width, height, capacity) = (*width, *height, *capacity);
        let count = counter.first_mut().ok_or(BackendError::TransparencyDetached)?;

        let mvp = uniforms.model_view_projection();
        let [r, g, b, a] = uniforms.color;
        let mut written = 0;
        let mut dropped = 0;

        for tri in geometry.triangles() {
            let clip = tri.map(|v| ClipVertex {
                clip: mvp * Vec4::from((v.position(), 1.0)),
                weight: v.weight,
            });
            rasterize_triangle(&clip, width, height, |frag| {
                let alpha = (a * frag.weight).clamp(0.0, 1.0);
                if kind == ProgramKind::VolumeWrite && alpha < MIN_VOLUME_ALPHA {
                    return;
                }
                let index = *count;
                *count = count.wrapping_add(1);
                let slot = index as usize;
                if slot >= capacity {
                    dropped += 1;
                    return;
                }
                let pixel = (frag.y * width + frag.x) as usize;
                let Some(head) = heads.get_mut(pixel) else { return };
                let node = FragmentNode::new(frag.depth, [r, g, b, alpha], *head);
                if slot < nodes.len() {
                    nodes[slot] = node;
                } else {
                    // Slots claimed by off-target fragments stay padding.
                    nodes.resize(slot, FragmentNode::new(0.0, [0.0; 4], HEAD_SENTINEL));
                    nodes.push(node);
                }
                *head = index;
                written += 1;
            });
        }

        self.stats.fragments_written += written;
        self.stats.fragments_dropped += dropped;
        Ok(())
    }

    fn resolve(&mut self, uniforms: &DrawUniforms) -> Result<(), BackendError> {
        let t = self.transparency.ok_or(BackendError::TransparencyDetached)?;
        let (Some(BufferSlot::Words { width, height, data: heads }), Some(BufferSlot::Nodes { nodes, .. })) =
            (self.buffers.get(t.heads), self.buffers.get(t.fragments))
        else {
            return Err(BackendError::TransparencyDetached);
        };

        let method = match uniforms.blend_method {
            1 => BlendMethod::Mip,
            _ => BlendMethod::Mix,
        };
        let budget = uniforms.depth_budget.min(MAX_SORTED_LAYERS) as usize;
        let w = (*width).min(self.width);
        let h = (*height).min(self.height);

        // The composite triangle covers every pixel.
        for y in 0..h {
            for x in 0..w {
                let head = heads.get((y * width + x) as usize).copied().unwrap_or(HEAD_SENTINEL);
                collect_list(nodes, head, budget, &mut self.scratch);
                let color = resolve_pixel(&mut self.scratch, uniforms.background, method);
                if let Some(px) = self.framebuffer.get_mut((y * self.width + x) as usize) {
                    *px = color;
                }
            }
        }
        Ok(())
    }

    fn rasterize_opaque(&mut self, geometry: GeometryId, uniforms: &DrawUniforms) -> Result<(), BackendError> {
        let geometry = self.geometries.get(geometry).ok_or(BackendError::UnknownHandle("geometry"))?;
        let (width, height) = (self.width, self.height);
        let mvp = uniforms.model_view_projection();
        let [r, g, b, a] = uniforms.color;

        for tri in geometry.triangles() {
            let clip = tri.map(|v| ClipVertex {
                clip: mvp * Vec4::from((v.position(), 1.0)),
                weight: v.weight,
            });
            rasterize_triangle(&clip, width, height, |frag| {
                if (a * frag.weight).clamp(0.0, 1.0) < MIN_VOLUME_ALPHA {
                    return;
                }
                let pixel = (frag.y * width + frag.x) as usize;
                let (Some(depth), Some(px)) = (self.depth.get_mut(pixel), self.framebuffer.get_mut(pixel)) else {
                    return;
                };
                if frag.depth < *depth {
                    *depth = frag.depth;
                    *px = [r, g, b, 1.0];
                }
            });
        }
        Ok(())
    }
}

impl Backend for SoftwareBackend {
    fn begin_frame(&mut self, background: Rgba) {
        self.framebuffer.fill(background.clamped().to_array());
        self.depth.fill(1.0);
        self.stats.frames += 1;
    }

    fn end_frame(&mut self) {
        self.bound = None;
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.framebuffer = vec![[0.0; 4]; width as usize * height as usize];
        self.depth = vec![1.0; width as usize * height as usize];
    }

    fn allocate(&mut self, kind: BufferKind) -> Result<BufferId, BackendError> {
        let label = kind.label();
        let bytes = kind.byte_size();
        if bytes == 0 {
            return Err(BackendError::EmptyAllocation { label });
        }
        if let Some(limit) = self.max_buffer_bytes {
            if bytes > limit {
                return Err(BackendError::AllocationTooLarge { label, bytes, limit });
            }
        }

        let slot = match kind {
            BufferKind::HeadPointers { width, height } => BufferSlot::Words {
                width,
                height,
                data: vec![0; width as usize * height as usize],
            },
            BufferKind::AtomicCounter => BufferSlot::Words { width: 1, height: 1, data: vec![0] },
            BufferKind::FragmentStorage { capacity } => {
                let len = usize::try_from(capacity).map_err(|_| BackendError::AllocationTooLarge {
                    label,
                    bytes,
                    limit: usize::MAX as u64,
                })?;
                BufferSlot::Nodes { capacity: len, nodes: Vec::new() }
            }
        };

        self.stats.allocations += 1;
        Ok(self.buffers.insert(slot))
    }

    fn fill(&mut self, buffer: BufferId, value: u32) -> Result<(), BackendError> {
        let slot = self.buffers.get_mut(buffer).ok_or(BackendError::UnknownHandle("buffer"))?;
        match slot {
            BufferSlot::Words { data, .. } => data.fill(value),
            BufferSlot::Nodes { nodes, .. } => bytemuck::cast_slice_mut::<FragmentNode, u32>(nodes).fill(value),
        }
        self.stats.fills += 1;
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(buffer).is_some() {
            self.stats.releases += 1;
        }
    }

    fn attach_transparency(&mut self, buffers: TransparencyBuffers) -> Result<(), BackendError> {
        let ok = matches!(self.buffers.get(buffers.heads), Some(BufferSlot::Words { .. }))
            && matches!(self.buffers.get(buffers.counter), Some(BufferSlot::Words { .. }))
            && matches!(self.buffers.get(buffers.fragments), Some(BufferSlot::Nodes { .. }));
        if !ok {
            return Err(BackendError::UnknownHandle("transparency buffer"));
        }
        self.transparency = Some(buffers);
        Ok(())
    }

    fn detach_transparency(&mut self) {
        self.transparency = None;
    }

    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramId, BackendError> {
        Ok(self.programs.insert(kind))
    }

    fn bind_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        let kind = self.programs.get(program).ok_or(BackendError::UnknownHandle("program"))?;
        self.bound = Some(*kind);
        self.stats.program_binds += 1;
        Ok(())
    }

    fn release_program(&mut self, program: ProgramId) {
        if let Some(kind) = self.programs.remove(program) {
            if self.bound == Some(kind) {
                self.bound = None;
            }
        }
    }

    fn upload_geometry(&mut self, geometry: &Geometry) -> Result<GeometryId, BackendError> {
        geometry.validate().map_err(BackendError::Geometry)?;
        Ok(self.geometries.insert(geometry.clone()))
    }

    fn release_geometry(&mut self, geometry: GeometryId) {
        self.geometries.remove(geometry);
    }

    fn draw(&mut self, geometry: GeometryId, uniforms: &DrawUniforms) -> Result<(), BackendError> {
        let kind = self.bound.ok_or(BackendError::NoProgramBound)?;
        if !self.geometries.contains_key(geometry) {
            return Err(BackendError::UnknownHandle("geometry"));
        }
        self.stats.draws += 1;
        match kind {
            ProgramKind::VolumeWrite | ProgramKind::MeshWrite => self.append_fragments(geometry, kind, uniforms),
            ProgramKind::Sort => self.resolve(uniforms),
        }
    }

    fn draw_opaque(&mut self, geometry: GeometryId, uniforms: &DrawUniforms) -> Result<(), BackendError> {
        self.stats.opaque_draws += 1;
        self.rasterize_opaque(geometry, uniforms)
    }

    fn memory_barrier(&mut self) {
        self.stats.barriers += 1;
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::oit::{depth_budget, TransparencyContext};

    fn setup(width: u32, height: u32) -> (SoftwareBackend, TransparencyContext) {
        let mut backend = SoftwareBackend::new(width, height);
        let mut ctx = TransparencyContext::new();
        ctx.initialize(&mut backend, width, height, 2).unwrap();
        (backend, ctx)
    }

    fn quad_uniforms(color: [f32; 4]) -> DrawUniforms {
        DrawUniforms {
            color,
            depth_budget: depth_budget(2),
            ..DrawUniforms::default()
        }
    }

    fn draw_with(backend: &mut SoftwareBackend, kind: ProgramKind, geometry: &Geometry, uniforms: &DrawUniforms) {
        let program = backend.create_program(kind).unwrap();
        backend.bind_program(program).unwrap();
        let id = backend.upload_geometry(geometry).unwrap();
        backend.draw(id, uniforms).unwrap();
    }

    // ── allocation ────────────────────────────────────────────────────────

    #[test]
    fn allocation_ceiling_is_enforced() {
        let mut backend = SoftwareBackend::new(4, 4).with_max_buffer_bytes(64);
        assert!(backend.allocate(BufferKind::HeadPointers { width: 4, height: 4 }).is_ok());
        assert_eq!(
            backend.allocate(BufferKind::FragmentStorage { capacity: 5 }),
            Err(BackendError::AllocationTooLarge {
                label: "fragment storage",
                bytes: 80,
                limit: 64
            })
        );
    }

    #[test]
    fn zero_sized_allocation_fails() {
        let mut backend = SoftwareBackend::new(4, 4);
        assert_eq!(
            backend.allocate(BufferKind::HeadPointers { width: 0, height: 4 }),
            Err(BackendError::EmptyAllocation { label: "head-pointer image" })
        );
    }

    // ── write pass ────────────────────────────────────────────────────────

    #[test]
    fn write_pass_links_fragments_per_pixel() {
        let (mut backend, _ctx) = setup(2, 2);
        let quad = Geometry::quad(Vec3::new(0.0, 0.0, 0.5), 1.0);

        draw_with(&mut backend, ProgramKind::MeshWrite, &quad, &quad_uniforms([1.0, 0.0, 0.0, 0.5]));

        let heads = backend.head_pointers().unwrap().to_vec();
        let written = backend.counter_value().unwrap();
        assert!(written >= 4);
        assert!(heads.iter().all(|&h| h != HEAD_SENTINEL && h < written));
        assert_eq!(backend.stats().fragments_written, u64::from(written));
    }

    #[test]
    fn draw_without_program_fails() {
        let (mut backend, _ctx) = setup(2, 2);
        let id = backend.upload_geometry(&Geometry::fullscreen_triangle()).unwrap();
        assert_eq!(backend.draw(id, &DrawUniforms::default()), Err(BackendError::NoProgramBound));
    }

    #[test]
    fn overflow_drops_fragments_but_keeps_counting() {
        let mut backend = SoftwareBackend::new(2, 2);
        let heads = backend.allocate(BufferKind::HeadPointers { width: 2, height: 2 }).unwrap();
        let counter = backend.allocate(BufferKind::AtomicCounter).unwrap();
        let fragments = backend.allocate(BufferKind::FragmentStorage { capacity: 2 }).unwrap();
        backend.attach_transparency(TransparencyBuffers { heads, counter, fragments }).unwrap();
        backend.fill(heads, HEAD_SENTINEL).unwrap();

        draw_with(
            &mut backend,
            ProgramKind::MeshWrite,
            &Geometry::fullscreen_triangle(),
            &quad_uniforms([1.0; 4]),
        );

        assert_eq!(backend.counter_value(), Some(4));
        assert_eq!(backend.stats().fragments_written, 2);
        assert_eq!(backend.stats().fragments_dropped, 2);
    }

    // ── sort pass ─────────────────────────────────────────────────────────

    #[test]
    fn sort_pass_composites_over_background() {
        let (mut backend, _ctx) = setup(2, 2);
        backend.begin_frame(Rgba::BLACK);
        draw_with(
            &mut backend,
            ProgramKind::MeshWrite,
            &Geometry::fullscreen_triangle(),
            &quad_uniforms([0.0, 0.0, 1.0, 1.0]),
        );

        let sort = DrawUniforms {
            background: [0.0, 0.0, 0.0, 1.0],
            ..quad_uniforms([1.0; 4])
        };
        draw_with(&mut backend, ProgramKind::Sort, &Geometry::fullscreen_triangle(), &sort);

        assert_eq!(backend.pixel(1, 1), Some([0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn empty_lists_resolve_to_background() {
        let (mut backend, _ctx) = setup(2, 2);
        let sort = DrawUniforms {
            background: [0.2, 0.3, 0.4, 1.0],
            ..quad_uniforms([1.0; 4])
        };
        draw_with(&mut backend, ProgramKind::Sort, &Geometry::fullscreen_triangle(), &sort);
        assert!(backend.framebuffer().iter().all(|&px| px == [0.2, 0.3, 0.4, 1.0]));
    }

    #[test]
    fn fill_on_fragment_storage_sets_every_word() {
        let (mut backend, ctx) = setup(1, 1);
        draw_with(
            &mut backend,
            ProgramKind::MeshWrite,
            &Geometry::fullscreen_triangle(),
            &quad_uniforms([1.0; 4]),
        );
        assert!(!backend.fragments().unwrap().is_empty());

        let fragments = ctx.buffers().unwrap().fragments;
        backend.fill(fragments, 0).unwrap();
        assert!(backend.fragments().unwrap().iter().all(|n| n.color == 0 && n.next == 0));
    }

    #[test]
    fn fragment_storage_is_materialized_on_write() {
        let (mut backend, _ctx) = setup(400, 400);
        assert_eq!(backend.fragments().map(<[_]>::len), Some(0));

        draw_with(
            &mut backend,
            ProgramKind::MeshWrite,
            &Geometry::quad(Vec3::new(0.0, 0.0, 0.5), 0.01),
            &quad_uniforms([1.0; 4]),
        );

        let written = backend.counter_value().unwrap() as usize;
        assert!(written > 0);
        assert_eq!(backend.fragments().unwrap().len(), written);
    }

    // ── opaque fallback ───────────────────────────────────────────────────

    #[test]
    fn opaque_draw_keeps_the_nearest_surface() {
        let mut backend = SoftwareBackend::new(2, 2);
        backend.begin_frame(Rgba::BLACK);
        let near = backend.upload_geometry(&Geometry::quad(Vec3::new(0.0, 0.0, 0.2), 2.0)).unwrap();
        let far = backend.upload_geometry(&Geometry::quad(Vec3::new(0.0, 0.0, 0.8), 2.0)).unwrap();

        backend.draw_opaque(near, &quad_uniforms([0.0, 0.0, 1.0, 0.5])).unwrap();
        backend.draw_opaque(far, &quad_uniforms([1.0, 0.0, 0.0, 0.5])).unwrap();

        assert!(backend.framebuffer().iter().all(|&px| px == [0.0, 0.0, 1.0, 1.0]));
        assert_eq!(backend.stats().opaque_draws, 2);
        assert_eq!(backend.stats().fragments_written, 0);
    }

    #[test]
    fn opaque_draw_needs_no_program_or_transparency() {
        let mut backend = SoftwareBackend::new(2, 2);
        let id = backend.upload_geometry(&Geometry::fullscreen_triangle()).unwrap();
        assert_eq!(backend.draw_opaque(id, &quad_uniforms([1.0; 4])), Ok(()));

        let transparent = quad_uniforms([1.0, 1.0, 1.0, 0.0]);
        backend.begin_frame(Rgba::BLACK);
        backend.draw_opaque(id, &transparent).unwrap();
        assert!(backend.framebuffer().iter().all(|&px| px == [0.0, 0.0, 0.0, 1.0]));
    }
}
