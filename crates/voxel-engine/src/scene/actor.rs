use std::fmt;

use glam::Mat4;

use crate::backend::{Backend, DrawUniforms, GeometryId};
use crate::error::BackendError;
use crate::renderer::Generation;

use super::{FrameState, Geometry, Rgba};

/// Renderer-unique actor identity. Ids start at 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Which sequence an actor belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ActorKind {
    /// Voxel data drawn by the volume write pass.
    DenseVolume,
    /// Surface mesh drawn by the mesh write pass.
    Mesh,
    /// Fullscreen resolve drawn by the sort pass.
    Composite,
}

/// A frame-global value an actor's program reads.
///
/// Pushed by [`Actor::display`] before every draw; values not bound stay at
/// their `DrawUniforms` defaults.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformBinding {
    View,
    Projection,
    Viewport,
    DepthBudget,
    Background,
    BlendMethod,
}

impl UniformBinding {
    /// Bindings of the volume and mesh write programs.
    pub const WRITE_PASS: &'static [UniformBinding] = &[
        UniformBinding::View,
        UniformBinding::Projection,
        UniformBinding::Viewport,
        UniformBinding::DepthBudget,
    ];

    /// Bindings of the sort/composite program.
    pub const SORT_PASS: &'static [UniformBinding] = &[
        UniformBinding::Viewport,
        UniformBinding::DepthBudget,
        UniformBinding::Background,
        UniformBinding::BlendMethod,
    ];

    fn apply(self, frame: &FrameState, out: &mut DrawUniforms) {
        match self {
            UniformBinding::View => out.view = frame.view.to_cols_array_2d(),
            UniformBinding::Projection => out.projection = frame.projection.to_cols_array_2d(),
            UniformBinding::Viewport => {
                out.viewport = [frame.viewport.width as f32, frame.viewport.height as f32]
            }
            UniformBinding::DepthBudget => out.depth_budget = frame.depth_budget,
            UniformBinding::Background => out.background = frame.background.to_array(),
            UniformBinding::BlendMethod => out.blend_method = frame.blend_method.shader_code(),
        }
    }
}

/// CPU-side description of an actor, built off the render thread.
#[derive(Debug, Clone)]
pub struct ActorDesc {
    pub kind: ActorKind,
    pub geometry: Geometry,
    pub transform: Mat4,
    pub color: Rgba,
    pub bindings: Vec<UniformBinding>,
}

impl ActorDesc {
    fn with_kind(kind: ActorKind, geometry: Geometry, bindings: &[UniformBinding]) -> Self {
        Self {
            kind,
            geometry,
            transform: Mat4::IDENTITY,
            color: Rgba::WHITE,
            bindings: bindings.to_vec(),
        }
    }

    pub fn dense_volume(geometry: Geometry) -> Self {
        Self::with_kind(ActorKind::DenseVolume, geometry, UniformBinding::WRITE_PASS)
    }

    pub fn mesh(geometry: Geometry) -> Self {
        Self::with_kind(ActorKind::Mesh, geometry, UniformBinding::WRITE_PASS)
    }

    /// The sort pass's fullscreen triangle.
    pub fn composite() -> Self {
        Self::with_kind(
            ActorKind::Composite,
            Geometry::fullscreen_triangle(),
            UniformBinding::SORT_PASS,
        )
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }
}

/// A drawable unit owned by exactly one sequence.
///
/// GPU state (the uploaded geometry) only exists between `init` and
/// `dispose`, both of which run on the render thread.
#[derive(Debug)]
pub struct Actor {
    id: ActorId,
    generation: Generation,
    desc: ActorDesc,
    gpu: Option<GeometryId>,
}

impl Actor {
    pub fn new(id: ActorId, desc: ActorDesc) -> Self {
        Self {
            id,
            generation: Generation::default(),
            desc,
            gpu: None,
        }
    }

    /// Stamps the load generation this actor was produced under.
    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = generation;
        self
    }

    #[inline]
    pub fn id(&self) -> ActorId {
        self.id
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    pub fn kind(&self) -> ActorKind {
        self.desc.kind
    }

    #[inline]
    pub fn desc(&self) -> &ActorDesc {
        &self.desc
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Uploads the geometry. Re-initializing releases the previous upload.
    pub fn init<B: Backend>(&mut self, backend: &mut B) -> Result<(), BackendError> {
        self.desc.geometry.validate().map_err(BackendError::Geometry)?;
        let uploaded = backend.upload_geometry(&self.desc.geometry)?;
        if let Some(old) = self.gpu.replace(uploaded) {
            backend.release_geometry(old);
        }
        Ok(())
    }

    /// Uniform block for this frame: actor-local values plus every binding.
    pub fn uniforms(&self, frame: &FrameState) -> DrawUniforms {
        let mut out = DrawUniforms {
            model: self.desc.transform.to_cols_array_2d(),
            color: self.desc.color.clamped().to_array(),
            ..DrawUniforms::default()
        };
        for binding in &self.desc.bindings {
            binding.apply(frame, &mut out);
        }
        out
    }

    /// Pushes uniforms and draws with the currently bound program.
    pub fn display<B: Backend>(&self, backend: &mut B, frame: &FrameState) -> Result<(), BackendError> {
        let geometry = self.gpu.ok_or(BackendError::UnknownHandle("geometry"))?;
        backend.draw(geometry, &self.uniforms(frame))
    }

    /// Draws straight into the target, bypassing the transparency buffers.
    pub fn display_opaque<B: Backend>(&self, backend: &mut B, frame: &FrameState) -> Result<(), BackendError> {
        let geometry = self.gpu.ok_or(BackendError::UnknownHandle("geometry"))?;
        backend.draw_opaque(geometry, &self.uniforms(frame))
    }

    /// Releases the uploaded geometry; a second call does nothing.
    pub fn dispose<B: Backend>(&mut self, backend: &mut B) {
        if let Some(geometry) = self.gpu.take() {
            backend.release_geometry(geometry);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::coords::ViewportSize;
    use crate::scene::BlendMethod;

    fn frame() -> FrameState {
        FrameState {
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)),
            projection: Mat4::from_scale(Vec3::splat(2.0)),
            viewport: ViewportSize::new(640, 480),
            depth_budget: 8,
            background: Rgba::new(0.1, 0.2, 0.3, 1.0),
            blend_method: BlendMethod::Mip,
        }
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    #[test]
    fn write_pass_bindings_push_camera_and_budget() {
        let actor = Actor::new(
            ActorId(1),
            ActorDesc::mesh(Geometry::quad(Vec3::ZERO, 1.0)).with_color(Rgba::new(1.0, 0.0, 0.0, 0.5)),
        );
        let u = actor.uniforms(&frame());

        assert_eq!(u.view, frame().view.to_cols_array_2d());
        assert_eq!(u.projection, frame().projection.to_cols_array_2d());
        assert_eq!(u.viewport, [640.0, 480.0]);
        assert_eq!(u.depth_budget, 8);
        assert_eq!(u.color, [1.0, 0.0, 0.0, 0.5]);
        // Not bound by write programs.
        assert_eq!(u.background, [0.0; 4]);
        assert_eq!(u.blend_method, 0);
    }

    #[test]
    fn sort_pass_bindings_push_background_and_blend() {
        let actor = Actor::new(ActorId(1), ActorDesc::composite());
        let u = actor.uniforms(&frame());

        assert_eq!(u.background, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(u.blend_method, BlendMethod::Mip.shader_code());
        assert_eq!(u.view, Mat4::IDENTITY.to_cols_array_2d());
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn display_before_init_is_an_error() {
        let mut backend = SoftwareBackend::new(4, 4);
        let actor = Actor::new(ActorId(3), ActorDesc::mesh(Geometry::quad(Vec3::ZERO, 1.0)));
        assert_eq!(
            actor.display(&mut backend, &frame()),
            Err(BackendError::UnknownHandle("geometry"))
        );
    }

    #[test]
    fn init_rejects_invalid_geometry() {
        let mut backend = SoftwareBackend::new(4, 4);
        let bad = Geometry::new(Vec::new(), vec![0, 1, 2]);
        let mut actor = Actor::new(ActorId(2), ActorDesc::dense_volume(bad));

        assert!(matches!(actor.init(&mut backend), Err(BackendError::Geometry(_))));
        assert!(!actor.is_initialized());
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut backend = SoftwareBackend::new(4, 4);
        let mut actor = Actor::new(ActorId(1), ActorDesc::mesh(Geometry::quad(Vec3::ZERO, 1.0)));
        actor.init(&mut backend).unwrap();
        assert_eq!(backend.live_geometries(), 1);

        actor.dispose(&mut backend);
        actor.dispose(&mut backend);

        assert_eq!(backend.live_geometries(), 0);
        assert!(!actor.is_initialized());
    }

    #[test]
    fn id_displays_with_prefix() {
        assert_eq!(ActorId(42).to_string(), "actor#42");
    }
}
