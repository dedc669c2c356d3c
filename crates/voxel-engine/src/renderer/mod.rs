//! Frame orchestrator.
//!
//! `Renderer` owns the camera, the transparency context and the three
//! sequences (volume write, mesh write, sort). Other threads reach it only
//! through a [`RendererHandle`]; everything queued there is applied at the
//! start of the next `display`.
//!
//! Per frame:
//! 1. drain messages (clear-all, background, blend method)
//! 2. drain init requests (stale generations discarded, per-actor failures dropped)
//! 3. drain dispose requests
//! 4. recompute view and projection
//! 5. if any actor exists and transparency is ready: reset, volume pass,
//!    mesh pass, sort pass; if it is not, draw the actors opaque

mod context;
mod handle;

use std::sync::Arc;

use glam::{DVec2, Mat4};

use crate::backend::{Backend, ProgramKind};
use crate::camera::{Camera, Projection};
use crate::coords::ViewportSize;
use crate::error::BackendError;
use crate::oit::{ContextState, TransparencyContext};
use crate::scene::{
    Actor, ActorDesc, ActorId, ActorKind, BlendMethod, FrameState, Rgba, ShaderActionSequence,
};

pub use context::{Generation, RendererContext};
pub use handle::{InitRequest, RendererHandle, RendererMessage};

use handle::Shared;

/// Id of the sort pass's fullscreen actor; loader ids start at 1.
pub const COMPOSITE_ACTOR_ID: ActorId = ActorId(0);

/// Startup parameters of a [`Renderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub viewport: ViewportSize,
    /// Fragment storage holds `4 × quarter_depth` layers per pixel.
    pub quarter_depth: u32,
    pub projection: Projection,
    pub background: Rgba,
    pub blend_method: BlendMethod,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportSize::default(),
            quarter_depth: 2,
            projection: Projection::default(),
            background: Rgba::BLACK,
            blend_method: BlendMethod::Mix,
        }
    }
}

/// What one `display` call did.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Reset plus the volume, mesh and sort passes ran.
    pub transparency_passes: bool,
    /// Actors were drawn opaque because transparency is unavailable.
    pub opaque_fallback: bool,
    pub volume_actors: usize,
    pub mesh_actors: usize,
    pub initialized: usize,
    pub discarded_stale: usize,
    pub init_failures: usize,
    pub disposed: usize,
}

/// Render-thread half of the renderer. Every method must be called from the
/// thread that owns the backend.
pub struct Renderer<B: Backend> {
    backend: B,
    shared: Arc<Shared>,

    camera: Camera,
    projection: Projection,
    viewport: ViewportSize,
    quarter_depth: u32,
    frame: FrameState,

    transparency: TransparencyContext,
    volume: ShaderActionSequence,
    mesh: ShaderActionSequence,
    sort: ShaderActionSequence,

    initialized: bool,
    warned_not_ready: bool,
    frame_index: u64,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let frame = FrameState {
            viewport: config.viewport,
            background: config.background,
            blend_method: config.blend_method,
            ..FrameState::default()
        };

        Self {
            backend,
            shared: Arc::new(Shared::default()),
            camera: Camera::new(),
            projection: config.projection,
            viewport: config.viewport,
            quarter_depth: config.quarter_depth,
            frame,
            transparency: TransparencyContext::new(),
            volume: ShaderActionSequence::new("volume", ProgramKind::VolumeWrite).with_memory_barrier(),
            mesh: ShaderActionSequence::new("mesh", ProgramKind::MeshWrite).with_memory_barrier(),
            sort: ShaderActionSequence::new("sort", ProgramKind::Sort),
            initialized: false,
            warned_not_ready: false,
            frame_index: 0,
        }
    }

    /// A handle for other threads.
    pub fn handle(&self) -> RendererHandle {
        RendererHandle::new(Arc::clone(&self.shared))
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    #[inline]
    pub fn background(&self) -> Rgba {
        self.frame.background
    }

    #[inline]
    pub fn blend_method(&self) -> BlendMethod {
        self.frame.blend_method
    }

    #[inline]
    pub fn transparency_state(&self) -> ContextState {
        self.transparency.state()
    }

    pub fn volume_sequence(&self) -> &ShaderActionSequence {
        &self.volume
    }

    pub fn mesh_sequence(&self) -> &ShaderActionSequence {
        &self.mesh
    }

    // ── host callbacks ────────────────────────────────────────────────────

    /// Creates the programs and the transparency context.
    ///
    /// A transparency allocation failure is not fatal: it is logged and
    /// actors are drawn opaque until a successful `reshape`.
    pub fn init(&mut self) -> Result<(), BackendError> {
        let ViewportSize { width, height } = self.viewport;
        self.backend.set_viewport(width, height);

        self.volume.init(&mut self.backend)?;
        self.mesh.init(&mut self.backend)?;
        if !self.sort.contains(COMPOSITE_ACTOR_ID) {
            self.sort.add_actor(Actor::new(COMPOSITE_ACTOR_ID, ActorDesc::composite()));
        }
        self.sort.init(&mut self.backend)?;

        if let Err(e) = self.transparency.initialize(&mut self.backend, width, height, self.quarter_depth) {
            log::error!("transparency disabled: {e}");
        }

        self.initialized = true;
        log::info!("renderer initialized at {width}x{height}");
        Ok(())
    }

    /// Runs one frame. Presenting is the host's job.
    pub fn display(&mut self) -> FrameReport {
        self.frame_index += 1;
        let mut report = FrameReport {
            frame: self.frame_index,
            ..FrameReport::default()
        };

        self.process_messages();
        self.process_init_queue(&mut report);
        self.process_dispose_queue(&mut report);
        self.update_frame_state();

        report.volume_actors = self.volume.len();
        report.mesh_actors = self.mesh.len();

        self.backend.begin_frame(self.frame.background);
        if self.initialized && !(self.volume.is_empty() && self.mesh.is_empty()) {
            if self.transparency.is_ready() {
                report.transparency_passes = self.run_transparency_passes();
            } else {
                self.run_opaque_fallback();
                report.opaque_fallback = true;
            }
        }
        self.backend.end_frame();

        report
    }

    /// Updates the viewport, projection aspect and transparency buffers.
    pub fn reshape(&mut self, width: u32, height: u32) {
        let viewport = ViewportSize::new(width, height);
        if !viewport.is_valid() {
            log::debug!("ignoring reshape to {width}x{height}");
            return;
        }
        self.viewport = viewport;
        self.frame.viewport = viewport;
        self.backend.set_viewport(width, height);

        if !self.initialized {
            return;
        }
        match self.transparency.resize(&mut self.backend, width, height) {
            Ok(()) => self.warned_not_ready = false,
            Err(e) => log::error!("transparency disabled after reshape: {e}"),
        }
    }

    /// Releases every GPU resource. Queued init requests are dropped.
    pub fn dispose(&mut self) {
        self.volume.dispose(&mut self.backend);
        self.mesh.dispose(&mut self.backend);
        self.sort.dispose(&mut self.backend);
        self.transparency.dispose(&mut self.backend);

        let dropped = self.shared.init.drain().len();
        if dropped > 0 {
            log::debug!("dropped {dropped} queued actors on dispose");
        }
        self.shared.dispose.drain();
        self.initialized = false;
    }

    // ── frame steps ───────────────────────────────────────────────────────

    fn process_messages(&mut self) {
        for message in self.shared.messages.drain() {
            match message {
                RendererMessage::DisposeAndClearAllActors(generation) => {
                    // Actors of `generation` or later were loaded after the
                    // clear was requested and survive it.
                    let cleared = self.volume.dispose_actors_before(&mut self.backend, generation)
                        + self.mesh.dispose_actors_before(&mut self.backend, generation);
                    log::debug!("cleared {cleared} actors older than {generation}");
                }
                RendererMessage::SetBackground(color) => self.frame.background = color.clamped(),
                RendererMessage::SetBlendMethod(method) => self.frame.blend_method = method,
            }
        }
    }

    fn process_init_queue(&mut self, report: &mut FrameReport) {
        let requests = self.shared.init.drain();
        if requests.is_empty() {
            return;
        }
        let current = self.shared.context.generation();

        for InitRequest { id, generation, desc } in requests {
            if generation != current {
                log::debug!("discarding {id} from {generation} (current {current})");
                report.discarded_stale += 1;
                continue;
            }

            let mut actor = Actor::new(id, desc).with_generation(generation);
            let sequence = match actor.kind() {
                ActorKind::DenseVolume => &mut self.volume,
                ActorKind::Mesh => &mut self.mesh,
                ActorKind::Composite => {
                    log::error!("{id}: composite actors are owned by the renderer");
                    report.init_failures += 1;
                    continue;
                }
            };

            if let Err(e) = actor.init(&mut self.backend) {
                log::error!("{id} init failed: {e}");
                actor.dispose(&mut self.backend);
                report.init_failures += 1;
                continue;
            }
            sequence.add_actor(actor);
            report.initialized += 1;
        }
    }

    fn process_dispose_queue(&mut self, report: &mut FrameReport) {
        for id in self.shared.dispose.drain() {
            let removed = self.volume.remove_actor(id).or_else(|| self.mesh.remove_actor(id));
            match removed {
                Some(mut actor) => {
                    actor.dispose(&mut self.backend);
                    report.disposed += 1;
                }
                None => log::debug!("dispose request for unknown {id}"),
            }
        }
    }

    fn update_frame_state(&mut self) {
        self.frame.view = self.view_matrix();
        self.frame.projection = self.projection_matrix();
        self.frame.viewport = self.viewport;
        self.frame.depth_budget = self.transparency.depth_budget();
    }

    fn run_opaque_fallback(&mut self) {
        if !self.warned_not_ready {
            log::warn!(
                "transparency context is {:?}; drawing actors opaque",
                self.transparency.state()
            );
            self.warned_not_ready = true;
        }
        self.volume.display_opaque(&mut self.backend, &self.frame);
        self.mesh.display_opaque(&mut self.backend, &self.frame);
    }

    fn run_transparency_passes(&mut self) -> bool {
        if let Err(e) = self.transparency.reset_frame(&mut self.backend) {
            log::error!("{e}");
            return false;
        }

        for sequence in [&self.volume, &self.mesh, &self.sort] {
            if let Err(e) = sequence.display(&mut self.backend, &self.frame) {
                log::error!("{} pass failed: {e}", sequence.name());
                return false;
            }
        }
        true
    }

    // ── camera ────────────────────────────────────────────────────────────

    pub fn reset_view(&mut self) {
        self.camera.reset_view();
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.camera.view_matrix()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
            .matrix(self.viewport.aspect(), self.camera.focus_distance())
    }

    pub fn rotate_pixels(&mut self, dx: f64, dy: f64, dz: f64) -> bool {
        self.camera.rotate_pixels(dx, dy, dz, self.viewport)
    }

    pub fn translate_pixels(&mut self, dx: f64, dy: f64, dz: f64) -> bool {
        self.camera.translate_pixels(dx, dy, dz)
    }

    pub fn zoom(&mut self, ratio: f64) -> bool {
        self.camera.zoom(ratio)
    }

    pub fn zoom_wheel(&mut self, notches: f64) -> bool {
        self.camera.zoom_wheel(notches)
    }

    pub fn zoom_pixels(&mut self, new: DVec2, old: DVec2) -> bool {
        self.camera.zoom_pixels(new, old, self.viewport)
    }

    pub fn center_on_pixel(&mut self, p: DVec2) -> bool {
        self.camera.center_on_pixel(p, self.viewport)
    }

    pub fn gl_units_per_pixel(&self) -> f64 {
        self.camera.units_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use glam::{DVec3, Vec3};

    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::oit::HEAD_SENTINEL;
    use crate::scene::Geometry;

    const SIZE: u32 = 4;

    fn renderer() -> Renderer<SoftwareBackend> {
        renderer_with(SoftwareBackend::new(SIZE, SIZE))
    }

    fn renderer_with(backend: SoftwareBackend) -> Renderer<SoftwareBackend> {
        let config = RendererConfig {
            viewport: ViewportSize::new(SIZE, SIZE),
            ..RendererConfig::default()
        };
        let mut r = Renderer::new(backend, config);
        r.init().unwrap();
        r
    }

    /// Square at the focus, larger than the default view frustum.
    fn covering_quad(color: Rgba) -> ActorDesc {
        ActorDesc::mesh(Geometry::quad(Vec3::new(0.0, 0.0, 0.5), 1.0)).with_color(color)
    }

    // ── queue draining ────────────────────────────────────────────────────

    #[test]
    fn concurrent_enqueue_lands_each_actor_exactly_once() {
        let mut r = renderer();
        let handle = r.handle();

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let handle = handle.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|i| {
                            let quad = Geometry::quad(Vec3::ZERO, 0.1);
                            let desc = if (t + i) % 2 == 0 {
                                ActorDesc::mesh(quad)
                            } else {
                                ActorDesc::dense_volume(quad)
                            };
                            handle.add_actor_to_init_queue(desc)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut queued = HashSet::new();
        for w in workers {
            queued.extend(w.join().unwrap());
        }

        let report = r.display();

        let present: Vec<ActorId> = r
            .volume_sequence()
            .actors()
            .iter()
            .chain(r.mesh_sequence().actors())
            .map(Actor::id)
            .collect();
        assert_eq!(report.initialized, 100);
        assert_eq!(present.len(), 100);
        assert_eq!(present.iter().copied().collect::<HashSet<_>>(), queued);
        assert_eq!(handle.pending_inits(), 0);
    }

    #[test]
    fn zero_actors_skip_reset_and_passes() {
        let mut r = renderer();
        let before = r.backend().stats();

        let report = r.display();

        let after = r.backend().stats();
        assert!(!report.transparency_passes);
        assert_eq!(after.fills, before.fills);
        assert_eq!(after.draws, before.draws);
        assert_eq!(after.frames, before.frames + 1);
    }

    #[test]
    fn one_actor_runs_reset_and_three_passes() {
        let mut r = renderer();
        r.handle().add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        let before = r.backend().stats();

        let report = r.display();

        let after = r.backend().stats();
        assert!(report.transparency_passes);
        // Head pointers and counter.
        assert_eq!(after.fills - before.fills, 2);
        // Mesh actor plus the composite.
        assert_eq!(after.draws - before.draws, 2);
        // Volume and mesh passes.
        assert_eq!(after.barriers - before.barriers, 2);
    }

    #[test]
    fn failing_actor_is_dropped_without_stalling_the_queue() {
        let mut r = renderer();
        let handle = r.handle();
        handle.add_actor_to_init_queue(ActorDesc::mesh(Geometry::new(Vec::new(), vec![0, 1, 2])));
        let good = handle.add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        handle.add_actor_to_init_queue(ActorDesc::composite());

        let report = r.display();

        assert_eq!(report.init_failures, 2);
        assert_eq!(report.initialized, 1);
        assert!(r.mesh_sequence().contains(good));
    }

    #[test]
    fn dispose_request_removes_actor_before_drawing() {
        let mut r = renderer();
        let handle = r.handle();
        let id = handle.add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        r.display();
        let geometries = r.backend().live_geometries();

        handle.add_actor_to_dispose_queue(id);
        let report = r.display();

        assert_eq!(report.disposed, 1);
        assert!(!report.transparency_passes);
        assert_eq!(r.backend().live_geometries(), geometries - 1);
    }

    // ── generations ───────────────────────────────────────────────────────

    #[test]
    fn stale_generation_is_discarded_without_gpu_init() {
        let mut r = renderer();
        let handle = r.handle();
        let geometries = r.backend().live_geometries();

        handle.add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        handle.advance_generation();
        let report = r.display();

        assert_eq!(report.discarded_stale, 1);
        assert_eq!(report.initialized, 0);
        assert_eq!(r.backend().live_geometries(), geometries);
    }

    #[test]
    fn clear_all_keeps_programs_and_invalidates_loads() {
        let mut r = renderer();
        let handle = r.handle();
        let load_started = handle.generation();
        handle.add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        handle.add_actor_to_init_queue(ActorDesc::dense_volume(Geometry::quad(Vec3::ZERO, 0.5)));
        r.display();
        let programs = r.backend().live_programs();

        handle.set_dispose_and_clear_all_actors_msg();
        handle.add_actor_to_init_queue_for(load_started, covering_quad(Rgba::WHITE));
        let report = r.display();

        assert!(r.volume_sequence().is_empty());
        assert!(r.mesh_sequence().is_empty());
        assert_eq!(report.discarded_stale, 1);
        assert_eq!(r.backend().live_programs(), programs);
        assert!(r.volume_sequence().program().is_some());
    }

    #[test]
    fn clear_spares_actors_loaded_after_it_was_requested() {
        let mut r = renderer();
        let handle = r.handle();
        let old = handle.add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        r.display();

        // The loader sees the new generation and its actor is initialized
        // before the render thread drains the clear message.
        let generation = handle.advance_generation();
        let fresh = handle.add_actor_to_init_queue_for(generation, covering_quad(Rgba::WHITE));
        r.display();
        r.shared.messages.push(RendererMessage::DisposeAndClearAllActors(generation));
        let report = r.display();

        assert!(r.mesh_sequence().contains(fresh));
        assert!(!r.mesh_sequence().contains(old));
        assert_eq!(report.mesh_actors, 1);
        assert!(report.transparency_passes);
    }

    // ── composite output ──────────────────────────────────────────────────

    #[test]
    fn second_frame_shows_no_trace_of_the_first() {
        let mut r = renderer();
        let handle = r.handle();

        let red = handle.add_actor_to_init_queue(covering_quad(Rgba::new(1.0, 0.0, 0.0, 0.9)));
        r.display();
        let first = r.backend().pixel(2, 2).unwrap();
        assert!(first[0] > 0.8 && first[2] == 0.0);

        handle.add_actor_to_dispose_queue(red);
        handle.add_actor_to_init_queue(covering_quad(Rgba::new(0.0, 0.0, 1.0, 0.9)));
        r.display();

        let second = r.backend().pixel(2, 2).unwrap();
        assert_eq!(second[0], 0.0);
        assert!(second[2] > 0.8);
    }

    #[test]
    fn background_and_blend_messages_apply_next_frame() {
        let mut r = renderer();
        let handle = r.handle();
        handle.set_background(Rgba::new(0.2, 0.4, 0.6, 1.0));
        handle.set_blend_method(BlendMethod::Mip);

        r.display();

        assert_eq!(r.background(), Rgba::new(0.2, 0.4, 0.6, 1.0));
        assert_eq!(r.blend_method(), BlendMethod::Mip);
        assert_eq!(r.backend().pixel(0, 0), Some([0.2, 0.4, 0.6, 1.0]));
    }

    #[test]
    fn mip_ignores_depth_order() {
        let mut r = renderer();
        let handle = r.handle();
        handle.set_blend_method(BlendMethod::Mip);
        handle.add_actor_to_init_queue(covering_quad(Rgba::new(1.0, 0.0, 0.0, 1.0)));
        handle.add_actor_to_init_queue(
            ActorDesc::mesh(Geometry::quad(Vec3::new(0.0, 0.0, 1.0), 1.0))
                .with_color(Rgba::new(0.0, 1.0, 0.0, 1.0)),
        );

        r.display();

        let px = r.backend().pixel(2, 2).unwrap();
        assert_eq!(px, [1.0, 1.0, 0.0, 1.0]);
    }

    // ── transparency context ──────────────────────────────────────────────

    #[test]
    fn allocation_failure_falls_back_to_opaque() {
        let mut r = renderer_with(SoftwareBackend::new(SIZE, SIZE).with_max_buffer_bytes(16));
        r.handle().add_actor_to_init_queue(covering_quad(Rgba::new(0.0, 1.0, 0.0, 0.5)));
        let before = r.backend().stats();

        let report = r.display();

        assert_eq!(r.transparency_state(), ContextState::Failed);
        assert!(!report.transparency_passes);
        assert!(report.opaque_fallback);
        assert_eq!(report.mesh_actors, 1);

        let after = r.backend().stats();
        assert_eq!(after.draws, before.draws);
        assert_eq!(after.fills, before.fills);
        assert_eq!(after.opaque_draws - before.opaque_draws, 1);
        assert_eq!(r.backend().pixel(2, 2), Some([0.0, 1.0, 0.0, 1.0]));
        assert_ne!(r.backend().pixel(2, 2), Some(r.background().to_array()));
    }

    #[test]
    fn successful_reshape_leaves_the_opaque_fallback() {
        let mut r = renderer_with(SoftwareBackend::new(SIZE, SIZE).with_max_buffer_bytes(16 * 1024));
        r.reshape(64, 64);
        assert_eq!(r.transparency_state(), ContextState::Failed);
        r.handle().add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        assert!(r.display().opaque_fallback);

        r.reshape(SIZE, SIZE);
        let report = r.display();

        assert_eq!(r.transparency_state(), ContextState::Ready);
        assert!(report.transparency_passes);
        assert!(!report.opaque_fallback);
    }

    #[test]
    fn reset_between_frames_leaves_clean_lists() {
        let mut r = renderer();
        r.handle().add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        r.display();
        assert!(r.backend().counter_value().unwrap() > 0);

        r.transparency.reset_frame(&mut r.backend).unwrap();
        r.transparency.reset_frame(&mut r.backend).unwrap();

        assert_eq!(r.backend().counter_value(), Some(0));
        assert!(r.backend().head_pointers().unwrap().iter().all(|&h| h == HEAD_SENTINEL));
    }

    #[test]
    fn reshape_resizes_transparency_buffers() {
        let mut r = renderer();
        r.reshape(8, 2);

        assert_eq!(r.viewport(), ViewportSize::new(8, 2));
        assert_eq!(r.backend().head_pointers().unwrap().len(), 16);
        assert_eq!(r.backend().size(), (8, 2));

        r.reshape(0, 0);
        assert_eq!(r.viewport(), ViewportSize::new(8, 2));
    }

    #[test]
    fn dispose_releases_everything() {
        let mut r = renderer();
        r.handle().add_actor_to_init_queue(covering_quad(Rgba::WHITE));
        r.display();
        r.handle().add_actor_to_init_queue(covering_quad(Rgba::WHITE));

        r.dispose();
        r.dispose();

        let backend = r.backend();
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.live_programs(), 0);
        assert_eq!(backend.live_geometries(), 0);
        assert_eq!(r.handle().pending_inits(), 0);
    }

    // ── end to end ────────────────────────────────────────────────────────

    #[test]
    fn large_viewport_with_deep_budget() {
        let mut r = Renderer::new(
            SoftwareBackend::new(400, 400),
            RendererConfig {
                viewport: ViewportSize::new(400, 400),
                quarter_depth: 100,
                ..RendererConfig::default()
            },
        );
        r.init().unwrap();
        assert_eq!(r.transparency_state(), ContextState::Ready);
        assert_eq!(r.backend().head_pointers().map(<[u32]>::len), Some(400 * 400));

        // First frame after init: no actors, so no reset and no passes.
        let before = r.backend().stats();
        let report = r.display();
        let after = r.backend().stats();
        assert!(!report.transparency_passes);
        assert_eq!(after.fills, before.fills);
        assert_eq!(after.draws, before.draws);
        assert_eq!(after.barriers, before.barriers);

        let id = r.handle().add_actor_to_init_queue(covering_quad(Rgba::new(1.0, 0.0, 0.0, 0.9)));
        r.rotate_pixels(40.0, 10.0, 0.0);
        r.reset_view();
        assert_eq!(r.camera().focus(), DVec3::new(0.0, 0.0, 0.5));
        assert_eq!(r.camera().focus_distance(), 2.0);

        let before = r.backend().stats();
        let report = r.display();
        let after = r.backend().stats();
        assert!(r.mesh_sequence().contains(id));
        assert!(report.transparency_passes);
        assert_eq!(after.fills - before.fills, 2);
        assert_eq!(after.draws - before.draws, 2);
        assert_eq!(after.barriers - before.barriers, 2);

        let center = r.backend().pixel(200, 200).unwrap();
        assert!(center[0] > 0.8 && center[1] == 0.0 && center[2] == 0.0);
    }

    // ── camera ────────────────────────────────────────────────────────────

    #[test]
    fn reset_view_uses_documented_defaults() {
        let mut r = Renderer::new(
            SoftwareBackend::new(400, 400),
            RendererConfig {
                viewport: ViewportSize::new(400, 400),
                quarter_depth: 100,
                ..RendererConfig::default()
            },
        );
        r.rotate_pixels(50.0, 20.0, 0.0);
        r.zoom(2.0);

        r.reset_view();

        assert_eq!(r.camera().focus(), DVec3::new(0.0, 0.0, 0.5));
        assert_eq!(r.camera().focus_distance(), 2.0);
        assert_eq!(r.gl_units_per_pixel(), 0.001);
    }

    #[test]
    fn projection_tracks_viewport_aspect() {
        let mut r = renderer();
        let square = r.projection_matrix();
        r.reshape(8, 4);
        let wide = r.projection_matrix();
        assert_eq!(square.y_axis.y, wide.y_axis.y);
        assert!(wide.x_axis.x < square.x_axis.x);
    }
}
