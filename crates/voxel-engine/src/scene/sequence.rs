use crate::backend::{Backend, ProgramId, ProgramKind};
use crate::error::BackendError;

use crate::renderer::Generation;

use super::{Actor, ActorId, FrameState};

/// Ordered actors drawn with one shared program.
///
/// Structural changes (`add_actor`/`remove_actor`) take `&mut self` and only
/// happen on the render thread, while the renderer drains its queues.
#[derive(Debug)]
pub struct ShaderActionSequence {
    name: &'static str,
    kind: ProgramKind,
    program: Option<ProgramId>,
    actors: Vec<Actor>,
    apply_memory_barrier: bool,
}

impl ShaderActionSequence {
    pub fn new(name: &'static str, kind: ProgramKind) -> Self {
        Self {
            name,
            kind,
            program: None,
            actors: Vec::new(),
            apply_memory_barrier: false,
        }
    }

    /// Issue a memory barrier after every `display`.
    ///
    /// Write passes set this so the next pass sees their list appends.
    pub fn with_memory_barrier(mut self) -> Self {
        self.apply_memory_barrier = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    #[inline]
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    #[inline]
    pub fn applies_memory_barrier(&self) -> bool {
        self.apply_memory_barrier
    }

    #[inline]
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.iter().any(|a| a.id() == id)
    }

    /// Appends an actor; it is drawn after every actor already present.
    pub fn add_actor(&mut self, actor: Actor) {
        self.actors.push(actor);
    }

    /// Removes the actor with `id`, keeping the order of the rest.
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        let index = self.actors.iter().position(|a| a.id() == id)?;
        Some(self.actors.remove(index))
    }

    /// Creates and binds the program, then initializes every actor in order.
    ///
    /// An actor that fails to initialize is logged, released and dropped;
    /// the others are unaffected.
    pub fn init<B: Backend>(&mut self, backend: &mut B) -> Result<(), BackendError> {
        let program = match self.program {
            Some(program) => program,
            None => {
                let program = backend.create_program(self.kind)?;
                self.program = Some(program);
                program
            }
        };
        backend.bind_program(program)?;

        let name = self.name;
        self.actors.retain_mut(|actor| match actor.init(backend) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{name}: {} init failed: {e}", actor.id());
                actor.dispose(backend);
                false
            }
        });
        Ok(())
    }

    /// Binds the program and draws every actor in insertion order.
    pub fn display<B: Backend>(&self, backend: &mut B, frame: &FrameState) -> Result<(), BackendError> {
        let program = self.program.ok_or(BackendError::NoProgramBound)?;
        backend.bind_program(program)?;

        for actor in &self.actors {
            if let Err(e) = actor.display(backend, frame) {
                log::warn!("{}: {} draw failed: {e}", self.name, actor.id());
            }
        }

        if self.apply_memory_barrier {
            backend.memory_barrier();
        }
        Ok(())
    }

    /// Draws every actor without the transparency buffers; no barrier.
    pub fn display_opaque<B: Backend>(&self, backend: &mut B, frame: &FrameState) {
        for actor in &self.actors {
            if let Err(e) = actor.display_opaque(backend, frame) {
                log::warn!("{}: {} opaque draw failed: {e}", self.name, actor.id());
            }
        }
    }

    /// Disposes every actor, clears the list and releases the program.
    pub fn dispose<B: Backend>(&mut self, backend: &mut B) {
        self.dispose_and_clear_actors_only(backend);
        if let Some(program) = self.program.take() {
            backend.release_program(program);
        }
    }

    /// Disposes and clears actors; the program stays for reuse.
    pub fn dispose_and_clear_actors_only<B: Backend>(&mut self, backend: &mut B) {
        for mut actor in self.actors.drain(..) {
            actor.dispose(backend);
        }
    }

    /// Disposes actors stamped with a generation older than `generation`.
    ///
    /// Returns how many were removed; newer actors keep their order.
    pub fn dispose_actors_before<B: Backend>(&mut self, backend: &mut B, generation: Generation) -> usize {
        let before = self.actors.len();
        self.actors.retain_mut(|actor| {
            if actor.generation() >= generation {
                return true;
            }
            actor.dispose(backend);
            false
        });
        before - self.actors.len()
    }
}
