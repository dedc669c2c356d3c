use std::sync::Arc;

use crate::queue::HandoffQueue;
use crate::scene::{ActorDesc, ActorId, BlendMethod, Rgba};

use super::context::{Generation, RendererContext};

/// Control messages drained at the start of every frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererMessage {
    /// Dispose every volume and mesh actor produced before the given
    /// generation; programs are kept.
    DisposeAndClearAllActors(Generation),
    SetBackground(Rgba),
    SetBlendMethod(BlendMethod),
}

/// An actor waiting for GPU initialization on the render thread.
#[derive(Debug)]
pub struct InitRequest {
    pub id: ActorId,
    /// Generation current when the load producing this actor started.
    pub generation: Generation,
    pub desc: ActorDesc,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) context: RendererContext,
    pub(crate) init: HandoffQueue<InitRequest>,
    pub(crate) dispose: HandoffQueue<ActorId>,
    pub(crate) messages: HandoffQueue<RendererMessage>,
}

/// Thread-safe entry point into a renderer.
///
/// Cloned freely into loader threads and input handlers. Nothing here
/// touches the GPU; requests are queued and applied by the next
/// `Renderer::display`.
#[derive(Debug, Clone)]
pub struct RendererHandle {
    shared: Arc<Shared>,
}

impl RendererHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Queues an actor for the current generation and returns its id.
    pub fn add_actor_to_init_queue(&self, desc: ActorDesc) -> ActorId {
        let generation = self.generation();
        self.add_actor_to_init_queue_for(generation, desc)
    }

    /// Queues an actor produced by a load started at `generation`.
    pub fn add_actor_to_init_queue_for(&self, generation: Generation, desc: ActorDesc) -> ActorId {
        let id = self.shared.context.next_actor_id();
        self.shared.init.push(InitRequest { id, generation, desc });
        id
    }

    /// Queues `id` for disposal; it is not drawn in any later frame.
    pub fn add_actor_to_dispose_queue(&self, id: ActorId) {
        self.shared.dispose.push(id);
    }

    /// Clears the scene at the next frame.
    ///
    /// Also advances the generation, so loads still in flight for the old
    /// scene are discarded when they arrive. Returns the new generation.
    pub fn set_dispose_and_clear_all_actors_msg(&self) -> Generation {
        let generation = self.shared.context.advance_generation();
        self.shared.messages.push(RendererMessage::DisposeAndClearAllActors(generation));
        generation
    }

    pub fn set_background(&self, color: Rgba) {
        self.shared.messages.push(RendererMessage::SetBackground(color));
    }

    pub fn set_blend_method(&self, method: BlendMethod) {
        self.shared.messages.push(RendererMessage::SetBlendMethod(method));
    }

    #[inline]
    pub fn next_actor_id(&self) -> ActorId {
        self.shared.context.next_actor_id()
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.shared.context.generation()
    }

    #[inline]
    pub fn advance_generation(&self) -> Generation {
        self.shared.context.advance_generation()
    }

    /// Init requests not yet drained.
    pub fn pending_inits(&self) -> usize {
        self.shared.init.len()
    }
}
