use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::scene::ActorId;

/// Load epoch. Init requests tagged with an older generation are discarded.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen {}", self.0)
    }
}

/// Counters shared by every thread talking to one renderer.
///
/// Actor ids start at 1; id 0 is the renderer's own composite actor.
#[derive(Debug)]
pub struct RendererContext {
    next_actor_id: AtomicU32,
    generation: AtomicU64,
}

impl Default for RendererContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererContext {
    pub fn new() -> Self {
        Self {
            next_actor_id: AtomicU32::new(1),
            generation: AtomicU64::new(0),
        }
    }

    pub fn next_actor_id(&self) -> ActorId {
        ActorId(self.next_actor_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    /// Starts a new epoch and returns it.
    pub fn advance_generation(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    #[inline]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation() == generation
    }
}
