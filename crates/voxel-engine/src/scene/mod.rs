//! Scene model: actors, their geometry and the sequences that draw them.
//!
//! Responsibilities:
//! - describe drawable units off the render thread (`ActorDesc`, `Geometry`)
//! - own per-actor GPU lifetime on the render thread (`Actor`)
//! - group actors under one program and draw them in order (`ShaderActionSequence`)

mod actor;
mod color;
mod frame;
mod geometry;
mod sequence;

pub use actor::{Actor, ActorDesc, ActorId, ActorKind, UniformBinding};
pub use color::Rgba;
pub use frame::{BlendMethod, FrameState};
pub use geometry::{Geometry, Vertex};
pub use sequence::ShaderActionSequence;
