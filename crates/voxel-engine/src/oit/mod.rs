//! Order-independent transparency.
//!
//! Per-pixel linked lists: write passes append fragments to a shared node
//! pool through an atomic counter and an atomic exchange on the pixel's head
//! pointer; a final fullscreen pass walks each list, sorts it by depth and
//! composites it over the background.

mod composite;
mod context;
mod layout;

pub use composite::{collect_list, resolve_pixel};
pub use context::{ContextState, TransparencyContext};
pub use layout::{
    depth_budget, fragment_capacity, pack_unorm4x8, unpack_unorm4x8, FragmentNode, HEAD_SENTINEL,
    LAYERS_PER_QUARTER_DEPTH, MAX_SORTED_LAYERS,
};
