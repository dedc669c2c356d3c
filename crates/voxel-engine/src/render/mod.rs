//! Per-frame GPU handles passed from the runtime to frame callbacks.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
