//! Screen-space sizes shared by the camera, the renderer and the backends.
//!
//! Canonical space:
//! - physical pixels
//! - origin top-left
//! - +X right, +Y down

mod viewport;

pub use viewport::ViewportSize;
