//! Voxel engine crate.
//!
//! Order-independent-transparency renderer for dense volumes and meshes,
//! plus the platform and GPU runtime pieces a viewer needs.
//!
//! Rendering core: [`renderer`], [`oit`], [`scene`], [`camera`], [`backend`].
//! Platform: [`window`], [`device`], [`input`], [`time`], [`core`].

pub mod backend;
pub mod camera;
pub mod config;
pub mod coords;
pub mod error;
pub mod loader;
pub mod oit;
pub mod queue;
pub mod renderer;
pub mod scene;

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
