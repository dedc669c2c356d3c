//! Trackball camera and the projection derived from it.

mod projection;
mod trackball;

pub use projection::Projection;
pub use trackball::{
    Camera, DEFAULT_FOCUS, DEFAULT_FOCUS_DISTANCE, DISTANCE_TO_SCREEN_IN_PIXELS, MAX_FOCUS_DISTANCE,
    MIN_FOCUS_DISTANCE,
};
