use std::collections::HashSet;

use glam::DVec2;

use super::types::{InputEvent, Key, MouseButton};

/// Input transitions of one frame.
///
/// [`InputState`](super::InputState) holds what is currently down; this holds
/// what changed since the last frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,
    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Pointer position when the frame's first motion arrived.
    pub pointer_origin: Option<DVec2>,

    /// Sum of pointer motion this frame.
    pub pointer_delta: DVec2,

    /// Sum of vertical wheel lines this frame.
    pub wheel_lines: f64,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.pointer_origin = None;
        self.pointer_delta = DVec2::ZERO;
        self.wheel_lines = 0.0;
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// The pointer moved this frame.
    pub fn moved(&self) -> bool {
        self.pointer_delta != DVec2::ZERO
    }
}
