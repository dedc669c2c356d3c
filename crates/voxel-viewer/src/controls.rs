//! Mouse and keyboard bindings.
//!
//! | input                       | action                       |
//! |-----------------------------|------------------------------|
//! | left drag                   | rotate                       |
//! | right drag, shift+left drag | pan                          |
//! | middle drag                 | zoom toward/away from center |
//! | wheel                       | zoom                         |
//! | `C`                         | center on pointer            |
//! | `R`                         | reset view                   |
//! | `Delete`                    | clear all actors             |
//! | `B`                         | toggle mix/mip blending      |
//! | `1` `2` `3`                 | load volume/mesh/mixed scene |
//! | `Esc`                       | quit                         |

use glam::DVec2;
use voxel_engine::input::{InputFrame, InputState, Key, MouseButton};

use crate::scenes::SceneKind;

/// Zoom notches per wheel line.
const NOTCHES_PER_WHEEL_LINE: f64 = 5.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Action {
    Rotate(DVec2),
    Pan(DVec2),
    ZoomDrag { new: DVec2, old: DVec2 },
    ZoomWheel(f64),
    CenterOn(DVec2),
    ResetView,
    ClearAll,
    ToggleBlend,
    LoadScene(SceneKind),
    Quit,
}

/// Actions for one frame of input, in a fixed order: keys, then pointer.
pub fn actions(input: &InputState, frame: &InputFrame) -> Vec<Action> {
    let mut out = Vec::new();

    for &key in &frame.keys_pressed {
        let action = match key {
            Key::Escape => Some(Action::Quit),
            Key::R => Some(Action::ResetView),
            Key::Delete => Some(Action::ClearAll),
            Key::B => Some(Action::ToggleBlend),
            Key::C => input.pointer_pos.map(Action::CenterOn),
            other => other.digit().and_then(SceneKind::from_digit).map(Action::LoadScene),
        };
        out.extend(action);
    }
    // HashSet order is arbitrary; keep the result deterministic.
    out.sort_by_key(key_rank);

    if frame.moved() {
        let delta = frame.pointer_delta;
        let left = input.button_down(MouseButton::Left);
        if input.button_down(MouseButton::Right) || (left && input.modifiers.shift) {
            out.push(Action::Pan(delta));
        } else if left {
            out.push(Action::Rotate(delta));
        } else if input.button_down(MouseButton::Middle) {
            if let (Some(old), Some(new)) = (frame.pointer_origin, input.pointer_pos) {
                out.push(Action::ZoomDrag { new, old });
            }
        }
    }

    if frame.wheel_lines != 0.0 {
        out.push(Action::ZoomWheel(frame.wheel_lines * NOTCHES_PER_WHEEL_LINE));
    }
    out
}

fn key_rank(action: &Action) -> u8 {
    match action {
        Action::Quit => 0,
        Action::ClearAll => 1,
        Action::LoadScene(_) => 2,
        Action::ResetView => 3,
        Action::CenterOn(_) => 4,
        Action::ToggleBlend => 5,
        _ => 6,
    }
}
