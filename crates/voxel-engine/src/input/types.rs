use std::fmt;

/// Keys the viewer binds. Everything else arrives as `Unknown`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Space,
    Delete,
    Backspace,

    Shift,
    Control,
    Alt,

    A, B, C, D, M, R, S, V,

    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    /// Platform key code without a variant here.
    Unknown(u32),
}

impl Key {
    /// `Digit1..=Digit9` as `1..=9`.
    pub fn digit(self) -> Option<u8> {
        let n = match self {
            Key::Digit0 => 0,
            Key::Digit1 => 1,
            Key::Digit2 => 2,
            Key::Digit3 => 3,
            Key::Digit4 => 4,
            Key::Digit5 => 5,
            Key::Digit6 => 6,
            Key::Digit7 => 7,
            Key::Digit8 => 8,
            Key::Digit9 => 9,
            _ => return None,
        };
        Some(n)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Press/release of a key or mouse button.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Mouse wheel delta.
///
/// `Line` is notched wheel input; `Pixel` comes from touchpads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f64, y: f64 },
}

impl MouseWheelDelta {
    /// Pixel deltas per wheel line.
    pub const PIXELS_PER_LINE: f64 = 40.0;

    /// Vertical motion in wheel lines; positive scrolls away from the user.
    pub fn lines_y(self) -> f64 {
        match self {
            MouseWheelDelta::Line { y, .. } => f64::from(y),
            MouseWheelDelta::Pixel { y, .. } => y / Self::PIXELS_PER_LINE,
        }
    }
}

/// Platform-agnostic input events. Positions are physical pixels, top-left
/// origin, matching the renderer viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    ModifiersChanged(Modifiers),

    Key {
        key: Key,
        state: ButtonState,
        repeat: bool,
    },

    PointerMoved { x: f64, y: f64 },
    PointerButton { button: MouseButton, state: ButtonState },
    MouseWheel(MouseWheelDelta),

    PointerLeft,
    Focused(bool),
}
