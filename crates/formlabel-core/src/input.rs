//! Pointer and keyboard events delivered to the interaction engine.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer events in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    Scroll { position: Point, delta: Vec2 },
    /// The pointer left the page surface.
    Leave,
}

/// Keys the labeling surface reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Shift,
    Escape,
    Other(String),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match name {
            "Shift" => Key::Shift,
            "Escape" | "Esc" => Key::Escape,
            other => Key::Other(other.to_string()),
        }
    }
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(Key),
    Released(Key),
}

/// Pointer and modifier state tracked between events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Previous pointer position for delta calculations.
    pub previous_pointer_position: Point,
    /// Whether Shift is held.
    pub shift: bool,
    /// Whether the primary button is held.
    pub primary_down: bool,
    /// Start position of the current drag.
    pub drag_start: Option<Point>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        match event {
            PointerEvent::Down { position, button } => {
                self.move_to(*position);
                if *button == MouseButton::Left {
                    self.primary_down = true;
                    self.drag_start = Some(*position);
                }
            }
            PointerEvent::Up { position, button } => {
                self.move_to(*position);
                if *button == MouseButton::Left {
                    self.primary_down = false;
                    self.drag_start = None;
                }
            }
            PointerEvent::Move { position } | PointerEvent::Scroll { position, .. } => {
                self.move_to(*position);
            }
            PointerEvent::Leave => {}
        }
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        match event {
            KeyEvent::Pressed(Key::Shift) => self.shift = true,
            KeyEvent::Released(Key::Shift) => self.shift = false,
            _ => {}
        }
    }

    fn move_to(&mut self, position: Point) {
        self.previous_pointer_position = self.pointer_position;
        self.pointer_position = position;
    }

    /// Pointer movement since the previous event.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_position - self.previous_pointer_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_tracking() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::Down {
            position: Point::new(10.0, 10.0),
            button: MouseButton::Left,
        });
        assert!(input.primary_down);
        assert_eq!(input.drag_start, Some(Point::new(10.0, 10.0)));

        input.handle_pointer_event(&PointerEvent::Move { position: Point::new(15.0, 12.0) });
        assert_eq!(input.pointer_delta(), Vec2::new(5.0, 2.0));

        input.handle_pointer_event(&PointerEvent::Up {
            position: Point::new(15.0, 12.0),
            button: MouseButton::Left,
        });
        assert!(!input.primary_down);
        assert!(input.drag_start.is_none());
    }

    #[test]
    fn test_shift_modifier() {
        let mut input = InputState::new();
        input.handle_key_event(&KeyEvent::Pressed(Key::from("Shift")));
        assert!(input.shift);
        input.handle_key_event(&KeyEvent::Released(Key::Shift));
        assert!(!input.shift);
        assert_eq!(Key::from("Escape"), Key::Escape);
        assert_eq!(Key::from("a"), Key::Other("a".into()));
    }
}
