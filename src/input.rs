//! Keyboard and mouse state sampled once per frame.

use std::collections::HashSet;

use cgmath::Vector2;
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

pub use winit::event::MouseButton;

/// Anything the camera can poll for key, button and cursor state.
pub trait InputSource {
    fn is_key_down(&self, key: KeyCode) -> bool;
    fn is_mouse_button_down(&self, button: MouseButton) -> bool;
    /// Cursor position in window coordinates, or `None` while the cursor is
    /// outside the window or has not been reported yet.
    fn cursor_position(&self) -> Option<Vector2<f32>>;
}

/// Input state accumulated from winit window events.
#[derive(Debug, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
    cursor: Option<Vector2<f32>>,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys: HashSet::new(),
            buttons: HashSet::new(),
            cursor: None,
        }
    }

    /// Returns true if the event changed the input state.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                self.set_key(*key, state.is_pressed());
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.set_mouse_button(*button, *state == ElementState::Pressed);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.set_cursor_position(Vector2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.clear_cursor();
                true
            }
            // Releases are never delivered to an unfocused window
            WindowEvent::Focused(false) => {
                self.keys.clear();
                self.buttons.clear();
                self.clear_cursor();
                true
            }
            _ => false,
        }
    }

    pub fn set_key(&mut self, key: KeyCode, down: bool) {
        if down {
            self.keys.insert(key);
        } else {
            self.keys.remove(&key);
        }
    }

    pub fn set_mouse_button(&mut self, button: MouseButton, down: bool) {
        if down {
            self.buttons.insert(button);
        } else {
            self.buttons.remove(&button);
        }
    }

    pub fn set_cursor_position(&mut self, position: Vector2<f32>) {
        self.cursor = Some(position);
    }

    /// Forgets the cursor position until the next `CursorMoved`.
    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }
}

impl InputSource for InputState {
    fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn cursor_position(&self) -> Option<Vector2<f32>> {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_go_up_and_down() {
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyW, true);
        assert!(input.is_key_down(KeyCode::KeyW));
        input.set_key(KeyCode::KeyW, false);
        assert!(!input.is_key_down(KeyCode::KeyW));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyA, true);
        input.set_mouse_button(MouseButton::Right, true);
        input.set_cursor_position(Vector2::new(10.0, 20.0));
        assert!(input.handle_window_event(&WindowEvent::Focused(false)));
        assert!(!input.is_key_down(KeyCode::KeyA));
        assert!(!input.is_mouse_button_down(MouseButton::Right));
        assert_eq!(input.cursor_position(), None);
    }

    #[test]
    fn cursor_is_unknown_until_reported() {
        let mut input = InputState::new();
        assert_eq!(input.cursor_position(), None);
        input.set_cursor_position(Vector2::new(320.0, 240.0));
        assert_eq!(input.cursor_position(), Some(Vector2::new(320.0, 240.0)));
        input.clear_cursor();
        assert_eq!(input.cursor_position(), None);
    }
}
