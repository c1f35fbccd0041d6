use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Tracks keyboard state and the last reported cursor position.
///
/// The window's event callback writes into this object; the frame update
/// reads it. Cursor reports are not queued: the latest position wins.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    cursor_position: Option<Vec2>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.key_event(key, event.state);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Focused(false) => {
                // Releases are never delivered to an unfocused window.
                self.keys_down.clear();
            }
            _ => {}
        }
    }

    pub(crate) fn key_event(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
            }
        }
    }

    pub(crate) fn cursor_moved(&mut self, position: Vec2) {
        self.cursor_position = Some(position);
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Last cursor position in window coordinates, if the cursor has moved yet.
    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release() {
        let mut input = Input::new();
        input.key_event(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.key_down(KeyCode::KeyW));
        assert!(input.key_pressed(KeyCode::KeyW));

        input.begin_frame();
        assert!(input.key_down(KeyCode::KeyW));
        assert!(!input.key_pressed(KeyCode::KeyW));

        input.key_event(KeyCode::KeyW, ElementState::Released);
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn key_repeat_is_not_a_new_press() {
        let mut input = Input::new();
        input.key_event(KeyCode::Escape, ElementState::Pressed);
        input.begin_frame();
        input.key_event(KeyCode::Escape, ElementState::Pressed);
        assert!(!input.key_pressed(KeyCode::Escape));
    }

    #[test]
    fn cursor_is_unknown_until_first_report() {
        let input = Input::new();
        assert_eq!(input.cursor_position(), None);
    }

    #[test]
    fn latest_cursor_report_wins() {
        let mut input = Input::new();
        input.cursor_moved(Vec2::new(10.0, 20.0));
        input.cursor_moved(Vec2::new(30.0, 40.0));
        assert_eq!(input.cursor_position(), Some(Vec2::new(30.0, 40.0)));
    }
}
