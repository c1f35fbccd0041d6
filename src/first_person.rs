//! A first-person debug camera controller.
//!
//! [`FirstPersonController`] owns a [`Camera`] and flies it around with the
//! keyboard while the cursor steers the view.
//!
//! # Controls
//!
//! - **W/S**: Move forward/backward
//! - **A/D**: Strafe left/right
//! - **Space**: Move up
//! - **Left Shift**: Move down
//! - **Cursor**: Look around
//!
//! # Example
//!
//! ```ignore
//! let mut controller = FirstPersonController::new(Camera::new(90.0, 800.0, 600.0, 0.1, 100.0))
//!     .with_position([0.0, 0.0, 8.0])
//!     .with_speed(5.0);
//!
//! // In frame loop:
//! controller.update(&input, viewport, input.cursor_position(), dt);
//! let camera_matrix = controller.camera_matrix();
//! ```

use glam::{Mat4, Quat, UVec2, Vec2, Vec3};
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::input::Input;

/// Pitch limit that keeps the view from flipping over the poles.
const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;

/// Flies a camera from keyboard and cursor input.
#[derive(Clone, Debug)]
pub struct FirstPersonController {
    camera: Camera,
    /// Horizontal angle in radians. 0 = looking toward -Z, positive turns right.
    yaw: f32,
    /// Vertical angle in radians. 0 = horizontal, positive = up.
    pitch: f32,
    /// Movement speed in units per second.
    pub speed: f32,
    /// Look rotation in radians for a cursor sweep across the full viewport width.
    pub look_sensitivity: f32,
    previous_cursor: Option<Vec2>,
}

impl FirstPersonController {
    /// Wraps a camera, adopting its current orientation as yaw 0 / pitch 0.
    pub fn new(camera: Camera) -> Self {
        let mut controller = Self {
            camera,
            yaw: 0.0,
            pitch: 0.0,
            speed: 5.0,
            look_sensitivity: std::f32::consts::PI,
            previous_cursor: None,
        };
        controller.apply_orientation();
        controller
    }

    /// Set the starting camera position.
    pub fn with_position(mut self, position: impl Into<Vec3>) -> Self {
        self.camera.transform.set_position(position.into());
        self
    }

    /// Set movement speed in units per second.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set look sensitivity in radians per viewport width of cursor travel.
    pub fn with_look_sensitivity(mut self, sensitivity: f32) -> Self {
        self.look_sensitivity = sensitivity;
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn position(&self) -> Vec3 {
        self.camera.transform.position()
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Update the camera from the current input, cursor sample and frame time.
    ///
    /// The first cursor sample only primes the controller: its delta is zero
    /// wherever the cursor happens to be.
    pub fn update(&mut self, input: &Input, viewport: UVec2, cursor: Option<Vec2>, dt: f32) {
        let delta = match (self.previous_cursor, cursor) {
            (Some(previous), Some(current)) => current - previous,
            _ => Vec2::ZERO,
        };
        if cursor.is_some() {
            self.previous_cursor = cursor;
        }

        // A minimized window reports a zero-sized viewport.
        if viewport.x > 0 && viewport.y > 0 && delta != Vec2::ZERO {
            let radians_per_pixel = self.look_sensitivity / viewport.x as f32;
            self.yaw += delta.x * radians_per_pixel;
            self.pitch = (self.pitch - delta.y * radians_per_pixel).clamp(-MAX_PITCH, MAX_PITCH);
            self.apply_orientation();
        }

        let transform = &self.camera.transform;
        let mut velocity = Vec3::ZERO;

        if input.key_down(KeyCode::KeyW) {
            velocity += transform.forward();
        }
        if input.key_down(KeyCode::KeyS) {
            velocity -= transform.forward();
        }
        if input.key_down(KeyCode::KeyA) {
            velocity -= transform.right();
        }
        if input.key_down(KeyCode::KeyD) {
            velocity += transform.right();
        }
        if input.key_down(KeyCode::Space) {
            velocity += transform.up();
        }
        if input.key_down(KeyCode::ShiftLeft) {
            velocity -= transform.up();
        }

        if velocity.length_squared() > 0.0 {
            self.camera
                .transform
                .translate(velocity.normalize() * self.speed * dt);
        }
    }

    /// Combined projection and view matrix for the current camera state.
    pub fn camera_matrix(&self) -> Mat4 {
        self.camera.camera_matrix()
    }

    /// Yaw around world up, then pitch around the resulting local right axis.
    fn apply_orientation(&mut self) {
        let rotation = Quat::from_rotation_y(-self.yaw) * Quat::from_rotation_x(self.pitch);
        self.camera.transform.set_rotation(rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    const VIEWPORT: UVec2 = UVec2::new(800, 600);

    fn controller() -> FirstPersonController {
        FirstPersonController::new(Camera::new(90.0, 800.0, 600.0, 0.1, 100.0))
            .with_position([0.0, 0.0, 5.0])
    }

    #[test]
    fn first_cursor_sample_does_not_snap() {
        let mut fps = controller();
        let input = Input::new();
        let before = fps.camera_matrix();

        fps.update(&input, VIEWPORT, Some(Vec2::new(700.0, 13.0)), 0.016);

        assert_eq!(fps.yaw(), 0.0);
        assert_eq!(fps.pitch(), 0.0);
        assert_eq!(fps.camera_matrix(), before);
    }

    #[test]
    fn idle_frame_leaves_camera_matrix_unchanged() {
        let mut fps = controller();
        let input = Input::new();
        let cursor = Some(Vec2::new(400.0, 300.0));

        fps.update(&input, VIEWPORT, cursor, 0.016);
        let before = fps.camera_matrix();
        fps.update(&input, VIEWPORT, cursor, 0.016);

        assert_eq!(fps.camera_matrix(), before);
    }

    #[test]
    fn forward_key_moves_along_forward_by_speed_times_dt() {
        let mut fps = controller().with_speed(4.0);
        let mut input = Input::new();

        // Turn a little first so forward is not an axis.
        fps.update(&input, VIEWPORT, Some(Vec2::new(400.0, 300.0)), 0.0);
        fps.update(&input, VIEWPORT, Some(Vec2::new(480.0, 260.0)), 0.0);

        let forward = fps.camera().transform.forward();
        let start = fps.position();
        input.key_event(KeyCode::KeyW, ElementState::Pressed);
        fps.update(&input, VIEWPORT, Some(Vec2::new(480.0, 260.0)), 0.25);

        let moved = fps.position() - start;
        assert!(moved.abs_diff_eq(forward * 4.0 * 0.25, 1e-5));
        assert!((moved.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn strafe_and_vertical_use_local_basis() {
        let mut fps = controller();
        let mut input = Input::new();
        input.key_event(KeyCode::KeyD, ElementState::Pressed);
        fps.update(&input, VIEWPORT, None, 1.0);
        assert!(fps.position().abs_diff_eq(Vec3::new(5.0, 0.0, 5.0), 1e-5));

        input.key_event(KeyCode::KeyD, ElementState::Released);
        input.key_event(KeyCode::Space, ElementState::Pressed);
        fps.update(&input, VIEWPORT, None, 1.0);
        assert!(fps.position().abs_diff_eq(Vec3::new(5.0, 5.0, 5.0), 1e-5));
    }

    #[test]
    fn cursor_right_turns_right() {
        let mut fps = controller();
        let input = Input::new();
        fps.update(&input, VIEWPORT, Some(Vec2::new(400.0, 300.0)), 0.0);
        fps.update(&input, VIEWPORT, Some(Vec2::new(600.0, 300.0)), 0.0);

        // A quarter of the viewport width turns by a quarter of the sensitivity.
        assert!((fps.yaw() - std::f32::consts::PI / 4.0).abs() < 1e-5);
        assert!(fps.camera().transform.forward().x > 0.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut fps = controller();
        let input = Input::new();
        fps.update(&input, VIEWPORT, Some(Vec2::new(400.0, 300.0)), 0.0);
        fps.update(&input, VIEWPORT, Some(Vec2::new(400.0, -5000.0)), 0.0);

        assert!((fps.pitch() - MAX_PITCH).abs() < 1e-6);
        assert!(fps.camera().transform.forward().y > 0.99);
    }

    #[test]
    fn minimized_viewport_ignores_look_but_keeps_sample() {
        let mut fps = controller();
        let input = Input::new();
        fps.update(&input, UVec2::ZERO, Some(Vec2::new(0.0, 0.0)), 0.0);
        fps.update(&input, UVec2::ZERO, Some(Vec2::new(300.0, 0.0)), 0.0);
        assert_eq!(fps.yaw(), 0.0);

        // No jump once the window is restored.
        fps.update(&input, VIEWPORT, Some(Vec2::new(300.0, 0.0)), 0.0);
        assert_eq!(fps.yaw(), 0.0);
    }
}
