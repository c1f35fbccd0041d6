use glam::{Mat4, Vec3};

use crate::transform::Transform;

/// A perspective camera placed by its own [`Transform`].
///
/// The projection is computed once from the lens parameters given at
/// construction; resizing the window does not change it. The view is
/// rebuilt from the transform every time the camera matrix is requested.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Placement of the camera in world space.
    pub transform: Transform,
    fov: f32, // radians
    width: f32,
    height: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl Camera {
    /// Creates a camera from a vertical field of view in degrees, the
    /// aspect dimensions, and the clipping planes.
    pub fn new(fov_degrees: f32, width: f32, height: f32, near: f32, far: f32) -> Self {
        let fov = fov_degrees.to_radians();
        Self {
            transform: Transform::new(),
            fov,
            width,
            height,
            near,
            far,
            projection: Mat4::perspective_rh(fov, width / height, near, far),
        }
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Aspect ratio the projection was built with (width / height).
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position()
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// World-to-camera matrix looking along the transform's forward axis.
    pub fn view_matrix(&self) -> Mat4 {
        let position = self.transform.position();
        Mat4::look_at_rh(position, position + self.transform.forward(), Vec3::Y)
    }

    /// Combined `projection * view` matrix.
    pub fn camera_matrix(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec4};

    #[test]
    fn projection_uses_construction_parameters() {
        let camera = Camera::new(90.0, 800.0, 600.0, 0.1, 100.0);
        let expected =
            Mat4::perspective_rh(90.0_f32.to_radians(), 800.0 / 600.0, 0.1, 100.0);
        assert_eq!(camera.projection(), expected);
        assert!((camera.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn camera_matrix_is_projection_times_view() {
        let mut camera = Camera::new(60.0, 16.0, 9.0, 0.1, 50.0);
        camera.transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        camera
            .transform
            .set_rotation(Quat::from_rotation_y(0.4) * Quat::from_rotation_x(-0.2));

        let expected = camera.projection() * camera.view_matrix();
        assert_eq!(camera.camera_matrix(), expected);
    }

    #[test]
    fn point_ahead_lands_in_front_of_camera() {
        let mut camera = Camera::new(90.0, 800.0, 600.0, 0.1, 100.0);
        camera.transform.set_position(Vec3::new(0.0, 0.0, 5.0));

        let clip = camera.camera_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
