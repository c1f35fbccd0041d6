//! Spatial transforms with a lazily recomputed world matrix.
//!
//! A [`Transform`] stores translation, rotation (as a quaternion), and scale
//! separately and caches the combined 4×4 world matrix. Every mutation moves
//! the cache to the dirty state; [`Transform::world_matrix`] is the only way
//! back to a clean cache.
//!
//! # Example
//!
//! ```
//! use pbr_spheres::{Transform, Vec3, Quat};
//!
//! let mut transform = Transform::new()
//!     .with_position(Vec3::new(0.0, 2.0, -5.0))
//!     .with_rotation(Quat::from_rotation_y(0.5))
//!     .with_uniform_scale(2.0);
//!
//! let world = transform.world_matrix();
//! transform.translate(Vec3::X);
//! assert!(transform.is_dirty());
//! assert_ne!(transform.world_matrix(), world);
//! ```
//!
//! # Transformation Order
//!
//! The world matrix applies **Scale → Rotate → Translate** (SRT):
//! `world = T(position) * R(rotation) * S(scale)`.

use glam::{Mat4, Quat, Vec3};

/// Cache state of a transform's world matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
enum WorldMatrix {
    /// The cached matrix matches the current position, rotation and scale.
    Clean(Mat4),
    /// A component changed since the matrix was last computed.
    Dirty,
}

/// Position, rotation and scale with a cached world matrix.
///
/// # Default Values
///
/// - `position`: `(0, 0, 0)`
/// - `rotation`: identity
/// - `scale`: `(1, 1, 1)`
///
/// A fresh transform starts dirty, so the first call to
/// [`world_matrix`](Self::world_matrix) always computes.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    world: WorldMatrix,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world: WorldMatrix::Dirty,
        }
    }
}

impl Transform {
    /// Creates an identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform positioned at the given location.
    ///
    /// ```
    /// use pbr_spheres::{Transform, Vec3};
    ///
    /// let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
    /// assert_eq!(transform.position(), Vec3::new(1.0, 2.0, 3.0));
    /// ```
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Sets the position (builder form).
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    /// Sets the rotation (builder form).
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Sets non-uniform scale factors (builder form).
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Sets the same scale on all axes (builder form).
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.set_uniform_scale(scale);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.world = WorldMatrix::Dirty;
    }

    /// Moves the transform by `offset` in world space.
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        self.world = WorldMatrix::Dirty;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.world = WorldMatrix::Dirty;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.world = WorldMatrix::Dirty;
    }

    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.set_scale(Vec3::splat(scale));
    }

    /// Returns true if the cached world matrix is out of date.
    pub fn is_dirty(&self) -> bool {
        matches!(self.world, WorldMatrix::Dirty)
    }

    /// Returns the world matrix, recomputing it only if a component changed.
    pub fn world_matrix(&mut self) -> Mat4 {
        match self.world {
            WorldMatrix::Clean(matrix) => matrix,
            WorldMatrix::Dirty => {
                let matrix = self.compute_matrix();
                self.world = WorldMatrix::Clean(matrix);
                matrix
            }
        }
    }

    /// Computes the SRT matrix from the current components, bypassing the cache.
    pub fn compute_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Local forward axis (`-Z` rotated by the orientation).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Local right axis (`+X` rotated by the orientation).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local up axis (`+Y` rotated by the orientation).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transform_starts_dirty() {
        let transform = Transform::new();
        assert!(transform.is_dirty());
    }

    #[test]
    fn world_matrix_cleans_the_cache() {
        let mut transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let matrix = transform.world_matrix();
        assert!(!transform.is_dirty());
        assert_eq!(matrix, Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn repeated_reads_are_bit_identical() {
        let mut transform = Transform::new()
            .with_position(Vec3::new(0.3, -1.7, 4.2))
            .with_rotation(Quat::from_rotation_z(0.77))
            .with_uniform_scale(1.3);

        let first = transform.world_matrix();
        let second = transform.world_matrix();
        assert_eq!(first.to_cols_array(), second.to_cols_array());
    }

    #[test]
    fn every_setter_marks_dirty() {
        let mut transform = Transform::new();

        transform.world_matrix();
        transform.set_position(Vec3::ONE);
        assert!(transform.is_dirty());

        transform.world_matrix();
        transform.translate(Vec3::X);
        assert!(transform.is_dirty());

        transform.world_matrix();
        transform.set_rotation(Quat::from_rotation_x(0.2));
        assert!(transform.is_dirty());

        transform.world_matrix();
        transform.set_scale(Vec3::new(1.0, 2.0, 3.0));
        assert!(transform.is_dirty());

        transform.world_matrix();
        transform.set_uniform_scale(0.5);
        assert!(transform.is_dirty());
    }

    #[test]
    fn cache_never_goes_stale_across_mutations() {
        let mut transform = Transform::new();
        let steps: [&dyn Fn(&mut Transform); 5] = [
            &|t| t.translate(Vec3::new(0.5, 0.0, -1.0)),
            &|t| t.set_rotation(Quat::from_rotation_y(1.1)),
            &|t| t.set_scale(Vec3::new(2.0, 1.0, 0.5)),
            &|t| t.set_position(Vec3::new(-3.0, 4.0, 0.0)),
            &|t| t.set_rotation(Quat::from_rotation_x(-0.4) * Quat::from_rotation_y(0.3)),
        ];

        for step in steps {
            transform.world_matrix();
            step(&mut transform);
            assert_eq!(transform.world_matrix(), transform.compute_matrix());
        }
    }

    #[test]
    fn scale_rotates_then_translates() {
        let mut transform = Transform::new()
            .with_position(Vec3::new(10.0, 0.0, 0.0))
            .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
            .with_uniform_scale(2.0);

        // X is scaled to 2, rotated onto +Y, then offset by +10 on X.
        let point = transform.world_matrix().transform_point3(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(10.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn basis_follows_rotation() {
        let transform =
            Transform::new().with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!(transform.forward().abs_diff_eq(Vec3::NEG_X, 1e-6));
        assert!(transform.right().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(transform.up().abs_diff_eq(Vec3::Y, 1e-6));
    }
}
