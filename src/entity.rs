//! Renderable entities and the handles they use to reference shared resources.
//!
//! An [`Entity`] owns its [`Transform`] and refers to a mesh and a material
//! by handle. Many entities can share one mesh and one material; the
//! [`Scene`](crate::Scene) owns the resources the handles point at.
//!
//! # Example
//!
//! ```ignore
//! let mut sphere = Entity::new("sphere0");
//! sphere.transform.set_position(Vec3::new(0.0, 0.0, -1.0));
//! sphere.set_model_mesh(mesh);
//! sphere.set_model_material(material);
//!
//! // Per frame: bind first, then update, then draw.
//! let mut bound = materials[material].bind(&mut frame);
//! sphere.update(&mut bound);
//! sphere.draw(bound);
//! ```

use tracing::warn;

use crate::material::BoundMaterial;
use crate::transform::Transform;

/// Name of the model transform parameter an entity uploads on update.
pub const WORLD_MATRIX: &str = "worldMatrix";

/// Type-safe handle to a mesh owned by a [`Scene`](crate::Scene).
///
/// This newtype wrapper prevents accidentally passing material indices where
/// mesh indices are expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Type-safe handle to a material owned by a [`Scene`](crate::Scene).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

/// A named, placed instance of a shared mesh drawn with a shared material.
#[derive(Clone, Debug)]
pub struct Entity {
    name: String,
    /// Placement of the entity in world space.
    pub transform: Transform,
    mesh: Option<MeshId>,
    material: Option<MaterialId>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::new(),
            mesh: None,
            material: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Attaches a shared mesh. The entity does not own it.
    pub fn set_model_mesh(&mut self, mesh: MeshId) {
        self.mesh = Some(mesh);
    }

    /// Attaches a shared material. The entity does not own it.
    pub fn set_model_material(&mut self, material: MaterialId) {
        self.material = Some(material);
    }

    /// Refreshes the world matrix if needed and uploads it to the bound material.
    pub fn update(&mut self, bound: &mut BoundMaterial) {
        let world = self.transform.world_matrix();
        if let Err(err) = bound.set_matrix(WORLD_MATRIX, world) {
            warn!(entity = %self.name, "{err}");
        }
    }

    /// Draws the attached mesh with whatever material `bound` holds.
    pub fn draw(&self, bound: BoundMaterial) {
        match self.mesh {
            Some(mesh) => bound.submit(mesh),
            None => warn!(entity = %self.name, "draw skipped: no mesh attached"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use glam::{Mat4, Vec3};

    use super::*;
    use crate::frame::FrameRecorder;
    use crate::material::{Material, ParamKind, ShaderProgram, ShaderSource, UniformLayout};

    fn material(layout: UniformLayout) -> Material {
        Material::new(Rc::new(ShaderProgram::new(
            "test",
            ShaderSource::new("vs", ""),
            ShaderSource::new("fs", ""),
            layout,
        )))
    }

    #[test]
    fn update_uploads_world_matrix_into_bound_snapshot() {
        let material = material(UniformLayout::new().param(WORLD_MATRIX, ParamKind::Mat4));
        let mut frame = FrameRecorder::new(256);
        let mut entity = Entity::new("sphere0");
        entity.transform.set_position(Vec3::new(1.0, 2.0, 3.0));

        let mut bound = material.bind(&mut frame);
        entity.update(&mut bound);

        assert!(!entity.transform.is_dirty());
        assert_eq!(
            bound.matrix(WORLD_MATRIX).unwrap(),
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
        );
    }

    #[test]
    fn update_without_world_matrix_parameter_is_not_fatal() {
        let material = material(UniformLayout::new().param("metallic", ParamKind::Float));
        let mut frame = FrameRecorder::new(256);
        let mut entity = Entity::new("sphere0");

        let mut bound = material.bind(&mut frame);
        entity.update(&mut bound);
        entity.set_model_mesh(MeshId(3));
        entity.draw(bound);

        assert_eq!(frame.draws().len(), 1);
    }

    #[test]
    fn draw_records_mesh_and_snapshot() {
        let material = material(UniformLayout::new().param(WORLD_MATRIX, ParamKind::Mat4));
        let mut frame = FrameRecorder::new(256);
        let mut entity = Entity::new("sphere0");
        entity.set_model_mesh(MeshId(2));
        entity.set_model_material(MaterialId(0));

        let bound = material.bind(&mut frame);
        let offset = bound.offset();
        entity.draw(bound);

        assert_eq!(frame.draws()[0].mesh, MeshId(2));
        assert_eq!(frame.draws()[0].uniform_offset, offset);
        assert_eq!(entity.material(), Some(MaterialId(0)));
    }

    #[test]
    fn entity_without_mesh_draws_nothing() {
        let material = material(UniformLayout::new());
        let mut frame = FrameRecorder::new(256);
        let entity = Entity::new("empty");

        entity.draw(material.bind(&mut frame));
        assert!(frame.draws().is_empty());
    }
}
