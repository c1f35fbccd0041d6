//! Ownership of entities and the shared resources they reference.
//!
//! A [`Scene`] is the arena behind [`MeshId`] and [`MaterialId`]. Entities
//! are owned uniquely; meshes and materials are owned once and shared by
//! handle; shader programs are shared between materials through `Rc`.
//!
//! Release order follows the dependency chain: entities reference meshes and
//! materials, materials reference programs. [`Scene::shutdown`] tears down
//! in that order and reports how many of each were released.

use std::rc::Rc;

use tracing::{debug, info};

use crate::entity::{Entity, MaterialId, MeshId};
use crate::material::{Material, ShaderProgram};

/// Counts of resources released by [`Scene::shutdown`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub entities: usize,
    pub materials: usize,
    pub programs: usize,
    pub meshes: usize,
}

/// Entities plus the meshes and materials they share.
///
/// Generic over the mesh type so the same ownership rules hold for GPU
/// meshes and for CPU-only stand-ins.
#[derive(Debug)]
pub struct Scene<M> {
    entities: Vec<Entity>,
    materials: Vec<Material>,
    meshes: Vec<M>,
}

impl<M> Default for Scene<M> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
        }
    }
}

impl<M> Scene<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: M) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Takes ownership of an entity and returns its index.
    pub fn spawn(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn mesh(&self, id: MeshId) -> Option<&M> {
        self.meshes.get(id.0)
    }

    pub fn meshes(&self) -> &[M] {
        &self.meshes
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Mutable access to entities and materials at the same time, for the
    /// per-frame bind/update/draw sequence.
    pub fn entities_and_materials_mut(&mut self) -> (&mut [Entity], &mut [Material]) {
        (&mut self.entities, &mut self.materials)
    }

    /// Releases everything exactly once: entities, then materials, then
    /// the programs they held, then meshes.
    pub fn shutdown(self) -> ReleaseReport {
        let Scene {
            entities,
            materials,
            meshes,
        } = self;
        let mut report = ReleaseReport::default();

        for entity in entities {
            debug!(entity = entity.name(), "releasing entity");
            report.entities += 1;
        }

        let mut programs: Vec<Rc<ShaderProgram>> = Vec::new();
        for material in materials {
            let program = Rc::clone(material.program());
            if !programs.iter().any(|known| Rc::ptr_eq(known, &program)) {
                programs.push(program);
            }
            debug!(program = material.program().name(), "releasing material");
            report.materials += 1;
        }

        for program in programs {
            let name = program.name().to_string();
            // Still shared elsewhere: the last holder releases it.
            if Rc::try_unwrap(program).is_ok() {
                debug!(program = %name, "releasing shader program");
                report.programs += 1;
            }
        }

        report.meshes = meshes.len();
        drop(meshes);
        debug!(count = report.meshes, "released meshes");

        info!(
            entities = report.entities,
            materials = report.materials,
            programs = report.programs,
            meshes = report.meshes,
            "scene shut down"
        );
        report
    }
}
