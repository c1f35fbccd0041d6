//! Geometry loading for 3D models.
//!
//! [`RawGeometry`] is the CPU-side form of a mesh: interleaved
//! [`Vertex3d`]s plus triangle indices, ready for [`RawGeometry::upload`].
//!
//! # Supported Formats
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | OBJ    | `.obj`     | Triangulated on load; every object in the file is merged |
//!
//! Files without vertex normals get smooth normals computed from their faces.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use glam::Vec3;
use thiserror::Error;
use tracing::debug;

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};

/// Errors that can occur when loading geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),
    #[error("{} contains no triangles", path.display())]
    Empty { path: PathBuf },
}

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    /// Creates raw geometry from vertices and indices.
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Loads a model file, detecting the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let geometry = match ext.as_str() {
            "obj" => {
                let loaded = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS);
                Self::from_obj_models(loaded, path)?
            }
            _ => return Err(GeometryError::UnknownFormat(ext)),
        };
        debug!(
            path = %path.display(),
            vertices = geometry.vertices.len(),
            triangles = geometry.triangle_count(),
            "geometry loaded"
        );
        Ok(geometry)
    }

    /// Parses OBJ text from a reader. Material libraries are not loaded.
    ///
    /// `name` is only used in error messages.
    pub fn from_obj_reader(reader: &mut impl BufRead, name: &str) -> Result<Self, GeometryError> {
        let loaded = tobj::load_obj_buf(reader, &tobj::GPU_LOAD_OPTIONS, |_| {
            Err(tobj::LoadError::GenericFailure)
        });
        Self::from_obj_models(loaded, Path::new(name))
    }

    fn from_obj_models(loaded: tobj::LoadResult, path: &Path) -> Result<Self, GeometryError> {
        let (models, _materials) = loaded.map_err(|source| GeometryError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let mut geometry = RawGeometry::default();
        let mut missing_normals = false;
        for model in &models {
            let mesh = &model.mesh;
            let base = geometry.vertices.len() as u32;
            let has_normals = mesh.normals.len() == mesh.positions.len();
            let has_uvs = mesh.texcoords.len() / 2 == mesh.positions.len() / 3;
            missing_normals |= !has_normals;

            for (i, position) in mesh.positions.chunks_exact(3).enumerate() {
                let normal = if has_normals {
                    [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
                } else {
                    [0.0; 3]
                };
                let uv = if has_uvs {
                    [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0; 2]
                };
                geometry
                    .vertices
                    .push(Vertex3d::new([position[0], position[1], position[2]], normal, uv));
            }
            geometry
                .indices
                .extend(mesh.indices.iter().map(|&index| base + index));
        }

        if geometry.triangle_count() == 0 {
            return Err(GeometryError::Empty {
                path: path.to_path_buf(),
            });
        }
        if missing_normals {
            geometry.recalculate_normals();
        }
        Ok(geometry)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Returns the center point of the geometry.
    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// Recalculates vertex normals from face geometry.
    ///
    /// Smooth normals: each vertex gets the area-weighted average of the
    /// face normals of the triangles sharing it.
    pub fn recalculate_normals(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);

            // Unnormalized, so larger faces weigh more.
            let face_normal = (p1 - p0).cross(p2 - p0);
            for i in [i0, i1, i2] {
                accumulated[i] += face_normal;
            }
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(accumulated) {
            vertex.normal = normal.normalize_or_zero().into();
        }
    }

    /// Uploads this geometry to the GPU as a [`Mesh`].
    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TRIANGLES: &str = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";

    const QUAD_WITH_NORMALS: &str = "\
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    fn parse(text: &str) -> Result<RawGeometry, GeometryError> {
        RawGeometry::from_obj_reader(&mut text.as_bytes(), "test.obj")
    }

    #[test]
    fn objects_are_merged_with_offset_indices() {
        let geometry = parse(TWO_TRIANGLES).unwrap();

        assert_eq!(geometry.vertices.len(), 6);
        assert_eq!(geometry.triangle_count(), 2);
        let second: Vec<u32> = geometry.indices[3..].to_vec();
        assert!(second.iter().all(|&index| index >= 3));
        assert_eq!(geometry.vertices[second[0] as usize].position, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_normals_are_computed_from_faces() {
        let geometry = parse(TWO_TRIANGLES).unwrap();
        for vertex in &geometry.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn polygons_are_triangulated_and_normals_kept() {
        let geometry = parse(QUAD_WITH_NORMALS).unwrap();

        assert_eq!(geometry.triangle_count(), 2);
        assert!(geometry.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert_eq!(geometry.bounds(), (Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn file_without_faces_is_rejected() {
        let err = parse("v 0 0 0\nv 1 0 0\n").unwrap_err();
        assert!(matches!(err, GeometryError::Empty { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = RawGeometry::from_file("model.fbx").unwrap_err();
        assert!(matches!(err, GeometryError::UnknownFormat(ref ext) if ext == "fbx"));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = RawGeometry::from_file("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, GeometryError::Load { .. }));
        assert!(err.to_string().contains("exist.obj"));
    }

    #[test]
    fn bundled_sphere_is_a_unit_diameter_sphere() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/sphere.obj");
        let sphere = RawGeometry::from_file(path).unwrap();

        let (min, max) = sphere.bounds();
        assert!(min.abs_diff_eq(Vec3::splat(-0.5), 1e-3));
        assert!(max.abs_diff_eq(Vec3::splat(0.5), 1e-3));
        assert!(sphere.center().abs_diff_eq(Vec3::ZERO, 1e-3));
        for vertex in &sphere.vertices {
            let normal = Vec3::from(vertex.normal);
            assert!((normal.length() - 1.0).abs() < 1e-3);
            // Normals point away from the center.
            assert!(normal.dot(Vec3::from(vertex.position)) > 0.0);
        }
        // Front faces wind counter-clockwise seen from outside.
        for tri in sphere.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(sphere.vertices[tri[i] as usize].position));
            assert!((b - a).cross(c - a).dot(a + b + c) > 0.0);
        }
    }
}
