//! # PBR Spheres
//!
//! **A grid of physically based spheres under four point lights.**
//!
//! Rows vary metallic from 1.0 at the top to 0.1 at the bottom; columns vary
//! roughness from nearly smooth to 0.9. A first-person camera flies through
//! the grid: W/A/S/D to move, Space and Left Shift for up and down, the
//! cursor to look around, Escape to quit.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pbr_spheres::{AppConfig, run};
//!
//! fn main() -> Result<(), pbr_spheres::StartupError> {
//!     run(AppConfig::new().title("Spheres").grid_side(7))
//! }
//! ```
//!
//! ## Structure
//!
//! - [`Transform`] caches its world matrix behind a dirty flag.
//! - [`Material`] holds named shader parameters; binding one for a draw
//!   yields a [`BoundMaterial`] token that [`Entity::draw`] consumes.
//! - [`Scene`] owns entities, materials and meshes and releases them in
//!   dependency order.
//! - [`RenderLoop`] records each frame on the CPU; [`PbrPass`] replays it
//!   on the GPU.

mod app;
mod camera;
mod entity;
mod first_person;
mod frame;
mod geometry;
mod gpu;
mod input;
mod material;
mod mesh;
mod pbr_pass;
mod render_loop;
mod scene;
mod transform;

pub use app::{AppConfig, StartupError, run};
pub use camera::Camera;
pub use entity::{Entity, MaterialId, MeshId, WORLD_MATRIX};
pub use first_person::FirstPersonController;
pub use frame::{DrawCommand, FrameRecorder, FrameTimer};
pub use geometry::{GeometryError, RawGeometry};
pub use gpu::{GpuContext, GpuError};
pub use input::Input;
pub use material::{
    BoundMaterial, Material, MaterialError, ParamKind, ParamSlot, ShaderError, ShaderProgram,
    ShaderSource, UniformLayout,
};
pub use mesh::{Mesh, Vertex3d};
pub use pbr_pass::PbrPass;
pub use render_loop::{
    ALBEDO, AMBIENT_OCCLUSION, CAMERA_MATRIX, CAMERA_POSITION, CLEAR_COLOR, LIGHT_POSITIONS,
    LIGHTS, METALLIC, ROUGHNESS, RenderLoop, SphereGrid, pbr_uniform_layout,
};
pub use scene::{ReleaseReport, Scene};
pub use transform::Transform;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, UVec2, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
