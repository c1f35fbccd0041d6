//! The per-frame update and draw sequence for the sphere grid.
//!
//! [`RenderLoop`] owns the scene, the sphere grid, the shared PBR material
//! and the first-person controller. Each call to [`RenderLoop::frame`]
//! records one frame in a fixed order:
//!
//! 1. Clear color/depth and reset the viewport.
//! 2. Advance the camera controller and upload `cameraMatrix`.
//! 3. Upload `ao`, `camPos` and `albedo`.
//! 4. Walk the grid row by row: upload the row's `metallic`, then for each
//!    sphere upload its column's `roughness`, bind the material, update the
//!    sphere's world matrix and draw it.
//!
//! A parameter the program does not declare is logged and skipped; the frame
//! always completes.

use std::rc::Rc;

use glam::{UVec2, Vec3, Vec4};
use tracing::{info, warn};

use crate::app::AppConfig;
use crate::camera::Camera;
use crate::entity::{Entity, MaterialId, WORLD_MATRIX};
use crate::first_person::FirstPersonController;
use crate::frame::FrameRecorder;
use crate::input::Input;
use crate::material::{Material, MaterialError, ParamKind, ShaderProgram, UniformLayout};
use crate::scene::{ReleaseReport, Scene};

pub const CAMERA_MATRIX: &str = "cameraMatrix";
pub const LIGHT_POSITIONS: &str = "lightPositions";
pub const CAMERA_POSITION: &str = "camPos";
pub const AMBIENT_OCCLUSION: &str = "ao";
pub const ALBEDO: &str = "albedo";
pub const METALLIC: &str = "metallic";
pub const ROUGHNESS: &str = "roughness";

/// Four static point lights in front of the grid (homogeneous positions).
pub const LIGHTS: [Vec4; 4] = [
    Vec4::new(-10.0, 10.0, 10.0, 1.0),
    Vec4::new(10.0, 10.0, 10.0, 1.0),
    Vec4::new(-10.0, -10.0, 10.0, 1.0),
    Vec4::new(10.0, -10.0, 10.0, 1.0),
];

const AMBIENT_OCCLUSION_VALUE: f32 = 1.0;
const BASE_ALBEDO: Vec3 = Vec3::new(0.5, 0.0, 0.0);
const MIN_ROUGHNESS: f32 = 0.025;

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.05,
    a: 1.0,
};

/// Uniform layout of the PBR program, in the field order of the WGSL
/// `PbrUniforms` struct.
pub fn pbr_uniform_layout() -> UniformLayout {
    UniformLayout::new()
        .param(CAMERA_MATRIX, ParamKind::Mat4)
        .param(WORLD_MATRIX, ParamKind::Mat4)
        .param(LIGHT_POSITIONS, ParamKind::Vec4Array(LIGHTS.len() as u32))
        .param(CAMERA_POSITION, ParamKind::Vec3)
        .param(AMBIENT_OCCLUSION, ParamKind::Float)
        .param(ALBEDO, ParamKind::Vec3)
        .param(METALLIC, ParamKind::Float)
        .param(ROUGHNESS, ParamKind::Float)
}

/// A square grid of spheres: metallic falls row by row, roughness rises
/// column by column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SphereGrid {
    side: usize,
}

impl SphereGrid {
    /// Creates a `side × side` grid. A side of zero is raised to one.
    pub fn new(side: usize) -> Self {
        Self {
            side: side.max(1),
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Number of spheres in the grid.
    pub fn len(&self) -> usize {
        self.side * self.side
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Metallic value shared by every sphere in `row` (1.0 on the top row).
    pub fn metallic(&self, row: usize) -> f32 {
        (self.side - row) as f32 / self.side as f32
    }

    /// Roughness value shared by every sphere in `column`, kept above zero.
    pub fn roughness(&self, column: usize) -> f32 {
        (column as f32 / self.side as f32).clamp(MIN_ROUGHNESS, 1.0)
    }

    /// World position of the sphere at (`row`, `column`).
    pub fn position(&self, row: usize, column: usize) -> Vec3 {
        let side = self.side as f32;
        let step = 3.0 / side;
        let spacing = side / 2.5;
        Vec3::new(
            (-1.0 + column as f32 * step) * spacing,
            (1.0 - row as f32 * step) * spacing,
            -1.0,
        )
    }

    /// `(row, column)` of every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let side = self.side;
        (0..side).flat_map(move |row| (0..side).map(move |column| (row, column)))
    }
}

/// Owns everything the sphere grid needs per frame.
pub struct RenderLoop<M> {
    scene: Scene<M>,
    grid: SphereGrid,
    material: MaterialId,
    controller: FirstPersonController,
    frame: FrameRecorder,
}

impl<M> RenderLoop<M> {
    /// Builds the grid of spheres sharing `mesh` and one material of
    /// `program`, and uploads the light positions once.
    ///
    /// `uniform_alignment` is the device's minimum uniform buffer offset
    /// alignment.
    pub fn new(
        config: &AppConfig,
        mesh: M,
        program: Rc<ShaderProgram>,
        uniform_alignment: u32,
    ) -> Self {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(mesh);

        let mut material = Material::new(program);
        report(material.set_vec4_array(LIGHT_POSITIONS, &LIGHTS));
        let material = scene.add_material(material);

        let grid = SphereGrid::new(config.grid_side);
        for (index, (row, column)) in grid.cells().enumerate() {
            let mut entity = Entity::new(format!("sphere{index}"));
            entity.transform.set_position(grid.position(row, column));
            entity.set_model_mesh(mesh);
            entity.set_model_material(material);
            scene.spawn(entity);
        }
        info!(side = grid.side(), spheres = grid.len(), "sphere grid created");

        let camera = Camera::new(
            config.fov_degrees,
            config.width as f32,
            config.height as f32,
            config.near,
            config.far,
        );
        let controller = FirstPersonController::new(camera)
            .with_position(config.camera_position)
            .with_speed(config.camera_speed)
            .with_look_sensitivity(config.look_sensitivity);

        Self {
            scene,
            grid,
            material,
            controller,
            frame: FrameRecorder::new(uniform_alignment),
        }
    }

    pub fn scene(&self) -> &Scene<M> {
        &self.scene
    }

    pub fn grid(&self) -> &SphereGrid {
        &self.grid
    }

    pub fn controller(&self) -> &FirstPersonController {
        &self.controller
    }

    /// The material every sphere is drawn with.
    pub fn material(&self) -> Option<&Material> {
        self.scene.material(self.material)
    }

    /// The most recently recorded frame.
    pub fn recorded(&self) -> &FrameRecorder {
        &self.frame
    }

    /// Records one frame for a viewport of the given size, `dt` seconds
    /// after the previous one.
    pub fn frame(&mut self, input: &Input, viewport: UVec2, dt: f32) -> &FrameRecorder {
        let Self {
            scene,
            grid,
            material,
            controller,
            frame,
        } = self;

        frame.begin(CLEAR_COLOR, viewport);

        controller.update(input, viewport, input.cursor_position(), dt);

        let (entities, materials) = scene.entities_and_materials_mut();
        let Some(shared) = materials.get_mut(material.0) else {
            warn!("shared material missing, frame skipped");
            return frame;
        };
        report(shared.set_matrix(CAMERA_MATRIX, controller.camera_matrix()));

        report(shared.set_float(AMBIENT_OCCLUSION, AMBIENT_OCCLUSION_VALUE));
        report(shared.set_vec3(CAMERA_POSITION, controller.position()));
        report(shared.set_vec3(ALBEDO, BASE_ALBEDO));

        for (row, spheres) in entities.chunks_mut(grid.side()).enumerate() {
            report(shared.set_float(METALLIC, grid.metallic(row)));
            for (column, sphere) in spheres.iter_mut().enumerate() {
                report(shared.set_float(ROUGHNESS, grid.roughness(column)));
                let mut bound = shared.bind(frame);
                sphere.update(&mut bound);
                sphere.draw(bound);
            }
        }

        frame
    }

    /// Releases the scene in dependency order.
    pub fn shutdown(self) -> ReleaseReport {
        self.scene.shutdown()
    }
}

fn report(result: Result<(), MaterialError>) {
    if let Err(err) = result {
        warn!("{err}");
    }
}
