//! Window, event loop and startup.
//!
//! [`run`] opens the window, brings up the GPU, loads the shaders and the
//! sphere mesh, then hands every redraw to the [`RenderLoop`]. The
//! application moves through `Pending -> Running -> Terminated`; a startup
//! failure ends in `Failed` and is returned from [`run`].

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use glam::{UVec2, Vec3};
use thiserror::Error;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::frame::FrameTimer;
use crate::geometry::{GeometryError, RawGeometry};
use crate::gpu::{GpuContext, GpuError};
use crate::input::Input;
use crate::material::{ShaderError, ShaderProgram, ShaderSource};
use crate::mesh::Mesh;
use crate::pbr_pass::PbrPass;
use crate::render_loop::{RenderLoop, pbr_uniform_layout};

/// Configuration for the app window and the scene.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Spheres per row and per column.
    pub grid_side: usize,
    /// Requested MSAA sample count.
    pub sample_count: u32,
    pub camera_position: Vec3,
    /// World units per second.
    pub camera_speed: f32,
    /// Radians turned per viewport width of cursor travel.
    pub look_sensitivity: f32,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub sphere_mesh: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "PBR Spheres".to_string(),
            width: 800,
            height: 600,
            fov_degrees: 90.0,
            near: 0.1,
            far: 100.0,
            grid_side: 10,
            sample_count: 4,
            camera_position: Vec3::new(1.4, -1.4, 8.0),
            camera_speed: 5.0,
            look_sensitivity: std::f32::consts::PI,
            vertex_shader: PathBuf::from("shaders/default_vertex.wgsl"),
            fragment_shader: PathBuf::from("shaders/pbr_fragment.wgsl"),
            sphere_mesh: PathBuf::from("assets/sphere.obj"),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn grid_side(mut self, side: usize) -> Self {
        self.grid_side = side;
        self
    }

    pub fn sample_count(mut self, samples: u32) -> Self {
        self.sample_count = samples;
        self
    }

    pub fn camera_position(mut self, position: impl Into<Vec3>) -> Self {
        self.camera_position = position.into();
        self
    }

    /// Resolves the shader and mesh paths against `root`.
    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.vertex_shader = root.join(&self.vertex_shader);
        self.fragment_shader = root.join(&self.fragment_shader);
        self.sphere_mesh = root.join(&self.sphere_mesh);
        self
    }
}

/// Anything that stops the application from reaching its first frame.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Runs the sphere grid until the window is closed.
pub fn run(config: AppConfig) -> Result<(), StartupError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PbrApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        PbrApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

enum PbrApp {
    Pending { config: AppConfig },
    Running(Box<Running>),
    Terminated,
    Failed(StartupError),
}

/// Everything alive while frames are being drawn.
///
/// Field order is drop order: scene resources go before the device.
struct Running {
    render_loop: RenderLoop<Mesh>,
    pass: PbrPass,
    gpu: GpuContext,
    input: Input,
    timer: FrameTimer,
    window: Arc<Window>,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self, StartupError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContext::new(window.clone(), config.sample_count)?;

        let program = Rc::new(ShaderProgram::new(
            "pbr",
            ShaderSource::from_file(&config.vertex_shader)?,
            ShaderSource::from_file(&config.fragment_shader)?,
            pbr_uniform_layout(),
        ));
        let pass = PbrPass::new(&gpu, &program)?;

        let sphere = RawGeometry::from_file(&config.sphere_mesh)?.upload(&gpu);
        let render_loop = RenderLoop::new(config, sphere, program, gpu.uniform_alignment());

        info!(title = %config.title, "startup complete");
        window.request_redraw();

        Ok(Self {
            render_loop,
            pass,
            gpu,
            input: Input::new(),
            timer: FrameTimer::new(),
            window,
        })
    }

    fn redraw(&mut self) {
        let dt = self.timer.tick();
        let size = self.window.inner_size();
        let viewport = UVec2::new(size.width, size.height);

        self.render_loop.frame(&self.input, viewport, dt);
        self.pass.render(
            &self.gpu,
            self.render_loop.recorded(),
            self.render_loop.scene().meshes(),
        );

        self.input.begin_frame();
        self.window.request_redraw();
    }

    /// Releases the scene before the pass and the device go away.
    fn shutdown(self) {
        let Running {
            render_loop,
            pass,
            gpu,
            window,
            ..
        } = self;

        let report = render_loop.shutdown();
        drop(pass);
        drop(gpu);
        drop(window);
        info!(?report, "shut down");
    }
}

impl PbrApp {
    fn terminate(&mut self, event_loop: &ActiveEventLoop) {
        if let PbrApp::Running(running) = std::mem::replace(self, PbrApp::Terminated) {
            running.shutdown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for PbrApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let PbrApp::Pending { config } = self else {
            return;
        };

        let started = Running::start(event_loop, config);
        *self = match started {
            Ok(running) => PbrApp::Running(Box::new(running)),
            Err(err) => {
                error!("startup failed: {err}");
                event_loop.exit();
                PbrApp::Failed(err)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let PbrApp::Running(running) = self else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.terminate(event_loop);
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                running.redraw();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn defaults_describe_the_sphere_grid() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.fov_degrees, 90.0);
        assert_eq!((config.near, config.far), (0.1, 100.0));
        assert_eq!(config.grid_side, 10);
        assert_eq!(config.sample_count, 4);
        assert_eq!(config.sphere_mesh, Path::new("assets/sphere.obj"));
    }

    #[test]
    fn builder_overrides_fields() {
        let config = AppConfig::new()
            .title("Spheres")
            .size(1280, 720)
            .grid_side(4)
            .sample_count(1)
            .camera_position([0.0, 0.0, 5.0]);

        assert_eq!(config.title, "Spheres");
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.grid_side, 4);
        assert_eq!(config.sample_count, 1);
        assert_eq!(config.camera_position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn asset_root_prefixes_every_asset_path() {
        let config = AppConfig::new().asset_root("/opt/spheres");
        assert_eq!(
            config.vertex_shader,
            Path::new("/opt/spheres/shaders/default_vertex.wgsl")
        );
        assert_eq!(
            config.fragment_shader,
            Path::new("/opt/spheres/shaders/pbr_fragment.wgsl")
        );
        assert_eq!(config.sphere_mesh, Path::new("/opt/spheres/assets/sphere.obj"));
    }

    #[test]
    fn bundled_assets_exist_at_default_paths() {
        let config = AppConfig::new().asset_root(env!("CARGO_MANIFEST_DIR"));
        assert!(ShaderSource::from_file(&config.vertex_shader).is_ok());
        assert!(ShaderSource::from_file(&config.fragment_shader).is_ok());
        assert!(config.sphere_mesh.is_file());
    }

    #[test]
    fn startup_errors_keep_the_underlying_message() {
        let shader = ShaderSource::from_file("missing/pbr_fragment.wgsl").unwrap_err();
        let err = StartupError::from(shader);
        assert!(err.to_string().contains("pbr_fragment.wgsl"));

        let geometry = RawGeometry::from_file("missing/sphere.stl").unwrap_err();
        let err = StartupError::from(geometry);
        assert_eq!(err.to_string(), "unknown geometry format: 'stl'");
    }
}
