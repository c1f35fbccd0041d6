//! Core GPU context and device management.
//!
//! [`GpuContext`] holds the wgpu resources every pass needs: the surface,
//! the device and queue, the surface configuration, and the MSAA sample
//! count the adapter accepted.
//!
//! # Initialization
//!
//! A `GpuContext` is created from a winit [`Window`] and handles the wgpu
//! boilerplate: instance creation, adapter selection, device/queue creation,
//! surface configuration and sample count negotiation. Any failure along the
//! way is returned as a [`GpuError`].
//!
//! [`Window`]: winit::window::Window

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use winit::window::Window;

/// Depth buffer format shared by every depth-tested pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Errors raised while bringing up the graphics context.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create window surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("the adapter cannot present to this window")]
    UnsupportedSurface,
    #[error("failed to build pipeline `{label}`: {message}")]
    Pipeline { label: String, message: String },
}

/// Core GPU context holding wgpu resources.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
/// The context is created once at startup and passed by reference to the
/// render pass.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    /// MSAA sample count used for color and depth targets.
    pub sample_count: u32,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// This performs all wgpu initialization:
    /// 1. Creates a wgpu instance with primary backends (Vulkan, Metal, DX12)
    /// 2. Creates a surface for the window
    /// 3. Requests a suitable GPU adapter
    /// 4. Creates the logical device and command queue
    /// 5. Configures the surface with an sRGB format and Fifo present mode
    /// 6. Picks the highest sample count up to `requested_samples` that both
    ///    the surface format and the depth format support
    pub fn new(window: Arc<Window>, requested_samples: u32) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;
        info!(adapter = %adapter.get_info().name, backend = ?adapter.get_info().backend, "GPU adapter selected");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("PBR Spheres Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let color_flags = adapter.get_texture_format_features(surface_format).flags;
        let depth_flags = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
        let sample_count = pick_sample_count(requested_samples, |count| {
            color_flags.sample_count_supported(count) && depth_flags.sample_count_supported(count)
        });
        if sample_count != requested_samples {
            warn!(
                requested = requested_samples,
                using = sample_count,
                "requested MSAA sample count unsupported"
            );
        }
        info!(
            format = ?surface_format,
            width = config.width,
            height = config.height,
            samples = sample_count,
            "surface configured"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// Ignores zero-sized dimensions to avoid wgpu validation errors (which
    /// occur while the window is minimized).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reapplies the current configuration after the surface was lost.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Minimum alignment of dynamic uniform buffer offsets on this device.
    pub fn uniform_alignment(&self) -> u32 {
        self.device.limits().min_uniform_buffer_offset_alignment
    }
}

/// Highest power of two no greater than `requested` that `supported` accepts,
/// falling back to a single sample.
fn pick_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    let mut count = requested.max(1).next_power_of_two();
    if count > requested.max(1) {
        count /= 2;
    }
    while count > 1 {
        if supported(count) {
            return count;
        }
        count /= 2;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_sample_count_is_kept_when_supported() {
        assert_eq!(pick_sample_count(4, |_| true), 4);
    }

    #[test]
    fn sample_count_falls_back_to_lower_supported_count() {
        assert_eq!(pick_sample_count(8, |count| count <= 2), 2);
        assert_eq!(pick_sample_count(4, |_| false), 1);
    }

    #[test]
    fn odd_and_zero_requests_are_rounded_down() {
        assert_eq!(pick_sample_count(6, |_| true), 4);
        assert_eq!(pick_sample_count(0, |_| true), 1);
        assert_eq!(pick_sample_count(1, |_| true), 1);
    }
}
