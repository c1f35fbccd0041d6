//! GPU replay of a recorded frame.
//!
//! [`PbrPass`] turns a [`FrameRecorder`] into one render pass: it uploads
//! the frame's uniform arena in a single write, clears color and depth, and
//! issues every recorded draw with its dynamic uniform offset.
//!
//! # Architecture
//!
//! One bind group (group 0, binding 0) holds the whole arena; each draw
//! selects its parameter snapshot with a dynamic offset, so the draws of a
//! frame never overwrite each other's uniforms. The vertex and fragment
//! stages come from the program's two WGSL modules.
//!
//! # Render Targets
//!
//! The pass owns its depth buffer and, when MSAA is active, a multisampled
//! color target that resolves into the surface texture. Both are recreated
//! whenever the surface size changes.

use std::num::NonZeroU64;

use glam::UVec2;
use tracing::{debug, warn};

use crate::frame::FrameRecorder;
use crate::gpu::{DEPTH_FORMAT, GpuContext, GpuError};
use crate::material::ShaderProgram;
use crate::mesh::{Mesh, Vertex3d};

/// Draws allocated for in the initial uniform buffer.
const INITIAL_DRAW_CAPACITY: u64 = 128;

pub struct PbrPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    block_size: NonZeroU64,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    target_size: (u32, u32),
}

impl PbrPass {
    /// Builds the pipeline for `program`.
    ///
    /// Shader compilation and pipeline validation errors are returned
    /// instead of aborting.
    pub fn new(gpu: &GpuContext, program: &ShaderProgram) -> Result<Self, GpuError> {
        let device = &gpu.device;
        let block_size = program.layout().size().max(16) as u64;
        let block_size = NonZeroU64::new(block_size).unwrap_or(NonZeroU64::MIN);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(program.vertex().label.as_str()),
            source: wgpu::ShaderSource::Wgsl(program.vertex().code.as_str().into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(program.fragment().label.as_str()),
            source: wgpu::ShaderSource::Wgsl(program.fragment().code.as_str().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PBR Uniforms Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Some(block_size),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PBR Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(program.name()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: gpu.sample_count,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::Pipeline {
                label: program.name().to_string(),
                message: err.to_string(),
            });
        }

        let capacity = aligned_block(block_size.get(), gpu.uniform_alignment()) * INITIAL_DRAW_CAPACITY;
        let uniform_buffer = Self::create_uniform_buffer(gpu, capacity);
        let bind_group =
            Self::create_bind_group(gpu, &bind_group_layout, &uniform_buffer, block_size);
        let (depth_view, msaa_view) = Self::create_targets(gpu);

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            bind_group,
            block_size,
            depth_view,
            msaa_view,
            target_size: (gpu.width(), gpu.height()),
        })
    }

    fn create_uniform_buffer(gpu: &GpuContext, size: u64) -> wgpu::Buffer {
        gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("PBR Uniform Arena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
        block_size: NonZeroU64,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("PBR Uniforms"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: Some(block_size),
                }),
            }],
        })
    }

    fn create_targets(gpu: &GpuContext) -> (wgpu::TextureView, Option<wgpu::TextureView>) {
        let size = wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
            depth_or_array_layers: 1,
        };

        let depth = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: gpu.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let msaa = (gpu.sample_count > 1).then(|| {
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("MSAA Color Texture"),
                    size,
                    mip_level_count: 1,
                    sample_count: gpu.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: gpu.config.format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        (
            depth.create_view(&wgpu::TextureViewDescriptor::default()),
            msaa,
        )
    }

    /// Recreates the depth and MSAA targets if the surface was resized.
    pub fn ensure_target_size(&mut self, gpu: &GpuContext) {
        if self.target_size != (gpu.width(), gpu.height()) {
            let (depth_view, msaa_view) = Self::create_targets(gpu);
            self.depth_view = depth_view;
            self.msaa_view = msaa_view;
            self.target_size = (gpu.width(), gpu.height());
        }
    }

    /// Grows the uniform buffer to hold `len` bytes.
    fn ensure_uniform_capacity(&mut self, gpu: &GpuContext, len: u64) {
        let current = self.uniform_buffer.size();
        let required = grown_capacity(current, len);
        if required != current {
            debug!(from = current, to = required, "growing uniform arena");
            self.uniform_buffer = Self::create_uniform_buffer(gpu, required);
            self.bind_group = Self::create_bind_group(
                gpu,
                &self.bind_group_layout,
                &self.uniform_buffer,
                self.block_size,
            );
        }
    }

    /// Replays `frame` onto the surface and presents it.
    ///
    /// Lost or outdated surfaces are reconfigured and the frame is skipped;
    /// any other acquisition failure is logged and the frame is skipped.
    pub fn render(&mut self, gpu: &GpuContext, frame: &FrameRecorder, meshes: &[Mesh]) {
        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost, reconfiguring");
                gpu.reconfigure();
                return;
            }
            Err(err) => {
                warn!(%err, "frame skipped");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_target_size(gpu);
        let uniforms = frame.uniforms();
        if !uniforms.is_empty() {
            self.ensure_uniform_capacity(gpu, uniforms.len() as u64);
            gpu.queue.write_buffer(&self.uniform_buffer, 0, uniforms);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("PBR Encoder"),
            });

        {
            let (color_view, resolve_target, store) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view), wgpu::StoreOp::Discard),
                None => (&view, None, wgpu::StoreOp::Store),
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("PBR Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color()),
                        store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let viewport = clamp_viewport(frame.viewport(), UVec2::new(gpu.width(), gpu.height()));
            if viewport.x > 0 && viewport.y > 0 {
                render_pass.set_viewport(0.0, 0.0, viewport.x as f32, viewport.y as f32, 0.0, 1.0);
                render_pass.set_pipeline(&self.pipeline);

                for draw in frame.draws() {
                    let Some(mesh) = meshes.get(draw.mesh.0) else {
                        warn!(mesh = ?draw.mesh, "draw skipped: unknown mesh");
                        continue;
                    };
                    render_pass.set_bind_group(0, &self.bind_group, &[draw.uniform_offset]);
                    render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

/// Stride of one parameter snapshot in the uniform arena.
fn aligned_block(block_size: u64, alignment: u32) -> u64 {
    block_size.next_multiple_of(alignment.max(1) as u64)
}

/// Buffer size able to hold `len` bytes, doubling from `current`.
fn grown_capacity(current: u64, len: u64) -> u64 {
    let mut capacity = current.max(wgpu::COPY_BUFFER_ALIGNMENT);
    while capacity < len {
        capacity *= 2;
    }
    capacity
}

/// A viewport never extends past the surface it renders to.
fn clamp_viewport(requested: UVec2, surface: UVec2) -> UVec2 {
    requested.min(surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_padded_to_the_offset_alignment() {
        assert_eq!(aligned_block(240, 256), 256);
        assert_eq!(aligned_block(256, 256), 256);
        assert_eq!(aligned_block(300, 256), 512);
        assert_eq!(aligned_block(240, 64), 256);
    }

    #[test]
    fn capacity_doubles_until_it_fits() {
        assert_eq!(grown_capacity(32_768, 25_840), 32_768);
        assert_eq!(grown_capacity(32_768, 32_769), 65_536);
        assert_eq!(grown_capacity(1024, 5000), 8192);
    }

    #[test]
    fn viewport_is_clamped_to_the_surface() {
        let surface = UVec2::new(800, 600);
        assert_eq!(clamp_viewport(UVec2::new(800, 600), surface), surface);
        assert_eq!(clamp_viewport(UVec2::new(1024, 768), surface), surface);
        assert_eq!(
            clamp_viewport(UVec2::new(640, 900), surface),
            UVec2::new(640, 600)
        );
    }
}
