//! Per-frame timing and draw recording.
//!
//! A frame is recorded on the CPU first and replayed on the GPU afterwards.
//! Every material bind copies the material's parameter block into the
//! frame's uniform arena at its own aligned offset, so each draw sees the
//! parameter values that were current when its material was bound.

use std::time::Instant;

use glam::UVec2;

use crate::entity::MeshId;

/// Measures the time between consecutive reads.
///
/// Each [`tick`](Self::tick) returns the seconds elapsed since the previous
/// tick (or construction) and restarts the measurement.
#[derive(Debug)]
pub struct FrameTimer {
    last: Instant,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the last tick; resets the timer to zero.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt
    }
}

/// A mesh draw together with the uniform snapshot it reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub mesh: MeshId,
    /// Byte offset of the bound parameter block in the frame's uniform arena.
    pub uniform_offset: u32,
}

/// Everything one frame asks the GPU to do, in submission order.
#[derive(Debug)]
pub struct FrameRecorder {
    clear_color: wgpu::Color,
    viewport: UVec2,
    alignment: u32,
    uniforms: Vec<u8>,
    draws: Vec<DrawCommand>,
}

impl FrameRecorder {
    /// Creates an empty recorder whose uniform blocks start on multiples of
    /// `alignment` (the device's minimum uniform buffer offset alignment).
    pub fn new(alignment: u32) -> Self {
        Self {
            clear_color: wgpu::Color::BLACK,
            viewport: UVec2::ZERO,
            alignment: alignment.max(1),
            uniforms: Vec::new(),
            draws: Vec::new(),
        }
    }

    /// Starts a new frame: drops the previous frame's draws and uniforms,
    /// and records the clear color and viewport.
    pub fn begin(&mut self, clear_color: wgpu::Color, viewport: UVec2) {
        self.clear_color = clear_color;
        self.viewport = viewport;
        self.uniforms.clear();
        self.draws.clear();
    }

    pub fn clear_color(&self) -> wgpu::Color {
        self.clear_color
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    /// Recorded draws in the order they were issued.
    pub fn draws(&self) -> &[DrawCommand] {
        &self.draws
    }

    /// The whole uniform arena, ready for a single buffer upload.
    pub fn uniforms(&self) -> &[u8] {
        &self.uniforms
    }

    /// The `len` byte block a draw reads.
    pub fn uniform_block(&self, draw: &DrawCommand, len: usize) -> &[u8] {
        let start = draw.uniform_offset as usize;
        &self.uniforms[start..start + len]
    }

    /// Appends a parameter block at the next aligned offset and returns it.
    pub(crate) fn push_uniforms(&mut self, block: &[u8]) -> u32 {
        let alignment = self.alignment as usize;
        let offset = self.uniforms.len().div_ceil(alignment) * alignment;
        self.uniforms.resize(offset, 0);
        self.uniforms.extend_from_slice(block);
        offset as u32
    }

    pub(crate) fn uniforms_mut(&mut self, offset: u32, len: usize) -> &mut [u8] {
        let start = offset as usize;
        &mut self.uniforms[start..start + len]
    }

    pub(crate) fn push_draw(&mut self, draw: DrawCommand) {
        self.draws.push(draw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_measures_since_last_tick() {
        let mut timer = FrameTimer::new();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let first = timer.tick();
        let second = timer.tick();

        assert!(first >= 0.02);
        // The second read starts from the reset, not from construction.
        assert!(second < first);
    }

    #[test]
    fn uniform_blocks_are_aligned() {
        let mut frame = FrameRecorder::new(256);
        let a = frame.push_uniforms(&[1; 240]);
        let b = frame.push_uniforms(&[2; 240]);
        let c = frame.push_uniforms(&[3; 16]);

        assert_eq!((a, b, c), (0, 256, 512));
        assert_eq!(frame.uniforms().len(), 528);
        assert!(frame.uniforms()[240..256].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn begin_resets_the_frame() {
        let mut frame = FrameRecorder::new(256);
        let offset = frame.push_uniforms(&[7; 64]);
        frame.push_draw(DrawCommand {
            mesh: MeshId(0),
            uniform_offset: offset,
        });

        frame.begin(wgpu::Color::WHITE, UVec2::new(800, 600));
        assert!(frame.draws().is_empty());
        assert!(frame.uniforms().is_empty());
        assert_eq!(frame.viewport(), UVec2::new(800, 600));
        assert_eq!(frame.clear_color(), wgpu::Color::WHITE);
    }
}
