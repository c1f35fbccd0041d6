//! Shader programs, named parameters, and material binding.
//!
//! A [`ShaderProgram`] pairs a vertex and a fragment WGSL module with a
//! [`UniformLayout`]: the table mapping parameter names to offsets inside
//! the program's uniform block. A [`Material`] holds one CPU-side copy of
//! that block and exposes named setters for it.
//!
//! Binding a material copies its block into the frame being recorded and
//! returns a [`BoundMaterial`]. Drawing requires that token, so a draw can
//! only ever be issued against an explicitly bound material. Writes made
//! through the token (the model transform) land in that draw's snapshot
//! only; writes made on the material after binding reach later binds only.
//!
//! # Example
//!
//! ```ignore
//! let layout = UniformLayout::new()
//!     .param("cameraMatrix", ParamKind::Mat4)
//!     .param("metallic", ParamKind::Float);
//! let program = Rc::new(ShaderProgram::new("pbr", vertex, fragment, layout));
//!
//! let mut material = Material::new(program);
//! material.set_float("metallic", 0.5)?;
//!
//! let mut bound = material.bind(&mut frame);
//! bound.set_matrix("worldMatrix", world)?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glam::{Mat4, Vec3, Vec4};
use thiserror::Error;

use crate::entity::MeshId;
use crate::frame::{DrawCommand, FrameRecorder};

/// Type of a named shader parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Vec3,
    Vec4,
    Mat4,
    /// A fixed-length `array<vec4<f32>, N>`.
    Vec4Array(u32),
}

impl ParamKind {
    /// Alignment in a WGSL uniform buffer.
    fn align(self) -> u32 {
        match self {
            ParamKind::Float => 4,
            ParamKind::Vec3 | ParamKind::Vec4 | ParamKind::Mat4 | ParamKind::Vec4Array(_) => 16,
        }
    }

    /// Size in a WGSL uniform buffer.
    fn size(self) -> u32 {
        match self {
            ParamKind::Float => 4,
            ParamKind::Vec3 => 12,
            ParamKind::Vec4 => 16,
            ParamKind::Mat4 => 64,
            ParamKind::Vec4Array(len) => 16 * len,
        }
    }
}

/// Location of one parameter inside a uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSlot {
    pub offset: u32,
    pub kind: ParamKind,
}

/// Named parameter offsets for one uniform struct.
///
/// Parameters are declared in the same order as the fields of the WGSL
/// struct, and offsets follow WGSL's uniform layout rules, so the block can
/// be uploaded byte for byte.
#[derive(Clone, Debug, Default)]
pub struct UniformLayout {
    slots: HashMap<String, ParamSlot>,
    end: u32,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next struct field.
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        let offset = self.end.next_multiple_of(kind.align());
        self.slots.insert(name.into(), ParamSlot { offset, kind });
        self.end = offset + kind.size();
        self
    }

    pub fn slot(&self, name: &str) -> Option<ParamSlot> {
        self.slots.get(name).copied()
    }

    /// Size of the whole struct, rounded up to its 16 byte alignment.
    pub fn size(&self) -> u32 {
        self.end.next_multiple_of(16)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Errors from named parameter access.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("uniform `{name}` not found in shader program `{program}`")]
    ParameterNotFound { program: String, name: String },
    #[error("uniform `{name}` in shader program `{program}` is {found:?}, not {expected:?}")]
    TypeMismatch {
        program: String,
        name: String,
        expected: ParamKind,
        found: ParamKind,
    },
}

/// Errors from loading shader sources.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// WGSL source text for one shader stage.
#[derive(Clone, Debug)]
pub struct ShaderSource {
    pub label: String,
    pub code: String,
}

impl ShaderSource {
    pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }

    /// Reads a shader from disk, labelled with its file name.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { label, code })
    }
}

/// A vertex and fragment stage sharing one uniform block layout.
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    vertex: ShaderSource,
    fragment: ShaderSource,
    layout: UniformLayout,
}

impl ShaderProgram {
    pub fn new(
        name: impl Into<String>,
        vertex: ShaderSource,
        fragment: ShaderSource,
        layout: UniformLayout,
    ) -> Self {
        Self {
            name: name.into(),
            vertex,
            fragment,
            layout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex(&self) -> &ShaderSource {
        &self.vertex
    }

    pub fn fragment(&self) -> &ShaderSource {
        &self.fragment
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    fn slot(&self, name: &str, expected: ParamKind) -> Result<ParamSlot, MaterialError> {
        let slot = self
            .layout
            .slot(name)
            .ok_or_else(|| MaterialError::ParameterNotFound {
                program: self.name.clone(),
                name: name.to_string(),
            })?;

        let fits = match (slot.kind, expected) {
            (ParamKind::Vec4Array(capacity), ParamKind::Vec4Array(len)) => len <= capacity,
            (found, expected) => found == expected,
        };
        if !fits {
            return Err(MaterialError::TypeMismatch {
                program: self.name.clone(),
                name: name.to_string(),
                expected,
                found: slot.kind,
            });
        }
        Ok(slot)
    }

    fn write(
        &self,
        block: &mut [u8],
        name: &str,
        kind: ParamKind,
        bytes: &[u8],
    ) -> Result<(), MaterialError> {
        let start = self.slot(name, kind)?.offset as usize;
        block[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn read<'b>(
        &self,
        block: &'b [u8],
        name: &str,
        kind: ParamKind,
    ) -> Result<&'b [u8], MaterialError> {
        let start = self.slot(name, kind)?.offset as usize;
        Ok(&block[start..start + kind.size() as usize])
    }
}

/// A shader program plus the current values of its parameters.
#[derive(Debug)]
pub struct Material {
    program: Rc<ShaderProgram>,
    block: Vec<u8>,
}

impl Material {
    /// Creates a material with every parameter zeroed.
    pub fn new(program: Rc<ShaderProgram>) -> Self {
        let block = vec![0; program.layout().size() as usize];
        Self { program, block }
    }

    pub fn program(&self) -> &Rc<ShaderProgram> {
        &self.program
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), MaterialError> {
        self.program
            .write(&mut self.block, name, ParamKind::Float, bytemuck::bytes_of(&value))
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) -> Result<(), MaterialError> {
        self.program.write(
            &mut self.block,
            name,
            ParamKind::Vec3,
            bytemuck::cast_slice(&value.to_array()),
        )
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) -> Result<(), MaterialError> {
        self.program.write(
            &mut self.block,
            name,
            ParamKind::Vec4,
            bytemuck::cast_slice(&value.to_array()),
        )
    }

    pub fn set_matrix(&mut self, name: &str, value: Mat4) -> Result<(), MaterialError> {
        self.program.write(
            &mut self.block,
            name,
            ParamKind::Mat4,
            bytemuck::cast_slice(&value.to_cols_array()),
        )
    }

    pub fn set_vec4_array(&mut self, name: &str, values: &[Vec4]) -> Result<(), MaterialError> {
        let flat: Vec<f32> = values.iter().flat_map(|v| v.to_array()).collect();
        self.program.write(
            &mut self.block,
            name,
            ParamKind::Vec4Array(values.len() as u32),
            bytemuck::cast_slice(&flat),
        )
    }

    pub fn float(&self, name: &str) -> Result<f32, MaterialError> {
        let bytes = self.program.read(&self.block, name, ParamKind::Float)?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn vec3(&self, name: &str) -> Result<Vec3, MaterialError> {
        let bytes = self.program.read(&self.block, name, ParamKind::Vec3)?;
        Ok(Vec3::from_array(bytemuck::pod_read_unaligned(bytes)))
    }

    pub fn matrix(&self, name: &str) -> Result<Mat4, MaterialError> {
        let bytes = self.program.read(&self.block, name, ParamKind::Mat4)?;
        Ok(Mat4::from_cols_array(&bytemuck::pod_read_unaligned(bytes)))
    }

    /// Snapshots the current parameters into `frame` and makes them the
    /// active state for the next draw.
    pub fn bind<'a>(&'a self, frame: &'a mut FrameRecorder) -> BoundMaterial<'a> {
        let offset = frame.push_uniforms(&self.block);
        BoundMaterial {
            program: &self.program,
            frame,
            offset,
        }
    }
}

/// Proof that a material is bound for the next draw.
///
/// Consumed by [`Entity::draw`](crate::Entity::draw). Dropping it without
/// drawing simply leaves an unused snapshot in the frame.
pub struct BoundMaterial<'a> {
    program: &'a ShaderProgram,
    frame: &'a mut FrameRecorder,
    offset: u32,
}

impl BoundMaterial<'_> {
    pub fn program(&self) -> &ShaderProgram {
        self.program
    }

    /// Offset of this snapshot in the frame's uniform arena.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), MaterialError> {
        let program = self.program;
        program.write(self.block_mut(), name, ParamKind::Float, bytemuck::bytes_of(&value))
    }

    pub fn set_matrix(&mut self, name: &str, value: Mat4) -> Result<(), MaterialError> {
        let program = self.program;
        program.write(
            self.block_mut(),
            name,
            ParamKind::Mat4,
            bytemuck::cast_slice(&value.to_cols_array()),
        )
    }

    pub fn float(&self, name: &str) -> Result<f32, MaterialError> {
        let bytes = self.program.read(self.block(), name, ParamKind::Float)?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn matrix(&self, name: &str) -> Result<Mat4, MaterialError> {
        let bytes = self.program.read(self.block(), name, ParamKind::Mat4)?;
        Ok(Mat4::from_cols_array(&bytemuck::pod_read_unaligned(bytes)))
    }

    /// Records a draw of `mesh` against this snapshot.
    pub(crate) fn submit(self, mesh: MeshId) {
        self.frame.push_draw(DrawCommand {
            mesh,
            uniform_offset: self.offset,
        });
    }

    fn block(&self) -> &[u8] {
        let start = self.offset as usize;
        &self.frame.uniforms()[start..start + self.program.layout().size() as usize]
    }

    fn block_mut(&mut self) -> &mut [u8] {
        let len = self.program.layout().size() as usize;
        self.frame.uniforms_mut(self.offset, len)
    }
}
