//! Narrow interfaces to the graphics device and shader programs.
//!
//! The light buffer packer and the frame driver only talk to the GPU
//! through these traits, so they run unchanged against the wgpu backend in
//! [`crate::render`] and the in-memory [`HeadlessDevice`].

mod headless;

use glam::{Mat4, Vec3};

use crate::error::GpuResult;

pub use headless::{HeadlessDevice, HeadlessProgram};

/// Opaque handle to a buffer allocated by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

impl BufferId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a buffer will be consumed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Uniform,
    Vertex,
    Index,
}

/// Opaque index of a uniform block inside one shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformBlockIndex(pub u32);

/// Value assigned to a named (non-block) uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3(Vec3),
    Mat4(Mat4),
}

/// Buffer storage and indexed binding points.
pub trait GraphicsDevice {
    /// Allocates `size` bytes of buffer storage.
    fn create_buffer(&mut self, label: &str, size: u64, usage: BufferUsage) -> BufferId;

    /// Overwrites `data.len()` bytes of `buffer` starting at `offset`.
    /// Bytes outside that range keep whatever they held before.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> GpuResult<()>;

    /// Attaches the whole of `buffer` to the process-wide binding point.
    fn bind_buffer_base(&mut self, binding: u32, buffer: BufferId) -> GpuResult<()>;

    /// Buffer currently attached to `binding`, if any.
    fn bound_buffer(&self, binding: u32) -> Option<BufferId>;
}

/// A linked shader program as seen by the CPU side.
pub trait ShaderProgram {
    fn label(&self) -> &str;

    /// Looks up a uniform block by its declared block name.
    fn uniform_block_index(&self, block: &str) -> Option<UniformBlockIndex>;

    /// Associates a uniform block of this program with a binding point.
    fn bind_uniform_block(&mut self, index: UniformBlockIndex, binding: u32) -> GpuResult<()>;

    /// Assigns a named uniform. Returns `false` when the program has no
    /// uniform of that name.
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool;
}
