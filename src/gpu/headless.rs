use std::collections::{BTreeMap, HashMap};

use crate::error::{GpuError, GpuResult};

use super::{BufferId, BufferUsage, GraphicsDevice, ShaderProgram, UniformBlockIndex, UniformValue};

/// CPU-resident device used by headless runs and tests.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: Vec<HeadlessBuffer>,
    bindings: BTreeMap<u32, BufferId>,
    writes: usize,
}

#[derive(Debug)]
struct HeadlessBuffer {
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of a buffer.
    pub fn contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(|b| b.data.as_slice())
    }

    pub fn label(&self, buffer: BufferId) -> Option<&str> {
        self.buffers.get(buffer.index()).map(|b| b.label.as_str())
    }

    pub fn usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        self.buffers.get(buffer.index()).map(|b| b.usage)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of partial writes issued so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&mut self, label: &str, size: u64, usage: BufferUsage) -> BufferId {
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(HeadlessBuffer {
            label: label.to_string(),
            usage,
            data: vec![0; size as usize],
        });
        id
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> GpuResult<()> {
        let target = self
            .buffers
            .get_mut(buffer.index())
            .ok_or(GpuError::UnknownBuffer(buffer))?;
        let size = target.data.len() as u64;
        let end = match offset.checked_add(data.len() as u64) {
            Some(end) if end <= size => end as usize,
            _ => {
                return Err(GpuError::WriteOutOfBounds {
                    offset,
                    len: data.len(),
                    size,
                })
            }
        };
        target.data[offset as usize..end].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }

    fn bind_buffer_base(&mut self, binding: u32, buffer: BufferId) -> GpuResult<()> {
        if buffer.index() >= self.buffers.len() {
            return Err(GpuError::UnknownBuffer(buffer));
        }
        self.bindings.insert(binding, buffer);
        Ok(())
    }

    fn bound_buffer(&self, binding: u32) -> Option<BufferId> {
        self.bindings.get(&binding).copied()
    }
}

/// Shader program stand-in that records block bindings and uniforms.
#[derive(Debug, Clone)]
pub struct HeadlessProgram {
    label: String,
    blocks: Vec<String>,
    block_bindings: HashMap<u32, u32>,
    uniform_names: Vec<String>,
    uniforms: HashMap<String, UniformValue>,
}

impl HeadlessProgram {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            blocks: Vec::new(),
            block_bindings: HashMap::new(),
            uniform_names: Vec::new(),
            uniforms: HashMap::new(),
        }
    }

    /// Declares a uniform block; its index is the declaration order.
    pub fn with_block(mut self, name: impl Into<String>) -> Self {
        self.blocks.push(name.into());
        self
    }

    /// Declares a named uniform.
    pub fn with_uniform(mut self, name: impl Into<String>) -> Self {
        self.uniform_names.push(name.into());
        self
    }

    /// Binding point associated with the named block, if bound.
    pub fn block_binding(&self, block: &str) -> Option<u32> {
        let index = self.uniform_block_index(block)?;
        self.block_bindings.get(&index.0).copied()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

impl ShaderProgram for HeadlessProgram {
    fn label(&self) -> &str {
        &self.label
    }

    fn uniform_block_index(&self, block: &str) -> Option<UniformBlockIndex> {
        self.blocks
            .iter()
            .position(|name| name == block)
            .map(|index| UniformBlockIndex(index as u32))
    }

    fn bind_uniform_block(&mut self, index: UniformBlockIndex, binding: u32) -> GpuResult<()> {
        if index.0 as usize >= self.blocks.len() {
            return Err(GpuError::MissingUniformBlock {
                program: self.label.clone(),
                block: format!("#{}", index.0),
            });
        }
        self.block_bindings.insert(index.0, binding);
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
        if !self.uniform_names.iter().any(|declared| declared == name) {
            return false;
        }
        self.uniforms.insert(name.to_string(), value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_write_leaves_other_bytes_alone() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer("scratch", 8, BufferUsage::Uniform);
        device.write_buffer(buffer, 0, &[7; 8]).unwrap();
        device.write_buffer(buffer, 2, &[1, 2]).unwrap();
        assert_eq!(device.contents(buffer).unwrap(), &[7, 7, 1, 2, 7, 7, 7, 7]);
        assert_eq!(device.write_count(), 2);
    }

    #[test]
    fn out_of_bounds_write_is_rejected() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer("scratch", 4, BufferUsage::Uniform);
        let err = device.write_buffer(buffer, 2, &[0; 4]).unwrap_err();
        assert!(matches!(err, GpuError::WriteOutOfBounds { size: 4, .. }));
    }

    #[test]
    fn offset_past_u64_range_is_rejected() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer("scratch", 16, BufferUsage::Uniform);
        let err = device.write_buffer(buffer, u64::MAX, &[1, 2]).unwrap_err();
        assert_eq!(
            err,
            GpuError::WriteOutOfBounds {
                offset: u64::MAX,
                len: 2,
                size: 16
            }
        );
        assert_eq!(device.contents(buffer).unwrap(), &[0; 16]);
        assert_eq!(device.write_count(), 0);
    }

    #[test]
    fn binding_unknown_buffer_fails() {
        let mut device = HeadlessDevice::new();
        assert!(device.bind_buffer_base(0, BufferId(3)).is_err());
        assert_eq!(device.bound_buffer(0), None);
    }

    #[test]
    fn program_ignores_undeclared_uniforms() {
        let mut program = HeadlessProgram::new("phong").with_uniform("view");
        assert!(program.set_uniform("view", UniformValue::Float(1.0)));
        assert!(!program.set_uniform("model", UniformValue::Float(1.0)));
        assert_eq!(program.uniform("view"), Some(UniformValue::Float(1.0)));
    }
}
