use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::error::{GpuError, GpuResult};
use crate::gpu::{ShaderProgram, UniformBlockIndex, UniformValue};

/// `var<uniform>` declaration found in WGSL source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockDecl {
    /// Struct type of the variable; this is the block name.
    pub block: String,
    pub variable: String,
    pub group: u32,
    pub binding: u32,
}

/// WGSL shader source plus the CPU-side view of its uniforms.
///
/// WGSL fixes resource slots in the source, so binding point `N` maps to
/// `@group(N) @binding(0)`. Associating a block with any other binding
/// point is reported as [`GpuError::BindingMismatch`].
#[derive(Debug, Clone)]
pub struct WgslProgram {
    label: String,
    source: String,
    blocks: Vec<UniformBlockDecl>,
    block_bindings: HashMap<u32, u32>,
    uniforms: HashMap<&'static str, Option<UniformValue>>,
}

impl WgslProgram {
    /// `uniforms` lists the named (non-block) values the program accepts.
    pub fn new(label: impl Into<String>, source: &str, uniforms: &[&'static str]) -> Self {
        Self {
            label: label.into(),
            source: source.to_string(),
            blocks: parse_uniform_blocks(source),
            block_bindings: HashMap::new(),
            uniforms: uniforms.iter().map(|name| (*name, None)).collect(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn blocks(&self) -> &[UniformBlockDecl] {
        &self.blocks
    }

    /// Binding point the named block was associated with, if any.
    pub fn block_binding(&self, block: &str) -> Option<u32> {
        let index = self.uniform_block_index(block)?;
        self.block_bindings.get(&index.0).copied()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied().flatten()
    }

    pub(crate) fn mat4_or_identity(&self, name: &str) -> Mat4 {
        match self.uniform(name) {
            Some(UniformValue::Mat4(value)) => value,
            _ => Mat4::IDENTITY,
        }
    }

    pub(crate) fn vec3_or_zero(&self, name: &str) -> Vec3 {
        match self.uniform(name) {
            Some(UniformValue::Vec3(value)) => value,
            _ => Vec3::ZERO,
        }
    }

    pub(crate) fn float_or(&self, name: &str, default: f32) -> f32 {
        match self.uniform(name) {
            Some(UniformValue::Float(value)) => value,
            _ => default,
        }
    }
}

impl ShaderProgram for WgslProgram {
    fn label(&self) -> &str {
        &self.label
    }

    fn uniform_block_index(&self, block: &str) -> Option<UniformBlockIndex> {
        self.blocks
            .iter()
            .position(|decl| decl.block == block)
            .map(|index| UniformBlockIndex(index as u32))
    }

    fn bind_uniform_block(&mut self, index: UniformBlockIndex, binding: u32) -> GpuResult<()> {
        let decl = self
            .blocks
            .get(index.0 as usize)
            .ok_or_else(|| GpuError::MissingUniformBlock {
                program: self.label.clone(),
                block: format!("#{}", index.0),
            })?;
        if decl.group != binding || decl.binding != 0 {
            return Err(GpuError::BindingMismatch {
                program: self.label.clone(),
                block: decl.block.clone(),
                declared: decl.group,
                requested: binding,
            });
        }
        self.block_bindings.insert(index.0, binding);
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
        match self.uniforms.get_mut(name) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }
}

const UNIFORM_VAR: &str = "var<uniform>";

fn parse_uniform_blocks(source: &str) -> Vec<UniformBlockDecl> {
    let source = strip_comments(source);
    let source = source.as_str();
    let mut blocks = Vec::new();
    for (start, _) in source.match_indices(UNIFORM_VAR) {
        let statement_start = source[..start]
            .rfind(|c| c == ';' || c == '}')
            .map_or(0, |i| i + 1);
        let attributes = &source[statement_start..start];
        let rest = &source[start + UNIFORM_VAR.len()..];
        let declaration = &rest[..rest.find(';').unwrap_or(rest.len())];
        let Some((variable, block)) = declaration.split_once(':') else {
            continue;
        };
        blocks.push(UniformBlockDecl {
            block: block.trim().to_string(),
            variable: variable.trim().to_string(),
            group: attribute_value(attributes, "@group").unwrap_or(0),
            binding: attribute_value(attributes, "@binding").unwrap_or(0),
        });
    }
    blocks
}

/// Blanks out `//` line comments and (nested) `/* */` block comments.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut depth = 0usize;
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('*')) => {
                chars.next();
                depth += 1;
            }
            ('*', Some('/')) if depth > 0 => {
                chars.next();
                depth -= 1;
            }
            ('/', Some('/')) if depth == 0 => {
                while chars.peek().is_some_and(|&next| next != '\n') {
                    chars.next();
                }
            }
            ('\n', _) => out.push('\n'),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn attribute_value(text: &str, attribute: &str) -> Option<u32> {
    let start = text.rfind(attribute)? + attribute.len();
    let args = text[start..].trim_start().strip_prefix('(')?;
    let end = args.find(')')?;
    args[..end].trim().parse().ok()
}
