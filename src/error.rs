//! Error types shared by the light registry and the GPU collaborators.

use thiserror::Error;

use crate::gpu::BufferId;

/// Which of the two fixed-size light arrays an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Punctual,
}

impl std::fmt::Display for LightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directional => f.write_str("directional"),
            Self::Punctual => f.write_str("punctual"),
        }
    }
}

/// Errors raised while authoring the light registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LightError {
    #[error("cannot attach more than {max} {kind} lights")]
    CapacityExceeded { kind: LightKind, max: usize },
}

/// Errors raised by the graphics device and shader program collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("shader program `{program}` does not declare uniform block `{block}`")]
    MissingUniformBlock { program: String, block: String },

    #[error(
        "shader program `{program}` declares block `{block}` at binding {declared}, \
         but binding {requested} was requested"
    )]
    BindingMismatch {
        program: String,
        block: String,
        declared: u32,
        requested: u32,
    },

    #[error("unknown buffer handle {0:?}")]
    UnknownBuffer(BufferId),

    #[error("write of {len} bytes at offset {offset} overruns buffer of {size} bytes")]
    WriteOutOfBounds { offset: u64, len: usize, size: u64 },
}

pub type GpuResult<T> = Result<T, GpuError>;
