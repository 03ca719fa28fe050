mod native;
mod program;
mod shaders;

pub use native::{Renderer, WgpuDevice};
pub use program::{UniformBlockDecl, WgslProgram};
