//! Building blocks of the lantern viewer: a first-person camera rig, a
//! capacity-limited light registry and the std140 packing of that registry
//! into the `Lights` uniform block.
//!
//! Everything except [`render`] talks to the GPU through the narrow traits
//! in [`gpu`], so the core runs headless in tests and tools.

pub mod app;
pub mod camera;
pub mod error;
pub mod gpu;
pub mod input;
pub mod light_buffer;
pub mod lights;
pub mod mesh;
pub mod render;
pub mod scene;

pub use app::{FrameDriver, FrameUniforms, LightAnimation};
pub use camera::FlyCamera;
pub use error::{GpuError, LightError, LightKind};
pub use gpu::{
    BufferId, BufferUsage, GraphicsDevice, HeadlessDevice, HeadlessProgram, ShaderProgram,
    UniformBlockIndex, UniformValue,
};
pub use input::{InputState, KeyCode, NamedKey};
pub use light_buffer::{LightBufferPacker, LIGHT_BLOCK_BINDING, LIGHT_BLOCK_NAME, LIGHT_BLOCK_SIZE};
pub use lights::{
    DirectionalLight, DirectionalLightId, LightRegistry, PunctualLight, PunctualLightId, SpotCone,
    MAX_DIRECTIONAL_LIGHTS, MAX_PUNCTUAL_LIGHTS,
};
pub use mesh::{MeshData, Vertex};
pub use render::{Renderer, WgpuDevice, WgslProgram};
pub use scene::{MeshSource, SceneDescription, SceneObject};
