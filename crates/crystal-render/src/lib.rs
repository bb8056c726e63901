//! Layered rendering for CrystalClock: a backend trait with wgpu and recording
//! implementations, generated meshes, WGSL shaders, and the compositor that
//! turns a frame snapshot into tunnel, orb and clock layers.

pub mod backend;
pub mod buffer;
pub mod camera;
pub mod compositor;
pub mod gpu;
pub mod mesh;
pub mod recording;
pub mod shaders;
pub mod surface;
pub mod text;
pub mod uniforms;
pub mod wgpu_backend;

pub use backend::{
    BlendMode, CameraFrame, ClearColor, CompositeFilter, CullFace, LayerState, MeshKind,
    RenderBackend, RenderTarget, ShaderProgram, UniformValue,
};
pub use buffer::{BufferAllocator, IndexData, MeshBuffer, VertexPositionNormalUv};
pub use camera::{Camera, vertical_fov};
pub use compositor::{DEFAULT_TEXT_SIZE, SceneCompositor};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use recording::{RecordingBackend, RenderCommand};
pub use surface::{SurfaceResize, SurfaceWrapper};
pub use wgpu_backend::WgpuBackend;
