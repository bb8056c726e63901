//! The seam between the scene compositor and a graphics API.
//!
//! [`RenderBackend`] is deliberately small: offscreen target lifecycle,
//! layer passes, named shader uniforms, mesh and billboard draws, and textured
//! composites. [`crate::WgpuBackend`] drives a real GPU and
//! [`crate::RecordingBackend`] records calls for tests and headless runs.

use glam::{Mat4, Vec3, Vec4};

/// Handle to an offscreen colour+depth target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// Colour used to clear a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearColor(pub Vec4);

impl ClearColor {
    pub const BLACK: Self = Self(Vec4::new(0.0, 0.0, 0.0, 1.0));
    pub const TRANSPARENT: Self = Self(Vec4::ZERO);
}

/// How fragments combine with what is already in the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Premultiplied-alpha "over".
    Alpha,
    /// `src + dst`.
    Additive,
    /// Overwrite, alpha included.
    Replace,
}

/// Which triangle faces are discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullFace {
    None,
    Front,
    Back,
}

/// Fixed-function state for one layer pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerState {
    pub cull: CullFace,
    pub blend: BlendMode,
    pub depth_write: bool,
}

/// Post-filter applied while compositing a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositeFilter {
    None,
    /// Edge-aware anti-aliasing.
    Fxaa,
}

/// Opaque shader program handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    Crystal,
    Tunnel,
    Orb,
}

/// Built-in meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKind {
    CrystalRod,
    Tunnel,
}

/// A value pushed to a named shader uniform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Vec3(Vec3),
    Float(f32),
    Mat4(Mat4),
    Int(i32),
}

/// Camera data shared by every 3D draw of a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    pub view_proj: Mat4,
    pub eye: Vec3,
    /// World-space right axis, for billboards.
    pub right: Vec3,
    /// World-space up axis, for billboards.
    pub up: Vec3,
}

/// Graphics operations the compositor needs.
pub trait RenderBackend {
    /// Allocate an offscreen target. Fatal on failure, like the platform calls
    /// it wraps.
    fn allocate_target(&mut self, width: u32, height: u32, label: &str) -> RenderTarget;

    fn free_target(&mut self, target: RenderTarget);

    /// Targets allocated and not yet freed.
    fn live_targets(&self) -> Vec<RenderTarget>;

    /// Reconfigure the presentation surface.
    fn resize_surface(&mut self, _width: u32, _height: u32) {}

    /// Start a frame. `false` means no frame can be drawn now; skip rendering.
    fn begin_frame(&mut self) -> bool;

    /// Submit and present.
    fn end_frame(&mut self);

    fn set_camera(&mut self, camera: &CameraFrame);

    /// Begin drawing into `target`, cleared to `clear`.
    fn begin_layer(&mut self, target: RenderTarget, clear: ClearColor, state: LayerState);

    fn end_layer(&mut self);

    /// Begin compositing into the visible frame.
    fn begin_backbuffer(&mut self, clear: ClearColor);

    /// Push a named uniform. Unknown names are ignored with a warning.
    fn set_uniform(&mut self, program: ShaderProgram, name: &str, value: UniformValue);

    /// Draw a mesh. `depth_write = false` overrides the layer for this draw.
    fn draw_mesh(
        &mut self,
        program: ShaderProgram,
        mesh: MeshKind,
        model: Mat4,
        normal: Mat4,
        tint: Vec4,
        depth_write: bool,
    );

    /// Camera-facing glow sprite of `size` world units.
    fn draw_billboard(&mut self, center: Vec3, size: f32, color: Vec4);

    /// Draw `target` over the whole frame, tinted.
    fn composite(
        &mut self,
        target: RenderTarget,
        tint: Vec4,
        blend: BlendMode,
        filter: CompositeFilter,
    );

    /// Screen-space text; `x`/`y` is the top-left corner in pixels.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Vec4);
}
