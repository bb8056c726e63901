//! Three-layer scene composition.
//!
//! Tunnel, orbs and clock are each drawn into their own offscreen target and
//! then blended onto the frame: tunnel (alpha), clock (additive, optionally
//! anti-aliased), the date/time overlay, then orbs (additive) on top.

use glam::{Vec3, Vec4};

use crystal_core::scene::{
    DIR_LIGHT, ORB_BILLBOARD_SIZE, ORB_COUNT, ORB_LIGHT, TRAIL_BILLBOARD_SIZE, TUNNEL_LIGHT,
    CRYSTAL_MATERIAL, tunnel_model, tunnel_normal,
};
use crystal_core::state::FrameParams;

use crate::backend::{
    BlendMode, ClearColor, CompositeFilter, CullFace, LayerState, MeshKind, RenderBackend,
    RenderTarget, ShaderProgram, UniformValue,
};
use crate::camera::Camera;
use crate::text;

/// Text height used until the host sets one, pixels.
pub const DEFAULT_TEXT_SIZE: f32 = 30.0;
/// Distance of the date/time text from the window edges, pixels.
pub const TEXT_MARGIN: f32 = 10.0;

const TUNNEL_PASS: LayerState = LayerState {
    cull: CullFace::Front,
    blend: BlendMode::Replace,
    depth_write: true,
};
const ORB_PASS: LayerState = LayerState {
    cull: CullFace::None,
    blend: BlendMode::Additive,
    depth_write: false,
};
const CLOCK_PASS: LayerState = LayerState {
    cull: CullFace::None,
    blend: BlendMode::Additive,
    depth_write: true,
};

/// Tunnel alpha is zero so its layer adds onto the frame.
const TUNNEL_TINT: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.0);

#[derive(Clone, Copy, Debug, PartialEq)]
struct Layers {
    tunnel: RenderTarget,
    orbs: RenderTarget,
    clock: RenderTarget,
}

impl Layers {
    fn allocate<B: RenderBackend>(backend: &mut B, width: u32, height: u32) -> Self {
        Self {
            tunnel: backend.allocate_target(width, height, "tunnel-layer"),
            orbs: backend.allocate_target(width, height, "orbs-layer"),
            clock: backend.allocate_target(width, height, "clock-layer"),
        }
    }

    fn free<B: RenderBackend>(self, backend: &mut B) {
        backend.free_target(self.tunnel);
        backend.free_target(self.orbs);
        backend.free_target(self.clock);
    }
}

/// Owns the layer targets and the camera, and draws [`FrameParams`].
pub struct SceneCompositor<B: RenderBackend> {
    backend: B,
    width: u32,
    height: u32,
    camera: Camera,
    layers: Option<Layers>,
    text_size: f32,
}

impl<B: RenderBackend> SceneCompositor<B> {
    /// Allocate the layers and push the lighting that never changes.
    pub fn new(mut backend: B, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let layers = Layers::allocate(&mut backend, width, height);
        let mut compositor = Self {
            backend,
            width,
            height,
            camera: Camera::for_window(width, height),
            layers: Some(layers),
            text_size: DEFAULT_TEXT_SIZE,
        };
        compositor.push_static_uniforms();
        compositor.push_resolution();
        log::info!("Scene compositor ready at {width}x{height}");
        compositor
    }

    fn push_static_uniforms(&mut self) {
        use ShaderProgram::{Crystal, Tunnel};
        use UniformValue::{Float, Vec3 as V3};

        let b = &mut self.backend;
        b.set_uniform(Crystal, "material.ambient", V3(CRYSTAL_MATERIAL.ambient));
        b.set_uniform(Crystal, "material.diffuse", V3(CRYSTAL_MATERIAL.diffuse));
        b.set_uniform(Crystal, "material.specular", V3(CRYSTAL_MATERIAL.specular));
        b.set_uniform(Crystal, "material.shininess", Float(CRYSTAL_MATERIAL.shininess));

        b.set_uniform(Crystal, "dirLight.direction", V3(DIR_LIGHT.direction));
        b.set_uniform(Crystal, "dirLight.ambient", V3(DIR_LIGHT.ambient));
        b.set_uniform(Crystal, "dirLight.diffuse", V3(DIR_LIGHT.diffuse));
        b.set_uniform(Crystal, "dirLight.specular", V3(DIR_LIGHT.specular));

        for i in 0..ORB_COUNT {
            let field = |name: &str| format!("pointLights[{i}].{name}");
            b.set_uniform(Crystal, &field("ambient"), V3(ORB_LIGHT.ambient));
            b.set_uniform(Crystal, &field("diffuse"), V3(ORB_LIGHT.diffuse));
            b.set_uniform(Crystal, &field("specular"), V3(ORB_LIGHT.specular));
            b.set_uniform(Crystal, &field("constant"), Float(ORB_LIGHT.constant));
            b.set_uniform(Crystal, &field("linear"), Float(ORB_LIGHT.linear));
            b.set_uniform(Crystal, &field("quadratic"), Float(ORB_LIGHT.quadratic));
        }

        b.set_uniform(Tunnel, "tunlight.ambient", V3(TUNNEL_LIGHT.ambient));
        b.set_uniform(Tunnel, "tunlight.diffuse", V3(TUNNEL_LIGHT.diffuse));
        b.set_uniform(Tunnel, "tunlight.constant", Float(TUNNEL_LIGHT.constant));
        b.set_uniform(Tunnel, "tunlight.linear", Float(TUNNEL_LIGHT.linear));
        b.set_uniform(Tunnel, "tunlight.quadratic", Float(TUNNEL_LIGHT.quadratic));
    }

    fn push_resolution(&mut self) {
        let resolution = Vec3::new(self.width as f32, self.height as f32, 0.0);
        self.backend
            .set_uniform(ShaderProgram::Tunnel, "resolution", UniformValue::Vec3(resolution));
    }

    /// Reallocate the layers for a new window size.
    ///
    /// Zero or unchanged sizes and fullscreen windows are ignored. Returns
    /// whether the layers were rebuilt.
    pub fn resize(&mut self, width: u32, height: u32, fullscreen: bool) -> bool {
        if fullscreen || width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return false;
        }
        if let Some(layers) = self.layers.take() {
            layers.free(&mut self.backend);
        }
        self.layers = Some(Layers::allocate(&mut self.backend, width, height));
        self.width = width;
        self.height = height;
        self.camera.resize(width, height);
        self.backend.resize_surface(width, height);
        self.push_resolution();
        log::debug!(
            "Layers resized to {width}x{height}, vertical FOV {:.2}",
            self.camera.fov_y
        );
        true
    }

    /// Current vertical field of view, degrees.
    pub fn vertical_fov(&self) -> f32 {
        self.camera.fov_y
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn text_size(&self) -> f32 {
        self.text_size
    }

    pub fn set_text_size(&mut self, size: f32) {
        if size > 0.0 && size.is_finite() {
            self.text_size = size;
        } else {
            log::warn!("Ignoring text size {size}");
        }
    }

    /// Draw one frame. Returns `false` if the backend had no frame to draw.
    pub fn render(&mut self, frame: &FrameParams, antialias: bool) -> bool {
        let Some(layers) = self.layers else {
            log::warn!("Render after shutdown ignored");
            return false;
        };
        if !self.backend.begin_frame() {
            return false;
        }

        let camera = self.camera.frame();
        self.backend.set_camera(&camera);
        let visible = frame.clock_visible();

        if visible {
            self.push_frame_uniforms(frame, camera.eye);
            self.draw_tunnel(layers.tunnel);
        }
        self.draw_orbs(layers.orbs, frame);
        if visible {
            self.draw_clock(layers.clock, frame);
        }

        let b = &mut self.backend;
        b.begin_backbuffer(ClearColor::BLACK);
        if visible {
            b.composite(layers.tunnel, frame.clock_tint, BlendMode::Alpha, CompositeFilter::None);
            let filter = if antialias && frame.show_clock && !frame.fading {
                CompositeFilter::Fxaa
            } else {
                CompositeFilter::None
            };
            b.composite(layers.clock, frame.clock_tint, BlendMode::Additive, filter);
            if frame.show_time {
                self.draw_date_time(frame);
            }
        }
        self.backend.composite(
            layers.orbs,
            frame.orb_tint,
            BlendMode::Additive,
            CompositeFilter::None,
        );
        self.backend.end_frame();
        true
    }

    fn push_frame_uniforms(&mut self, frame: &FrameParams, eye: Vec3) {
        use ShaderProgram::{Crystal, Tunnel};

        let b = &mut self.backend;
        b.set_uniform(Tunnel, "time", UniformValue::Float(frame.elapsed));
        b.set_uniform(Tunnel, "model", UniformValue::Mat4(tunnel_model()));
        b.set_uniform(Tunnel, "mNormal", UniformValue::Mat4(tunnel_normal()));
        b.set_uniform(Crystal, "material.diffuse", UniformValue::Vec3(frame.prism_color));
        b.set_uniform(Crystal, "material.ambient", UniformValue::Vec3(frame.prism_color));
        b.set_uniform(Crystal, "viewPos", UniformValue::Vec3(eye));
        b.set_uniform(Tunnel, "viewPos", UniformValue::Vec3(eye));
        b.set_uniform(Tunnel, "tunlight.position", UniformValue::Vec3(eye));
    }

    fn draw_tunnel(&mut self, target: RenderTarget) {
        let b = &mut self.backend;
        b.begin_layer(target, ClearColor::BLACK, TUNNEL_PASS);
        b.draw_mesh(
            ShaderProgram::Tunnel,
            MeshKind::Tunnel,
            tunnel_model(),
            tunnel_normal(),
            TUNNEL_TINT,
            true,
        );
        b.end_layer();
    }

    fn draw_orbs(&mut self, target: RenderTarget, frame: &FrameParams) {
        let b = &mut self.backend;
        b.begin_layer(target, ClearColor::TRANSPARENT, ORB_PASS);
        for (i, position) in frame.orbs.positions.iter().enumerate() {
            b.set_uniform(
                ShaderProgram::Crystal,
                &format!("pointLights[{i}].position"),
                UniformValue::Vec3(*position),
            );
            b.draw_billboard(*position, ORB_BILLBOARD_SIZE, Vec4::ONE);
            let trail = frame.orbs.trails.get(i).map(Vec::as_slice).unwrap_or_default();
            for sample in trail.iter().filter(|s| s.alpha > 0.0) {
                b.draw_billboard(
                    sample.position,
                    TRAIL_BILLBOARD_SIZE,
                    Vec4::new(1.0, 1.0, 1.0, sample.alpha),
                );
            }
        }
        b.end_layer();
    }

    fn draw_clock(&mut self, target: RenderTarget, frame: &FrameParams) {
        let b = &mut self.backend;
        b.begin_layer(target, ClearColor::TRANSPARENT, CLOCK_PASS);
        for rod in &frame.rods {
            b.draw_mesh(
                ShaderProgram::Crystal,
                MeshKind::CrystalRod,
                rod.model,
                rod.normal,
                Vec4::ONE,
                rod.depth_write,
            );
        }
        b.end_layer();
    }

    /// Date at the top left, time at the top right.
    fn draw_date_time(&mut self, frame: &FrameParams) {
        let date = frame.sample.format_date();
        let time = frame.sample.format_time();
        let size = self.text_size;
        let time_x = self.width as f32 - text::measure(&time, size) - TEXT_MARGIN;
        self.backend
            .draw_text(&date, TEXT_MARGIN, TEXT_MARGIN, size, Vec4::ONE);
        self.backend
            .draw_text(&time, time_x, TEXT_MARGIN, size, Vec4::ONE);
    }

    /// Free every layer. Rendering afterwards is a no-op.
    pub fn shutdown(&mut self) {
        if let Some(layers) = self.layers.take() {
            layers.free(&mut self.backend);
            log::info!("Scene compositor released its layers");
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Release the layers and hand the backend back.
    pub fn into_backend(mut self) -> B {
        self.shutdown();
        self.backend
    }
}
