//! Headless backend that records every call.

use std::collections::BTreeMap;

use glam::{Mat4, Vec3, Vec4};

use crate::backend::{
    BlendMode, CameraFrame, ClearColor, CompositeFilter, LayerState, MeshKind, RenderBackend,
    RenderTarget, ShaderProgram, UniformValue,
};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    Allocate(RenderTarget),
    Free(RenderTarget),
    ResizeSurface(u32, u32),
    BeginFrame,
    EndFrame,
    Camera(CameraFrame),
    BeginLayer(RenderTarget, ClearColor, LayerState),
    EndLayer,
    BeginBackbuffer(ClearColor),
    Uniform(ShaderProgram, String, UniformValue),
    Mesh {
        program: ShaderProgram,
        mesh: MeshKind,
        model: Mat4,
        normal: Mat4,
        tint: Vec4,
        depth_write: bool,
    },
    Billboard {
        center: Vec3,
        size: f32,
        color: Vec4,
    },
    Composite {
        target: RenderTarget,
        tint: Vec4,
        blend: BlendMode,
        filter: CompositeFilter,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
    },
}

/// Records calls and tracks live targets; draws nothing.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<RenderCommand>,
    live: BTreeMap<u32, RenderTarget>,
    next_id: u32,
    /// When set, `begin_frame` reports that no frame is available.
    pub refuse_frames: bool,
    pub frames: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands since the most recent `BeginFrame`.
    pub fn last_frame(&self) -> &[RenderCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, RenderCommand::BeginFrame))
            .unwrap_or(0);
        &self.commands[start..]
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn allocate_target(&mut self, width: u32, height: u32, _label: &str) -> RenderTarget {
        self.next_id += 1;
        let target = RenderTarget {
            id: self.next_id,
            width,
            height,
        };
        self.live.insert(target.id, target);
        self.commands.push(RenderCommand::Allocate(target));
        target
    }

    fn free_target(&mut self, target: RenderTarget) {
        if self.live.remove(&target.id).is_none() {
            log::warn!("free of unknown target {}", target.id);
        }
        self.commands.push(RenderCommand::Free(target));
    }

    fn live_targets(&self) -> Vec<RenderTarget> {
        self.live.values().copied().collect()
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.commands.push(RenderCommand::ResizeSurface(width, height));
    }

    fn begin_frame(&mut self) -> bool {
        if self.refuse_frames {
            return false;
        }
        self.commands.push(RenderCommand::BeginFrame);
        true
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.commands.push(RenderCommand::EndFrame);
    }

    fn set_camera(&mut self, camera: &CameraFrame) {
        self.commands.push(RenderCommand::Camera(*camera));
    }

    fn begin_layer(&mut self, target: RenderTarget, clear: ClearColor, state: LayerState) {
        self.commands
            .push(RenderCommand::BeginLayer(target, clear, state));
    }

    fn end_layer(&mut self) {
        self.commands.push(RenderCommand::EndLayer);
    }

    fn begin_backbuffer(&mut self, clear: ClearColor) {
        self.commands.push(RenderCommand::BeginBackbuffer(clear));
    }

    fn set_uniform(&mut self, program: ShaderProgram, name: &str, value: UniformValue) {
        self.commands
            .push(RenderCommand::Uniform(program, name.to_string(), value));
    }

    fn draw_mesh(
        &mut self,
        program: ShaderProgram,
        mesh: MeshKind,
        model: Mat4,
        normal: Mat4,
        tint: Vec4,
        depth_write: bool,
    ) {
        self.commands.push(RenderCommand::Mesh {
            program,
            mesh,
            model,
            normal,
            tint,
            depth_write,
        });
    }

    fn draw_billboard(&mut self, center: Vec3, size: f32, color: Vec4) {
        self.commands
            .push(RenderCommand::Billboard { center, size, color });
    }

    fn composite(
        &mut self,
        target: RenderTarget,
        tint: Vec4,
        blend: BlendMode,
        filter: CompositeFilter,
    ) {
        self.commands.push(RenderCommand::Composite {
            target,
            tint,
            blend,
            filter,
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, _color: Vec4) {
        self.commands.push(RenderCommand::Text {
            text: text.to_string(),
            x,
            y,
            size,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_tracked_until_freed() {
        let mut backend = RecordingBackend::new();
        let a = backend.allocate_target(640, 480, "a");
        let b = backend.allocate_target(640, 480, "b");
        assert_ne!(a.id, b.id);
        assert_eq!(backend.live_targets().len(), 2);
        backend.free_target(a);
        assert_eq!(backend.live_targets(), vec![b]);
    }

    #[test]
    fn test_refused_frame_records_nothing() {
        let mut backend = RecordingBackend {
            refuse_frames: true,
            ..Default::default()
        };
        assert!(!backend.begin_frame());
        assert!(backend.commands.is_empty());
    }

    #[test]
    fn test_last_frame_slices_from_begin() {
        let mut backend = RecordingBackend::new();
        backend.begin_frame();
        backend.end_frame();
        backend.begin_frame();
        backend.begin_backbuffer(ClearColor::BLACK);
        assert_eq!(backend.last_frame().len(), 2);
        assert_eq!(backend.frames, 1);
    }
}
