//! GPU vertex formats and buffer helpers.

use bytemuck::{Pod, Zeroable};

/// Indexed mesh resident on the GPU.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub index_format: wgpu::IndexFormat,
}

impl MeshBuffer {
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), self.index_format);
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// 32-bit triangle-list indices.
pub struct IndexData<'a>(pub &'a [u32]);

impl IndexData<'_> {
    pub fn format(&self) -> wgpu::IndexFormat {
        wgpu::IndexFormat::Uint32
    }

    pub fn count(&self) -> u32 {
        self.0.len() as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.0)
    }
}

/// Creates immutable mesh buffers.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> BufferAllocator<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    pub fn create_mesh(&self, label: &str, vertices: &[u8], indices: IndexData) -> MeshBuffer {
        use wgpu::util::DeviceExt;

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-vertices")),
                contents: vertices,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-indices")),
                contents: indices.as_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: indices.count(),
            index_format: indices.format(),
        }
    }
}

/// Lit-mesh vertex: position, normal, texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexPositionNormalUv {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexPositionNormalUv {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        use wgpu::{VertexAttribute, VertexFormat};

        const ATTRIBUTES: [VertexAttribute; 3] = [
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x3,
            },
            VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: VertexFormat::Float32x3,
            },
            VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: VertexFormat::Float32x2,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<VertexPositionNormalUv>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// One glow sprite, expanded to a camera-facing quad in the vertex shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BillboardInstance {
    pub center: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

impl BillboardInstance {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        use wgpu::{VertexAttribute, VertexFormat};

        const ATTRIBUTES: [VertexAttribute; 2] = [
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x4,
            },
            VertexAttribute {
                offset: 16,
                shader_location: 1,
                format: VertexFormat::Float32x4,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BillboardInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Screen-space text vertex, pixels.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl TextVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        use wgpu::{VertexAttribute, VertexFormat};

        const ATTRIBUTES: [VertexAttribute; 2] = [
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
            VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: VertexFormat::Float32x4,
            },
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TextVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Growable per-frame upload buffer.
///
/// Data is appended on the CPU during the frame and uploaded once before the
/// frame's passes are encoded. The GPU buffer is recreated (doubling) when the
/// frame outgrows it.
pub struct StreamBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: wgpu::Buffer,
    capacity: u64,
    pub data: Vec<u8>,
}

impl StreamBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        capacity: u64,
    ) -> Self {
        let capacity = capacity.max(256);
        Self {
            label,
            usage,
            buffer: create_stream(device, label, usage, capacity),
            capacity,
            data: Vec::new(),
        }
    }

    /// Append `bytes` aligned to `align`; returns the byte offset.
    pub fn push(&mut self, bytes: &[u8], align: usize) -> u64 {
        let offset = self.data.len().next_multiple_of(align.max(1));
        self.data.resize(offset, 0);
        self.data.extend_from_slice(bytes);
        offset as u64
    }

    /// Upload the frame's data. Returns `true` if the GPU buffer was replaced,
    /// so bind groups referencing it must be rebuilt.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let needed = (self.data.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let mut replaced = false;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            self.buffer = create_stream(device, self.label, self.usage, self.capacity);
            log::debug!("Grew {} to {} bytes", self.label, self.capacity);
            replaced = true;
        }
        if !self.data.is_empty() {
            self.data.resize(needed as usize, 0);
            queue.write_buffer(&self.buffer, 0, &self.data);
        }
        replaced
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

fn create_stream(
    device: &wgpu::Device,
    label: &str,
    usage: wgpu::BufferUsages,
    size: u64,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
pub(crate) fn create_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()?;

        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: Default::default(),
                ..Default::default()
            })
            .await
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_strides() {
        assert_eq!(VertexPositionNormalUv::layout().array_stride, 32);
        assert_eq!(BillboardInstance::layout().array_stride, 32);
        assert_eq!(TextVertex::layout().array_stride, 24);
        assert_eq!(
            BillboardInstance::layout().step_mode,
            wgpu::VertexStepMode::Instance
        );
    }

    #[test]
    fn test_index_data_as_bytes() {
        let indices = IndexData(&[0, 1, 2]);
        assert_eq!(indices.as_bytes().len(), 12);
        assert_eq!(indices.count(), 3);
        assert_eq!(indices.format(), wgpu::IndexFormat::Uint32);
    }

    #[test]
    fn test_mesh_buffer_creation() {
        let Some((device, _queue)) = create_test_device() else {
            return;
        };
        let mesh = BufferAllocator::new(&device).create_mesh(
            "test-tri",
            &[0u8; 96],
            IndexData(&[0, 1, 2]),
        );
        assert_eq!(mesh.index_count, 3);
        assert_eq!(mesh.index_format, wgpu::IndexFormat::Uint32);
    }

    #[test]
    fn test_stream_buffer_alignment_and_growth() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let mut stream =
            StreamBuffer::new(&device, "test-stream", wgpu::BufferUsages::UNIFORM, 256);
        assert_eq!(stream.push(&[1u8; 144], 256), 0);
        assert_eq!(stream.push(&[2u8; 144], 256), 256);
        assert!(stream.upload(&device, &queue));
        stream.clear();
        assert_eq!(stream.push(&[3u8; 16], 256), 0);
        assert!(!stream.upload(&device, &queue));
    }
}
