//! [`RenderBackend`] on wgpu.
//!
//! Calls made between `begin_frame` and `end_frame` are recorded as passes of
//! draw ops. Per-draw data goes into stream buffers on the CPU. `end_frame`
//! uploads everything once, creates any missing pipelines, encodes the passes
//! in order, then submits and presents.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;

use glam::{Mat4, Vec3, Vec4};

use crate::backend::{
    BlendMode, CameraFrame, ClearColor, CompositeFilter, CullFace, LayerState, MeshKind,
    RenderBackend, RenderTarget, ShaderProgram, UniformValue,
};
use crate::buffer::{
    BillboardInstance, BufferAllocator, IndexData, MeshBuffer, StreamBuffer, TextVertex,
    VertexPositionNormalUv,
};
use crate::gpu::{RenderContext, SurfaceError};
use crate::mesh::{self, MeshData};
use crate::shaders;
use crate::text;
use crate::uniforms::{DrawUniforms, SceneUniforms, ScreenParams, UniformBinding, apply_uniform};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const DEPTH_CLEAR: f32 = 1.0;
const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;
const SCREEN_PARAMS_SIZE: u64 = std::mem::size_of::<ScreenParams>() as u64;
const PROGRAMS: [ShaderProgram; 3] = [ShaderProgram::Crystal, ShaderProgram::Tunnel, ShaderProgram::Orb];

/// Fixed-function variant of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum PipelineKey {
    Mesh {
        program: ShaderProgram,
        cull: CullFace,
        blend: BlendMode,
        depth_write: bool,
    },
    Billboard {
        blend: BlendMode,
        depth_write: bool,
    },
    Composite {
        blend: BlendMode,
        filter: CompositeFilter,
    },
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DrawOp {
    Mesh {
        program: ShaderProgram,
        mesh: MeshKind,
        depth_write: bool,
        draw_offset: u32,
    },
    /// A run of consecutive billboard instances.
    Billboards { first: u32, count: u32 },
    Composite {
        target: u32,
        blend: BlendMode,
        filter: CompositeFilter,
        params_offset: u32,
    },
    Text {
        first_vertex: u32,
        vertex_count: u32,
        params_offset: u32,
    },
}

#[derive(Debug)]
struct RecordedPass {
    /// `None` draws into the surface.
    target: Option<u32>,
    clear: ClearColor,
    state: LayerState,
    ops: Vec<DrawOp>,
}

impl RecordedPass {
    fn pipeline_key(&self, op: &DrawOp) -> PipelineKey {
        match *op {
            DrawOp::Mesh {
                program,
                depth_write,
                ..
            } => PipelineKey::Mesh {
                program,
                cull: self.state.cull,
                blend: self.state.blend,
                depth_write: self.state.depth_write && depth_write,
            },
            DrawOp::Billboards { .. } => PipelineKey::Billboard {
                blend: self.state.blend,
                depth_write: self.state.depth_write,
            },
            DrawOp::Composite { blend, filter, .. } => PipelineKey::Composite { blend, filter },
            DrawOp::Text { .. } => PipelineKey::Text,
        }
    }
}

struct LayerTexture {
    handle: RenderTarget,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

struct ProgramState {
    uniforms: SceneUniforms,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Shader modules and layouts that pipelines are built from.
struct PipelineFactory {
    scene_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    params_layout: wgpu::BindGroupLayout,
    lit_layout: wgpu::PipelineLayout,
    composite_layout: wgpu::PipelineLayout,
    text_layout: wgpu::PipelineLayout,
    crystal: wgpu::ShaderModule,
    tunnel: wgpu::ShaderModule,
    orb: wgpu::ShaderModule,
    composite: wgpu::ShaderModule,
    text: wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
}

impl PipelineFactory {
    fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let module = |label: &str, source: &'static str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let uniform_entry = |binding: u32, dynamic: bool, size: u64| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: NonZeroU64::new(size),
            },
            count: None,
        };

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene-bgl"),
            entries: &[
                uniform_entry(0, false, std::mem::size_of::<SceneUniforms>() as u64),
                uniform_entry(1, true, DRAW_UNIFORM_SIZE),
            ],
        });
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("screen-params-bgl"),
            entries: &[uniform_entry(0, true, SCREEN_PARAMS_SIZE)],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer-texture-bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lit-layout"),
            bind_group_layouts: &[&scene_layout],
            immediate_size: 0,
        });
        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite-layout"),
            bind_group_layouts: &[&texture_layout, &params_layout],
            immediate_size: 0,
        });
        let text_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("text-layout"),
            bind_group_layouts: &[&params_layout],
            immediate_size: 0,
        });

        Self {
            crystal: module("crystal-shader", shaders::CRYSTAL_SHADER),
            tunnel: module("tunnel-shader", shaders::TUNNEL_SHADER),
            orb: module("orb-shader", shaders::ORB_SHADER),
            composite: module("composite-shader", shaders::COMPOSITE_SHADER),
            text: module("text-shader", shaders::TEXT_SHADER),
            scene_layout,
            texture_layout,
            params_layout,
            lit_layout,
            composite_layout,
            text_layout,
            color_format,
        }
    }

    fn build(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        log::debug!("Creating pipeline {key:?}");
        let depth = |write: bool| {
            Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            })
        };

        let (label, module, layout, vs, fs, buffers, cull, blend, depth_stencil) = match key {
            PipelineKey::Mesh {
                program,
                cull,
                blend,
                depth_write,
            } => {
                let module = match program {
                    ShaderProgram::Crystal => &self.crystal,
                    ShaderProgram::Tunnel => &self.tunnel,
                    ShaderProgram::Orb => &self.orb,
                };
                (
                    "mesh-pipeline",
                    module,
                    &self.lit_layout,
                    "vs_main",
                    "fs_main",
                    vec![VertexPositionNormalUv::layout()],
                    cull,
                    blend,
                    depth(depth_write),
                )
            }
            PipelineKey::Billboard { blend, depth_write } => (
                "billboard-pipeline",
                &self.orb,
                &self.lit_layout,
                "vs_main",
                "fs_main",
                vec![BillboardInstance::layout()],
                CullFace::None,
                blend,
                depth(depth_write),
            ),
            PipelineKey::Composite { blend, filter } => (
                "composite-pipeline",
                &self.composite,
                &self.composite_layout,
                "vs_fullscreen",
                match filter {
                    CompositeFilter::None => "fs_composite",
                    CompositeFilter::Fxaa => "fs_fxaa",
                },
                vec![],
                CullFace::None,
                blend,
                None,
            ),
            PipelineKey::Text => (
                "text-pipeline",
                &self.text,
                &self.text_layout,
                "vs_text",
                "fs_text",
                vec![TextVertex::layout()],
                CullFace::None,
                BlendMode::Alpha,
                None,
            ),
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some(vs),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: cull_mode(cull),
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(fs),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(blend_state(blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        })
    }
}

fn blend_state(blend: BlendMode) -> wgpu::BlendState {
    match blend {
        BlendMode::Alpha => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::OVER,
        },
        BlendMode::Replace => wgpu::BlendState::REPLACE,
    }
}

fn cull_mode(cull: CullFace) -> Option<wgpu::Face> {
    match cull {
        CullFace::None => None,
        CullFace::Front => Some(wgpu::Face::Front),
        CullFace::Back => Some(wgpu::Face::Back),
    }
}

fn clear_color(clear: ClearColor) -> wgpu::Color {
    let c = clear.0.as_dvec4();
    wgpu::Color {
        r: c.x,
        g: c.y,
        b: c.z,
        a: c.w,
    }
}

/// Two triangles per lit glyph cell.
fn text_vertices(text: &str, x: f32, y: f32, size: f32, color: Vec4) -> Vec<TextVertex> {
    let color = color.to_array();
    text::layout(text, x, y, size)
        .into_iter()
        .flat_map(|q| {
            let (x0, y0, x1, y1) = (q.x, q.y, q.x + q.width, q.y + q.height);
            [
                [x0, y0],
                [x1, y0],
                [x1, y1],
                [x0, y0],
                [x1, y1],
                [x0, y1],
            ]
            .map(|position| TextVertex { position, color })
        })
        .collect()
}

fn upload_mesh(allocator: &BufferAllocator, label: &str, data: &MeshData) -> MeshBuffer {
    allocator.create_mesh(
        label,
        bytemuck::cast_slice(&data.vertices),
        IndexData(&data.indices),
    )
}

fn scene_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    scene: &wgpu::Buffer,
    draws: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene-bg"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: scene.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: draws,
                    offset: 0,
                    size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                }),
            },
        ],
    })
}

fn params_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    draws: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("screen-params-bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: draws,
                offset: 0,
                size: NonZeroU64::new(SCREEN_PARAMS_SIZE),
            }),
        }],
    })
}

/// GPU implementation of [`RenderBackend`].
pub struct WgpuBackend {
    context: RenderContext,
    factory: PipelineFactory,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    sampler: wgpu::Sampler,
    rod_mesh: MeshBuffer,
    tunnel_mesh: MeshBuffer,
    programs: HashMap<ShaderProgram, ProgramState>,
    /// Draw uniforms and screen params, at dynamic-offset alignment.
    draw_stream: StreamBuffer,
    instance_stream: StreamBuffer,
    text_stream: StreamBuffer,
    params_bind_group: wgpu::BindGroup,
    uniform_align: usize,
    targets: HashMap<u32, LayerTexture>,
    next_target_id: u32,
    frame: Option<wgpu::SurfaceTexture>,
    passes: Vec<RecordedPass>,
    pass_open: bool,
    warned_uniforms: HashSet<(ShaderProgram, String)>,
}

impl WgpuBackend {
    pub fn new(context: RenderContext) -> Self {
        use wgpu::util::DeviceExt;

        let device = &context.device;
        let factory = PipelineFactory::new(device, context.surface_format);
        let uniform_align = device.limits().min_uniform_buffer_offset_alignment as usize;

        let allocator = BufferAllocator::new(device);
        let rod_mesh = upload_mesh(&allocator, "crystal-rod", &mesh::crystal_rod());
        let tunnel_mesh = upload_mesh(&allocator, "tunnel", &mesh::tunnel());

        let draw_stream = StreamBuffer::new(
            device,
            "draw-uniforms",
            wgpu::BufferUsages::UNIFORM,
            (uniform_align * 64) as u64,
        );
        let instance_stream = StreamBuffer::new(
            device,
            "billboard-instances",
            wgpu::BufferUsages::VERTEX,
            (std::mem::size_of::<BillboardInstance>() * 1024) as u64,
        );
        let text_stream = StreamBuffer::new(
            device,
            "text-vertices",
            wgpu::BufferUsages::VERTEX,
            (std::mem::size_of::<TextVertex>() * 4096) as u64,
        );

        let programs = PROGRAMS
            .into_iter()
            .map(|program| {
                let uniforms = SceneUniforms::default();
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("scene-uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = scene_bind_group(
                    device,
                    &factory.scene_layout,
                    &buffer,
                    draw_stream.buffer(),
                );
                (
                    program,
                    ProgramState {
                        uniforms,
                        buffer,
                        bind_group,
                    },
                )
            })
            .collect();

        let params_bind_group =
            params_bind_group(device, &factory.params_layout, draw_stream.buffer());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("layer-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            context,
            factory,
            pipelines: HashMap::new(),
            sampler,
            rod_mesh,
            tunnel_mesh,
            programs,
            draw_stream,
            instance_stream,
            text_stream,
            params_bind_group,
            uniform_align,
            targets: HashMap::new(),
            next_target_id: 0,
            frame: None,
            passes: Vec::new(),
            pass_open: false,
            warned_uniforms: HashSet::new(),
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    fn create_layer(&self, handle: RenderTarget, label: &str) -> LayerTexture {
        let device = &self.context.device;
        let size = wgpu::Extent3d {
            width: handle.width.max(1),
            height: handle.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = |label: String, format, usage| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };
        let color = texture(
            format!("{label}-color"),
            self.context.surface_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let depth = texture(
            format!("{label}-depth"),
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.factory.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        LayerTexture {
            handle,
            color_view,
            depth_view,
            bind_group,
        }
    }

    /// The pass draws may be appended to, if one is open.
    fn open_pass(&mut self, what: &str) -> Option<&mut RecordedPass> {
        if !self.pass_open {
            log::debug!("{what} outside of a pass dropped");
            return None;
        }
        self.passes.last_mut()
    }

    fn push_params(&mut self, params: ScreenParams) -> u32 {
        self.draw_stream
            .push(bytemuck::bytes_of(&params), self.uniform_align) as u32
    }

    fn mesh_buffer(&self, mesh: MeshKind) -> &MeshBuffer {
        match mesh {
            MeshKind::CrystalRod => &self.rod_mesh,
            MeshKind::Tunnel => &self.tunnel_mesh,
        }
    }

    fn upload_frame_data(&mut self) {
        let device = &self.context.device;
        let queue = &self.context.queue;
        if self.draw_stream.upload(device, queue) {
            for state in self.programs.values_mut() {
                state.bind_group = scene_bind_group(
                    device,
                    &self.factory.scene_layout,
                    &state.buffer,
                    self.draw_stream.buffer(),
                );
            }
            self.params_bind_group =
                params_bind_group(device, &self.factory.params_layout, self.draw_stream.buffer());
        }
        self.instance_stream.upload(device, queue);
        self.text_stream.upload(device, queue);
        for state in self.programs.values() {
            queue.write_buffer(&state.buffer, 0, bytemuck::bytes_of(&state.uniforms));
        }
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView, pass: &RecordedPass) {
        let layer = match pass.target {
            Some(id) => match self.targets.get(&id) {
                Some(layer) => Some(layer),
                None => {
                    log::warn!("Pass into freed target {id} skipped");
                    return;
                }
            },
            None => None,
        };

        let color_view = layer.map_or(surface_view, |l| &l.color_view);
        let depth_stencil_attachment = layer.map(|l| wgpu::RenderPassDepthStencilAttachment {
            view: &l.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(DEPTH_CLEAR),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(if layer.is_some() { "layer-pass" } else { "backbuffer-pass" }),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(pass.clear)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for op in &pass.ops {
            let Some(pipeline) = self.pipelines.get(&pass.pipeline_key(op)) else {
                continue;
            };
            render_pass.set_pipeline(pipeline);
            match *op {
                DrawOp::Mesh {
                    program,
                    mesh,
                    draw_offset,
                    ..
                } => {
                    let Some(state) = self.programs.get(&program) else {
                        continue;
                    };
                    render_pass.set_bind_group(0, &state.bind_group, &[draw_offset]);
                    let buffer = self.mesh_buffer(mesh);
                    buffer.bind(&mut render_pass);
                    buffer.draw(&mut render_pass);
                }
                DrawOp::Billboards { first, count } => {
                    let Some(state) = self.programs.get(&ShaderProgram::Orb) else {
                        continue;
                    };
                    render_pass.set_bind_group(0, &state.bind_group, &[0]);
                    render_pass.set_vertex_buffer(0, self.instance_stream.buffer().slice(..));
                    render_pass.draw(0..6, first..first + count);
                }
                DrawOp::Composite {
                    target,
                    params_offset,
                    ..
                } => {
                    let Some(source) = self.targets.get(&target) else {
                        log::warn!("Composite of freed target {target} skipped");
                        continue;
                    };
                    render_pass.set_bind_group(0, &source.bind_group, &[]);
                    render_pass.set_bind_group(1, &self.params_bind_group, &[params_offset]);
                    render_pass.draw(0..3, 0..1);
                }
                DrawOp::Text {
                    first_vertex,
                    vertex_count,
                    params_offset,
                } => {
                    render_pass.set_bind_group(0, &self.params_bind_group, &[params_offset]);
                    render_pass.set_vertex_buffer(0, self.text_stream.buffer().slice(..));
                    render_pass.draw(first_vertex..first_vertex + vertex_count, 0..1);
                }
            }
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn allocate_target(&mut self, width: u32, height: u32, label: &str) -> RenderTarget {
        self.next_target_id += 1;
        let handle = RenderTarget {
            id: self.next_target_id,
            width,
            height,
        };
        let layer = self.create_layer(handle, label);
        self.targets.insert(handle.id, layer);
        log::debug!("Allocated target {} '{label}' {width}x{height}", handle.id);
        handle
    }

    fn free_target(&mut self, target: RenderTarget) {
        if self.targets.remove(&target.id).is_none() {
            log::warn!("Free of unknown target {}", target.id);
        }
    }

    fn live_targets(&self) -> Vec<RenderTarget> {
        let mut live: Vec<_> = self.targets.values().map(|l| l.handle).collect();
        live.sort_by_key(|t| t.id);
        live
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    fn begin_frame(&mut self) -> bool {
        match self.context.get_current_texture() {
            Ok(texture) => {
                self.frame = Some(texture);
                self.passes.clear();
                self.pass_open = false;
                self.draw_stream.clear();
                self.instance_stream.clear();
                self.text_stream.clear();
                true
            }
            Err(SurfaceError::Timeout) => {
                log::debug!("Surface timeout, skipping frame");
                false
            }
            Err(e) => {
                log::warn!("Frame dropped: {e}");
                false
            }
        }
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::warn!("end_frame without begin_frame");
            return;
        };
        self.pass_open = false;
        self.upload_frame_data();

        let passes = std::mem::take(&mut self.passes);
        for pass in &passes {
            for op in &pass.ops {
                let key = pass.pipeline_key(op);
                if !self.pipelines.contains_key(&key) {
                    let pipeline = self.factory.build(&self.context.device, key);
                    self.pipelines.insert(key, pipeline);
                }
            }
        }

        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        for pass in &passes {
            self.encode_pass(&mut encoder, &surface_view, pass);
        }
        self.context.queue.submit([encoder.finish()]);
        frame.present();
        self.passes = passes;
    }

    fn set_camera(&mut self, camera: &CameraFrame) {
        for state in self.programs.values_mut() {
            state.uniforms.set_camera(camera);
        }
    }

    fn begin_layer(&mut self, target: RenderTarget, clear: ClearColor, state: LayerState) {
        if !self.targets.contains_key(&target.id) {
            log::warn!("Layer pass into unknown target {}", target.id);
            self.pass_open = false;
            return;
        }
        self.passes.push(RecordedPass {
            target: Some(target.id),
            clear,
            state,
            ops: Vec::new(),
        });
        self.pass_open = true;
    }

    fn end_layer(&mut self) {
        self.pass_open = false;
    }

    fn begin_backbuffer(&mut self, clear: ClearColor) {
        self.passes.push(RecordedPass {
            target: None,
            clear,
            state: LayerState {
                cull: CullFace::None,
                blend: BlendMode::Alpha,
                depth_write: false,
            },
            ops: Vec::new(),
        });
        self.pass_open = true;
    }

    fn set_uniform(&mut self, program: ShaderProgram, name: &str, value: UniformValue) {
        let Some(state) = self.programs.get_mut(&program) else {
            return;
        };
        if apply_uniform(&mut state.uniforms, name, value) == UniformBinding::Rejected
            && self.warned_uniforms.insert((program, name.to_string()))
        {
            log::warn!("Ignoring uniform '{name}' ({value:?}) for {program:?}");
        }
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
        if !matches!(self.passes.last(), Some(p) if self.pass_open && p.target.is_some()) {
            log::debug!("Mesh draw outside of a layer pass dropped");
            return;
        }
        if program == ShaderProgram::Orb {
            log::warn!("The orb program draws billboards only; mesh draw dropped");
            return;
        }
        let uniforms = DrawUniforms::new(model, normal, tint);
        let draw_offset = self
            .draw_stream
            .push(bytemuck::bytes_of(&uniforms), self.uniform_align) as u32;
        if let Some(pass) = self.open_pass("mesh draw") {
            pass.ops.push(DrawOp::Mesh {
                program,
                mesh,
                depth_write,
                draw_offset,
            });
        }
    }

    fn draw_billboard(&mut self, center: Vec3, size: f32, color: Vec4) {
        if !matches!(self.passes.last(), Some(p) if self.pass_open && p.target.is_some()) {
            log::debug!("Billboard outside of a layer pass dropped");
            return;
        }
        let instance = BillboardInstance {
            center: center.to_array(),
            size,
            color: color.to_array(),
        };
        let stride = std::mem::size_of::<BillboardInstance>();
        let index = (self
            .instance_stream
            .push(bytemuck::bytes_of(&instance), stride) as usize
            / stride) as u32;
        if let Some(pass) = self.open_pass("billboard") {
            match pass.ops.last_mut() {
                Some(DrawOp::Billboards { first, count }) if *first + *count == index => {
                    *count += 1;
                }
                _ => pass.ops.push(DrawOp::Billboards {
                    first: index,
                    count: 1,
                }),
            }
        }
    }

    fn composite(
        &mut self,
        target: RenderTarget,
        tint: Vec4,
        blend: BlendMode,
        filter: CompositeFilter,
    ) {
        if !matches!(self.passes.last(), Some(p) if self.pass_open && p.target.is_none()) {
            log::debug!("Composite outside of the backbuffer pass dropped");
            return;
        }
        let params_offset = self.push_params(ScreenParams::new(tint, target.width, target.height));
        if let Some(pass) = self.open_pass("composite") {
            pass.ops.push(DrawOp::Composite {
                target: target.id,
                blend,
                filter,
                params_offset,
            });
        }
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Vec4) {
        if !matches!(self.passes.last(), Some(p) if self.pass_open && p.target.is_none()) {
            log::debug!("Text outside of the backbuffer pass dropped");
            return;
        }
        let vertices = text_vertices(text, x, y, size, color);
        if vertices.is_empty() {
            return;
        }
        let stride = std::mem::size_of::<TextVertex>();
        let first_vertex = (self
            .text_stream
            .push(bytemuck::cast_slice(&vertices), stride) as usize
            / stride) as u32;
        let (width, height) = self.context.size();
        let params_offset = self.push_params(ScreenParams::new(Vec4::ONE, width, height));
        if let Some(pass) = self.open_pass("text") {
            pass.ops.push(DrawOp::Text {
                first_vertex,
                vertex_count: vertices.len() as u32,
                params_offset,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(state: LayerState) -> RecordedPass {
        RecordedPass {
            target: Some(1),
            clear: ClearColor::TRANSPARENT,
            state,
            ops: Vec::new(),
        }
    }

    #[test]
    fn test_blend_states() {
        assert_eq!(
            blend_state(BlendMode::Alpha),
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING
        );
        let additive = blend_state(BlendMode::Additive);
        assert_eq!(additive.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(additive.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend_state(BlendMode::Replace), wgpu::BlendState::REPLACE);
    }

    #[test]
    fn test_cull_modes() {
        assert_eq!(cull_mode(CullFace::None), None);
        assert_eq!(cull_mode(CullFace::Front), Some(wgpu::Face::Front));
        assert_eq!(cull_mode(CullFace::Back), Some(wgpu::Face::Back));
    }

    #[test]
    fn test_clear_color_conversion() {
        let c = clear_color(ClearColor::BLACK);
        assert_eq!((c.r, c.g, c.b, c.a), (0.0, 0.0, 0.0, 1.0));
        assert_eq!(clear_color(ClearColor::TRANSPARENT).a, 0.0);
    }

    #[test]
    fn test_mesh_key_combines_layer_and_draw_depth_write() {
        let pass = layer(LayerState {
            cull: CullFace::None,
            blend: BlendMode::Additive,
            depth_write: true,
        });
        let op = |depth_write| DrawOp::Mesh {
            program: ShaderProgram::Crystal,
            mesh: MeshKind::CrystalRod,
            depth_write,
            draw_offset: 0,
        };
        assert_eq!(
            pass.pipeline_key(&op(false)),
            PipelineKey::Mesh {
                program: ShaderProgram::Crystal,
                cull: CullFace::None,
                blend: BlendMode::Additive,
                depth_write: false,
            }
        );
        assert!(matches!(
            pass.pipeline_key(&op(true)),
            PipelineKey::Mesh { depth_write: true, .. }
        ));
    }

    #[test]
    fn test_billboard_key_follows_layer() {
        let pass = layer(LayerState {
            cull: CullFace::None,
            blend: BlendMode::Additive,
            depth_write: false,
        });
        assert_eq!(
            pass.pipeline_key(&DrawOp::Billboards { first: 0, count: 3 }),
            PipelineKey::Billboard {
                blend: BlendMode::Additive,
                depth_write: false,
            }
        );
    }

    #[test]
    fn test_text_vertices_two_triangles_per_cell() {
        let vertices = text_vertices("-", 0.0, 0.0, 7.0, Vec4::ONE);
        assert_eq!(vertices.len(), 5 * 6);
        assert_eq!(vertices[0].position, [0.0, 3.0]);
        assert_eq!(vertices[2].position, [1.0, 4.0]);
        assert!(text_vertices(" ", 0.0, 0.0, 7.0, Vec4::ONE).is_empty());
    }

    #[test]
    fn test_pipelines_build_on_device() {
        let Some((device, _queue)) = crate::buffer::create_test_device() else {
            return;
        };
        let factory = PipelineFactory::new(&device, wgpu::TextureFormat::Rgba8UnormSrgb);
        for key in [
            PipelineKey::Mesh {
                program: ShaderProgram::Tunnel,
                cull: CullFace::Front,
                blend: BlendMode::Replace,
                depth_write: true,
            },
            PipelineKey::Mesh {
                program: ShaderProgram::Crystal,
                cull: CullFace::None,
                blend: BlendMode::Additive,
                depth_write: false,
            },
            PipelineKey::Billboard {
                blend: BlendMode::Additive,
                depth_write: false,
            },
            PipelineKey::Composite {
                blend: BlendMode::Alpha,
                filter: CompositeFilter::Fxaa,
            },
            PipelineKey::Text,
        ] {
            factory.build(&device, key);
        }
    }
}
