//! The wgpu backend.
//!
//! wgpu has no global state machine, so draws are recorded together with a
//! snapshot of the relevant [`DrawState`] (as a pipeline key and a per-draw
//! uniform buffer) and replayed later by [`WgpuBackend::encode`] into a
//! render pass on the caller's targets.
//!
//! wgpu only rasterizes 1px lines. Wider lines are expanded on the CPU into
//! screen-space quads of the requested pixel width.

use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix, Vector4};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::{
    backend::{Backend, Primitive},
    data_structures::{
        texture::{Texture, white_image},
        vertex::Vertex,
    },
    pipelines::fixed::{PipelineKey, draw_uniform_layout, mk_fixed_pipeline, texture_layout},
    state::DrawState,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    model_view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
    lightmap: [f32; 2],
    lighting: u32,
    texturing: u32,
}

impl DrawUniform {
    fn new(state: &DrawState, view_projection: Matrix4<f32>) -> Self {
        Self {
            model_view_proj: (view_projection * state.transform).into(),
            model: state.transform.into(),
            color: state.color,
            lightmap: [state.lightmap.x, state.lightmap.y],
            lighting: state.system_lighting as u32,
            texturing: state.texturing as u32,
        }
    }
}

/// A texture together with the bind group that samples it.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    pub texture: Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

#[derive(Debug)]
struct DrawCommand {
    pipeline: PipelineKey,
    texture: wgpu::BindGroup,
    uniforms: wgpu::BindGroup,
    vertices: wgpu::Buffer,
    vertex_count: u32,
}

#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    viewport: [u32; 2],
    state: DrawState,
    view_projection: Matrix4<f32>,
    texture_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    white: GpuTexture,
    bound: Option<wgpu::BindGroup>,
    commands: Vec<DrawCommand>,
}

impl WgpuBackend {
    /// `color_format` and `viewport` (in pixels) describe the target later
    /// passed to [`WgpuBackend::encode`].
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        viewport: [u32; 2],
    ) -> anyhow::Result<Self> {
        let texture_layout = texture_layout(&device);
        let draw_layout = draw_uniform_layout(&device);
        let white = Self::mk_texture(&device, &queue, &texture_layout, &white_image(), "white")?;
        Ok(Self {
            device,
            queue,
            color_format,
            viewport: [viewport[0].max(1), viewport[1].max(1)],
            state: DrawState::default(),
            view_projection: Matrix4::identity(),
            texture_layout,
            draw_layout,
            pipelines: HashMap::new(),
            white,
            bound: None,
            commands: Vec::new(),
        })
    }

    fn mk_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &RgbaImage,
        label: &str,
    ) -> anyhow::Result<GpuTexture> {
        let texture = Texture::from_rgba(device, queue, image, Some(label))?;
        let sampler = texture
            .sampler
            .clone()
            .unwrap_or_else(|| crate::data_structures::texture::create_default_sampler(device));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(label),
        });
        Ok(GpuTexture { texture, bind_group })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Camera transform applied on top of each draw's model transform.
    pub fn set_view_projection(&mut self, view_projection: Matrix4<f32>) {
        self.view_projection = view_projection;
    }

    /// Size of the target in pixels, used to give wide lines their width.
    pub fn set_viewport(&mut self, viewport: [u32; 2]) {
        self.viewport = [viewport[0].max(1), viewport[1].max(1)];
    }

    /// Number of draws recorded since the last [`WgpuBackend::encode`].
    pub fn pending_draws(&self) -> usize {
        self.commands.len()
    }

    fn pipeline_key(&self, primitive: Primitive, culled: bool) -> PipelineKey {
        PipelineKey {
            blend: self.state.blending.then_some(self.state.blend_mode),
            cull_face: culled.then_some(self.state.cull_face),
            primitive,
        }
    }

    fn record(&mut self, vertices: wgpu::Buffer, vertex_count: u32, pipeline: PipelineKey, uniform: DrawUniform) {
        if vertex_count == 0 {
            log::warn!("you attempted to draw empty geometry");
            return;
        }

        if !self.pipelines.contains_key(&pipeline) {
            let render_pipeline = mk_fixed_pipeline(
                &self.device,
                self.color_format,
                &self.texture_layout,
                &self.draw_layout,
                pipeline,
            );
            self.pipelines.insert(pipeline, render_pipeline);
        }

        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let uniforms = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("draw_uniform_bind_group"),
        });

        let texture = match (&self.bound, self.state.texturing) {
            (Some(bound), true) => bound.clone(),
            _ => self.white.bind_group.clone(),
        };

        self.commands.push(DrawCommand {
            pipeline,
            texture,
            uniforms,
            vertices,
            vertex_count,
        });
    }

    fn mk_vertex_buffer(&self, vertices: &[Vertex], label: &str) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        })
    }

    /// Replays all recorded draws into a render pass on `color` and `depth`.
    ///
    /// `clear` clears both targets first; `None` draws on top of what is there.
    pub fn encode(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        clear: Option<wgpu::Color>,
    ) {
        let commands = std::mem::take(&mut self.commands);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Fixed Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: match clear {
                        Some(colour) => wgpu::LoadOp::Clear(colour),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: match clear {
                        Some(_) => wgpu::LoadOp::Clear(1.0),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });

        let mut current = None;
        for command in commands {
            if current != Some(command.pipeline) {
                render_pass.set_pipeline(&self.pipelines[&command.pipeline]);
                current = Some(command.pipeline);
            }
            render_pass.set_bind_group(0, &command.texture, &[]);
            render_pass.set_bind_group(1, &command.uniforms, &[]);
            render_pass.set_vertex_buffer(0, command.vertices.slice(..));
            render_pass.draw(0..command.vertex_count, 0..1);
        }
    }
}

impl Backend for WgpuBackend {
    type Texture = GpuTexture;
    type Buffer = GpuBuffer;

    fn state(&self) -> &DrawState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DrawState {
        &mut self.state
    }

    fn upload_texture(&mut self, image: &RgbaImage, label: &str) -> anyhow::Result<GpuTexture> {
        Self::mk_texture(&self.device, &self.queue, &self.texture_layout, image, label)
    }

    fn bind_texture(&mut self, texture: &GpuTexture) {
        self.bound = Some(texture.bind_group.clone());
    }

    fn upload_vertices(&mut self, vertices: &[Vertex], label: &str) -> GpuBuffer {
        GpuBuffer {
            buffer: self.mk_vertex_buffer(vertices, label),
            vertex_count: vertices.len() as u32,
        }
    }

    fn draw_buffer(&mut self, buffer: &GpuBuffer) {
        let pipeline = self.pipeline_key(Primitive::Triangles, true);
        let uniform = DrawUniform::new(&self.state, self.view_projection);
        self.record(buffer.buffer.clone(), buffer.vertex_count, pipeline, uniform);
    }

    fn draw_vertices(&mut self, vertices: &[Vertex], primitive: Primitive) {
        if vertices.is_empty() {
            log::warn!("you attempted to draw empty geometry");
            return;
        }
        let mut uniform = DrawUniform::new(&self.state, self.view_projection);
        let (pipeline, vertices) = match primitive {
            Primitive::Lines if self.state.line_width > 1.0 => {
                let quads = expand_lines(
                    vertices,
                    self.view_projection * self.state.transform,
                    self.viewport,
                    self.state.line_width,
                );
                // quads are already in normalized device coordinates
                uniform.model_view_proj = Matrix4::<f32>::identity().into();
                (self.pipeline_key(Primitive::Triangles, false), quads)
            }
            Primitive::Lines => (self.pipeline_key(Primitive::Lines, false), vertices.to_vec()),
            Primitive::Triangles => (self.pipeline_key(Primitive::Triangles, true), vertices.to_vec()),
        };
        let buffer = self.mk_vertex_buffer(&vertices, "streamed");
        self.record(buffer, vertices.len() as u32, pipeline, uniform);
    }

    fn release_buffer(&mut self, buffer: GpuBuffer) {
        // Draws recorded this frame keep their own reference until encoded.
        drop(buffer);
    }
}

/// Turns a line list into two triangles per segment, `width` pixels wide.
///
/// Positions of the result are in normalized device coordinates. Segments
/// that collapse to a point on screen, or cross the camera plane, are dropped.
fn expand_lines(vertices: &[Vertex], model_view_proj: Matrix4<f32>, viewport: [u32; 2], width: f32) -> Vec<Vertex> {
    let [w, h] = viewport.map(|extent| extent.max(1) as f32);
    let to_ndc = |vertex: &Vertex| {
        let [x, y, z] = vertex.position;
        let clip = model_view_proj * Vector4::new(x, y, z, 1.0);
        (clip.w > f32::EPSILON).then(|| [clip.x / clip.w, clip.y / clip.w, clip.z / clip.w])
    };

    let mut quads = Vec::with_capacity(vertices.len() / 2 * 6);
    for segment in vertices.chunks_exact(2) {
        let (Some(a), Some(b)) = (to_ndc(&segment[0]), to_ndc(&segment[1])) else {
            continue;
        };
        // direction in pixels, since x and y are scaled differently in NDC
        let dx = (b[0] - a[0]) * w;
        let dy = (b[1] - a[1]) * h;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON {
            continue;
        }
        // half the width in pixels is width / extent in NDC
        let offset = [-dy / length * width / w, dx / length * width / h];
        let corner = |point: [f32; 3], source: &Vertex, sign: f32| Vertex {
            position: [point[0] + sign * offset[0], point[1] + sign * offset[1], point[2]],
            ..*source
        };
        let (a_left, a_right) = (corner(a, &segment[0], 1.0), corner(a, &segment[0], -1.0));
        let (b_left, b_right) = (corner(b, &segment[1], 1.0), corner(b, &segment[1], -1.0));
        quads.extend_from_slice(&[a_right, b_right, b_left, a_right, b_left, a_left]);
    }
    quads
}
