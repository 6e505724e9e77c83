//! Interleaved vertex layout shared by every renderable.

/// A single vertex as handed over by scene collaborators.
///
/// The field order mirrors the order in which fixed-function geometry is
/// emitted (normal, texture coordinate, position) and is also the layout of
/// the GPU vertex buffers, so cached and streamed geometry share one format.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub position: [f32; 3],
}

impl Vertex {
    pub fn new(normal: [f32; 3], tex_coords: [f32; 2], position: [f32; 3]) -> Self {
        Self {
            normal,
            tex_coords,
            position,
        }
    }

    /// A vertex that only carries a position, as used by line geometry.
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}
