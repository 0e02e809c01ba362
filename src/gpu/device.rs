//! The wgpu implementation of [`GpuBackend`] and [`DrawTarget`].
//!
//! Per-draw object uniforms are collected by a [`FrameRecorder`] during the
//! scene traversal and written into one dynamic-offset uniform buffer when the
//! frame is submitted.

use std::iter;

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        model::{ModelVertex, TextureSlots},
        texture::{self, Texture},
    },
    gpu::{DrawTarget, GpuBackend, ObjectUniforms},
    pipelines::ScenePipeline,
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::from_cols(
    cgmath::Vector4::new(1.0, 0.0, 0.0, 0.0),
    cgmath::Vector4::new(0.0, 1.0, 0.0, 0.0),
    cgmath::Vector4::new(0.0, 0.0, 0.5, 0.0),
    cgmath::Vector4::new(0.0, 0.0, 0.5, 1.0),
);

/// Vertex and index buffers of one uploaded mesh.
#[derive(Clone, Debug)]
pub struct WgpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialFlagsRaw {
    has_diffuse: u32,
    has_normal: u32,
    has_specular: u32,
    _padding: u32,
}

impl From<TextureSlots<bool>> for MaterialFlagsRaw {
    fn from(loaded: TextureSlots<bool>) -> Self {
        Self {
            has_diffuse: loaded.diffuse as u32,
            has_normal: loaded.normal as u32,
            has_specular: loaded.specular as u32,
            _padding: 0,
        }
    }
}

/// Creates textures, mesh buffers and material bind groups on a wgpu device.
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl WgpuBackend {
    pub fn new(ctx: &Context, pipeline: &ScenePipeline) -> Self {
        // Device and Queue are internally reference counted
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            material_layout: pipeline.material_layout.clone(),
            sampler: texture::create_default_sampler(&ctx.device),
        }
    }

    /// A 1x1 texture used when the configured default texture cannot be
    /// loaded.
    pub fn solid_texture(&self, rgba: [u8; 4], label: &str) -> Texture {
        Texture::create_solid(&self.device, &self.queue, rgba, label)
    }
}

impl GpuBackend for WgpuBackend {
    type Texture = Texture;
    type Mesh = WgpuMesh;
    type Material = wgpu::BindGroup;

    fn upload_texture(
        &mut self,
        label: &str,
        image: &image::DynamicImage,
        srgb: bool,
    ) -> anyhow::Result<Texture> {
        Texture::from_image(&self.device, &self.queue, image, Some(label), srgb)
    }

    fn upload_mesh(&mut self, label: &str, vertices: &[ModelVertex], indices: &[u32]) -> WgpuMesh {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        WgpuMesh {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        }
    }

    fn create_material(
        &mut self,
        label: &str,
        textures: TextureSlots<&Texture>,
        loaded: TextureSlots<bool>,
    ) -> wgpu::BindGroup {
        let flags = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} flags")),
                contents: bytemuck::cast_slice(&[MaterialFlagsRaw::from(loaded)]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&textures.diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&textures.specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: flags.as_entire_binding(),
                },
            ],
            label: Some(label),
        })
    }
}

/// Object uniforms as laid out in the shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniformRaw {
    world: [[f32; 4]; 4],
    world_view_projection: [[f32; 4]; 4],
    camera_position: [f32; 3],
    _padding: f32,
}

impl From<&ObjectUniforms> for ObjectUniformRaw {
    fn from(uniforms: &ObjectUniforms) -> Self {
        Self {
            world: uniforms.world.into(),
            // cgmath builds OpenGL clip space, wgpu expects z in [0, 1]
            world_view_projection: (OPENGL_TO_WGPU_MATRIX * uniforms.world_view_projection).into(),
            camera_position: uniforms.camera_position.into(),
            _padding: 0.0,
        }
    }
}

/**
 * A uniform buffer holding one [`ObjectUniformRaw`] per draw.
 *
 * Entries sit `stride` bytes apart so each draw binds its own slice through a
 * dynamic offset. The buffer is recreated when a frame needs more entries than
 * it has room for.
 */
#[derive(Debug)]
pub struct ObjectBuffer {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl ObjectBuffer {
    const INITIAL_CAPACITY: usize = 64;

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = std::mem::size_of::<ObjectUniformRaw>() as u64;
        let stride = size.div_ceil(alignment) * alignment;
        let (buffer, bind_group) =
            Self::create(device, layout, stride, Self::INITIAL_CAPACITY);
        Self {
            layout: layout.clone(),
            buffer,
            bind_group,
            stride,
            capacity: Self::INITIAL_CAPACITY,
        }
    }

    fn create(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniform Buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniformRaw>() as u64),
                }),
            }],
            label: Some("object_bind_group"),
        });
        (buffer, bind_group)
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, objects: &[ObjectUniformRaw]) {
        if objects.len() > self.capacity {
            let capacity = objects.len().next_power_of_two();
            let (buffer, bind_group) = Self::create(device, &self.layout, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
        if objects.is_empty() {
            return;
        }
        let mut bytes = vec![0u8; self.stride as usize * objects.len()];
        for (chunk, object) in bytes.chunks_mut(self.stride as usize).zip(objects) {
            let raw = bytemuck::bytes_of(object);
            chunk[..raw.len()].copy_from_slice(raw);
        }
        queue.write_buffer(&self.buffer, 0, &bytes);
    }

    fn offset(&self, index: usize) -> u32 {
        (self.stride * index as u64) as u32
    }
}

struct DrawCommand {
    mesh: WgpuMesh,
    material: wgpu::BindGroup,
    object: usize,
    index_count: u32,
}

/// Records the draw calls of one frame so they can be encoded into a single
/// render pass after all object uniforms are known.
#[derive(Default)]
pub struct FrameRecorder {
    mesh: Option<WgpuMesh>,
    material: Option<(wgpu::BindGroup, usize)>,
    objects: Vec<ObjectUniformRaw>,
    commands: Vec<DrawCommand>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears colour and depth, then encodes and submits every recorded draw.
    pub fn submit(
        self,
        ctx: &Context,
        pipeline: &ScenePipeline,
        objects: &mut ObjectBuffer,
        view: &wgpu::TextureView,
    ) {
        objects.write(&ctx.device, &ctx.queue, &self.objects);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&pipeline.pipeline);
            for command in &self.commands {
                render_pass.set_bind_group(0, &command.material, &[]);
                render_pass.set_bind_group(1, &objects.bind_group, &[objects.offset(command.object)]);
                render_pass.set_vertex_buffer(0, command.mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(
                    command.mesh.index_buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                render_pass.draw_indexed(0..command.index_count, 0, 0..1);
            }
        }
        ctx.queue.submit(iter::once(encoder.finish()));
    }
}

impl DrawTarget<WgpuBackend> for FrameRecorder {
    fn bind_mesh(&mut self, mesh: &WgpuMesh) {
        self.mesh = Some(mesh.clone());
    }

    fn apply_material(&mut self, material: &wgpu::BindGroup, uniforms: &ObjectUniforms) {
        self.objects.push(uniforms.into());
        self.material = Some((material.clone(), self.objects.len() - 1));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        match (&self.mesh, &self.material) {
            (Some(mesh), Some((material, object))) => self.commands.push(DrawCommand {
                mesh: mesh.clone(),
                material: material.clone(),
                object: *object,
                index_count,
            }),
            _ => log::warn!("draw_indexed without a bound mesh and material"),
        }
    }
}
