//! The seam between scene logic and the graphics driver.
//!
//! Resource realization talks to a [`GpuBackend`] to create textures, mesh
//! buffers and material bindings; the render traversal talks to a
//! [`DrawTarget`] to bind and draw them. The wgpu implementation lives in
//! [`device`]. Anything that records calls (tests, tooling) can stand in for
//! it.

pub mod device;

use cgmath::{Matrix4, Vector3};

use crate::data_structures::model::{ModelVertex, TextureSlots};

/// Creates GPU-resident resources.
pub trait GpuBackend {
    type Texture;
    type Mesh;
    type Material;

    /// Upload a decoded image. `srgb` is false for data textures such as
    /// normal maps.
    fn upload_texture(
        &mut self,
        label: &str,
        image: &image::DynamicImage,
        srgb: bool,
    ) -> anyhow::Result<Self::Texture>;

    /// Upload interleaved vertices and a triangle list of indices.
    fn upload_mesh(&mut self, label: &str, vertices: &[ModelVertex], indices: &[u32])
    -> Self::Mesh;

    /// Bind the three material textures together. Slots are always filled;
    /// callers substitute the default texture for missing ones and report
    /// which slots hold a real texture in `loaded` so shaders can tell a
    /// fallback apart.
    fn create_material(
        &mut self,
        label: &str,
        textures: TextureSlots<&Self::Texture>,
        loaded: TextureSlots<bool>,
    ) -> Self::Material;
}

/// Per-draw values the material uploads next to its textures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectUniforms {
    pub world: Matrix4<f32>,
    pub world_view_projection: Matrix4<f32>,
    pub camera_position: Vector3<f32>,
}

/// Receives the draw calls of one frame.
pub trait DrawTarget<B: GpuBackend> {
    fn bind_mesh(&mut self, mesh: &B::Mesh);

    /// Bind diffuse, normal and specular textures (in that order) and upload
    /// the object uniforms.
    fn apply_material(&mut self, material: &B::Material, uniforms: &ObjectUniforms);

    /// Draw `index_count` indices of the bound mesh as a triangle list.
    fn draw_indexed(&mut self, index_count: u32);
}
