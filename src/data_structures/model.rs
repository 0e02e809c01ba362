//! Imported mesh and material data plus the GPU vertex layout.
//!
//! [`MeshData`] and [`MaterialData`] are what the importers produce: plain CPU
//! arrays that reference each other by index. [`ModelVertex`] is the
//! interleaved layout those arrays are packed into when a mesh is uploaded.

use std::{fmt, path::PathBuf};

use anyhow::ensure;

/// Index of a mesh in its [`SourceScene`](super::scene_graph::SourceScene).
///
/// The index is the identity the resource cache deduplicates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

/// Index of a material in its [`SourceScene`](super::scene_graph::SourceScene).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/**
 * The interleaved vertex as it is stored in GPU memory.
 *
 * Shader locations: 0 position, 1 tex_coords, 2 normal, 3 tangent.
 */
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
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
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// The three texture slots a material can fill, in binding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Normal,
    Specular,
}

impl TextureKind {
    pub const ALL: [TextureKind; 3] = [
        TextureKind::Diffuse,
        TextureKind::Normal,
        TextureKind::Specular,
    ];

    /// Normal maps hold vectors, not colours, and must not be sRGB decoded.
    pub fn is_color(self) -> bool {
        !matches!(self, TextureKind::Normal)
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureKind::Diffuse => f.write_str("diffuse"),
            TextureKind::Normal => f.write_str("normal"),
            TextureKind::Specular => f.write_str("specular"),
        }
    }
}

/// One value per texture slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureSlots<T> {
    pub diffuse: T,
    pub normal: T,
    pub specular: T,
}

impl<T> TextureSlots<T> {
    pub fn get(&self, kind: TextureKind) -> &T {
        match kind {
            TextureKind::Diffuse => &self.diffuse,
            TextureKind::Normal => &self.normal,
            TextureKind::Specular => &self.specular,
        }
    }

    pub fn get_mut(&mut self, kind: TextureKind) -> &mut T {
        match kind {
            TextureKind::Diffuse => &mut self.diffuse,
            TextureKind::Normal => &mut self.normal,
            TextureKind::Specular => &mut self.specular,
        }
    }

    /// Iterates diffuse, normal, specular in that order.
    pub fn iter(&self) -> impl Iterator<Item = (TextureKind, &T)> {
        TextureKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    pub fn map<U>(self, mut f: impl FnMut(TextureKind, T) -> U) -> TextureSlots<U> {
        TextureSlots {
            diffuse: f(TextureKind::Diffuse, self.diffuse),
            normal: f(TextureKind::Normal, self.normal),
            specular: f(TextureKind::Specular, self.specular),
        }
    }
}

/// Where the pixels of a texture come from.
#[derive(Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// A file relative to the scene's base directory.
    Path(PathBuf),
    /// Image bytes stored inside the model file, keyed by a synthetic name.
    Embedded {
        key: String,
        data: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl TextureSource {
    /// The texture cache key.
    pub fn key(&self) -> String {
        match self {
            TextureSource::Path(path) => path.to_string_lossy().into_owned(),
            TextureSource::Embedded { key, .. } => key.clone(),
        }
    }
}

impl fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            TextureSource::Embedded { key, data, .. } => f
                .debug_struct("Embedded")
                .field("key", key)
                .field("bytes", &data.len())
                .finish(),
        }
    }
}

impl From<&str> for TextureSource {
    fn from(path: &str) -> Self {
        TextureSource::Path(PathBuf::from(path))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MaterialData {
    pub name: String,
    pub textures: TextureSlots<Option<TextureSource>>,
}

impl MaterialData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: TextureSlots::default(),
        }
    }

    pub fn with_texture(mut self, kind: TextureKind, source: impl Into<TextureSource>) -> Self {
        *self.textures.get_mut(kind) = Some(source.into());
        self
    }

    pub fn texture(&self, kind: TextureKind) -> Option<&TextureSource> {
        self.textures.get(kind).as_ref()
    }
}

/// Per-vertex attribute streams and triangle indices of one imported mesh.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: MaterialId,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Checks that every attribute stream is present for every vertex and
    /// that the indices describe whole triangles inside the vertex range.
    pub fn validate(&self) -> anyhow::Result<()> {
        let count = self.positions.len();
        ensure!(count > 0, "mesh '{}' has no positions", self.name);
        ensure!(
            self.normals.len() == count,
            "mesh '{}' has {} normals for {} positions",
            self.name,
            self.normals.len(),
            count
        );
        ensure!(
            self.tangents.len() == count,
            "mesh '{}' has {} tangents for {} positions",
            self.name,
            self.tangents.len(),
            count
        );
        ensure!(
            self.tex_coords.len() == count,
            "mesh '{}' has {} tex coords for {} positions",
            self.name,
            self.tex_coords.len(),
            count
        );
        ensure!(
            !self.indices.is_empty() && self.indices.len() % 3 == 0,
            "mesh '{}' has {} indices, which is not a triangle list",
            self.name,
            self.indices.len()
        );
        if let Some(index) = self.indices.iter().find(|&&i| i as usize >= count) {
            anyhow::bail!(
                "mesh '{}' references vertex {} but only has {}",
                self.name,
                index,
                count
            );
        }
        Ok(())
    }

    /// Packs the attribute streams into the interleaved GPU layout.
    pub fn vertices(&self) -> anyhow::Result<Vec<ModelVertex>> {
        self.validate()?;
        Ok((0..self.positions.len())
            .map(|i| ModelVertex {
                position: self.positions[i],
                tex_coords: self.tex_coords[i],
                normal: self.normals[i],
                tangent: self.tangents[i],
            })
            .collect())
    }

    /**
     * Computes per-vertex tangents from positions and UVs.
     *
     * Every triangle contributes the same tangent to its three vertices and
     * the contributions are averaged afterwards. Triangles with a degenerate
     * UV mapping contribute nothing.
     */
    pub fn compute_tangents(&mut self) {
        let mut tangents = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); self.positions.len()];
        let mut triangles_included = vec![0u32; self.positions.len()];

        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if i0 >= tangents.len() || i1 >= tangents.len() || i2 >= tangents.len() {
                continue;
            }
            let pos0: cgmath::Vector3<_> = self.positions[i0].into();
            let pos1: cgmath::Vector3<_> = self.positions[i1].into();
            let pos2: cgmath::Vector3<_> = self.positions[i2].into();

            let uv = |i: usize| -> cgmath::Vector2<f32> {
                self.tex_coords.get(i).copied().unwrap_or_default().into()
            };
            let (uv0, uv1, uv2) = (uv(i0), uv(i1), uv(i2));

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            // delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            // delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() <= f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;

            for i in [i0, i1, i2] {
                tangents[i] += tangent;
                triangles_included[i] += 1;
            }
        }

        self.tangents = tangents
            .into_iter()
            .zip(triangles_included)
            .map(|(tangent, n)| {
                if n == 0 {
                    [0.0; 3]
                } else {
                    (tangent / n as f32).into()
                }
            })
            .collect();
    }
}
