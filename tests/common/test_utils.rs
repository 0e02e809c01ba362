use std::collections::HashSet;

use scene_ngin::{
    KeyCode,
    cgmath::{Matrix4, Vector2},
    data_structures::{
        model::{MaterialData, MaterialId, MeshData, ModelVertex, TextureSlots},
        scene_graph::SourceScene,
    },
    gpu::{DrawTarget, GpuBackend, ObjectUniforms},
    input::{InputSource, MouseButton},
    resources::texture::TextureCache,
};

#[derive(Clone, Debug, PartialEq)]
pub struct MockTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub srgb: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MockMesh {
    pub id: usize,
    pub label: String,
    pub vertex_count: usize,
    pub index_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MockMaterial {
    pub id: usize,
    pub label: String,
    /// Labels of the bound diffuse, normal and specular textures.
    pub textures: TextureSlots<String>,
    pub loaded: TextureSlots<bool>,
}

/// A backend that records what it was asked to create.
#[derive(Debug, Default)]
pub struct MockGpu {
    pub textures_uploaded: usize,
    pub meshes_uploaded: usize,
    pub materials_created: usize,
}

impl MockGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creations(&self) -> usize {
        self.textures_uploaded + self.meshes_uploaded + self.materials_created
    }
}

impl GpuBackend for MockGpu {
    type Texture = MockTexture;
    type Mesh = MockMesh;
    type Material = MockMaterial;

    fn upload_texture(
        &mut self,
        label: &str,
        image: &image::DynamicImage,
        srgb: bool,
    ) -> anyhow::Result<MockTexture> {
        self.textures_uploaded += 1;
        Ok(MockTexture {
            label: label.to_string(),
            width: image.width(),
            height: image.height(),
            srgb,
        })
    }

    fn upload_mesh(&mut self, label: &str, vertices: &[ModelVertex], indices: &[u32]) -> MockMesh {
        self.meshes_uploaded += 1;
        MockMesh {
            id: self.meshes_uploaded,
            label: label.to_string(),
            vertex_count: vertices.len(),
            index_count: indices.len(),
        }
    }

    fn create_material(
        &mut self,
        label: &str,
        textures: TextureSlots<&MockTexture>,
        loaded: TextureSlots<bool>,
    ) -> MockMaterial {
        self.materials_created += 1;
        MockMaterial {
            id: self.materials_created,
            label: label.to_string(),
            textures: textures.map(|_, texture| texture.label.clone()),
            loaded,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    BindMesh(String),
    ApplyMaterial(String, ObjectUniforms),
    Draw(u32),
}

/// A draw target that keeps every call in order.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub calls: Vec<DrawCall>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// (mesh label, material label, world matrix) per issued draw.
    pub fn draws(&self) -> Vec<(String, String, Matrix4<f32>)> {
        let mut draws = Vec::new();
        let mut mesh = None;
        let mut material = None;
        for call in &self.calls {
            match call {
                DrawCall::BindMesh(label) => mesh = Some(label.clone()),
                DrawCall::ApplyMaterial(label, uniforms) => {
                    material = Some((label.clone(), uniforms.world))
                }
                DrawCall::Draw(_) => {
                    let (material, world) = material.clone().expect("draw without material");
                    draws.push((mesh.clone().expect("draw without mesh"), material, world));
                }
            }
        }
        draws
    }

    pub fn uniforms(&self) -> Vec<ObjectUniforms> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::ApplyMaterial(_, uniforms) => Some(*uniforms),
                _ => None,
            })
            .collect()
    }
}

impl DrawTarget<MockGpu> for RecordingTarget {
    fn bind_mesh(&mut self, mesh: &MockMesh) {
        self.calls.push(DrawCall::BindMesh(mesh.label.clone()));
    }

    fn apply_material(&mut self, material: &MockMaterial, uniforms: &ObjectUniforms) {
        self.calls
            .push(DrawCall::ApplyMaterial(material.label.clone(), *uniforms));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.calls.push(DrawCall::Draw(index_count));
    }
}

pub fn default_texture() -> MockTexture {
    MockTexture {
        label: "default".to_string(),
        width: 1,
        height: 1,
        srgb: true,
    }
}

pub fn texture_cache(base_path: &std::path::Path) -> TextureCache<MockGpu> {
    TextureCache::new(base_path, default_texture())
}

pub fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("scene-ngin-{}", name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a solid 2x2 PNG and returns its file name.
pub fn write_png(dir: &std::path::Path, name: &str) -> String {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]));
    image.save(dir.join(name)).unwrap();
    name.to_string()
}

/// A single triangle in the XY plane.
pub fn triangle(name: &str, material: MaterialId) -> MeshData {
    let mut mesh = MeshData {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        tangents: Vec::new(),
        tex_coords: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        indices: vec![0, 1, 2],
        material,
    };
    mesh.compute_tangents();
    mesh
}

/// A scene with one material and `meshes` triangles, none placed yet.
pub fn scene_with_meshes(meshes: &[&str]) -> SourceScene {
    let mut scene = SourceScene::new(".");
    let material = scene.add_material(MaterialData::new("plain"));
    for name in meshes {
        scene.add_mesh(triangle(name, material));
    }
    scene
}

/// Input driven by the test instead of a window. The cursor starts at the
/// window origin.
#[derive(Debug)]
pub struct ScriptedInput {
    pub keys: HashSet<KeyCode>,
    pub buttons: HashSet<MouseButton>,
    pub cursor: Option<(f32, f32)>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            keys: HashSet::new(),
            buttons: HashSet::new(),
            cursor: Some((0.0, 0.0)),
        }
    }

    pub fn press(&mut self, key: KeyCode) -> &mut Self {
        self.keys.insert(key);
        self
    }

    pub fn release(&mut self, key: KeyCode) -> &mut Self {
        self.keys.remove(&key);
        self
    }

    pub fn move_cursor_by(&mut self, dx: f32, dy: f32) -> &mut Self {
        let (x, y) = self.cursor.unwrap_or_default();
        self.cursor = Some((x + dx, y + dy));
        self
    }

    pub fn move_cursor_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.cursor = Some((x, y));
        self
    }

    pub fn leave_window(&mut self) -> &mut Self {
        self.cursor = None;
        self
    }
}

impl InputSource for ScriptedInput {
    fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn cursor_position(&self) -> Option<Vector2<f32>> {
        self.cursor.map(|(x, y)| Vector2::new(x, y))
    }
}
