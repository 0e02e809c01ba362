use std::{collections::HashSet, path::Path};

use anyhow::{Context as _, bail};
use cgmath::Matrix4;

use crate::{
    data_structures::{
        model::{MaterialData, MaterialId, MeshData, MeshId, TextureKind, TextureSource},
        scene_graph::{NodeId, SourceScene},
    },
    resources::load_binary,
};

/**
 * Imports a glTF or GLB file.
 *
 * The node hierarchy of the default scene is kept as is, below an identity
 * root. Each primitive becomes its own mesh. glTF has no specular slot, so
 * only diffuse (base colour) and normal textures are filled.
 */
pub async fn import_gltf(path: &Path) -> anyhow::Result<SourceScene> {
    let base_path = path.parent().unwrap_or(Path::new("")).to_path_buf();
    let gltf_bytes = load_binary(path).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("Could not parse {}", path.display()))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("{} references a missing binary chunk", path.display()),
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                bail!("{}: data URIs are not supported", path.display())
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(&base_path.join(uri)).await?);
            }
        }
    }

    let mut scene = SourceScene::new(&base_path);
    let file_name = path.file_name().map(|f| f.to_string_lossy().into_owned());
    let file_name = file_name.unwrap_or_default();

    for material in gltf.materials() {
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material{}", material.index().unwrap_or_default()));
        let mut data = MaterialData::new(name);
        if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
            let source = texture_source(&file_name, &info.texture(), &buffer_data)?;
            data = data.with_texture(TextureKind::Diffuse, source);
        }
        if let Some(normal) = material.normal_texture() {
            let source = texture_source(&file_name, &normal.texture(), &buffer_data)?;
            data = data.with_texture(TextureKind::Normal, source);
        }
        scene.add_material(data);
    }
    let material_count = scene.materials().len();
    let mut default_material = None;

    // glTF mesh index -> one mesh per primitive
    let mut meshes: Vec<Vec<MeshId>> = Vec::new();
    for mesh in gltf.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of mesh {}: {:?} is not supported",
                    primitive.index(),
                    mesh.index(),
                    primitive.mode()
                );
                continue;
            }
            let material = match primitive.material().index() {
                Some(index) if index < material_count => MaterialId(index),
                _ => *default_material
                    .get_or_insert_with(|| scene.add_material(MaterialData::new("default"))),
            };
            let name = match mesh.name() {
                Some(name) => format!("{}/{}", name, primitive.index()),
                None => format!("mesh{}/{}", mesh.index(), primitive.index()),
            };
            let data = primitive_data(name, &primitive, &buffer_data, material)?;
            primitives.push(scene.add_mesh(data));
        }
        meshes.push(primitives);
    }

    let default_scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{} contains no scene", path.display()))?;

    // Children are pushed in reverse so that popping keeps sibling order.
    let roots: Vec<_> = default_scene.nodes().collect();
    let mut stack: Vec<(gltf::Node, NodeId)> = roots
        .into_iter()
        .rev()
        .map(|node| (node, scene.root()))
        .collect();
    let mut visited = HashSet::new();
    while let Some((node, parent)) = stack.pop() {
        if !visited.insert(node.index()) {
            bail!(
                "{}: node {} is reached twice, the node graph is not a tree",
                path.display(),
                node.index()
            );
        }
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index()));
        let transform = Matrix4::from(node.transform().matrix());
        let id = scene.add_node(parent, name, transform);
        if let Some(mesh) = node.mesh() {
            for &mesh_id in &meshes[mesh.index()] {
                scene.attach_mesh(id, mesh_id);
            }
        }
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (child, id)));
    }

    log::info!(
        "Imported {}: {} nodes, {} meshes, {} materials",
        path.display(),
        scene.node_count(),
        scene.meshes().len(),
        scene.materials().len()
    );
    Ok(scene)
}

fn texture_source(
    file_name: &str,
    texture: &gltf::Texture,
    buffer_data: &[Vec<u8>],
) -> anyhow::Result<TextureSource> {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = &buffer_data[view.buffer().index()];
            let start = view.offset();
            let end = start + view.length();
            let data = buffer
                .get(start..end)
                .with_context(|| format!("image {} lies outside its buffer", image.index()))?
                .to_vec();
            Ok(TextureSource::Embedded {
                key: format!("{}#image{}", file_name, image.index()),
                data,
                mime_type: Some(mime_type.to_string()),
            })
        }
        gltf::image::Source::Uri { uri, .. } => Ok(TextureSource::from(uri)),
    }
}

fn primitive_data(
    name: String,
    primitive: &gltf::Primitive,
    buffer_data: &[Vec<u8>],
    material: MaterialId,
) -> anyhow::Result<MeshData> {
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = match reader.read_positions() {
        Some(positions) => positions.collect(),
        None => bail!("mesh '{}' has no positions", name),
    };
    let count = positions.len();

    let normals = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => {
            log::warn!("mesh '{}' has no normals", name);
            vec![[0.0; 3]; count]
        }
    };
    let tex_coords = match reader.read_tex_coords(0) {
        Some(tex_coords) => tex_coords.into_f32().collect(),
        None => {
            log::warn!("mesh '{}' has no texture coordinates", name);
            vec![[0.0; 2]; count]
        }
    };
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..count as u32).collect(),
    };

    let mut mesh = MeshData {
        name,
        positions,
        normals,
        tangents: Vec::new(),
        tex_coords,
        indices,
        material,
    };
    match reader.read_tangents() {
        Some(tangents) => mesh.tangents = tangents.map(|[x, y, z, _]| [x, y, z]).collect(),
        None => mesh.compute_tangents(),
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    const TRIANGLE: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [
    { "name": "parent", "translation": [1.0, 0.0, 0.0], "children": [1] },
    { "name": "child", "translation": [0.0, 2.0, 0.0], "mesh": 0 }
  ],
  "meshes": [{ "name": "triangle", "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
  "buffers": [{ "uri": "triangle.bin", "byteLength": 48 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 12 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }
  ]
}"#;

    fn write_fixture(dir: &Path) -> std::path::PathBuf {
        write_gltf(dir, TRIANGLE)
    }

    fn write_gltf(dir: &Path, json: &str) -> std::path::PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u32; 3] = [0, 1, 2];
        let mut bin = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
        bin.extend_from_slice(bytemuck::cast_slice(&indices));
        std::fs::write(dir.join("triangle.bin"), bin).unwrap();
        let gltf = dir.join("triangle.gltf");
        std::fs::write(&gltf, json).unwrap();
        gltf
    }

    #[tokio::test]
    async fn keeps_the_node_hierarchy() {
        let dir = std::env::temp_dir().join("scene-ngin-gltf-import");
        let scene = import_gltf(&write_fixture(&dir)).await.unwrap();

        assert_eq!(scene.node_count(), 3);
        let names: Vec<_> = scene.traverse().map(|visit| visit.node.name.clone()).collect();
        assert_eq!(names, vec!["root", "parent", "child"]);

        let child = scene.traverse().find(|visit| visit.node.name == "child").unwrap();
        assert_eq!(child.node.meshes, vec![MeshId(0)]);
        assert_eq!(
            child.world,
            Matrix4::from_translation(Vector3::new(1.0, 2.0, 0.0))
        );
    }

    #[tokio::test]
    async fn fills_missing_attributes() {
        let dir = std::env::temp_dir().join("scene-ngin-gltf-attributes");
        let scene = import_gltf(&write_fixture(&dir)).await.unwrap();

        let mesh = &scene.meshes()[0];
        mesh.validate().unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.normals, vec![[0.0; 3]; 3]);
        assert_eq!(scene.material(mesh.material).unwrap().name, "default");
    }

    #[tokio::test]
    async fn shared_child_node_is_rejected() {
        let dir = std::env::temp_dir().join("scene-ngin-gltf-shared-child");
        let json = TRIANGLE.replace(
            r#""scenes": [{ "nodes": [0] }]"#,
            r#""scenes": [{ "nodes": [0, 1] }]"#,
        );
        assert!(import_gltf(&write_gltf(&dir, &json)).await.is_err());
    }

    #[tokio::test]
    async fn node_cycle_is_rejected() {
        let dir = std::env::temp_dir().join("scene-ngin-gltf-cycle");
        let json = TRIANGLE.replace(
            r#""translation": [0.0, 2.0, 0.0], "mesh": 0"#,
            r#""translation": [0.0, 2.0, 0.0], "mesh": 0, "children": [0]"#,
        );
        assert!(import_gltf(&write_gltf(&dir, &json)).await.is_err());
    }
}
