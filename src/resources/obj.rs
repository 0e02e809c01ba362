use std::{
    io::{BufReader, Cursor},
    path::Path,
};

use anyhow::Context as _;
use cgmath::{Matrix4, SquareMatrix};

use crate::{
    data_structures::{
        model::{MaterialData, MaterialId, MeshData, TextureKind, TextureSource},
        scene_graph::SourceScene,
    },
    resources::load_string,
};

/**
 * Imports a Wavefront OBJ file and its material library.
 *
 * Every object in the file becomes one child of an identity root holding one
 * mesh. Obj files carry no tangents, so they are computed from the UVs.
 */
pub async fn import_obj(path: &Path) -> anyhow::Result<SourceScene> {
    let base_path = path.parent().unwrap_or(Path::new("")).to_path_buf();
    let obj_text = load_string(path).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let mtl_base = base_path.clone();
    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        move |p| {
            let mtl_path = mtl_base.join(&p);
            async move {
                match load_string(&mtl_path).await {
                    Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                    Err(e) => {
                        log::warn!("{:#}", e);
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await
    .with_context(|| format!("Could not parse {}", path.display()))?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!(
            "{} has no usable material library ({}), meshes use the default material",
            path.display(),
            e
        );
        Vec::new()
    });

    let mut scene = SourceScene::new(&base_path);
    for m in &obj_materials {
        scene.add_material(material_data(m));
    }

    let mut default_material = None;
    for model in models {
        let material = match model.mesh.material_id {
            Some(id) if id < obj_materials.len() => MaterialId(id),
            _ => *default_material
                .get_or_insert_with(|| scene.add_material(MaterialData::new("default"))),
        };
        let mesh = mesh_data(&model, material)
            .with_context(|| format!("Could not import {}", path.display()))?;
        let mesh = scene.add_mesh(mesh);
        let node = scene.add_node(scene.root(), model.name.clone(), Matrix4::identity());
        scene.attach_mesh(node, mesh);
    }

    log::info!(
        "Imported {}: {} meshes, {} materials",
        path.display(),
        scene.meshes().len(),
        scene.materials().len()
    );
    Ok(scene)
}

fn material_data(m: &tobj::Material) -> MaterialData {
    let mut material = MaterialData::new(&m.name);
    let slots = [
        (TextureKind::Diffuse, &m.diffuse_texture),
        (TextureKind::Normal, &m.normal_texture),
        (TextureKind::Specular, &m.specular_texture),
    ];
    for (kind, texture) in slots {
        if let Some(texture) = texture.as_deref().filter(|t| !t.is_empty()) {
            material = material.with_texture(kind, TextureSource::from(texture));
        }
    }
    material
}

fn mesh_data(model: &tobj::Model, material: MaterialId) -> anyhow::Result<MeshData> {
    let m = &model.mesh;
    anyhow::ensure!(
        !m.positions.is_empty(),
        "mesh '{}' has no positions",
        model.name
    );
    let count = m.positions.len() / 3;

    let normals = if m.normals.len() == m.positions.len() {
        m.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
    } else {
        log::warn!("mesh '{}' has no normals", model.name);
        vec![[0.0; 3]; count]
    };

    let tex_coords = if m.texcoords.len() == count * 2 {
        // wgpu puts the texture origin at the top left
        m.texcoords.chunks_exact(2).map(|t| [t[0], 1.0 - t[1]]).collect()
    } else {
        log::warn!("mesh '{}' has no texture coordinates", model.name);
        vec![[0.0; 2]; count]
    };

    let mut mesh = MeshData {
        name: model.name.clone(),
        positions: m.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
        normals,
        tangents: Vec::new(),
        tex_coords,
        indices: m.indices.clone(),
        material,
    };
    mesh.compute_tangents();
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_FACE: &str = "\
mtllib face.mtl
o face
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl brick
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const FACE_MTL: &str = "\
newmtl brick
map_Kd brick.png
map_Bump brick_normal.png
map_Ks brick_spec.png
";

    fn write_fixture(dir: &Path, with_mtl: bool) -> std::path::PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let obj = dir.join("face.obj");
        std::fs::write(&obj, CUBE_FACE).unwrap();
        if with_mtl {
            std::fs::write(dir.join("face.mtl"), FACE_MTL).unwrap();
        }
        obj
    }

    #[tokio::test]
    async fn imports_quad_with_material_slots() {
        let dir = std::env::temp_dir().join("scene-ngin-obj-import");
        let obj = write_fixture(&dir, true);

        let scene = import_obj(&obj).await.unwrap();

        assert_eq!(scene.base_path, dir);
        assert_eq!(scene.meshes().len(), 1);
        let mesh = &scene.meshes()[0];
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.tangents.len(), mesh.vertex_count());
        // V is flipped
        assert!(mesh.tex_coords.contains(&[0.0, 1.0]));
        mesh.validate().unwrap();

        let material = scene.material(mesh.material).unwrap();
        assert_eq!(material.name, "brick");
        for (kind, file) in [
            (TextureKind::Diffuse, "brick.png"),
            (TextureKind::Normal, "brick_normal.png"),
            (TextureKind::Specular, "brick_spec.png"),
        ] {
            assert_eq!(material.texture(kind), Some(&TextureSource::from(file)));
        }

        let root = scene.node(scene.root());
        assert_eq!(root.children.len(), 1);
        assert_eq!(scene.node(root.children[0]).meshes, vec![mesh_id(0)]);
    }

    #[tokio::test]
    async fn missing_material_library_uses_default_material() {
        let dir = std::env::temp_dir().join("scene-ngin-obj-no-mtl");
        let obj = write_fixture(&dir, false);
        let _ = std::fs::remove_file(dir.join("face.mtl"));

        let scene = import_obj(&obj).await.unwrap();

        assert_eq!(scene.materials().len(), 1);
        assert_eq!(scene.materials()[0].name, "default");
        assert_eq!(scene.meshes()[0].material, MaterialId(0));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("scene-ngin-does-not-exist.obj");
        assert!(import_obj(&path).await.is_err());
    }

    fn mesh_id(i: usize) -> crate::data_structures::model::MeshId {
        crate::data_structures::model::MeshId(i)
    }
}
