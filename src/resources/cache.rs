//! GPU records for the meshes and materials of an imported scene.
//!
//! Realization walks the scene once and creates each record the first time
//! its source is reached. Records are keyed by source identity, so a mesh
//! referenced from many nodes is uploaded once and a material shared by many
//! meshes is bound once.

use std::collections::HashMap;

use anyhow::Context as _;

use crate::{
    data_structures::{
        arena::{Arena, Handle},
        model::{MaterialId, MeshId, TextureKind, TextureSlots},
        scene_graph::SourceScene,
    },
    gpu::GpuBackend,
    resources::texture::TextureCache,
};

pub struct MaterialRecord<B: GpuBackend> {
    pub source: MaterialId,
    pub name: String,
    /// `None` where the slot fell back to the default texture.
    pub textures: TextureSlots<Option<Handle<B::Texture>>>,
    pub binding: B::Material,
}

impl<B: GpuBackend> MaterialRecord<B> {
    pub fn has_texture(&self, kind: TextureKind) -> bool {
        self.textures.get(kind).is_some()
    }
}

pub struct MeshRecord<B: GpuBackend> {
    pub source: MeshId,
    pub material: Handle<MaterialRecord<B>>,
    pub buffers: B::Mesh,
    pub index_count: u32,
}

/// What a call to [`ResourceCache::realize`] created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RealizeStats {
    pub meshes_created: usize,
    pub materials_created: usize,
    /// Texture slots that fell back to the default texture because their
    /// source was missing or failed to load.
    pub default_texture_slots: usize,
}

pub struct ResourceCache<B: GpuBackend> {
    meshes: Arena<MeshRecord<B>>,
    materials: Arena<MaterialRecord<B>>,
    mesh_index: HashMap<MeshId, Handle<MeshRecord<B>>>,
    material_index: HashMap<MaterialId, Handle<MaterialRecord<B>>>,
}

impl<B: GpuBackend> Default for ResourceCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GpuBackend> ResourceCache<B> {
    pub fn new() -> Self {
        Self {
            meshes: Arena::new(),
            materials: Arena::new(),
            mesh_index: HashMap::new(),
            material_index: HashMap::new(),
        }
    }

    /**
     * Creates the records for every mesh reachable from the scene root.
     *
     * Nodes are visited in pre-order, a node's own meshes before its
     * children. Meshes and materials that already have a record are only
     * looked up, so calling this again on the same scene creates nothing.
     *
     * Texture failures are logged and replaced by the default texture.
     * Malformed mesh data is an error.
     */
    pub fn realize(
        &mut self,
        scene: &SourceScene,
        backend: &mut B,
        textures: &mut TextureCache<B>,
    ) -> anyhow::Result<RealizeStats> {
        let mut stats = RealizeStats::default();
        for visit in scene.traverse() {
            for &mesh_id in &visit.node.meshes {
                if self.mesh_index.contains_key(&mesh_id) {
                    continue;
                }
                let mesh = scene
                    .mesh(mesh_id)
                    .with_context(|| {
                        format!("node '{}' references unknown {}", visit.node.name, mesh_id)
                    })?;
                let vertices = mesh
                    .vertices()
                    .with_context(|| format!("Could not realize {}", mesh_id))?;
                let material =
                    self.material_or_create(scene, mesh.material, backend, textures, &mut stats)?;

                let buffers = backend.upload_mesh(&mesh.name, &vertices, &mesh.indices);
                let handle = self.meshes.insert(MeshRecord {
                    source: mesh_id,
                    material,
                    buffers,
                    index_count: mesh.indices.len() as u32,
                });
                self.mesh_index.insert(mesh_id, handle);
                stats.meshes_created += 1;
            }
        }
        log::info!(
            "Realized {} meshes and {} materials ({} texture slots use the default texture)",
            stats.meshes_created,
            stats.materials_created,
            stats.default_texture_slots
        );
        Ok(stats)
    }

    fn material_or_create(
        &mut self,
        scene: &SourceScene,
        id: MaterialId,
        backend: &mut B,
        textures: &mut TextureCache<B>,
        stats: &mut RealizeStats,
    ) -> anyhow::Result<Handle<MaterialRecord<B>>> {
        if let Some(&handle) = self.material_index.get(&id) {
            return Ok(handle);
        }
        let material = scene
            .material(id)
            .with_context(|| format!("mesh references unknown {}", id))?;

        let handles = material.textures.clone().map(|kind, source| {
            let source = source?;
            match textures.acquire(&source, kind.is_color(), backend) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::error!(
                        "Material '{}': {} texture failed to load, using the default texture: {:#}",
                        material.name,
                        kind,
                        e
                    );
                    None
                }
            }
        });
        stats.default_texture_slots += handles.iter().filter(|(_, h)| h.is_none()).count();

        let loaded = handles.map(|_, handle| handle.is_some());
        let binding = backend.create_material(
            &material.name,
            TextureSlots {
                diffuse: textures.resolve(handles.diffuse),
                normal: textures.resolve(handles.normal),
                specular: textures.resolve(handles.specular),
            },
            loaded,
        );

        let handle = self.materials.insert(MaterialRecord {
            source: id,
            name: material.name.clone(),
            textures: handles,
            binding,
        });
        self.material_index.insert(id, handle);
        stats.materials_created += 1;
        Ok(handle)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshRecord<B>> {
        self.mesh_index
            .get(&id)
            .and_then(|&handle| self.meshes.get(handle))
    }

    pub fn material(&self, handle: Handle<MaterialRecord<B>>) -> Option<&MaterialRecord<B>> {
        self.materials.get(handle)
    }

    pub fn material_for(&self, id: MaterialId) -> Option<&MaterialRecord<B>> {
        self.material_index
            .get(&id)
            .and_then(|&handle| self.materials.get(handle))
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Drops every record. Handles handed out before go stale.
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.materials.clear();
        self.mesh_index.clear();
        self.material_index.clear();
    }
}
