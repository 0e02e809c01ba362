use std::path::Path;

use anyhow::{Context as _, bail};

use crate::data_structures::scene_graph::SourceScene;

/**
 * This module contains all logic for loading scenes and textures from external
 * files and turning them into GPU records.
 */
pub mod cache;
pub mod gltf_scene;
pub mod obj;
pub mod texture;

pub async fn load_string(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))
}

/// Imports a model file, picking the importer by file extension.
pub async fn import_scene(path: &Path) -> anyhow::Result<SourceScene> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => obj::import_obj(path).await,
        Some("gltf") | Some("glb") => gltf_scene::import_gltf(path).await,
        _ => bail!("Unsupported model format: {}", path.display()),
    }
}
