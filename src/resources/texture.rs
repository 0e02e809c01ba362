//! Path-keyed texture cache with a default texture.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    data_structures::{
        arena::{Arena, Handle},
        model::TextureSource,
    },
    gpu::GpuBackend,
};

/**
 * Owns every GPU texture loaded for a scene.
 *
 * There is at most one resident texture per key (file path or embedded image
 * name). The default texture lives outside the keyed map and is never evicted,
 * so it can always stand in for a missing or failed slot.
 */
pub struct TextureCache<B: GpuBackend> {
    base_path: PathBuf,
    textures: Arena<B::Texture>,
    by_key: HashMap<String, Handle<B::Texture>>,
    default: Handle<B::Texture>,
}

impl<B: GpuBackend> TextureCache<B> {
    pub fn new(base_path: impl AsRef<Path>, default_texture: B::Texture) -> Self {
        let mut textures = Arena::new();
        let default = textures.insert(default_texture);
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            textures,
            by_key: HashMap::new(),
            default,
        }
    }

    /// Decodes and uploads a texture.
    ///
    /// Loading a key that is already resident evicts the old texture first;
    /// handles to it go stale. `srgb` is false for normal maps.
    pub fn load(
        &mut self,
        source: &TextureSource,
        srgb: bool,
        backend: &mut B,
    ) -> anyhow::Result<Handle<B::Texture>> {
        let key = source.key();
        if let Some(old) = self.by_key.remove(&key) {
            log::debug!("Reloading texture {}", key);
            self.textures.remove(old);
        }

        let image = decode(&self.base_path, source)?;
        let texture = backend
            .upload_texture(&key, &image, srgb)
            .with_context(|| format!("Could not upload texture {}", key))?;
        let handle = self.textures.insert(texture);
        self.by_key.insert(key, handle);
        Ok(handle)
    }

    /// Returns the resident texture for `source`, loading it if needed.
    pub fn acquire(
        &mut self,
        source: &TextureSource,
        srgb: bool,
        backend: &mut B,
    ) -> anyhow::Result<Handle<B::Texture>> {
        match self.by_key.get(&source.key()) {
            Some(&handle) => Ok(handle),
            None => self.load(source, srgb, backend),
        }
    }

    pub fn default_handle(&self) -> Handle<B::Texture> {
        self.default
    }

    pub fn handle(&self, key: &str) -> Option<Handle<B::Texture>> {
        self.by_key.get(key).copied()
    }

    pub fn get(&self, handle: Handle<B::Texture>) -> Option<&B::Texture> {
        self.textures.get(handle)
    }

    /// The texture behind `handle`, or the default when there is none or it
    /// was evicted.
    pub fn resolve(&self, handle: Option<Handle<B::Texture>>) -> &B::Texture {
        handle
            .and_then(|handle| self.textures.get(handle))
            .or_else(|| self.textures.get(self.default))
            .expect("the default texture is never evicted")
    }

    /// Number of keyed textures, excluding the default.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Drops every keyed texture. The default texture stays.
    pub fn unload_all(&mut self) {
        for (_, handle) in self.by_key.drain() {
            self.textures.remove(handle);
        }
    }
}

/// Decodes a texture source into an image. Paths are relative to `base_path`.
pub fn decode(base_path: &Path, source: &TextureSource) -> anyhow::Result<image::DynamicImage> {
    match source {
        TextureSource::Path(path) => {
            let path = base_path.join(normalize(path));
            image::ImageReader::open(&path)
                .with_context(|| format!("Could not open texture {}", path.display()))?
                .with_guessed_format()?
                .decode()
                .with_context(|| format!("Could not decode texture {}", path.display()))
        }
        TextureSource::Embedded {
            key,
            data,
            mime_type,
        } => {
            let format = mime_type.as_deref().and_then(image::ImageFormat::from_mime_type);
            let image = match format {
                Some(format) => image::load_from_memory_with_format(data, format),
                None => image::load_from_memory(data),
            };
            image.with_context(|| format!("Could not decode embedded texture {}", key))
        }
    }
}

/// Material files written on Windows use backslashes as separators.
fn normalize(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) if s.contains('\\') => PathBuf::from(s.replace('\\', "/")),
        _ => path.to_path_buf(),
    }
}
