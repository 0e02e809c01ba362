//! Viewer settings with TOML file support.
//!
//! Every section uses `#[serde(default)]`, so a file that only overrides
//! `[camera]` leaves the window and asset settings at their defaults.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when no other path is given.
pub const DEFAULT_OPTIONS_FILE: &str = "viewer.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ViewerOptions {
    pub window: WindowOptions,
    pub assets: AssetOptions,
    pub camera: CameraOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Linear RGBA the frame is cleared to.
    pub clear_colour: [f64; 4],
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "scene-ngin".to_string(),
            width: 640,
            height: 480,
            clear_colour: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetOptions {
    /// Model files and their textures are resolved against this directory.
    pub directory: PathBuf,
    pub model: PathBuf,
    /// Relative to `directory`. Substituted for every missing texture slot.
    pub default_texture: PathBuf,
    /// WGSL file to render with instead of the built-in shader.
    pub shader: Option<PathBuf>,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data/sponza"),
            model: PathBuf::from("sponza.obj"),
            default_texture: PathBuf::from("white.png"),
            shader: None,
        }
    }
}

impl AssetOptions {
    pub fn model_path(&self) -> PathBuf {
        self.directory.join(&self.model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub start_position: [f32; 3],
    pub mouse_sensitivity: f32,
    /// Degrees per pixel per millisecond, before sensitivity.
    pub rotation_rate: f32,
    /// World units per millisecond.
    pub movement_rate: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 10000.0,
            start_position: [0.0, 0.0, 100.0],
            mouse_sensitivity: 2.0,
            rotation_rate: 0.01,
            movement_rate: 1.0,
        }
    }
}

impl ViewerOptions {
    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read options file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Could not parse options file {}", path.display()))
    }

    /// Loads `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            log::info!("Loading options from {}", path.display());
            Self::load(path)
        } else {
            log::info!("No {} found, using default options", path.display());
            Ok(Self::default())
        }
    }
}
