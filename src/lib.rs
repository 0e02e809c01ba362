//! scene-ngin
//!
//! A minimal real-time scene viewer. It imports a model, uploads each distinct
//! mesh and material to the GPU once and renders the node tree every frame from
//! a first-person camera.
//!
//! High-level modules
//! - `app`: window, event loop and per-frame update/render
//! - `camera`: view/projection caching and the first-person controller
//! - `context`: GPU and window context that owns surface, device and queue
//! - `data_structures`: imported scenes, meshes, materials and handles
//! - `gpu`: the backend seam between scene logic and wgpu
//! - `input`: keyboard and mouse state polled by the camera
//! - `options`: viewer settings loaded from TOML
//! - `pipelines`: shader compilation and the scene render pipeline
//! - `render`: the per-frame scene traversal
//! - `resources`: importers, the texture cache and the GPU resource cache
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod gpu;
pub mod input;
pub mod options;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use winit::keyboard::KeyCode;
