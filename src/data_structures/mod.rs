//! Engine data structures: imported scenes, meshes, materials and textures.
//!
//! - `arena` is the generational storage behind every cached GPU record
//! - `model` contains imported mesh/material data and the GPU vertex layout
//! - `scene_graph` holds the imported node tree and its traversal
//! - `texture` contains the wgpu texture wrapper and creation utilities

pub mod arena;
pub mod model;
pub mod scene_graph;
pub mod texture;
