//! The per-frame scene traversal.
//!
//! [`render_scene`] walks the imported node tree in pre-order and issues one
//! indexed draw per mesh reference into a [`DrawTarget`]. Which world
//! transform and camera each draw sees is tracked by a [`RenderContext`].

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    camera::Camera,
    data_structures::scene_graph::SourceScene,
    gpu::{DrawTarget, GpuBackend, ObjectUniforms},
    resources::cache::ResourceCache,
};

/// State shared by every draw of a frame.
#[derive(Debug)]
pub struct RenderContext<'a> {
    pub camera: &'a mut Camera,
    /// World transform of the node being drawn.
    pub world: Matrix4<f32>,
}

impl<'a> RenderContext<'a> {
    pub fn new(camera: &'a mut Camera) -> Self {
        Self {
            camera,
            world: Matrix4::identity(),
        }
    }

    pub fn object_uniforms(&mut self) -> ObjectUniforms {
        ObjectUniforms {
            world: self.world,
            world_view_projection: self.camera.view_projection_matrix() * self.world,
            camera_position: self.camera.position(),
        }
    }
}

/// What a call to [`render_scene`] drew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    pub skipped: usize,
}

/**
 * Draws every realized mesh reachable from the scene root.
 *
 * Per mesh reference: bind its buffers, apply its material with the node's
 * world matrix and issue one indexed triangle-list draw. References without a
 * record are skipped with a warning.
 */
pub fn render_scene<B, T>(
    scene: &SourceScene,
    cache: &ResourceCache<B>,
    camera: &mut Camera,
    target: &mut T,
) -> FrameStats
where
    B: GpuBackend,
    T: DrawTarget<B>,
{
    let mut stats = FrameStats::default();
    let mut ctx = RenderContext::new(camera);
    for visit in scene.traverse() {
        ctx.world = visit.world;
        for &mesh_id in &visit.node.meshes {
            let Some(mesh) = cache.mesh(mesh_id) else {
                log::warn!("{} on node '{}' was never realized", mesh_id, visit.node.name);
                stats.skipped += 1;
                continue;
            };
            let Some(material) = cache.material(mesh.material) else {
                log::warn!("{} has no material record", mesh_id);
                stats.skipped += 1;
                continue;
            };
            target.bind_mesh(&mesh.buffers);
            target.apply_material(&material.binding, &ctx.object_uniforms());
            target.draw_indexed(mesh.index_count);
            stats.draws += 1;
        }
    }
    stats
}
