//! The imported scene: a node tree over flat mesh and material arrays.
//!
//! A [`SourceScene`] is what an importer hands to the engine. Nodes reference
//! meshes by [`MeshId`], meshes reference materials by [`MaterialId`]. The tree
//! can only grow by appending a child to an existing node, which keeps it free
//! of cycles and shared children.

use std::path::{Path, PathBuf};

use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::model::{MaterialData, MaterialId, MeshData, MeshId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Matrix4<f32>,
    pub meshes: Vec<MeshId>,
    pub children: Vec<NodeId>,
}

impl SceneNode {
    fn new(name: impl Into<String>, transform: Matrix4<f32>) -> Self {
        Self {
            name: name.into(),
            transform,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SourceScene {
    /// Directory texture paths are resolved against.
    pub base_path: PathBuf,
    nodes: Vec<SceneNode>,
    meshes: Vec<MeshData>,
    materials: Vec<MaterialData>,
}

impl SourceScene {
    /// Creates a scene holding only an identity root node.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            nodes: vec![SceneNode::new("root", Matrix4::identity())],
            meshes: Vec::new(),
            materials: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: Matrix4<f32>,
    ) -> NodeId {
        assert!(parent.0 < self.nodes.len(), "unknown parent node {:?}", parent);
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode::new(name, transform));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: MaterialData) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Adds a mesh reference to a node. The same mesh may be referenced from
    /// any number of nodes.
    pub fn attach_mesh(&mut self, node: NodeId, mesh: MeshId) {
        assert!(mesh.0 < self.meshes.len(), "unknown mesh {}", mesh);
        self.nodes[node.0].meshes.push(mesh);
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&MaterialData> {
        self.materials.get(id.0)
    }

    pub fn meshes(&self) -> &[MeshData] {
        &self.meshes
    }

    pub fn materials(&self) -> &[MaterialData] {
        &self.materials
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Pre-order, depth-first walk from the root with accumulated world
    /// transforms. Siblings are visited in insertion order.
    pub fn traverse(&self) -> Traversal<'_> {
        Traversal {
            scene: self,
            stack: vec![(self.root(), Matrix4::identity())],
        }
    }
}

/// A node visited by [`SourceScene::traverse`].
#[derive(Clone, Copy, Debug)]
pub struct Visit<'a> {
    pub id: NodeId,
    pub node: &'a SceneNode,
    /// `parent_world * node.transform`.
    pub world: Matrix4<f32>,
}

/**
 * Iterative pre-order traversal.
 *
 * Uses an explicit stack so arbitrarily deep hierarchies cannot overflow the
 * call stack. Children are pushed in reverse to preserve sibling order.
 */
pub struct Traversal<'a> {
    scene: &'a SourceScene,
    stack: Vec<(NodeId, Matrix4<f32>)>,
}

impl<'a> Iterator for Traversal<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, parent_world) = self.stack.pop()?;
        let node = self.scene.node(id);
        let world = parent_world * node.transform;
        self.stack
            .extend(node.children.iter().rev().map(|&child| (child, world)));
        Some(Visit { id, node, world })
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    #[test]
    fn traversal_is_pre_order_and_keeps_sibling_order() {
        let mut scene = SourceScene::new(".");
        let a = scene.add_node(scene.root(), "a", Matrix4::identity());
        let b = scene.add_node(scene.root(), "b", Matrix4::identity());
        let a1 = scene.add_node(a, "a1", Matrix4::identity());
        let a2 = scene.add_node(a, "a2", Matrix4::identity());
        let b1 = scene.add_node(b, "b1", Matrix4::identity());

        let order: Vec<_> = scene.traverse().map(|visit| visit.id).collect();
        assert_eq!(order, vec![scene.root(), a, a1, a2, b, b1]);
    }

    #[test]
    fn world_transforms_accumulate_down_the_tree() {
        let mut scene = SourceScene::new(".");
        let parent = scene.add_node(
            scene.root(),
            "parent",
            Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)),
        );
        let child = scene.add_node(
            parent,
            "child",
            Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0)),
        );

        let visit = scene.traverse().find(|visit| visit.id == child).unwrap();
        assert_eq!(
            visit.world,
            Matrix4::from_translation(Vector3::new(1.0, 2.0, 0.0))
        );
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let mut scene = SourceScene::new(".");
        let mut parent = scene.root();
        for i in 0..100_000 {
            parent = scene.add_node(parent, format!("n{i}"), Matrix4::identity());
        }
        assert_eq!(scene.traverse().count(), 100_001);
    }
}
