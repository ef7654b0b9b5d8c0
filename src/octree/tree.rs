//! Arena-backed octree

use super::builder::OctreeConfig;
use super::node::{NodeId, OctreeNode};

/// Octree over a triangle list, built once and immutable afterwards.
///
/// Node 0 is the root. Triangles are referenced by their global index into
/// the list the tree was built from.
#[derive(Clone, Debug)]
pub struct Octree {
    pub(super) nodes: Vec<OctreeNode>,
    pub(super) config: OctreeConfig,
}

impl Octree {
    pub const ROOT: NodeId = 0;

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[Self::ROOT as usize]
    }

    /// Get reference to a node.
    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id as usize]
    }

    /// Slice of all nodes in creation order (parents before children).
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Deepest node level (root = 0)
    pub fn depth(&self) -> u8 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Call `f` with every triangle index owned by `id` or its descendants
    pub fn for_each_in_subtree(&self, id: NodeId, f: &mut impl FnMut(usize)) {
        let node = self.node(id);
        for &t in &node.triangles {
            f(t);
        }
        for child in node.child_ids() {
            self.for_each_in_subtree(child, f);
        }
    }

    /// Every triangle index owned by `id` or its descendants
    pub fn subtree_triangles(&self, id: NodeId) -> Vec<usize> {
        let mut out = Vec::new();
        self.for_each_in_subtree(id, &mut |t| out.push(t));
        out
    }
}
