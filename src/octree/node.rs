//! Octree node

use crate::core::types::Vec3;
use crate::geometry::Triangle;
use crate::math::Aabb;

/// Index of a node in the octree arena
pub type NodeId = u32;

/// A cubic region of the scene
#[derive(Clone, Debug)]
pub struct OctreeNode {
    /// Partition cube; children split it at `mid()`
    pub cube: Aabb,
    /// Cube grown to enclose every triangle of the subtree
    pub bounds: Aabb,
    /// Faces of `bounds`, used for node-level culling only
    pub shell: [Triangle; 12],
    /// Child per octant (bit 0=x, bit 1=y, bit 2=z); `None` for empty octants.
    /// All `None` on a leaf.
    pub children: [Option<NodeId>; 8],
    /// Global indices of the scene triangles owned by this node
    pub triangles: Vec<usize>,
    /// Distance from the root
    pub depth: u8,
}

impl OctreeNode {
    pub fn min(&self) -> Vec3 {
        self.cube.min
    }

    pub fn mid(&self) -> Vec3 {
        self.cube.center()
    }

    pub fn max(&self) -> Vec3 {
        self.cube.max
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Present children in octant order
    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().flatten().copied()
    }
}
