//! Top-down octree construction from a triangle list

use serde::{Deserialize, Serialize};

use super::node::{NodeId, OctreeNode};
use super::shell::cube_shell;
use super::tree::Octree;
use crate::geometry::Triangle;
use crate::math::Aabb;

/// Smallest root cube side, so flat or single-point scenes still subdivide
const MIN_ROOT_SIDE: f32 = 1e-4;

/// Octree subdivision limits
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Nodes at this depth are always leaves
    pub max_depth: u8,
    /// Nodes with at most this many triangles are leaves
    pub max_leaf_triangles: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_leaf_triangles: 16,
        }
    }
}

/// Builds an `Octree` by recursive centroid bucketing.
///
/// A triangle goes to the octant holding its centroid and is never split or
/// duplicated. A node's `bounds` grows past its cube to cover triangles that
/// poke out of it, so the node shell always encloses the node's geometry.
pub struct OctreeBuilder {
    config: OctreeConfig,
}

impl OctreeBuilder {
    pub fn new(config: OctreeConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, triangles: &[Triangle]) -> Octree {
        let scene_bounds = Aabb::from_points(triangles.iter().flat_map(|t| *t.vertices()));
        let root_cube = scene_bounds.bounding_cube(MIN_ROOT_SIDE);

        let mut octree = Octree {
            nodes: Vec::with_capacity(1 + triangles.len() / self.config.max_leaf_triangles.max(1)),
            config: self.config,
        };
        let candidates: Vec<usize> = (0..triangles.len()).collect();
        self.build_node(&mut octree, triangles, root_cube, candidates, 0);

        log::debug!(
            "Octree built: {} triangles, {} nodes, {} leaves, depth {}",
            triangles.len(),
            octree.node_count(),
            octree.leaf_count(),
            octree.depth()
        );
        octree
    }

    /// Returns the new node's id
    fn build_node(
        &self,
        octree: &mut Octree,
        triangles: &[Triangle],
        cube: Aabb,
        candidates: Vec<usize>,
        depth: u8,
    ) -> NodeId {
        let id = octree.nodes.len() as NodeId;
        octree.nodes.push(OctreeNode {
            cube,
            bounds: cube,
            shell: cube_shell(&cube),
            children: [None; 8],
            triangles: Vec::new(),
            depth,
        });

        let mut bounds = cube;
        let mut children = [None; 8];
        let mut owned = Vec::new();

        if candidates.len() <= self.config.max_leaf_triangles || depth >= self.config.max_depth {
            for &t in &candidates {
                bounds = bounds.merged(&triangles[t].bbox());
            }
            owned = candidates;
        } else {
            let mut buckets: [Vec<usize>; 8] = Default::default();
            for t in candidates {
                let octant = cube.octant_of(triangles[t].centroid());
                buckets[octant as usize].push(t);
            }
            for (octant, bucket) in buckets.into_iter().enumerate() {
                if bucket.is_empty() {
                    continue;
                }
                let child_cube = cube.child_octant(octant as u8);
                let child = self.build_node(octree, triangles, child_cube, bucket, depth + 1);
                bounds = bounds.merged(&octree.node(child).bounds);
                children[octant] = Some(child);
            }
        }

        let node = &mut octree.nodes[id as usize];
        node.bounds = bounds;
        node.shell = cube_shell(&bounds);
        node.children = children;
        node.triangles = owned;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;

    /// Small triangle around `p`
    fn tri_at(p: Vec3) -> Triangle {
        Triangle::new(p, p + Vec3::new(0.01, 0.0, 0.0), p + Vec3::new(0.0, 0.01, 0.0))
    }

    fn grid(n: usize) -> Vec<Triangle> {
        let mut out = Vec::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    out.push(tri_at(Vec3::new(x as f32, y as f32, z as f32)));
                }
            }
        }
        out
    }

    fn build(triangles: &[Triangle], max_leaf_triangles: usize) -> Octree {
        OctreeBuilder::new(OctreeConfig { max_depth: 10, max_leaf_triangles }).build(triangles)
    }

    #[test]
    fn test_small_set_is_single_leaf() {
        let triangles = grid(2);
        let octree = build(&triangles, 16);
        assert_eq!(octree.node_count(), 1);
        assert!(octree.root().is_leaf());
        assert_eq!(octree.root().triangles.len(), 8);
    }

    #[test]
    fn test_every_triangle_owned_exactly_once() {
        let triangles = grid(5);
        let octree = build(&triangles, 4);
        assert!(octree.node_count() > 1);

        let mut seen = vec![0u32; triangles.len()];
        for node in octree.nodes() {
            for &t in &node.triangles {
                seen[t] += 1;
            }
            if !node.is_leaf() {
                assert!(node.triangles.is_empty(), "internal nodes own no triangles");
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
        assert_eq!(octree.subtree_triangles(Octree::ROOT).len(), triangles.len());
    }

    #[test]
    fn test_centroid_lies_in_owning_cube() {
        let triangles = grid(4);
        let octree = build(&triangles, 2);
        for node in octree.nodes() {
            for &t in &node.triangles {
                assert!(node.cube.contains_point(triangles[t].centroid()));
                assert!(node.bounds.contains_point(triangles[t].a()));
            }
        }
    }

    #[test]
    fn test_children_split_parent_cube() {
        let triangles = grid(4);
        let octree = build(&triangles, 2);
        let root = octree.root();
        assert!((root.cube.size().x - 3.01).abs() < 1e-3);
        for (octant, child) in root.children.iter().enumerate() {
            if let Some(child) = child {
                let child = octree.node(*child);
                assert_eq!(child.cube, root.cube.child_octant(octant as u8));
                assert_eq!(child.depth, 1);
                assert!(root.bounds.contains_point(child.bounds.min));
                assert!(root.bounds.contains_point(child.bounds.max));
            }
        }
    }

    #[test]
    fn test_max_depth_stops_identical_centroids() {
        let triangles: Vec<Triangle> = (0..50).map(|_| tri_at(Vec3::ONE)).collect();
        let octree = OctreeBuilder::new(OctreeConfig { max_depth: 3, max_leaf_triangles: 1 })
            .build(&triangles);
        assert!(octree.depth() <= 3);
        assert_eq!(octree.subtree_triangles(Octree::ROOT).len(), 50);
    }

    #[test]
    fn test_empty_scene() {
        let octree = build(&[], 4);
        assert_eq!(octree.node_count(), 1);
        assert!(octree.root().triangles.is_empty());
    }
}
