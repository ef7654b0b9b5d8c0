//! Octree spatial index over the scene's triangles
//!
//! Nodes live in an arena and refer to their children by index. Each triangle
//! is owned by exactly one leaf: the one whose cube contains its centroid.

pub mod node;
pub mod tree;
pub mod builder;
pub mod shell;

pub use node::{NodeId, OctreeNode};
pub use tree::Octree;
pub use builder::{OctreeBuilder, OctreeConfig};
pub use shell::cube_shell;
