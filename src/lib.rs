//! zcull - software occlusion culling for static triangle scenes
//!
//! Loads a triangle soup, builds an octree over it and decides, for a given
//! camera, which triangles are visible using a hierarchical z-buffer.

pub mod core;
pub mod math;
pub mod geometry;
pub mod octree;
pub mod scene;
pub mod render;
pub mod config;
