//! Scene: the authoritative triangle list and the octree built over it

pub mod obj;
pub mod export;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::geometry::Triangle;
use crate::math::Aabb;
use crate::octree::{Octree, OctreeBuilder, OctreeConfig};

pub use export::{CullSummary, GroupSummary, ModelBuffer};
pub use obj::ObjModel;

/// Default camera offset beyond the max corner, in half-diagonals
const DEFAULT_EYE_OFFSET: Vec3 = Vec3::new(1.5, 2.0, 1.2);
/// Nearest allowed near plane distance for the default camera
const DEFAULT_NEAR: f32 = 0.1;

/// A named, contiguous run of triangles in the flat list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshGroup {
    pub name: String,
    pub triangle_count: usize,
}

impl MeshGroup {
    pub fn new(name: impl Into<String>, triangle_count: usize) -> Self {
        Self { name: name.into(), triangle_count }
    }
}

/// Static scene. Owns the flat triangle list, which is the single source of
/// truth for `deleted`, and the octree over it.
#[derive(Clone, Debug)]
pub struct Scene {
    triangles: Vec<Triangle>,
    groups: Vec<MeshGroup>,
    octree: Octree,
    bounds: Aabb,
}

impl Scene {
    /// Build a scene from a world-space triangle soup.
    ///
    /// Groups must cover the list in order; an empty group list puts every
    /// triangle in one group. Global indices and group tags are (re)assigned
    /// and all deleted flags cleared.
    pub fn new(mut triangles: Vec<Triangle>, mut groups: Vec<MeshGroup>, config: &OctreeConfig) -> Result<Self> {
        if groups.is_empty() {
            groups.push(MeshGroup::new("default", triangles.len()));
        }
        let grouped: usize = groups.iter().map(|g| g.triangle_count).sum();
        if grouped != triangles.len() {
            return Err(Error::Scene(format!(
                "mesh groups cover {} triangles but the scene has {}",
                grouped,
                triangles.len()
            )));
        }
        if let Some(i) = triangles.iter().position(|t| !t.vertices().iter().all(|v| v.is_finite())) {
            return Err(Error::Scene(format!("triangle {} has a non-finite vertex", i)));
        }

        let mut next = 0;
        for (group, g) in groups.iter().enumerate() {
            for t in &mut triangles[next..next + g.triangle_count] {
                t.group = group;
            }
            next += g.triangle_count;
        }
        for (i, t) in triangles.iter_mut().enumerate() {
            t.global_index = i;
            t.set_deleted(false);
        }

        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| *t.vertices()));
        let octree = OctreeBuilder::new(*config).build(&triangles);

        log::info!(
            "Scene: {} triangles in {} groups, bounds {:?}..{:?}, octree {} nodes (depth {})",
            triangles.len(),
            groups.len(),
            bounds.min,
            bounds.max,
            octree.node_count(),
            octree.depth()
        );

        Ok(Self { triangles, groups, octree, bounds })
    }

    /// Single-group scene with the default octree limits
    pub fn from_triangles(triangles: Vec<Triangle>) -> Result<Self> {
        Self::new(triangles, Vec::new(), &OctreeConfig::default())
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn groups(&self) -> &[MeshGroup] {
        &self.groups
    }

    /// Index range of each group in the flat list
    pub fn group_ranges(&self) -> impl Iterator<Item = (&MeshGroup, Range<usize>)> + '_ {
        let mut start = 0;
        self.groups.iter().map(move |g| {
            let range = start..start + g.triangle_count;
            start = range.end;
            (g, range)
        })
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Bounds of every vertex; `Aabb::EMPTY` for an empty scene
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn min(&self) -> Vec3 {
        self.bounds.min
    }

    pub fn mid(&self) -> Vec3 {
        self.bounds.center()
    }

    pub fn max(&self) -> Vec3 {
        self.bounds.max
    }

    /// Write a visibility decision back to the authoritative copy
    pub fn set_deleted(&mut self, index: usize, deleted: bool) {
        self.triangles[index].set_deleted(deleted);
    }

    /// Mark every triangle as kept
    pub fn clear_deleted(&mut self) {
        for t in &mut self.triangles {
            t.set_deleted(false);
        }
    }

    pub fn deleted_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.is_deleted()).count()
    }

    pub fn kept_count(&self) -> usize {
        self.len() - self.deleted_count()
    }

    /// Bounds used for camera placement; a unit box for an empty scene
    fn placement_bounds(&self) -> Aabb {
        if self.bounds.is_empty() {
            Aabb::new(Vec3::splat(-1.0), Vec3::ONE)
        } else {
            self.bounds
        }
    }

    /// Far plane (negative) deep enough to contain the whole scene from `eye`
    pub fn enclosing_far(&self, eye: Vec3) -> f32 {
        let bounds = self.placement_bounds();
        let radius = bounds.half_extent().length().max(1e-3);
        -(eye.distance(bounds.center()) + radius) * 1.5
    }

    /// Camera outside the max corner looking at the scene's mid point
    pub fn default_camera(&self, fovy: f32, aspect: f32) -> Result<Camera> {
        let bounds = self.placement_bounds();
        let mid = bounds.center();
        let radius = bounds.half_extent().length().max(1e-3);
        let eye = bounds.max + DEFAULT_EYE_OFFSET * radius;
        let near = -DEFAULT_NEAR.min(eye.distance(mid) * 0.01);
        Camera::look_at(eye, mid, Vec3::Y, fovy, aspect, near, self.enclosing_far(eye))
    }
}
