//! Triangle primitive with per-vertex attributes and visibility metadata
//!
//! A `Triangle` is a plain value. Transforming it yields a new triangle in the
//! target space with its facing vector and bounding box re-derived from the
//! transformed vertices. The copy kept in the scene's flat list is the
//! authoritative one: working copies refer back to it through `global_index`.

use crate::core::types::{Color, Mat4, Vec2, Vec3};
use crate::math::Aabb;

/// Triangle with counter-clockwise vertices in whatever space it currently holds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    v: [Vec3; 3],
    /// `(b - a) x (c - b)`, points towards the side the vertices wind CCW from
    facing: Vec3,
    bbox: Aabb,
    pub normals: [Vec3; 3],
    pub uvs: [Vec2; 3],
    pub colors: [Color; 3],
    pub material: Option<u32>,
    /// Indices into the importer's vertex array, stable across transforms
    pub indices: [u32; 3],
    /// Position of this triangle in the scene's flat list
    pub global_index: usize,
    /// Index of the mesh group this triangle came from
    pub group: usize,
    /// Only meaningful on the scene's own copy, written by `Scene::set_deleted`
    deleted: bool,
}

impl Triangle {
    /// Triangle from three positions; original indices default to `[0, 1, 2]`
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::with_indices(a, b, c, [0, 1, 2])
    }

    /// Triangle referring to explicit vertices of the imported mesh
    pub fn with_indices(a: Vec3, b: Vec3, c: Vec3, indices: [u32; 3]) -> Self {
        let v = [a, b, c];
        Self {
            v,
            facing: facing_of(&v),
            bbox: Aabb::from_points(v),
            normals: [Vec3::ZERO; 3],
            uvs: [Vec2::ZERO; 3],
            colors: [Color::ZERO; 3],
            material: None,
            indices,
            global_index: 0,
            group: 0,
            deleted: false,
        }
    }

    pub fn with_normals(mut self, normals: [Vec3; 3]) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_uvs(mut self, uvs: [Vec2; 3]) -> Self {
        self.uvs = uvs;
        self
    }

    pub fn with_colors(mut self, colors: [Color; 3]) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_material(mut self, material: u32) -> Self {
        self.material = Some(material);
        self
    }

    pub fn a(&self) -> Vec3 {
        self.v[0]
    }

    pub fn b(&self) -> Vec3 {
        self.v[1]
    }

    pub fn c(&self) -> Vec3 {
        self.v[2]
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.v
    }

    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    /// Whether the last visibility pass dropped this triangle
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v[0] + self.v[1] + self.v[2]) / 3.0
    }

    /// Apply a homogeneous transform with perspective divide.
    ///
    /// Only positions are transformed; attributes and identity are copied.
    pub fn transform(&self, m: &Mat4) -> Triangle {
        let v = self.v.map(|p| m.project_point3(p));
        Triangle {
            v,
            facing: facing_of(&v),
            bbox: Aabb::from_points(v),
            ..*self
        }
    }

    /// Back-face test against a viewing direction
    pub fn faces_away_from(&self, gaze: Vec3) -> bool {
        gaze.dot(self.facing) >= 0.0
    }

    /// Signed doubled area of the XY projection (positive when CCW)
    pub fn double_area(&self) -> f32 {
        let [a, b, c] = self.v;
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }

    /// Signed area of the XY projection
    pub fn area(&self) -> f32 {
        self.double_area() * 0.5
    }

    /// Point-in-triangle test in the XY plane, edges included, either winding
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let p = Vec2::new(x, y);
        let [a, b, c] = self.v;
        let e0 = edge(a, b, p);
        let e1 = edge(b, c, p);
        let e2 = edge(c, a, p);
        let has_neg = e0 < 0.0 || e1 < 0.0 || e2 < 0.0;
        let has_pos = e0 > 0.0 || e1 > 0.0 || e2 > 0.0;
        !(has_neg && has_pos) && self.double_area() != 0.0
    }

    /// Barycentric weights of `p` in the XY plane.
    ///
    /// Weights are non-finite for a degenerate triangle; callers check
    /// `contains` first and skip non-finite results.
    pub fn barycentric(&self, p: Vec2) -> Vec3 {
        let [a, b, c] = self.v;
        let area = self.double_area();
        Vec3::new(edge(b, c, p) / area, edge(c, a, p) / area, edge(a, b, p) / area)
    }

    /// True if at least one vertex lies in the canonical `[-1, 1]^3` cube.
    ///
    /// Conservative but not exact: a triangle crossing the volume with all
    /// three vertices outside is reported as outside.
    pub fn vert_in_canonical(&self) -> bool {
        self.v.iter().any(|p| {
            (-1.0..=1.0).contains(&p.x) && (-1.0..=1.0).contains(&p.y) && (-1.0..=1.0).contains(&p.z)
        })
    }

    /// Largest vertex z, i.e. the nearest point when z grows towards the eye
    pub fn nearest_depth(&self) -> f32 {
        self.v[0].z.max(self.v[1].z).max(self.v[2].z)
    }

    /// Perspective-correct depth at screen-space weights.
    ///
    /// Call on the view-space copy of the triangle that produced the weights.
    pub fn depth_at(&self, weights: Vec3) -> f32 {
        let inv = weights.x / self.v[0].z + weights.y / self.v[1].z + weights.z / self.v[2].z;
        1.0 / inv
    }

    /// Screen-space weights corrected for perspective, given the depth from
    /// `depth_at`. Call on the view-space copy.
    pub fn perspective_weights(&self, weights: Vec3, z_view: f32) -> Vec3 {
        Vec3::new(
            weights.x / self.v[0].z,
            weights.y / self.v[1].z,
            weights.z / self.v[2].z,
        ) * z_view
    }

    /// Perspective-correct vertex color interpolation. Call on the view-space copy.
    pub fn color_at(&self, weights: Vec3, z_view: f32) -> Color {
        let w = self.perspective_weights(weights, z_view);
        self.colors[0] * w.x + self.colors[1] * w.y + self.colors[2] * w.z
    }

    /// Perspective-correct normal interpolation. Call on the view-space copy.
    pub fn normal_at(&self, weights: Vec3, z_view: f32) -> Vec3 {
        let w = self.perspective_weights(weights, z_view);
        self.normals[0] * w.x + self.normals[1] * w.y + self.normals[2] * w.z
    }
}

fn facing_of(v: &[Vec3; 3]) -> Vec3 {
    (v[1] - v[0]).cross(v[2] - v[1])
}

/// Doubled signed area of (p0, p1, p) in XY
fn edge(p0: Vec3, p1: Vec3, p: Vec2) -> f32 {
    (p1.x - p0.x) * (p.y - p0.y) - (p1.y - p0.y) * (p.x - p0.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_xy() -> Triangle {
        Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y)
    }

    #[test]
    fn test_facing_follows_winding() {
        let t = unit_xy();
        assert_eq!(t.facing(), Vec3::Z);
        let flipped = Triangle::new(Vec3::ZERO, Vec3::Y, Vec3::X);
        assert_eq!(flipped.facing(), -Vec3::Z);

        assert!(!t.faces_away_from(-Vec3::Z));
        assert!(t.faces_away_from(Vec3::Z));
        // Edge-on counts as back-facing
        assert!(t.faces_away_from(Vec3::X));
    }

    #[test]
    fn test_transform_rederives_facing_and_bbox() {
        let t = unit_xy();
        let m = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0))
            * Mat4::from_rotation_y(std::f32::consts::PI);
        let moved = t.transform(&m);
        assert!((moved.facing() - (-Vec3::Z)).length() < 1e-5);
        assert!((moved.bbox().min.x - 1.0).abs() < 1e-5);
        assert!((moved.bbox().max.x - 2.0).abs() < 1e-5);
        assert_eq!(moved.indices, t.indices);
    }

    #[test]
    fn test_transform_keeps_identity_and_attributes() {
        let mut t = Triangle::with_indices(Vec3::ZERO, Vec3::X, Vec3::Y, [4, 5, 6])
            .with_colors([Color::X, Color::Y, Color::Z])
            .with_material(3);
        t.global_index = 17;
        t.group = 2;
        let moved = t.transform(&Mat4::from_scale(Vec3::splat(2.0)));
        assert_eq!(moved.global_index, 17);
        assert_eq!(moved.group, 2);
        assert_eq!(moved.indices, [4, 5, 6]);
        assert_eq!(moved.material, Some(3));
        assert_eq!(moved.colors, t.colors);
        assert_eq!(moved.b(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_area() {
        let t = unit_xy();
        assert_eq!(t.double_area(), 1.0);
        assert_eq!(t.area(), 0.5);
        let cw = Triangle::new(Vec3::ZERO, Vec3::Y, Vec3::X);
        assert_eq!(cw.area(), -0.5);
    }

    #[test]
    fn test_contains_either_winding() {
        let ccw = unit_xy();
        let cw = Triangle::new(Vec3::ZERO, Vec3::Y, Vec3::X);
        for t in [ccw, cw] {
            assert!(t.contains(0.25, 0.25));
            assert!(t.contains(0.5, 0.0), "edges are inside");
            assert!(!t.contains(0.75, 0.75));
            assert!(!t.contains(-0.1, 0.5));
        }
    }

    #[test]
    fn test_degenerate_contains_nothing() {
        let t = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0));
        assert!(!t.contains(0.5, 0.0));
        let w = t.barycentric(Vec2::new(0.5, 0.0));
        assert!(!w.is_finite());
    }

    #[test]
    fn test_barycentric() {
        let t = Triangle::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        let w = t.barycentric(Vec2::new(0.0, 0.0));
        assert!((w - Vec3::X).length() < 1e-6);
        let w = t.barycentric(Vec2::new(0.5, 0.5));
        assert!((w.x + w.y + w.z - 1.0).abs() < 1e-6);
        assert!((w - Vec3::new(0.5, 0.25, 0.25)).length() < 1e-6);
    }

    #[test]
    fn test_vert_in_canonical() {
        let inside = Triangle::new(Vec3::new(0.5, 0.5, 0.0), Vec3::splat(5.0), Vec3::splat(6.0));
        assert!(inside.vert_in_canonical());

        // Straddles the cube with every vertex outside: reported outside
        let crossing = Triangle::new(
            Vec3::new(-5.0, -5.0, 0.0),
            Vec3::new(5.0, -5.0, 0.0),
            Vec3::new(0.0, 5.0, 0.0),
        );
        assert!(!crossing.vert_in_canonical());

        let beyond_far = Triangle::new(
            Vec3::new(0.0, 0.0, -1.5),
            Vec3::new(0.5, 0.0, -1.5),
            Vec3::new(0.0, 0.5, -1.5),
        );
        assert!(!beyond_far.vert_in_canonical());

        let nan = Triangle::new(Vec3::splat(f32::NAN), Vec3::splat(f32::NAN), Vec3::splat(f32::NAN));
        assert!(!nan.vert_in_canonical());
    }

    #[test]
    fn test_perspective_correct_interpolation() {
        // Vertex a near, b and c far
        let view = Triangle::new(
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -4.0),
            Vec3::new(0.0, 1.0, -4.0),
        )
        .with_colors([Color::ONE, Color::ZERO, Color::ZERO]);

        let at_a = Vec3::X;
        assert!((view.depth_at(at_a) + 1.0).abs() < 1e-6);
        assert!((view.color_at(at_a, view.depth_at(at_a)) - Color::ONE).length() < 1e-6);

        // Halfway in screen space is not halfway in depth
        let half = Vec3::new(0.5, 0.25, 0.25);
        let z = view.depth_at(half);
        assert!((z - (-1.6)).abs() < 1e-5, "got {}", z);
        let w = view.perspective_weights(half, z);
        assert!((w.x + w.y + w.z - 1.0).abs() < 1e-5);
        assert!((view.color_at(half, z).x - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_nearest_depth() {
        let t = Triangle::new(Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(t.nearest_depth(), -1.0);
    }
}
