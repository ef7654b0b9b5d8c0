//! The 12-triangle shell of an axis-aligned box

use crate::core::types::Vec3;
use crate::geometry::Triangle;
use crate::math::Aabb;

/// Marks triangles that are not part of the scene list
pub const SHELL_GLOBAL_INDEX: usize = usize::MAX;

/// Corner indices (see `Aabb::corners`) of each face in cyclic order, with
/// the face's outward normal.
const FACES: [([usize; 4], Vec3); 6] = [
    ([0, 2, 6, 4], Vec3::NEG_X),
    ([1, 3, 7, 5], Vec3::X),
    ([0, 1, 5, 4], Vec3::NEG_Y),
    ([2, 3, 7, 6], Vec3::Y),
    ([0, 1, 3, 2], Vec3::NEG_Z),
    ([4, 5, 7, 6], Vec3::Z),
];

/// Two triangles per face, wound so that `facing` points out of the box.
///
/// Shell triangles are only used for node-level culling and carry
/// `SHELL_GLOBAL_INDEX`.
pub fn cube_shell(bounds: &Aabb) -> [Triangle; 12] {
    let corners = bounds.corners();
    let mut shell = [Triangle::new(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO); 12];
    for (face, (quad, outward)) in FACES.iter().enumerate() {
        let [p0, p1, p2, p3] = quad.map(|i| corners[i]);
        shell[face * 2] = outward_triangle(p0, p1, p2, *outward);
        shell[face * 2 + 1] = outward_triangle(p0, p2, p3, *outward);
    }
    shell
}

fn outward_triangle(a: Vec3, b: Vec3, c: Vec3, outward: Vec3) -> Triangle {
    let mut t = Triangle::new(a, b, c);
    if t.facing().dot(outward) < 0.0 {
        t = Triangle::new(a, c, b);
    }
    t.global_index = SHELL_GLOBAL_INDEX;
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_faces_point_outward() {
        let bounds = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 2.0, 4.0));
        let center = bounds.center();
        for t in cube_shell(&bounds) {
            let out = t.centroid() - center;
            assert!(t.facing().dot(out) > 0.0, "shell triangle faces inward: {:?}", t);
            assert_eq!(t.global_index, SHELL_GLOBAL_INDEX);
        }
    }

    #[test]
    fn test_shell_covers_box_surface() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let total: f32 = cube_shell(&bounds).iter().map(|t| t.facing().length() * 0.5).sum();
        assert!((total - 24.0).abs() < 1e-4, "surface area was {}", total);
    }

    #[test]
    fn test_shell_vertices_are_box_corners() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let corners = bounds.corners();
        for t in cube_shell(&bounds) {
            for v in t.vertices() {
                assert!(corners.contains(v));
            }
        }
    }
}
