//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any `expand` call replaces
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from center and half-extents
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Smallest box containing every point; `EMPTY` for no points
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.expand(p);
        }
        aabb
    }

    /// True if no point was ever added
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get half-extents
    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Check if point is inside AABB
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Return merged AABB containing both
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Cube sharing this box's min corner whose side is the longest extent.
    ///
    /// Degenerate boxes (a point, or empty) get a side of `min_side`.
    pub fn bounding_cube(&self, min_side: f32) -> Aabb {
        if self.is_empty() {
            return Aabb::new(Vec3::ZERO, Vec3::splat(min_side));
        }
        let side = self.size().max_element().max(min_side);
        Aabb::new(self.min, self.min + Vec3::splat(side))
    }

    /// The 8 corners, indexed like octants (bit 0=x, bit 1=y, bit 2=z)
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| Vec3::new(
            if i & 1 != 0 { self.max.x } else { self.min.x },
            if i & 2 != 0 { self.max.y } else { self.min.y },
            if i & 4 != 0 { self.max.z } else { self.min.z },
        ))
    }

    /// Octant of this box containing `p` (points on the midplane go up)
    pub fn octant_of(&self, p: Vec3) -> u8 {
        let center = self.center();
        (if p.x >= center.x { 1 } else { 0 })
            | (if p.y >= center.y { 2 } else { 0 })
            | (if p.z >= center.z { 4 } else { 0 })
    }

    /// Get child octant AABB for octree subdivision
    /// index: 0-7 representing xyz octant (bit 0=x, bit 1=y, bit 2=z)
    pub fn child_octant(&self, index: u8) -> Aabb {
        let center = self.center();
        let half = self.half_extent() * 0.5;

        let offset = Vec3::new(
            if index & 1 != 0 { half.x } else { -half.x },
            if index & 2 != 0 { half.y } else { -half.y },
            if index & 4 != 0 { half.z } else { -half.z },
        );

        Aabb::from_center_half_extent(center + offset, half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::splat(0.5));
        assert_eq!(aabb.size(), Vec3::ONE);
    }

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::splat(0.5)));
        assert!(!aabb.contains_point(Vec3::splat(2.0)));
    }

    #[test]
    fn test_from_points_and_empty() {
        assert!(Aabb::from_points(std::iter::empty()).is_empty());
        let aabb = Aabb::from_points([Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 0.5)]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
    }

    #[test]
    fn test_bounding_cube() {
        let flat = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(5.0, 2.0, 0.0));
        let cube = flat.bounding_cube(1e-3);
        assert_eq!(cube.min, flat.min);
        assert_eq!(cube.size(), Vec3::splat(4.0));

        let point = Aabb::from_points([Vec3::ONE]);
        assert_eq!(point.bounding_cube(0.5).size(), Vec3::splat(0.5));
    }

    #[test]
    fn test_octant_matches_child_box() {
        let parent = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let p = Vec3::new(1.5, 0.25, 1.75);
        let octant = parent.octant_of(p);
        assert_eq!(octant, 0b101);
        assert!(parent.child_octant(octant).contains_point(p));
    }

    #[test]
    fn test_corners() {
        let corners = Aabb::new(Vec3::ZERO, Vec3::ONE).corners();
        assert_eq!(corners[0], Vec3::ZERO);
        assert_eq!(corners[7], Vec3::ONE);
        assert_eq!(corners[2], Vec3::Y);
    }

    #[test]
    fn test_child_octant() {
        let parent = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let child0 = parent.child_octant(0); // -x, -y, -z
        assert_eq!(child0.min, Vec3::ZERO);
        assert_eq!(child0.max, Vec3::ONE);
    }
}
