//! Axis-Aligned Bounding Boxes
//!
//! Zone volumes and player hulls are both boxes aligned to the world axes,
//! so every containment test reduces to three interval checks.

use serde::{Serialize, Deserialize};

use super::vec3::Vec3;
use super::GeometryError;

/// Check if two center/half-extent boxes overlap.
///
/// Inclusive on faces: boxes that touch count as overlapping. Zero extents are
/// valid and describe a point, so a point sitting on a zone face is inside.
#[inline]
pub fn overlap(center_a: Vec3, extents_a: Vec3, center_b: Vec3, extents_b: Vec3) -> bool {
    (center_a.x - center_b.x).abs() <= extents_a.x + extents_b.x
        && (center_a.y - center_b.y).abs() <= extents_a.y + extents_b.y
        && (center_a.z - center_b.z).abs() <= extents_a.z + extents_b.z
}

/// Axis-aligned bounding box in world coordinates.
///
/// Invariant: `min` is componentwise `<=` `max`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    /// Build from two opposite corners in any order.
    ///
    /// Components are sorted, so level data authored "max first" still
    /// produces a valid box.
    pub fn from_corners(a: Vec3, b: Vec3) -> Result<Self, GeometryError> {
        a.ensure_finite("corner")?;
        b.ensure_finite("corner")?;
        Ok(Self {
            min: a.min(b),
            max: a.max(b),
        })
    }

    /// Build from a center point and half-extents.
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Result<Self, GeometryError> {
        center.ensure_finite("center")?;
        extents.ensure_finite("extents")?;
        if !extents.all_ge(Vec3::ZERO) {
            return Err(GeometryError::NegativeExtents(extents));
        }
        Ok(Self {
            min: center - extents,
            max: center + extents,
        })
    }

    /// Minimum corner.
    #[inline]
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner.
    #[inline]
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Box center.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extents (always non-negative).
    #[inline]
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// True if the box has zero size on some axis.
    pub fn is_degenerate(&self) -> bool {
        self.min.x == self.max.x || self.min.y == self.max.y || self.min.z == self.max.z
    }

    /// Check if a point lies inside the box (inclusive).
    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.all_ge(self.min) && self.max.all_ge(p)
    }

    /// Check if another box overlaps this one (inclusive on faces).
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.max.all_ge(other.min) && other.max.all_ge(self.min)
    }

    /// The eight corners, min corner first.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
        ]
    }

    /// The twelve edges as corner pairs, for wireframe drawing.
    pub fn edges(&self) -> [(Vec3, Vec3); 12] {
        let c = self.corners();
        [
            // Bottom face
            (c[0], c[1]), (c[1], c[2]), (c[2], c[3]), (c[3], c[0]),
            // Top face
            (c[4], c[5]), (c[5], c[6]), (c[6], c[7]), (c[7], c[4]),
            // Verticals
            (c[0], c[4]), (c[1], c[5]), (c[2], c[6]), (c[3], c[7]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_overlap_basic() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 0.0, 0.0);
        let ext = Vec3::splat(1.0);

        // Gap of 1 unit on X
        assert!(!overlap(a, ext, b, ext));

        // Exactly touching faces
        let c = Vec3::new(2.0, 0.0, 0.0);
        assert!(overlap(a, ext, c, ext));

        // Separated on Z only
        let d = Vec3::new(0.0, 0.0, 2.5);
        assert!(!overlap(a, ext, d, ext));
    }

    #[test]
    fn test_overlap_point_degenerate() {
        let zone_center = Vec3::new(10.0, 10.0, 10.0);
        let zone_ext = Vec3::splat(5.0);

        assert!(overlap(Vec3::new(12.0, 8.0, 15.0), Vec3::ZERO, zone_center, zone_ext));
        assert!(!overlap(Vec3::new(15.1, 10.0, 10.0), Vec3::ZERO, zone_center, zone_ext));

        // Two points only overlap when equal
        assert!(overlap(zone_center, Vec3::ZERO, zone_center, Vec3::ZERO));
        assert!(!overlap(zone_center, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO));
    }

    #[test]
    fn test_from_corners_sorts() {
        let aabb = Aabb::from_corners(Vec3::new(10.0, -5.0, 3.0), Vec3::new(-10.0, 5.0, 0.0)).unwrap();
        assert_eq!(aabb.min(), Vec3::new(-10.0, -5.0, 0.0));
        assert_eq!(aabb.max(), Vec3::new(10.0, 5.0, 3.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 0.0, 1.5));
        assert_eq!(aabb.extents(), Vec3::new(10.0, 5.0, 1.5));
    }

    #[test]
    fn test_from_center_extents_rejects_bad_input() {
        assert!(matches!(
            Aabb::from_center_extents(Vec3::ZERO, Vec3::new(1.0, -1.0, 1.0)),
            Err(GeometryError::NegativeExtents(_))
        ));
        assert!(matches!(
            Aabb::from_center_extents(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::splat(1.0)),
            Err(GeometryError::NonFinite { .. })
        ));
        assert!(Aabb::from_corners(Vec3::splat(f32::INFINITY), Vec3::ZERO).is_err());
    }

    #[test]
    fn test_box_overlaps_box() {
        let a = Aabb::from_corners(Vec3::ZERO, Vec3::splat(4.0)).unwrap();
        let b = Aabb::from_corners(Vec3::splat(4.0), Vec3::splat(8.0)).unwrap();
        let c = Aabb::from_corners(Vec3::new(4.5, 0.0, 0.0), Vec3::splat(8.0)).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::from_center_extents(Vec3::ZERO, Vec3::splat(2.0)).unwrap();
        assert!(aabb.contains_point(Vec3::new(2.0, -2.0, 0.0)));
        assert!(!aabb.contains_point(Vec3::new(2.01, 0.0, 0.0)));
    }

    #[test]
    fn test_degenerate_and_edges() {
        let flat = Aabb::from_corners(Vec3::ZERO, Vec3::new(4.0, 4.0, 0.0)).unwrap();
        assert!(flat.is_degenerate());

        let cube = Aabb::from_center_extents(Vec3::ZERO, Vec3::splat(1.0)).unwrap();
        assert!(!cube.is_degenerate());
        for (a, b) in cube.edges() {
            // Every edge of a 2x2x2 cube is 2 units long
            assert_eq!((b - a).length(), 2.0);
        }
    }

    fn arb_vec(range: f32) -> impl Strategy<Value = Vec3> {
        (-range..range, -range..range, -range..range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            ca in arb_vec(1000.0),
            ea in arb_vec(100.0),
            cb in arb_vec(1000.0),
            eb in arb_vec(100.0),
        ) {
            let (ea, eb) = (ea.abs(), eb.abs());
            prop_assert_eq!(overlap(ca, ea, cb, eb), overlap(cb, eb, ca, ea));
        }

        #[test]
        fn prop_box_contains_own_center(c in arb_vec(1000.0), e in arb_vec(100.0)) {
            let aabb = Aabb::from_center_extents(c, e.abs()).unwrap();
            prop_assert!(aabb.contains_point(c));
            prop_assert!(aabb.overlaps(&aabb));
        }
    }
}
