//! Player Hull Transform
//!
//! The engine reports a player as an origin at the feet plus "mins/maxs"
//! style extents whose Z component is the full hull height. Zone authoring
//! data uses true centers and half-extents, so every player sample goes
//! through [`PlayerHull::from_origin`] exactly once before any zone test.

use serde::{Serialize, Deserialize};

use super::aabb::Aabb;
use super::vec3::Vec3;
use super::GeometryError;

/// Fraction of the reported Z extent that is the hull's half-height.
///
/// The same factor lifts the origin from the feet to the hull center.
pub const HULL_HEIGHT_SCALE: f32 = 0.5;

/// Transform sample as the engine reports it. Not yet validated.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTransform {
    /// Feet position
    pub origin: [f32; 3],
    /// Hull extents; X/Y are half-widths, Z is full height
    pub extents: [f32; 3],
    /// Current velocity
    pub velocity: [f32; 3],
}

impl RawTransform {
    /// Create a raw sample.
    pub const fn new(origin: [f32; 3], extents: [f32; 3], velocity: [f32; 3]) -> Self {
        Self { origin, extents, velocity }
    }
}

/// A validated per-tick player transform.
///
/// Construction is the only place malformed engine input is detected;
/// everything downstream can assume finite values and non-negative extents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerTransform {
    origin: Vec3,
    extents: Vec3,
    velocity: Vec3,
}

impl PlayerTransform {
    /// Validate and build a transform.
    pub fn new(origin: Vec3, extents: Vec3, velocity: Vec3) -> Result<Self, GeometryError> {
        origin.ensure_finite("origin")?;
        extents.ensure_finite("extents")?;
        velocity.ensure_finite("velocity")?;
        if !extents.all_ge(Vec3::ZERO) {
            return Err(GeometryError::NegativeExtents(extents));
        }
        Ok(Self { origin, extents, velocity })
    }

    /// Feet position.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Engine-convention extents (Z is full height).
    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.extents
    }

    /// Velocity.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Hull in zone-space coordinates.
    #[inline]
    pub fn hull(&self) -> PlayerHull {
        PlayerHull::from_origin(self.origin, self.extents)
    }
}

impl TryFrom<RawTransform> for PlayerTransform {
    type Error = GeometryError;

    fn try_from(raw: RawTransform) -> Result<Self, Self::Error> {
        Self::new(
            Vec3::from_array(raw.origin),
            Vec3::from_array(raw.extents),
            Vec3::from_array(raw.velocity),
        )
    }
}

/// Player hull as a true center and half-extents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerHull {
    /// Hull center
    pub center: Vec3,
    /// Hull half-extents
    pub extents: Vec3,
}

impl PlayerHull {
    /// Apply the fixed vertical offset convention.
    #[inline]
    pub fn from_origin(origin: Vec3, engine_extents: Vec3) -> Self {
        let half_height = engine_extents.z * HULL_HEIGHT_SCALE;
        Self {
            center: Vec3::new(origin.x, origin.y, origin.z + half_height),
            extents: Vec3::new(engine_extents.x, engine_extents.y, half_height),
        }
    }

    /// Hull as a box. Extents are validated upstream, so this cannot fail
    /// for hulls built from a [`PlayerTransform`].
    pub fn bounds(&self) -> Result<Aabb, GeometryError> {
        Aabb::from_center_extents(self.center, self.extents)
    }
}
