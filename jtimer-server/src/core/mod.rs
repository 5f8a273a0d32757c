//! Geometry primitives.
//!
//! Pure math shared by zones and player run state. Nothing in here logs
//! or mutates shared state.

pub mod vec3;
pub mod aabb;
pub mod hull;

use thiserror::Error;

// Re-export core types
pub use vec3::Vec3;
pub use aabb::{Aabb, overlap};
pub use hull::{PlayerHull, PlayerTransform, RawTransform, HULL_HEIGHT_SCALE};

/// Geometry validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A component is NaN or infinite.
    #[error("{what} has a non-finite component: {value}")]
    NonFinite {
        /// Which input was rejected.
        what: &'static str,
        /// The offending value.
        value: Vec3,
    },
    /// Half-extents must be non-negative.
    #[error("negative extents: {0}")]
    NegativeExtents(Vec3),
    /// Neither corners nor center/extents were given.
    #[error("no volume given")]
    MissingVolume,
}
