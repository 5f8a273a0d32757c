//! Zones
//!
//! Static trigger volumes loaded from level data. A zone never changes after
//! the map is built; all per-player progress lives in the run state.

use serde::{Serialize, Deserialize};

use crate::core::{Aabb, Vec3, overlap};
use crate::host::ZoneRenderer;

/// Role of a zone within its segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ZoneKind {
    /// Leaving it starts the clock
    Start = 0,
    /// Entering it stops the clock
    End = 1,
    /// Ordered intermediate zone
    Checkpoint = 2,
}

impl ZoneKind {
    /// Debug wireframe color (RGBA).
    pub fn color(self) -> [u8; 4] {
        match self {
            ZoneKind::Start => [0, 255, 0, 255],
            ZoneKind::End => [255, 0, 0, 255],
            ZoneKind::Checkpoint => [255, 255, 0, 255],
        }
    }
}

/// A named volumetric region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    name: String,
    kind: ZoneKind,
    bounds: Aabb,
    // Cached so the per-tick test avoids recomputing them
    center: Vec3,
    extents: Vec3,
}

impl Zone {
    /// Create a zone from its bounds.
    pub fn new(name: impl Into<String>, kind: ZoneKind, bounds: Aabb) -> Self {
        Self {
            name: name.into(),
            kind,
            center: bounds.center(),
            extents: bounds.extents(),
            bounds,
        }
    }

    /// Zone name from level data.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zone kind.
    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    /// Zone bounds.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Check whether a center/half-extent box overlaps this zone.
    #[inline]
    pub fn is_overlapping(&self, center: Vec3, extents: Vec3) -> bool {
        overlap(self.center, self.extents, center, extents)
    }

    /// Draw the zone's wireframe.
    ///
    /// `lifetime` is how long the renderer should keep the lines, in seconds.
    pub fn draw(&self, renderer: &dyn ZoneRenderer, lifetime: f32) {
        let color = self.kind.color();
        for (from, to) in self.bounds.edges() {
            renderer.draw_line(from, to, color, lifetime);
        }
    }
}

/// An ordered zone within a segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 1-based position in the segment's checkpoint sequence
    pub index: u32,
    /// Trigger volume
    pub zone: Zone,
}

impl Checkpoint {
    /// Create a checkpoint.
    pub fn new(index: u32, zone: Zone) -> Self {
        Self { index, zone }
    }

    /// Check whether a box overlaps this checkpoint.
    #[inline]
    pub fn is_overlapping(&self, center: Vec3, extents: Vec3) -> bool {
        self.zone.is_overlapping(center, extents)
    }
}
