//! Map Geometry
//!
//! Builds the Map → Course/Bonus → Zone/Checkpoint graph from level data.
//!
//! A segment whose start or end zone is missing, or whose geometry is
//! malformed, is disabled for the rest of the level: it is logged once here
//! and stored as `None`, so the tick loop simply never sees it.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::{Aabb, GeometryError, Vec3};
use crate::timer::events::SegmentId;
use crate::timer::segment::Segment;
use crate::timer::zone::{Checkpoint, Zone, ZoneKind};

// =============================================================================
// LEVEL DATA
// =============================================================================

/// One zone volume as authored in level data.
///
/// Either `min`/`max` corners or `center`/`extents` must be given.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    /// Zone name
    #[serde(default)]
    pub name: String,
    /// Explicit 1-based checkpoint index (checkpoints only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// First corner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<[f32; 3]>,
    /// Opposite corner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<[f32; 3]>,
    /// Box center
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f32; 3]>,
    /// Box half-extents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extents: Option<[f32; 3]>,
}

impl ZoneDefinition {
    /// Zone from two corners.
    pub fn from_corners(name: impl Into<String>, min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }

    /// Zone from center and half-extents.
    pub fn from_center(name: impl Into<String>, center: [f32; 3], extents: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            center: Some(center),
            extents: Some(extents),
            ..Self::default()
        }
    }

    /// Set an explicit checkpoint index.
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Resolve the authored volume into a box.
    pub fn bounds(&self) -> Result<Aabb, GeometryError> {
        match (self.min, self.max, self.center, self.extents) {
            (Some(a), Some(b), _, _) => Aabb::from_corners(Vec3::from_array(a), Vec3::from_array(b)),
            (_, _, Some(c), Some(e)) => Aabb::from_center_extents(Vec3::from_array(c), Vec3::from_array(e)),
            _ => Err(GeometryError::MissingVolume),
        }
    }
}

/// A segment as authored in level data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Start zone
    #[serde(default)]
    pub start: Option<ZoneDefinition>,
    /// End zone
    #[serde(default)]
    pub end: Option<ZoneDefinition>,
    /// Checkpoints; index defaults to list position + 1
    #[serde(default)]
    pub checkpoints: Vec<ZoneDefinition>,
}

/// A whole level's timer geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Level name
    pub name: String,
    /// Map-level start zone
    #[serde(default)]
    pub start: Option<ZoneDefinition>,
    /// Map-level end zone
    #[serde(default)]
    pub end: Option<ZoneDefinition>,
    /// Map-level checkpoints
    #[serde(default)]
    pub checkpoints: Vec<ZoneDefinition>,
    /// Courses (stages)
    #[serde(default)]
    pub courses: Vec<SegmentDefinition>,
    /// Bonus routes
    #[serde(default)]
    pub bonuses: Vec<SegmentDefinition>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Map loading errors.
#[derive(Debug, Error)]
pub enum MapError {
    /// Map file could not be read.
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    /// Map JSON is invalid.
    #[error("invalid map data: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required zone is absent.
    #[error("{segment} has no {kind:?} zone")]
    MissingZone {
        /// Segment missing the zone
        segment: SegmentId,
        /// Which zone
        kind: ZoneKind,
    },

    /// A zone has unusable geometry.
    #[error("{segment} zone '{zone}': {source}")]
    Geometry {
        /// Segment owning the zone
        segment: SegmentId,
        /// Zone name
        zone: String,
        /// Underlying geometry problem
        source: GeometryError,
    },

    /// A zone was used in the wrong role.
    #[error("{segment} zone '{zone}' has the wrong kind")]
    WrongZoneKind {
        /// Segment owning the zone
        segment: SegmentId,
        /// Zone name
        zone: String,
    },

    /// Checkpoint indices are not exactly 1..=n.
    #[error("{segment} checkpoint order broken: expected {expected}, found {found}")]
    CheckpointOrder {
        /// Segment owning the checkpoints
        segment: SegmentId,
        /// Index that should come next
        expected: u32,
        /// Index that was found
        found: u32,
    },
}

// =============================================================================
// MAP
// =============================================================================

/// The loaded level's segment graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Map {
    name: String,
    root: Option<Segment>,
    courses: Vec<Option<Segment>>,
    bonuses: Vec<Option<Segment>>,
}

impl Map {
    /// Build from level data. Broken segments are disabled, not fatal.
    pub fn from_definition(def: &MapDefinition) -> Self {
        let root_def = SegmentDefinition {
            name: def.name.clone(),
            start: def.start.clone(),
            end: def.end.clone(),
            checkpoints: def.checkpoints.clone(),
        };

        let root = build_or_disable(SegmentId::Map, &root_def);
        let courses: Vec<Option<Segment>> = def
            .courses
            .iter()
            .enumerate()
            .map(|(i, d)| build_or_disable(SegmentId::Course(i), d))
            .collect();
        let bonuses: Vec<Option<Segment>> = def
            .bonuses
            .iter()
            .enumerate()
            .map(|(i, d)| build_or_disable(SegmentId::Bonus(i), d))
            .collect();

        let map = Self {
            name: def.name.clone(),
            root,
            courses,
            bonuses,
        };

        info!(
            "Loaded map '{}': {} courses ({} usable), {} bonuses ({} usable)",
            map.name,
            map.courses.len(),
            map.courses.iter().flatten().count(),
            map.bonuses.len(),
            map.bonuses.iter().flatten().count(),
        );

        map
    }

    /// Parse level data from JSON.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let def: MapDefinition = serde_json::from_str(json)?;
        Ok(Self::from_definition(&def))
    }

    /// Load level data from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Level name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map-level segment, if usable.
    pub fn root(&self) -> Option<&Segment> {
        self.root.as_ref()
    }

    /// All course slots; `None` marks a disabled course.
    pub fn courses(&self) -> &[Option<Segment>] {
        &self.courses
    }

    /// All bonus slots; `None` marks a disabled bonus.
    pub fn bonuses(&self) -> &[Option<Segment>] {
        &self.bonuses
    }

    /// Usable course by index.
    pub fn course(&self, index: usize) -> Option<&Segment> {
        self.courses.get(index).and_then(Option::as_ref)
    }

    /// Usable bonus by index.
    pub fn bonus(&self, index: usize) -> Option<&Segment> {
        self.bonuses.get(index).and_then(Option::as_ref)
    }

    /// Look up any usable segment.
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        match id {
            SegmentId::Map => self.root(),
            SegmentId::Course(i) => self.course(i),
            SegmentId::Bonus(i) => self.bonus(i),
        }
    }

    /// Every usable segment, map first.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.root
            .iter()
            .chain(self.courses.iter().flatten())
            .chain(self.bonuses.iter().flatten())
    }
}

fn build_or_disable(id: SegmentId, def: &SegmentDefinition) -> Option<Segment> {
    match build_segment(id, def) {
        Ok(segment) => Some(segment),
        Err(e) => {
            warn!("Disabling {}: {}", id, e);
            None
        }
    }
}

fn build_segment(id: SegmentId, def: &SegmentDefinition) -> Result<Segment, MapError> {
    let start = def
        .start
        .as_ref()
        .ok_or(MapError::MissingZone { segment: id, kind: ZoneKind::Start })?;
    let end = def
        .end
        .as_ref()
        .ok_or(MapError::MissingZone { segment: id, kind: ZoneKind::End })?;

    let start_zone = build_zone(id, start, ZoneKind::Start)?;
    let end_zone = build_zone(id, end, ZoneKind::End)?;

    let mut checkpoints = Vec::with_capacity(def.checkpoints.len());
    for (position, cp) in def.checkpoints.iter().enumerate() {
        let index = cp.index.unwrap_or(position as u32 + 1);
        checkpoints.push(Checkpoint::new(index, build_zone(id, cp, ZoneKind::Checkpoint)?));
    }

    let name = if def.name.is_empty() { id.to_string() } else { def.name.clone() };
    Segment::new(id, name, start_zone, end_zone, checkpoints)
}

fn build_zone(segment: SegmentId, def: &ZoneDefinition, kind: ZoneKind) -> Result<Zone, MapError> {
    let bounds = def.bounds().map_err(|source| MapError::Geometry {
        segment,
        zone: def.name.clone(),
        source,
    })?;
    if bounds.is_degenerate() {
        warn!("{} zone '{}' has zero volume", segment, def.name);
    }
    Ok(Zone::new(def.name.clone(), kind, bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_JSON: &str = r#"{
        "name": "jump_demo",
        "start": { "name": "map_start", "min": [-64, -64, 0], "max": [64, 64, 128] },
        "end": { "name": "map_end", "center": [3000, 0, 64], "extents": [64, 64, 64] },
        "checkpoints": [
            { "name": "cp_b", "index": 2, "center": [2000, 0, 64], "extents": [64, 64, 64] },
            { "name": "cp_a", "index": 1, "center": [1000, 0, 64], "extents": [64, 64, 64] }
        ],
        "courses": [
            {
                "name": "Stage 1",
                "start": { "min": [-64, -64, 0], "max": [64, 64, 128] },
                "end": { "center": [1000, 0, 64], "extents": [64, 64, 64] }
            },
            { "name": "Broken stage", "start": { "min": [0, 0, 0], "max": [1, 1, 1] } }
        ],
        "bonuses": [
            {
                "start": { "center": [0, 5000, 64], "extents": [64, 64, 64] },
                "end": { "center": [0, 6000, 64], "extents": [64, 64, 64] },
                "checkpoints": [ { "center": [0, 5500, 64], "extents": [32, 32, 32] } ]
            }
        ]
    }"#;

    #[test]
    fn test_map_from_json() {
        let map = Map::from_json(MAP_JSON).unwrap();
        assert_eq!(map.name(), "jump_demo");

        let root = map.root().unwrap();
        let indices: Vec<u32> = root.checkpoints().iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(root.checkpoints()[0].zone.name(), "cp_a");

        // Second course has no end zone and is disabled
        assert_eq!(map.courses().len(), 2);
        assert!(map.course(0).is_some());
        assert!(map.course(1).is_none());
        assert_eq!(map.course(0).unwrap().name(), "Stage 1");

        // Unnamed bonus falls back to its id
        let bonus = map.bonus(0).unwrap();
        assert_eq!(bonus.name(), "bonus 1");
        assert_eq!(bonus.checkpoints().len(), 1);

        assert_eq!(map.segments().count(), 3);
        assert!(map.segment(SegmentId::Bonus(3)).is_none());
    }

    #[test]
    fn test_missing_map_end_disables_root_only() {
        let def = MapDefinition {
            name: "no_end".into(),
            start: Some(ZoneDefinition::from_corners("s", [0.0; 3], [10.0; 3])),
            courses: vec![SegmentDefinition {
                name: "c1".into(),
                start: Some(ZoneDefinition::from_corners("s", [0.0; 3], [10.0; 3])),
                end: Some(ZoneDefinition::from_corners("e", [100.0; 3], [110.0; 3])),
                checkpoints: Vec::new(),
            }],
            ..MapDefinition::default()
        };
        let map = Map::from_definition(&def);
        assert!(map.root().is_none());
        assert!(map.course(0).is_some());
    }

    #[test]
    fn test_bad_geometry_disables_segment() {
        let def = SegmentDefinition {
            name: "nan".into(),
            start: Some(ZoneDefinition::from_center("s", [f32::NAN, 0.0, 0.0], [1.0; 3])),
            end: Some(ZoneDefinition::from_corners("e", [0.0; 3], [1.0; 3])),
            checkpoints: Vec::new(),
        };
        assert!(matches!(
            build_segment(SegmentId::Course(0), &def),
            Err(MapError::Geometry { .. })
        ));

        let no_volume = SegmentDefinition {
            start: Some(ZoneDefinition { name: "empty".into(), ..ZoneDefinition::default() }),
            ..def
        };
        assert!(build_segment(SegmentId::Course(0), &no_volume).is_err());
    }

    #[test]
    fn test_duplicate_checkpoint_index_disables_segment() {
        let def = SegmentDefinition {
            name: "dup".into(),
            start: Some(ZoneDefinition::from_corners("s", [0.0; 3], [1.0; 3])),
            end: Some(ZoneDefinition::from_corners("e", [9.0; 3], [10.0; 3])),
            checkpoints: vec![
                ZoneDefinition::from_corners("a", [2.0; 3], [3.0; 3]).with_index(1),
                ZoneDefinition::from_corners("b", [4.0; 3], [5.0; 3]).with_index(1),
            ],
        };
        assert!(matches!(
            build_segment(SegmentId::Bonus(0), &def),
            Err(MapError::CheckpointOrder { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(Map::from_json("{ not json"), Err(MapError::Parse(_))));
        assert!(matches!(Map::load("/nonexistent/jtimer/map.json"), Err(MapError::Io(_))));
    }
}
