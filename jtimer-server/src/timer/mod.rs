//! Timer Module
//!
//! Zone-based run timing. Deterministic given the same transforms.
//!
//! ## Module Structure
//!
//! - `zone`: Trigger volumes and checkpoints
//! - `segment`: Start/end/checkpoint state machine
//! - `map`: Level data loading and the segment graph
//! - `events`: Timer events emitted per tick
//! - `run`: Per-player run state
//! - `player`: Player identity and per-tick update
//! - `coordinator`: The `Timer` that drives everything

pub mod zone;
pub mod segment;
pub mod map;
pub mod events;
pub mod run;
pub mod player;
pub mod coordinator;

// Re-export key types
pub use zone::{Checkpoint, Zone, ZoneKind};
pub use segment::{CheckpointSplit, RunPhase, Segment, SegmentRun};
pub use map::{Map, MapDefinition, MapError, SegmentDefinition, ZoneDefinition};
pub use events::{SegmentId, SegmentKind, TimerEvent, TimerEventData, format_ticks, ticks_to_seconds};
pub use run::{RunState, TimerMode};
pub use player::{Player, PlayerClass, PlayerId};
pub use coordinator::{TickResult, Timer, TimerConfig, TimerError};
