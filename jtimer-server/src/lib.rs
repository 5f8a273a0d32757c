//! # jtimer
//!
//! Zone-based speedrun timer for movement game servers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        JTIMER SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Geometry primitives                       │
//! │  ├── vec3.rs     - 3D vector                                 │
//! │  ├── aabb.rs     - Axis-aligned boxes and overlap test       │
//! │  └── hull.rs     - Engine transform to player hull           │
//! │                                                              │
//! │  timer/          - Run timing                                │
//! │  ├── zone.rs     - Start/end/checkpoint volumes              │
//! │  ├── segment.rs  - Run phase state machine                   │
//! │  ├── map.rs      - Level data and segment graph              │
//! │  ├── events.rs   - Timer events                              │
//! │  ├── run.rs      - Per-player run state                      │
//! │  ├── player.rs   - Player identity                           │
//! │  └── coordinator.rs - Tick loop and background joins         │
//! │                                                              │
//! │  scoring/        - Personal bests, records, points           │
//! │                                                              │
//! │  host/           - Engine-facing traits                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tick Model
//!
//! The host calls [`Timer::update_timers`] once per server tick with the
//! current transform of every player. Players are keyed by a stable
//! [`PlayerId`] and iterated in a `BTreeMap`, so the same transforms always
//! produce the same events in the same order.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod timer;
pub mod scoring;
pub mod host;

// Re-export commonly used types
pub use crate::core::{Aabb, PlayerHull, PlayerTransform, RawTransform, Vec3};
pub use timer::{Map, PlayerId, TickResult, Timer, TimerConfig, TimerEvent, TimerEventData, TimerMode};
pub use scoring::{RecordBook, ScoringConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server tick rate (Hz)
pub const TICK_RATE: u32 = 66;
