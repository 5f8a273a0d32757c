//! Host Integration
//!
//! Seams between the timer and the game server hosting it. The engine side
//! implements these traits; the timer only ever calls through them.
//!
//! - `TransformSource`: per-tick player transforms
//! - `HudSink`: on-screen timer text
//! - `ZoneRenderer`: debug wireframes for zones
//! - `ProfileProvider`: ranking profile lookup on join (see [`profile`])

pub mod profile;

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::{RawTransform, Vec3};
use crate::timer::events::SegmentId;
use crate::timer::player::PlayerId;
use crate::timer::run::TimerMode;
use crate::timer::segment::RunPhase;

pub use profile::{JoinError, JoinRequest, PlayerProfile, ProfileProvider, StaticProfiles, UnrankedProfiles};

/// Supplies raw engine transforms each tick.
pub trait TransformSource {
    /// Transform for a tracked player, or `None` if the entity is gone.
    fn transform(&self, player: &PlayerId) -> Option<RawTransform>;
}

impl TransformSource for BTreeMap<PlayerId, RawTransform> {
    fn transform(&self, player: &PlayerId) -> Option<RawTransform> {
        self.get(player).copied()
    }
}

/// Receives HUD refreshes.
pub trait HudSink: Send + Sync {
    /// Show the timer for one player.
    fn draw_timer(&self, snapshot: &HudSnapshot);
}

/// Draws debug lines in the world.
pub trait ZoneRenderer: Send + Sync {
    /// Draw one line segment, kept for `lifetime` seconds.
    fn draw_line(&self, from: Vec3, to: Vec3, color: [u8; 4], lifetime: f32);
}

/// What the HUD shows for one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    /// Player
    pub player_id: PlayerId,
    /// Display name
    pub name: String,
    /// Timer mode
    pub mode: TimerMode,
    /// Segment being shown
    pub segment: Option<SegmentId>,
    /// Phase of that segment
    pub phase: RunPhase,
    /// Clock value, if started
    pub elapsed_ticks: Option<u32>,
    /// Checkpoints reached
    pub checkpoints: usize,
    /// Horizontal speed (units/s)
    pub speed: f32,
}
