//! Tracked Players
//!
//! Stable player identity plus the per-player record the coordinator keeps:
//! profile data from the join worker and the live run state.

use std::fmt;
use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use crate::core::PlayerTransform;
use crate::host::{HudSink, HudSnapshot, PlayerProfile};
use crate::timer::events::TimerEvent;
use crate::timer::map::Map;
use crate::timer::run::RunState;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Stable player identifier.
///
/// Derived from the player's SteamID, never from the transient engine slot,
/// so a slot reused by another client can't inherit someone else's run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Derive from a SteamID string (any rendering, e.g. `STEAM_0:1:1234`).
    ///
    /// Uses SHA256 truncated to 16 bytes.
    pub fn from_steamid(steamid: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"jtimer-player:");
        hasher.update(steamid.trim().as_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; 16];
        id.copy_from_slice(&hash[..16]);
        Self(id)
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Short hex form for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

// =============================================================================
// PLAYER CLASS
// =============================================================================

/// Player class reported by spawn events. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum PlayerClass {
    /// Not spawned yet
    #[default]
    None = 0,
    /// Scout
    Scout = 1,
    /// Soldier
    Soldier = 2,
    /// Pyro
    Pyro = 3,
    /// Demoman
    Demoman = 4,
    /// Heavy
    Heavy = 5,
    /// Engineer
    Engineer = 6,
    /// Medic
    Medic = 7,
    /// Sniper
    Sniper = 8,
    /// Spy
    Spy = 9,
}

impl PlayerClass {
    /// Get class from the engine's class index. Unknown indices map to `None`.
    pub fn from_index(index: u8) -> PlayerClass {
        match index {
            1 => PlayerClass::Scout,
            2 => PlayerClass::Soldier,
            3 => PlayerClass::Pyro,
            4 => PlayerClass::Demoman,
            5 => PlayerClass::Heavy,
            6 => PlayerClass::Engineer,
            7 => PlayerClass::Medic,
            8 => PlayerClass::Sniper,
            9 => PlayerClass::Spy,
            _ => PlayerClass::None,
        }
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// A tracked player.
#[derive(Clone, Debug)]
pub struct Player {
    /// Stable identity
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Engine slot at join time (informational; never used as a key)
    pub slot: u32,
    /// Profile from the ranking backend
    pub profile: PlayerProfile,
    /// Cosmetic class tag
    pub class: PlayerClass,
    /// Live run state
    pub run: RunState,
}

impl Player {
    /// Create a player with a fresh run state.
    pub fn new(id: PlayerId, name: impl Into<String>, slot: u32, profile: PlayerProfile) -> Self {
        Self {
            id,
            name: name.into(),
            slot,
            profile,
            class: PlayerClass::None,
            run: RunState::new(),
        }
    }

    /// Per-tick update: run state first, then the periodic HUD refresh.
    ///
    /// The HUD refresh reads state only, so a missing HUD changes nothing.
    pub fn update(
        &mut self,
        transform: &PlayerTransform,
        map: Option<&Map>,
        tick: u32,
        hud: Option<(&dyn HudSink, u32)>,
        events: &mut Vec<TimerEvent>,
    ) {
        self.run.update(self.id, transform, map, tick, events);

        if let Some((sink, interval)) = hud {
            if interval > 0 && tick % interval == 0 {
                sink.draw_timer(&self.hud_snapshot(tick));
            }
        }
    }

    /// Snapshot of what the HUD shows for this player.
    pub fn hud_snapshot(&self, tick: u32) -> HudSnapshot {
        let active = self.run.active_run();
        HudSnapshot {
            player_id: self.id,
            name: self.name.clone(),
            mode: self.run.timer_mode(),
            segment: self.run.active_segment(),
            phase: active.map(|r| r.phase).unwrap_or_default(),
            elapsed_ticks: active.and_then(|r| r.elapsed_ticks(tick)),
            checkpoints: active.map(|r| r.checkpoints.len()).unwrap_or(0),
            speed: self.run.velocity().map(|v| v.length_xy()).unwrap_or(0.0),
        }
    }
}
