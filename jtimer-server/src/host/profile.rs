//! Player profiles
//!
//! Ranking data loaded when a player joins. Lookups can be slow (database,
//! web API), so the coordinator runs them on a background worker.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::timer::player::PlayerId;

/// A player asking to be tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// SteamID in any rendering
    pub steamid: String,
    /// Display name
    pub name: String,
    /// Engine slot (informational)
    pub slot: u32,
}

impl JoinRequest {
    /// Create a join request.
    pub fn new(steamid: impl Into<String>, name: impl Into<String>, slot: u32) -> Self {
        Self {
            steamid: steamid.into(),
            name: name.into(),
            slot,
        }
    }

    /// Stable identity for this request.
    pub fn player_id(&self) -> PlayerId {
        PlayerId::from_steamid(&self.steamid)
    }
}

/// Ranking profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Whether finishes count for points and records
    pub ranked: bool,
    /// Points accumulated so far
    pub points: u32,
}

/// Join errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// SteamID was empty.
    #[error("empty steamid")]
    EmptySteamId,
    /// The backend could not be reached.
    #[error("profile lookup failed: {0}")]
    Lookup(String),
    /// The backend refused the player.
    #[error("player {steamid} rejected: {reason}")]
    Rejected {
        /// Who was rejected
        steamid: String,
        /// Why
        reason: String,
    },
}

/// Loads ranking profiles. Called off the tick thread.
pub trait ProfileProvider: Send + Sync {
    /// Load the profile for a joining player.
    fn load_profile(&self, request: &JoinRequest) -> Result<PlayerProfile, JoinError>;
}

/// Everyone plays unranked.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnrankedProfiles;

impl ProfileProvider for UnrankedProfiles {
    fn load_profile(&self, request: &JoinRequest) -> Result<PlayerProfile, JoinError> {
        if request.steamid.trim().is_empty() {
            return Err(JoinError::EmptySteamId);
        }
        Ok(PlayerProfile::default())
    }
}

/// Fixed profile table keyed by player id; unknown players are unranked.
#[derive(Clone, Debug, Default)]
pub struct StaticProfiles {
    profiles: BTreeMap<PlayerId, PlayerProfile>,
}

impl StaticProfiles {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile for a SteamID.
    pub fn with(mut self, steamid: &str, profile: PlayerProfile) -> Self {
        self.profiles.insert(PlayerId::from_steamid(steamid), profile);
        self
    }
}

impl ProfileProvider for StaticProfiles {
    fn load_profile(&self, request: &JoinRequest) -> Result<PlayerProfile, JoinError> {
        if request.steamid.trim().is_empty() {
            return Err(JoinError::EmptySteamId);
        }
        Ok(self
            .profiles
            .get(&request.player_id())
            .cloned()
            .unwrap_or_default())
    }
}
