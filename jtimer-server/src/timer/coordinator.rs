//! Timer Coordinator
//!
//! Owns the loaded map and every tracked player, and drives them once per
//! server tick.
//!
//! ## Threading
//!
//! The tick thread is the only writer of the player table. Joins need a
//! profile lookup that may block, so [`Timer::add_player`] hands the lookup
//! to a background worker and the result comes back over a channel. Each
//! join carries a ticket; removing the player or clearing the timer drops
//! the ticket, and a result whose ticket is gone is discarded on arrival.
//!
//! ```text
//!   add_player ──► worker (load_profile) ──► join channel
//!                                               │
//!   update_timers ── drain_joins ◄──────────────┘
//!        │
//!        └─► Player::update for each tracked player ──► TickResult
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::core::PlayerTransform;
use crate::host::{
    HudSink, JoinError, JoinRequest, PlayerProfile, ProfileProvider, TransformSource,
    UnrankedProfiles, ZoneRenderer,
};
use crate::timer::events::{format_ticks, SegmentId, TimerEvent, TimerEventData};
use crate::timer::map::Map;
use crate::timer::player::{Player, PlayerClass, PlayerId};
use crate::timer::run::TimerMode;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Timer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Server ticks per second
    pub tick_rate: u32,
    /// Ticks between HUD refreshes
    pub hud_interval: u32,
    /// Ticks between zone wireframe redraws
    pub zone_draw_interval: u32,
    /// Level data to load at startup
    pub map_path: Option<PathBuf>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_RATE,
            hud_interval: 33,
            zone_draw_interval: 67,
            map_path: None,
        }
    }
}

impl TimerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_rate: env_u32("JTIMER_TICK_RATE").unwrap_or(defaults.tick_rate),
            hud_interval: env_u32("JTIMER_HUD_INTERVAL").unwrap_or(defaults.hud_interval),
            zone_draw_interval: env_u32("JTIMER_ZONE_DRAW_INTERVAL")
                .unwrap_or(defaults.zone_draw_interval),
            map_path: std::env::var("JTIMER_MAP_PATH").ok().map(PathBuf::from),
        }
    }

    /// How long a zone wireframe should stay visible, in seconds.
    pub fn zone_draw_lifetime(&self) -> f32 {
        if self.tick_rate == 0 {
            return 0.0;
        }
        self.zone_draw_interval as f32 / self.tick_rate as f32
    }
}

pub(crate) fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("provider panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("provider panicked: {}", s)
    } else {
        "provider panicked".to_string()
    }
}

// =============================================================================
// ERRORS AND RESULTS
// =============================================================================

/// Timer control errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Player is not tracked.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    /// No map is loaded.
    #[error("no map loaded")]
    NoMapLoaded,
    /// The requested segment does not exist or is disabled.
    #[error("{0} is not available on this map")]
    SegmentUnavailable(SegmentId),
}

/// Result of one timer tick.
#[derive(Debug, Clone, Default)]
pub struct TickResult {
    /// Tick that was processed
    pub tick: u32,
    /// Events generated this tick
    pub events: Vec<TimerEvent>,
    /// Players whose transform was rejected this tick
    pub skipped: Vec<PlayerId>,
}

/// Result of a background profile lookup.
#[derive(Debug)]
struct JoinOutcome {
    ticket: u64,
    player_id: PlayerId,
    request: JoinRequest,
    result: Result<PlayerProfile, JoinError>,
}

// =============================================================================
// TIMER
// =============================================================================

/// The timer coordinator.
pub struct Timer {
    config: TimerConfig,
    map: Option<Map>,
    players: BTreeMap<PlayerId, Player>,
    /// Outstanding join tickets
    pending_joins: BTreeMap<PlayerId, u64>,
    next_ticket: u64,
    /// Join results dropped because their ticket was gone
    discarded_joins: u64,
    join_tx: mpsc::UnboundedSender<JoinOutcome>,
    join_rx: mpsc::UnboundedReceiver<JoinOutcome>,
    profiles: Arc<dyn ProfileProvider>,
    hud: Option<Arc<dyn HudSink>>,
    renderer: Option<Arc<dyn ZoneRenderer>>,
    tick: u32,
}

impl Timer {
    /// Create a timer with no map and unranked profiles.
    pub fn new(config: TimerConfig) -> Self {
        let (join_tx, join_rx) = mpsc::unbounded_channel();
        Self {
            config,
            map: None,
            players: BTreeMap::new(),
            pending_joins: BTreeMap::new(),
            next_ticket: 0,
            discarded_joins: 0,
            join_tx,
            join_rx,
            profiles: Arc::new(UnrankedProfiles),
            hud: None,
            renderer: None,
            tick: 0,
        }
    }

    /// Use a profile provider for joins.
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileProvider>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Attach a HUD.
    pub fn with_hud(mut self, hud: Arc<dyn HudSink>) -> Self {
        self.hud = Some(hud);
        self
    }

    /// Attach a zone renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ZoneRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    // =========================================================================
    // MAP LIFECYCLE
    // =========================================================================

    /// Replace the loaded map. Every run state is reset before the next tick.
    #[instrument(skip(self, map), fields(map = %map.name()))]
    pub fn load_map(&mut self, map: Map) {
        self.reset_all_runs();
        self.map = Some(map);
        info!("Map loaded, {} players reset", self.players.len());
    }

    /// Drop the loaded map, keeping tracked players with reset run states.
    pub fn unload_map(&mut self) {
        if let Some(map) = self.map.take() {
            info!("Unloading map '{}'", map.name());
        }
        self.reset_all_runs();
    }

    /// Level boundary: drop the map, every player and every pending join.
    pub fn clear(&mut self) {
        self.unload_map();
        let players = self.players.len();
        let pending = self.pending_joins.len();
        self.players.clear();
        self.pending_joins.clear();
        info!("Timer cleared ({} players, {} pending joins dropped)", players, pending);
    }

    fn reset_all_runs(&mut self) {
        for player in self.players.values_mut() {
            player.run.reset();
        }
    }

    // =========================================================================
    // PLAYER LIFECYCLE
    // =========================================================================

    /// Start tracking a player.
    ///
    /// The profile lookup runs on a blocking worker when a Tokio runtime is
    /// available and on a plain thread otherwise. Either way the player only
    /// appears once the result is merged on the tick thread.
    pub fn add_player(&mut self, request: JoinRequest) -> PlayerId {
        let player_id = request.player_id();
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        // A newer join for the same player supersedes the older one
        self.pending_joins.insert(player_id, ticket);
        debug!("Join queued for {} (ticket {})", player_id, ticket);

        let profiles = Arc::clone(&self.profiles);
        let tx = self.join_tx.clone();
        let job = move || {
            // A panicking provider still posts an outcome so the ticket resolves
            let result = panic::catch_unwind(AssertUnwindSafe(|| profiles.load_profile(&request)))
                .unwrap_or_else(|payload| Err(JoinError::Lookup(panic_message(payload.as_ref()))));
            // Receiver gone means the timer was dropped; nothing to deliver to
            let _ = tx.send(JoinOutcome { ticket, player_id, request, result });
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                thread::spawn(job);
            }
        }

        player_id
    }

    /// Stop tracking a player. Unknown players are a no-op.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        let pending = self.pending_joins.remove(player_id).is_some();
        let tracked = self.players.remove(player_id).is_some();
        if tracked || pending {
            info!("Player {} removed", player_id);
        }
        tracked
    }

    /// Merge every join result that has arrived. Returns how many players
    /// were added.
    pub fn drain_joins(&mut self) -> usize {
        let mut added = 0;
        while let Ok(outcome) = self.join_rx.try_recv() {
            if self.merge_join(outcome) {
                added += 1;
            }
        }
        added
    }

    /// Wait until no join is outstanding, merging results as they arrive.
    pub async fn settle_joins(&mut self) -> usize {
        let mut added = self.drain_joins();
        while !self.pending_joins.is_empty() {
            // We hold a sender, so the channel never closes under us
            let Some(outcome) = self.join_rx.recv().await else {
                break;
            };
            if self.merge_join(outcome) {
                added += 1;
            }
        }
        added
    }

    /// Block until no join is outstanding.
    ///
    /// For hosts without an async runtime. Inside a runtime this only merges
    /// what has already arrived; use [`Timer::settle_joins`] there.
    pub fn wait_for_joins(&mut self) -> usize {
        if tokio::runtime::Handle::try_current().is_ok() {
            return self.drain_joins();
        }
        let mut added = self.drain_joins();
        while !self.pending_joins.is_empty() {
            let Some(outcome) = self.join_rx.blocking_recv() else {
                break;
            };
            if self.merge_join(outcome) {
                added += 1;
            }
        }
        added
    }

    fn merge_join(&mut self, outcome: JoinOutcome) -> bool {
        let JoinOutcome { ticket, player_id, request, result } = outcome;

        if self.pending_joins.get(&player_id) != Some(&ticket) {
            debug!("Discarding stale join for {} (ticket {})", player_id, ticket);
            self.discarded_joins += 1;
            return false;
        }
        self.pending_joins.remove(&player_id);

        match result {
            Ok(profile) => {
                info!(
                    "Player {} ({}) joined in slot {}{}",
                    request.name,
                    player_id,
                    request.slot,
                    if profile.ranked { ", ranked" } else { "" },
                );
                let player = Player::new(player_id, request.name, request.slot, profile);
                self.players.insert(player_id, player);
                true
            }
            Err(e) => {
                warn!("Join failed for {} ({}): {}", request.name, player_id, e);
                false
            }
        }
    }

    /// Spawn hook: record the class and make sure the timer is on.
    pub fn player_spawned(&mut self, player_id: &PlayerId, class: PlayerClass) -> Result<(), TimerError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(TimerError::UnknownPlayer(*player_id))?;

        player.class = class;
        if player.run.timer_mode() == TimerMode::None {
            player.run.set_mode(TimerMode::Map, 0);
        } else {
            player.run.restart();
        }
        debug!("Player {} spawned as {:?}", player_id, class);
        Ok(())
    }

    /// Death hook: disable the timer until the next spawn.
    pub fn reset_player(&mut self, player_id: &PlayerId) -> Result<(), TimerError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(TimerError::UnknownPlayer(*player_id))?;
        player.run.reset();
        Ok(())
    }

    /// Restart the player's current attempt, keeping their mode.
    pub fn restart_player(&mut self, player_id: &PlayerId) -> Result<(), TimerError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(TimerError::UnknownPlayer(*player_id))?;
        player.run.restart();
        Ok(())
    }

    /// Switch a player's timer mode.
    ///
    /// `index` picks the course or bonus. Switching to `None` always works;
    /// other modes need the segment to exist on the loaded map.
    pub fn set_mode(&mut self, player_id: &PlayerId, mode: TimerMode, index: usize) -> Result<(), TimerError> {
        if !self.players.contains_key(player_id) {
            return Err(TimerError::UnknownPlayer(*player_id));
        }

        let segment = match mode {
            TimerMode::None => None,
            TimerMode::Map => Some(SegmentId::Map),
            TimerMode::Course => Some(SegmentId::Course(index)),
            TimerMode::Bonus => Some(SegmentId::Bonus(index)),
        };
        if let Some(segment) = segment {
            let map = self.map.as_ref().ok_or(TimerError::NoMapLoaded)?;
            if map.segment(segment).is_none() {
                return Err(TimerError::SegmentUnavailable(segment));
            }
        }

        if let Some(player) = self.players.get_mut(player_id) {
            player.run.set_mode(mode, index);
            info!("Player {} timer set to {:?}", player_id, mode);
        }
        Ok(())
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Run one timer tick.
    ///
    /// Merges finished joins, then updates every tracked player from the
    /// transform source. A player with no transform is left untouched; one
    /// with a malformed transform is logged and skipped for this tick.
    pub fn update_timers(&mut self, source: &dyn TransformSource) -> TickResult {
        self.drain_joins();

        let tick = self.tick;
        let mut result = TickResult { tick, ..TickResult::default() };
        let hud = self.hud.as_deref().map(|sink| (sink, self.config.hud_interval));

        for player in self.players.values_mut() {
            let Some(raw) = source.transform(&player.id) else {
                continue;
            };
            let transform = match PlayerTransform::try_from(raw) {
                Ok(transform) => transform,
                Err(e) => {
                    warn!("Skipping {} on tick {}: {}", player.id, tick, e);
                    result.skipped.push(player.id);
                    continue;
                }
            };
            player.update(&transform, self.map.as_ref(), tick, hud, &mut result.events);
        }

        #[cfg(feature = "debug-tracing")]
        debug!(
            "Tick {}: {} players, {} events, {} skipped",
            tick,
            self.players.len(),
            result.events.len(),
            result.skipped.len(),
        );

        let interval = self.config.zone_draw_interval;
        if interval > 0 && tick % interval == 0 {
            self.draw_zones();
        }

        for event in &result.events {
            self.log_event(event);
        }

        self.tick = self.tick.wrapping_add(1);
        result
    }

    fn draw_zones(&self) {
        let (Some(renderer), Some(map)) = (self.renderer.as_deref(), self.map.as_ref()) else {
            return;
        };
        let lifetime = self.config.zone_draw_lifetime();
        for segment in map.segments() {
            segment.start_zone().draw(renderer, lifetime);
            segment.end_zone().draw(renderer, lifetime);
            for checkpoint in segment.checkpoints() {
                checkpoint.zone.draw(renderer, lifetime);
            }
        }
    }

    fn log_event(&self, event: &TimerEvent) {
        let name = self
            .players
            .get(&event.player_id)
            .map(|p| p.name.as_str())
            .unwrap_or("?");
        let rate = self.config.tick_rate;

        match &event.data {
            TimerEventData::RunStarted { segment } => {
                debug!("{} started {}", name, segment);
            }
            TimerEventData::CheckpointEntered { segment, index, in_order, split_ticks } => {
                debug!(
                    "{} reached checkpoint {} of {} at {}{}",
                    name,
                    index,
                    segment,
                    format_ticks(*split_ticks, rate),
                    if *in_order { "" } else { " (out of order)" },
                );
            }
            TimerEventData::RunFinished { segment, elapsed_ticks, split } => {
                info!(
                    "{} finished {} in {}{}",
                    name,
                    segment,
                    format_ticks(*elapsed_ticks, rate),
                    if *split { "" } else { " (no split)" },
                );
            }
            TimerEventData::CheckpointMissed { segment, missed } => {
                debug!("{} missed checkpoints {:?} on {}", name, missed, segment);
            }
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Configuration.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Loaded map.
    pub fn map(&self) -> Option<&Map> {
        self.map.as_ref()
    }

    /// Next tick to be processed.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Tracked player by id.
    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// All tracked players, in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of tracked players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Number of joins still waiting on a profile lookup.
    pub fn pending_join_count(&self) -> usize {
        self.pending_joins.len()
    }

    /// Join results discarded so far because the player left or the timer
    /// was cleared first.
    pub fn discarded_join_count(&self) -> u64 {
        self.discarded_joins
    }
}
