//! Segments
//!
//! A segment is a timed route: a start zone, an end zone and an ordered list
//! of checkpoints. The map itself is a segment, and it owns course and bonus
//! segments.
//!
//! Segments hold no per-player data. Each transition method takes the
//! player's [`SegmentRun`] for this segment and a [`Transition`] context that
//! identifies the player by id and collects emitted events.
//!
//! ## Run phases
//!
//! ```text
//!   None ──enter start──► Started ──leave start──► Running ──enter end──► Ended
//!                                                    │
//!                                         enter checkpoint (split bookkeeping)
//! ```
//!
//! `Ended` is terminal. Only an explicit reset of the run state returns the
//! segment to `None`.

use serde::{Serialize, Deserialize};

use crate::core::PlayerHull;
use crate::timer::events::{SegmentId, TimerEvent};
use crate::timer::player::PlayerId;
use crate::timer::zone::{Checkpoint, Zone, ZoneKind};
use crate::timer::map::MapError;

/// Per-segment run phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum RunPhase {
    /// No attempt in progress
    #[default]
    None = 0,
    /// Touching the start zone
    Started = 1,
    /// Clock running
    Running = 2,
    /// Reached the end zone
    Ended = 3,
}

/// One checkpoint visit recorded during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSplit {
    /// 1-based checkpoint index
    pub index: u32,
    /// Tick the player entered the checkpoint
    pub enter_tick: u32,
    /// Tick the player left the checkpoint (None while still inside)
    pub leave_tick: Option<u32>,
}

/// A player's progress through one segment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRun {
    /// Current phase
    pub phase: RunPhase,
    /// Tick the player touched the start zone
    pub entered_start_tick: Option<u32>,
    /// Tick the clock started (player left the start zone)
    pub start_tick: Option<u32>,
    /// Tick the player reached the end zone
    pub end_tick: Option<u32>,
    /// Checkpoints visited, in visit order
    pub checkpoints: Vec<CheckpointSplit>,
    /// False once a checkpoint was skipped
    pub in_order: bool,
}

impl SegmentRun {
    /// Fresh progress with no attempt.
    pub fn new() -> Self {
        Self {
            in_order: true,
            ..Self::default()
        }
    }

    /// Highest checkpoint index accepted so far (0 if none).
    pub fn last_checkpoint(&self) -> u32 {
        self.checkpoints.iter().map(|c| c.index).max().unwrap_or(0)
    }

    /// Ticks on the clock at `now`.
    ///
    /// Frozen at the finish time once the run has ended.
    pub fn elapsed_ticks(&self, now: u32) -> Option<u32> {
        let start = self.start_tick?;
        let end = self.end_tick.unwrap_or(now);
        Some(end.wrapping_sub(start))
    }

    /// True while the clock is running.
    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }
}

/// Context for one transition: who, when, and where events go.
pub struct Transition<'a> {
    /// Player being updated
    pub player_id: PlayerId,
    /// Current tick
    pub tick: u32,
    /// Event sink for this tick
    pub events: &'a mut Vec<TimerEvent>,
}

/// A timed route with start/end zones and ordered checkpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    id: SegmentId,
    name: String,
    start_zone: Zone,
    end_zone: Zone,
    checkpoints: Vec<Checkpoint>,
}

impl Segment {
    /// Build a segment.
    ///
    /// Checkpoints are sorted by index; indices must run `1..=n` with no
    /// gaps or duplicates.
    pub fn new(
        id: SegmentId,
        name: impl Into<String>,
        start_zone: Zone,
        end_zone: Zone,
        mut checkpoints: Vec<Checkpoint>,
    ) -> Result<Self, MapError> {
        if start_zone.kind() != ZoneKind::Start {
            return Err(MapError::WrongZoneKind { segment: id, zone: start_zone.name().to_string() });
        }
        if end_zone.kind() != ZoneKind::End {
            return Err(MapError::WrongZoneKind { segment: id, zone: end_zone.name().to_string() });
        }

        checkpoints.sort_by_key(|c| c.index);
        for (position, checkpoint) in checkpoints.iter().enumerate() {
            let expected = position as u32 + 1;
            if checkpoint.index != expected {
                return Err(MapError::CheckpointOrder {
                    segment: id,
                    expected,
                    found: checkpoint.index,
                });
            }
        }

        Ok(Self {
            id,
            name: name.into(),
            start_zone,
            end_zone,
            checkpoints,
        })
    }

    /// Segment identifier.
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start zone.
    pub fn start_zone(&self) -> &Zone {
        &self.start_zone
    }

    /// End zone.
    pub fn end_zone(&self) -> &Zone {
        &self.end_zone
    }

    /// Checkpoints in index order.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Test every zone against the player's hull and apply transitions.
    ///
    /// Order is fixed: start, then end, then checkpoints.
    pub fn evaluate(&self, hull: &PlayerHull, run: &mut SegmentRun, cx: &mut Transition<'_>) {
        if self.start_zone.is_overlapping(hull.center, hull.extents) {
            self.on_enter_start(run, cx);
        } else {
            self.on_leave_start(run, cx);
        }

        if self.end_zone.is_overlapping(hull.center, hull.extents) {
            self.on_enter_end(run, cx);
        }

        for checkpoint in &self.checkpoints {
            if checkpoint.is_overlapping(hull.center, hull.extents) {
                self.on_enter_checkpoint(run, checkpoint, cx);
            } else {
                self.on_leave_checkpoint(run, checkpoint, cx);
            }
        }
    }

    /// Player is inside the start zone.
    ///
    /// Only a fresh attempt (`None`) moves to `Started`. Re-entering the start
    /// mid-run never touches the clock.
    pub fn on_enter_start(&self, run: &mut SegmentRun, cx: &mut Transition<'_>) {
        if run.phase != RunPhase::None {
            return;
        }
        run.phase = RunPhase::Started;
        run.entered_start_tick = Some(cx.tick);
    }

    /// Player is outside the start zone.
    ///
    /// The clock starts on the `Started -> Running` edge, so time spent
    /// standing in the start zone is not counted.
    pub fn on_leave_start(&self, run: &mut SegmentRun, cx: &mut Transition<'_>) {
        if run.phase != RunPhase::Started {
            return;
        }
        run.phase = RunPhase::Running;
        run.start_tick = Some(cx.tick);
        run.end_tick = None;
        run.checkpoints.clear();
        run.in_order = true;
        cx.events.push(TimerEvent::run_started(cx.tick, cx.player_id, self.id));
    }

    /// Player is inside the end zone.
    pub fn on_enter_end(&self, run: &mut SegmentRun, cx: &mut Transition<'_>) {
        if run.phase != RunPhase::Running {
            return;
        }
        let Some(start) = run.start_tick else {
            return;
        };

        run.phase = RunPhase::Ended;
        run.end_tick = Some(cx.tick);
        let elapsed = cx.tick.wrapping_sub(start);

        let missed = self.missed_checkpoints(run);
        let split = run.in_order && missed.is_empty();

        cx.events.push(TimerEvent::run_finished(cx.tick, cx.player_id, self.id, elapsed, split));
        if !split {
            cx.events.push(TimerEvent::checkpoint_missed(cx.tick, cx.player_id, self.id, missed));
        }
    }

    /// Player is inside a checkpoint.
    ///
    /// The next expected index is one past the highest accepted so far.
    /// Lower indices are ignored, higher ones are accepted but break the split.
    pub fn on_enter_checkpoint(
        &self,
        run: &mut SegmentRun,
        checkpoint: &Checkpoint,
        cx: &mut Transition<'_>,
    ) {
        if run.phase != RunPhase::Running {
            return;
        }

        let expected = run.last_checkpoint() + 1;
        if checkpoint.index < expected {
            return;
        }

        let in_order = checkpoint.index == expected;
        if !in_order {
            run.in_order = false;
        }

        run.checkpoints.push(CheckpointSplit {
            index: checkpoint.index,
            enter_tick: cx.tick,
            leave_tick: None,
        });

        let split_ticks = run.elapsed_ticks(cx.tick).unwrap_or(0);
        cx.events.push(TimerEvent::checkpoint_entered(
            cx.tick,
            cx.player_id,
            self.id,
            checkpoint.index,
            in_order,
            split_ticks,
        ));
    }

    /// Player is outside a checkpoint; close its visit if still open.
    pub fn on_leave_checkpoint(
        &self,
        run: &mut SegmentRun,
        checkpoint: &Checkpoint,
        cx: &mut Transition<'_>,
    ) {
        if let Some(entry) = run
            .checkpoints
            .iter_mut()
            .find(|c| c.index == checkpoint.index && c.leave_tick.is_none())
        {
            entry.leave_tick = Some(cx.tick);
        }
    }

    /// Checkpoint indices not visited during the run.
    fn missed_checkpoints(&self, run: &SegmentRun) -> Vec<u32> {
        self.checkpoints
            .iter()
            .map(|c| c.index)
            .filter(|index| !run.checkpoints.iter().any(|s| s.index == *index))
            .collect()
    }
}
