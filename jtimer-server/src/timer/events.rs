//! Timer Events
//!
//! Outbound notifications produced by run-state transitions. Chat, scoring
//! and HUD collaborators consume these; the core never formats them.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::timer::player::PlayerId;

/// Identifies a segment within the loaded map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SegmentId {
    /// The whole map
    Map,
    /// A course, by zero-based index
    Course(usize),
    /// A bonus, by zero-based index
    Bonus(usize),
}

impl SegmentId {
    /// Segment kind, dropping the index.
    pub fn kind(self) -> SegmentKind {
        match self {
            SegmentId::Map => SegmentKind::Map,
            SegmentId::Course(_) => SegmentKind::Course,
            SegmentId::Bonus(_) => SegmentKind::Bonus,
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Courses and bonuses are numbered from 1 for players
        match self {
            SegmentId::Map => write!(f, "map"),
            SegmentId::Course(i) => write!(f, "course {}", i + 1),
            SegmentId::Bonus(i) => write!(f, "bonus {}", i + 1),
        }
    }
}

/// Kind of timed segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SegmentKind {
    /// Whole map
    Map = 0,
    /// Course (stage) within a map
    Course = 1,
    /// Optional bonus route
    Bonus = 2,
}

/// Timer event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEventData {
    /// Player left a start zone; the clock is running.
    RunStarted {
        /// Segment being timed
        segment: SegmentId,
    },

    /// Player entered a checkpoint during a run.
    CheckpointEntered {
        /// Segment the checkpoint belongs to
        segment: SegmentId,
        /// 1-based checkpoint index
        index: u32,
        /// False when earlier checkpoints were skipped
        in_order: bool,
        /// Ticks since the run started
        split_ticks: u32,
    },

    /// Player reached the end zone.
    RunFinished {
        /// Segment that was completed
        segment: SegmentId,
        /// Ticks from leaving the start zone to entering the end zone
        elapsed_ticks: u32,
        /// True only if every checkpoint was visited in order
        split: bool,
    },

    /// Emitted alongside a non-split finish.
    CheckpointMissed {
        /// Segment the finish belongs to
        segment: SegmentId,
        /// Indices never entered during the run
        missed: Vec<u32>,
    },
}

impl TimerEventData {
    /// Segment the event belongs to.
    pub fn segment(&self) -> SegmentId {
        match self {
            TimerEventData::RunStarted { segment }
            | TimerEventData::CheckpointEntered { segment, .. }
            | TimerEventData::RunFinished { segment, .. }
            | TimerEventData::CheckpointMissed { segment, .. } => *segment,
        }
    }
}

/// A timer event with timing and owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEvent {
    /// Tick when the transition happened
    pub tick: u32,

    /// Player whose run changed
    pub player_id: PlayerId,

    /// Event data
    pub data: TimerEventData,
}

impl TimerEvent {
    /// Create a new event.
    pub fn new(tick: u32, player_id: PlayerId, data: TimerEventData) -> Self {
        Self { tick, player_id, data }
    }

    /// Create run started event.
    pub fn run_started(tick: u32, player_id: PlayerId, segment: SegmentId) -> Self {
        Self::new(tick, player_id, TimerEventData::RunStarted { segment })
    }

    /// Create checkpoint entered event.
    pub fn checkpoint_entered(
        tick: u32,
        player_id: PlayerId,
        segment: SegmentId,
        index: u32,
        in_order: bool,
        split_ticks: u32,
    ) -> Self {
        Self::new(
            tick,
            player_id,
            TimerEventData::CheckpointEntered {
                segment,
                index,
                in_order,
                split_ticks,
            },
        )
    }

    /// Create run finished event.
    pub fn run_finished(
        tick: u32,
        player_id: PlayerId,
        segment: SegmentId,
        elapsed_ticks: u32,
        split: bool,
    ) -> Self {
        Self::new(
            tick,
            player_id,
            TimerEventData::RunFinished {
                segment,
                elapsed_ticks,
                split,
            },
        )
    }

    /// Create checkpoint missed event.
    pub fn checkpoint_missed(
        tick: u32,
        player_id: PlayerId,
        segment: SegmentId,
        missed: Vec<u32>,
    ) -> Self {
        Self::new(tick, player_id, TimerEventData::CheckpointMissed { segment, missed })
    }
}

/// Convert a tick count to seconds.
#[inline]
pub fn ticks_to_seconds(ticks: u32, tick_rate: u32) -> f64 {
    if tick_rate == 0 {
        return 0.0;
    }
    f64::from(ticks) / f64::from(tick_rate)
}

/// Format a tick count as `m:ss.mmm` for logs.
pub fn format_ticks(ticks: u32, tick_rate: u32) -> String {
    let total = ticks_to_seconds(ticks, tick_rate);
    let minutes = (total / 60.0).floor() as u64;
    let seconds = total - (minutes as f64) * 60.0;
    format!("{}:{:06.3}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_display() {
        assert_eq!(SegmentId::Map.to_string(), "map");
        assert_eq!(SegmentId::Course(0).to_string(), "course 1");
        assert_eq!(SegmentId::Bonus(2).to_string(), "bonus 3");
        assert_eq!(SegmentId::Bonus(2).kind(), SegmentKind::Bonus);
    }

    #[test]
    fn test_event_segment_accessor() {
        let id = PlayerId::new([1; 16]);
        let event = TimerEvent::run_finished(10, id, SegmentId::Course(1), 600, true);
        assert_eq!(event.data.segment(), SegmentId::Course(1));
        assert_eq!(event.player_id, id);
    }

    #[test]
    fn test_tick_formatting() {
        assert_eq!(format_ticks(66, 66), "0:01.000");
        assert_eq!(format_ticks(66 * 75, 66), "1:15.000");
        assert_eq!(ticks_to_seconds(33, 66), 0.5);
        assert_eq!(ticks_to_seconds(33, 0), 0.0);
    }
}
