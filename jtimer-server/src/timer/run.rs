//! Player Run State
//!
//! Per-player timer state: the last two physical samples, the active timer
//! mode and one [`SegmentRun`] per tracked segment.
//!
//! In Map mode the map segment and every course are tracked together, so a
//! player finishing the whole map also gets course times along the way.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::{PlayerHull, PlayerTransform, Vec3};
use crate::timer::events::{SegmentId, TimerEvent, TimerEventData};
use crate::timer::map::Map;
use crate::timer::player::PlayerId;
use crate::timer::segment::{CheckpointSplit, RunPhase, SegmentRun, Transition};

/// Which segments a player is currently timed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum TimerMode {
    /// Timer disabled
    #[default]
    None = 0,
    /// Whole map plus every course
    Map = 1,
    /// A single course
    Course = 2,
    /// A single bonus
    Bonus = 3,
}

/// One physical sample taken from the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Validated transform
    pub transform: PlayerTransform,
    /// Hull derived from the transform
    pub hull: PlayerHull,
}

impl Sample {
    fn new(transform: PlayerTransform) -> Self {
        Self {
            hull: transform.hull(),
            transform,
        }
    }
}

/// Run state for one player.
#[derive(Clone, Debug, Default)]
pub struct RunState {
    current: Option<Sample>,
    previous: Option<Sample>,
    mode: TimerMode,
    course_index: usize,
    bonus_index: usize,
    map_run: SegmentRun,
    course_runs: Vec<SegmentRun>,
    bonus_run: SegmentRun,
}

impl RunState {
    /// Fresh state with the timer disabled.
    pub fn new() -> Self {
        Self {
            map_run: SegmentRun::new(),
            bonus_run: SegmentRun::new(),
            ..Self::default()
        }
    }

    // =========================================================================
    // TICK UPDATE
    // =========================================================================

    /// Take a new sample and evaluate the active segments against it.
    ///
    /// The first sample after construction or a reset only primes the
    /// geometry; zone testing needs a previous sample to compare against.
    /// Returns true if any zone was tested.
    pub fn update(
        &mut self,
        player_id: PlayerId,
        transform: &PlayerTransform,
        map: Option<&Map>,
        tick: u32,
        events: &mut Vec<TimerEvent>,
    ) -> bool {
        self.previous = self.current.take();
        self.current = Some(Sample::new(*transform));

        if self.previous.is_none() {
            debug!(player = %player_id, "first sample, zone tests skipped");
            return false;
        }

        let Some(map) = map else {
            return false;
        };
        let hull = transform.hull();
        let first_event = events.len();
        let mut cx = Transition { player_id, tick, events: &mut *events };

        match self.mode {
            TimerMode::None => return false,
            TimerMode::Map => {
                if self.course_runs.len() != map.courses().len() {
                    self.course_runs.resize_with(map.courses().len(), SegmentRun::new);
                }
                if let Some(root) = map.root() {
                    root.evaluate(&hull, &mut self.map_run, &mut cx);
                }
                for (slot, course) in map.courses().iter().enumerate() {
                    if let Some(course) = course {
                        course.evaluate(&hull, &mut self.course_runs[slot], &mut cx);
                    }
                }
            }
            TimerMode::Course => {
                let Some(course) = map.course(self.course_index) else {
                    return false;
                };
                if self.course_runs.len() <= self.course_index {
                    self.course_runs.resize_with(self.course_index + 1, SegmentRun::new);
                }
                course.evaluate(&hull, &mut self.course_runs[self.course_index], &mut cx);
            }
            TimerMode::Bonus => {
                let Some(bonus) = map.bonus(self.bonus_index) else {
                    return false;
                };
                bonus.evaluate(&hull, &mut self.bonus_run, &mut cx);
            }
        }

        // In Map mode the course shown on the HUD follows the latest start
        for event in &events[first_event..] {
            if let TimerEventData::RunStarted { segment: SegmentId::Course(index) } = event.data {
                self.course_index = index;
            }
        }
        true
    }

    // =========================================================================
    // CONTROL
    // =========================================================================

    /// Disable the timer and forget all progress and geometry.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Forget progress and geometry but keep the mode and selection.
    pub fn restart(&mut self) {
        let (mode, course_index, bonus_index) = (self.mode, self.course_index, self.bonus_index);
        self.reset();
        self.mode = mode;
        self.course_index = course_index;
        self.bonus_index = bonus_index;
    }

    /// Switch timer mode.
    ///
    /// `index` selects the course or bonus and is ignored for the other
    /// modes. Progress is always discarded.
    pub fn set_mode(&mut self, mode: TimerMode, index: usize) {
        self.reset();
        self.mode = mode;
        match mode {
            TimerMode::Course => self.course_index = index,
            TimerMode::Bonus => self.bonus_index = index,
            TimerMode::None | TimerMode::Map => {}
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Active timer mode.
    pub fn timer_mode(&self) -> TimerMode {
        self.mode
    }

    /// Selected course.
    pub fn course_index(&self) -> usize {
        self.course_index
    }

    /// Selected bonus.
    pub fn bonus_index(&self) -> usize {
        self.bonus_index
    }

    /// Phase of the map run.
    pub fn map_state(&self) -> RunPhase {
        self.map_run.phase
    }

    /// Phase of the selected course run.
    pub fn course_state(&self) -> RunPhase {
        self.course_runs
            .get(self.course_index)
            .map(|r| r.phase)
            .unwrap_or_default()
    }

    /// Phase of the bonus run.
    pub fn bonus_state(&self) -> RunPhase {
        self.bonus_run.phase
    }

    /// Progress on a specific segment.
    pub fn segment_run(&self, id: SegmentId) -> Option<&SegmentRun> {
        match id {
            SegmentId::Map => Some(&self.map_run),
            SegmentId::Course(index) => self.course_runs.get(index),
            SegmentId::Bonus(index) if index == self.bonus_index => Some(&self.bonus_run),
            SegmentId::Bonus(_) => None,
        }
    }

    /// Segment the HUD should follow, if any.
    pub fn active_segment(&self) -> Option<SegmentId> {
        match self.mode {
            TimerMode::None => None,
            TimerMode::Map => Some(SegmentId::Map),
            TimerMode::Course => Some(SegmentId::Course(self.course_index)),
            TimerMode::Bonus => Some(SegmentId::Bonus(self.bonus_index)),
        }
    }

    /// Progress on the segment the HUD follows.
    pub fn active_run(&self) -> Option<&SegmentRun> {
        self.segment_run(self.active_segment()?)
    }

    /// Checkpoint history of the active run.
    pub fn checkpoints(&self) -> &[CheckpointSplit] {
        self.active_run().map(|r| r.checkpoints.as_slice()).unwrap_or(&[])
    }

    /// Latest sample.
    pub fn current(&self) -> Option<&Sample> {
        self.current.as_ref()
    }

    /// Sample before the latest one.
    pub fn previous(&self) -> Option<&Sample> {
        self.previous.as_ref()
    }

    /// Latest velocity.
    pub fn velocity(&self) -> Option<Vec3> {
        self.current.map(|s| s.transform.velocity())
    }

    /// True if any tracked segment's clock is running.
    pub fn is_running(&self) -> bool {
        self.map_run.is_running()
            || self.bonus_run.is_running()
            || self.course_runs.iter().any(SegmentRun::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::map::{MapDefinition, SegmentDefinition, ZoneDefinition};
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    // Zones sit on a line along +X, 64 units tall, 128 wide.
    fn zone(name: &str, x: f32) -> ZoneDefinition {
        ZoneDefinition::from_center(name, [x, 0.0, 64.0], [64.0, 64.0, 64.0])
    }

    fn test_map() -> Map {
        let def = MapDefinition {
            name: "jump_test".into(),
            start: Some(zone("map_start", 0.0)),
            end: Some(zone("map_end", 4000.0)),
            checkpoints: vec![
                zone("map_cp1", 1000.0).with_index(1),
                zone("map_cp2", 2000.0).with_index(2),
            ],
            courses: vec![SegmentDefinition {
                name: "course 1".into(),
                start: Some(zone("c1_start", 0.0)),
                end: Some(zone("c1_end", 3000.0)),
                checkpoints: Vec::new(),
            }],
            bonuses: vec![SegmentDefinition {
                name: "bonus 1".into(),
                start: Some(zone("b1_start", 0.0)),
                end: Some(zone("b1_end", -2000.0)),
                checkpoints: Vec::new(),
            }],
        };
        Map::from_definition(&def)
    }

    fn at(x: f32) -> PlayerTransform {
        PlayerTransform::new(Vec3::new(x, 0.0, 0.0), Vec3::new(24.0, 24.0, 82.0), Vec3::ZERO).unwrap()
    }

    fn id() -> PlayerId {
        PlayerId::from_steamid("STEAM_0:0:7")
    }

    /// Drive a state through a path of x positions starting at `first_tick`.
    fn walk(state: &mut RunState, map: &Map, first_tick: u32, path: &[f32]) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        for (offset, x) in path.iter().enumerate() {
            state.update(id(), &at(*x), Some(map), first_tick + offset as u32, &mut events);
        }
        events
    }

    fn map_events(events: &[TimerEvent]) -> Vec<TimerEventData> {
        events
            .iter()
            .filter(|e| e.data.segment() == SegmentId::Map)
            .map(|e| e.data.clone())
            .collect()
    }

    #[test]
    fn test_first_update_skips_zone_tests() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Map, 0);

        let mut events = Vec::new();
        let tested = state.update(id(), &at(0.0), Some(&map), 1, &mut events);

        assert!(!tested);
        assert!(events.is_empty());
        assert_eq!(state.map_state(), RunPhase::None);
        assert!(state.previous().is_none());
        let sample = state.current().unwrap();
        assert_eq!(sample.hull.center, Vec3::new(0.0, 0.0, 41.0));
        assert_eq!(sample.hull.extents, Vec3::new(24.0, 24.0, 41.0));

        // Second sample is tested
        assert!(state.update(id(), &at(0.0), Some(&map), 2, &mut events));
        assert_eq!(state.map_state(), RunPhase::Started);
        assert!(state.previous().is_some());
    }

    #[test]
    fn test_split_run() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Map, 0);

        // Ticks 1, 2 in start; leave at tick 3 (T)
        let mut events = walk(&mut state, &map, 1, &[0.0, 0.0, 500.0]);
        assert_eq!(state.map_state(), RunPhase::Running);
        // T+10, T+20, T+30
        let mut tick = 4;
        for (x, until) in [(500.0, 13), (1000.0, 14), (1500.0, 23), (2000.0, 24), (3500.0, 33), (4000.0, 34)] {
            while tick < until {
                state.update(id(), &at(x), Some(&map), tick, &mut events);
                tick += 1;
            }
        }

        assert_eq!(
            map_events(&events),
            vec![
                TimerEventData::RunStarted { segment: SegmentId::Map },
                TimerEventData::CheckpointEntered { segment: SegmentId::Map, index: 1, in_order: true, split_ticks: 10 },
                TimerEventData::CheckpointEntered { segment: SegmentId::Map, index: 2, in_order: true, split_ticks: 20 },
                TimerEventData::RunFinished { segment: SegmentId::Map, elapsed_ticks: 30, split: true },
            ]
        );
        assert_eq!(state.map_state(), RunPhase::Ended);
        assert_eq!(state.checkpoints().len(), 2);
    }

    #[test]
    fn test_skipped_checkpoint_is_not_split() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Map, 0);

        let events = walk(&mut state, &map, 1, &[0.0, 0.0, 500.0, 1500.0, 2000.0, 3500.0, 4000.0]);
        let data = map_events(&events);

        assert!(data.contains(&TimerEventData::CheckpointEntered {
            segment: SegmentId::Map,
            index: 2,
            in_order: false,
            split_ticks: 2,
        }));
        assert!(data.contains(&TimerEventData::RunFinished {
            segment: SegmentId::Map,
            elapsed_ticks: 4,
            split: false,
        }));
        assert!(data.contains(&TimerEventData::CheckpointMissed {
            segment: SegmentId::Map,
            missed: vec![1],
        }));
    }

    #[test]
    fn test_reentering_start_keeps_clock() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Map, 0);

        walk(&mut state, &map, 1, &[0.0, 0.0, 500.0]);
        let start = state.segment_run(SegmentId::Map).unwrap().start_tick;
        assert_eq!(start, Some(3));

        let events = walk(&mut state, &map, 4, &[0.0, 0.0, 0.0]);
        assert!(map_events(&events).is_empty());
        assert_eq!(state.map_state(), RunPhase::Running);
        assert_eq!(state.segment_run(SegmentId::Map).unwrap().start_tick, start);
    }

    #[test]
    fn test_map_mode_tracks_courses_too() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Map, 0);

        let events = walk(&mut state, &map, 1, &[0.0, 0.0, 500.0, 3000.0]);
        assert_eq!(state.map_state(), RunPhase::Running);
        assert_eq!(state.course_state(), RunPhase::Ended);
        assert!(events.iter().any(|e| matches!(
            e.data,
            TimerEventData::RunFinished { segment: SegmentId::Course(0), elapsed_ticks: 1, split: true }
        )));
    }

    #[test]
    fn test_course_mode_ignores_map() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Course, 0);

        let events = walk(&mut state, &map, 1, &[0.0, 0.0, 500.0]);
        assert_eq!(state.map_state(), RunPhase::None);
        assert_eq!(state.course_state(), RunPhase::Running);
        assert!(events.iter().all(|e| e.data.segment() == SegmentId::Course(0)));
    }

    #[test]
    fn test_bonus_mode() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Bonus, 0);

        walk(&mut state, &map, 1, &[0.0, 0.0, -500.0, -2000.0]);
        assert_eq!(state.bonus_state(), RunPhase::Ended);
        assert_eq!(state.map_state(), RunPhase::None);
        assert_eq!(state.active_segment(), Some(SegmentId::Bonus(0)));
    }

    #[test]
    fn test_unknown_course_index_tests_nothing() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Course, 5);

        let mut events = Vec::new();
        state.update(id(), &at(0.0), Some(&map), 1, &mut events);
        assert!(!state.update(id(), &at(0.0), Some(&map), 2, &mut events));
        assert!(events.is_empty());
    }

    #[test]
    fn test_disabled_timer_tests_nothing() {
        let map = test_map();
        let mut state = RunState::new();
        let events = walk(&mut state, &map, 1, &[0.0, 0.0, 500.0, 4000.0]);
        assert!(events.is_empty());
        assert_eq!(state.map_state(), RunPhase::None);
    }

    #[test]
    fn test_reset_and_restart() {
        let map = test_map();
        let mut state = RunState::new();
        state.set_mode(TimerMode::Course, 0);
        walk(&mut state, &map, 1, &[0.0, 0.0, 500.0]);
        assert!(state.is_running());

        state.restart();
        assert_eq!(state.timer_mode(), TimerMode::Course);
        assert_eq!(state.course_state(), RunPhase::None);
        assert!(state.current().is_none());

        state.reset();
        assert_eq!(state.timer_mode(), TimerMode::None);
        assert!(!state.is_running());
    }

    #[test]
    fn test_no_map_tests_nothing() {
        let mut state = RunState::new();
        state.set_mode(TimerMode::Map, 0);
        let mut events = Vec::new();
        state.update(id(), &at(0.0), None, 1, &mut events);
        assert!(!state.update(id(), &at(0.0), None, 2, &mut events));
        assert_eq!(state.map_state(), RunPhase::None);
    }

    #[test]
    fn test_random_walk_never_skips_phases() {
        let map = test_map();
        let mut rng = StdRng::seed_from_u64(0x6a74696d);

        for _ in 0..20 {
            let mut state = RunState::new();
            state.set_mode(TimerMode::Map, 0);
            let mut previous = RunPhase::None;
            let mut last_cp = 0;
            let mut events = Vec::new();

            for tick in 1..400 {
                let x = rng.gen_range(-200.0..4200.0f32);
                state.update(id(), &at(x), Some(&map), tick, &mut events);

                let phase = state.map_state();
                assert!(phase >= previous, "phase went backwards: {:?} -> {:?}", previous, phase);
                // The clock can only start by leaving the start zone
                if previous == RunPhase::None {
                    assert!(phase <= RunPhase::Started, "phase skipped: None -> {:?}", phase);
                }
                previous = phase;

                let run = state.segment_run(SegmentId::Map).unwrap();
                let cp = run.last_checkpoint();
                assert!(cp >= last_cp);
                last_cp = cp;
                let indices: Vec<u32> = run.checkpoints.iter().map(|c| c.index).collect();
                assert!(indices.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
