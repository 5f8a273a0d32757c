//! Record Book
//!
//! Personal bests, segment records and completion counts for one map.
//! Only split finishes count. Unranked players keep personal bests but
//! never hold records or earn points.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::scoring::{points_for, ScoringConfig};
use crate::timer::events::{format_ticks, SegmentId, TimerEvent, TimerEventData};
use crate::timer::player::PlayerId;

/// A stored finish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Who ran it
    pub player_id: PlayerId,
    /// Which segment
    pub segment: SegmentId,
    /// Time on the clock
    pub elapsed_ticks: u32,
    /// Wall-clock time of the finish
    pub finished_at: DateTime<Utc>,
}

/// What happened when a finish was submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Who finished
    pub player_id: PlayerId,
    /// Which segment
    pub segment: SegmentId,
    /// Time on the clock
    pub elapsed_ticks: u32,
    /// Whether all checkpoints were hit in order
    pub split: bool,
    /// Whether the finish was stored at all
    pub counted: bool,
    /// First counted finish of this segment by this player
    pub first_completion: bool,
    /// Personal best before this finish
    pub previous_best: Option<u32>,
    /// Ticks shaved off the personal best
    pub improvement_ticks: Option<u32>,
    /// Segment record before this finish
    pub previous_record: Option<u32>,
    /// This finish is the new segment record
    pub is_record: bool,
    /// Points awarded
    pub points_gained: u32,
}

/// Player-facing notification derived from an outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreMessage {
    /// Split finish
    Finish {
        /// Time on the clock
        elapsed_ticks: u32,
    },
    /// Finish with missed or out-of-order checkpoints
    FinishNoSplit {
        /// Time on the clock
        elapsed_ticks: u32,
    },
    /// Personal best improved
    Improvement {
        /// Ticks gained
        ticks: u32,
    },
    /// Current record to beat
    Record {
        /// Record time
        record_ticks: u32,
    },
    /// New record set
    RecordSet,
    /// Points awarded
    PointsGain {
        /// Amount
        points: u32,
    },
}

impl RecordOutcome {
    /// Notifications for this outcome, in display order.
    pub fn messages(&self) -> Vec<ScoreMessage> {
        if !self.split {
            return vec![ScoreMessage::FinishNoSplit { elapsed_ticks: self.elapsed_ticks }];
        }

        let mut messages = vec![ScoreMessage::Finish { elapsed_ticks: self.elapsed_ticks }];
        if let Some(ticks) = self.improvement_ticks {
            messages.push(ScoreMessage::Improvement { ticks });
        }
        if self.is_record {
            messages.push(ScoreMessage::RecordSet);
        } else if let Some(record_ticks) = self.previous_record {
            messages.push(ScoreMessage::Record { record_ticks });
        }
        if self.points_gained > 0 {
            messages.push(ScoreMessage::PointsGain { points: self.points_gained });
        }
        messages
    }
}

/// Finishes for one map.
#[derive(Clone, Debug, Default)]
pub struct RecordBook {
    config: ScoringConfig,
    bests: BTreeMap<(PlayerId, SegmentId), RunRecord>,
    records: BTreeMap<SegmentId, RunRecord>,
    completions: BTreeMap<(PlayerId, SegmentId), u32>,
}

impl RecordBook {
    /// Empty book.
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Submit one finish.
    pub fn submit(
        &mut self,
        player_id: PlayerId,
        ranked: bool,
        segment: SegmentId,
        elapsed_ticks: u32,
        split: bool,
    ) -> RecordOutcome {
        let mut outcome = RecordOutcome {
            player_id,
            segment,
            elapsed_ticks,
            split,
            counted: false,
            first_completion: false,
            previous_best: self.personal_best(&player_id, segment),
            improvement_ticks: None,
            previous_record: self.record(segment).map(|r| r.elapsed_ticks),
            is_record: false,
            points_gained: 0,
        };

        if !split {
            return outcome;
        }
        outcome.counted = true;

        let record = RunRecord {
            player_id,
            segment,
            elapsed_ticks,
            finished_at: Utc::now(),
        };

        let completions = self.completions.entry((player_id, segment)).or_insert(0);
        *completions += 1;
        outcome.first_completion = *completions == 1;

        match outcome.previous_best {
            Some(best) if elapsed_ticks >= best => {}
            previous => {
                if let Some(best) = previous {
                    outcome.improvement_ticks = Some(best - elapsed_ticks);
                }
                self.bests.insert((player_id, segment), record.clone());
            }
        }

        if ranked {
            let beats_record = outcome.previous_record.map_or(true, |r| elapsed_ticks < r);
            if beats_record {
                outcome.is_record = true;
                self.records.insert(segment, record);
            }
            outcome.points_gained = points_for(
                &self.config,
                segment.kind(),
                outcome.first_completion,
                outcome.is_record,
            );
        }

        if outcome.is_record {
            info!("{} set the {} record: {} ticks", player_id, segment, elapsed_ticks);
        }
        outcome
    }

    /// Submit every finish in a tick's events.
    ///
    /// `is_ranked` reports whether a player's finishes may set records.
    pub fn apply<F>(&mut self, events: &[TimerEvent], is_ranked: F) -> Vec<RecordOutcome>
    where
        F: Fn(&PlayerId) -> bool,
    {
        events
            .iter()
            .filter_map(|event| match event.data {
                TimerEventData::RunFinished { segment, elapsed_ticks, split } => Some(self.submit(
                    event.player_id,
                    is_ranked(&event.player_id),
                    segment,
                    elapsed_ticks,
                    split,
                )),
                _ => None,
            })
            .collect()
    }

    /// A player's best time on a segment.
    pub fn personal_best(&self, player_id: &PlayerId, segment: SegmentId) -> Option<u32> {
        self.bests.get(&(*player_id, segment)).map(|r| r.elapsed_ticks)
    }

    /// The record on a segment.
    pub fn record(&self, segment: SegmentId) -> Option<&RunRecord> {
        self.records.get(&segment)
    }

    /// Counted finishes of a segment by a player.
    pub fn completions(&self, player_id: &PlayerId, segment: SegmentId) -> u32 {
        self.completions.get(&(*player_id, segment)).copied().unwrap_or(0)
    }

    /// Summary line for logs.
    pub fn describe(&self, segment: SegmentId, tick_rate: u32) -> String {
        match self.record(segment) {
            Some(r) => format!("{} record {} by {}", segment, format_ticks(r.elapsed_ticks, tick_rate), r.player_id),
            None => format!("{} has no record", segment),
        }
    }

    /// Export every record as JSON.
    pub fn records_to_json(&self) -> Result<String, serde_json::Error> {
        let records: Vec<&RunRecord> = self.records.values().collect();
        serde_json::to_string(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    #[test]
    fn test_first_finish_sets_record() {
        let mut book = RecordBook::new(ScoringConfig::default());
        let outcome = book.submit(player(1), true, SegmentId::Map, 900, true);

        assert!(outcome.counted);
        assert!(outcome.first_completion);
        assert!(outcome.is_record);
        assert_eq!(outcome.previous_best, None);
        assert_eq!(outcome.points_gained, 15);
        assert_eq!(book.personal_best(&player(1), SegmentId::Map), Some(900));
        assert_eq!(book.record(SegmentId::Map).unwrap().player_id, player(1));
    }

    #[test]
    fn test_improvement_and_slower_finish() {
        let mut book = RecordBook::new(ScoringConfig::default());
        book.submit(player(1), true, SegmentId::Course(0), 500, true);

        let slower = book.submit(player(1), true, SegmentId::Course(0), 600, true);
        assert_eq!(slower.improvement_ticks, None);
        assert!(!slower.is_record);
        assert_eq!(slower.points_gained, 0);
        assert_eq!(slower.messages(), vec![
            ScoreMessage::Finish { elapsed_ticks: 600 },
            ScoreMessage::Record { record_ticks: 500 },
        ]);

        let faster = book.submit(player(1), true, SegmentId::Course(0), 450, true);
        assert_eq!(faster.improvement_ticks, Some(50));
        assert!(faster.is_record);
        assert_eq!(faster.points_gained, 5);
        assert_eq!(book.completions(&player(1), SegmentId::Course(0)), 3);
    }

    #[test]
    fn test_no_split_is_not_counted() {
        let mut book = RecordBook::new(ScoringConfig::default());
        let outcome = book.submit(player(2), true, SegmentId::Map, 100, false);

        assert!(!outcome.counted);
        assert_eq!(outcome.points_gained, 0);
        assert!(book.record(SegmentId::Map).is_none());
        assert_eq!(outcome.messages(), vec![ScoreMessage::FinishNoSplit { elapsed_ticks: 100 }]);
    }

    #[test]
    fn test_unranked_keeps_personal_best_only() {
        let mut book = RecordBook::new(ScoringConfig::default());
        book.submit(player(1), true, SegmentId::Map, 1000, true);

        let outcome = book.submit(player(3), false, SegmentId::Map, 800, true);
        assert!(outcome.counted);
        assert!(!outcome.is_record);
        assert_eq!(outcome.points_gained, 0);
        assert_eq!(book.personal_best(&player(3), SegmentId::Map), Some(800));
        assert_eq!(book.record(SegmentId::Map).unwrap().elapsed_ticks, 1000);
    }

    #[test]
    fn test_apply_only_reads_finishes() {
        let mut book = RecordBook::new(ScoringConfig::default());
        let events = vec![
            TimerEvent::run_started(1, player(1), SegmentId::Map),
            TimerEvent::run_finished(40, player(1), SegmentId::Map, 39, true),
            TimerEvent::run_finished(40, player(2), SegmentId::Bonus(0), 20, false),
        ];

        let outcomes = book.apply(&events, |id| *id == player(1));
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_record);
        assert!(!outcomes[1].counted);

        let json = book.records_to_json().unwrap();
        assert!(json.contains("\"elapsed_ticks\":39"));
    }
}
