//! Scoring
//!
//! Turns finished runs into personal bests, map records and points.
//! Fed from the timer's per-tick events; never touches run state.

pub mod points;
pub mod records;

use serde::{Serialize, Deserialize};

use crate::timer::coordinator::env_u32;

pub use points::points_for;
pub use records::{RecordBook, RecordOutcome, RunRecord, ScoreMessage};

/// Points configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points for the first split completion of the map
    pub points_map: u32,
    /// Points for the first split completion of a course
    pub points_course: u32,
    /// Points for the first split completion of a bonus
    pub points_bonus: u32,
    /// Extra points for setting a record
    pub record_bonus: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points_map: 10,
            points_course: 5,
            points_bonus: 3,
            record_bonus: 5,
        }
    }
}

impl ScoringConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            points_map: env_u32("JTIMER_POINTS_MAP").unwrap_or(defaults.points_map),
            points_course: env_u32("JTIMER_POINTS_COURSE").unwrap_or(defaults.points_course),
            points_bonus: env_u32("JTIMER_POINTS_BONUS").unwrap_or(defaults.points_bonus),
            record_bonus: env_u32("JTIMER_POINTS_RECORD_BONUS").unwrap_or(defaults.record_bonus),
        }
    }
}
