//! Points awarded for a counted finish.

use crate::scoring::ScoringConfig;
use crate::timer::events::SegmentKind;

/// Points for one counted finish.
///
/// A segment pays its base value once per player, on the first completion.
/// Setting a record pays the record bonus every time.
pub fn points_for(config: &ScoringConfig, kind: SegmentKind, first_completion: bool, is_record: bool) -> u32 {
    let base = if first_completion {
        match kind {
            SegmentKind::Map => config.points_map,
            SegmentKind::Course => config.points_course,
            SegmentKind::Bonus => config.points_bonus,
        }
    } else {
        0
    };
    let bonus = if is_record { config.record_bonus } else { 0 };
    base.saturating_add(bonus)
}
