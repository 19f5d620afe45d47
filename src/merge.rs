//! Sleep merging and night selection
//!
//! Combines the stage-extractor and motion-segmenter candidate maps into one
//! authoritative per-day record, then picks out "last night".

use crate::types::{SleepByDay, SleepInterval};
use chrono::NaiveDate;
use log::debug;

/// Merge the two per-day candidate maps into one authoritative map.
///
/// Per day, over the union of both maps' date ranges: a stage record wins
/// unless its source is the low-confidence "Clock"; otherwise the motion
/// record; otherwise the nearest earlier merged day is repeated (gap-fill).
/// The fill iterates forward from the begin date (the earliest day either
/// source saw), so no lookup ever reaches before it.
///
/// Returns `None` when neither modality produced any data at all — callers
/// must treat that as "nothing to report", not an error.
pub fn merge_sleep(
    stage: Option<(SleepByDay, i32)>,
    motion: Option<(SleepByDay, i32)>,
) -> Option<(SleepByDay, i32)> {
    let (stage_days, stage_tz) = match stage {
        Some((days, tz)) => (days, Some(tz)),
        None => (SleepByDay::new(), None),
    };
    let (motion_days, motion_tz) = match motion {
        Some((days, tz)) => (days, Some(tz)),
        None => (SleepByDay::new(), None),
    };

    let first_stage = stage_days.keys().next().copied();
    let first_motion = motion_days.keys().next().copied();
    let begin = match (first_stage, first_motion) {
        (None, None) => return None,
        (Some(day), None) | (None, Some(day)) => day,
        (Some(a), Some(b)) => a.min(b),
    };
    let last = stage_days
        .keys()
        .next_back()
        .copied()
        .unwrap_or(begin)
        .max(motion_days.keys().next_back().copied().unwrap_or(begin));

    let tz = stage_tz.or(motion_tz)?;

    let mut merged = SleepByDay::new();
    let mut previous: Option<SleepInterval> = None;

    for day in begin.iter_days().take_while(|d| *d <= last) {
        let resolved = match stage_days.get(&day) {
            Some(record) if !record.source.is_clock() => record.clone(),
            stage_entry => match (motion_days.get(&day), &previous, stage_entry) {
                (Some(record), _, _) => record.clone(),
                (None, Some(prior), _) => {
                    debug!("no sleep evidence for {day}, repeating the previous day");
                    prior.clone()
                }
                // Begin date with only a Clock record: nothing earlier to
                // repeat, so the Clock record stands.
                (None, None, Some(record)) => record.clone(),
                (None, None, None) => continue,
            },
        };

        merged.insert(day, resolved.clone());
        previous = Some(resolved);
    }

    Some((merged, tz))
}

/// Select "last night": the most recent day present in the merged map. This
/// degrades gracefully when today has no data yet but yesterday does.
pub fn last_night(days: &SleepByDay) -> Option<(NaiveDate, &SleepInterval)> {
    days.last_key_value().map(|(day, record)| (*day, record))
}
