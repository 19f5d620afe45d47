//! Structured sleep extraction
//!
//! Two extractors that turn already-classified sensor streams into per-day
//! sleep candidates: HealthKit sleep-stage samples (the in-bed stage only)
//! and step-count records (long gaps in the step stream read as sleep).

use crate::error::ComputeError;
use crate::payload::{StageSample, StepSample};
use crate::types::{local_time, SleepByDay, SleepInterval, SleepSource, CUTOFF_SECS};
use std::collections::btree_map::Entry;

/// HealthKit sleep-analysis stage code for "in bed"
pub const STAGE_IN_BED: i64 = 0;

/// Step-count threshold separating a disturbance from a real wake-up
pub const DISTURBANCE_STEPS: i64 = 8;

/// Minimum step-stream gap that opens a sleep record
pub const FIRST_SLEEP_GAP_SECS: i64 = 3 * 3600;

/// Extract per-day sleep intervals from sleep-stage samples, keyed by the
/// local wake-up day. Only in-bed records count as sleep evidence. The
/// returned offset is the one carried by the last record processed; one
/// timezone is honored per run.
pub fn sleep_from_stages(
    samples: &[StageSample],
) -> Result<Option<(SleepByDay, i32)>, ComputeError> {
    if samples.is_empty() {
        return Ok(None);
    }

    let mut tz = 0;
    let mut days = SleepByDay::new();

    for sample in samples {
        tz = sample.timezone;
        if sample.value != STAGE_IN_BED {
            continue;
        }

        let sleep_start = local_time(sample.start_date, sample.timezone)?;
        let wake_end = local_time(sample.end_date, sample.timezone)?;
        let duration = (wake_end - sleep_start).num_seconds().clamp(0, CUTOFF_SECS);

        // One night can carry several in-bed spans; they accumulate under the
        // wake day unless the total would blow past the cutoff.
        match days.entry(wake_end.date_naive()) {
            Entry::Vacant(slot) => {
                slot.insert(SleepInterval {
                    sleep_start,
                    wake_end,
                    duration_secs: duration,
                    source: SleepSource::from_label(&sample.source),
                });
            }
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if record.duration_secs + duration < CUTOFF_SECS - duration {
                    record.duration_secs += duration;
                    record.source = SleepSource::from_label(&sample.source);
                }
            }
        }
    }

    Ok(Some((days, tz)))
}

/// Extract per-day sleep intervals from a step stream using the default
/// disturbance and gap thresholds.
pub fn sleep_from_steps(samples: &[StepSample]) -> Result<SleepByDay, ComputeError> {
    sleep_from_steps_with(samples, DISTURBANCE_STEPS, FIRST_SLEEP_GAP_SECS)
}

/// Extract per-day sleep intervals from a step stream. A gap between
/// consecutive records longer than `first_sleep_gap_secs` opens a
/// `Steps`-sourced record on the gap-end day; while sleeping, shorter gaps
/// accumulate as micro-wakes. A record with more than `disturbance_steps`
/// steps ends the sleeping state.
pub fn sleep_from_steps_with(
    samples: &[StepSample],
    disturbance_steps: i64,
    first_sleep_gap_secs: i64,
) -> Result<SleepByDay, ComputeError> {
    let Some(first) = samples.first() else {
        return Ok(SleepByDay::new());
    };

    let mut last_at = local_time(first.start_date, first.timezone)?;
    let mut sleeping = false;
    let mut days = SleepByDay::new();

    for record in &samples[1..] {
        let at = local_time(record.start_date, record.timezone)?;
        let gap = (at - last_at).num_seconds();
        let day = at.date_naive();

        if gap > first_sleep_gap_secs {
            sleeping = true;
            days.insert(
                day,
                SleepInterval {
                    sleep_start: last_at,
                    wake_end: at,
                    duration_secs: gap.min(CUTOFF_SECS),
                    source: SleepSource::Steps,
                },
            );
        } else if sleeping {
            if let Some(existing) = days.get_mut(&day) {
                if existing.duration_secs + gap < CUTOFF_SECS - gap {
                    existing.duration_secs += gap;
                }
            }
        }

        if record.value > disturbance_steps {
            sleeping = false;
        }

        last_at = at;
    }

    Ok(days)
}
