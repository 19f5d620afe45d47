//! Motion segmentation
//!
//! Turns a raw accelerometer stream into candidate per-day sleep intervals by
//! detecting prolonged stillness. A stretch of more than four hours without
//! movement on any axis arms the "sleeping" state; the next movement is the
//! wake event and closes the interval.

use crate::error::ComputeError;
use crate::payload::AccelSample;
use crate::types::{local_time, SleepByDay, SleepInterval, SleepSource, CUTOFF_SECS};
use chrono::Duration;
use std::collections::btree_map::Entry;

/// Per-axis delta above which a sample counts as movement (acceleration units)
pub const MOVEMENT_THRESHOLD: f64 = 0.5;

/// How long the stream must stay still before it counts as sleep
pub const STILLNESS_TO_SLEEP_SECS: i64 = 4 * 3600;

/// Segment an accelerometer stream into per-day sleep intervals, keyed by the
/// wake-up day. The first sample only seeds the movement baseline and the
/// fall-asleep anchor; streams with fewer than two samples yield an empty map.
/// Returns `None` when the stream is empty (no timezone to report).
pub fn sleep_from_motion(
    samples: &[AccelSample],
) -> Result<Option<(SleepByDay, i32)>, ComputeError> {
    let Some(first) = samples.first() else {
        return Ok(None);
    };

    let tz = first.timezone;
    let mut fall_asleep = local_time(first.timestamp, tz)?;
    let mut baseline = (first.x, first.y, first.z);
    let mut sleeping = false;
    let mut days = SleepByDay::new();

    for sample in &samples[1..] {
        let at = local_time(sample.timestamp, tz)?;
        let moved = (sample.x - baseline.0).abs() > MOVEMENT_THRESHOLD
            || (sample.y - baseline.1).abs() > MOVEMENT_THRESHOLD
            || (sample.z - baseline.2).abs() > MOVEMENT_THRESHOLD;

        if !moved {
            if at - fall_asleep > Duration::seconds(STILLNESS_TO_SLEEP_SECS) {
                sleeping = true;
            }
        } else if sleeping {
            // Wake event: close the interval on the wake day, accumulating
            // micro-wakes that land on the same day.
            let duration = (at - fall_asleep).num_seconds().min(CUTOFF_SECS);
            match days.entry(at.date_naive()) {
                Entry::Occupied(mut entry) => {
                    let record = entry.get_mut();
                    record.duration_secs = (record.duration_secs + duration).min(CUTOFF_SECS);
                }
                Entry::Vacant(slot) => {
                    slot.insert(SleepInterval {
                        sleep_start: fall_asleep,
                        wake_end: at,
                        duration_secs: duration,
                        source: SleepSource::Acceleration,
                    });
                }
            }
            sleeping = false;
        } else {
            // Movement while awake: candidate sleep onset starts here.
            baseline = (sample.x, sample.y, sample.z);
            fall_asleep = at;
        }
    }

    Ok(Some((days, tz)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const T0: f64 = 1_700_000_000.0; // 2023-11-14 22:13:20 UTC

    fn sample(offset_secs: f64, x: f64) -> AccelSample {
        AccelSample {
            timestamp: T0 + offset_secs,
            timezone: 0,
            x,
            y: 0.0,
            z: 0.0,
        }
    }

    #[test]
    fn test_empty_stream() {
        assert!(sleep_from_motion(&[]).unwrap().is_none());
    }

    #[test]
    fn test_single_sample_yields_empty_map() {
        let (days, tz) = sleep_from_motion(&[sample(0.0, 0.0)]).unwrap().unwrap();
        assert!(days.is_empty());
        assert_eq!(tz, 0);
    }

    #[test]
    fn test_short_still_stream_yields_nothing() {
        // Under four hours of stillness never arms the sleeping state
        let samples: Vec<AccelSample> = (0..6).map(|i| sample(i as f64 * 1800.0, 0.0)).collect();
        let (days, _) = sleep_from_motion(&samples).unwrap().unwrap();
        assert!(days.is_empty());
    }

    #[test]
    fn test_still_period_then_movement_emits_one_interval() {
        let samples = vec![
            sample(0.0, 0.0),
            sample(5.0 * 3600.0, 0.0),      // still for 5h, arms sleeping
            sample(5.0 * 3600.0 + 60.0, 1.0), // movement = wake
        ];
        let (days, _) = sleep_from_motion(&samples).unwrap().unwrap();
        assert_eq!(days.len(), 1);

        let record = days.values().next().unwrap();
        assert_eq!(record.duration_secs, 5 * 3600 + 60);
        assert_eq!(record.source, SleepSource::Acceleration);
        assert_eq!(
            (record.wake_end - record.sleep_start).num_seconds(),
            5 * 3600 + 60
        );
    }

    #[test]
    fn test_micro_wake_accumulates_on_same_day() {
        let samples = vec![
            sample(0.0, 0.0),
            sample(4.5 * 3600.0, 0.0),        // asleep
            sample(4.5 * 3600.0 + 30.0, 1.0), // brief wake
            sample(4.5 * 3600.0 + 60.0, 2.0), // still moving, new onset anchor
            sample(9.5 * 3600.0, 2.0),        // asleep again
            sample(9.5 * 3600.0 + 30.0, 3.0), // final wake, same calendar day
        ];
        let (days, _) = sleep_from_motion(&samples).unwrap().unwrap();
        assert_eq!(days.len(), 1);

        let record = days.values().next().unwrap();
        let first = 4 * 3600 + 1800 + 30;
        let second = 5 * 3600 - 30; // 9.5h+30s minus the 4.5h+60s anchor
        assert_eq!(record.duration_secs, first + second);
    }

    #[test]
    fn test_wake_day_keys_the_record() {
        // Falls asleep before midnight UTC, wakes after: keyed by wake day
        let bedtime = 1_700_000_000.0; // 22:13:20 UTC
        let samples = vec![
            AccelSample {
                timestamp: bedtime,
                timezone: 0,
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            AccelSample {
                timestamp: bedtime + 7.0 * 3600.0,
                timezone: 0,
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            AccelSample {
                timestamp: bedtime + 7.0 * 3600.0 + 10.0,
                timezone: 0,
                x: 1.0,
                y: 0.0,
                z: 0.0,
            },
        ];
        let (days, _) = sleep_from_motion(&samples).unwrap().unwrap();
        let day = *days.keys().next().unwrap();
        assert_eq!(day.to_string(), "2023-11-15");
    }
}
