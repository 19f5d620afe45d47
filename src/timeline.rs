//! Focus timeline synthesis
//!
//! Given last night's sleep window and a fatigue fraction, lays out the day
//! as contiguous blocks: the sleep itself, a fixed recovery block, then
//! alternating focus/rest blocks until the local wind-down hour, closed by a
//! terminal rest-unavailable block.

use crate::types::{FocusInterval, FocusLevel};
use chrono::{DateTime, Duration, FixedOffset, Timelike};

/// Shortest allowed focus block (minutes)
pub const FOCUS_MIN_MINUTES: f64 = 60.0;

/// Longest allowed focus block (minutes)
pub const FOCUS_MAX_MINUTES: f64 = 100.0;

/// Fixed rest block between focus blocks
pub const REST_SECS: i64 = 20 * 60;

/// Post-sleep recovery block (1.5 h)
pub const RECOVERY_SECS: i64 = 3600 * 3 / 2;

/// Sleep duration treated as fully rested
pub const SLEEP_BASELINE_SECS: f64 = 8.0 * 3600.0;

/// Local hour after which no further focus blocks are scheduled
pub const WIND_DOWN_HOUR: u32 = 21;

/// Length of the terminal rest-unavailable block
pub const WIND_DOWN_SECS: i64 = 4 * 3600;

/// Fatigue fraction from last night's sleep duration, relative to the 8 h
/// baseline. Not clamped here; the focus-duration clamp absorbs outliers.
pub fn fatigue_from_sleep(duration_secs: i64) -> f64 {
    duration_secs as f64 / SLEEP_BASELINE_SECS
}

/// Fatigue fraction from a recovery-burn score on its 0-100 scale
pub fn fatigue_from_burn(recovery_burn: f64) -> f64 {
    recovery_burn / 100.0
}

/// Focus-block length for a fatigue fraction. Always lands in
/// `[FOCUS_MIN_MINUTES, FOCUS_MAX_MINUTES]`, whatever the input.
pub fn focus_duration_minutes(fatigue: f64) -> f64 {
    let effect = fatigue * (FOCUS_MAX_MINUTES - FOCUS_MIN_MINUTES);
    (FOCUS_MAX_MINUTES - effect).clamp(FOCUS_MIN_MINUTES, FOCUS_MAX_MINUTES)
}

/// Build the day's focus timeline from last night's sleep window.
///
/// Blocks are contiguous and ordered: level 0 for the sleep window, a 1.5 h
/// level-1 recovery block from wake, then alternating level-2 focus and
/// level-1 rest blocks while each block still starts before the local
/// wind-down hour, and finally a 4 h level-0 block. When the wake lands past
/// the wind-down hour the terminal block follows the recovery block directly.
pub fn synthesize(
    sleep_start: DateTime<FixedOffset>,
    wake_end: DateTime<FixedOffset>,
    fatigue: f64,
    tz_hours: i32,
) -> Vec<FocusInterval> {
    let focus_secs = (focus_duration_minutes(fatigue) * 60.0).round() as i64;

    let recovery_end = wake_end + Duration::seconds(RECOVERY_SECS);
    let mut timeline = vec![
        block(sleep_start, wake_end, FocusLevel::Sleep, tz_hours),
        block(wake_end, recovery_end, FocusLevel::Rest, tz_hours),
    ];

    let mut start = recovery_end;
    let mut end = recovery_end;
    let mut level = FocusLevel::Rest;

    while start.hour() < WIND_DOWN_HOUR {
        if level == FocusLevel::Rest {
            end = start + Duration::seconds(focus_secs);
            level = FocusLevel::Focus;
        } else {
            end = start + Duration::seconds(REST_SECS);
            level = FocusLevel::Rest;
        }
        timeline.push(block(start, end, level, tz_hours));
        start = end;
    }

    timeline.push(block(
        end,
        end + Duration::seconds(WIND_DOWN_SECS),
        FocusLevel::Sleep,
        tz_hours,
    ));
    timeline
}

fn block(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    level: FocusLevel,
    tz_hours: i32,
) -> FocusInterval {
    FocusInterval {
        start: start.timestamp(),
        end: end.timestamp(),
        level,
        timezone: tz_hours,
    }
}
