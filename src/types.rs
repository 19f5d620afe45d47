//! Core types for the Nocturne pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: per-day sleep records, merged sleep maps, and focus intervals.

use crate::error::ComputeError;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Maximum plausible single-night sleep duration (seconds). Anything beyond
/// this is treated as a data-collection error and truncated.
pub const CUTOFF_SECS: i64 = 900 * 60;

/// Provenance of a detected sleep interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SleepSource {
    /// Derived from raw accelerometer stillness
    Acceleration,
    /// Derived from gaps in the step stream
    Steps,
    /// A named HealthKit device or app (e.g. "Apple Watch", "WHOOP", "Clock")
    Named(String),
}

impl SleepSource {
    pub fn as_str(&self) -> &str {
        match self {
            SleepSource::Acceleration => "acceleration",
            SleepSource::Steps => "Steps",
            SleepSource::Named(name) => name,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "acceleration" => SleepSource::Acceleration,
            "Steps" => SleepSource::Steps,
            other => SleepSource::Named(other.to_string()),
        }
    }

    /// "Clock" is a low-confidence auto-detected source; the merger avoids it
    /// whenever any alternative exists for the day.
    pub fn is_clock(&self) -> bool {
        matches!(self, SleepSource::Named(name) if name == "Clock")
    }
}

impl Serialize for SleepSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SleepSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(SleepSource::from_label(&label))
    }
}

/// One night's detected sleep for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepInterval {
    /// When the person fell asleep (run timezone)
    pub sleep_start: DateTime<FixedOffset>,
    /// When the person woke up (run timezone)
    pub wake_end: DateTime<FixedOffset>,
    /// Total sleep seconds, capped at [`CUTOFF_SECS`]
    pub duration_secs: i64,
    /// Where the record came from
    pub source: SleepSource,
}

/// Per-day sleep map keyed by the wake-up day. At most one record per day;
/// sparse maps are expected and get backfilled by the merger.
pub type SleepByDay = BTreeMap<NaiveDate, SleepInterval>;

/// Cognitive-focus level for a timeline block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusLevel {
    /// Sleep or rest-unavailable block
    Sleep,
    /// Post-sleep recovery or low-focus rest block
    Rest,
    /// High-focus block
    Focus,
}

impl FocusLevel {
    pub fn code(self) -> u8 {
        match self {
            FocusLevel::Sleep => 0,
            FocusLevel::Rest => 1,
            FocusLevel::Focus => 2,
        }
    }
}

impl Serialize for FocusLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for FocusLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(FocusLevel::Sleep),
            1 => Ok(FocusLevel::Rest),
            2 => Ok(FocusLevel::Focus),
            other => Err(D::Error::custom(format!("invalid focus level: {other}"))),
        }
    }
}

/// One block of the day's focus timeline. Boundaries are integer Unix
/// timestamps; `timezone` is the run's UTC offset in hours, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusInterval {
    pub start: i64,
    pub end: i64,
    pub level: FocusLevel,
    pub timezone: i32,
}

/// Last night's sleep window as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepWindow {
    pub start: i64,
    pub end: i64,
    pub timezone: i32,
}

/// Convert an epoch-seconds timestamp (possibly fractional) into a datetime
/// in the given fixed UTC-hour offset.
pub(crate) fn local_time(
    epoch_secs: f64,
    tz_hours: i32,
) -> Result<DateTime<FixedOffset>, ComputeError> {
    let offset =
        FixedOffset::east_opt(tz_hours * 3600).ok_or(ComputeError::InvalidTimezone(tz_hours))?;
    let secs = epoch_secs.floor() as i64;
    let nanos = ((epoch_secs - secs as f64) * 1e9) as u32;
    let utc = DateTime::from_timestamp(secs, nanos)
        .ok_or(ComputeError::InvalidTimestamp(epoch_secs))?;
    Ok(utc.with_timezone(&offset))
}
