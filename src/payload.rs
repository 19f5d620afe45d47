//! External JSON interfaces
//!
//! This module defines the request envelope produced by the ingestion layer
//! (sensor samples from the phone plus model state from the database) and the
//! report payload handed back to the response layer.

use crate::error::ComputeError;
use crate::types::{FocusInterval, SleepWindow};
use crate::{NOCTURNE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One HealthKit sleep-stage sample. `value == 0` means "in bed"; other
/// stage values are ignored by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSample {
    /// Epoch seconds when the stage began
    pub start_date: f64,
    /// Epoch seconds when the stage ended
    pub end_date: f64,
    /// UTC offset in hours
    pub timezone: i32,
    /// HealthKit sleep-analysis stage code
    pub value: i64,
    /// Recording device or app name
    pub source: String,
}

/// One raw triaxial accelerometer sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelSample {
    /// Epoch seconds
    pub timestamp: f64,
    /// UTC offset in hours
    pub timezone: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One step-count record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSample {
    /// Epoch seconds when the step window began
    pub start_date: f64,
    /// Epoch seconds when the step window ended
    pub end_date: f64,
    /// UTC offset in hours
    pub timezone: i32,
    /// Steps taken in the window
    pub value: i64,
    /// Recording device or app name
    pub source: String,
}

/// Sensor sections of the nightly request. Either modality may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorSections {
    #[serde(rename = "SleepSample", default)]
    pub sleep_samples: Option<Vec<StageSample>>,
    #[serde(rename = "AccelerometerSample", default)]
    pub accelerometer_samples: Option<Vec<AccelSample>>,
}

/// Fitted single-feature model parameters as persisted by the backend.
/// An empty object (`{}`) is the "no prior model" state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelWeights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,
}

impl ModelWeights {
    /// Returns `(coef, intercept)` when both parameters are present
    pub fn fitted(&self) -> Option<(f64, f64)> {
        match (self.coef, self.intercept) {
            (Some(coef), Some(intercept)) => Some((coef, intercept)),
            _ => None,
        }
    }
}

/// Database section of the nightly request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSection {
    #[serde(default)]
    pub weights: Option<ModelWeights>,
    #[serde(default)]
    pub burn: Option<f64>,
    #[serde(rename = "lastBurn", default)]
    pub last_burn: Option<f64>,
}

impl DatabaseSection {
    /// Latest burn score, accepting either field spelling the backend sends
    pub fn burn(&self) -> Option<f64> {
        self.burn.or(self.last_burn)
    }
}

/// A full nightly-report request
#[derive(Debug, Clone)]
pub struct NightlyRequest {
    pub sensors: SensorSections,
    pub database: DatabaseSection,
}

#[derive(Debug, Deserialize)]
struct RawNightlyRequest {
    #[serde(rename = "dataFromIOS", default)]
    data_from_ios: Option<SensorSections>,
    #[serde(rename = "dataFromDatabase", default)]
    data_from_database: Option<DatabaseSection>,
}

impl NightlyRequest {
    /// Parse a nightly request from JSON. Both top-level sections are
    /// required; a missing section is a caller-visible failure, not a
    /// no-data sentinel.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let raw: RawNightlyRequest = serde_json::from_str(json)?;
        Ok(Self {
            sensors: raw
                .data_from_ios
                .ok_or_else(|| ComputeError::MissingField("dataFromIOS".to_string()))?,
            database: raw
                .data_from_database
                .ok_or_else(|| ComputeError::MissingField("dataFromDatabase".to_string()))?,
        })
    }
}

/// A sleep-target request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    #[serde(default)]
    pub burn_prev: Option<f64>,
    #[serde(default)]
    pub burn_now: Option<f64>,
    #[serde(default)]
    pub last_sleep: Option<f64>,
    #[serde(default)]
    pub weights: Option<ModelWeights>,
}

impl TargetRequest {
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Low/medium/high sleep-duration targets (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepTargets {
    pub low: f64,
    pub med: f64,
    pub high: f64,
}

/// Report metadata for provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub producer: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
}

/// The nightly report payload. Serialized as JSON `null` (via
/// `Option<NightlyReport>`) when there is no sleep evidence at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightlyReport {
    /// Last night's sleep duration in seconds
    pub sleep_last_night: i64,
    /// Last night's sleep window
    pub sleep_timeline: SleepWindow,
    /// Burn score adjusted for last night's sleep; null without a usable model
    pub recovery_burn: Option<f64>,
    /// Recovery burn clamped to the 0-100 display scale; null with it
    pub recovery_score: Option<f64>,
    /// Alternating focus/rest schedule for the day
    pub focus_timeline: Vec<FocusInterval>,
    pub meta: ReportMeta,
}

/// Encoder that stamps reports with producer provenance
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(
        &self,
        sleep_last_night: i64,
        sleep_timeline: SleepWindow,
        recovery_burn: Option<f64>,
        recovery_score: Option<f64>,
        focus_timeline: Vec<FocusInterval>,
    ) -> NightlyReport {
        NightlyReport {
            sleep_last_night,
            sleep_timeline,
            recovery_burn,
            recovery_score,
            focus_timeline,
            meta: ReportMeta {
                producer: PRODUCER_NAME.to_string(),
                version: NOCTURNE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
        }
    }
}
