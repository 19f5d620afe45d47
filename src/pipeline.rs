//! Pipeline orchestration
//!
//! This module provides the public API for Nocturne. It wires the stages
//! together: payload parsing → stage extraction + motion segmentation →
//! per-day merge → night selection → recovery burn → focus timeline → report.

use crate::error::ComputeError;
use crate::merge::{last_night, merge_sleep};
use crate::model::LinearModel;
use crate::payload::{NightlyReport, NightlyRequest, ReportEncoder, TargetRequest};
use crate::segmenter::sleep_from_motion;
use crate::stages::sleep_from_stages;
use crate::targets::sleep_targets;
use crate::timeline::{fatigue_from_burn, fatigue_from_sleep, synthesize};
use crate::types::SleepWindow;
use log::{debug, warn};

/// Compute a nightly report for an already-parsed request.
///
/// Returns `Ok(None)` when there is no sleep evidence at all; the caller
/// serializes that as JSON `null`.
pub fn nightly_report(request: &NightlyRequest) -> Result<Option<NightlyReport>, ComputeError> {
    SleepProcessor::new().process(request)
}

/// Parse a nightly request from JSON and return the report as JSON
pub fn nightly_report_from_json(json: &str) -> Result<String, ComputeError> {
    let request = NightlyRequest::from_json(json)?;
    let report = nightly_report(&request)?;
    Ok(serde_json::to_string(&report)?)
}

/// Parse a sleep-target request from JSON and return the targets as JSON
pub fn sleep_targets_from_json(json: &str) -> Result<String, ComputeError> {
    let request = TargetRequest::from_json(json)?;
    let targets = sleep_targets(&request)?;
    Ok(serde_json::to_string(&targets)?)
}

/// Bootstrap a long-range sleep history from stage samples plus step
/// records. Step-derived nights stand in for days the stage stream missed,
/// under the same priority and gap-fill rules as the nightly merge.
pub fn sleep_history(
    stage_samples: &[crate::payload::StageSample],
    step_samples: &[crate::payload::StepSample],
) -> Result<Option<(crate::types::SleepByDay, i32)>, ComputeError> {
    let stage = sleep_from_stages(stage_samples)?;
    let steps = match step_samples.first() {
        Some(first) => Some((crate::stages::sleep_from_steps(step_samples)?, first.timezone)),
        None => None,
    };
    Ok(merge_sleep(stage, steps))
}

/// Processor that stamps every report it produces with the same instance ID
pub struct SleepProcessor {
    encoder: ReportEncoder,
}

impl Default for SleepProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SleepProcessor {
    /// Create a new processor with a unique instance ID
    pub fn new() -> Self {
        Self {
            encoder: ReportEncoder::new(),
        }
    }

    /// Create a processor with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            encoder: ReportEncoder::with_instance_id(instance_id),
        }
    }

    /// Run the full nightly pipeline on a request
    pub fn process(
        &self,
        request: &NightlyRequest,
    ) -> Result<Option<NightlyReport>, ComputeError> {
        // Stage 1+2: candidate per-day maps from each modality
        let stage = match &request.sensors.sleep_samples {
            Some(samples) => sleep_from_stages(samples)?,
            None => None,
        };
        let motion = match &request.sensors.accelerometer_samples {
            Some(samples) => sleep_from_motion(samples)?,
            None => None,
        };

        // Stage 3: merge into one authoritative map
        let Some((days, tz)) = merge_sleep(stage, motion) else {
            debug!("no sleep evidence in either modality");
            return Ok(None);
        };

        // Stage 4: last night
        let Some((day, record)) = last_night(&days) else {
            return Ok(None);
        };
        let night = record.clone();
        debug!(
            "last night {day}: {}s from {}",
            night.duration_secs,
            night.source.as_str()
        );

        let sleep_timeline = SleepWindow {
            start: night.sleep_start.timestamp(),
            end: night.wake_end.timestamp(),
            timezone: tz,
        };

        // Recovery burn needs both a fitted model and a stored burn score.
        // A zero-coefficient model cannot be inverted; that nulls the burn
        // fields but never aborts the report.
        let recovery_burn = match (
            request.database.weights.and_then(|weights| weights.fitted()),
            request.database.burn(),
        ) {
            (Some((coef, intercept)), Some(burn)) => {
                match LinearModel::new(coef, intercept).burn_change(night.duration_secs as f64) {
                    Ok(change) => Some(burn + change),
                    Err(ComputeError::UntrainedModel) => {
                        warn!("persisted model has zero coefficient; recovery burn unavailable");
                        None
                    }
                    Err(other) => return Err(other),
                }
            }
            _ => None,
        };
        let recovery_score = recovery_burn.map(|burn| burn.clamp(0.0, 100.0));

        // Stage 5: focus timeline, burn-driven when available
        let fatigue = match recovery_burn {
            Some(burn) => fatigue_from_burn(burn),
            None => fatigue_from_sleep(night.duration_secs),
        };
        let focus_timeline = synthesize(night.sleep_start, night.wake_end, fatigue, tz);

        Ok(Some(self.encoder.encode(
            night.duration_secs,
            sleep_timeline,
            recovery_burn,
            recovery_score,
            focus_timeline,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // 2023-11-15 01:00:00 at UTC-5 (06:00:00 UTC)
    const BEDTIME: f64 = 1_700_028_000.0;

    fn full_night_json(database: &str) -> String {
        format!(
            r#"{{
                "dataFromIOS": {{
                    "SleepSample": [{{
                        "startDate": {start},
                        "endDate": {end},
                        "timezone": -5,
                        "value": 0,
                        "source": "Apple Watch"
                    }}],
                    "AccelerometerSample": []
                }},
                "dataFromDatabase": {database}
            }}"#,
            start = BEDTIME,
            end = BEDTIME + 28_800.0,
        )
    }

    #[test]
    fn test_full_night_report() {
        // Scenario: in-bed 01:00-09:00 local (UTC-5), no motion data, no model
        let json = full_night_json(r#"{"weights": {}}"#);
        let report = nightly_report(&NightlyRequest::from_json(&json).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(report.sleep_last_night, 28_800);
        assert_eq!(report.sleep_timeline.start as f64, BEDTIME);
        assert_eq!(report.sleep_timeline.end as f64, BEDTIME + 28_800.0);
        assert_eq!(report.sleep_timeline.timezone, -5);

        // No usable model: burn fields null, timeline still present
        assert_eq!(report.recovery_burn, None);
        assert_eq!(report.recovery_score, None);

        // First block is the sleep window itself
        let first = &report.focus_timeline[0];
        assert_eq!(first.level.code(), 0);
        assert_eq!(first.start as f64, BEDTIME);
        assert_eq!(first.end as f64, BEDTIME + 28_800.0);

        // Second block: recovery from 09:00 to 10:30
        let second = &report.focus_timeline[1];
        assert_eq!(second.level.code(), 1);
        assert_eq!(second.start as f64, BEDTIME + 28_800.0);
        assert_eq!(second.end as f64, BEDTIME + 28_800.0 + 5400.0);
    }

    #[test]
    fn test_empty_sensors_collapse_to_null() {
        let json = r#"{
            "dataFromIOS": {"SleepSample": [], "AccelerometerSample": []},
            "dataFromDatabase": {"weights": {}}
        }"#;
        assert_eq!(nightly_report_from_json(json).unwrap(), "null");
    }

    #[test]
    fn test_recovery_burn_drives_fatigue() {
        // Fitted model: coef 100 s/point, intercept 27000 s. Slept 28800s,
        // so burn change = 18 and recovery burn = 60 + 18 = 78.
        let json = full_night_json(r#"{"weights": {"coef": 100.0, "intercept": 27000.0}, "burn": 60.0}"#);
        let report = nightly_report(&NightlyRequest::from_json(&json).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(report.recovery_burn, Some(78.0));
        assert_eq!(report.recovery_score, Some(78.0));

        // Fatigue 0.78 gives 100 - 31.2 = 68.8-minute focus blocks
        let focus = &report.focus_timeline[2];
        assert_eq!(focus.level.code(), 2);
        assert_eq!(focus.end - focus.start, 4128);
    }

    #[test]
    fn test_zero_coefficient_model_degrades_gracefully() {
        let json = full_night_json(r#"{"weights": {"coef": 0.0, "intercept": 27000.0}, "burn": 60.0}"#);
        let report = nightly_report(&NightlyRequest::from_json(&json).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(report.recovery_burn, None);
        assert_eq!(report.recovery_score, None);
        // Timeline falls back to duration-based fatigue: full night, 60-min focus
        let focus = &report.focus_timeline[2];
        assert_eq!(focus.end - focus.start, 3600);
    }

    #[test]
    fn test_motion_only_report() {
        // Still from 01:00 to 09:00 local, then movement: one motion night
        let json = format!(
            r#"{{
                "dataFromIOS": {{
                    "AccelerometerSample": [
                        {{"timestamp": {t0}, "timezone": -5, "x": 0.0, "y": 0.0, "z": 0.0}},
                        {{"timestamp": {t1}, "timezone": -5, "x": 0.0, "y": 0.0, "z": 0.0}},
                        {{"timestamp": {t2}, "timezone": -5, "x": 1.0, "y": 0.0, "z": 0.0}}
                    ]
                }},
                "dataFromDatabase": {{}}
            }}"#,
            t0 = BEDTIME,
            t1 = BEDTIME + 28_740.0,
            t2 = BEDTIME + 28_800.0,
        );
        let report = nightly_report(&NightlyRequest::from_json(&json).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(report.sleep_last_night, 28_800);
        assert_eq!(report.sleep_timeline.timezone, -5);
        assert_eq!(report.recovery_burn, None);
    }

    #[test]
    fn test_most_recent_night_selected() {
        // Two nights; the report must describe the later one
        let json = format!(
            r#"{{
                "dataFromIOS": {{
                    "SleepSample": [
                        {{"startDate": {s1}, "endDate": {e1}, "timezone": -5, "value": 0, "source": "Apple Watch"}},
                        {{"startDate": {s2}, "endDate": {e2}, "timezone": -5, "value": 0, "source": "Apple Watch"}}
                    ]
                }},
                "dataFromDatabase": {{}}
            }}"#,
            s1 = BEDTIME,
            e1 = BEDTIME + 28_800.0,
            s2 = BEDTIME + 86_400.0,
            e2 = BEDTIME + 86_400.0 + 21_600.0,
        );
        let report = nightly_report(&NightlyRequest::from_json(&json).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(report.sleep_last_night, 21_600);
    }

    #[test]
    fn test_targets_json_round_trip() {
        // No prior weights: trains from the request's own observation
        let json = r#"{"burnPrev": 50.0, "burnNow": 70.0, "lastSleep": 27000.0}"#;
        let out = sleep_targets_from_json(json).unwrap();
        let targets: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(targets["low"], 27000.0);
        assert_eq!(targets["med"], 27000.0);
        assert_eq!(targets["high"], 27000.0);
    }

    #[test]
    fn test_sleep_history_backfills_step_nights() {
        use crate::payload::{StageSample, StepSample};
        use crate::types::SleepSource;

        // One stage night, then a step-only night the following day
        let stage = vec![StageSample {
            start_date: BEDTIME,
            end_date: BEDTIME + 28_800.0,
            timezone: -5,
            value: 0,
            source: "Apple Watch".to_string(),
        }];
        let day2 = BEDTIME + 86_400.0;
        let steps = vec![
            StepSample {
                start_date: day2,
                end_date: day2 + 60.0,
                timezone: -5,
                value: 30,
                source: "iPhone".to_string(),
            },
            StepSample {
                start_date: day2 + 6.0 * 3600.0,
                end_date: day2 + 6.0 * 3600.0 + 60.0,
                timezone: -5,
                value: 40,
                source: "iPhone".to_string(),
            },
        ];

        let (days, tz) = sleep_history(&stage, &steps).unwrap().unwrap();
        assert_eq!(tz, -5);
        assert_eq!(days.len(), 2);

        let mut nights = days.values();
        assert_eq!(
            nights.next().unwrap().source,
            SleepSource::Named("Apple Watch".to_string())
        );
        let step_night = nights.next().unwrap();
        assert_eq!(step_night.source, SleepSource::Steps);
        assert_eq!(step_night.duration_secs, 6 * 3600);
    }

    #[test]
    fn test_malformed_payload_fails() {
        assert!(nightly_report_from_json(r#"{"dataFromDatabase": {}}"#).is_err());
        assert!(nightly_report_from_json("not json").is_err());
    }
}
