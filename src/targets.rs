//! Sleep-target calculation
//!
//! Answers a sleep-target request: how much sleep the user should get to
//! reach a low, medium or high burn level tomorrow. Uses persisted model
//! weights when the backend has them, otherwise fits a fresh two-point model
//! from the request's own observation.

use crate::error::ComputeError;
use crate::model::LinearModel;
use crate::payload::{SleepTargets, TargetRequest};

/// Ceiling on the low sleep target (14 h in seconds)
pub const MAX_SLEEP_SECS: f64 = 14.0 * 3600.0;

/// Compute sleep-duration targets for a request.
///
/// A request without `burnPrev` carries no usable observation and yields
/// `None` (no-data, not an error). A request with `burnPrev` but missing
/// `burnNow` or `lastSleep` is malformed and fails. The high target is
/// floored at zero and the low target capped at [`MAX_SLEEP_SECS`].
pub fn sleep_targets(request: &TargetRequest) -> Result<Option<SleepTargets>, ComputeError> {
    let Some(burn_prev) = request.burn_prev else {
        return Ok(None);
    };
    let burn_now = request
        .burn_now
        .ok_or_else(|| ComputeError::MissingField("burnNow".to_string()))?;
    let last_sleep = request
        .last_sleep
        .ok_or_else(|| ComputeError::MissingField("lastSleep".to_string()))?;

    let model = match request.weights.and_then(|weights| weights.fitted()) {
        Some((coef, intercept)) => LinearModel::new(coef, intercept),
        None => LinearModel::train(burn_now, burn_prev, last_sleep),
    };

    let (low, med, high) = model.predict_targets(burn_now);
    Ok(Some(SleepTargets {
        low: low.min(MAX_SLEEP_SECS),
        med,
        high: high.max(0.0),
    }))
}
