//! Burn/sleep target model
//!
//! A single-feature linear model relating change in burn score to sleep
//! duration: `sleep_secs = coef * burn_delta + intercept`. Forward, it turns
//! a burn level into three sleep-duration targets; inverted, it turns a sleep
//! duration back into a burn-score delta.

use crate::error::ComputeError;

/// Morning offset applied to the reference burn levels
pub const MORNING_BURN_OFFSET: f64 = 20.0;

/// Reference burn level for the low sleep target
pub const LOW_BURN: f64 = 10.0 + MORNING_BURN_OFFSET;

/// Reference burn level for the medium sleep target
pub const MED_BURN: f64 = 50.0 + MORNING_BURN_OFFSET;

/// Reference burn level for the high sleep target
pub const HIGH_BURN: f64 = 100.0 + MORNING_BURN_OFFSET;

/// Synthetic anchor observation: zero burn change maps to 7.5 h of sleep.
/// Keeps a fresh fit from degenerating on a single real observation.
pub const ANCHOR_SLEEP_SECS: f64 = 7.5 * 3600.0;

/// Fitted single-feature line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub coef: f64,
    pub intercept: f64,
}

impl LinearModel {
    pub fn new(coef: f64, intercept: f64) -> Self {
        Self { coef, intercept }
    }

    /// Fit from the one real observation `(burn_now - burn_prev,
    /// last_sleep_secs)` plus the synthetic anchor `(0, 7.5h)`. Used when no
    /// persisted weights exist for the user. Two coincident x values
    /// degenerate to a flat line through the mean.
    pub fn train(burn_now: f64, burn_prev: f64, last_sleep_secs: f64) -> Self {
        let burn_delta = burn_now - burn_prev;
        if burn_delta == 0.0 {
            return Self::new(0.0, (last_sleep_secs + ANCHOR_SLEEP_SECS) / 2.0);
        }
        // Two points pin the line exactly; the anchor sits at x = 0, so the
        // intercept is the anchor's sleep duration.
        Self::new(
            (last_sleep_secs - ANCHOR_SLEEP_SECS) / burn_delta,
            ANCHOR_SLEEP_SECS,
        )
    }

    /// Sleep-duration targets (seconds) for a burn level, at the low, medium
    /// and high reference burns. Unclamped; callers apply the floor/ceiling.
    pub fn predict_targets(&self, burn: f64) -> (f64, f64, f64) {
        let target = |reference: f64| (reference - burn) * self.coef + self.intercept;
        (target(LOW_BURN), target(MED_BURN), target(HIGH_BURN))
    }

    /// Invert the line: burn-score delta implied by a sleep duration.
    /// A zero coefficient means the model is untrained or degenerate and
    /// cannot be inverted; callers treat that as "recovery burn unavailable".
    pub fn burn_change(&self, sleep_secs: f64) -> Result<f64, ComputeError> {
        if self.coef == 0.0 {
            return Err(ComputeError::UntrainedModel);
        }
        Ok((sleep_secs - self.intercept) / self.coef)
    }
}
