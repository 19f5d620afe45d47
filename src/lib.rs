//! Nocturne - On-device sleep detection and focus-timeline engine
//!
//! Nocturne turns a night of raw biometric sensor data into a small set of
//! derived values through a deterministic pipeline: stage extraction + motion
//! segmentation → per-day merge → night selection → recovery burn → focus
//! timeline.
//!
//! ## Modules
//!
//! - **Sleep detection**: per-day sleep candidates from sleep-stage samples
//!   ([`stages`]), raw accelerometer streams ([`segmenter`]) and step gaps
//! - **Merge & selection**: one authoritative record per day ([`merge`])
//! - **Focus timeline**: the day's alternating focus/rest schedule
//!   ([`timeline`])
//! - **Burn model**: single-feature line relating burn change to sleep
//!   duration ([`model`]), and the sleep-target flow built on it ([`targets`])

pub mod error;
pub mod merge;
pub mod model;
pub mod payload;
pub mod pipeline;
pub mod segmenter;
pub mod stages;
pub mod targets;
pub mod timeline;
pub mod types;

pub use error::ComputeError;
pub use payload::{NightlyReport, NightlyRequest, SleepTargets, TargetRequest};
pub use pipeline::{
    nightly_report, nightly_report_from_json, sleep_history, sleep_targets_from_json,
    SleepProcessor,
};
pub use types::{FocusInterval, FocusLevel, SleepByDay, SleepInterval, SleepSource, SleepWindow};

/// Nocturne version embedded in report metadata
pub const NOCTURNE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report metadata
pub const PRODUCER_NAME: &str = "nocturne";
