//! Time-decaying flow meter.
//!
//! Every completed flow task grants a percentage that decays linearly to zero
//! over a difficulty-specific window. The meter is the clamped sum of all live
//! contributions and is recomputed from scratch on every call; there is no
//! accumulator to drift.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::records::{Difficulty, FlowCompletion};

/// Completions older than this are dropped from storage.
pub const RETENTION_DAYS: i64 = 7;

/// Upper bound of the meter.
pub const MAX_FLOW: f64 = 100.0;

impl Difficulty {
    /// Percentage granted at the moment of completion.
    pub fn grant_percent(&self) -> f64 {
        match self {
            Difficulty::Easy => 33.0,
            Difficulty::Medium => 43.0,
            Difficulty::Hard => 53.0,
        }
    }

    /// How long the grant takes to decay to zero.
    pub fn decay_window(&self) -> Duration {
        match self {
            Difficulty::Easy => Duration::hours(4),
            Difficulty::Medium => Duration::hours(8),
            Difficulty::Hard => Duration::hours(12),
        }
    }
}

/// Remaining contribution of one completion at `now`.
///
/// Completions stamped in the future count at their full grant.
pub fn contribution(completion: &FlowCompletion, now: DateTime<Utc>) -> f64 {
    let window = completion.difficulty.decay_window();
    let elapsed = (now - completion.completed_at).max(Duration::zero());
    if elapsed >= window {
        return 0.0;
    }
    let remaining = 1.0 - elapsed.num_milliseconds() as f64 / window.num_milliseconds() as f64;
    completion.difficulty.grant_percent() * remaining
}

/// Current flow percentage in `[0, 100]`.
pub fn flow_percent(completions: &[FlowCompletion], now: DateTime<Utc>) -> f64 {
    completions
        .iter()
        .map(|c| contribution(c, now))
        .sum::<f64>()
        .clamp(0.0, MAX_FLOW)
}

/// Whether a completion still contributes to the meter.
pub fn is_active(completion: &FlowCompletion, now: DateTime<Utc>) -> bool {
    now - completion.completed_at < completion.difficulty.decay_window()
}

/// Drop completions past the retention window. Returns how many were removed.
///
/// Storage hygiene only: anything this old already contributes zero.
pub fn prune_completions(
    completions: &mut Vec<FlowCompletion>,
    now: DateTime<Utc>,
    retention: Duration,
) -> usize {
    let before = completions.len();
    completions.retain(|c| now - c.completed_at < retention);
    before - completions.len()
}

/// Snapshot of the meter for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub percent: f64,
    pub active_completions: usize,
    /// When the meter reaches zero if nothing else is completed.
    pub empty_at: Option<DateTime<Utc>>,
    pub at: DateTime<Utc>,
}

impl FlowReport {
    pub fn compute(completions: &[FlowCompletion], now: DateTime<Utc>) -> Self {
        let active: Vec<&FlowCompletion> =
            completions.iter().filter(|c| is_active(c, now)).collect();
        let empty_at = active
            .iter()
            .map(|c| c.completed_at + c.difficulty.decay_window())
            .max();
        Self {
            percent: flow_percent(completions, now),
            active_completions: active.len(),
            empty_at,
            at: now,
        }
    }
}
