use serde::{Deserialize, Serialize};

/// Tunables of the usage counter animation.
///
/// Token quantities are in raw token units; line quantities in lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Gap above which the counter is in the catch-up zone.
    #[serde(default = "default_normal_zone_tokens")]
    pub normal_zone_tokens: f64,
    /// Time constant of the catch-up approach. The gap shrinks by a factor
    /// of e every this many seconds, so even a gap a thousand times the
    /// normal-zone threshold is crossed in about seven time constants.
    #[serde(default = "default_catch_up_secs")]
    pub catch_up_secs: f64,
    /// Seconds the remaining normal-zone gap would take to close at the
    /// current steady rate.
    #[serde(default = "default_ramp_secs")]
    pub ramp_secs: f64,
    /// Absolute cap on the normal-zone base rate (tokens/second).
    #[serde(default = "default_max_tokens_per_sec")]
    pub max_tokens_per_sec: f64,
    #[serde(default = "default_multiplier_range")]
    pub speed_multiplier: (f64, f64),
    /// Seconds between speed multiplier re-rolls.
    #[serde(default = "default_multiplier_interval")]
    pub multiplier_interval_secs: (f64, f64),
    /// Seconds between pauses once in the normal zone.
    #[serde(default = "default_pause_interval")]
    pub pause_interval_secs: (f64, f64),
    #[serde(default = "default_pause_duration")]
    pub pause_duration_secs: (f64, f64),
    /// Subtracted from each fresh upstream total before it becomes a target.
    #[serde(default = "default_token_buffer")]
    pub token_buffer: u64,
    #[serde(default = "default_line_buffer")]
    pub line_buffer: u64,
    /// Minimum seconds between floor persists.
    #[serde(default = "default_persist_interval_secs")]
    pub persist_interval_secs: f64,
    /// Subtracted from the floor before persisting.
    #[serde(default = "default_token_persist_lag")]
    pub token_persist_lag: u64,
    #[serde(default = "default_line_persist_lag")]
    pub line_persist_lag: u64,
    /// Repeating per-line cost, in units of `cost_unit_tokens`.
    #[serde(default = "default_cost_sequence")]
    pub cost_sequence: Vec<u32>,
    #[serde(default = "default_cost_unit_tokens")]
    pub cost_unit_tokens: f64,
    /// Longest frame gap honoured in one tick (seconds).
    #[serde(default = "default_max_tick_secs")]
    pub max_tick_secs: f64,
    /// Random seed for reproducibility (None = random)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_normal_zone_tokens() -> f64 {
    500_000.0
}
fn default_catch_up_secs() -> f64 {
    3.0
}
fn default_ramp_secs() -> f64 {
    35.0
}
fn default_max_tokens_per_sec() -> f64 {
    9_000.0
}
fn default_multiplier_range() -> (f64, f64) {
    (0.3, 3.0)
}
fn default_multiplier_interval() -> (f64, f64) {
    (5.0, 20.0)
}
fn default_pause_interval() -> (f64, f64) {
    (30.0, 300.0)
}
fn default_pause_duration() -> (f64, f64) {
    (0.3, 5.0)
}
fn default_token_buffer() -> u64 {
    250_000
}
fn default_line_buffer() -> u64 {
    250
}
fn default_persist_interval_secs() -> f64 {
    10.0
}
fn default_token_persist_lag() -> u64 {
    150_000
}
fn default_line_persist_lag() -> u64 {
    150
}
fn default_cost_sequence() -> Vec<u32> {
    vec![12, 0, 9, 15, 4, 0, 22, 8, 11, 0, 7, 18, 5, 10, 14, 0, 6, 13, 9, 17]
}
fn default_cost_unit_tokens() -> f64 {
    100.0
}
fn default_max_tick_secs() -> f64 {
    1.0
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            normal_zone_tokens: default_normal_zone_tokens(),
            catch_up_secs: default_catch_up_secs(),
            ramp_secs: default_ramp_secs(),
            max_tokens_per_sec: default_max_tokens_per_sec(),
            speed_multiplier: default_multiplier_range(),
            multiplier_interval_secs: default_multiplier_interval(),
            pause_interval_secs: default_pause_interval(),
            pause_duration_secs: default_pause_duration(),
            token_buffer: default_token_buffer(),
            line_buffer: default_line_buffer(),
            persist_interval_secs: default_persist_interval_secs(),
            token_persist_lag: default_token_persist_lag(),
            line_persist_lag: default_line_persist_lag(),
            cost_sequence: default_cost_sequence(),
            cost_unit_tokens: default_cost_unit_tokens(),
            max_tick_secs: default_max_tick_secs(),
            seed: None,
        }
    }
}

impl CounterConfig {
    /// Check the invariants the animator relies on.
    pub fn validate(&self) -> Result<(), String> {
        fn range(name: &str, (lo, hi): (f64, f64)) -> Result<(), String> {
            if lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi {
                Ok(())
            } else {
                Err(format!("{name} must satisfy 0 < min <= max, got ({lo}, {hi})"))
            }
        }
        if self.normal_zone_tokens <= 0.0 {
            return Err("normal_zone_tokens must be positive".into());
        }
        if self.catch_up_secs <= 0.0 || self.ramp_secs <= 0.0 {
            return Err("catch_up_secs and ramp_secs must be positive".into());
        }
        if self.max_tokens_per_sec <= 0.0 {
            return Err("max_tokens_per_sec must be positive".into());
        }
        range("speed_multiplier", self.speed_multiplier)?;
        range("multiplier_interval_secs", self.multiplier_interval_secs)?;
        range("pause_interval_secs", self.pause_interval_secs)?;
        range("pause_duration_secs", self.pause_duration_secs)?;
        if self.cost_sequence.iter().all(|&c| c == 0) {
            return Err("cost_sequence needs at least one non-zero entry".into());
        }
        if self.cost_unit_tokens <= 0.0 {
            return Err("cost_unit_tokens must be positive".into());
        }
        if self.max_tick_secs <= 0.0 {
            return Err("max_tick_secs must be positive".into());
        }
        Ok(())
    }

    /// Average tokens per line implied by the cost sequence.
    pub fn visual_tokens_per_line(&self) -> f64 {
        let total: u64 = self.cost_sequence.iter().map(|&c| u64::from(c)).sum();
        total as f64 / self.cost_sequence.len().max(1) as f64 * self.cost_unit_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CounterConfig::default().validate().is_ok());
    }

    #[test]
    fn all_zero_cost_sequence_is_rejected() {
        let config = CounterConfig {
            cost_sequence: vec![0, 0],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let config = CounterConfig {
            pause_duration_secs: (5.0, 0.3),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn visual_rate_is_sequence_mean() {
        let config = CounterConfig {
            cost_sequence: vec![10, 0, 20],
            cost_unit_tokens: 2.0,
            ..Default::default()
        };
        assert_eq!(config.visual_tokens_per_line(), 20.0);
    }
}
