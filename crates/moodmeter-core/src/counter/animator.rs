//! Usage counter animation.
//!
//! The animator is a wall-clock-based simulation with no internal thread:
//! the caller invokes `tick()` once per frame and feeds fresh upstream totals
//! through the shared [`CounterTargets`] whenever a poll returns.
//!
//! ## Phases
//!
//! ```text
//! CatchUp --(gap <= normal zone)--> Normal <--> Paused
//!    ^                                 |
//!    +------(poll bumps the gap)-------+
//! ```
//!
//! - `CatchUp`: the token gap shrinks exponentially with time constant
//!   `catch_up_secs`; pauses and speed caps do not apply. Lines follow tokens
//!   at the observed tokens-per-line ratio.
//! - `Normal`: the token rate is `gap / ramp_secs`, capped, times a randomly
//!   re-rolled multiplier. Lines are paid for from the cost sequence.
//! - `Paused`: a short random stop inside the normal zone. Pauses are only
//!   scheduled once the counter has come out of `CatchUp` at least once.
//!
//! Leaving `CatchUp` re-anchors the lines counter so the cost-sequence
//! pacing has exactly the lines left that the remaining token gap buys.
//!
//! The value shown for each axis is `max(raw, floor)`, where `floor` is a
//! monotonic watermark seeded from the persisted value, so nothing shown ever
//! moves backward.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::CounterConfig;
use super::pacing::LinePacer;
use super::targets::CounterTargets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CatchUp,
    Normal,
    Paused,
}

/// Persisted watermark of both counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterFloor {
    pub tokens: u64,
    pub lines: u64,
}

/// What the display shows after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub tokens: u64,
    pub lines: u64,
    pub target_tokens: u64,
    pub target_lines: u64,
    pub phase: Phase,
    pub speed_multiplier: f64,
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    raw: f64,
    floor: f64,
}

impl Axis {
    fn starting_at(value: u64) -> Self {
        Self {
            raw: value as f64,
            floor: value as f64,
        }
    }

    fn shown(&self) -> f64 {
        self.raw.max(self.floor)
    }

    fn settle(&mut self) {
        if self.raw > self.floor {
            self.floor = self.raw;
        }
    }
}

/// Target-seeking animated token/lines counter.
pub struct CounterAnimator {
    config: CounterConfig,
    targets: CounterTargets,
    tokens: Axis,
    lines: Axis,
    pacer: LinePacer,
    rng: Mcg128Xsl64,
    phase: Phase,
    /// Seconds of animation time since creation.
    clock: f64,
    last_tick: Option<Instant>,
    multiplier: f64,
    next_multiplier_at: f64,
    /// Set by the first `CatchUp -> Normal` transition.
    pauses_armed: bool,
    next_pause_at: Option<f64>,
    pause_until: f64,
    last_persist_at: f64,
    last_persisted: CounterFloor,
}

impl CounterAnimator {
    /// Create an animator resuming from a persisted floor.
    ///
    /// The targets are raised to the floor so the shown value never exceeds
    /// the target.
    pub fn new(config: CounterConfig, targets: CounterTargets, floor: Option<CounterFloor>) -> Self {
        let floor = floor.unwrap_or_default();
        targets.raise(floor.tokens, floor.lines);
        let rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let pacer = LinePacer::new(config.cost_sequence.clone(), config.cost_unit_tokens);
        Self {
            config,
            targets,
            tokens: Axis::starting_at(floor.tokens),
            lines: Axis::starting_at(floor.lines),
            pacer,
            rng,
            phase: Phase::Normal,
            clock: 0.0,
            last_tick: None,
            multiplier: 1.0,
            next_multiplier_at: 0.0,
            pauses_armed: false,
            next_pause_at: None,
            pause_until: 0.0,
            last_persist_at: 0.0,
            last_persisted: floor,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn targets(&self) -> &CounterTargets {
        &self.targets
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            tokens: self.tokens.shown() as u64,
            lines: self.lines.shown() as u64,
            target_tokens: self.targets.tokens(),
            target_lines: self.targets.lines(),
            phase: self.phase,
            speed_multiplier: self.multiplier,
        }
    }

    /// Current in-memory watermark, without the persist lag.
    pub fn floor(&self) -> CounterFloor {
        CounterFloor {
            tokens: self.tokens.floor as u64,
            lines: self.lines.floor as u64,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Advance by the wall-clock time since the previous tick.
    pub fn tick(&mut self, now: Instant) -> CounterSnapshot {
        let dt = match self.last_tick {
            Some(prev) => now.saturating_duration_since(prev),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        self.tick_by(dt)
    }

    /// Advance by an explicit frame duration.
    pub fn tick_by(&mut self, dt: Duration) -> CounterSnapshot {
        let dt = dt.as_secs_f64().min(self.config.max_tick_secs);
        self.clock += dt;
        self.advance(dt);
        self.snapshot()
    }

    /// Watermark to persist, if the persist interval has elapsed and it
    /// moved since the last persist.
    ///
    /// The persisted value trails the shown value by a fixed lag so the next
    /// session has headroom to animate, but never drops below what was
    /// persisted before.
    pub fn persist_due(&mut self) -> Option<CounterFloor> {
        if self.clock - self.last_persist_at < self.config.persist_interval_secs {
            return None;
        }
        self.last_persist_at = self.clock;
        let floor = self.lagged_floor();
        if floor == self.last_persisted {
            return None;
        }
        self.last_persisted = floor;
        Some(floor)
    }

    /// Watermark to persist on teardown, ignoring the interval.
    pub fn persist_now(&mut self) -> CounterFloor {
        self.last_persist_at = self.clock;
        self.last_persisted = self.lagged_floor();
        self.last_persisted
    }

    fn lagged_floor(&self) -> CounterFloor {
        let floor = self.floor();
        CounterFloor {
            tokens: floor
                .tokens
                .saturating_sub(self.config.token_persist_lag)
                .max(self.last_persisted.tokens),
            lines: floor
                .lines
                .saturating_sub(self.config.line_persist_lag)
                .max(self.last_persisted.lines),
        }
    }

    fn advance(&mut self, dt: f64) {
        let target_tokens = self.targets.tokens() as f64;
        let target_lines = self.targets.lines() as f64;
        let gap = (target_tokens - self.tokens.raw).max(0.0);

        self.reroll_multiplier_if_due();

        let previous = self.phase;
        let phase = if gap > self.config.normal_zone_tokens {
            Phase::CatchUp
        } else {
            if previous == Phase::CatchUp {
                self.reanchor_lines(target_tokens, target_lines);
                self.pauses_armed = true;
                self.next_pause_at = None;
                self.pause_until = self.clock;
            }
            self.pause_phase()
        };
        if phase != previous {
            debug!(?previous, ?phase, gap, "counter phase change");
        }
        self.phase = phase;

        let step = match phase {
            Phase::CatchUp => gap * (1.0 - (-dt / self.config.catch_up_secs).exp()),
            Phase::Normal => {
                let base = (gap / self.config.ramp_secs).min(self.config.max_tokens_per_sec);
                (base * self.multiplier * dt).min(gap)
            }
            Phase::Paused => 0.0,
        };
        self.tokens.raw += step;

        let line_room = (target_lines - self.lines.raw).max(0.0);
        match phase {
            Phase::CatchUp => {
                let ratio = self
                    .targets
                    .tokens_per_line()
                    .unwrap_or_else(|| self.config.visual_tokens_per_line());
                self.lines.raw += (step / ratio).min(line_room);
            }
            Phase::Normal => {
                let paid = self.pacer.spend(step, line_room.floor() as u64);
                self.lines.raw += paid as f64;
            }
            Phase::Paused => {}
        }

        self.tokens.settle();
        self.lines.settle();
    }

    /// Decide between `Normal` and `Paused`, scheduling pauses as needed.
    fn pause_phase(&mut self) -> Phase {
        if !self.pauses_armed {
            return Phase::Normal;
        }
        let (interval_lo, interval_hi) = self.config.pause_interval_secs;
        let next_pause = match self.next_pause_at {
            Some(at) => at,
            None => {
                let at = self.clock + self.rng.gen_range(interval_lo..=interval_hi);
                self.next_pause_at = Some(at);
                at
            }
        };
        if self.clock < self.pause_until {
            return Phase::Paused;
        }
        if self.clock >= next_pause {
            let (lo, hi) = self.config.pause_duration_secs;
            self.pause_until = self.clock + self.rng.gen_range(lo..=hi);
            self.next_pause_at =
                Some(self.pause_until + self.rng.gen_range(interval_lo..=interval_hi));
            return Phase::Paused;
        }
        Phase::Normal
    }

    fn reroll_multiplier_if_due(&mut self) {
        if self.clock < self.next_multiplier_at {
            return;
        }
        let (lo, hi) = self.config.speed_multiplier;
        let (every_lo, every_hi) = self.config.multiplier_interval_secs;
        self.multiplier = self.rng.gen_range(lo..=hi);
        self.next_multiplier_at = self.clock + self.rng.gen_range(every_lo..=every_hi);
    }

    /// Pull the raw lines value back to what the remaining token gap can pay
    /// for at the visual cost rate. The shown value holds at the floor while
    /// raw catches up again.
    fn reanchor_lines(&mut self, target_tokens: f64, target_lines: f64) {
        let remaining_tokens = (target_tokens - self.tokens.raw).max(0.0);
        let lines_needed = remaining_tokens / self.config.visual_tokens_per_line();
        let anchor = (target_lines - lines_needed).max(0.0);
        if self.lines.raw > anchor {
            debug!(
                raw = self.lines.raw,
                anchor, "lines counter raced ahead, re-anchoring"
            );
            self.lines.raw = anchor;
        }
        self.pacer.reset_credit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::UsageTotals;
    use chrono::Utc;
    use proptest::prelude::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn config() -> CounterConfig {
        CounterConfig {
            token_buffer: 0,
            line_buffer: 0,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn totals(tokens: u64, lines: u64) -> UsageTotals {
        UsageTotals {
            tokens,
            lines_of_code: lines,
            fetched_at: Utc::now(),
        }
    }

    fn run_for(animator: &mut CounterAnimator, secs: f64) -> CounterSnapshot {
        let frames = (secs / FRAME.as_secs_f64()).ceil() as usize;
        let mut snap = animator.snapshot();
        for _ in 0..frames {
            snap = animator.tick_by(FRAME);
        }
        snap
    }

    #[test]
    fn large_gap_starts_in_catch_up_and_reaches_normal_zone() {
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(10_500_000, 10_500), 0, 0);
        let mut animator = CounterAnimator::new(config(), targets, None);

        let snap = run_for(&mut animator, 5.0);
        assert_eq!(snap.phase, Phase::CatchUp);

        // 3s time constant: gap 10.5M reaches 500k after 3 * ln(21) ≈ 9.1s
        let snap = run_for(&mut animator, 5.0);
        assert_ne!(snap.phase, Phase::CatchUp);
        assert!(snap.target_tokens - snap.tokens <= 500_000);
    }

    #[test]
    fn catch_up_moves_lines_at_observed_ratio() {
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(20_000_000, 20_000), 0, 0);
        let mut animator = CounterAnimator::new(config(), targets, None);
        let snap = run_for(&mut animator, 2.0);
        assert_eq!(snap.phase, Phase::CatchUp);
        let expected_lines = snap.tokens as f64 / 1_000.0;
        assert!((snap.lines as f64 - expected_lines).abs() <= 1.0);
    }

    #[test]
    fn normal_zone_rate_is_capped() {
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(400_000, 400), 0, 0);
        let mut animator = CounterAnimator::new(config(), targets, None);
        let snap = run_for(&mut animator, 1.0);
        assert_ne!(snap.phase, Phase::CatchUp);
        let cfg = config();
        let max_step = cfg.max_tokens_per_sec * cfg.speed_multiplier.1 * 1.1;
        assert!((snap.tokens as f64) <= max_step);
    }

    #[test]
    fn normal_zone_never_closes_gap_quickly() {
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(300_000, 300), 0, 0);
        let mut animator = CounterAnimator::new(config(), targets, None);
        let snap = run_for(&mut animator, 5.0);
        assert!(snap.tokens > 0);
        assert!(snap.tokens < snap.target_tokens);
    }

    fn run_until_normal_zone(animator: &mut CounterAnimator) {
        for _ in 0..2_000 {
            if animator.tick_by(FRAME).phase != Phase::CatchUp {
                return;
            }
        }
        panic!("counter never left catch-up");
    }

    #[test]
    fn no_pauses_before_first_catch_up() {
        let cfg = CounterConfig {
            pause_interval_secs: (0.1, 0.1),
            pause_duration_secs: (5.0, 5.0),
            ..config()
        };
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(400_000, 400), 0, 0);
        let mut animator = CounterAnimator::new(cfg, targets.clone(), None);

        let mut last = animator.snapshot();
        for i in 0..(30.0 / FRAME.as_secs_f64()) as usize {
            if i % 100 == 0 {
                targets.raise(last.target_tokens + 3_000, last.target_lines + 3);
            }
            let snap = animator.tick_by(FRAME);
            assert_eq!(snap.phase, Phase::Normal);
            assert!(snap.tokens >= last.tokens);
            last = snap;
        }
        assert!(last.tokens > 0);
    }

    #[test]
    fn pauses_hold_the_counter() {
        let cfg = CounterConfig {
            pause_interval_secs: (1.0, 1.0),
            pause_duration_secs: (2.0, 2.0),
            ..config()
        };
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(600_000, 600), 0, 0);
        let mut animator = CounterAnimator::new(cfg, targets, None);
        run_until_normal_zone(&mut animator);

        let before = run_for(&mut animator, 1.2);
        assert_eq!(before.phase, Phase::Paused);
        let during = run_for(&mut animator, 1.0);
        assert_eq!(during.phase, Phase::Paused);
        assert_eq!(during.tokens, before.tokens);

        let after = run_for(&mut animator, 1.0);
        assert_eq!(after.phase, Phase::Normal);
        assert!(after.tokens > during.tokens);
    }

    #[test]
    fn catch_up_ignores_pause_schedule() {
        let cfg = CounterConfig {
            pause_interval_secs: (0.1, 0.1),
            pause_duration_secs: (5.0, 5.0),
            ..config()
        };
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(50_000_000, 0), 0, 0);
        let mut animator = CounterAnimator::new(cfg, targets, None);
        let first = run_for(&mut animator, 0.5);
        let second = run_for(&mut animator, 0.5);
        assert_eq!(second.phase, Phase::CatchUp);
        assert!(second.tokens > first.tokens);
    }

    #[test]
    fn normal_zone_lines_follow_cost_sequence() {
        let cfg = CounterConfig {
            cost_sequence: vec![1],
            cost_unit_tokens: 1_000.0,
            pause_interval_secs: (1_000.0, 1_000.0),
            ..config()
        };
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(400_000, 1_000), 0, 0);
        let mut animator = CounterAnimator::new(cfg, targets, None);
        let snap = run_for(&mut animator, 3.0);
        assert_eq!(snap.phase, Phase::Normal);
        assert!(snap.lines > 0);
        assert!((snap.tokens / 1_000).abs_diff(snap.lines) <= 1);
    }

    #[test]
    fn transition_reanchors_lines_without_visible_regression() {
        // lines resume almost at their target while tokens start from zero,
        // so the lines axis finishes catch-up far ahead of the tokens axis
        let floor = CounterFloor {
            tokens: 0,
            lines: 104_900,
        };
        let targets = CounterTargets::new();
        let mut animator = CounterAnimator::new(config(), targets.clone(), Some(floor));
        targets.apply_poll(&totals(10_500_000, 105_000), 0, 0);

        let mut last = animator.snapshot();
        let mut saw_transition = false;
        for _ in 0..(12.0 / FRAME.as_secs_f64()) as usize {
            let snap = animator.tick_by(FRAME);
            if last.phase == Phase::CatchUp && snap.phase != Phase::CatchUp {
                saw_transition = true;
                let remaining = (snap.target_tokens - snap.tokens) as f64;
                let anchor = snap.target_lines as f64 - remaining / 900.0;
                assert!(animator.lines.raw <= anchor.ceil());
            }
            assert!(snap.lines >= last.lines);
            last = snap;
        }
        assert!(saw_transition);
    }

    #[test]
    fn lower_poll_does_not_lower_target() {
        let targets = CounterTargets::new();
        let mut animator = CounterAnimator::new(config(), targets.clone(), None);
        targets.apply_poll(&totals(2_000_000, 2_000), 0, 0);
        run_for(&mut animator, 1.0);
        targets.apply_poll(&totals(1_000_000, 1_000), 0, 0);
        let snap = run_for(&mut animator, 1.0);
        assert_eq!(snap.target_tokens, 2_000_000);
        assert_eq!(snap.target_lines, 2_000);
    }

    #[test]
    fn restart_resumes_at_persisted_floor() {
        let floor = CounterFloor {
            tokens: 5_000_000,
            lines: 4_000,
        };
        let targets = CounterTargets::new();
        let mut animator = CounterAnimator::new(config(), targets.clone(), Some(floor));
        let snap = animator.tick_by(FRAME);
        assert!(snap.tokens >= floor.tokens);
        assert!(snap.lines >= floor.lines);
        assert!(snap.target_tokens >= floor.tokens);

        // an upstream total below the floor changes nothing visible
        targets.apply_poll(&totals(1_000, 1), 0, 0);
        let snap = run_for(&mut animator, 2.0);
        assert_eq!(snap.tokens, floor.tokens);
    }

    #[test]
    fn persist_respects_interval_and_lag() {
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(2_000_000, 2_000), 0, 0);
        let mut animator = CounterAnimator::new(config(), targets, None);
        run_for(&mut animator, 5.0);
        assert_eq!(animator.persist_due(), None);

        run_for(&mut animator, 6.0);
        let persisted = animator.persist_due().expect("interval elapsed");
        let floor = animator.floor();
        assert_eq!(persisted.tokens, floor.tokens.saturating_sub(150_000));
        assert_eq!(animator.persist_due(), None);
    }

    #[test]
    fn persisted_floor_never_drops_below_loaded_value() {
        let floor = CounterFloor {
            tokens: 1_000_000,
            lines: 1_000,
        };
        let mut animator = CounterAnimator::new(config(), CounterTargets::new(), Some(floor));
        run_for(&mut animator, 1.0);
        assert_eq!(animator.persist_now(), floor);
    }

    #[test]
    fn long_frames_are_clamped() {
        let targets = CounterTargets::new();
        targets.apply_poll(&totals(300_000, 300), 0, 0);
        let mut animator = CounterAnimator::new(config(), targets, None);
        let snap = animator.tick_by(Duration::from_secs(3_600));
        let cfg = config();
        assert!(snap.tokens as f64 <= cfg.max_tokens_per_sec * cfg.speed_multiplier.1);
    }

    proptest! {
        #[test]
        fn shown_values_are_monotonic_and_bounded(
            ops in proptest::collection::vec(
                (1u64..500, proptest::option::of((0u64..50_000_000, 0u64..50_000))),
                1..200,
            )
        ) {
            let targets = CounterTargets::new();
            let mut animator = CounterAnimator::new(config(), targets.clone(), None);
            let mut last = animator.snapshot();
            for (dt_ms, poll) in ops {
                if let Some((tokens, lines)) = poll {
                    targets.apply_poll(&totals(tokens, lines), 0, 0);
                }
                let snap = animator.tick_by(Duration::from_millis(dt_ms));
                prop_assert!(snap.tokens >= last.tokens);
                prop_assert!(snap.lines >= last.lines);
                prop_assert!(snap.tokens <= snap.target_tokens);
                prop_assert!(snap.lines <= snap.target_lines);
                prop_assert!(snap.target_tokens >= last.target_tokens);
                last = snap;
            }
        }
    }
}
