use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::records::UsageTotals;

/// Targets shared between the poll task (writer) and the tick loop (reader).
///
/// Every write is a `fetch_max`, which is commutative, so concurrent polls
/// and out-of-order results can never move a target backward.
#[derive(Debug, Clone, Default)]
pub struct CounterTargets {
    tokens: Arc<AtomicU64>,
    lines: Arc<AtomicU64>,
    /// `f64` bits of the latest observed tokens-per-line ratio; 0 = unknown.
    tokens_per_line: Arc<AtomicU64>,
}

impl CounterTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a fresh poll into the targets: `target = max(target, fresh - buffer)`.
    pub fn apply_poll(&self, totals: &UsageTotals, token_buffer: u64, line_buffer: u64) {
        self.raise(
            totals.tokens.saturating_sub(token_buffer),
            totals.lines_of_code.saturating_sub(line_buffer),
        );
        if let Some(ratio) = totals.tokens_per_line() {
            self.tokens_per_line
                .store(ratio.to_bits(), Ordering::Relaxed);
        }
    }

    /// Raise both targets to at least the given values.
    pub fn raise(&self, tokens: u64, lines: u64) {
        self.tokens.fetch_max(tokens, Ordering::Relaxed);
        self.lines.fetch_max(lines, Ordering::Relaxed);
    }

    pub fn tokens(&self) -> u64 {
        self.tokens.load(Ordering::Relaxed)
    }

    pub fn lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn tokens_per_line(&self) -> Option<f64> {
        let ratio = f64::from_bits(self.tokens_per_line.load(Ordering::Relaxed));
        (ratio.is_finite() && ratio > 0.0).then_some(ratio)
    }
}
