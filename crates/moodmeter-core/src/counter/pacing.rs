//! Cost-sequence pacing of the lines counter.
//!
//! In the normal zone each line has a price in tokens taken from a repeating
//! sequence. Token advancement is banked as credit; a line appears once its
//! price is paid, and zero-priced lines appear immediately. The result is
//! bursty per-line timing instead of a smooth ramp.

#[derive(Debug, Clone)]
pub struct LinePacer {
    sequence: Vec<u32>,
    unit_tokens: f64,
    index: usize,
    credit: f64,
}

impl LinePacer {
    pub fn new(sequence: Vec<u32>, unit_tokens: f64) -> Self {
        Self {
            sequence,
            unit_tokens,
            index: 0,
            credit: 0.0,
        }
    }

    fn current_cost(&self) -> f64 {
        self.sequence
            .get(self.index)
            .map(|&c| f64::from(c) * self.unit_tokens)
            .unwrap_or(0.0)
    }

    fn advance_index(&mut self) {
        if !self.sequence.is_empty() {
            self.index = (self.index + 1) % self.sequence.len();
        }
    }

    /// Bank `tokens` of advancement and return how many lines were paid
    /// for, never more than `max_lines`.
    pub fn spend(&mut self, tokens: f64, max_lines: u64) -> u64 {
        self.credit += tokens.max(0.0);
        let mut lines = 0;
        while lines < max_lines {
            let cost = self.current_cost();
            if self.credit < cost {
                break;
            }
            self.credit -= cost;
            self.advance_index();
            lines += 1;
        }
        if lines == max_lines {
            // Capped by the target: do not bank a burst for the next bump.
            self.credit = self.credit.min(self.current_cost());
        }
        lines
    }

    /// Forget banked credit.
    pub fn reset_credit(&mut self) {
        self.credit = 0.0;
    }

    pub fn credit(&self) -> f64 {
        self.credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_wait_for_their_cost() {
        let mut pacer = LinePacer::new(vec![10, 20], 1.0);
        assert_eq!(pacer.spend(5.0, u64::MAX), 0);
        assert_eq!(pacer.spend(5.0, u64::MAX), 1);
        assert_eq!(pacer.spend(19.0, u64::MAX), 0);
        assert_eq!(pacer.spend(1.0, u64::MAX), 1);
    }

    #[test]
    fn zero_cost_lines_are_free() {
        let mut pacer = LinePacer::new(vec![0, 0, 10], 1.0);
        assert_eq!(pacer.spend(0.0, u64::MAX), 2);
        assert_eq!(pacer.spend(10.0, u64::MAX), 3);
    }

    #[test]
    fn cost_unit_scales_prices() {
        let mut pacer = LinePacer::new(vec![3], 100.0);
        assert_eq!(pacer.spend(299.0, u64::MAX), 0);
        assert_eq!(pacer.spend(1.0, u64::MAX), 1);
    }

    #[test]
    fn cap_limits_lines_and_drops_excess_credit() {
        let mut pacer = LinePacer::new(vec![1], 1.0);
        assert_eq!(pacer.spend(1_000.0, 3), 3);
        assert!(pacer.credit() <= 1.0);
    }

    #[test]
    fn all_zero_sequence_terminates_at_cap() {
        let mut pacer = LinePacer::new(vec![0], 1.0);
        assert_eq!(pacer.spend(0.0, 5), 5);
        assert_eq!(pacer.spend(0.0, 0), 0);
    }
}
