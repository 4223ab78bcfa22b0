use std::collections::VecDeque;

use crate::tutor::config::QuizParams;
use crate::tutor::types::DifficultyTier;

/// Tier after looking at the most recent `window` pass flags.
///
/// With `escalate` or more passes in the window the tier steps up; with
/// none it steps down. Shorter histories leave the tier alone.
pub fn next_tier(
    current: DifficultyTier,
    flags: &[bool],
    window: usize,
    escalate: usize,
) -> DifficultyTier {
    if window == 0 || flags.len() < window {
        return current;
    }
    let passes = flags[flags.len() - window..].iter().filter(|&&p| p).count();
    if passes >= escalate {
        current.harder()
    } else if passes == 0 {
        current.easier()
    } else {
        current
    }
}

#[derive(Debug, Clone)]
pub struct DifficultyAdaptor {
    current: DifficultyTier,
    flags: VecDeque<bool>,
    pass_threshold: f64,
    window: usize,
    escalate: usize,
}

impl DifficultyAdaptor {
    pub fn new(params: &QuizParams) -> Self {
        Self {
            current: params.initial_tier,
            flags: VecDeque::with_capacity(params.tier_window),
            pass_threshold: params.pass_threshold,
            window: params.tier_window,
            escalate: params.escalate_passes,
        }
    }

    pub fn current(&self) -> DifficultyTier {
        self.current
    }

    /// Records a pass when `accuracy` beats the threshold and returns the
    /// resulting tier.
    pub fn observe(&mut self, accuracy: f64) -> DifficultyTier {
        self.flags.push_back(accuracy > self.pass_threshold);
        while self.flags.len() > self.window {
            self.flags.pop_front();
        }

        let flags: Vec<bool> = self.flags.iter().copied().collect();
        let next = next_tier(self.current, &flags, self.window, self.escalate);
        if next != self.current {
            tracing::debug!(from = self.current.as_str(), to = next.as_str(), "difficulty tier changed");
        }
        self.current = next;
        next
    }

    pub fn reset(&mut self, initial: DifficultyTier) {
        self.current = initial;
        self.flags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_passes_escalate_once() {
        assert_eq!(
            next_tier(DifficultyTier::Medium, &[true, true, true], 3, 2),
            DifficultyTier::Hard
        );
        assert_eq!(
            next_tier(DifficultyTier::Hard, &[true, true, true], 3, 2),
            DifficultyTier::Hard
        );
    }

    #[test]
    fn three_fails_de_escalate_once() {
        assert_eq!(
            next_tier(DifficultyTier::Medium, &[false, false, false], 3, 2),
            DifficultyTier::Easy
        );
        assert_eq!(
            next_tier(DifficultyTier::Easy, &[false, false, false], 3, 2),
            DifficultyTier::Easy
        );
    }

    #[test]
    fn mixed_or_short_window_holds() {
        assert_eq!(
            next_tier(DifficultyTier::Medium, &[true, false, false], 3, 2),
            DifficultyTier::Medium
        );
        assert_eq!(
            next_tier(DifficultyTier::Medium, &[true, true], 3, 2),
            DifficultyTier::Medium
        );
        // only the last three count
        assert_eq!(
            next_tier(DifficultyTier::Medium, &[true, true, false, false, false], 3, 2),
            DifficultyTier::Easy
        );
    }

    #[test]
    fn adaptor_keeps_stepping_while_window_stays_hot() {
        let mut adaptor = DifficultyAdaptor::new(&QuizParams::default());
        assert_eq!(adaptor.observe(1.0), DifficultyTier::Medium);
        assert_eq!(adaptor.observe(0.7), DifficultyTier::Medium);
        assert_eq!(adaptor.observe(0.1), DifficultyTier::Hard);
        // 0.65 is not a pass; window is now [pass, fail, fail]
        assert_eq!(adaptor.observe(0.65), DifficultyTier::Hard);
        assert_eq!(adaptor.observe(0.0), DifficultyTier::Medium);
        adaptor.reset(DifficultyTier::Easy);
        assert_eq!(adaptor.current(), DifficultyTier::Easy);
        assert_eq!(adaptor.observe(0.0), DifficultyTier::Easy);
    }
}
