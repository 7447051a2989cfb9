//! Scanner versus human typing detection on the scan field.
//!
//! Hardware scanners emit characters much faster than a person can type. When the
//! second (or any later) keystroke of a burst arrives more slowly than the typing
//! threshold, the input is considered to be typed by hand.
//!
//! This is a heuristic: a person typing the first two characters faster than the
//! threshold is taken for a scanner. The first keystroke never triggers a switch.

use log::debug;
use std::time::Duration;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ClassifierState {
    Idle,
    Counting { keystrokes: u32, last: Duration },
}

/// The outcome of observing one keystroke.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Verdict {
    /// Nothing suggests human typing (yet).
    Scanning,
    /// The burst is too slow to come from a scanner.
    Typing { interval: Duration },
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScanTypingClassifier {
    threshold: Duration,
    state: ClassifierState,
}

impl ScanTypingClassifier {
    pub fn new(threshold: Duration) -> ScanTypingClassifier {
        ScanTypingClassifier {
            threshold,
            state: ClassifierState::Idle,
        }
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Records a keydown that happened at `at` (time since page load).
    ///
    /// A `Typing` verdict resets the classifier.
    pub fn observe(&mut self, at: Duration) -> Verdict {
        let (keystrokes, last) = match self.state {
            ClassifierState::Idle => (1, None),
            ClassifierState::Counting { keystrokes, last } => (keystrokes + 1, Some(last)),
        };

        if let Some(last) = last {
            let interval = at.saturating_sub(last);
            if keystrokes >= 2 && interval > self.threshold {
                debug!(
                    "observe: keystroke {} came {:?} after the previous one (threshold {:?})",
                    keystrokes, interval, self.threshold
                );
                self.reset();
                return Verdict::Typing { interval };
            }
        }

        self.state = ClassifierState::Counting {
            keystrokes,
            last: at,
        };
        Verdict::Scanning
    }

    /// Forgets the current burst. Called on blur and when the field is emptied.
    pub fn reset(&mut self) {
        self.state = ClassifierState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(x: u64) -> Duration {
        Duration::from_millis(x)
    }

    #[test]
    fn first_keystroke_never_switches() {
        let mut c = ScanTypingClassifier::new(ms(100));
        assert_eq!(c.observe(ms(10_000)), Verdict::Scanning);
        assert_eq!(
            c.state(),
            ClassifierState::Counting {
                keystrokes: 1,
                last: ms(10_000)
            }
        );
    }

    #[test]
    fn slow_second_keystroke_is_typing() {
        let mut c = ScanTypingClassifier::new(ms(100));
        c.observe(ms(0));
        assert_eq!(
            c.observe(ms(250)),
            Verdict::Typing {
                interval: ms(250)
            }
        );
        assert_eq!(c.state(), ClassifierState::Idle);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut c = ScanTypingClassifier::new(ms(100));
        c.observe(ms(0));
        assert_eq!(c.observe(ms(100)), Verdict::Scanning);
    }

    #[test]
    fn fast_burst_then_pause_is_typing() {
        let mut c = ScanTypingClassifier::new(ms(100));
        for t in [0, 15, 30, 45] {
            assert_eq!(c.observe(ms(t)), Verdict::Scanning);
        }
        assert!(matches!(c.observe(ms(400)), Verdict::Typing { .. }));
    }

    #[test]
    fn reset_forgets_previous_burst() {
        let mut c = ScanTypingClassifier::new(ms(100));
        c.observe(ms(0));
        c.reset();
        // Would be a slow second keystroke without the reset.
        assert_eq!(c.observe(ms(500)), Verdict::Scanning);
    }
}
