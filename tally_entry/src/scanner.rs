//! Assembly of scanner keystrokes into a barcode.

use log::{debug, warn};
use std::time::Duration;

use crate::config::Key;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ScanEvent {
    /// The digit was added to the pending scan.
    Buffered,
    /// Enter terminated a scan.
    Committed(String),
    /// The key does not contribute to a scan.
    Ignored,
}

/// Accumulates digits until an Enter terminator.
///
/// A pending scan is dropped when no keystroke arrives within the debounce delay, so that a
/// partial scan never leaks into the next one.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScannerAssembler {
    debounce: Duration,
    buffer: String,
    last_key: Option<Duration>,
}

impl ScannerAssembler {
    pub fn new(debounce: Duration) -> ScannerAssembler {
        ScannerAssembler {
            debounce,
            buffer: String::new(),
            last_key: None,
        }
    }

    pub fn pending(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn push(&mut self, key: Key, at: Duration) -> ScanEvent {
        self.expire(at);
        let event = match key {
            Key::Char(c) if key.is_digit() => {
                self.buffer.push(c);
                ScanEvent::Buffered
            }
            Key::Enter if !self.buffer.is_empty() => {
                let code = std::mem::take(&mut self.buffer);
                debug!("push: committing scan {:?}", code);
                ScanEvent::Committed(code)
            }
            _ => ScanEvent::Ignored,
        };
        self.last_key = Some(at);
        event
    }

    /// Drops the pending scan if the debounce delay elapsed.
    /// Returns true if something was dropped.
    pub fn expire(&mut self, now: Duration) -> bool {
        match self.last_key {
            Some(last) if now.saturating_sub(last) > self.debounce && !self.buffer.is_empty() => {
                warn!(
                    "expire: dropping stale partial scan {:?} ({:?} since last key)",
                    self.buffer,
                    now.saturating_sub(last)
                );
                self.buffer.clear();
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(x: u64) -> Duration {
        Duration::from_millis(x)
    }

    fn feed(a: &mut ScannerAssembler, code: &str, start: u64) -> u64 {
        let mut t = start;
        for c in code.chars() {
            a.push(Key::Char(c), ms(t));
            t += 5;
        }
        t
    }

    #[test]
    fn enter_commits_digits() {
        let mut a = ScannerAssembler::new(ms(200));
        let t = feed(&mut a, "12345678901", 0);
        assert_eq!(
            a.push(Key::Enter, ms(t)),
            ScanEvent::Committed("12345678901".to_string())
        );
        assert_eq!(a.pending(), "");
    }

    #[test]
    fn non_digits_are_ignored() {
        let mut a = ScannerAssembler::new(ms(200));
        assert_eq!(a.push(Key::Char('a'), ms(0)), ScanEvent::Ignored);
        assert_eq!(a.push(Key::Other, ms(1)), ScanEvent::Ignored);
        assert_eq!(a.push(Key::Char('7'), ms(2)), ScanEvent::Buffered);
        assert_eq!(a.pending(), "7");
    }

    #[test]
    fn enter_on_empty_buffer_is_ignored() {
        let mut a = ScannerAssembler::new(ms(200));
        assert_eq!(a.push(Key::Enter, ms(0)), ScanEvent::Ignored);
    }

    #[test]
    fn stale_partial_scan_is_dropped() {
        let mut a = ScannerAssembler::new(ms(200));
        feed(&mut a, "123", 0);
        // A second scan much later must not be prefixed by the first one.
        let t = feed(&mut a, "456", 1_000);
        assert_eq!(
            a.push(Key::Enter, ms(t)),
            ScanEvent::Committed("456".to_string())
        );
    }

    #[test]
    fn expire_reports_drop() {
        let mut a = ScannerAssembler::new(ms(200));
        feed(&mut a, "99", 0);
        assert!(!a.expire(ms(100)));
        assert!(a.expire(ms(500)));
        assert_eq!(a.pending(), "");
    }
}
