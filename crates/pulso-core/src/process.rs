//! Per-pull processing context.

use crate::time::Timestamp;

/// The context threaded through a pull cycle.
///
/// Carries the current graph time (which drives channel memoization) and the
/// `should_delete` flag a node raises when its signal has genuinely ended.
/// Nodes that pre-roll a sub-graph at a different cadence (reblock, the
/// overlap converters) temporarily move the timestamp and must restore the
/// caller's value before returning.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProcessInfo {
    timestamp: Timestamp,
    should_delete: bool,
}

impl ProcessInfo {
    /// A context at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context at a given start time.
    pub fn with_timestamp(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            should_delete: false,
        }
    }

    /// Current graph time.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Move to an absolute time.
    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance by a fractional number of ticks.
    pub fn offset_timestamp(&mut self, ticks: f64) {
        self.timestamp = self.timestamp.offset_ticks(ticks);
    }

    /// True when some node signalled end-of-signal during this cycle.
    pub fn should_delete(&self) -> bool {
        self.should_delete
    }

    /// Signal end-of-signal for this cycle.
    pub fn set_should_delete(&mut self) {
        self.should_delete = true;
    }

    /// Clear the end-of-signal flag. Mixers use this as a containment
    /// barrier so one finished voice does not tear down the mix.
    pub fn reset_should_delete(&mut self) {
        self.should_delete = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_set_and_reset() {
        let mut info = ProcessInfo::new();
        assert!(!info.should_delete());
        info.set_should_delete();
        assert!(info.should_delete());
        info.reset_should_delete();
        assert!(!info.should_delete());
    }

    #[test]
    fn timestamp_moves_and_restores() {
        let mut info = ProcessInfo::new();
        let saved = info.timestamp();
        info.offset_timestamp(1234.5);
        assert!(info.timestamp() > saved);
        info.set_timestamp(saved);
        assert_eq!(info.timestamp(), saved);
    }
}
