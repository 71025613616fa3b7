//! Graph time.
//!
//! Time is counted in integer ticks (1 tick = 1 µs) plus a fractional tick
//! in `[0, 1)`. Block durations are rarely whole numbers of ticks (e.g. one
//! 512-sample block at 44.1 kHz is 11609.977... µs), so the fraction is
//! carried exactly rather than rounded — otherwise `next_time` would drift
//! against the pull clock and blocks would be skipped or doubled.

use core::cmp::Ordering;

/// A point on the graph clock. `Default` is [`Timestamp::ZERO`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Timestamp {
    ticks: i64,
    fraction: f64,
}

impl Timestamp {
    /// Ticks per second (1 tick = 1 µs).
    pub const TICKS_PER_SECOND: i64 = 1_000_000;

    /// The zero time, where every pull sequence starts.
    pub const ZERO: Self = Self {
        ticks: 0,
        fraction: 0.0,
    };

    /// The "never" sentinel: later than every finite time.
    pub const MAX: Self = Self {
        ticks: i64::MAX,
        fraction: 0.0,
    };

    /// Build from whole ticks and a fraction in `[0, 1)`.
    pub fn new(ticks: i64, fraction: f64) -> Self {
        debug_assert!((0.0..1.0).contains(&fraction));
        Self { ticks, fraction }
    }

    /// Build from seconds (loses sub-tick precision of the input).
    pub fn from_seconds(seconds: f64) -> Self {
        let ticks = seconds * Self::TICKS_PER_SECOND as f64;
        let whole = ticks.floor();
        Self {
            ticks: whole as i64,
            fraction: ticks - whole,
        }
    }

    /// Whole-tick part.
    pub fn ticks(self) -> i64 {
        self.ticks
    }

    /// Fractional-tick part in `[0, 1)`.
    pub fn fraction(self) -> f64 {
        self.fraction
    }

    /// This time in seconds.
    pub fn to_seconds(self) -> f64 {
        (self.ticks as f64 + self.fraction) / Self::TICKS_PER_SECOND as f64
    }

    /// True unless this is the [`Timestamp::MAX`] sentinel.
    pub fn is_finite(self) -> bool {
        self.ticks != i64::MAX
    }

    /// This time advanced by a (possibly fractional, possibly negative)
    /// number of ticks, with exact carry into the whole-tick part.
    pub fn offset_ticks(self, ticks: f64) -> Self {
        debug_assert!(ticks.is_finite());
        debug_assert!(self.is_finite());
        let whole = ticks.floor();
        let mut out_ticks = self.ticks + whole as i64;
        let mut fraction = self.fraction + (ticks - whole);
        if fraction >= 1.0 {
            fraction -= 1.0;
            out_ticks += 1;
        }
        Self {
            ticks: out_ticks,
            fraction,
        }
    }

    /// This time advanced by `samples` samples at `sample_rate` Hz.
    pub fn offset_samples(self, samples: usize, sample_rate: f64) -> Self {
        debug_assert!(sample_rate > 0.0);
        self.offset_ticks(samples as f64 * Self::TICKS_PER_SECOND as f64 / sample_rate)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.ticks == other.ticks && self.fraction == other.fraction
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.ticks.cmp(&other.ticks) {
            Ordering::Equal => self.fraction.partial_cmp(&other.fraction),
            ordering => Some(ordering),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_offset_carries() {
        let t = Timestamp::new(0, 0.75).offset_ticks(0.5);
        assert_eq!(t.ticks(), 1);
        assert!((t.fraction() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn negative_offset_borrows() {
        let t = Timestamp::new(10, 0.25).offset_ticks(-0.5);
        assert_eq!(t.ticks(), 9);
        assert!((t.fraction() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn ordering_uses_fraction_on_tick_ties() {
        assert!(Timestamp::new(1, 0.5) > Timestamp::new(1, 0.25));
        assert!(Timestamp::new(2, 0.0) > Timestamp::new(1, 0.999));
        assert!(Timestamp::ZERO >= Timestamp::ZERO);
    }

    #[test]
    fn max_is_later_than_everything_finite() {
        let late = Timestamp::from_seconds(1e9);
        assert!(Timestamp::MAX > late);
        assert!(!Timestamp::MAX.is_finite());
        assert!(late.is_finite());
    }

    #[test]
    fn block_advance_does_not_drift() {
        // 512 samples at 44.1kHz, 1000 blocks: compare against the closed form.
        let mut t = Timestamp::ZERO;
        for _ in 0..1000 {
            t = t.offset_samples(512, 44100.0);
        }
        let expected = 512_000.0 * Timestamp::TICKS_PER_SECOND as f64 / 44100.0;
        let got = t.ticks() as f64 + t.fraction();
        assert!((got - expected).abs() < 1e-3);
    }

    #[test]
    fn seconds_roundtrip() {
        let t = Timestamp::from_seconds(1.5);
        assert!((t.to_seconds() - 1.5).abs() < 1e-9);
        assert_eq!(t.ticks(), 1_500_000);
    }
}
