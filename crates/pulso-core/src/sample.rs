//! Sample type abstraction.
//!
//! The graph is generic over its sample type. [`Sample`] captures the small
//! arithmetic surface the engine needs so nodes can be written once for both
//! `f32` and `f64`.

use core::fmt::Debug;
use core::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A floating-point audio sample type.
pub trait Sample:
    Copy
    + PartialEq
    + PartialOrd
    + Debug
    + Default
    + Send
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + 'static
{
    /// Additive identity.
    const ZERO: Self;
    /// Multiplicative identity.
    const ONE: Self;
    /// Nominal full-scale amplitude.
    const PEAK: Self;

    /// Convert from an `f64` intermediate value.
    fn from_f64(value: f64) -> Self;

    /// Widen to `f64` for phase/position arithmetic.
    fn to_f64(self) -> f64;
}

impl Sample for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const PEAK: Self = 1.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Sample for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const PEAK: Self = 1.0;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}
