//! Sample buffers and the rate-adaptation rule.
//!
//! [`Adapted`] is the one place the engine's buffer-length adaptation is
//! written down. Whenever a node consumes an input whose block length
//! differs from its own output length, the input is read through this
//! iterator: 1:1 when lengths match, broadcast when the input is a single
//! sample, zero-order hold otherwise. There is no interpolation anywhere —
//! adaptation repeats or drops samples, nothing more.

use crate::sample::Sample;

/// A contiguous, resizable sample array.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer<S: Sample> {
    data: Vec<S>,
}

impl<S: Sample> Buffer<S> {
    /// A zero-filled buffer of `len` samples.
    pub fn with_len(len: usize) -> Self {
        Self {
            data: vec![S::ZERO; len],
        }
    }

    /// A buffer copied from a slice.
    pub fn from_slice(samples: &[S]) -> Self {
        Self {
            data: samples.to_vec(),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read access to the samples.
    pub fn as_slice(&self) -> &[S] {
        &self.data
    }

    /// Write access to the samples.
    pub fn as_mut_slice(&mut self) -> &mut [S] {
        &mut self.data
    }

    /// Set every sample to zero.
    pub fn zero(&mut self) {
        self.fill(S::ZERO);
    }

    /// Set every sample to `value`.
    pub fn fill(&mut self, value: S) {
        self.data.fill(value);
    }

    /// Resize to `len` samples. Contents are not preserved; the whole
    /// buffer is zeroed.
    pub fn resize_zeroed(&mut self, len: usize) {
        self.data.clear();
        self.data.resize(len, S::ZERO);
    }

    /// The last sample, or zero when empty. A channel's "current value"
    /// reads this.
    pub fn last_value(&self) -> S {
        self.data.last().copied().unwrap_or(S::ZERO)
    }
}

/// Iterator adapting an input slice to an output length.
///
/// Yields exactly `out_len` samples:
/// - input length == `out_len`: the input verbatim;
/// - input length == 1: that sample repeated;
/// - otherwise zero-order hold — a read position advances by
///   `len_in / len_out` per output sample and indexes by truncation, so an
///   input of `[a, b, c]` adapted to 6 yields `[a, a, b, b, c, c]`.
///
/// The input must not be empty.
#[derive(Clone, Debug)]
pub struct Adapted<'a, S: Sample> {
    input: &'a [S],
    out_len: usize,
    produced: usize,
    position: f64,
    step: f64,
}

/// Adapt `input` to `out_len` samples. See [`Adapted`].
pub fn adapted<S: Sample>(input: &[S], out_len: usize) -> Adapted<'_, S> {
    debug_assert!(!input.is_empty(), "cannot adapt an empty input");
    Adapted {
        input,
        out_len,
        produced: 0,
        position: 0.0,
        step: input.len() as f64 / out_len as f64,
    }
}

impl<S: Sample> Iterator for Adapted<'_, S> {
    type Item = S;

    #[inline]
    fn next(&mut self) -> Option<S> {
        if self.produced == self.out_len {
            return None;
        }
        let sample = if self.input.len() == self.out_len {
            self.input[self.produced]
        } else if self.input.len() == 1 {
            self.input[0]
        } else {
            let sample = self.input[self.position as usize];
            self.position += self.step;
            sample
        };
        self.produced += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.out_len - self.produced;
        (remaining, Some(remaining))
    }
}

impl<S: Sample> ExactSizeIterator for Adapted<'_, S> {}
