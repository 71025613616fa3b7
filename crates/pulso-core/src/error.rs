//! Graph errors.
//!
//! Only data-dependent conditions get a `Result`; violating a construction
//! contract (negotiating a zero block size, an overlap outside `(0, 1]`,
//! an ambiguous overlap resolution) is a bug in the caller and asserts.

use thiserror::Error;

use crate::inputs::InputKey;

/// A recoverable graph-construction error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The input map has no entry under the requested key.
    #[error("missing input {0:?}")]
    MissingInput(InputKey),

    /// The input map has an entry under the key, but of the wrong kind.
    #[error("input {key:?} is not {expected}")]
    WrongInputKind {
        /// The key that was looked up.
        key: InputKey,
        /// What the caller asked for ("a unit", "a scalar", "an overlap").
        expected: &'static str,
    },
}
