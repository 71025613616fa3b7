//! Typed input maps.
//!
//! Node inputs are a small keyed map rather than positional arguments: a
//! channel asks for "the Frequency input" and gets back a unit, a scalar
//! variable or an overlap variable. The fallible getters surface
//! [`GraphError`] for callers probing a map; node implementations use the
//! asserting accessors because a missing required key is a construction bug,
//! not a runtime condition.

use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::sample::Sample;
use crate::unit::Unit;
use crate::variable::{Overlap, Variable};

/// Keys a node can look up in its input map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputKey {
    /// The primary signal input.
    Signal,
    /// An oscillator frequency in Hz.
    Frequency,
    /// A pan position in `[-1, 1]`.
    Position,
    /// A multiplier applied by the mul-add wrapper.
    Multiply,
    /// An offset applied by the mul-add wrapper.
    Add,
    /// The overlap a channel's own output will carry. Channel construction
    /// adopts this as the channel's overlap variable.
    Overlap,
    /// The overlap an *input* stream carries, consumed as a parameter
    /// (overlap-mix) without changing the channel's own overlap.
    SourceOverlap,
}

/// A single input: a unit, a scalar variable, or an overlap variable.
#[derive(Clone, Debug)]
pub enum Input<S: Sample> {
    /// A multichannel signal.
    Unit(Unit<S>),
    /// A shared scalar parameter.
    Value(Variable<f64>),
    /// A shared overlap amount.
    Overlap(Overlap),
}

/// The input map handed to a channel at construction.
#[derive(Clone, Debug, Default)]
pub struct Inputs<S: Sample> {
    map: BTreeMap<InputKey, Input<S>>,
}

impl<S: Sample> Inputs<S> {
    /// An empty map.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Insert a unit under `key`, replacing any previous entry.
    pub fn put_unit(&mut self, key: InputKey, unit: Unit<S>) {
        self.map.insert(key, Input::Unit(unit));
    }

    /// Insert a scalar variable under `key`.
    pub fn put_value(&mut self, key: InputKey, value: Variable<f64>) {
        self.map.insert(key, Input::Value(value));
    }

    /// Insert an overlap variable under `key`.
    pub fn put_overlap(&mut self, key: InputKey, overlap: Overlap) {
        self.map.insert(key, Input::Overlap(overlap));
    }

    /// Remove and return the entry under `key`.
    pub fn remove(&mut self, key: InputKey) -> Option<Input<S>> {
        self.map.remove(&key)
    }

    /// True when `key` has an entry.
    pub fn contains(&self, key: InputKey) -> bool {
        self.map.contains_key(&key)
    }

    /// The keys present, in `InputKey` order.
    pub fn keys(&self) -> impl Iterator<Item = InputKey> + '_ {
        self.map.keys().copied()
    }

    /// The unit under `key`, if present and a unit.
    pub fn get_unit(&self, key: InputKey) -> Result<&Unit<S>, GraphError> {
        match self.map.get(&key) {
            Some(Input::Unit(unit)) => Ok(unit),
            Some(_) => Err(GraphError::WrongInputKind {
                key,
                expected: "a unit",
            }),
            None => Err(GraphError::MissingInput(key)),
        }
    }

    /// The scalar variable under `key`, if present and a scalar.
    pub fn get_value(&self, key: InputKey) -> Result<&Variable<f64>, GraphError> {
        match self.map.get(&key) {
            Some(Input::Value(value)) => Ok(value),
            Some(_) => Err(GraphError::WrongInputKind {
                key,
                expected: "a scalar",
            }),
            None => Err(GraphError::MissingInput(key)),
        }
    }

    /// The overlap variable under `key`, if present and an overlap.
    pub fn get_overlap(&self, key: InputKey) -> Result<&Overlap, GraphError> {
        match self.map.get(&key) {
            Some(Input::Overlap(overlap)) => Ok(overlap),
            Some(_) => Err(GraphError::WrongInputKind {
                key,
                expected: "an overlap",
            }),
            None => Err(GraphError::MissingInput(key)),
        }
    }

    /// The unit under `key`. Panics when absent: required inputs are a
    /// construction contract.
    pub fn unit(&self, key: InputKey) -> &Unit<S> {
        match self.get_unit(key) {
            Ok(unit) => unit,
            Err(error) => panic!("graph construction bug: {error}"),
        }
    }

    /// The overlap under `key`. Panics when absent.
    pub fn overlap(&self, key: InputKey) -> &Overlap {
        match self.get_overlap(key) {
            Ok(overlap) => overlap,
            Err(error) => panic!("graph construction bug: {error}"),
        }
    }

    /// The widest channel count across all unit inputs, minimum 1.
    ///
    /// Multichannel expansion creates this many channels and wraps narrower
    /// inputs modulo their own channel count.
    pub fn max_num_channels(&self) -> usize {
        self.map
            .values()
            .map(|input| match input {
                Input::Unit(unit) => unit.num_channels(),
                Input::Value(_) | Input::Overlap(_) => 1,
            })
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// A copy of this map narrowed to channel `index`: every unit input is
    /// reduced to its single channel `index % num_channels`.
    pub fn channel(&self, index: usize) -> Self {
        let map = self
            .map
            .iter()
            .map(|(&key, input)| {
                let narrowed = match input {
                    Input::Unit(unit) => {
                        Input::Unit(Unit::from_channels(vec![unit.channel_wrapped(index).clone()]))
                    }
                    other => other.clone(),
                };
                (key, narrowed)
            })
            .collect();
        Self { map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_mismatched_keys_are_errors() {
        let mut inputs = Inputs::<f32>::new();
        inputs.put_value(InputKey::Frequency, Variable::new(440.0));

        assert_eq!(
            inputs.get_unit(InputKey::Signal),
            Err(GraphError::MissingInput(InputKey::Signal))
        );
        assert_eq!(
            inputs.get_unit(InputKey::Frequency),
            Err(GraphError::WrongInputKind {
                key: InputKey::Frequency,
                expected: "a unit",
            })
        );
        assert!(inputs.get_value(InputKey::Frequency).is_ok());
    }

    #[test]
    fn max_num_channels_spans_unit_inputs() {
        let mut inputs = Inputs::<f32>::new();
        assert_eq!(inputs.max_num_channels(), 1);

        inputs.put_unit(InputKey::Signal, Unit::constants(&[0.0, 0.0, 0.0]));
        inputs.put_unit(InputKey::Multiply, Unit::constant(1.0));
        assert_eq!(inputs.max_num_channels(), 3);
    }

    #[test]
    fn channel_narrowing_wraps() {
        let mut inputs = Inputs::<f32>::new();
        inputs.put_unit(InputKey::Signal, Unit::constants(&[1.0, 2.0]));

        let narrowed = inputs.channel(3); // 3 % 2 == 1
        let unit = narrowed.unit(InputKey::Signal);
        assert_eq!(unit.num_channels(), 1);
        assert_eq!(unit.value(0), 2.0);
    }
}
