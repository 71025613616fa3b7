//! Units: ordered channel lists and the multichannel factories.
//!
//! A [`Unit`] is what graph code passes around: one or more [`Channel`]s of
//! a single sample type. Channel counts never have to match across inputs —
//! indexing wraps modulo the unit's own channel count, so a 2-channel
//! signal multiplied by a 3-channel gain expands to 6 distinct pairings
//! under [`create_from_inputs`].

use crate::channel::{Channel, ChannelCore, ChannelNode, OutputHandle};
use crate::inputs::{Input, InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::proxy::ProxyNode;
use crate::sample::Sample;
use crate::time::Timestamp;
use crate::units::constant::ConstantNode;
use crate::units::mul_add::mul_add;
use crate::variable::{BlockSize, Overlap, SampleRate};

/// A non-empty, ordered list of channels. Cloning clones the handles, not
/// the channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit<S: Sample> {
    channels: Vec<Channel<S>>,
}

impl<S: Sample> Unit<S> {
    /// Wrap existing channels. Panics on an empty list.
    pub fn from_channels(channels: Vec<Channel<S>>) -> Self {
        assert!(!channels.is_empty(), "a unit needs at least one channel");
        Self { channels }
    }

    /// A single constant channel holding `value`.
    pub fn constant(value: S) -> Self {
        Self::constants(&[value])
    }

    /// One constant channel per value.
    pub fn constants(values: &[S]) -> Self {
        let channels = values
            .iter()
            .map(|&value| {
                let core = ChannelCore::new(
                    Inputs::new(),
                    BlockSize::one(),
                    SampleRate::no_preference(),
                );
                let channel = Channel::new(core, Box::new(ConstantNode::new(value)));
                channel.init(0);
                channel
            })
            .collect();
        Self::from_channels(channels)
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Channel `index` (panics out of range).
    pub fn channel(&self, index: usize) -> &Channel<S> {
        &self.channels[index]
    }

    /// Channel `index % num_channels`: the wrap-around rule every consumer
    /// uses, so any index is valid.
    pub fn channel_wrapped(&self, index: usize) -> &Channel<S> {
        &self.channels[index % self.channels.len()]
    }

    /// Pull channel `index` (wrapped) at the caller's current time and
    /// return its output. The node sees the wrapped canonical index, so an
    /// out-of-range caller index reads the same input pairing as the
    /// canonical pull it aliases.
    pub fn process(&self, info: &mut ProcessInfo, index: usize) -> OutputHandle<S> {
        let index = index % self.channels.len();
        self.channels[index].process(info, index)
    }

    /// Current value of channel `index` (wrapped), without pulling.
    pub fn value(&self, index: usize) -> S {
        self.channel_wrapped(index).value()
    }

    /// Block size of channel `index` (wrapped).
    pub fn block_size(&self, index: usize) -> BlockSize {
        self.channel_wrapped(index).block_size()
    }

    /// Sample rate of channel `index` (wrapped).
    pub fn sample_rate(&self, index: usize) -> SampleRate {
        self.channel_wrapped(index).sample_rate()
    }

    /// Overlap of channel `index` (wrapped).
    pub fn overlap(&self, index: usize) -> Overlap {
        self.channel_wrapped(index).overlap()
    }

    /// Next produce time of channel `index` (wrapped).
    pub fn next_time(&self, index: usize) -> Timestamp {
        self.channel_wrapped(index).next_time()
    }

    /// True when channel `index` (wrapped) is a constant.
    pub fn is_constant(&self, index: usize) -> bool {
        self.channel_wrapped(index).is_constant()
    }

    /// True for a one-channel constant unit holding exactly `value`; the
    /// mul-add wrapper elides `× 1` and `+ 0` through this.
    pub fn is_single_constant(&self, value: S) -> bool {
        self.channels.len() == 1 && self.channels[0].is_constant() && self.value(0) == value
    }

    /// True when all channels share one block-size variable (identity).
    pub fn channels_have_same_block_size(&self) -> bool {
        let first = self.block_size(0);
        self.channels.iter().all(|c| c.block_size() == first)
    }

    /// True when all channels share one sample-rate variable (identity).
    pub fn channels_have_same_sample_rate(&self) -> bool {
        let first = self.sample_rate(0);
        self.channels.iter().all(|c| c.sample_rate() == first)
    }

    /// True when all channels share one overlap variable (identity).
    pub fn channels_have_same_overlap(&self) -> bool {
        let first = self.overlap(0);
        self.channels.iter().all(|c| c.overlap() == first)
    }

    /// Iterate over the channels.
    pub fn channels(&self) -> impl Iterator<Item = &Channel<S>> {
        self.channels.iter()
    }
}

/// Expand `inputs` to `max_num_channels` channels, one fresh node per
/// channel, without touching `Multiply`/`Add`. Factories that manage those
/// keys themselves (the mul-add unit) call this directly.
pub(crate) fn expand_from_inputs<S, F>(
    inputs: &Inputs<S>,
    preferred_block_size: &BlockSize,
    preferred_sample_rate: &SampleRate,
    mut make_node: F,
) -> Unit<S>
where
    S: Sample,
    F: FnMut() -> Box<dyn ChannelNode<S>>,
{
    let num_channels = inputs.max_num_channels();
    let mut channels = Vec::with_capacity(num_channels);
    for index in 0..num_channels {
        let core = ChannelCore::new(
            inputs.clone(),
            preferred_block_size.clone(),
            preferred_sample_rate.clone(),
        );
        let channel = Channel::new(core, make_node());
        channel.init(index);
        channels.push(channel);
    }
    Unit::from_channels(channels)
}

/// The standard single-output factory: strip `Multiply`/`Add`, expand the
/// remaining inputs to their widest channel count (one node instance per
/// channel, each initialised with its own index), then apply the mul-add
/// wrapper when the stripped inputs were non-trivial.
pub fn create_from_inputs<S, F>(
    mut inputs: Inputs<S>,
    preferred_block_size: BlockSize,
    preferred_sample_rate: SampleRate,
    make_node: F,
) -> Unit<S>
where
    S: Sample,
    F: FnMut() -> Box<dyn ChannelNode<S>>,
{
    let multiply = inputs.remove(InputKey::Multiply);
    let add = inputs.remove(InputKey::Add);
    let unit = expand_from_inputs(
        &inputs,
        &preferred_block_size,
        &preferred_sample_rate,
        make_node,
    );
    apply_mul_add(unit, multiply, add)
}

/// The multi-output factory: one owner channel (index 0) plus one proxy per
/// further output, sharing the owner's slots and geometry. The owner node
/// reports its output count via [`ChannelNode::num_outputs`] and is
/// initialised for index 0 before any proxy exists, so proxies see settled
/// geometry.
pub fn proxies_from_inputs<S>(
    mut inputs: Inputs<S>,
    preferred_block_size: BlockSize,
    preferred_sample_rate: SampleRate,
    owner_node: Box<dyn ChannelNode<S>>,
) -> Unit<S>
where
    S: Sample,
{
    let multiply = inputs.remove(InputKey::Multiply);
    let add = inputs.remove(InputKey::Add);

    let num_outputs = owner_node.num_outputs();
    debug_assert!(num_outputs >= 1);
    debug_assert!(owner_node.is_proxy_owner() || num_outputs == 1);

    let len = preferred_block_size.value();
    let slots: Vec<OutputHandle<S>> = (0..num_outputs).map(|_| OutputHandle::new(len)).collect();
    let core = ChannelCore::with_outputs(
        inputs,
        preferred_block_size,
        preferred_sample_rate,
        slots.clone(),
    );
    let owner = Channel::new(core, owner_node);
    owner.init(0);

    let mut channels = Vec::with_capacity(num_outputs);
    channels.push(owner.clone());
    for (index, slot) in slots.into_iter().enumerate().skip(1) {
        let core = ChannelCore::for_proxy(
            owner.block_size(),
            owner.sample_rate(),
            owner.overlap(),
            slot,
        );
        let proxy = Channel::new(core, Box::new(ProxyNode::new(owner.clone(), index)));
        proxy.init(index);
        channels.push(proxy);
    }
    apply_mul_add(Unit::from_channels(channels), multiply, add)
}

/// Wrap `unit` in a mul-add stage unless both factors are trivial
/// (`× 1`, `+ 0`). Scalar-variable inputs are frozen to constants at their
/// current value.
pub fn apply_mul_add<S: Sample>(
    unit: Unit<S>,
    multiply: Option<Input<S>>,
    add: Option<Input<S>>,
) -> Unit<S> {
    fn to_unit<S: Sample>(input: Input<S>) -> Unit<S> {
        match input {
            Input::Unit(unit) => unit,
            Input::Value(variable) => Unit::constant(S::from_f64(variable.value())),
            Input::Overlap(overlap) => Unit::constant(S::from_f64(overlap.value())),
        }
    }

    let multiply = multiply.map(to_unit).unwrap_or_else(|| Unit::constant(S::ONE));
    let add = add.map(to_unit).unwrap_or_else(|| Unit::constant(S::ZERO));

    if multiply.is_single_constant(S::ONE) && add.is_single_constant(S::ZERO) {
        unit
    } else {
        mul_add(unit, multiply, add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_expose_values_without_pulling() {
        let unit = Unit::constants(&[1.0f32, 2.0, 3.0]);
        assert_eq!(unit.num_channels(), 3);
        assert_eq!(unit.value(0), 1.0);
        assert_eq!(unit.value(2), 3.0);
    }

    #[test]
    fn wrapped_indexing_is_modulo() {
        let unit = Unit::constants(&[10.0f32, 20.0]);
        assert_eq!(unit.value(2), 10.0);
        assert_eq!(unit.value(5), 20.0);
        assert!(unit.channel_wrapped(4) == unit.channel(0));
    }

    #[test]
    fn constant_channels_are_constant() {
        let unit = Unit::constant(4.5f32);
        assert!(unit.is_constant(0));
        assert!(unit.is_single_constant(4.5));
        assert!(!unit.is_single_constant(4.6));
        assert_eq!(unit.block_size(0).value(), 1);
    }

    #[test]
    fn constant_never_reproduces() {
        let unit = Unit::constant(2.0f32);
        let mut info = ProcessInfo::new();
        let out = unit.process(&mut info, 0);
        assert_eq!(out.buffer().as_slice(), &[2.0]);
        assert_eq!(unit.next_time(0), Timestamp::MAX);
    }

    #[test]
    fn apply_mul_add_elides_trivial_factors() {
        let signal = Unit::constant(3.0f32);
        let wrapped = apply_mul_add(
            signal.clone(),
            Some(Input::Unit(Unit::constant(1.0))),
            Some(Input::Unit(Unit::constant(0.0))),
        );
        assert!(wrapped.channel(0) == signal.channel(0));
    }

    #[test]
    fn uniformity_checks_compare_identity() {
        let unit = Unit::constants(&[1.0f32, 2.0]);
        // Each constant negotiated the same shared block-size-one variable.
        assert!(unit.channels_have_same_block_size());
        assert!(unit.channels_have_same_overlap());
    }
}
