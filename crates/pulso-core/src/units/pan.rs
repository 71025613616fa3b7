//! Linear stereo panner — the canonical proxy-owner node.
//!
//! One pass over the input computes both the left and right buffers, so the
//! node owns two output slots: channel 0 (the owner) is left, channel 1 (a
//! proxy) is right. Whichever side a consumer pulls first triggers the one
//! produce for the pair.

use crate::buffer::adapted;
use crate::channel::{ChannelCore, ChannelNode};
use crate::inputs::{InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::unit::{Unit, proxies_from_inputs};
use crate::variable::{BlockSize, SampleRate};

/// Linear pan: position −1 is hard left, +1 hard right, 0 centre
/// (−6 dB per side).
pub struct LinearPanNode;

fn levels<S: Sample>(position: S) -> (S, S) {
    let right = (position.to_f64() + 1.0) * 0.5;
    (S::from_f64(1.0 - right), S::from_f64(right))
}

impl<S: Sample> ChannelNode<S> for LinearPanNode {
    fn name(&self) -> &'static str {
        "LinearPan"
    }

    fn input_keys(&self) -> &'static [InputKey] {
        &[InputKey::Signal, InputKey::Position]
    }

    fn num_outputs(&self) -> usize {
        2
    }

    fn is_proxy_owner(&self) -> bool {
        true
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, index: usize) {
        let (value, position) = {
            let inputs = core.inputs();
            (
                inputs.unit(InputKey::Signal).value(0),
                inputs.unit(InputKey::Position).value(0),
            )
        };
        if index == 0 {
            let (block_size, sample_rate) = {
                let signal = core.inputs().unit(InputKey::Signal);
                (signal.block_size(0), signal.sample_rate(0))
            };
            core.set_block_size(BlockSize::decide(core.block_size(), block_size));
            core.set_sample_rate(SampleRate::decide(core.sample_rate(), sample_rate));
        }
        let (left, right) = levels(position);
        core.init_value_at(index, if index == 0 { value * left } else { value * right });
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, _index: usize) {
        let inputs = core.inputs();
        let signal = inputs.unit(InputKey::Signal).process(info, 0);
        let position = inputs.unit(InputKey::Position).process(info, 0);

        let signal = signal.buffer();
        let position = position.buffer();
        let left_out = core.output_at(0);
        let right_out = core.output_at(1);
        let mut left_out = left_out.buffer_mut();
        let mut right_out = right_out.buffer_mut();

        let left = left_out.as_mut_slice();
        let right = right_out.as_mut_slice();
        let n = left.len();
        debug_assert_eq!(right.len(), n);

        let samples = adapted(signal.as_slice(), n).zip(adapted(position.as_slice(), n));
        for (i, (s, p)) in samples.enumerate() {
            let (l, r) = levels(p);
            left[i] = s * l;
            right[i] = s * r;
        }
    }
}

/// Pan `signal` (channel 0) across a stereo pair by `position` in `[-1, 1]`.
pub fn linear_pan<S: Sample>(signal: Unit<S>, position: Unit<S>) -> Unit<S> {
    let mut inputs = Inputs::new();
    inputs.put_unit(InputKey::Signal, signal);
    inputs.put_unit(InputKey::Position, position);
    proxies_from_inputs(
        inputs,
        BlockSize::no_preference(),
        SampleRate::no_preference(),
        Box::new(LinearPanNode),
    )
}
