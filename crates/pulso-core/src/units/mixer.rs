//! Channel mixer: sum a multichannel unit down to one channel.
//!
//! Every input channel is pulled and accumulated through the adaptation
//! rule. The mixer is also the graph's deletion barrier: with
//! `allow_auto_delete` off, a finished voice inside the mix raises
//! `should_delete` during the pull and the mixer clears it before
//! returning, so the end of one voice never tears down the whole mix.

use crate::buffer::adapted;
use crate::channel::{Channel, ChannelCore, ChannelNode};
use crate::inputs::{InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::unit::Unit;
use crate::variable::{BlockSize, Overlap, SampleRate};

/// The summing node.
pub struct MixerNode {
    allow_auto_delete: bool,
}

impl<S: Sample> ChannelNode<S> for MixerNode {
    fn name(&self) -> &'static str {
        "Mixer"
    }

    fn input_keys(&self) -> &'static [InputKey] {
        &[InputKey::Signal]
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, _index: usize) {
        let (block_size, sample_rate, sum) = {
            let input = core.inputs().unit(InputKey::Signal);
            let sum = (0..input.num_channels())
                .map(|i| input.value(i))
                .fold(S::ZERO, |acc, v| acc + v);
            (input.block_size(0), input.sample_rate(0), sum)
        };
        core.set_block_size(BlockSize::decide(core.block_size(), block_size));
        core.set_sample_rate(SampleRate::decide(core.sample_rate(), sample_rate));
        core.init_value(sum);
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, _index: usize) {
        let output = core.output();
        let mut output = output.buffer_mut();
        output.zero();
        let out = output.as_mut_slice();
        let n = out.len();

        let input = core.inputs().unit(InputKey::Signal);
        for channel in 0..input.num_channels() {
            debug_assert!(
                input.overlap(channel) == Overlap::one(),
                "mixer inputs must be contiguous streams"
            );
            let block = input.process(info, channel);
            let block = block.buffer();
            let samples = block.as_slice();
            if samples.len() == n {
                for i in 0..n {
                    out[i] += samples[i];
                }
            } else {
                for (sample, v) in out.iter_mut().zip(adapted(samples, n)) {
                    *sample += v;
                }
            }
        }

        if !self.allow_auto_delete {
            info.reset_should_delete();
        }
    }
}

/// Sum all channels of `input` into a single channel.
///
/// `allow_auto_delete` controls whether end-of-signal flags from inside the
/// mix propagate to the caller.
pub fn mixer<S: Sample>(input: Unit<S>, allow_auto_delete: bool) -> Unit<S> {
    let mut inputs = Inputs::new();
    inputs.put_unit(InputKey::Signal, input);
    let core = ChannelCore::new(inputs, BlockSize::no_preference(), SampleRate::no_preference());
    let channel = Channel::new(core, Box::new(MixerNode { allow_auto_delete }));
    channel.init(0);
    Unit::from_channels(vec![channel])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;
    use crate::units::saw::saw;

    #[test]
    fn sums_all_channels_with_broadcast() {
        // One block-4 oscillator plus two constants.
        let oscillator = saw(
            Unit::constant(100.0f32),
            BlockSize::new(4),
            SampleRate::new(1000.0),
        );
        let voices = Unit::from_channels(
            oscillator
                .channels()
                .chain(Unit::constants(&[1.0, 2.0]).channels())
                .cloned()
                .collect(),
        );
        let mix = mixer(voices, false);
        let mut info = ProcessInfo::new();
        let out = mix.process(&mut info, 0);
        let out = out.buffer();
        // saw ramps 0 .2 .4 .6; constants add 3.0 everywhere.
        assert_eq!(out.len(), 4);
        assert!((out.as_slice()[0] - 3.0).abs() < 1e-6);
        assert!((out.as_slice()[3] - 3.6).abs() < 1e-6);
    }

    #[test]
    fn seeds_with_the_sum_of_input_values() {
        let mix = mixer(Unit::constants(&[1.0f32, 2.0, 3.0]), false);
        assert_eq!(mix.value(0), 6.0);
    }

    struct Ending;

    impl ChannelNode<f32> for Ending {
        fn name(&self) -> &'static str {
            "Ending"
        }
        fn init_channel(&mut self, core: &mut ChannelCore<f32>, _index: usize) {
            core.set_block_size(BlockSize::decide(core.block_size(), BlockSize::new(4)));
            core.set_sample_rate(SampleRate::decide(core.sample_rate(), SampleRate::new(1000.0)));
            core.init_value(0.0);
        }
        fn produce(&mut self, _core: &ChannelCore<f32>, info: &mut ProcessInfo, _index: usize) {
            info.set_should_delete();
        }
    }

    fn ending_unit() -> Unit<f32> {
        let core = ChannelCore::new(Inputs::new(), BlockSize::new(4), SampleRate::new(1000.0));
        let channel = Channel::new(core, Box::new(Ending));
        channel.init(0);
        Unit::from_channels(vec![channel])
    }

    #[test]
    fn barrier_contains_should_delete() {
        let mix = mixer(ending_unit(), false);
        let mut info = ProcessInfo::new();
        mix.process(&mut info, 0);
        assert!(!info.should_delete());
    }

    #[test]
    fn auto_delete_propagates_when_allowed() {
        let inner = ending_unit();
        let mix = mixer(inner.clone(), true);
        let mut info = ProcessInfo::new();
        mix.process(&mut info, 0);
        assert!(info.should_delete());
        // The flag also latched the inner channel's expiry.
        assert!(inner.channel(0).should_be_deleted(inner.next_time(0)));
        assert!(!inner.channel(0).should_be_deleted(Timestamp::ZERO));
    }
}
