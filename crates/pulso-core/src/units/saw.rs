//! Trivial (non-bandlimited) sawtooth oscillator.
//!
//! Exists to exercise the engine: a generator with internal state, a
//! modulatable frequency input consumed through the adaptation rule, and
//! full geometry negotiation from that input.

use crate::buffer::adapted;
use crate::channel::{ChannelCore, ChannelNode};
use crate::inputs::{InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::unit::{Unit, create_from_inputs};
use crate::variable::{BlockSize, SampleRate};

/// Phase-accumulator sawtooth in `[-PEAK, PEAK)`.
pub struct SawNode {
    current: f64,
}

impl SawNode {
    /// A sawtooth starting at phase value 0.
    pub fn new() -> Self {
        Self { current: 0.0 }
    }
}

impl Default for SawNode {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sample> ChannelNode<S> for SawNode {
    fn name(&self) -> &'static str {
        "Saw"
    }

    fn input_keys(&self) -> &'static [InputKey] {
        &[InputKey::Frequency]
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, index: usize) {
        let (block_size, sample_rate, overlap) = {
            let frequency = core.inputs().unit(InputKey::Frequency);
            (
                frequency.block_size(index),
                frequency.sample_rate(index),
                frequency.overlap(index),
            )
        };
        core.set_block_size(BlockSize::decide(core.block_size(), block_size));
        core.set_sample_rate(SampleRate::decide(core.sample_rate(), sample_rate));
        core.set_overlap(overlap);
        core.init_value(S::from_f64(self.current));
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, index: usize) {
        let peak = S::PEAK.to_f64();
        let peak2peak = 2.0 * peak;
        let factor = peak2peak / core.sample_rate().value();

        let frequency = core.inputs().unit(InputKey::Frequency).process(info, index);
        let frequency = frequency.buffer();
        let output = core.output();
        let mut output = output.buffer_mut();
        let samples = output.as_mut_slice();
        let len = samples.len();

        for (sample, f) in samples.iter_mut().zip(adapted(frequency.as_slice(), len)) {
            *sample = S::from_f64(self.current);
            self.current += f.to_f64() * factor;
            if self.current >= peak {
                self.current -= peak2peak;
            } else if self.current < -peak {
                self.current += peak2peak;
            }
        }
    }
}

/// A sawtooth unit. `frequency` may be any unit (a constant, another
/// oscillator, ...); geometry follows the stated preferences, falling back
/// to the process defaults.
pub fn saw<S: Sample>(
    frequency: Unit<S>,
    preferred_block_size: BlockSize,
    preferred_sample_rate: SampleRate,
) -> Unit<S> {
    let mut inputs = Inputs::new();
    inputs.put_unit(InputKey::Frequency, frequency);
    create_from_inputs(
        inputs,
        BlockSize::decide(preferred_block_size, BlockSize::default_shared()),
        SampleRate::decide(preferred_sample_rate, SampleRate::default_shared()),
        || Box::new(SawNode::new()),
    )
}
