//! Reblock: re-buffer a stream to a different block size.
//!
//! The input keeps producing at its own cadence: reblock pulls it with a
//! private timestamp (the input's own `next_time`), queues the samples, and
//! serves them out in blocks of the negotiated size. The caller's timestamp
//! is restored before returning, so the parent graph never observes the
//! pre-roll. Sample rate is unchanged — only the block length moves.

use std::collections::VecDeque;

use crate::channel::{ChannelCore, ChannelNode};
use crate::inputs::{InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::unit::{Unit, create_from_inputs};
use crate::variable::{BlockSize, Overlap, SampleRate};

/// The re-buffering node (one per output channel).
pub struct ReblockNode<S: Sample> {
    pending: VecDeque<S>,
}

impl<S: Sample> ReblockNode<S> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl<S: Sample> ChannelNode<S> for ReblockNode<S> {
    fn name(&self) -> &'static str {
        "Reblock"
    }

    fn input_keys(&self) -> &'static [InputKey] {
        &[InputKey::Signal]
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, index: usize) {
        let (input_block_size, sample_rate, overlap, value) = {
            let input = core.inputs().unit(InputKey::Signal);
            (
                input.block_size(index),
                input.sample_rate(index),
                input.overlap(index),
                input.value(index),
            )
        };
        assert!(
            overlap == Overlap::one(),
            "reblock requires a contiguous input stream"
        );
        core.set_block_size(BlockSize::decide(core.block_size(), input_block_size.clone()));
        core.set_sample_rate(sample_rate);
        self.pending
            .reserve(2 * core.block_size().value().max(input_block_size.value()));
        core.init_value(value);
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, index: usize) {
        let output = core.output();
        let mut output = output.buffer_mut();
        let out = output.as_mut_slice();

        let input = core.inputs().unit(InputKey::Signal);
        let caller_time = info.timestamp();
        while self.pending.len() < out.len() {
            // Pull at the input's own clock, not the caller's.
            info.set_timestamp(input.next_time(index));
            let block = input.process(info, index);
            self.pending.extend(block.buffer().as_slice());
        }
        info.set_timestamp(caller_time);

        for sample in out.iter_mut() {
            // Cannot fail: the loop above filled at least out.len().
            *sample = self.pending.pop_front().unwrap_or(S::ZERO);
        }
    }
}

/// Re-buffer `input` to `preferred_block_size` (falling back to the input's
/// own block size, then the process default).
pub fn reblock<S: Sample>(input: Unit<S>, preferred_block_size: BlockSize) -> Unit<S> {
    assert!(input.channels_have_same_block_size());
    assert!(input.channels_have_same_sample_rate());
    assert!(input.channels_have_same_overlap());

    let mut inputs = Inputs::new();
    inputs.put_unit(InputKey::Signal, input);
    create_from_inputs(
        inputs,
        preferred_block_size,
        SampleRate::no_preference(),
        || Box::new(ReblockNode::new()),
    )
}
