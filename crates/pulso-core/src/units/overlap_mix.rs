//! Overlap-mix: fold an overlapped stream back into a contiguous one.
//!
//! The inverse of overlap-make: successive input windows are overlap-added
//! in a two-block temp buffer and served out as contiguous blocks. The
//! input is pulled at its own (overlapped) cadence with a private
//! timestamp; this unit's own overlap is 1 again. `SourceOverlap` names the
//! hop factor the *input* stream carries — it is a parameter here, not this
//! channel's overlap.

use crate::buffer::Buffer;
use crate::channel::{ChannelCore, ChannelNode};
use crate::inputs::{InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::time::Timestamp;
use crate::unit::{Unit, proxies_from_inputs};
use crate::variable::{BlockSize, Overlap, SampleRate};

/// The overlap-add owner node.
pub struct OverlapMixNode<S: Sample> {
    num_outputs: usize,
    temp: Vec<Buffer<S>>,
    pos: usize,
    start_offset: usize,
    next_input_time: Timestamp,
}

impl<S: Sample> OverlapMixNode<S> {
    fn new(num_outputs: usize) -> Self {
        Self {
            num_outputs,
            temp: Vec::new(),
            pos: 0,
            start_offset: 0,
            next_input_time: Timestamp::ZERO,
        }
    }
}

impl<S: Sample> ChannelNode<S> for OverlapMixNode<S> {
    fn name(&self) -> &'static str {
        "OverlapMix"
    }

    fn input_keys(&self) -> &'static [InputKey] {
        &[InputKey::Signal, InputKey::SourceOverlap]
    }

    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    fn is_proxy_owner(&self) -> bool {
        self.num_outputs > 1
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, index: usize) {
        let (block_size, sample_rate, value) = {
            let input = core.inputs().unit(InputKey::Signal);
            (
                input.block_size(0),
                input.sample_rate(0),
                input.value(index),
            )
        };
        if index == 0 {
            core.set_block_size(block_size);
            core.set_sample_rate(sample_rate);
            let len = core.block_size().value();
            self.temp = (0..self.num_outputs)
                .map(|_| Buffer::with_len(2 * len))
                .collect();
            self.pos = 0;
            self.start_offset = 0;
        }
        core.init_value_at(index, value);
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, _index: usize) {
        let input = core.inputs().unit(InputKey::Signal);
        let len = core.output_at(0).len();
        let source = core.inputs().overlap(InputKey::SourceOverlap);
        let hop = (source.value() * len as f64 + 0.5) as usize;

        if hop > 0 && hop <= len {
            let caller_time = info.timestamp();

            // Serve the tail left over from the previous cycle, then clear
            // the workspace for this cycle's windows.
            for channel in 0..self.num_outputs {
                let output = core.output_at(channel);
                let mut output = output.buffer_mut();
                output
                    .as_mut_slice()
                    .copy_from_slice(&self.temp[channel].as_slice()[self.pos..self.pos + len]);
                self.temp[channel].zero();
            }

            // Overlap-add input windows until one full block is covered.
            self.pos = self.start_offset;
            while self.pos < len {
                let window_start = self.pos;
                info.set_timestamp(self.next_input_time);
                for channel in 0..self.num_outputs {
                    let block = input.process(info, channel);
                    let block = block.buffer();
                    debug_assert_eq!(block.len(), len);
                    let temp = self.temp[channel].as_mut_slice();
                    for (i, &sample) in block.as_slice().iter().enumerate() {
                        temp[window_start + i] += sample;
                    }
                }
                self.pos = window_start + hop;
                self.next_input_time = input.next_time(0);
            }
            self.start_offset = self.pos - len;

            // First block's worth of the workspace joins the output; the
            // rest stays for next time.
            for channel in 0..self.num_outputs {
                let output = core.output_at(channel);
                let mut output = output.buffer_mut();
                let out = output.as_mut_slice();
                let temp = self.temp[channel].as_slice();
                for i in 0..len {
                    out[i] += temp[i];
                }
            }
            self.pos = len;

            info.set_timestamp(caller_time);
        } else {
            // Degenerate hop: the stream is already contiguous.
            for channel in 0..self.num_outputs {
                let block = input.process(info, channel);
                let block = block.buffer();
                let output = core.output_at(channel);
                let mut output = output.buffer_mut();
                debug_assert_eq!(block.len(), output.len());
                output.as_mut_slice().copy_from_slice(block.as_slice());
            }
        }
    }
}

/// Mix an overlapped stream (hop factor `source_overlap`) back down to a
/// contiguous one.
pub fn overlap_mix<S: Sample>(input: Unit<S>, source_overlap: Overlap) -> Unit<S> {
    assert!(input.channels_have_same_block_size());
    assert!(input.channels_have_same_sample_rate());

    let num_outputs = input.num_channels();
    let mut inputs = Inputs::new();
    inputs.put_unit(InputKey::Signal, input);
    inputs.put_overlap(InputKey::SourceOverlap, source_overlap);
    proxies_from_inputs(
        inputs,
        BlockSize::no_preference(),
        SampleRate::no_preference(),
        Box::new(OverlapMixNode::new(num_outputs)),
    )
}
