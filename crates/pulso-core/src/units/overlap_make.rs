//! Overlap-make: slice a contiguous stream into overlapping blocks.
//!
//! The output carries the stated overlap on its own overlap variable, so
//! downstream pull clocks advance by `block × overlap` per produce while
//! the input keeps its contiguous cadence. History lives in a per-channel
//! temp buffer of two blocks; the input is pre-rolled with a private
//! timestamp and the caller's frame is restored afterwards.

use crate::buffer::Buffer;
use crate::channel::{ChannelCore, ChannelNode};
use crate::inputs::{InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::time::Timestamp;
use crate::unit::{Unit, proxies_from_inputs};
use crate::variable::{BlockSize, Overlap, SampleRate};

/// The overlapping-window owner node.
pub struct OverlapMakeNode<S: Sample> {
    num_outputs: usize,
    zero_pad: bool,
    temp: Vec<Buffer<S>>,
    pos: usize,
    fill: usize,
    next_input_time: Timestamp,
}

impl<S: Sample> OverlapMakeNode<S> {
    fn new(num_outputs: usize, zero_pad: bool) -> Self {
        Self {
            num_outputs,
            zero_pad,
            temp: Vec::new(),
            pos: 0,
            fill: 0,
            next_input_time: Timestamp::ZERO,
        }
    }
}

impl<S: Sample> ChannelNode<S> for OverlapMakeNode<S> {
    fn name(&self) -> &'static str {
        "OverlapMake"
    }

    fn input_keys(&self) -> &'static [InputKey] {
        &[InputKey::Signal, InputKey::Overlap]
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
            // Geometry follows the input; only the overlap differs.
            core.set_block_size(block_size);
            core.set_sample_rate(sample_rate);
            let len = core.block_size().value();
            self.temp = (0..self.num_outputs)
                .map(|_| Buffer::with_len(2 * len))
                .collect();
            self.pos = 0;
            self.fill = 0;
        }
        core.init_value_at(index, value);
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, _index: usize) {
        let input = core.inputs().unit(InputKey::Signal);
        let len = core.output_at(0).len();
        let hop = (core.overlap().value() * len as f64 + 0.5) as usize;

        if hop < len {
            let caller_time = info.timestamp();

            // Buffer enough contiguous input to serve one full window.
            while self.pos + len >= self.fill {
                info.set_timestamp(self.next_input_time);
                for channel in 0..self.num_outputs {
                    let block = input.process(info, channel);
                    let block = block.buffer();
                    debug_assert_eq!(block.len(), len);
                    self.temp[channel].as_mut_slice()[self.fill..self.fill + len]
                        .copy_from_slice(block.as_slice());
                }
                self.fill += len;
                self.next_input_time = input.next_time(0);
                debug_assert!(self.fill <= 2 * len);
            }

            for channel in 0..self.num_outputs {
                let output = core.output_at(channel);
                let mut output = output.buffer_mut();
                let out = output.as_mut_slice();
                let temp = self.temp[channel].as_slice();
                if self.zero_pad {
                    out[..hop].copy_from_slice(&temp[self.pos..self.pos + hop]);
                    out[hop..].fill(S::ZERO);
                } else {
                    out.copy_from_slice(&temp[self.pos..self.pos + len]);
                }
            }
            self.pos += hop;

            // Past the first block: slide the second half down so the next
            // window starts inside the buffer again.
            if self.pos >= len {
                for channel in 0..self.num_outputs {
                    self.temp[channel].as_mut_slice().copy_within(len.., 0);
                }
                self.fill -= len;
                self.pos -= len;
            }

            info.set_timestamp(caller_time);
        } else {
            // No overlap requested: pass blocks straight through.
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

/// Slice `input` into windows overlapping by `1 − overlap` of their length
/// (`overlap` is the hop factor in `(0, 1]`). With `zero_pad`, the
/// overlapped tail of each window is zeroed instead of filled with input.
pub fn overlap_make<S: Sample>(input: Unit<S>, overlap: Overlap, zero_pad: bool) -> Unit<S> {
    assert!(input.channels_have_same_block_size());
    assert!(input.channels_have_same_sample_rate());

    let num_outputs = input.num_channels();
    let mut inputs = Inputs::new();
    inputs.put_unit(InputKey::Signal, input);
    inputs.put_overlap(InputKey::Overlap, overlap);
    proxies_from_inputs(
        inputs,
        BlockSize::no_preference(),
        SampleRate::no_preference(),
        Box::new(OverlapMakeNode::new(num_outputs, zero_pad)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::saw::saw;

    fn test_saw() -> Unit<f32> {
        saw(
            Unit::constant(100.0f32),
            BlockSize::new(4),
            SampleRate::new(1000.0),
        )
    }

    fn pull_windows(unit: &Unit<f32>, count: usize) -> Vec<Vec<f32>> {
        let mut info = ProcessInfo::new();
        let mut windows = Vec::new();
        for _ in 0..count {
            info.set_timestamp(unit.next_time(0));
            let out = unit.process(&mut info, 0);
            windows.push(out.buffer().as_slice().to_vec());
        }
        windows
    }

    #[test]
    fn adopts_the_stated_overlap() {
        let windows = overlap_make(test_saw(), Overlap::new(0.5), false);
        assert!((windows.overlap(0).value() - 0.5).abs() < 1e-12);
        assert_eq!(windows.block_size(0).value(), 4);
    }

    #[test]
    fn half_overlap_windows_share_their_halves() {
        // The saw ramps 0 .2 .4 .6 | .8 -1 -.8 -.6 | ...
        let windows = pull_windows(&overlap_make(test_saw(), Overlap::new(0.5), false), 3);
        assert_eq!(windows[0], vec![0.0, 0.2, 0.4, 0.6]);
        // Window 2 starts at the hop (2 samples in).
        assert_eq!(windows[1], vec![0.4, 0.6, 0.8, -1.0]);
        assert_eq!(windows[2], vec![0.8, -1.0, -0.8, -0.6]);
    }

    #[test]
    fn next_time_advances_by_the_hop() {
        let windows = overlap_make(test_saw(), Overlap::new(0.5), false);
        let mut info = ProcessInfo::new();
        windows.process(&mut info, 0);
        // Half of 4 samples at 1kHz: 2000 ticks, not 4000.
        assert_eq!(windows.next_time(0), Timestamp::new(2000, 0.0));
    }

    #[test]
    fn zero_pad_blanks_the_tail() {
        let windows = pull_windows(&overlap_make(test_saw(), Overlap::new(0.5), true), 2);
        assert_eq!(windows[0], vec![0.0, 0.2, 0.0, 0.0]);
        assert_eq!(windows[1], vec![0.4, 0.6, 0.0, 0.0]);
    }

    #[test]
    fn caller_timestamp_is_restored() {
        let windows = overlap_make(test_saw(), Overlap::new(0.5), false);
        let mut info = ProcessInfo::new();
        windows.process(&mut info, 0);
        assert_eq!(info.timestamp(), Timestamp::ZERO);
    }
}
