//! Fused multiply-add: `out = signal × multiply + add`.
//!
//! This is the wrapper most factory calls end in (via
//! [`apply_mul_add`](crate::unit::apply_mul_add)), so the common buffer
//! shapes get dedicated loops: all three inputs full-length, and
//! full-length signal with single-sample multiply and/or add. Anything
//! else goes through the zero-order-hold adaptation rule for all three
//! inputs at once.

use crate::buffer::adapted;
use crate::channel::{ChannelCore, ChannelNode};
use crate::inputs::{InputKey, Inputs};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::unit::{Unit, expand_from_inputs};
use crate::variable::{BlockSize, SampleRate};

/// The fused multiply-add node.
pub struct MulAddNode;

impl<S: Sample> ChannelNode<S> for MulAddNode {
    fn name(&self) -> &'static str {
        "MulAdd"
    }

    fn input_keys(&self) -> &'static [InputKey] {
        &[InputKey::Signal, InputKey::Multiply, InputKey::Add]
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, index: usize) {
        struct InputProbe<S: Sample> {
            value: S,
            block_size: BlockSize,
            sample_rate: SampleRate,
            overlap: crate::variable::Overlap,
            constant: bool,
        }

        fn probe<S: Sample>(unit: &Unit<S>, index: usize) -> InputProbe<S> {
            InputProbe {
                value: unit.value(index),
                block_size: unit.block_size(index),
                sample_rate: unit.sample_rate(index),
                overlap: unit.overlap(index),
                constant: unit.is_constant(index),
            }
        }

        let (signal, multiply, add) = {
            let inputs = core.inputs();
            (
                probe(inputs.unit(InputKey::Signal), index),
                probe(inputs.unit(InputKey::Multiply), index),
                probe(inputs.unit(InputKey::Add), index),
            )
        };

        let block_size = signal
            .block_size
            .select_max(&multiply.block_size)
            .select_max(&add.block_size);
        let sample_rate = signal
            .sample_rate
            .select_max(&multiply.sample_rate)
            .select_max(&add.sample_rate);
        core.set_block_size(BlockSize::decide(core.block_size(), block_size));
        core.set_sample_rate(SampleRate::decide(core.sample_rate(), sample_rate));

        // Overlap resolution: unanimous wins; otherwise the single
        // non-constant input dictates; two disagreeing non-constant
        // inputs are a construction bug.
        if signal.overlap == multiply.overlap && signal.overlap == add.overlap {
            core.set_overlap(signal.overlap);
        } else if signal.constant && multiply.constant {
            core.set_overlap(add.overlap);
        } else if signal.constant && add.constant {
            core.set_overlap(multiply.overlap);
        } else if multiply.constant && add.constant {
            core.set_overlap(signal.overlap);
        } else {
            panic!("ambiguous overlap: more than one non-constant input with differing overlaps");
        }

        core.init_value(signal.value * multiply.value + add.value);
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, index: usize) {
        let inputs = core.inputs();
        let signal = inputs.unit(InputKey::Signal).process(info, index);
        let multiply = inputs.unit(InputKey::Multiply).process(info, index);
        let add = inputs.unit(InputKey::Add).process(info, index);

        let signal = signal.buffer();
        let multiply = multiply.buffer();
        let add = add.buffer();
        let output = core.output();
        let mut output = output.buffer_mut();

        let out = output.as_mut_slice();
        let n = out.len();
        let sig = signal.as_slice();
        let mul = multiply.as_slice();
        let off = add.as_slice();

        if sig.len() == n && mul.len() == n && off.len() == n {
            for i in 0..n {
                out[i] = sig[i] * mul[i] + off[i];
            }
        } else if sig.len() == n && mul.len() == 1 && off.len() == 1 {
            let (m, a) = (mul[0], off[0]);
            for i in 0..n {
                out[i] = sig[i] * m + a;
            }
        } else if sig.len() == n && mul.len() == n && off.len() == 1 {
            let a = off[0];
            for i in 0..n {
                out[i] = sig[i] * mul[i] + a;
            }
        } else if sig.len() == n && mul.len() == 1 && off.len() == n {
            let m = mul[0];
            for i in 0..n {
                out[i] = sig[i] * m + off[i];
            }
        } else {
            let values = adapted(sig, n)
                .zip(adapted(mul, n))
                .zip(adapted(off, n));
            for (sample, ((s, m), a)) in out.iter_mut().zip(values) {
                *sample = s * m + a;
            }
        }
    }
}

/// `signal × multiply + add`, expanded to the widest channel count of the
/// three inputs with wrap-around.
pub fn mul_add<S: Sample>(signal: Unit<S>, multiply: Unit<S>, add: Unit<S>) -> Unit<S> {
    let mut inputs = Inputs::new();
    inputs.put_unit(InputKey::Signal, signal);
    inputs.put_unit(InputKey::Multiply, multiply);
    inputs.put_unit(InputKey::Add, add);
    expand_from_inputs(
        &inputs,
        &BlockSize::no_preference(),
        &SampleRate::no_preference(),
        || Box::new(MulAddNode),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::saw::saw;
    use crate::variable::Overlap;

    fn block(unit: &Unit<f32>, channel: usize) -> Vec<f32> {
        let mut info = ProcessInfo::new();
        unit.process(&mut info, channel).buffer().as_slice().to_vec()
    }

    fn test_saw(freq: f32) -> Unit<f32> {
        saw(
            Unit::constant(freq),
            BlockSize::new(4),
            SampleRate::new(1000.0),
        )
    }

    #[test]
    fn scales_and_offsets_a_signal() {
        // 100Hz saw at 1kHz ramps 0, .2, .4, .6.
        let unit = mul_add(test_saw(100.0), Unit::constant(2.0), Unit::constant(1.0));
        let out = block(&unit, 0);
        assert_eq!(out.len(), 4);
        assert!((out[0] - 1.0).abs() < 1e-6);
        assert!((out[1] - 1.4).abs() < 1e-6);
        assert!((out[3] - 2.2).abs() < 1e-6);
    }

    #[test]
    fn seeds_initial_value_from_inputs() {
        let unit = mul_add(Unit::constant(3.0f32), Unit::constant(2.0), Unit::constant(1.0));
        assert_eq!(unit.value(0), 7.0);
    }

    #[test]
    fn geometry_is_the_max_of_the_inputs() {
        let unit = mul_add(test_saw(100.0), Unit::constant(0.5), Unit::constant(0.0));
        assert_eq!(unit.block_size(0).value(), 4);
        assert_eq!(unit.sample_rate(0).value(), 1000.0);
    }

    #[test]
    fn channel_counts_wrap_to_the_widest() {
        // 2-channel signal, 3-channel multiply -> 3 channels, wrapped.
        let signal = Unit::constants(&[1.0f32, 2.0]);
        let unit = mul_add(
            signal,
            Unit::constants(&[10.0, 20.0, 30.0]),
            Unit::constant(0.0),
        );
        assert_eq!(unit.num_channels(), 3);
        assert_eq!(unit.value(0), 10.0); // 1 * 10
        assert_eq!(unit.value(1), 40.0); // 2 * 20
        assert_eq!(unit.value(2), 30.0); // 1 * 30 (signal wrapped)
    }

    #[test]
    fn adopts_the_single_non_constant_overlap() {
        let oscillator = test_saw(100.0);
        let expected = oscillator.overlap(0);
        let unit = mul_add(oscillator, Unit::constant(0.5), Unit::constant(0.1));
        assert_eq!(unit.overlap(0), expected);
    }

    #[test]
    #[should_panic(expected = "ambiguous overlap")]
    fn disagreeing_non_constant_overlaps_are_rejected() {
        use crate::units::overlap_make::overlap_make;

        // Two windowed streams with different hop factors: neither is
        // constant, so there is no single overlap to adopt.
        let windows = overlap_make(test_saw(100.0), Overlap::new(0.5), false);
        let hops = overlap_make(test_saw(100.0), Overlap::new(0.25), false);
        let _ = mul_add(windows, hops, Unit::constant(0.0));
    }

    #[test]
    fn unanimous_overlap_is_adopted() {
        let unit = mul_add(
            Unit::constant(1.0f32),
            Unit::constant(2.0),
            Unit::constant(3.0),
        );
        assert_eq!(unit.overlap(0), Overlap::one());
    }

    #[test]
    fn mixed_lengths_fall_back_to_adaptation() {
        // Signal block 4, multiply is a 1-sample constant, add a saw with
        // block 4: exercised via the NN1N path.
        let unit = mul_add(test_saw(100.0), Unit::constant(2.0), test_saw(50.0));
        let out = block(&unit, 0);
        // saw(100): 0 .2 .4 .6; saw(50): 0 .1 .2 .3.
        assert!((out[1] - (0.2 * 2.0 + 0.1)).abs() < 1e-6);
        assert!((out[3] - (0.6 * 2.0 + 0.3)).abs() < 1e-6);
    }
}
