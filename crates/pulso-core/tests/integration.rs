//! Integration tests for pulso-core.
//!
//! Exercises whole graphs across module boundaries: oscillator through
//! scale-and-offset into a mix, shared subgraphs memoized under a diamond,
//! block-size renegotiation rippling through a live graph, overlapped
//! windowing round trips, and teardown of shared nodes.

use std::cell::Cell;
use std::rc::Rc;

use pulso_core::units::{linear_pan, mixer, mul_add, overlap_make, overlap_mix, reblock, saw};
use pulso_core::{
    BlockSize, Channel, ChannelCore, ChannelNode, GraphConfig, Inputs, Overlap, ProcessInfo,
    SampleRate, Unit,
};

const SAMPLE_RATE: f64 = 1000.0;

fn test_saw(frequency: f32, block_size: usize) -> Unit<f32> {
    saw(
        Unit::constant(frequency),
        BlockSize::new(block_size),
        SampleRate::new(SAMPLE_RATE),
    )
}

/// Pull `blocks` consecutive blocks on the unit's own clock.
fn pull_samples(unit: &Unit<f32>, blocks: usize) -> Vec<f32> {
    let mut info = ProcessInfo::new();
    let mut samples = Vec::new();
    for _ in 0..blocks {
        info.set_timestamp(unit.next_time(0));
        let out = unit.process(&mut info, 0);
        samples.extend_from_slice(out.buffer().as_slice());
    }
    samples
}

// ============================================================================
// 1. A full voice chain
// ============================================================================

#[test]
fn voice_chain_scales_and_mixes_across_blocks() {
    // saw ramps 0 .2 .4 .6 .8 -1 ... at 100 Hz / 1 kHz; scale by 0.5,
    // offset by 1.0, and mix with a second constant voice of 2.0.
    let voice = mul_add(
        test_saw(100.0, 4),
        Unit::constant(0.5),
        Unit::constant(1.0),
    );
    let voices = Unit::from_channels(
        voice
            .channels()
            .chain(Unit::constant(2.0f32).channels())
            .cloned()
            .collect(),
    );
    let mix = mixer(voices, false);

    let out = pull_samples(&mix, 3);
    let expected_saw = [0.0, 0.2, 0.4, 0.6, 0.8, -1.0, -0.8, -0.6, -0.4, -0.2, 0.0, 0.2];
    assert_eq!(out.len(), 12);
    for (i, (&got, &s)) in out.iter().zip(expected_saw.iter()).enumerate() {
        let expected = s * 0.5 + 1.0 + 2.0;
        assert!(
            (got - expected).abs() < 1e-5,
            "sample {i}: got {got}, expected {expected}"
        );
    }
}

// ============================================================================
// 2. Diamond sharing: one producer, two consumers, one produce per span
// ============================================================================

/// Counts how many times its produce actually runs.
struct CountingSource {
    produces: Rc<Cell<usize>>,
}

impl ChannelNode<f32> for CountingSource {
    fn name(&self) -> &'static str {
        "CountingSource"
    }

    fn init_channel(&mut self, core: &mut ChannelCore<f32>, _index: usize) {
        core.set_block_size(BlockSize::decide(core.block_size(), BlockSize::new(4)));
        core.set_sample_rate(SampleRate::decide(
            core.sample_rate(),
            SampleRate::new(SAMPLE_RATE),
        ));
        core.init_value(1.0);
    }

    fn produce(&mut self, core: &ChannelCore<f32>, _info: &mut ProcessInfo, _index: usize) {
        self.produces.set(self.produces.get() + 1);
        core.output().buffer_mut().fill(1.0);
    }
}

fn counting_unit(produces: Rc<Cell<usize>>) -> Unit<f32> {
    let core = ChannelCore::new(
        Inputs::new(),
        BlockSize::no_preference(),
        SampleRate::no_preference(),
    );
    let channel = Channel::new(core, Box::new(CountingSource { produces }));
    channel.init(0);
    Unit::from_channels(vec![channel])
}

#[test]
fn shared_subgraph_produces_once_per_span() {
    let produces = Rc::new(Cell::new(0));
    let shared = counting_unit(Rc::clone(&produces));

    // Two branches over the same channel, recombined by a mixer.
    let left = mul_add(shared.clone(), Unit::constant(2.0), Unit::constant(0.0));
    let right = mul_add(shared, Unit::constant(3.0), Unit::constant(0.0));
    let both = Unit::from_channels(
        left.channels().chain(right.channels()).cloned().collect(),
    );
    let mix = mixer(both, false);

    let out = pull_samples(&mix, 3);
    // 2x + 3x of a unit signal.
    assert!(out.iter().all(|&s| (s - 5.0).abs() < 1e-6));
    // Three spans pulled, and the shared source ran exactly once per span
    // despite being reachable along two paths.
    assert_eq!(produces.get(), 3);
}

// ============================================================================
// 3. Block-size renegotiation on a live graph
// ============================================================================

#[test]
fn shared_block_size_reshapes_a_running_chain() {
    let block_size = BlockSize::new(4);
    let chain = mul_add(
        saw(
            Unit::constant(100.0f32),
            block_size.clone(),
            SampleRate::new(SAMPLE_RATE),
        ),
        Unit::constant(1.0),
        Unit::constant(0.0),
    );

    let mut info = ProcessInfo::new();
    assert_eq!(chain.process(&mut info, 0).buffer().len(), 4);

    block_size.set_value(8);
    info.set_timestamp(chain.next_time(0));
    assert_eq!(chain.process(&mut info, 0).buffer().len(), 8);
}

// ============================================================================
// 4. Reblock and overlap round trips
// ============================================================================

#[test]
fn reblock_then_pan_keeps_the_stream_intact() {
    let direct = pull_samples(&test_saw(100.0, 8), 2);
    let pair = linear_pan(
        reblock(test_saw(100.0, 4), BlockSize::new(8)),
        Unit::constant(-1.0),
    );

    // Hard left: channel 0 carries the full signal.
    let mut info = ProcessInfo::new();
    let mut left = Vec::new();
    for _ in 0..2 {
        info.set_timestamp(pair.next_time(0));
        left.extend_from_slice(pair.process(&mut info, 0).buffer().as_slice());
    }
    assert_eq!(left.len(), direct.len());
    for (l, d) in left.iter().zip(direct.iter()) {
        assert!((l - d).abs() < 1e-6);
    }
}

#[test]
fn overlap_round_trip_doubles_a_rectangular_window() {
    let overlap = Overlap::new(0.5);
    let direct = pull_samples(&test_saw(100.0, 4), 3);
    let folded = overlap_mix(
        overlap_make(test_saw(100.0, 4), overlap.clone(), false),
        overlap,
    );
    let out = pull_samples(&folded, 3);
    // Rectangular window, hop 1/2: steady state sums each sample twice.
    for i in 2..10 {
        assert!(
            (out[i] - 2.0 * direct[i]).abs() < 1e-5,
            "sample {i}: {} vs {}",
            out[i],
            direct[i]
        );
    }
}

// ============================================================================
// 5. Configured defaults feed geometry negotiation
// ============================================================================

#[test]
fn configured_defaults_reach_unconstrained_units() {
    GraphConfig {
        default_block_size: 16,
        default_sample_rate: 8000.0,
    }
    .apply();

    let unit = saw(
        Unit::constant(100.0f32),
        BlockSize::no_preference(),
        SampleRate::no_preference(),
    );
    assert_eq!(unit.block_size(0).value(), 16);
    assert_eq!(unit.sample_rate(0).value(), 8000.0);

    GraphConfig::default().apply();
}

// ============================================================================
// 6. Teardown of shared nodes
// ============================================================================

/// Reports its drop so tests can watch teardown.
struct DropWatched {
    drops: Rc<Cell<usize>>,
}

impl ChannelNode<f32> for DropWatched {
    fn name(&self) -> &'static str {
        "DropWatched"
    }

    fn init_channel(&mut self, core: &mut ChannelCore<f32>, _index: usize) {
        core.set_block_size(BlockSize::decide(core.block_size(), BlockSize::new(4)));
        core.set_sample_rate(SampleRate::decide(
            core.sample_rate(),
            SampleRate::new(SAMPLE_RATE),
        ));
        core.init_value(0.0);
    }

    fn produce(&mut self, _core: &ChannelCore<f32>, _info: &mut ProcessInfo, _index: usize) {}
}

impl Drop for DropWatched {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn shared_channel_drops_exactly_once_after_last_owner() {
    let drops = Rc::new(Cell::new(0));
    let core = ChannelCore::new(
        Inputs::new(),
        BlockSize::no_preference(),
        SampleRate::no_preference(),
    );
    let channel = Channel::new(
        core,
        Box::new(DropWatched {
            drops: Rc::clone(&drops),
        }),
    );
    channel.init(0);
    let source = Unit::from_channels(vec![channel]);

    let left = mul_add(source.clone(), Unit::constant(2.0), Unit::constant(0.0));
    let right = mul_add(source, Unit::constant(3.0), Unit::constant(0.0));

    drop(left);
    assert_eq!(drops.get(), 0, "still referenced by the right branch");
    drop(right);
    assert_eq!(drops.get(), 1, "last owner gone, node dropped once");
}

#[test]
fn proxy_group_tears_down_cleanly() {
    // Dropping a stereo pair drops the owner and both proxies with it;
    // nothing left behind keeps the input alive.
    let drops = Rc::new(Cell::new(0));
    let core = ChannelCore::new(
        Inputs::new(),
        BlockSize::no_preference(),
        SampleRate::no_preference(),
    );
    let channel = Channel::new(
        core,
        Box::new(DropWatched {
            drops: Rc::clone(&drops),
        }),
    );
    channel.init(0);
    let source = Unit::from_channels(vec![channel]);

    let pair = linear_pan(source, Unit::constant(0.0));
    assert_eq!(pair.num_channels(), 2);
    drop(pair);
    assert_eq!(drops.get(), 1);
}

// ============================================================================
// 7. Out-of-range channel addressing
// ============================================================================

#[test]
fn out_of_range_pulls_match_the_canonical_channel() {
    // 2-channel signal against 3-channel gain expands to 3 pairings;
    // channel 1 is signal 1 x gain 1 however the caller spells the index.
    let unit = mul_add(
        Unit::constants(&[1.0f32, 2.0]),
        Unit::constants(&[10.0, 20.0, 30.0]),
        Unit::constant(0.0),
    );
    assert_eq!(unit.num_channels(), 3);

    let mut info = ProcessInfo::new();
    let aliased = unit.process(&mut info, 4).buffer().as_slice().to_vec();
    assert_eq!(aliased, vec![40.0]);

    // Same span: the canonical pull is served the memoized block.
    let canonical = unit.process(&mut info, 1).buffer().as_slice().to_vec();
    assert_eq!(canonical, vec![40.0]);
}
