//! Channels: single-output graph nodes and the pull protocol.
//!
//! A [`Channel`] is a cheap-clone handle over a node implementation plus its
//! [`ChannelCore`] (geometry, inputs, output, clock state). The handle owns
//! the memoization that makes demand-driven pulling safe under fan-out: a
//! channel produces at most once per block boundary no matter how many
//! downstream consumers pull it, because [`Channel::process`] only invokes
//! the node when the pull timestamp has reached `next_time`.
//!
//! The output buffer lives in its own shared cell ([`OutputHandle`]) rather
//! than inside the channel. Two things depend on that split: block-size
//! change notifications resize the buffer without re-entering the channel's
//! `RefCell`, and a proxy owner can hold its proxies' outputs without
//! holding the proxies themselves (keeping ownership acyclic).

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::buffer::Buffer;
use crate::inputs::{InputKey, Inputs};
use crate::message::{UpdateMessage, UpdateReceiver};
use crate::process::ProcessInfo;
use crate::sample::Sample;
use crate::time::Timestamp;
use crate::variable::{BlockSize, Overlap, SampleRate, VariableReceiver};

/// The buffer cell behind an [`OutputHandle`].
///
/// Registered as a block-size receiver so negotiation and later geometry
/// changes keep the buffer length in sync. When an external buffer has been
/// attached, resizes are suppressed: the external owner controls the length.
pub struct OutputSlot<S: Sample> {
    buffer: Buffer<S>,
    external: bool,
}

impl<S: Sample> VariableReceiver<usize> for OutputSlot<S> {
    fn variable_changed(&mut self, block_size: usize) {
        if !self.external && self.buffer.len() != block_size {
            self.buffer.resize_zeroed(block_size);
        }
    }
}

/// Shared handle to a channel's output buffer.
pub struct OutputHandle<S: Sample> {
    slot: Rc<RefCell<OutputSlot<S>>>,
}

impl<S: Sample> Clone for OutputHandle<S> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<S: Sample> fmt::Debug for OutputHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputHandle")
            .field("len", &self.len())
            .finish()
    }
}

impl<S: Sample> OutputHandle<S> {
    /// A new owned, zero-filled output of `len` samples.
    pub fn new(len: usize) -> Self {
        Self {
            slot: Rc::new(RefCell::new(OutputSlot {
                buffer: Buffer::with_len(len),
                external: false,
            })),
        }
    }

    /// Read access to the samples.
    pub fn buffer(&self) -> Ref<'_, Buffer<S>> {
        Ref::map(self.slot.borrow(), |slot| &slot.buffer)
    }

    /// Write access to the samples.
    pub fn buffer_mut(&self) -> RefMut<'_, Buffer<S>> {
        RefMut::map(self.slot.borrow_mut(), |slot| &mut slot.buffer)
    }

    /// Current buffer length.
    pub fn len(&self) -> usize {
        self.slot.borrow().buffer.len()
    }

    /// True when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent sample (zero when empty).
    pub fn value(&self) -> S {
        self.slot.borrow().buffer.last_value()
    }

    /// Replace the owned buffer with an externally controlled one. Until
    /// [`clear_external`](Self::clear_external), block-size changes no
    /// longer resize this output.
    pub fn set_external(&self, buffer: Buffer<S>) {
        let mut slot = self.slot.borrow_mut();
        slot.buffer = buffer;
        slot.external = true;
    }

    /// Return to an owned buffer of `len` zeroed samples.
    pub fn clear_external(&self, len: usize) {
        let mut slot = self.slot.borrow_mut();
        slot.external = false;
        slot.buffer.resize_zeroed(len);
    }

    fn as_receiver(&self) -> Rc<RefCell<dyn VariableReceiver<usize>>> {
        self.slot.clone()
    }

    fn sync_len(&self, len: usize) {
        self.slot.borrow_mut().variable_changed(len);
    }
}

/// Everything a channel owns besides its node: inputs, geometry variables,
/// output slots, clock state and update receivers.
pub struct ChannelCore<S: Sample> {
    inputs: Inputs<S>,
    block_size: BlockSize,
    sample_rate: SampleRate,
    overlap: Overlap,
    outputs: Vec<OutputHandle<S>>,
    registered: bool,
    last_time: Timestamp,
    next_time: Timestamp,
    expiry_time: Timestamp,
    receivers: RefCell<Vec<Weak<RefCell<dyn UpdateReceiver>>>>,
}

impl<S: Sample> ChannelCore<S> {
    /// A core with one owned output, registered for block-size changes.
    /// `block_size` / `sample_rate` may be no-preference sentinels until
    /// the node's `init_channel` settles them.
    pub fn new(inputs: Inputs<S>, block_size: BlockSize, sample_rate: SampleRate) -> Self {
        let outputs = vec![OutputHandle::new(block_size.value())];
        Self::with_outputs(inputs, block_size, sample_rate, outputs)
    }

    /// A core over premade output slots (slot 0 is this channel's own).
    /// Proxy owners pass one slot per output channel.
    pub fn with_outputs(
        inputs: Inputs<S>,
        block_size: BlockSize,
        sample_rate: SampleRate,
        outputs: Vec<OutputHandle<S>>,
    ) -> Self {
        debug_assert!(!outputs.is_empty());
        for output in &outputs {
            block_size.add_receiver(&output.as_receiver());
        }
        // A stated output overlap is adopted at construction; everything
        // else shares the contiguous-blocks variable.
        let overlap = inputs
            .get_overlap(InputKey::Overlap)
            .map_or_else(|_| Overlap::one(), Clone::clone);
        Self {
            inputs,
            block_size,
            sample_rate,
            overlap,
            outputs,
            registered: true,
            last_time: Timestamp::new(-1, 0.0),
            next_time: Timestamp::ZERO,
            expiry_time: Timestamp::MAX,
            receivers: RefCell::new(Vec::new()),
        }
    }

    /// A proxy channel's core: shares the owner's geometry variables and
    /// one of its output slots, without registering a second block-size
    /// receiver (the owner already registered the slot).
    pub fn for_proxy(
        block_size: BlockSize,
        sample_rate: SampleRate,
        overlap: Overlap,
        output: OutputHandle<S>,
    ) -> Self {
        Self {
            inputs: Inputs::new(),
            block_size,
            sample_rate,
            overlap,
            outputs: vec![output],
            registered: false,
            last_time: Timestamp::new(-1, 0.0),
            next_time: Timestamp::ZERO,
            expiry_time: Timestamp::MAX,
            receivers: RefCell::new(Vec::new()),
        }
    }

    /// The input map.
    pub fn inputs(&self) -> &Inputs<S> {
        &self.inputs
    }

    /// This channel's block size (shared handle).
    pub fn block_size(&self) -> BlockSize {
        self.block_size.clone()
    }

    /// This channel's sample rate (shared handle).
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate.clone()
    }

    /// This channel's overlap (shared handle).
    pub fn overlap(&self) -> Overlap {
        self.overlap.clone()
    }

    /// Adopt a block-size variable. Re-registers every output slot on the
    /// new variable and resizes them to its value, which must be positive.
    pub fn set_block_size(&mut self, block_size: BlockSize) {
        assert!(
            block_size.value() > 0,
            "block size must be positive after negotiation"
        );
        if block_size != self.block_size {
            #[cfg(feature = "tracing")]
            tracing::debug!(value = block_size.value(), "channel adopted block size");
            for output in &self.outputs {
                self.block_size.remove_receiver(&output.as_receiver());
                block_size.add_receiver(&output.as_receiver());
            }
            self.block_size = block_size;
        }
        let len = self.block_size.value();
        for output in &self.outputs {
            output.sync_len(len);
        }
    }

    /// Adopt a sample-rate variable.
    pub fn set_sample_rate(&mut self, sample_rate: SampleRate) {
        if sample_rate != self.sample_rate {
            #[cfg(feature = "tracing")]
            tracing::debug!(value = sample_rate.value(), "channel adopted sample rate");
            self.sample_rate = sample_rate;
        }
    }

    /// Adopt an overlap variable. Its value must be in `(0, 1]`.
    pub fn set_overlap(&mut self, overlap: Overlap) {
        let value = overlap.value();
        assert!(
            value > 0.0 && value <= 1.0,
            "overlap must be in (0, 1], got {value}"
        );
        self.overlap = overlap;
    }

    /// Duration of one sample in ticks. Infinite when the sample rate is
    /// the no-preference sentinel (constants never expire their block).
    pub fn sample_duration_ticks(&self) -> f64 {
        Timestamp::TICKS_PER_SECOND as f64 / self.sample_rate.value()
    }

    /// Duration of one *hop* in ticks: `block_size × overlap × sample
    /// duration`. This is what separates consecutive valid pull times.
    pub fn block_duration_ticks(&self) -> f64 {
        self.sample_duration_ticks() * self.block_size.value() as f64 * self.overlap.value()
    }

    /// Number of output slots (1 except for proxy owners).
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// This channel's own output.
    pub fn output(&self) -> OutputHandle<S> {
        self.outputs[0].clone()
    }

    /// Output slot `index` (proxy owners only have more than one).
    pub fn output_at(&self, index: usize) -> OutputHandle<S> {
        self.outputs[index].clone()
    }

    /// Seed the initial value: the output reads as `value` before the
    /// first produce.
    pub fn init_value(&mut self, value: S) {
        self.init_value_at(0, value);
    }

    /// Seed output slot `index` with `value`.
    pub fn init_value_at(&mut self, index: usize, value: S) {
        self.outputs[index].buffer_mut().fill(value);
    }

    /// Last sample of the own output (the seeded value before any produce).
    pub fn value(&self) -> S {
        self.outputs[0].value()
    }

    /// Time of the most recent produce (negative before the first).
    pub fn last_time(&self) -> Timestamp {
        self.last_time
    }

    /// Earliest pull time that will trigger the next produce.
    pub fn next_time(&self) -> Timestamp {
        self.next_time
    }

    /// True when the channel's signal has expired at time `time`.
    pub fn should_be_deleted(&self, time: Timestamp) -> bool {
        time >= self.expiry_time
    }

    /// Register an update-message receiver (held weakly).
    pub fn add_update_receiver(&self, receiver: &Rc<RefCell<dyn UpdateReceiver>>) {
        self.receivers.borrow_mut().push(Rc::downgrade(receiver));
    }

    /// Deregister an update-message receiver (matched by identity).
    pub fn remove_update_receiver(&self, receiver: &Rc<RefCell<dyn UpdateReceiver>>) {
        self.receivers.borrow_mut().retain(|w| {
            w.upgrade()
                .is_some_and(|r| !std::ptr::addr_eq(Rc::as_ptr(&r), Rc::as_ptr(receiver)))
        });
    }

    /// Deliver `message` synchronously to every live receiver, in
    /// registration order. Dead receivers are pruned.
    pub fn send_update(&self, message: UpdateMessage) {
        let live: Vec<Rc<RefCell<dyn UpdateReceiver>>> = {
            let mut receivers = self.receivers.borrow_mut();
            receivers.retain(|w| w.strong_count() > 0);
            receivers.iter().filter_map(Weak::upgrade).collect()
        };
        for receiver in live {
            receiver.borrow_mut().update(message);
        }
    }

    fn update_next_time(&mut self) {
        let duration = self.block_duration_ticks();
        self.next_time = if duration.is_finite() {
            self.last_time.offset_ticks(duration)
        } else {
            Timestamp::MAX
        };
    }
}

impl<S: Sample> Drop for ChannelCore<S> {
    fn drop(&mut self) {
        if self.registered {
            for output in &self.outputs {
                self.block_size.remove_receiver(&output.as_receiver());
            }
        }
    }
}

/// A channel's node implementation: what it computes, as opposed to the
/// clock/geometry machinery the core and handle provide.
///
/// `produce` is called by the handle only when the block is actually due;
/// implementations never deduplicate work themselves.
pub trait ChannelNode<S: Sample> {
    /// Human-readable node name for diagnostics.
    fn name(&self) -> &'static str;

    /// The input keys this node reads.
    fn input_keys(&self) -> &'static [InputKey] {
        &[]
    }

    /// Number of output channels this node computes in one produce.
    fn num_outputs(&self) -> usize {
        1
    }

    /// True for constant channels (block size 1, never reproduced).
    fn is_constant(&self) -> bool {
        false
    }

    /// True when this node computes multiple outputs served by proxies.
    fn is_proxy_owner(&self) -> bool {
        false
    }

    /// One-time setup for output channel `index`: negotiate geometry via
    /// the `decide` rules and seed initial values.
    fn init_channel(&mut self, core: &mut ChannelCore<S>, index: usize);

    /// Compute one block into the output slot(s).
    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, index: usize);
}

struct ChannelShell<S: Sample> {
    core: ChannelCore<S>,
    node: Box<dyn ChannelNode<S>>,
}

/// Cheap-clone handle to a channel. Equality is identity.
pub struct Channel<S: Sample> {
    shell: Rc<RefCell<ChannelShell<S>>>,
}

impl<S: Sample> Clone for Channel<S> {
    fn clone(&self) -> Self {
        Self {
            shell: Rc::clone(&self.shell),
        }
    }
}

impl<S: Sample> PartialEq for Channel<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shell, &other.shell)
    }
}

impl<S: Sample> fmt::Debug for Channel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shell = self.shell.borrow();
        f.debug_struct("Channel")
            .field("name", &shell.node.name())
            .field("next_time", &shell.core.next_time())
            .finish()
    }
}

impl<S: Sample> Channel<S> {
    /// Wrap a core and node into a channel handle.
    pub fn new(core: ChannelCore<S>, node: Box<dyn ChannelNode<S>>) -> Self {
        Self {
            shell: Rc::new(RefCell::new(ChannelShell { core, node })),
        }
    }

    /// Run the node's one-time setup for output `index`. Must be called
    /// exactly once per channel before the first `process`.
    pub fn init(&self, index: usize) {
        let mut shell = self.shell.borrow_mut();
        let ChannelShell { core, node } = &mut *shell;
        node.init_channel(core, index);
    }

    /// Pull one block at the caller's current time.
    ///
    /// Produces only when `info.timestamp >= next_time`; otherwise the
    /// existing output (already valid for this block span) is returned
    /// untouched. After producing, the clock advances one hop and — when
    /// the cycle carries `should_delete` — the expiry time latches to the
    /// start of the next hop.
    pub fn process(&self, info: &mut ProcessInfo, index: usize) -> OutputHandle<S> {
        {
            let mut shell = self.shell.borrow_mut();
            if info.timestamp() >= shell.core.next_time {
                let ChannelShell { core, node } = &mut *shell;
                node.produce(core, info, index);
                core.last_time = info.timestamp();
                core.update_next_time();
                if info.should_delete() {
                    core.expiry_time = core.next_time;
                }
            }
        }
        self.output()
    }

    /// This channel's output.
    pub fn output(&self) -> OutputHandle<S> {
        self.shell.borrow().core.output()
    }

    /// Output slot `index` (proxy owners only).
    pub fn output_at(&self, index: usize) -> OutputHandle<S> {
        self.shell.borrow().core.output_at(index)
    }

    /// The current (last produced or seeded) value.
    pub fn value(&self) -> S {
        self.shell.borrow().core.value()
    }

    /// This channel's block size (shared handle).
    pub fn block_size(&self) -> BlockSize {
        self.shell.borrow().core.block_size()
    }

    /// This channel's sample rate (shared handle).
    pub fn sample_rate(&self) -> SampleRate {
        self.shell.borrow().core.sample_rate()
    }

    /// This channel's overlap (shared handle).
    pub fn overlap(&self) -> Overlap {
        self.shell.borrow().core.overlap()
    }

    /// Earliest pull time that will trigger the next produce.
    pub fn next_time(&self) -> Timestamp {
        self.shell.borrow().core.next_time()
    }

    /// True when the channel's signal has expired at `time`.
    pub fn should_be_deleted(&self, time: Timestamp) -> bool {
        self.shell.borrow().core.should_be_deleted(time)
    }

    /// The node's diagnostic name.
    pub fn name(&self) -> &'static str {
        self.shell.borrow().node.name()
    }

    /// True for constant channels.
    pub fn is_constant(&self) -> bool {
        self.shell.borrow().node.is_constant()
    }

    /// True for proxy-owner channels.
    pub fn is_proxy_owner(&self) -> bool {
        self.shell.borrow().node.is_proxy_owner()
    }

    /// Register an update-message receiver on this channel.
    pub fn add_update_receiver(&self, receiver: &Rc<RefCell<dyn UpdateReceiver>>) {
        self.shell.borrow().core.add_update_receiver(receiver);
    }

    /// Deregister an update-message receiver.
    pub fn remove_update_receiver(&self, receiver: &Rc<RefCell<dyn UpdateReceiver>>) {
        self.shell.borrow().core.remove_update_receiver(receiver);
    }
}
