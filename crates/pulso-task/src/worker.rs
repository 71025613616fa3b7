//! The background render loop and the state shared across threads.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, Thread};
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use pulso_core::{ProcessInfo, Sample, Unit, UpdateMessage, UpdateReceiver, adapted};

use crate::buffer::TaskBuffer;
use crate::config::TaskConfig;
use crate::state::{AtomicState, TaskState};

/// Everything both sides touch: the two lock-free queues and the flags.
/// The consumer path (`TaskNode::produce`) only ever pops, pushes, loads
/// and unparks; it never blocks.
#[derive(Debug)]
pub(crate) struct Shared<S: Sample> {
    pub(crate) free: ArrayQueue<TaskBuffer<S>>,
    pub(crate) active: ArrayQueue<TaskBuffer<S>>,
    state: AtomicState,
    exit: AtomicBool,
    input_ended: AtomicBool,
    underruns: AtomicU64,
    worker: OnceLock<Thread>,
}

impl<S: Sample> Shared<S> {
    pub(crate) fn new(config: &TaskConfig) -> Self {
        Self {
            free: ArrayQueue::new(config.num_buffers),
            active: ArrayQueue::new(config.num_buffers),
            state: AtomicState::new(TaskState::Starting),
            exit: AtomicBool::new(false),
            input_ended: AtomicBool::new(false),
            underruns: AtomicU64::new(0),
            worker: OnceLock::new(),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state.load()
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state);
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Acquire)
    }

    pub(crate) fn request_exit(&self) {
        self.exit.store(true, Ordering::Release);
        self.unpark_worker();
    }

    pub(crate) fn input_ended(&self) -> bool {
        self.input_ended.load(Ordering::Acquire)
    }

    pub(crate) fn set_input_ended(&self) {
        self.input_ended.store(true, Ordering::Release);
    }

    pub(crate) fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub(crate) fn count_underrun(&self) -> u64 {
        self.underruns.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn register_worker(&self, thread: Thread) {
        let _ = self.worker.set(thread);
    }

    pub(crate) fn unpark_worker(&self) {
        if let Some(thread) = self.worker.get() {
            thread.unpark();
        }
    }
}

/// Collects update messages emitted by the wrapped graph during one pull so
/// they can travel with the block they belong to.
#[derive(Default)]
struct MessageCollector {
    pending: Vec<UpdateMessage>,
}

impl UpdateReceiver for MessageCollector {
    fn update(&mut self, message: UpdateMessage) {
        self.pending.push(message);
    }
}

/// The worker loop. Builds the wrapped graph on this thread (the graph is
/// single-threaded by construction), then renders block after block into
/// free buffers until asked to exit or the graph signals its end.
pub(crate) fn run_worker<S, F>(shared: &Shared<S>, config: &TaskConfig, build: F)
where
    S: Sample,
    F: FnOnce() -> Unit<S>,
{
    let graph = build();

    for _ in 0..config.num_buffers {
        // Cannot overflow: the queue was sized for exactly this many.
        let _ = shared
            .free
            .push(TaskBuffer::new(config.num_channels, config.block_size));
    }

    let collector = Rc::new(RefCell::new(MessageCollector::default()));
    let receiver: Rc<RefCell<dyn UpdateReceiver>> = collector.clone();
    for channel in graph.channels() {
        channel.add_update_receiver(&receiver);
    }

    shared.set_state(TaskState::Running);
    tracing::debug!(
        channels = config.num_channels,
        block_size = config.block_size,
        buffers = config.num_buffers,
        "task worker running"
    );

    let wait = Duration::from_millis(config.wait_timeout_ms);
    let block_duration = Duration::from_secs_f64(config.block_size as f64 / config.sample_rate);
    let mut info = ProcessInfo::new();

    while !shared.exit_requested() {
        let Some(mut buffer) = shared.free.pop() else {
            thread::park_timeout(wait);
            continue;
        };

        info.set_timestamp(graph.next_time(0));
        for channel in 0..config.num_channels {
            let block = graph.process(&mut info, channel);
            let block = block.buffer();
            let samples = block.as_slice();
            let row = buffer.channel_mut(channel);
            if samples.len() == row.len() {
                row.copy_from_slice(samples);
            } else {
                for (sample, v) in row.iter_mut().zip(adapted(samples, config.block_size)) {
                    *sample = v;
                }
            }
        }
        for message in collector.borrow_mut().pending.drain(..) {
            buffer.push_message(message);
        }
        let ended = info.should_delete();

        // Cannot overflow: every buffer in flight came from the free queue.
        let _ = shared.active.push(buffer);

        if ended {
            tracing::debug!("wrapped graph ended, draining");
            shared.set_state(TaskState::Draining);
            shared.set_input_ended();
            break;
        }

        // Pacing: nearly starved of free buffers means the consumer is
        // behind or gone, so park until it returns one; comfortably ahead
        // means there is no rush for the next block.
        let free = shared.free.len();
        let active = shared.active.len();
        if free <= 1 {
            thread::park_timeout(wait);
        } else if free < 2 * active {
            thread::sleep(block_duration);
        } else {
            thread::yield_now();
        }
    }

    while !shared.exit_requested() {
        thread::park_timeout(wait);
    }
    shared.set_state(TaskState::Stopped);
    tracing::debug!("task worker stopped");
}
