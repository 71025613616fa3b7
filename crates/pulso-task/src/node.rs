//! The consumer-side unit and the worker handle.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use pulso_core::channel::{ChannelCore, ChannelNode};
use pulso_core::unit::proxies_from_inputs;
use pulso_core::{
    BlockSize, Inputs, ProcessInfo, Sample, SampleRate, Unit, UpdateMessage,
};

use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::state::TaskState;
use crate::worker::{Shared, run_worker};

/// Proxy-owner node that serves blocks rendered by the worker.
///
/// `produce` runs on whatever thread pulls the graph and never blocks: a
/// block is popped from the active queue if one is ready, otherwise silence
/// goes out and the underrun counter moves.
pub struct TaskNode<S: Sample> {
    shared: Arc<Shared<S>>,
    num_outputs: usize,
    allow_auto_delete: bool,
    done_sent: bool,
}

impl<S: Sample> TaskNode<S> {
    fn zero_outputs(core: &ChannelCore<S>, num_outputs: usize) {
        for channel in 0..num_outputs {
            core.output_at(channel).buffer_mut().zero();
        }
    }
}

impl<S: Sample> ChannelNode<S> for TaskNode<S> {
    fn name(&self) -> &'static str {
        "Task"
    }

    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    fn is_proxy_owner(&self) -> bool {
        self.num_outputs > 1
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, index: usize) {
        if index == 0 {
            core.set_block_size(BlockSize::decide(
                core.block_size(),
                BlockSize::default_shared(),
            ));
            core.set_sample_rate(SampleRate::decide(
                core.sample_rate(),
                SampleRate::default_shared(),
            ));
        }
        core.init_value_at(index, S::ZERO);
    }

    fn produce(&mut self, core: &ChannelCore<S>, info: &mut ProcessInfo, _index: usize) {
        match self.shared.active.pop() {
            Some(mut buffer) => {
                for channel in 0..self.num_outputs {
                    let output = core.output_at(channel);
                    let mut output = output.buffer_mut();
                    let out = output.as_mut_slice();
                    let row = buffer.channel(channel % buffer.num_channels());
                    debug_assert_eq!(out.len(), row.len());
                    out.copy_from_slice(row);
                }
                // Output borrows are released before receivers run.
                for &message in buffer.messages() {
                    core.send_update(message);
                }
                buffer.clear_messages();
                let _ = self.shared.free.push(buffer);
                self.shared.unpark_worker();
            }
            None => {
                Self::zero_outputs(core, self.num_outputs);
                if self.shared.input_ended() {
                    if !self.done_sent {
                        self.done_sent = true;
                        core.send_update(UpdateMessage::Done);
                        if self.allow_auto_delete {
                            info.set_should_delete();
                        }
                        self.shared.request_exit();
                    }
                } else {
                    let underruns = self.shared.count_underrun();
                    tracing::warn!(underruns, "task underrun, emitting silence");
                }
            }
        }
    }
}

/// Handle to the background worker: observe its state, count underruns,
/// and stop it. Dropping the handle stops and joins the worker.
pub struct TaskHandle<S: Sample> {
    shared: Arc<Shared<S>>,
    join: Option<JoinHandle<()>>,
}

impl<S: Sample> TaskHandle<S> {
    /// Current worker lifecycle state.
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Blocks rendered and not yet consumed.
    pub fn buffered(&self) -> usize {
        self.shared.active.len()
    }

    /// How many pulls found no block ready.
    pub fn underruns(&self) -> u64 {
        self.shared.underruns()
    }

    /// True once the wrapped graph has signalled its end.
    pub fn is_input_ended(&self) -> bool {
        self.shared.input_ended()
    }

    /// Ask the worker to exit and wait for it.
    pub fn stop(&mut self) {
        self.shared.request_exit();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl<S: Sample> Drop for TaskHandle<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wrap a graph in a background task channel.
///
/// `build` runs on the worker thread and assembles the graph there; the
/// graph itself never crosses threads. The returned unit exposes
/// `config.num_channels` channels on the calling side and may be pulled
/// from any single thread at a time.
///
/// With `allow_auto_delete`, the unit raises the end-of-signal flag once
/// the wrapped graph has ended and every buffered block has been served.
pub fn task<S, F>(
    config: &TaskConfig,
    allow_auto_delete: bool,
    build: F,
) -> Result<(Unit<S>, TaskHandle<S>), TaskError>
where
    S: Sample,
    F: FnOnce() -> Unit<S> + Send + 'static,
{
    config.validate()?;

    let shared = Arc::new(Shared::new(config));
    let join = thread::Builder::new().name("pulso-task".into()).spawn({
        let shared = Arc::clone(&shared);
        let config = config.clone();
        move || run_worker(&shared, &config, build)
    })?;
    shared.register_worker(join.thread().clone());

    let node = TaskNode {
        shared: Arc::clone(&shared),
        num_outputs: config.num_channels,
        allow_auto_delete,
        done_sent: false,
    };
    let unit = proxies_from_inputs(
        Inputs::new(),
        BlockSize::new(config.block_size),
        SampleRate::new(config.sample_rate),
        Box::new(node),
    );

    Ok((
        unit,
        TaskHandle {
            shared,
            join: Some(join),
        },
    ))
}
