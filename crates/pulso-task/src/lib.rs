//! Pulso Task - background rendering for pulso graphs
//!
//! A pulso graph is single-threaded by construction. This crate moves a
//! whole sub-graph onto a dedicated worker thread and hands the rendered
//! blocks back through a pair of lock-free queues, so a pull-side thread
//! (an audio callback, typically) gets its blocks without ever touching
//! the graph or a lock.
//!
//! # How it works
//!
//! - [`task`] spawns a worker, runs your builder closure on it, and
//!   returns a consumer [`Unit`](pulso_core::Unit) plus a [`TaskHandle`].
//! - The worker renders ahead into pre-allocated [`TaskBuffer`]s, pacing
//!   itself by how many free buffers remain.
//! - [`TaskNode::produce`] on the pull side pops a ready block, replays
//!   the update messages that were emitted while it was rendered, and
//!   recycles the buffer. No block ready means silence and an underrun
//!   count, never a blocked pull.
//! - When the wrapped graph signals its end the worker drains, the
//!   consumer serves what is buffered, then emits
//!   [`UpdateMessage::Done`](pulso_core::UpdateMessage::Done) once.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulso_core::units::saw;
//! use pulso_core::{BlockSize, SampleRate, Unit};
//! use pulso_task::{TaskConfig, task};
//!
//! let config = TaskConfig { num_channels: 1, ..TaskConfig::default() };
//! let (unit, handle) = task::<f32, _>(&config, false, || {
//!     saw(
//!         Unit::constant(220.0),
//!         BlockSize::no_preference(),
//!         SampleRate::no_preference(),
//!     )
//! })?;
//! // Pull `unit` from the audio thread; watch `handle` from anywhere.
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod node;
pub mod state;
mod worker;

pub use buffer::TaskBuffer;
pub use config::TaskConfig;
pub use error::TaskError;
pub use node::{TaskHandle, TaskNode, task};
pub use state::TaskState;
