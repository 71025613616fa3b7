//! Pulso Core - demand-driven audio channel graphs
//!
//! This crate provides a pull-based processing graph: consumers ask channels
//! for blocks of samples, and each channel produces a new block only when the
//! requested timestamp has moved past the span it already rendered. Geometry
//! (block size, sample rate, overlap) lives in shared observable variables,
//! so a single assignment reshapes every buffer that depends on it.
//!
//! # Core Abstractions
//!
//! ## Graph Building Blocks
//!
//! - [`Channel`] - One stream of sample blocks with timestamp memoization
//! - [`Unit`] - An array of channels addressed with modulo wraparound
//! - [`ChannelNode`] - Trait a DSP node implements to produce blocks
//! - [`Inputs`] / [`InputKey`] - Keyed inputs a node negotiates geometry from
//!
//! ## Observable Geometry
//!
//! - [`Variable`] - Shared scalar with change notification
//! - [`BlockSize`], [`SampleRate`], [`Overlap`] - Geometry newtypes with
//!   preference resolution and process-wide defaults
//!
//! ## Time
//!
//! - [`Timestamp`] - Microsecond ticks plus an exact sub-tick fraction
//! - [`ProcessInfo`] - The pull clock and end-of-signal flag for one pull
//!
//! ## Units
//!
//! - [`units::constant`] - Frozen scalars (rate-free, never re-produce)
//! - [`units::saw`] - Band-unlimited sawtooth ramp
//! - [`units::mul_add`] - Fused scale-and-offset with fast paths
//! - [`units::mixer`] - Channel summing and the deletion barrier
//! - [`units::linear_pan`] - Stereo panner (the canonical proxy owner)
//! - [`units::reblock`] - Re-buffer a stream to a different block size
//! - [`units::overlap_make`] / [`units::overlap_mix`] - Overlapped windowing
//!   and its inverse
//!
//! # Example
//!
//! ```rust,ignore
//! use pulso_core::units::{mixer, mul_add, saw};
//! use pulso_core::{BlockSize, ProcessInfo, SampleRate, Unit};
//!
//! // 220 Hz saw, scaled to half amplitude, summed to one channel.
//! let osc = saw::<f32>(
//!     Unit::constant(220.0),
//!     BlockSize::no_preference(),
//!     SampleRate::no_preference(),
//! );
//! let voice = mul_add(osc, Unit::constant(0.5), Unit::constant(0.0));
//! let mix = mixer(voice, false);
//!
//! // Pull blocks on the unit's own clock.
//! let mut info = ProcessInfo::new();
//! info.set_timestamp(mix.next_time(0));
//! let block = mix.process(&mut info, 0);
//! ```
//!
//! # Design Principles
//!
//! - **Demand-driven**: nothing renders until a consumer pulls it
//! - **Memoized by time**: shared subgraphs produce once per block span
//! - **Single-threaded graphs**: `Rc`/`RefCell` interior, no locks in the
//!   pull path (cross-thread hand-off lives in `pulso-task`)

pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod inputs;
pub mod message;
pub mod process;
pub mod proxy;
pub mod sample;
pub mod time;
pub mod unit;
pub mod units;
pub mod variable;

// Re-export main types at crate root
pub use buffer::{Adapted, Buffer, adapted};
pub use channel::{Channel, ChannelCore, ChannelNode, OutputHandle};
pub use config::{ConfigError, GraphConfig};
pub use error::GraphError;
pub use inputs::{Input, InputKey, Inputs};
pub use message::{UpdateMessage, UpdateReceiver};
pub use process::ProcessInfo;
pub use sample::Sample;
pub use time::Timestamp;
pub use unit::Unit;
pub use variable::{BlockSize, Overlap, SampleRate, ScalarValue, Variable, VariableReceiver};
