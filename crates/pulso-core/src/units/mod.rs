//! The standard node set.
//!
//! Small on purpose: enough generators and converters to build and exercise
//! real graphs. Each module exposes a factory function returning a
//! [`Unit`](crate::unit::Unit), plus the node type for anyone composing
//! their own factories.

pub mod constant;
pub mod mixer;
pub mod mul_add;
pub mod overlap_make;
pub mod overlap_mix;
pub mod pan;
pub mod reblock;
pub mod saw;

pub use constant::ConstantNode;
pub use mixer::{MixerNode, mixer};
pub use mul_add::{MulAddNode, mul_add};
pub use overlap_make::{OverlapMakeNode, overlap_make};
pub use overlap_mix::{OverlapMixNode, overlap_mix};
pub use pan::{LinearPanNode, linear_pan};
pub use reblock::{ReblockNode, reblock};
pub use saw::{SawNode, saw};
