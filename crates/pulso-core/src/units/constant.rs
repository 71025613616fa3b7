//! Constant channels.
//!
//! A constant is a one-sample block that never reproduces: its sample rate
//! stays at the no-preference sentinel, so after the first pull its next
//! produce time is "never" and consumers broadcast the single sample
//! through the adaptation rule. All constants share one block-size-1
//! variable, which is what lets geometry negotiation treat them as "no
//! preference stated".

use crate::channel::{ChannelCore, ChannelNode};
use crate::process::ProcessInfo;
use crate::sample::Sample;

/// The node behind [`Unit::constant`](crate::unit::Unit::constant).
pub struct ConstantNode<S: Sample> {
    value: S,
}

impl<S: Sample> ConstantNode<S> {
    /// A constant holding `value`.
    pub fn new(value: S) -> Self {
        Self { value }
    }
}

impl<S: Sample> ChannelNode<S> for ConstantNode<S> {
    fn name(&self) -> &'static str {
        "Constant"
    }

    fn is_constant(&self) -> bool {
        true
    }

    fn init_channel(&mut self, core: &mut ChannelCore<S>, _index: usize) {
        core.init_value(self.value);
    }

    fn produce(&mut self, _core: &ChannelCore<S>, _info: &mut ProcessInfo, _index: usize) {
        // The buffer was seeded at init and never changes.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessInfo;
    use crate::time::Timestamp;
    use crate::unit::Unit;

    #[test]
    fn one_sample_seeded_never_expiring() {
        let unit = Unit::constant(0.25f32);
        let mut info = ProcessInfo::new();
        let out = unit.process(&mut info, 0);
        assert_eq!(out.buffer().as_slice(), &[0.25]);
        assert_eq!(unit.next_time(0), Timestamp::MAX);
        assert!(unit.is_constant(0));
        assert!(unit.sample_rate(0).is_no_preference());
    }
}
