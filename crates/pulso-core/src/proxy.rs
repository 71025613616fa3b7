//! Proxy channels for multi-output nodes.
//!
//! A node that computes N channels in one pass (a panner, the overlap
//! converters, the task consumer) is a *proxy owner*: it sits at channel 0
//! of its unit and writes channels 1..N directly into output slots it
//! shares with N−1 [`ProxyNode`] channels. Pulling any proxy pulls the
//! owner's handle, whose memoization guarantees the owner computes exactly
//! once per block span regardless of which proxies are pulled, in which
//! order, how many times.
//!
//! Ownership is acyclic: the owner holds buffer cells, the proxies hold a
//! channel handle to the owner. Dropping the unit's last external handle
//! drops owner and proxies exactly once, in any order, with nothing to
//! un-latch first.

use crate::channel::{Channel, ChannelCore, ChannelNode};
use crate::process::ProcessInfo;
use crate::sample::Sample;

/// Channel 1..N of a proxy-owner group: delegates everything to the owner.
pub struct ProxyNode<S: Sample> {
    owner: Channel<S>,
    index: usize,
}

impl<S: Sample> ProxyNode<S> {
    /// A proxy for output `index` of `owner`.
    pub fn new(owner: Channel<S>, index: usize) -> Self {
        debug_assert!(index > 0, "channel 0 is the owner itself");
        Self { owner, index }
    }

    /// The owning channel.
    pub fn owner(&self) -> &Channel<S> {
        &self.owner
    }
}

impl<S: Sample> ChannelNode<S> for ProxyNode<S> {
    fn name(&self) -> &'static str {
        "Proxy"
    }

    fn init_channel(&mut self, _core: &mut ChannelCore<S>, _index: usize) {
        // The owner seeds this proxy's slot during its own init.
        self.owner.init(self.index);
    }

    fn produce(&mut self, _core: &ChannelCore<S>, info: &mut ProcessInfo, _index: usize) {
        // The owner writes into the shared slot; nothing to copy here.
        self.owner.process(info, self.index);
    }
}
