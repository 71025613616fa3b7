//! Update messages.
//!
//! Channels deliver out-of-band events (end of signal, loop points,
//! triggers) to registered receivers synchronously, in emit order, on the
//! thread that pulled the channel. The task channel extends this across
//! threads by recording messages per block and replaying them on the pull
//! thread between the blocks they belong to.

/// An out-of-band event attached to a channel's signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMessage {
    /// The signal has ended.
    Done,
    /// The signal wrapped around to its start.
    Looped,
    /// A node-defined trigger point passed.
    Trigger,
}

/// Receiver for [`UpdateMessage`]s from a channel.
pub trait UpdateReceiver {
    /// Called once per message, in emit order.
    fn update(&mut self, message: UpdateMessage);
}
