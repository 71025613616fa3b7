//! The block container shuttled between the worker and the consumer.

use pulso_core::{Sample, UpdateMessage};

/// One rendered block: channel-contiguous samples plus the update messages
/// emitted while it was produced. Buffers are allocated once at startup and
/// recycled through the free queue; neither side allocates afterwards.
#[derive(Debug)]
pub struct TaskBuffer<S: Sample> {
    samples: Vec<S>,
    num_channels: usize,
    block_size: usize,
    messages: Vec<UpdateMessage>,
}

impl<S: Sample> TaskBuffer<S> {
    /// An all-zero buffer for `num_channels` rows of `block_size` samples.
    pub fn new(num_channels: usize, block_size: usize) -> Self {
        Self {
            samples: vec![S::ZERO; num_channels * block_size],
            num_channels,
            block_size,
            messages: Vec::new(),
        }
    }

    /// Channels per block.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Samples per channel.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// One channel's samples.
    pub fn channel(&self, index: usize) -> &[S] {
        let start = index * self.block_size;
        &self.samples[start..start + self.block_size]
    }

    /// One channel's samples, mutably.
    pub fn channel_mut(&mut self, index: usize) -> &mut [S] {
        let start = index * self.block_size;
        &mut self.samples[start..start + self.block_size]
    }

    /// Attach a message to this block. Delivery order is push order.
    pub fn push_message(&mut self, message: UpdateMessage) {
        self.messages.push(message);
    }

    /// The messages attached to this block, in emit order.
    pub fn messages(&self) -> &[UpdateMessage] {
        &self.messages
    }

    /// Drop attached messages before returning the buffer to the free
    /// queue. Sample contents are overwritten by the next fill.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_channel_contiguous_and_disjoint() {
        let mut buffer = TaskBuffer::<f32>::new(2, 4);
        buffer.channel_mut(0).fill(1.0);
        buffer.channel_mut(1).fill(2.0);
        assert_eq!(buffer.channel(0), &[1.0; 4]);
        assert_eq!(buffer.channel(1), &[2.0; 4]);
    }

    #[test]
    fn messages_keep_push_order() {
        let mut buffer = TaskBuffer::<f32>::new(1, 4);
        buffer.push_message(UpdateMessage::Trigger);
        buffer.push_message(UpdateMessage::Looped);
        buffer.push_message(UpdateMessage::Done);
        assert_eq!(
            buffer.messages(),
            &[
                UpdateMessage::Trigger,
                UpdateMessage::Looped,
                UpdateMessage::Done
            ]
        );
        buffer.clear_messages();
        assert!(buffer.messages().is_empty());
    }
}
