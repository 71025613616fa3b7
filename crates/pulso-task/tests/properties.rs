//! Property-based tests for the task-channel data structures.
//!
//! Covers the channel-contiguous buffer layout, the per-buffer message
//! FIFO, and config validation, using proptest for randomized input
//! generation.

use proptest::prelude::*;
use pulso_core::UpdateMessage;
use pulso_task::{TaskBuffer, TaskConfig};

fn any_message() -> impl Strategy<Value = UpdateMessage> {
    prop::sample::select(vec![
        UpdateMessage::Done,
        UpdateMessage::Looped,
        UpdateMessage::Trigger,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Rows never alias: filling each channel with its own marker leaves
    /// every other channel untouched.
    #[test]
    fn channel_rows_are_disjoint(
        num_channels in 1usize..8,
        block_size in 1usize..64,
    ) {
        let mut buffer = TaskBuffer::<f32>::new(num_channels, block_size);
        for channel in 0..num_channels {
            let marker = channel as f32 + 1.0;
            buffer.channel_mut(channel).fill(marker);
        }
        for channel in 0..num_channels {
            let marker = channel as f32 + 1.0;
            let row = buffer.channel(channel);
            prop_assert_eq!(row.len(), block_size);
            prop_assert!(row.iter().all(|&s| s == marker));
        }
    }

    /// Messages ride along in push order, however many there are, and a
    /// recycled buffer starts empty again.
    #[test]
    fn messages_replay_in_push_order(
        messages in prop::collection::vec(any_message(), 0..32),
    ) {
        let mut buffer = TaskBuffer::<f32>::new(1, 4);
        for &message in &messages {
            buffer.push_message(message);
        }
        prop_assert_eq!(buffer.messages(), messages.as_slice());
        buffer.clear_messages();
        prop_assert!(buffer.messages().is_empty());
    }

    /// Every config inside the documented domains validates.
    #[test]
    fn sane_configs_validate(
        num_buffers in 2usize..64,
        num_channels in 1usize..16,
        block_size in 1usize..4096,
        sample_rate in 1.0f64..192_000.0,
        wait_timeout_ms in 1u64..100,
    ) {
        let config = TaskConfig {
            num_buffers,
            num_channels,
            block_size,
            sample_rate,
            wait_timeout_ms,
        };
        prop_assert!(config.validate().is_ok());
    }

    /// Fewer than two buffers cannot keep both queues live.
    #[test]
    fn single_buffer_configs_are_rejected(num_buffers in 0usize..2) {
        let config = TaskConfig {
            num_buffers,
            ..TaskConfig::default()
        };
        prop_assert!(config.validate().is_err());
    }
}
