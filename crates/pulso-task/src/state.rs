//! Observable worker lifecycle.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the background worker, observable from any thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Worker spawned; graph and buffers not ready yet.
    Starting = 0,
    /// Worker is producing blocks.
    Running = 1,
    /// The wrapped graph ended; buffered blocks remain to be consumed.
    Draining = 2,
    /// Worker has exited.
    Stopped = 3,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Atomic cell holding a [`TaskState`].
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: TaskState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: TaskState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_state() {
        for state in [
            TaskState::Starting,
            TaskState::Running,
            TaskState::Draining,
            TaskState::Stopped,
        ] {
            let cell = AtomicState::new(state);
            assert_eq!(cell.load(), state);
        }
    }

    #[test]
    fn store_replaces_the_state() {
        let cell = AtomicState::new(TaskState::Starting);
        cell.store(TaskState::Running);
        assert_eq!(cell.load(), TaskState::Running);
        cell.store(TaskState::Stopped);
        assert_eq!(cell.load(), TaskState::Stopped);
    }
}
